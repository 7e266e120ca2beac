//! The browser [`Dom`], through [`web_sys`].
//!
//! Every event binding owns one [`Closure`] that stays registered while only the Rust handler behind it changes.

use crate::{
	dom::{Dom, EventHandler, ListenerOptions, Namespace},
	value::Value,
};
use std::{
	rc::Rc,
	sync::atomic::{AtomicU64, Ordering},
};
use tracing::{error, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};

/// A document to render into.
#[derive(Debug, Clone)]
pub struct WebDom {
	document: web_sys::Document,
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	/// The current window's document.
	///
	/// # Panics
	///
	/// Throws into JavaScript if there is no window or document.
	#[must_use]
	pub fn from_window() -> Self {
		let document = web_sys::window()
			.expect_throw("lit-dom: No window found.")
			.document()
			.expect_throw("lit-dom: No document found.");
		Self { document }
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}
}

/// Expando property that holds a node's [`Dom::node_key`].
const NODE_KEY: &str = "__litDomKey";

static NEXT_NODE_KEY: AtomicU64 = AtomicU64::new(1);

fn to_js(value: &Value<WebDom>) -> JsValue {
	match value {
		Value::Nothing | Value::NoChange | Value::Null => JsValue::NULL,
		Value::Bool(b) => JsValue::from_bool(*b),
		Value::Number(n) => JsValue::from_f64(*n),
		Value::Str(s) => JsValue::from_str(s),
		Value::Object(object) => match object.downcast_ref::<JsValue>() {
			Some(js) => js.clone(),
			None => {
				warn!("Only `JsValue` objects can be assigned to properties. Assigning `undefined` instead.");
				JsValue::UNDEFINED
			}
		},
		Value::Node(node) => node.clone().into(),
		Value::List(items) => items.iter().map(to_js).collect::<js_sys::Array>().into(),
		Value::Keyed(items) => items.iter().map(|(_, item)| to_js(item)).collect::<js_sys::Array>().into(),
		Value::Template(_) | Value::Listener(_) | Value::Directive(_) => {
			warn!("A {} value can't be assigned to a property. Assigning `undefined` instead.", value.variant_name());
			JsValue::UNDEFINED
		}
	}
}

fn from_js(js: JsValue) -> Value<WebDom> {
	if js.is_null() || js.is_undefined() {
		Value::Null
	} else if let Some(b) = js.as_bool() {
		Value::Bool(b)
	} else if let Some(n) = js.as_f64() {
		Value::Number(n)
	} else if let Some(s) = js.as_string() {
		Value::Str(s.into())
	} else {
		Value::Object(Rc::new(js))
	}
}

impl Dom for WebDom {
	type Node = web_sys::Node;
	type Event = web_sys::Event;
	type Listener = Closure<dyn Fn(web_sys::Event)>;

	fn create_element(&self, name: &str, namespace: Namespace) -> web_sys::Node {
		match namespace {
			Namespace::Html => self.document.create_element(name),
			Namespace::Svg | Namespace::MathMl => self.document.create_element_ns(Some(namespace.uri()), name),
		}
		.expect_throw("lit-dom: Failed to create element.")
		.into()
	}

	fn create_text(&self, data: &str) -> web_sys::Node {
		self.document.create_text_node(data).into()
	}

	fn create_comment(&self, data: &str) -> web_sys::Node {
		self.document.create_comment(data).into()
	}

	fn create_fragment(&self) -> web_sys::Node {
		self.document.create_document_fragment().into()
	}

	fn parent(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn first_child(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.first_child()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn insert_before(&self, parent: &web_sys::Node, node: &web_sys::Node, reference: Option<&web_sys::Node>) {
		if reference == Some(node) {
			return;
		}
		parent.insert_before(node, reference).expect_throw("lit-dom: Failed to insert node.");
	}

	fn remove(&self, node: &web_sys::Node) {
		if let Some(parent) = node.parent_node() {
			if let Err(error) = parent.remove_child(node) {
				error!("Failed to remove node: {:?}", error);
			}
		}
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
	fn node_key(&self, node: &web_sys::Node) -> u64 {
		let property = JsValue::from_str(NODE_KEY);
		if let Some(key) = js_sys::Reflect::get(node, &property).ok().and_then(|key| key.as_f64()) {
			return key as u64;
		}
		let key = NEXT_NODE_KEY.fetch_add(1, Ordering::Relaxed);
		if let Err(error) = js_sys::Reflect::set(node, &property, &JsValue::from_f64(key as f64)) {
			error!("Failed to store a node key: {:?}", error);
		}
		key
	}

	fn set_text(&self, node: &web_sys::Node, data: &str) {
		match node.dyn_ref::<web_sys::CharacterData>() {
			Some(character_data) => character_data.set_data(data),
			None => error!("Expected a text or comment node but found {:?}; Not updating.", node),
		}
	}

	fn tag_name(&self, element: &web_sys::Node) -> String {
		element.dyn_ref::<web_sys::Element>().map(web_sys::Element::local_name).unwrap_or_default()
	}

	fn attribute(&self, element: &web_sys::Node, name: &str) -> Option<String> {
		element.dyn_ref::<web_sys::Element>()?.get_attribute(name)
	}

	fn set_attribute(&self, element: &web_sys::Node, name: &str, value: &str) {
		let Some(element) = element.dyn_ref::<web_sys::Element>() else {
			return error!("Expected an element but found {:?}; Not setting attribute {:?}.", element, name);
		};
		if let Err(error) = element.set_attribute(name, value) {
			error!("Failed to set attribute {:?}: {:?}", name, error);
		}
	}

	fn remove_attribute(&self, element: &web_sys::Node, name: &str) {
		let Some(element) = element.dyn_ref::<web_sys::Element>() else {
			return error!("Expected an element but found {:?}; Not removing attribute {:?}.", element, name);
		};
		if let Err(error) = element.remove_attribute(name) {
			error!("Failed to remove attribute {:?}: {:?}", name, error);
		}
	}

	fn property(&self, element: &web_sys::Node, name: &str) -> Value<Self> {
		match js_sys::Reflect::get(element, &JsValue::from_str(name)) {
			Ok(js) => from_js(js),
			Err(error) => {
				error!("Failed to read property {:?}: {:?}", name, error);
				Value::Null
			}
		}
	}

	fn set_property(&self, element: &web_sys::Node, name: &str, value: &Value<Self>) {
		if let Err(error) = js_sys::Reflect::set(element, &JsValue::from_str(name), &to_js(value)) {
			error!("Failed to set property {:?}: {:?}", name, error);
		}
	}

	fn add_listener(&self, element: &web_sys::Node, event: &str, options: ListenerOptions, handler: EventHandler<Self>) -> Self::Listener {
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| handler(&event)) as Box<dyn Fn(web_sys::Event)>);
		let web_options = web_sys::AddEventListenerOptions::new();
		web_options.set_capture(options.capture);
		web_options.set_once(options.once);
		web_options.set_passive(options.passive);
		if let Err(error) =
			element.add_event_listener_with_callback_and_add_event_listener_options(event, closure.as_ref().unchecked_ref(), &web_options)
		{
			error!("Failed to add event listener {:?}: {:?}", event, error);
		}
		closure
	}

	fn remove_listener(&self, element: &web_sys::Node, event: &str, options: ListenerOptions, listener: Self::Listener) {
		if let Err(error) =
			element.remove_event_listener_with_callback_and_bool(event, listener.as_ref().unchecked_ref(), options.capture)
		{
			error!("Failed to remove event listener {:?} ({:?}): {:?}", event, options, error);
		}
	}
}
