//! A headless [`Dom`] that keeps its nodes in an arena and counts every mutation made through it.
//!
//! Besides native testing, this is handy for rendering to markup without a browser:
//!
//! ```
//! use lit_dom::{html, memory::MemoryDom, render::{Renderer, RenderOptions}, dom::{Dom, Namespace}};
//!
//! let dom = MemoryDom::new();
//! let body = dom.create_element("body", Namespace::Html);
//! let renderer = Renderer::new(dom.clone());
//!
//! renderer.render(html!("<p>Hello " {"world"} "!</p>"), &body, RenderOptions::default()).unwrap();
//! assert_eq!(dom.markup(body), "<p>Hello world!</p>");
//! ```

use crate::{
	dom::{Dom, EventHandler, ListenerOptions, Namespace},
	value::Value,
};
use core::{cell::RefCell, fmt, mem};
use std::rc::Rc;
use tracing::trace;

/// Handle of a node inside a [`MemoryDom`].
///
/// Nodes are never freed while the document exists, so handles of removed nodes stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a [`MemoryDom`] listener is called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	name: String,
	target: NodeId,
	current_target: NodeId,
}
impl Event {
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub fn target(&self) -> NodeId {
		self.target
	}

	#[must_use]
	pub fn current_target(&self) -> NodeId {
		self.current_target
	}
}

/// Mutation counters, see [`MemoryDom::mutations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutations {
	/// Nodes of any kind, including fragments.
	pub created: usize,
	pub elements_created: usize,
	/// Insertions of nodes that weren't attached to a parent (other than a fragment) before.
	pub inserted: usize,
	/// Insertions of nodes that were already attached elsewhere.
	pub moved: usize,
	pub removed: usize,
	pub text_writes: usize,
	pub attribute_writes: usize,
	pub property_writes: usize,
	pub listeners_added: usize,
	pub listeners_removed: usize,
}
impl Mutations {
	/// Counts all writes except node creation.
	#[must_use]
	pub fn writes(&self) -> usize {
		self.inserted
			+ self.moved
			+ self.removed
			+ self.text_writes
			+ self.attribute_writes
			+ self.property_writes
			+ self.listeners_added
			+ self.listeners_removed
	}
}

/// An in-memory document. Clones share the same nodes.
#[derive(Clone, Default)]
pub struct MemoryDom(Rc<RefCell<Arena>>);

#[derive(Default)]
struct Arena {
	nodes: Vec<NodeData>,
	mutations: Mutations,
	next_listener: u64,
}

struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

enum NodeKind {
	Element(Element),
	Text(String),
	Comment(String),
	Fragment,
}

struct Element {
	name: String,
	namespace: Namespace,
	attributes: Vec<(String, String)>,
	properties: Vec<(String, Value<MemoryDom>)>,
	listeners: Vec<Registration>,
}

struct Registration {
	id: ListenerId,
	event: String,
	options: ListenerOptions,
	handler: EventHandler<MemoryDom>,
}

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

impl Arena {
	fn push(&mut self, kind: NodeKind) -> NodeId {
		self.mutations.created += 1;
		if matches!(kind, NodeKind::Element(_)) {
			self.mutations.elements_created += 1;
		}
		self.nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.nodes.len() - 1)
	}

	fn detach(&mut self, node: NodeId) -> Option<NodeId> {
		let parent = self.nodes[node.0].parent.take()?;
		self.nodes[parent.0].children.retain(|&child| child != node);
		Some(parent)
	}

	fn is_fragment(&self, node: NodeId) -> bool {
		matches!(self.nodes[node.0].kind, NodeKind::Fragment)
	}

	fn element(&self, node: NodeId) -> Option<&Element> {
		match &self.nodes[node.0].kind {
			NodeKind::Element(element) => Some(element),
			_ => None,
		}
	}

	fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
		match &mut self.nodes[node.0].kind {
			NodeKind::Element(element) => Some(element),
			_ => None,
		}
	}

	fn write_markup(&self, node: NodeId, out: &mut String, skip_markers: bool, raw: bool) {
		let data = &self.nodes[node.0];
		match &data.kind {
			NodeKind::Element(element) => {
				out.push('<');
				out.push_str(&element.name);
				for (name, value) in &element.attributes {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&htmlize::escape_attribute(value.as_str()));
					out.push('"');
				}
				out.push('>');
				if element.namespace == Namespace::Html
					&& data.children.is_empty()
					&& VOID_ELEMENTS.contains(&element.name.as_str())
				{
					return;
				}
				let raw = element.namespace == Namespace::Html && matches!(element.name.as_str(), "script" | "style");
				for &child in &data.children {
					self.write_markup(child, out, skip_markers, raw);
				}
				out.push_str("</");
				out.push_str(&element.name);
				out.push('>');
			}
			NodeKind::Text(text) if raw => out.push_str(text),
			NodeKind::Text(text) => out.push_str(&htmlize::escape_text(text.as_str())),
			NodeKind::Comment(comment) if skip_markers && comment.is_empty() => (),
			NodeKind::Comment(comment) => {
				out.push_str("<!--");
				out.push_str(comment);
				out.push_str("-->");
			}
			NodeKind::Fragment => {
				for &child in &data.children {
					self.write_markup(child, out, skip_markers, raw);
				}
			}
		}
	}

	fn write_text_content(&self, node: NodeId, out: &mut String) {
		let data = &self.nodes[node.0];
		match &data.kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Comment(_) => (),
			NodeKind::Element(_) | NodeKind::Fragment => {
				for &child in &data.children {
					self.write_text_content(child, out);
				}
			}
		}
	}

	fn find_element(&self, root: NodeId, name: &str, found: &mut Vec<NodeId>) {
		for &child in &self.nodes[root.0].children {
			if self.element(child).map_or(false, |element| element.name == name) {
				found.push(child);
			}
			self.find_element(child, name, found);
		}
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Mutations made since creation or the last [`MemoryDom::reset_mutations`].
	#[must_use]
	pub fn mutations(&self) -> Mutations {
		self.0.borrow().mutations
	}

	pub fn reset_mutations(&self) {
		self.0.borrow_mut().mutations = Mutations::default();
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.0.borrow().nodes[node.0].children.clone()
	}

	/// The element's local name, or [`None`] for other nodes.
	#[must_use]
	pub fn node_name(&self, node: NodeId) -> Option<String> {
		self.0.borrow().element(node).map(|element| element.name.clone())
	}

	#[must_use]
	pub fn namespace(&self, node: NodeId) -> Option<Namespace> {
		self.0.borrow().element(node).map(|element| element.namespace)
	}

	/// The data of a text or comment node.
	#[must_use]
	pub fn data(&self, node: NodeId) -> Option<String> {
		match &self.0.borrow().nodes[node.0].kind {
			NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
			NodeKind::Element(_) | NodeKind::Fragment => None,
		}
	}

	#[must_use]
	pub fn is_comment(&self, node: NodeId) -> bool {
		matches!(self.0.borrow().nodes[node.0].kind, NodeKind::Comment(_))
	}

	#[must_use]
	pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
		self.0
			.borrow()
			.element(node)
			.map(|element| element.attributes.clone())
			.unwrap_or_default()
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeId) -> usize {
		self.0.borrow().element(node).map_or(0, |element| element.listeners.len())
	}

	/// All descendant elements of `root` named `name`, in document order.
	#[must_use]
	pub fn query_all(&self, root: NodeId, name: &str) -> Vec<NodeId> {
		let mut found = Vec::new();
		self.0.borrow().find_element(root, name, &mut found);
		found
	}

	/// The first descendant element of `root` named `name`.
	#[must_use]
	pub fn query(&self, root: NodeId, name: &str) -> Option<NodeId> {
		self.query_all(root, name).into_iter().next()
	}

	/// Serializes the children of `node`, including every comment.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let arena = self.0.borrow();
		let mut out = String::new();
		for &child in &arena.nodes[node.0].children {
			arena.write_markup(child, &mut out, false, false);
		}
		out
	}

	/// Serializes the children of `node` without empty comments,
	/// which is what binding markers look like.
	#[must_use]
	pub fn markup(&self, node: NodeId) -> String {
		let arena = self.0.borrow();
		let mut out = String::new();
		for &child in &arena.nodes[node.0].children {
			arena.write_markup(child, &mut out, true, false);
		}
		out
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.0.borrow().write_markup(node, &mut out, false, false);
		out
	}

	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.0.borrow().write_text_content(node, &mut out);
		out
	}

	/// Dispatches an event at `target`, running capturing listeners from the root downwards
	/// and then bubbling listeners from `target` upwards.
	///
	/// Returns how many listeners were called.
	pub fn dispatch(&self, target: NodeId, name: &str) -> usize {
		let mut path = vec![target];
		{
			let arena = self.0.borrow();
			let mut current = target;
			while let Some(parent) = arena.nodes[current.0].parent {
				path.push(parent);
				current = parent;
			}
		}

		let capturing = path.iter().rev().map(|&node| (node, true));
		let bubbling = path.iter().map(|&node| (node, false));
		let mut called = 0;
		for (node, capture) in capturing.chain(bubbling) {
			// The arena must not be borrowed while listeners run, since they may well render.
			let handlers: Vec<EventHandler<Self>> = {
				let mut arena = self.0.borrow_mut();
				let Some(element) = arena.element_mut(node) else { continue };
				let mut handlers = Vec::new();
				element.listeners.retain(|registration| {
					if registration.event != name || registration.options.capture != capture {
						return true;
					}
					handlers.push(Rc::clone(&registration.handler));
					!registration.options.once
				});
				handlers
			};
			for handler in handlers {
				called += 1;
				handler(&Event {
					name: name.to_owned(),
					target,
					current_target: node,
				});
			}
		}
		trace!("Dispatched {:?} to {} listener(s).", name, called);
		called
	}
}

impl fmt::Debug for MemoryDom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(arena) => f
				.debug_struct("MemoryDom")
				.field("nodes", &arena.nodes.len())
				.field("mutations", &arena.mutations)
				.finish(),
			Err(_) => f.debug_struct("MemoryDom").finish_non_exhaustive(),
		}
	}
}

impl Dom for MemoryDom {
	type Node = NodeId;
	type Event = Event;
	type Listener = ListenerId;

	fn create_element(&self, name: &str, namespace: Namespace) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Element(Element {
			name: name.to_owned(),
			namespace,
			attributes: Vec::new(),
			properties: Vec::new(),
			listeners: Vec::new(),
		}))
	}

	fn create_text(&self, data: &str) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Text(data.to_owned()))
	}

	fn create_comment(&self, data: &str) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Comment(data.to_owned()))
	}

	fn create_fragment(&self) -> NodeId {
		self.0.borrow_mut().push(NodeKind::Fragment)
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.0.borrow().nodes[node.0].parent
	}

	fn first_child(&self, node: &NodeId) -> Option<NodeId> {
		self.0.borrow().nodes[node.0].children.first().copied()
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let arena = self.0.borrow();
		let parent = arena.nodes[node.0].parent?;
		let siblings = &arena.nodes[parent.0].children;
		let index = siblings.iter().position(|child| child == node)?;
		siblings.get(index + 1).copied()
	}

	/// # Panics
	///
	/// Iff `reference` is not a child of `parent`.
	fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) {
		let mut arena = self.0.borrow_mut();
		let nodes = if arena.is_fragment(*node) {
			let children = mem::take(&mut arena.nodes[node.0].children);
			for child in &children {
				arena.nodes[child.0].parent = None;
			}
			children
		} else {
			vec![*node]
		};

		for child in nodes {
			if Some(&child) == reference {
				continue;
			}
			match arena.detach(child) {
				Some(old_parent) if !arena.is_fragment(old_parent) => arena.mutations.moved += 1,
				_ => arena.mutations.inserted += 1,
			}
			let siblings = &mut arena.nodes[parent.0].children;
			let index = match reference {
				Some(reference) => siblings
					.iter()
					.position(|sibling| sibling == reference)
					.unwrap_or_else(|| panic!("lit-dom: {:?} is not a child of {:?}", reference, parent)),
				None => siblings.len(),
			};
			siblings.insert(index, child);
			arena.nodes[child.0].parent = Some(*parent);
		}
	}

	fn remove(&self, node: &NodeId) {
		let mut arena = self.0.borrow_mut();
		if arena.detach(*node).is_some() {
			arena.mutations.removed += 1;
		}
	}

	fn node_key(&self, node: &NodeId) -> u64 {
		node.0 as u64
	}

	fn set_text(&self, node: &NodeId, data: &str) {
		let mut arena = self.0.borrow_mut();
		match &mut arena.nodes[node.0].kind {
			NodeKind::Text(text) | NodeKind::Comment(text) => {
				text.clear();
				text.push_str(data);
			}
			NodeKind::Element(_) | NodeKind::Fragment => return,
		}
		arena.mutations.text_writes += 1;
	}

	fn tag_name(&self, element: &NodeId) -> String {
		self.node_name(*element).unwrap_or_default()
	}

	fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		let arena = self.0.borrow();
		let element = arena.element(*element)?;
		element
			.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.clone())
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) {
		let mut arena = self.0.borrow_mut();
		let Some(element) = arena.element_mut(*element) else { return };
		match element.attributes.iter_mut().find(|(key, _)| key == name) {
			Some((_, existing)) => *existing = value.to_owned(),
			None => element.attributes.push((name.to_owned(), value.to_owned())),
		}
		arena.mutations.attribute_writes += 1;
	}

	fn remove_attribute(&self, element: &NodeId, name: &str) {
		let mut arena = self.0.borrow_mut();
		let Some(element) = arena.element_mut(*element) else { return };
		let before = element.attributes.len();
		element.attributes.retain(|(key, _)| key != name);
		if element.attributes.len() != before {
			arena.mutations.attribute_writes += 1;
		}
	}

	fn property(&self, element: &NodeId, name: &str) -> Value<Self> {
		let arena = self.0.borrow();
		arena
			.element(*element)
			.and_then(|element| element.properties.iter().find(|(key, _)| key == name))
			.map_or(Value::Null, |(_, value)| value.clone())
	}

	fn set_property(&self, element: &NodeId, name: &str, value: &Value<Self>) {
		let mut arena = self.0.borrow_mut();
		let Some(element) = arena.element_mut(*element) else { return };
		match element.properties.iter_mut().find(|(key, _)| key == name) {
			Some((_, existing)) => *existing = value.clone(),
			None => element.properties.push((name.to_owned(), value.clone())),
		}
		arena.mutations.property_writes += 1;
	}

	fn add_listener(&self, element: &NodeId, event: &str, options: ListenerOptions, handler: EventHandler<Self>) -> ListenerId {
		let mut arena = self.0.borrow_mut();
		let id = ListenerId(arena.next_listener);
		arena.next_listener += 1;
		if let Some(element) = arena.element_mut(*element) {
			element.listeners.push(Registration {
				id,
				event: event.to_owned(),
				options,
				handler,
			});
			arena.mutations.listeners_added += 1;
		}
		id
	}

	fn remove_listener(&self, element: &NodeId, _event: &str, _options: ListenerOptions, listener: ListenerId) {
		let mut arena = self.0.borrow_mut();
		let Some(element) = arena.element_mut(*element) else { return };
		let before = element.listeners.len();
		element.listeners.retain(|registration| registration.id != listener);
		if element.listeners.len() != before {
			arena.mutations.listeners_removed += 1;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn fragments_are_flattened_on_insertion() {
		let dom = MemoryDom::new();
		let parent = dom.create_element("div", Namespace::Html);
		let fragment = dom.create_fragment();
		let a = dom.create_text("a");
		let b = dom.create_element("b", Namespace::Html);
		dom.insert_before(&fragment, &a, None);
		dom.insert_before(&fragment, &b, None);
		dom.reset_mutations();

		dom.insert_before(&parent, &fragment, None);
		assert_eq!(dom.children(parent), vec![a, b]);
		assert!(dom.children(fragment).is_empty());
		assert_eq!(dom.mutations().inserted, 2);
		assert_eq!(dom.mutations().moved, 0);
	}

	#[test]
	fn moving_an_attached_node_counts_as_a_move() {
		let dom = MemoryDom::new();
		let parent = dom.create_element("ul", Namespace::Html);
		let first = dom.create_element("li", Namespace::Html);
		let second = dom.create_element("li", Namespace::Html);
		dom.insert_before(&parent, &first, None);
		dom.insert_before(&parent, &second, None);
		dom.reset_mutations();

		dom.insert_before(&parent, &second, Some(&first));
		assert_eq!(dom.children(parent), vec![second, first]);
		assert_eq!(dom.mutations().moved, 1);
		assert_eq!(dom.mutations().writes(), 1);
	}

	#[test]
	fn markup_escapes_text_and_skips_markers() {
		let dom = MemoryDom::new();
		let parent = dom.create_element("div", Namespace::Html);
		let marker = dom.create_comment("");
		let text = dom.create_text("<b>&</b>");
		let input = dom.create_element("input", Namespace::Html);
		dom.set_attribute(&input, "value", "\"x\"");
		for node in [marker, text, input] {
			dom.insert_before(&parent, &node, None);
		}

		assert_eq!(dom.inner_html(parent), "<!---->&lt;b&gt;&amp;&lt;/b&gt;<input value=\"&quot;x&quot;\">");
		assert_eq!(dom.markup(parent), "&lt;b&gt;&amp;&lt;/b&gt;<input value=\"&quot;x&quot;\">");
		assert_eq!(dom.text_content(parent), "<b>&</b>");
	}

	#[test]
	fn once_listeners_are_removed_after_dispatch() {
		let dom = MemoryDom::new();
		let button = dom.create_element("button", Namespace::Html);
		let calls = Rc::new(core::cell::Cell::new(0));
		let counter = Rc::clone(&calls);
		dom.add_listener(
			&button,
			"click",
			ListenerOptions {
				once: true,
				..ListenerOptions::default()
			},
			Rc::new(move |_: &Event| counter.set(counter.get() + 1)),
		);

		assert_eq!(dom.dispatch(button, "click"), 1);
		assert_eq!(dom.dispatch(button, "click"), 0);
		assert_eq!(calls.get(), 1);
		assert_eq!(dom.listener_count(button), 0);
	}

	#[test]
	fn capture_runs_before_bubbling() {
		let dom = MemoryDom::new();
		let outer = dom.create_element("div", Namespace::Html);
		let inner = dom.create_element("span", Namespace::Html);
		dom.insert_before(&outer, &inner, None);

		let log = Rc::new(RefCell::new(Vec::new()));
		for (node, capture, label) in [(outer, false, "outer bubble"), (inner, false, "inner"), (outer, true, "outer capture")] {
			let log = Rc::clone(&log);
			dom.add_listener(
				&node,
				"click",
				ListenerOptions {
					capture,
					..ListenerOptions::default()
				},
				Rc::new(move |event: &Event| {
					assert_eq!(event.target(), inner);
					log.borrow_mut().push(label);
				}),
			);
		}

		assert_eq!(dom.dispatch(inner, "click"), 3);
		assert_eq!(*log.borrow(), vec!["outer capture", "inner", "outer bubble"]);
	}
}
