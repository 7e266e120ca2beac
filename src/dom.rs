//! The host abstraction every part writes through.
//!
//! Parts never touch a concrete document directly. Instead, each render root is bound to a [`Dom`] implementation,
//! which the crate ships two of:
//!
//! - [`MemoryDom`](`crate::memory::MemoryDom`), an arena-backed document that counts its mutations,
//! - and `WebDom` (feature `"web"`), which forwards to [`web_sys`](https://docs.rs/web-sys/).

use crate::value::Value;
use core::fmt::Debug;
use std::rc::Rc;

/// Element namespaces a template can create nodes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
	MathMl,
}
impl Namespace {
	#[must_use]
	pub const fn uri(self) -> &'static str {
		match self {
			Namespace::Html => "http://www.w3.org/1999/xhtml",
			Namespace::Svg => "http://www.w3.org/2000/svg",
			Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
		}
	}
}

/// Options an event listener is registered with.
///
/// A change here causes the native listener to be re-registered, since the options can't be updated in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct ListenerOptions {
	pub capture: bool,
	pub once: bool,
	pub passive: bool,
}

/// A shared event callback.
pub type EventHandler<D> = Rc<dyn Fn(&<D as Dom>::Event)>;

/// A document that templates can be instantiated into.
///
/// Handles are cheap to clone. Node handles must compare equal exactly when they refer to the same node.
pub trait Dom: Clone + Debug + 'static {
	type Node: Clone + Eq + Debug + 'static;
	type Event: 'static;
	/// Keeps a registered native listener alive until it's passed back to [`Dom::remove_listener`].
	type Listener: 'static;

	fn create_element(&self, name: &str, namespace: Namespace) -> Self::Node;
	fn create_text(&self, data: &str) -> Self::Node;
	fn create_comment(&self, data: &str) -> Self::Node;
	fn create_fragment(&self) -> Self::Node;

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Inserts `node` into `parent` before `reference`, or at the end if `reference` is [`None`].
	///
	/// Like the browser's `insertBefore`, this moves `node` if it's already attached somewhere
	/// and inserts the children of fragments instead of the fragment itself.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);

	/// Detaches `node` from its parent, if any.
	fn remove(&self, node: &Self::Node);

	/// A number identifying `node` among all nodes of this host, stable for as long as the node exists.
	///
	/// Render roots are keyed by it.
	fn node_key(&self, node: &Self::Node) -> u64;

	/// Sets the data of a text or comment node.
	fn set_text(&self, node: &Self::Node, data: &str);

	fn tag_name(&self, element: &Self::Node) -> String;

	fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str);
	fn remove_attribute(&self, element: &Self::Node, name: &str);

	fn property(&self, element: &Self::Node, name: &str) -> Value<Self>;
	fn set_property(&self, element: &Self::Node, name: &str, value: &Value<Self>);

	fn add_listener(&self, element: &Self::Node, event: &str, options: ListenerOptions, handler: EventHandler<Self>) -> Self::Listener;
	fn remove_listener(&self, element: &Self::Node, event: &str, options: ListenerOptions, listener: Self::Listener);
}
