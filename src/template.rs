//! Compiled templates and the per-call-site cache.
//!
//! A template is compiled from its static strings exactly once per [`TemplateCache`].
//! The cache is keyed by the *address* of the [`TemplateStrings`] the template macros place in a `static`,
//! so lookups never hash or compare template text.

use crate::{dom::Namespace, error::TemplateError, parse};
use core::{
	cell::{Cell, RefCell},
	fmt,
	sync::atomic::{AtomicU64, Ordering},
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, trace, trace_span};

/// The static parts of one template call site.
///
/// There is always exactly one more string than the template has bindings.
#[derive(Debug)]
pub struct TemplateStrings {
	strings: &'static [&'static str],
}
impl TemplateStrings {
	#[must_use]
	pub const fn new(strings: &'static [&'static str]) -> Self {
		Self { strings }
	}

	#[must_use]
	pub fn strings(&self) -> &'static [&'static str] {
		self.strings
	}
}

/// Which namespace a template's top-level nodes are created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
	Html,
	Svg,
	MathMl,
}
impl TemplateKind {
	#[must_use]
	pub fn namespace(self) -> Namespace {
		match self {
			TemplateKind::Html => Namespace::Html,
			TemplateKind::Svg => Namespace::Svg,
			TemplateKind::MathMl => Namespace::MathMl,
		}
	}
}

/// Template identity.
///
/// Equal keys mean the same template, which lets a child position update an existing instance in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateKey(KeyRepr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyRepr {
	Static(usize, TemplateKind),
	Dynamic(u64),
}

impl TemplateKey {
	pub(crate) fn of_static(strings: &'static TemplateStrings, kind: TemplateKind) -> Self {
		Self(KeyRepr::Static(core::ptr::addr_of!(*strings) as usize, kind))
	}

	fn dynamic() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(KeyRepr::Dynamic(NEXT.fetch_add(1, Ordering::Relaxed)))
	}
}

/// The kind of a binding site and of the part created for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
	/// Between nodes.
	Child,
	/// `name=${…}`, including interpolations like `name="a ${…} b"`.
	Attribute,
	/// `.name=${…}`
	Property,
	/// `?name=${…}`
	BooleanAttribute,
	/// `@name=${…}`
	Event,
	/// `<div ${…}>`
	Element,
	/// The entire text of a `<script>`, `<style>`, `<textarea>` or `<title>`.
	RawText,
}
impl fmt::Display for PartKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			PartKind::Child => "child",
			PartKind::Attribute => "attribute",
			PartKind::Property => "property",
			PartKind::BooleanAttribute => "boolean attribute",
			PartKind::Event => "event",
			PartKind::Element => "element",
			PartKind::RawText => "raw text",
		})
	}
}

/// One node of a template's static tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticNode {
	Element {
		name: String,
		namespace: Namespace,
		attributes: Vec<(String, String)>,
		children: Vec<StaticNode>,
	},
	Text(String),
	Comment(String),
	/// An empty comment that anchors a child binding.
	Marker,
}

/// Where a template's binding goes, and what kind of part it becomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
	pub(crate) kind: PartKind,
	pub(crate) node_index: usize,
	pub(crate) path: Box<[usize]>,
	pub(crate) name: Option<String>,
	pub(crate) strings: Option<Rc<[String]>>,
}
impl Binding {
	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.kind
	}

	/// Pre-order index of the bound node in the template's static tree.
	#[must_use]
	pub fn node_index(&self) -> usize {
		self.node_index
	}

	/// Child indices leading from the template's top level to the bound node.
	#[must_use]
	pub fn path(&self) -> &[usize] {
		&self.path
	}

	/// Attribute, property or event name, without prefix.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Static text around an attribute-like binding's values. [`None`] if the binding is a single bare value.
	#[must_use]
	pub fn strings(&self) -> Option<&[String]> {
		self.strings.as_deref()
	}

	/// How many of the template's values this binding consumes.
	#[must_use]
	pub fn value_count(&self) -> usize {
		self.strings.as_ref().map_or(1, |strings| strings.len() - 1)
	}
}

/// A compiled template: a static tree plus the bindings into it, in value order.
pub struct Template {
	key: TemplateKey,
	kind: TemplateKind,
	nodes: Vec<StaticNode>,
	bindings: Vec<Binding>,
	value_count: usize,
}
impl Template {
	/// Compiles a template that isn't cached, with a fresh identity.
	///
	/// # Errors
	///
	/// Iff the strings are malformed.
	pub fn compile(strings: &[&str], kind: TemplateKind) -> Result<Self, TemplateError> {
		Self::compile_with_key(strings, kind, TemplateKey::dynamic())
	}

	fn compile_with_key(strings: &[&str], kind: TemplateKind, key: TemplateKey) -> Result<Self, TemplateError> {
		let parse::Parsed { nodes, bindings } = parse::parse(strings, kind)?;
		let value_count = bindings.iter().map(Binding::value_count).sum();
		debug_assert_eq!(value_count, strings.len() - 1);
		Ok(Self {
			key,
			kind,
			nodes,
			bindings,
			value_count,
		})
	}

	#[must_use]
	pub fn key(&self) -> TemplateKey {
		self.key
	}

	#[must_use]
	pub fn kind(&self) -> TemplateKind {
		self.kind
	}

	#[must_use]
	pub fn nodes(&self) -> &[StaticNode] {
		&self.nodes
	}

	#[must_use]
	pub fn bindings(&self) -> &[Binding] {
		&self.bindings
	}

	#[must_use]
	pub fn value_count(&self) -> usize {
		self.value_count
	}
}
impl fmt::Debug for Template {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Template")
			.field("key", &self.key)
			.field("kind", &self.kind)
			.field("nodes", &self.nodes.len())
			.field("bindings", &self.bindings)
			.finish()
	}
}

/// Compiled templates by call site.
///
/// Entries are never evicted, as the number of call sites in a program is fixed.
#[derive(Debug, Default)]
pub struct TemplateCache {
	templates: RefCell<HashMap<TemplateKey, Rc<Template>>>,
	compilations: Cell<usize>,
}

thread_local! {
	static SHARED: Rc<TemplateCache> = Rc::new(TemplateCache::new());
}

impl TemplateCache {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The thread's default cache, used by [`Renderer::new`](`crate::render::Renderer::new`).
	#[must_use]
	pub fn shared() -> Rc<Self> {
		SHARED.with(Rc::clone)
	}

	/// # Errors
	///
	/// Iff the template is malformed. Failed compilations are not cached.
	pub fn get_or_compile(&self, strings: &'static TemplateStrings, kind: TemplateKind) -> Result<Rc<Template>, TemplateError> {
		let key = TemplateKey::of_static(strings, kind);
		if let Some(template) = self.templates.borrow().get(&key) {
			return Ok(Rc::clone(template));
		}

		let span = trace_span!("Compiling template", ?key);
		let _enter = span.enter();
		let template = Rc::new(Template::compile_with_key(strings.strings(), kind, key)?);
		self.compilations.set(self.compilations.get() + 1);
		debug!(
			"Compiled template with {} binding(s) and {} top-level node(s).",
			template.bindings.len(),
			template.nodes.len()
		);
		if cfg!(feature = "log-paths") {
			for binding in &template.bindings {
				trace!("{} binding at {:?}", binding.kind, binding.path);
			}
		}
		self.templates.borrow_mut().insert(key, Rc::clone(&template));
		Ok(template)
	}

	/// How many templates were compiled so far.
	#[must_use]
	pub fn compilations(&self) -> usize {
		self.compilations.get()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.templates.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.templates.borrow().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	static GREETING: TemplateStrings = TemplateStrings::new(&["<p>Hello ", "!</p>"]);
	static OTHER: TemplateStrings = TemplateStrings::new(&["<p>Hello ", "!</p>"]);

	#[test]
	fn call_sites_compile_once() {
		let cache = TemplateCache::new();
		let first = cache.get_or_compile(&GREETING, TemplateKind::Html).unwrap();
		let second = cache.get_or_compile(&GREETING, TemplateKind::Html).unwrap();
		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(cache.compilations(), 1);

		// Identical text at another call site is another template.
		let other = cache.get_or_compile(&OTHER, TemplateKind::Html).unwrap();
		assert!(!Rc::ptr_eq(&first, &other));
		assert_ne!(first.key(), other.key());
		assert_eq!(cache.compilations(), 2);
	}

	#[test]
	fn dynamic_templates_are_distinct() {
		let a = Template::compile(&["<b></b>"], TemplateKind::Html).unwrap();
		let b = Template::compile(&["<b></b>"], TemplateKind::Html).unwrap();
		assert_ne!(a.key(), b.key());
		assert_eq!(a.value_count(), 0);
	}
}
