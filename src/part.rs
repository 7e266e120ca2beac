//! Parts: the live binding sites of a template instance, and the commit logic for each kind.
//!
//! Every part is a shared handle (`Rc<RefCell<…>>`) to its state, so that [`PartHandle`](`crate::directive::PartHandle`)s
//! can refer back to it weakly. Parts remember what they committed last and skip DOM writes for identical values.

use crate::{
	directive::{self, PartInfo, Slot},
	dom::{Dom, EventHandler, ListenerOptions},
	error::Error,
	instance::TemplateInstance,
	keyed::{self, Placement},
	template::{PartKind, TemplateCache, TemplateKey},
	sanitize::{SanitizerFactory, SinkKind, ValueSanitizer},
	value::{EventListener, Key, TemplateResult, Value},
};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt, mem,
};
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, trace, trace_span, warn};

/// Shared by all parts created under one render root.
pub(crate) struct Scope<D: Dom> {
	pub dom: D,
	pub templates: Rc<TemplateCache>,
	pub host: Option<Rc<dyn Any>>,
	pub sanitizer: Option<SanitizerFactory<D>>,
	/// How many commits or connection changes are currently running.
	depth: Cell<usize>,
	deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}
impl<D: Dom> Scope<D> {
	pub(crate) fn new(
		dom: D,
		templates: Rc<TemplateCache>,
		host: Option<Rc<dyn Any>>,
		sanitizer: Option<SanitizerFactory<D>>,
	) -> Self {
		Self {
			dom,
			templates,
			host,
			sanitizer,
			depth: Cell::new(0),
			deferred: RefCell::default(),
		}
	}

	/// Runs `f`, then any tasks [deferred](`Scope::defer`) meanwhile once no other batch is running.
	pub(crate) fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
		self.depth.set(self.depth.get() + 1);
		let result = f();
		self.depth.set(self.depth.get() - 1);
		if self.depth.get() == 0 {
			self.flush();
		}
		result
	}

	/// Runs `task` now, or after the current batch if parts may still be borrowed.
	pub(crate) fn defer(&self, task: Box<dyn FnOnce()>) {
		if self.depth.get() == 0 {
			self.batch(task);
		} else {
			self.deferred.borrow_mut().push_back(task);
		}
	}

	fn flush(&self) {
		loop {
			let next = self.deferred.borrow_mut().pop_front();
			let Some(task) = next else { break };
			trace!("Running a deferred task.");
			self.depth.set(1);
			task();
			self.depth.set(0);
		}
	}

	fn sanitizer_for(&self, node: &D::Node, name: &str, kind: SinkKind) -> Option<ValueSanitizer<D>> {
		self.sanitizer.as_ref().map(|factory| factory(node, name, kind))
	}
}

fn sanitized<D: Dom>(sanitizer: Option<&ValueSanitizer<D>>, value: Value<D>) -> Value<D> {
	match sanitizer {
		Some(sanitizer) => sanitizer(value),
		None => value,
	}
}

/// A part of any kind, as stored in a [`TemplateInstance`].
pub enum Part<D: Dom> {
	Child(ChildPart<D>),
	Attribute(AttributePart<D>),
	Element(ElementPart<D>),
	RawText(RawTextPart<D>),
}
impl<D: Dom> Part<D> {
	#[must_use]
	pub fn kind(&self) -> PartKind {
		match self {
			Part::Child(_) => PartKind::Child,
			Part::Attribute(part) => part.kind(),
			Part::Element(_) => PartKind::Element,
			Part::RawText(_) => PartKind::RawText,
		}
	}

	pub(crate) fn set_connected(&self, connected: bool) {
		match self {
			Part::Child(part) => part.set_connected(connected),
			Part::Attribute(part) => part.set_connected(connected),
			Part::Element(part) => part.set_connected(connected),
			Part::RawText(part) => part.set_connected(connected),
		}
	}
}
impl<D: Dom> fmt::Debug for Part<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Part").field(&self.kind()).finish()
	}
}

/// Mutable access to one part's state, as handed to directives.
pub(crate) enum PartMut<'a, D: Dom> {
	Child(&'a mut ChildPartState<D>),
	Attribute {
		state: &'a mut AttributePartState<D>,
		index: usize,
	},
	Element(&'a mut ElementPartState<D>),
	RawText(&'a mut RawTextPartState<D>),
}
impl<'a, D: Dom> PartMut<'a, D> {
	pub(crate) fn reborrow(&mut self) -> PartMut<'_, D> {
		match self {
			PartMut::Child(state) => PartMut::Child(&mut **state),
			PartMut::Attribute { state, index } => PartMut::Attribute {
				state: &mut **state,
				index: *index,
			},
			PartMut::Element(state) => PartMut::Element(&mut **state),
			PartMut::RawText(state) => PartMut::RawText(&mut **state),
		}
	}

	pub(crate) fn scope(&self) -> &Rc<Scope<D>> {
		match self {
			PartMut::Child(state) => &state.scope,
			PartMut::Attribute { state, .. } => &state.scope,
			PartMut::Element(state) => &state.scope,
			PartMut::RawText(state) => &state.scope,
		}
	}

	pub(crate) fn kind(&self) -> PartKind {
		match self {
			PartMut::Child(_) => PartKind::Child,
			PartMut::Attribute { state, .. } => state.kind,
			PartMut::Element(_) => PartKind::Element,
			PartMut::RawText(_) => PartKind::RawText,
		}
	}

	pub(crate) fn name(&self) -> Option<&str> {
		match self {
			PartMut::Attribute { state, .. } => Some(&state.name),
			_ => None,
		}
	}

	pub(crate) fn element(&self) -> Option<&D::Node> {
		match self {
			PartMut::Child(_) => None,
			PartMut::Attribute { state, .. } => Some(&state.element),
			PartMut::Element(state) => Some(&state.element),
			PartMut::RawText(state) => Some(&state.element),
		}
	}

	pub(crate) fn is_connected(&self) -> bool {
		match self {
			PartMut::Child(state) => state.connected,
			PartMut::Attribute { state, .. } => state.connected,
			PartMut::Element(state) => state.connected,
			PartMut::RawText(state) => state.connected,
		}
	}

	pub(crate) fn info(&self) -> PartInfo<'_, D> {
		PartInfo {
			kind: self.kind(),
			name: self.name(),
			strings: match self {
				PartMut::Attribute { state, .. } => state.strings.as_deref(),
				_ => None,
			},
			element: self.element(),
		}
	}

	pub(crate) fn target(&self) -> WeakTarget<D> {
		match self {
			PartMut::Child(state) => WeakTarget::Child(state.this.clone()),
			PartMut::Attribute { state, index } => WeakTarget::Attribute(state.this.clone(), *index),
			PartMut::Element(state) => WeakTarget::Element(state.this.clone()),
			PartMut::RawText(state) => WeakTarget::RawText(state.this.clone()),
		}
	}

	pub(crate) fn reset_committed(&mut self) {
		match self {
			PartMut::Child(state) => state.committed = Committed::Empty,
			PartMut::Attribute { state, index } => state.committed[*index] = None,
			PartMut::Element(_) => (),
			PartMut::RawText(state) => state.committed = None,
		}
	}
}

/// A weak reference to a part, plus where in it values go.
pub(crate) enum WeakTarget<D: Dom> {
	Child(Weak<RefCell<ChildPartState<D>>>),
	Attribute(Weak<RefCell<AttributePartState<D>>>, usize),
	Element(Weak<RefCell<ElementPartState<D>>>),
	RawText(Weak<RefCell<RawTextPartState<D>>>),
}
impl<D: Dom> Clone for WeakTarget<D> {
	fn clone(&self) -> Self {
		match self {
			WeakTarget::Child(part) => WeakTarget::Child(part.clone()),
			WeakTarget::Attribute(part, index) => WeakTarget::Attribute(part.clone(), *index),
			WeakTarget::Element(part) => WeakTarget::Element(part.clone()),
			WeakTarget::RawText(part) => WeakTarget::RawText(part.clone()),
		}
	}
}
impl<D: Dom> WeakTarget<D> {
	pub(crate) fn is_alive(&self) -> bool {
		match self {
			WeakTarget::Child(part) => part.strong_count() > 0,
			WeakTarget::Attribute(part, _) => part.strong_count() > 0,
			WeakTarget::Element(part) => part.strong_count() > 0,
			WeakTarget::RawText(part) => part.strong_count() > 0,
		}
	}

	pub(crate) fn commit_from(&self, level: usize, value: Value<D>) -> Result<(), Error> {
		match self {
			WeakTarget::Child(part) => with_state(part, |state| state.commit_from(level, value)),
			WeakTarget::Attribute(part, index) => with_state(part, |state| state.commit_values(Some((*index, value)), level)),
			WeakTarget::Element(part) => with_state(part, |state| state.commit_from(level, value)),
			WeakTarget::RawText(part) => with_state(part, |state| state.commit_from(level, value)),
		}
	}
}

fn with_state<S>(part: &Weak<RefCell<S>>, commit: impl FnOnce(&mut S) -> Result<(), Error>) -> Result<(), Error> {
	let Some(part) = part.upgrade() else {
		trace!("Ignoring a value pushed to a dropped part.");
		return Ok(());
	};
	let Ok(mut state) = part.try_borrow_mut() else {
		warn!("Ignoring a value pushed to a part while that part is being committed.");
		return Ok(());
	};
	commit(&mut state)
}

fn log_commit<D: Dom>(kind: PartKind, value: &Value<D>) {
	if cfg!(feature = "dangerous-logging") {
		trace!("Committing {:?} to a {} part.", value, kind);
	} else {
		trace!("Committing a {} value to a {} part.", value.variant_name(), kind);
	}
}

/// Removes `from` and its following siblings up to (excluding) `end`.
fn remove_range<D: Dom>(dom: &D, from: Option<D::Node>, end: Option<&D::Node>) {
	let mut next = from;
	while let Some(node) = next {
		if Some(&node) == end {
			break;
		}
		next = dom.next_sibling(&node);
		dom.remove(&node);
	}
}

enum Committed<D: Dom> {
	Empty,
	Text {
		value: Value<D>,
		node: D::Node,
		sanitizer: Option<ValueSanitizer<D>>,
	},
	Node(D::Node),
	Template(TemplateInstance<D>),
	List(Vec<ChildPart<D>>),
	Keyed(Vec<(Key, ChildPart<D>)>),
}
impl<D: Dom> Committed<D> {
	fn set_connected(&mut self, connected: bool) {
		match self {
			Committed::Empty | Committed::Text { .. } | Committed::Node(_) => (),
			Committed::Template(instance) => instance.set_connected(connected),
			Committed::List(parts) => {
				for part in parts {
					part.set_connected(connected);
				}
			}
			Committed::Keyed(parts) => {
				for (_, part) in parts {
					part.set_connected(connected);
				}
			}
		}
	}
}

/// A template instance taken out of the document by [`ChildPartState::detach_template`], with its nodes.
pub struct DetachedTemplate<D: Dom> {
	instance: TemplateInstance<D>,
	fragment: D::Node,
}
impl<D: Dom> DetachedTemplate<D> {
	#[must_use]
	pub fn key(&self) -> TemplateKey {
		self.instance.template().key()
	}
}

/// A region between two sibling nodes that holds any [`Value`].
///
/// The region starts after an empty marker comment and ends before `end`, or at the end of the parent if there is none.
pub struct ChildPart<D: Dom>(Rc<RefCell<ChildPartState<D>>>);
impl<D: Dom> Clone for ChildPart<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<D: Dom> fmt::Debug for ChildPart<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(state) => f
				.debug_struct("ChildPart")
				.field("start", &state.start)
				.field("end", &state.end)
				.field("connected", &state.connected)
				.finish(),
			Err(_) => f.debug_struct("ChildPart").finish_non_exhaustive(),
		}
	}
}

/// The state behind a [`ChildPart`].
pub struct ChildPartState<D: Dom> {
	scope: Rc<Scope<D>>,
	this: Weak<RefCell<ChildPartState<D>>>,
	start: D::Node,
	end: Option<D::Node>,
	committed: Committed<D>,
	directives: Vec<Slot<D>>,
	connected: bool,
}

impl<D: Dom> ChildPart<D> {
	pub(crate) fn new(scope: Rc<Scope<D>>, start: D::Node, end: Option<D::Node>, connected: bool) -> Self {
		Self(Rc::new_cyclic(|this| {
			RefCell::new(ChildPartState {
				scope,
				this: this.clone(),
				start,
				end,
				committed: Committed::Empty,
				directives: Vec::new(),
				connected,
			})
		}))
	}

	/// Commits `value` into this region.
	///
	/// # Errors
	///
	/// Iff a template in `value` is malformed, a directive rejects its placement or values don't fit their template.
	/// Content committed before the error stays in place.
	pub fn commit(&self, value: impl Into<Value<D>>) -> Result<(), Error> {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| self.0.borrow_mut().commit_from(0, value.into()))
	}

	/// Notifies directives in and below this part that it left (or re-entered) the document.
	pub fn set_connected(&self, connected: bool) {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| self.0.borrow_mut().set_connected(connected));
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.0.borrow().connected
	}

	#[must_use]
	pub fn start_node(&self) -> D::Node {
		self.0.borrow().start.clone()
	}

	#[must_use]
	pub fn end_node(&self) -> Option<D::Node> {
		self.0.borrow().end.clone()
	}

	/// Moves this part's nodes, markers included, before `reference`.
	fn move_before(&self, parent: &D::Node, reference: Option<&D::Node>) {
		let state = self.0.borrow();
		let dom = &state.scope.dom;
		let after = state.end.as_ref().and_then(|end| dom.next_sibling(end));
		if after.as_ref() == reference {
			return;
		}
		let mut next = Some(state.start.clone());
		while let Some(node) = next {
			if Some(&node) == after.as_ref() {
				break;
			}
			next = dom.next_sibling(&node);
			dom.insert_before(parent, &node, reference);
		}
	}

	/// Disconnects this part and removes its nodes, markers included.
	fn dispose(&self) {
		let mut state = self.0.borrow_mut();
		state.set_connected(false);
		directive::truncate_chain(&mut state.directives, 0);
		let dom = &state.scope.dom;
		let after = state.end.as_ref().and_then(|end| dom.next_sibling(end));
		remove_range(dom, Some(state.start.clone()), after.as_ref());
	}

	/// Clears the region and removes the start marker, leaving no trace in the document.
	pub(crate) fn unmount(&self) -> Result<(), Error> {
		self.commit(Value::Nothing)?;
		let mut state = self.0.borrow_mut();
		state.set_connected(false);
		directive::truncate_chain(&mut state.directives, 0);
		state.scope.dom.remove(&state.start);
		Ok(())
	}
}

impl<D: Dom> ChildPartState<D> {
	#[must_use]
	pub fn dom(&self) -> &D {
		&self.scope.dom
	}

	#[must_use]
	pub fn start_node(&self) -> &D::Node {
		&self.start
	}

	#[must_use]
	pub fn end_node(&self) -> Option<&D::Node> {
		self.end.as_ref()
	}

	#[must_use]
	pub fn parent_node(&self) -> Option<D::Node> {
		self.scope.dom.parent(&self.start)
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.connected
	}

	/// The key of the template instance currently rendered here, if any.
	#[must_use]
	pub fn template_key(&self) -> Option<TemplateKey> {
		match &self.committed {
			Committed::Template(instance) => Some(instance.template().key()),
			_ => None,
		}
	}

	/// Takes the current template instance out of the document without destroying it.
	///
	/// The instance is disconnected and its nodes are moved into a fragment. The region is left empty.
	pub fn detach_template(&mut self) -> Option<DetachedTemplate<D>> {
		let mut instance = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::Template(instance) => instance,
			other => {
				self.committed = other;
				return None;
			}
		};
		instance.set_connected(false);

		let dom = &self.scope.dom;
		let fragment = dom.create_fragment();
		let mut next = dom.next_sibling(&self.start);
		while let Some(node) = next {
			if Some(&node) == self.end.as_ref() {
				break;
			}
			next = dom.next_sibling(&node);
			dom.insert_before(&fragment, &node, None);
		}
		trace!("Detached a template instance.");
		Some(DetachedTemplate { instance, fragment })
	}

	/// Replaces the region's content with a previously detached template instance.
	pub fn attach_template(&mut self, detached: DetachedTemplate<D>) {
		let DetachedTemplate { mut instance, fragment } = detached;
		self.clear();
		self.insert(&fragment);
		if self.connected {
			instance.set_connected(true);
		}
		self.committed = Committed::Template(instance);
		trace!("Attached a template instance.");
	}

	fn commit_from(&mut self, level: usize, value: Value<D>) -> Result<(), Error> {
		let value = if self.directives.is_empty() && !matches!(value, Value::Directive(_)) {
			value
		} else {
			let mut chain = mem::take(&mut self.directives);
			let resolved = directive::resolve(&mut chain, level, value, &mut PartMut::Child(self));
			self.directives = chain;
			resolved?
		};
		self.commit_resolved(value)
	}

	fn commit_resolved(&mut self, value: Value<D>) -> Result<(), Error> {
		log_commit(PartKind::Child, &value);
		match value {
			Value::NoChange => Ok(()),
			Value::Nothing | Value::Null => {
				self.clear();
				Ok(())
			}
			Value::Template(result) => self.commit_template(result),
			Value::Node(node) => {
				self.commit_node(node);
				Ok(())
			}
			Value::List(items) => self.commit_list(&items),
			Value::Keyed(items) => self.commit_keyed(&items),
			Value::Directive(result) => unreachable!("lit-dom bug: unresolved directive {} reached a child part", result.name()),
			Value::Listener(_) => {
				warn!("Rendering an event listener as text. Did you mean to bind it with `@event=`?");
				self.commit_text(value);
				Ok(())
			}
			value @ (Value::Bool(_) | Value::Number(_) | Value::Str(_) | Value::Object(_)) => {
				self.commit_text(value);
				Ok(())
			}
		}
	}

	fn commit_text(&mut self, value: Value<D>) {
		if let Committed::Text { value: old, node, sanitizer } = &mut self.committed {
			if !old.same(&value) {
				let text = sanitized(sanitizer.as_ref(), value.clone()).to_text();
				self.scope.dom.set_text(node, &text);
				*old = value;
			}
			return;
		}
		let (node, sanitizer) = if self.scope.sanitizer.is_some() {
			let node = self.scope.dom.create_text("");
			let sanitizer = self.scope.sanitizer_for(&node, "data", SinkKind::Property);
			let text = sanitized(sanitizer.as_ref(), value.clone()).to_text();
			self.scope.dom.set_text(&node, &text);
			(node, sanitizer)
		} else {
			(self.scope.dom.create_text(&value.to_text()), None)
		};
		self.clear();
		self.insert(&node);
		self.committed = Committed::Text { value, node, sanitizer };
	}

	fn commit_node(&mut self, node: D::Node) {
		if matches!(&self.committed, Committed::Node(current) if *current == node) {
			return;
		}
		self.clear();
		self.insert(&node);
		self.committed = Committed::Node(node);
	}

	fn commit_template(&mut self, result: TemplateResult<D>) -> Result<(), Error> {
		let template = result.template(&self.scope.templates)?;
		let values = result.into_values();
		if let Committed::Template(instance) = &mut self.committed {
			if Rc::ptr_eq(instance.template(), &template) {
				return instance.update(values);
			}
		}

		let (fragment, mut instance) = TemplateInstance::create(template, &self.scope, self.connected);
		instance.update(values)?;
		self.clear();
		self.insert(&fragment);
		self.committed = Committed::Template(instance);
		Ok(())
	}

	fn commit_list(&mut self, items: &[Value<D>]) -> Result<(), Error> {
		let mut parts = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::List(parts) => parts,
			other => {
				self.committed = other;
				self.clear();
				Vec::with_capacity(items.len())
			}
		};

		let mut result = Ok(());
		for (index, item) in items.iter().enumerate() {
			if index == parts.len() {
				parts.push(self.create_item_part(self.end.as_ref()));
			}
			if let Err(error) = parts[index].commit(item.clone()) {
				result = Err(error);
				break;
			}
		}

		if result.is_ok() && parts.len() > items.len() {
			let removed = parts.split_off(items.len());
			trace!("Removing {} list item(s).", removed.len());
			for part in &removed {
				part.dispose();
			}
		}
		self.committed = Committed::List(parts);
		result
	}

	fn commit_keyed(&mut self, items: &[(Key, Value<D>)]) -> Result<(), Error> {
		let span = trace_span!("Reconciling keyed list", "items.len()" = items.len());
		let _enter = span.enter();

		let old = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::Keyed(old) => old,
			other => {
				self.committed = other;
				self.clear();
				Vec::new()
			}
		};

		let (old_keys, old_parts): (Vec<Key>, Vec<ChildPart<D>>) = old.into_iter().unzip();
		let new_keys: Vec<&Key> = items.iter().map(|(key, _)| key).collect();
		let old_key_refs: Vec<&Key> = old_keys.iter().collect();
		let script = keyed::diff(&old_key_refs, &new_keys);
		if script.duplicates > 0 {
			warn!("{} keyed item(s) repeat an earlier key and will be recreated on every render.", script.duplicates);
		}
		trace!(
			"Keyed update: {} removed, {} moved, {} inserted.",
			script.removed.len(),
			script.moves(),
			script.inserts()
		);

		// All removals (and their disconnections) happen before anything new is connected.
		let mut old_parts: Vec<Option<ChildPart<D>>> = old_parts.into_iter().map(Some).collect();
		for &index in &script.removed {
			if let Some(part) = old_parts[index].take() {
				part.dispose();
			}
		}

		let parent = self.parent_node();
		let mut new_parts: Vec<Option<ChildPart<D>>> = vec![None; items.len()];
		for (index, placement) in script.placements.iter().enumerate().rev() {
			let reference = new_parts
				.get(index + 1)
				.and_then(Option::as_ref)
				.map_or_else(|| self.end.clone(), |next| Some(next.start_node()));
			let part = match *placement {
				Placement::Keep(old) => old_parts[old].take(),
				Placement::Move(old) => old_parts[old].take().map(|part| {
					if let Some(parent) = &parent {
						part.move_before(parent, reference.as_ref());
					}
					part
				}),
				Placement::Insert => None,
			};
			new_parts[index] = Some(part.unwrap_or_else(|| self.create_item_part(reference.as_ref())));
		}

		let mut committed = Vec::with_capacity(items.len());
		let mut result = Ok(());
		for ((key, value), part) in items.iter().zip(new_parts.into_iter().flatten()) {
			if result.is_ok() {
				result = part.commit(value.clone());
			}
			committed.push((key.clone(), part));
		}
		self.committed = Committed::Keyed(committed);
		result
	}

	/// Inserts `node` at the end of the region.
	fn insert(&self, node: &D::Node) {
		match self.parent_node() {
			Some(parent) => self.scope.dom.insert_before(&parent, node, self.end.as_ref()),
			None => error!("Child part has no parent node. Dropping insertion."),
		}
	}

	fn create_item_part(&self, reference: Option<&D::Node>) -> ChildPart<D> {
		let dom = &self.scope.dom;
		let start = dom.create_comment("");
		let end = dom.create_comment("");
		match self.parent_node() {
			Some(parent) => {
				dom.insert_before(&parent, &start, reference);
				dom.insert_before(&parent, &end, reference);
			}
			None => error!("Child part has no parent node. Creating a detached list item."),
		}
		ChildPart::new(Rc::clone(&self.scope), start, Some(end), self.connected)
	}

	/// Disconnects and removes whatever was committed.
	fn clear(&mut self) {
		if matches!(self.committed, Committed::Empty) {
			return;
		}
		let mut committed = mem::replace(&mut self.committed, Committed::Empty);
		committed.set_connected(false);
		let dom = &self.scope.dom;
		remove_range(dom, dom.next_sibling(&self.start), self.end.as_ref());
	}

	fn set_connected(&mut self, connected: bool) {
		if self.connected == connected {
			return;
		}
		self.connected = connected;
		directive::set_chain_connected(&mut self.directives, connected);
		self.committed.set_connected(connected);
	}
}

/// Registered native listener whose callback can be swapped without touching the DOM.
struct NativeListener<D: Dom> {
	options: ListenerOptions,
	handler: Rc<RefCell<Option<EventHandler<D>>>>,
	registration: D::Listener,
}

/// An attribute, property, boolean attribute or event binding on one element.
pub struct AttributePart<D: Dom>(Rc<RefCell<AttributePartState<D>>>);
impl<D: Dom> Clone for AttributePart<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<D: Dom> fmt::Debug for AttributePart<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(state) => f
				.debug_struct("AttributePart")
				.field("kind", &state.kind)
				.field("name", &state.name)
				.field("element", &state.element)
				.finish(),
			Err(_) => f.debug_struct("AttributePart").finish_non_exhaustive(),
		}
	}
}

pub(crate) struct AttributePartState<D: Dom> {
	scope: Rc<Scope<D>>,
	this: Weak<RefCell<AttributePartState<D>>>,
	element: D::Node,
	name: String,
	kind: PartKind,
	strings: Option<Rc<[String]>>,
	/// [`None`] forces the next value to be written.
	committed: Vec<Option<Value<D>>>,
	directives: Vec<Vec<Slot<D>>>,
	listener: Option<NativeListener<D>>,
	/// Created on the first write of an attribute or property.
	sanitizer: Option<ValueSanitizer<D>>,
	connected: bool,
}

impl<D: Dom> AttributePart<D> {
	pub(crate) fn new(
		scope: Rc<Scope<D>>,
		element: D::Node,
		name: String,
		kind: PartKind,
		strings: Option<Rc<[String]>>,
		connected: bool,
	) -> Self {
		let value_count = strings.as_ref().map_or(1, |strings| strings.len() - 1);
		Self(Rc::new_cyclic(|this| {
			RefCell::new(AttributePartState {
				scope,
				this: this.clone(),
				element,
				name,
				kind,
				strings,
				committed: vec![Some(Value::Nothing); value_count],
				directives: (0..value_count).map(|_| Vec::new()).collect(),
				listener: None,
				sanitizer: None,
				connected,
			})
		}))
	}

	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.0.borrow().kind
	}

	#[must_use]
	pub fn name(&self) -> String {
		self.0.borrow().name.clone()
	}

	#[must_use]
	pub fn element(&self) -> D::Node {
		self.0.borrow().element.clone()
	}

	#[must_use]
	pub fn value_count(&self) -> usize {
		self.0.borrow().committed.len()
	}

	/// Commits the part's only value.
	///
	/// # Errors
	///
	/// Iff a directive in `value` rejects this part.
	pub fn commit(&self, value: impl Into<Value<D>>) -> Result<(), Error> {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| self.0.borrow_mut().commit_values(Some((0, value.into())), 0))
	}

	/// Commits all values of an interpolated binding at once. The attribute is written at most once.
	///
	/// # Errors
	///
	/// Iff there are too few or too many values, or a directive in one of them rejects this part.
	pub fn commit_all(&self, values: Vec<Value<D>>) -> Result<(), Error> {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| {
			let mut state = self.0.borrow_mut();
			if values.len() != state.committed.len() {
				return Err(Error::ValueCount {
					expected: state.committed.len(),
					found: values.len(),
				});
			}
			state.commit_values(values.into_iter().enumerate(), 0)
		})
	}

	pub fn set_connected(&self, connected: bool) {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| {
			let mut state = self.0.borrow_mut();
			if state.connected == connected {
				return;
			}
			state.connected = connected;
			for chain in &mut state.directives {
				directive::set_chain_connected(chain, connected);
			}
		});
	}
}

impl<D: Dom> AttributePartState<D> {
	fn resolve(&mut self, index: usize, level: usize, value: Value<D>) -> Result<Value<D>, Error> {
		if self.directives[index].is_empty() && !matches!(value, Value::Directive(_)) {
			return Ok(value);
		}
		let mut chain = mem::take(&mut self.directives[index]);
		let resolved = directive::resolve(&mut chain, level, value, &mut PartMut::Attribute { state: self, index });
		self.directives[index] = chain;
		resolved
	}

	fn commit_values(&mut self, values: impl IntoIterator<Item = (usize, Value<D>)>, level: usize) -> Result<(), Error> {
		let mut changed = false;
		let mut result = Ok(());
		for (index, value) in values {
			let value = match self.resolve(index, level, value) {
				Ok(value) => value,
				Err(error) => {
					result = Err(error);
					break;
				}
			};
			if matches!(value, Value::NoChange) {
				continue;
			}
			if self.committed[index].as_ref().map_or(false, |committed| committed.same(&value)) {
				continue;
			}
			log_commit(self.kind, &value);
			self.committed[index] = Some(value);
			changed = true;
		}
		if changed {
			self.write();
		}
		result
	}

	/// Writes the committed values to the element.
	fn write(&mut self) {
		let value = match &self.strings {
			None => self.committed[0].clone().unwrap_or(Value::Nothing),
			Some(_) if self.committed.iter().any(|value| matches!(value, Some(Value::Nothing))) => Value::Nothing,
			Some(strings) => {
				let mut text = strings[0].clone();
				for (value, string) in self.committed.iter().zip(&strings[1..]) {
					if let Some(value) = value {
						text.push_str(&value.to_text());
					}
					text.push_str(string);
				}
				Value::Str(text.into())
			}
		};

		if self.kind == PartKind::Event {
			self.write_listener(value);
			return;
		}

		if self.sanitizer.is_none() && matches!(self.kind, PartKind::Attribute | PartKind::Property) {
			let kind = if self.kind == PartKind::Attribute {
				SinkKind::Attribute
			} else {
				SinkKind::Property
			};
			self.sanitizer = self.scope.sanitizer_for(&self.element, &self.name, kind);
		}

		let dom = &self.scope.dom;
		match self.kind {
			PartKind::Attribute => {
				let value = if value.is_nullish() {
					value
				} else {
					sanitized(self.sanitizer.as_ref(), value)
				};
				if value.is_nullish() {
					dom.remove_attribute(&self.element, &self.name);
				} else {
					dom.set_attribute(&self.element, &self.name, &value.to_text());
				}
			}
			PartKind::BooleanAttribute => {
				if value.is_truthy() {
					dom.set_attribute(&self.element, &self.name, "");
				} else {
					dom.remove_attribute(&self.element, &self.name);
				}
			}
			PartKind::Property => match sanitized(self.sanitizer.as_ref(), value) {
				Value::Nothing => dom.set_property(&self.element, &self.name, &Value::Null),
				value => dom.set_property(&self.element, &self.name, &value),
			},
			PartKind::Event | PartKind::Child | PartKind::Element | PartKind::RawText => {
				error!("Attribute part has kind {}. Ignoring write.", self.kind);
			}
		}
	}

	fn write_listener(&mut self, value: Value<D>) {
		let next: Option<EventListener<D>> = match value {
			Value::Listener(listener) => Some(listener),
			Value::Nothing | Value::Null => None,
			_ => {
				warn!("Ignoring a {} value bound to event {:?}.", value.variant_name(), self.name);
				None
			}
		};

		if let (Some(native), Some(next)) = (&self.listener, &next) {
			if native.options == next.options() {
				*native.handler.borrow_mut() = Some(Rc::clone(next.handler()));
				trace!("Swapped the handler of event {:?}.", self.name);
				return;
			}
		}

		let dom = &self.scope.dom;
		if let Some(native) = self.listener.take() {
			dom.remove_listener(&self.element, &self.name, native.options, native.registration);
		}
		if let Some(next) = next {
			let handler = Rc::new(RefCell::new(Some(Rc::clone(next.handler()))));
			let current = Rc::clone(&handler);
			let shim: EventHandler<D> = Rc::new(move |event: &D::Event| {
				// Cloned out so that the handler can rebind this very event.
				let handler = current.borrow().clone();
				if let Some(handler) = handler {
					handler(event);
				}
			});
			let registration = dom.add_listener(&self.element, &self.name, next.options(), shim);
			self.listener = Some(NativeListener {
				options: next.options(),
				handler,
				registration,
			});
		}
	}
}

/// A binding in element position, `<div ${…}>`. Only directives can make use of it.
pub struct ElementPart<D: Dom>(Rc<RefCell<ElementPartState<D>>>);
impl<D: Dom> Clone for ElementPart<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

pub(crate) struct ElementPartState<D: Dom> {
	scope: Rc<Scope<D>>,
	this: Weak<RefCell<ElementPartState<D>>>,
	element: D::Node,
	directives: Vec<Slot<D>>,
	connected: bool,
}

impl<D: Dom> ElementPart<D> {
	pub(crate) fn new(scope: Rc<Scope<D>>, element: D::Node, connected: bool) -> Self {
		Self(Rc::new_cyclic(|this| {
			RefCell::new(ElementPartState {
				scope,
				this: this.clone(),
				element,
				directives: Vec::new(),
				connected,
			})
		}))
	}

	#[must_use]
	pub fn element(&self) -> D::Node {
		self.0.borrow().element.clone()
	}

	/// # Errors
	///
	/// Iff a directive in `value` rejects this part or fails to update.
	pub fn commit(&self, value: impl Into<Value<D>>) -> Result<(), Error> {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| self.0.borrow_mut().commit_from(0, value.into()))
	}

	pub fn set_connected(&self, connected: bool) {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| {
			let mut state = self.0.borrow_mut();
			if state.connected != connected {
				state.connected = connected;
				directive::set_chain_connected(&mut state.directives, connected);
			}
		});
	}
}

impl<D: Dom> ElementPartState<D> {
	fn commit_from(&mut self, level: usize, value: Value<D>) -> Result<(), Error> {
		let mut chain = mem::take(&mut self.directives);
		let resolved = directive::resolve(&mut chain, level, value, &mut PartMut::Element(self));
		self.directives = chain;
		match resolved? {
			Value::NoChange | Value::Nothing | Value::Null => (),
			value => trace!("Element part ignored a {} value.", value.variant_name()),
		}
		Ok(())
	}
}

/// The entire text content of a raw text element such as `<style>`.
///
/// Values are only ever written as text, never parsed.
pub struct RawTextPart<D: Dom>(Rc<RefCell<RawTextPartState<D>>>);
impl<D: Dom> Clone for RawTextPart<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

pub(crate) struct RawTextPartState<D: Dom> {
	scope: Rc<Scope<D>>,
	this: Weak<RefCell<RawTextPartState<D>>>,
	element: D::Node,
	text: D::Node,
	committed: Option<Value<D>>,
	directives: Vec<Slot<D>>,
	sanitizer: Option<ValueSanitizer<D>>,
	connected: bool,
}

impl<D: Dom> RawTextPart<D> {
	pub(crate) fn new(scope: Rc<Scope<D>>, element: D::Node, text: D::Node, connected: bool) -> Self {
		Self(Rc::new_cyclic(|this| {
			RefCell::new(RawTextPartState {
				scope,
				this: this.clone(),
				element,
				text,
				committed: Some(Value::Nothing),
				directives: Vec::new(),
				sanitizer: None,
				connected,
			})
		}))
	}

	/// # Errors
	///
	/// Iff a directive in `value` rejects this part.
	pub fn commit(&self, value: impl Into<Value<D>>) -> Result<(), Error> {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| self.0.borrow_mut().commit_from(0, value.into()))
	}

	pub fn set_connected(&self, connected: bool) {
		let scope = Rc::clone(&self.0.borrow().scope);
		scope.batch(|| {
			let mut state = self.0.borrow_mut();
			if state.connected != connected {
				state.connected = connected;
				directive::set_chain_connected(&mut state.directives, connected);
			}
		});
	}
}

impl<D: Dom> RawTextPartState<D> {
	fn commit_from(&mut self, level: usize, value: Value<D>) -> Result<(), Error> {
		let value = if self.directives.is_empty() && !matches!(value, Value::Directive(_)) {
			value
		} else {
			let mut chain = mem::take(&mut self.directives);
			let resolved = directive::resolve(&mut chain, level, value, &mut PartMut::RawText(self));
			self.directives = chain;
			resolved?
		};
		if matches!(value, Value::NoChange) || self.committed.as_ref().map_or(false, |committed| committed.same(&value)) {
			return Ok(());
		}
		log_commit(PartKind::RawText, &value);
		if matches!(value, Value::Template(_) | Value::Node(_) | Value::Listener(_)) {
			warn!("Raw text elements can only contain text. Rendering a {} value as text.", value.variant_name());
		}
		if self.sanitizer.is_none() {
			self.sanitizer = self.scope.sanitizer_for(&self.text, "data", SinkKind::Property);
		}
		let text = sanitized(self.sanitizer.as_ref(), value.clone()).to_text();
		self.scope.dom.set_text(&self.text, &text);
		self.committed = Some(value);
		Ok(())
	}
}
