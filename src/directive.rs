//! The directive protocol.
//!
//! A [`Directive`] is a stateful object that takes control of the part it's bound to.
//! Binding a [`DirectiveResult`] (usually created through [`directive`]) to a part constructs the directive
//! on first use and then reuses that same instance for as long as results of the same directive type keep
//! arriving at that part. Each render calls [`Directive::update`] with the new props, and whatever value that
//! returns is committed in its place, so directives can nest.
//!
//! Directives are told when their part is disconnected from or reconnected to the document,
//! and can push values asynchronously through a [`PartHandle`].
//!
//! ```
//! use lit_dom::{
//!     directive::{directive, Directive, PartInfo},
//!     dom::Dom,
//!     error::DirectiveError,
//!     value::Value,
//! };
//!
//! /// Counts how often it was rendered.
//! struct RenderCount(u32);
//!
//! impl<D: Dom> Directive<D> for RenderCount {
//!     type Props = ();
//!
//!     fn new(_: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
//!         Ok(Self(0))
//!     }
//!
//!     fn render(&mut self, (): &()) -> Value<D> {
//!         self.0 += 1;
//!         self.0.into()
//!     }
//! }
//!
//! fn render_count<D: Dom>() -> Value<D> {
//!     directive::<D, RenderCount>(())
//! }
//! # let _ = render_count::<lit_dom::memory::MemoryDom>();
//! ```

use crate::{
	dom::Dom,
	error::{DirectiveError, Error},
	part::{AttributePart, ChildPartState, PartMut, Scope, WeakTarget},
	template::PartKind,
	value::Value,
};
use core::{
	any::{type_name, Any, TypeId},
	cell::Cell,
	fmt,
};
use std::rc::{Rc, Weak};
use tracing::{trace, trace_span, warn};

/// A stateful value handler, constructed once per part and directive type.
pub trait Directive<D: Dom>: 'static {
	/// The arguments of one render.
	type Props: 'static;

	/// Validates the binding site. Return an error to reject the placement.
	///
	/// # Errors
	///
	/// When the directive can't work in this kind of binding.
	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError>
	where
		Self: Sized;

	/// Computes the value to commit from `props` alone.
	fn render(&mut self, props: &Self::Props) -> Value<D>;

	/// Computes the value to commit, with access to the part.
	///
	/// The default implementation forwards to [`Directive::render`].
	///
	/// # Errors
	///
	/// Errors are propagated out of the render that caused this update.
	fn update(&mut self, _part: &mut PartContext<'_, D>, props: &Self::Props) -> Result<Value<D>, Error> {
		Ok(self.render(props))
	}

	/// The part left the document. Stop background work here.
	fn disconnected(&mut self) {}

	/// The part was put back into the document after [`Directive::disconnected`].
	fn reconnected(&mut self) {}
}

/// Describes the binding site a directive is being constructed for.
#[derive(Debug)]
#[non_exhaustive]
pub struct PartInfo<'a, D: Dom> {
	pub kind: PartKind,
	/// The attribute, property or event name, if any.
	pub name: Option<&'a str>,
	/// Static text around an attribute-like binding's values, if there is more than one value or any surrounding text.
	pub strings: Option<&'a [String]>,
	pub element: Option<&'a D::Node>,
}
impl<'a, D: Dom> PartInfo<'a, D> {
	/// Whether the directive's value is the part's entire value.
	#[must_use]
	pub fn is_single_value(&self) -> bool {
		self.strings.is_none()
	}

	/// # Errors
	///
	/// Iff this part's kind isn't in `allowed`.
	pub fn require(&self, directive: &'static str, expected: &'static str, allowed: &[PartKind]) -> Result<(), DirectiveError> {
		if allowed.contains(&self.kind) {
			Ok(())
		} else {
			Err(DirectiveError::KindMismatch {
				directive,
				expected,
				found: self.kind,
			})
		}
	}
}

/// The bound form of a directive: its type plus the props of one render.
pub struct DirectiveResult<D: Dom> {
	class: TypeId,
	name: &'static str,
	construct: fn(&PartInfo<'_, D>) -> Result<Box<dyn ErasedDirective<D>>, DirectiveError>,
	props: Rc<dyn Any>,
}
impl<D: Dom> DirectiveResult<D> {
	#[must_use]
	pub fn new<T: Directive<D>>(props: T::Props) -> Self {
		Self {
			class: TypeId::of::<T>(),
			name: type_name::<T>(),
			construct: construct::<D, T>,
			props: Rc::new(props),
		}
	}

	/// Whether this result was created for the directive type `T`.
	#[must_use]
	pub fn is<T: 'static>(&self) -> bool {
		self.class == TypeId::of::<T>()
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	#[must_use]
	pub fn props<T: Directive<D>>(&self) -> Option<&T::Props> {
		if self.is::<T>() {
			self.props.downcast_ref()
		} else {
			None
		}
	}
}
impl<D: Dom> Clone for DirectiveResult<D> {
	fn clone(&self) -> Self {
		Self {
			class: self.class,
			name: self.name,
			construct: self.construct,
			props: Rc::clone(&self.props),
		}
	}
}
impl<D: Dom> fmt::Debug for DirectiveResult<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("DirectiveResult").field(&self.name).finish()
	}
}

/// Binds directive `T` with `props`.
pub fn directive<D: Dom, T: Directive<D>>(props: T::Props) -> Value<D> {
	Value::Directive(DirectiveResult::new::<T>(props))
}

fn construct<D: Dom, T: Directive<D>>(part: &PartInfo<'_, D>) -> Result<Box<dyn ErasedDirective<D>>, DirectiveError> {
	Ok(Box::new(Erased(T::new(part)?)))
}

pub(crate) trait ErasedDirective<D: Dom> {
	fn update(&mut self, part: &mut PartContext<'_, D>, props: &dyn Any) -> Result<Value<D>, Error>;
	fn set_connected(&mut self, connected: bool);
}

struct Erased<T>(T);
impl<D: Dom, T: Directive<D>> ErasedDirective<D> for Erased<T> {
	fn update(&mut self, part: &mut PartContext<'_, D>, props: &dyn Any) -> Result<Value<D>, Error> {
		let Some(props) = props.downcast_ref::<T::Props>() else {
			unreachable!("lit-dom bug: props of {} didn't match its type", type_name::<T>())
		};
		self.0.update(part, props)
	}

	fn set_connected(&mut self, connected: bool) {
		if connected {
			self.0.reconnected();
		} else {
			self.0.disconnected();
		}
	}
}

/// One directive instance in a part's resolution chain.
pub(crate) struct Slot<D: Dom> {
	class: TypeId,
	directive: Box<dyn ErasedDirective<D>>,
	/// Shared with [`PartHandle`]s, which stop delivering once this is cleared.
	connected: Rc<Cell<bool>>,
}
impl<D: Dom> Slot<D> {
	fn set_connected(&mut self, connected: bool) {
		if self.connected.get() != connected {
			self.connected.set(connected);
			self.directive.set_connected(connected);
		}
	}
}

pub(crate) fn set_chain_connected<D: Dom>(chain: &mut [Slot<D>], connected: bool) {
	for slot in chain {
		slot.set_connected(connected);
	}
}

/// Disconnects and drops the directives from `level` onwards.
pub(crate) fn truncate_chain<D: Dom>(chain: &mut Vec<Slot<D>>, level: usize) {
	if level < chain.len() {
		for mut slot in chain.drain(level..) {
			slot.set_connected(false);
		}
	}
}

/// Resolves directive results in `value` until a plain value remains, starting at chain position `from`.
pub(crate) fn resolve<D: Dom>(
	chain: &mut Vec<Slot<D>>,
	from: usize,
	mut value: Value<D>,
	part: &mut PartMut<'_, D>,
) -> Result<Value<D>, Error> {
	let mut level = from;
	loop {
		let result = match value {
			Value::Directive(result) => result,
			value => {
				truncate_chain(chain, level);
				return Ok(value);
			}
		};

		if chain.get(level).map_or(true, |slot| slot.class != result.class) {
			truncate_chain(chain, level);
			let directive = (result.construct)(&part.info())?;
			trace!("Constructed directive {} for a {} part.", result.name, part.kind());
			chain.push(Slot {
				class: result.class,
				directive,
				connected: Rc::new(Cell::new(part.is_connected())),
			});
		}

		let span = trace_span!("Resolving directive", directive = result.name, level);
		let _enter = span.enter();
		let slot = &mut chain[level];
		let handle = PartHandle {
			target: part.target(),
			scope: Rc::downgrade(part.scope()),
			level,
			alive: Rc::clone(&slot.connected),
		};
		let mut context = PartContext {
			part: part.reborrow(),
			handle,
		};
		value = slot.directive.update(&mut context, &*result.props)?;
		level += 1;
	}
}

/// What [`Directive::update`] gets to work with.
pub struct PartContext<'a, D: Dom> {
	part: PartMut<'a, D>,
	handle: PartHandle<D>,
}
impl<'a, D: Dom> PartContext<'a, D> {
	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.part.kind()
	}

	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.part.name()
	}

	#[must_use]
	pub fn element(&self) -> Option<&D::Node> {
		self.part.element()
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.part.scope().dom
	}

	/// The host object passed through [`RenderOptions::host`](`crate::render::RenderOptions::host`).
	#[must_use]
	pub fn host(&self) -> Option<&Rc<dyn Any>> {
		self.part.scope().host.as_ref()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.part.is_connected()
	}

	/// A handle for committing values later, from outside of a render.
	#[must_use]
	pub fn handle(&self) -> PartHandle<D> {
		self.handle.clone()
	}

	/// Direct access to a child part's content, for example to stash and restore template instances.
	pub fn child(&mut self) -> Option<&mut ChildPartState<D>> {
		match &mut self.part {
			PartMut::Child(state) => Some(&mut **state),
			_ => None,
		}
	}

	/// Forgets the last committed value, so that the next one is written even if it's the same.
	pub fn reset_committed(&mut self) {
		self.part.reset_committed();
	}

	/// Creates a standalone single-value part on this part's element, bound the same way a template binding would be.
	///
	/// [`None`] for child parts.
	#[must_use]
	pub fn create_attribute_part(&self, name: &str, kind: PartKind) -> Option<AttributePart<D>> {
		let element = self.part.element()?.clone();
		if !matches!(
			kind,
			PartKind::Attribute | PartKind::Property | PartKind::BooleanAttribute | PartKind::Event
		) {
			warn!("Refusing to create an attribute-like part of kind {}.", kind);
			return None;
		}
		Some(AttributePart::new(
			Rc::clone(self.part.scope()),
			element,
			name.to_owned(),
			kind,
			None,
			self.part.is_connected(),
		))
	}
}

/// Commits values into the part (and chain position) of the directive it was created for.
///
/// Handles don't keep their part alive. Values pushed after the part was dropped, while its directive is
/// disconnected or after the directive was replaced are ignored.
pub struct PartHandle<D: Dom> {
	target: WeakTarget<D>,
	scope: Weak<Scope<D>>,
	level: usize,
	alive: Rc<Cell<bool>>,
}
impl<D: Dom> PartHandle<D> {
	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.alive.get() && self.target.is_alive()
	}

	/// Commits `value` as if the directive had returned it from [`Directive::update`].
	///
	/// # Errors
	///
	/// Iff committing `value` fails.
	pub fn set_value(&self, value: impl Into<Value<D>>) -> Result<(), Error> {
		if !self.alive.get() {
			trace!("Ignoring a value pushed to a disconnected directive.");
			return Ok(());
		}
		match self.scope.upgrade() {
			Some(scope) => scope.batch(|| self.target.commit_from(self.level + 1, value.into())),
			None => {
				trace!("Ignoring a value pushed to a part whose render root is gone.");
				Ok(())
			}
		}
	}

	/// Runs `task` as soon as no part under the same render root is being committed or (dis)connected.
	///
	/// That's immediately when called from outside a render. Inside [`Directive::reconnected`] and friends,
	/// the task runs right after the current operation finishes, at which point [`PartHandle::set_value`] works again.
	pub fn defer(&self, task: impl FnOnce() + 'static) {
		match self.scope.upgrade() {
			Some(scope) => scope.defer(Box::new(task)),
			None => trace!("Dropping a task deferred for a part whose render root is gone."),
		}
	}
}
impl<D: Dom> Clone for PartHandle<D> {
	fn clone(&self) -> Self {
		Self {
			target: self.target.clone(),
			scope: self.scope.clone(),
			level: self.level,
			alive: Rc::clone(&self.alive),
		}
	}
}
impl<D: Dom> fmt::Debug for PartHandle<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PartHandle")
			.field("level", &self.level)
			.field("connected", &self.is_connected())
			.finish_non_exhaustive()
	}
}
