//! A single-threaded deferred value and the directive that renders it once it's there.

use crate::{
	directive::{directive, Directive, PartContext, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	template::PartKind,
	value::Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt, mem,
};
use std::rc::Rc;
use tracing::{error, trace};

type Subscriber<D> = Box<dyn FnOnce(&Value<D>) -> Result<(), Error>>;

enum State<D: Dom> {
	Pending(Vec<Subscriber<D>>),
	Resolved(Value<D>),
}

/// A value that becomes available later, through the matching [`Resolver`].
pub struct Deferred<D: Dom>(Rc<RefCell<State<D>>>);

/// Resolves its [`Deferred`].
pub struct Resolver<D: Dom>(Rc<RefCell<State<D>>>);

/// Creates a pending [`Deferred`] along with the [`Resolver`] that completes it.
#[must_use]
pub fn deferred<D: Dom>() -> (Deferred<D>, Resolver<D>) {
	let state = Rc::new(RefCell::new(State::Pending(Vec::new())));
	(Deferred(Rc::clone(&state)), Resolver(state))
}

impl<D: Dom> Deferred<D> {
	/// An already resolved value.
	pub fn resolved(value: impl Into<Value<D>>) -> Self {
		Self(Rc::new(RefCell::new(State::Resolved(value.into()))))
	}

	#[must_use]
	pub fn value(&self) -> Option<Value<D>> {
		match &*self.0.borrow() {
			State::Pending(_) => None,
			State::Resolved(value) => Some(value.clone()),
		}
	}

	#[must_use]
	pub fn is_resolved(&self) -> bool {
		matches!(*self.0.borrow(), State::Resolved(_))
	}

	/// Calls `subscriber` with the value once it's resolved, or right away if it already is.
	///
	/// Errors are logged.
	pub fn subscribe(&self, subscriber: impl FnOnce(&Value<D>) -> Result<(), Error> + 'static) {
		let value = match &mut *self.0.borrow_mut() {
			State::Pending(subscribers) => {
				subscribers.push(Box::new(subscriber));
				return;
			}
			State::Resolved(value) => value.clone(),
		};
		report(subscriber(&value));
	}

	/// Whether both are the same deferred value.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<D: Dom> Resolver<D> {
	/// Stores `value` and notifies all subscribers in order.
	///
	/// A failing subscriber doesn't keep the others from being called.
	pub fn resolve(self, value: impl Into<Value<D>>) {
		let value = value.into();
		let subscribers = match mem::replace(&mut *self.0.borrow_mut(), State::Resolved(value.clone())) {
			State::Pending(subscribers) => subscribers,
			State::Resolved(_) => unreachable!("lit-dom bug: deferred value resolved twice"),
		};
		trace!("Resolving a deferred value for {} subscriber(s).", subscribers.len());
		for subscriber in subscribers {
			report(subscriber(&value));
		}
	}
}

fn report(result: Result<(), Error>) {
	if let Err(error) = result {
		error!("Failed to commit a deferred value: {}", error);
	}
}

impl<D: Dom> Clone for Deferred<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Dom> fmt::Debug for Deferred<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred").field("resolved", &self.is_resolved()).finish()
	}
}

impl<D: Dom> fmt::Debug for Resolver<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolver").finish_non_exhaustive()
	}
}

/// See [`until`].
pub struct Until<D: Dom> {
	current: Option<Deferred<D>>,
	/// Bumped whenever another deferred value takes over, which silences older subscriptions.
	generation: Rc<Cell<u64>>,
}

impl<D: Dom> Directive<D> for Until<D> {
	type Props = (Deferred<D>, Value<D>);

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require(
			"until",
			"child or attribute",
			&[PartKind::Child, PartKind::Attribute, PartKind::Property, PartKind::BooleanAttribute],
		)?;
		Ok(Self {
			current: None,
			generation: Rc::new(Cell::new(0)),
		})
	}

	fn render(&mut self, (deferred, placeholder): &(Deferred<D>, Value<D>)) -> Value<D> {
		deferred.value().unwrap_or_else(|| placeholder.clone())
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, (deferred, placeholder): &(Deferred<D>, Value<D>)) -> Result<Value<D>, Error> {
		let same = self.current.as_ref().map_or(false, |current| current.same(deferred));
		self.current = Some(deferred.clone());
		if let Some(value) = deferred.value() {
			return Ok(value);
		}
		if same {
			return Ok(Value::NoChange);
		}

		let generation = self.generation.get() + 1;
		self.generation.set(generation);
		let current = Rc::clone(&self.generation);
		let handle = part.handle();
		deferred.subscribe(move |value| {
			if current.get() != generation {
				trace!("Dropping a deferred value that was superseded.");
				return Ok(());
			}
			handle.set_value(value.clone())
		});
		Ok(placeholder.clone())
	}
}

/// Renders `placeholder` until `deferred` resolves, then its value.
///
/// The value is committed as soon as it's resolved, outside of any render. If the binding is
/// disconnected at that point, the value is dropped.
pub fn until<D: Dom>(deferred: &Deferred<D>, placeholder: impl Into<Value<D>>) -> Value<D> {
	directive::<D, Until<D>>((deferred.clone(), placeholder.into()))
}
