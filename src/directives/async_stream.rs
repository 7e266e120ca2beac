//! A single-threaded stream of values, and the directives that render it as it goes.

use crate::{
	directive::{directive, Directive, PartContext, PartHandle, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	template::PartKind,
	value::Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt,
};
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, trace};

struct Channel<D: Dom> {
	buffer: VecDeque<Value<D>>,
	/// Called once when the next item arrives or the stream closes.
	waiter: Option<Box<dyn FnOnce()>>,
	closed: bool,
}

/// The receiving end of [`value_stream`]. Each item is taken by one binding only.
pub struct ValueStream<D: Dom>(Rc<RefCell<Channel<D>>>);

/// Feeds its [`ValueStream`]. Dropping it closes the stream.
pub struct StreamSender<D: Dom>(Rc<RefCell<Channel<D>>>);

/// Creates an empty, open stream along with its sender.
#[must_use]
pub fn value_stream<D: Dom>() -> (ValueStream<D>, StreamSender<D>) {
	let channel = Rc::new(RefCell::new(Channel {
		buffer: VecDeque::new(),
		waiter: None,
		closed: false,
	}));
	(ValueStream(Rc::clone(&channel)), StreamSender(channel))
}

enum Next<D: Dom> {
	Item(Value<D>),
	Pending,
	Closed,
}

impl<D: Dom> ValueStream<D> {
	/// How many items were sent but not yet taken.
	#[must_use]
	pub fn buffered(&self) -> usize {
		self.0.borrow().buffer.len()
	}

	/// Whether the sender is gone. Buffered items can still be taken.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.0.borrow().closed
	}

	/// Whether both are the same stream.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	fn take_next(&self) -> Next<D> {
		let mut channel = self.0.borrow_mut();
		match channel.buffer.pop_front() {
			Some(value) => Next::Item(value),
			None if channel.closed => Next::Closed,
			None => Next::Pending,
		}
	}

	/// Replaces any earlier waiter.
	fn wait(&self, waiter: impl FnOnce() + 'static) {
		self.0.borrow_mut().waiter = Some(Box::new(waiter));
	}
}

impl<D: Dom> StreamSender<D> {
	/// Appends `value` to the stream and wakes the binding that renders it.
	///
	/// Returns `false` iff the stream was already closed, in which case `value` is dropped.
	pub fn send(&self, value: impl Into<Value<D>>) -> bool {
		let waiter = {
			let mut channel = self.0.borrow_mut();
			if channel.closed {
				trace!("Dropping a value sent into a closed stream.");
				return false;
			}
			channel.buffer.push_back(value.into());
			channel.waiter.take()
		};
		if let Some(waiter) = waiter {
			waiter();
		}
		true
	}

	/// Ends the stream. Items sent earlier are still delivered.
	pub fn close(&self) {
		let waiter = {
			let mut channel = self.0.borrow_mut();
			if channel.closed {
				return;
			}
			channel.closed = true;
			channel.waiter.take()
		};
		if let Some(waiter) = waiter {
			waiter();
		}
	}
}

impl<D: Dom> Drop for StreamSender<D> {
	fn drop(&mut self) {
		self.close();
	}
}

impl<D: Dom> Clone for ValueStream<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Dom> fmt::Debug for ValueStream<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ValueStream")
			.field("buffered", &self.buffered())
			.field("closed", &self.is_closed())
			.finish()
	}
}

impl<D: Dom> fmt::Debug for StreamSender<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StreamSender").finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	Replace,
	Append,
}

/// One stream as consumed by one directive instance.
struct Subscription<D: Dom> {
	stream: ValueStream<D>,
	handle: PartHandle<D>,
	mode: Mode,
	/// Everything appended so far.
	items: RefCell<Vec<Value<D>>>,
	connected: Cell<bool>,
	/// Cleared once another stream takes over the binding.
	active: Cell<bool>,
}

impl<D: Dom> Subscription<D> {
	/// Turns the next item into the value to commit.
	fn accept(&self, value: Value<D>) -> Value<D> {
		match self.mode {
			Mode::Replace => value,
			Mode::Append => {
				let mut items = self.items.borrow_mut();
				items.push(value);
				Value::List(items.iter().cloned().collect())
			}
		}
	}

	/// Takes what's buffered without committing it, then waits for more.
	///
	/// Returns the value to render, if there was any item.
	fn drain(self: &Rc<Self>) -> Option<Value<D>> {
		let mut latest = None;
		loop {
			match self.stream.take_next() {
				Next::Item(value) => latest = Some(self.accept(value)),
				Next::Pending => {
					self.wait();
					return latest;
				}
				Next::Closed => return latest,
			}
		}
	}

	/// Commits buffered items one by one for as long as the binding is connected.
	fn pump(self: &Rc<Self>) {
		while self.active.get() && self.connected.get() {
			match self.stream.take_next() {
				Next::Item(value) => {
					let value = self.accept(value);
					if let Err(error) = self.handle.set_value(value) {
						error!("Failed to commit a streamed value: {}", error);
					}
				}
				Next::Pending => {
					self.wait();
					return;
				}
				Next::Closed => {
					trace!("Value stream ended.");
					return;
				}
			}
		}
		if self.active.get() {
			trace!("Pausing a value stream while its binding is disconnected.");
		}
	}

	fn wait(self: &Rc<Self>) {
		let this: Weak<Self> = Rc::downgrade(self);
		self.stream.wait(move || {
			if let Some(this) = this.upgrade() {
				let handle = this.handle.clone();
				handle.defer(move || this.pump());
			}
		});
	}
}

/// Shared by [`AsyncReplace`] and [`AsyncAppend`].
struct Consumer<D: Dom> {
	mode: Mode,
	current: Option<Rc<Subscription<D>>>,
}

impl<D: Dom> Consumer<D> {
	fn update(&mut self, part: &PartContext<'_, D>, stream: &ValueStream<D>) -> Value<D> {
		if let Some(current) = &self.current {
			if current.stream.same(stream) {
				return Value::NoChange;
			}
			trace!("Another value stream took over a binding.");
			current.active.set(false);
		}

		let subscription = Rc::new(Subscription {
			stream: stream.clone(),
			handle: part.handle(),
			mode: self.mode,
			items: RefCell::default(),
			connected: Cell::new(part.is_connected()),
			active: Cell::new(true),
		});
		let value = if part.is_connected() { subscription.drain() } else { None };
		self.current = Some(subscription);
		value.unwrap_or(Value::NoChange)
	}

	fn disconnected(&mut self) {
		if let Some(current) = &self.current {
			current.connected.set(false);
		}
	}

	fn reconnected(&mut self) {
		if let Some(current) = &self.current {
			current.connected.set(true);
			let current = Rc::clone(current);
			let handle = current.handle.clone();
			handle.defer(move || current.pump());
		}
	}
}

/// See [`async_replace`].
pub struct AsyncReplace<D: Dom>(Consumer<D>);

impl<D: Dom> Directive<D> for AsyncReplace<D> {
	type Props = ValueStream<D>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require(
			"async_replace",
			"child or attribute",
			&[PartKind::Child, PartKind::Attribute, PartKind::Property, PartKind::BooleanAttribute],
		)?;
		Ok(Self(Consumer {
			mode: Mode::Replace,
			current: None,
		}))
	}

	fn render(&mut self, _: &ValueStream<D>) -> Value<D> {
		Value::NoChange
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, stream: &ValueStream<D>) -> Result<Value<D>, Error> {
		Ok(self.0.update(part, stream))
	}

	fn disconnected(&mut self) {
		self.0.disconnected();
	}

	fn reconnected(&mut self) {
		self.0.reconnected();
	}
}

/// See [`async_append`].
pub struct AsyncAppend<D: Dom>(Consumer<D>);

impl<D: Dom> Directive<D> for AsyncAppend<D> {
	type Props = ValueStream<D>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require("async_append", "child", &[PartKind::Child])?;
		Ok(Self(Consumer {
			mode: Mode::Append,
			current: None,
		}))
	}

	fn render(&mut self, _: &ValueStream<D>) -> Value<D> {
		Value::NoChange
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, stream: &ValueStream<D>) -> Result<Value<D>, Error> {
		Ok(self.0.update(part, stream))
	}

	fn disconnected(&mut self) {
		self.0.disconnected();
	}

	fn reconnected(&mut self) {
		self.0.reconnected();
	}
}

/// Renders each item of `stream` in place of the previous one, as it arrives.
///
/// Items already buffered when the binding is rendered are skipped to the latest. While the binding is
/// disconnected, the stream is paused: items stay buffered and are committed in order once it's reconnected.
/// Binding a different stream stops rendering the old one.
pub fn async_replace<D: Dom>(stream: &ValueStream<D>) -> Value<D> {
	directive::<D, AsyncReplace<D>>(stream.clone())
}

/// Renders the items of `stream` one after another, appending each as it arrives.
///
/// Pauses while disconnected like [`async_replace`]. Binding a different stream starts over with its first item.
pub fn async_append<D: Dom>(stream: &ValueStream<D>) -> Value<D> {
	directive::<D, AsyncAppend<D>>(stream.clone())
}
