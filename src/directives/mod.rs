//! Built-in directives.
//!
//! Each is exposed as a function returning a [`Value`](`crate::value::Value`) that can be bound like any other.
//! The directive types themselves are public so that [`DirectiveResult::is`](`crate::directive::DirectiveResult::is`)
//! can recognize them.

mod async_stream;
mod cache;
mod class_map;
mod guard;
mod if_defined;
mod live;
mod repeat;
mod spread;
mod style_map;
mod unsafe_html;
mod until;

pub use self::{
	async_stream::{async_append, async_replace, value_stream, AsyncAppend, AsyncReplace, StreamSender, ValueStream},
	cache::{cache, Cache},
	class_map::{class_map, ClassMap},
	guard::{guard, Guard, GuardProps},
	if_defined::if_defined,
	live::{live, Live},
	repeat::{repeat, Repeat},
	spread::{spread, Spread},
	style_map::{style_map, StyleMap},
	unsafe_html::{unsafe_html, unsafe_svg, UnsafeHtml, UnsafeSvg},
	until::{deferred, until, Deferred, Resolver, Until},
};
