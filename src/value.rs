//! Binding values and the [`TemplateResult`]s templates evaluate to.

use crate::{
	directive::DirectiveResult,
	dom::{Dom, EventHandler, ListenerOptions},
	error::TemplateError,
	template::{Template, TemplateCache, TemplateKey, TemplateKind, TemplateStrings},
};
use core::{any::Any, fmt};
use std::rc::Rc;

/// Anything that can be bound into a template.
///
/// Besides ordinary data, two sentinels steer the commit engine:
/// [`Value::NoChange`] leaves a part exactly as it is, and [`Value::Nothing`] clears it
/// (removing attributes, emptying child positions and unregistering listeners).
pub enum Value<D: Dom> {
	/// Clears the part.
	Nothing,
	/// Leaves the part untouched.
	NoChange,
	/// Renders as empty text in child positions and removes attributes.
	Null,
	Bool(bool),
	Number(f64),
	Str(Rc<str>),
	/// An opaque value, mostly useful for property bindings. Compared by identity.
	Object(Rc<dyn Any>),
	Template(TemplateResult<D>),
	Node(D::Node),
	/// Items are rendered in order, each into its own child region.
	List(Rc<[Value<D>]>),
	/// Like [`Value::List`], but regions follow their key when the order changes.
	Keyed(Rc<[(Key, Value<D>)]>),
	Listener(EventListener<D>),
	Directive(DirectiveResult<D>),
}

impl<D: Dom> Clone for Value<D> {
	fn clone(&self) -> Self {
		match self {
			Value::Nothing => Value::Nothing,
			Value::NoChange => Value::NoChange,
			Value::Null => Value::Null,
			Value::Bool(b) => Value::Bool(*b),
			Value::Number(n) => Value::Number(*n),
			Value::Str(s) => Value::Str(Rc::clone(s)),
			Value::Object(o) => Value::Object(Rc::clone(o)),
			Value::Template(t) => Value::Template(t.clone()),
			Value::Node(n) => Value::Node(n.clone()),
			Value::List(l) => Value::List(Rc::clone(l)),
			Value::Keyed(k) => Value::Keyed(Rc::clone(k)),
			Value::Listener(l) => Value::Listener(l.clone()),
			Value::Directive(d) => Value::Directive(d.clone()),
		}
	}
}

impl<D: Dom> fmt::Debug for Value<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Nothing => f.write_str("Nothing"),
			Value::NoChange => f.write_str("NoChange"),
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
			Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
			Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
			Value::Object(o) => f.debug_tuple("Object").field(&Rc::as_ptr(o)).finish(),
			Value::Template(t) => f.debug_tuple("Template").field(t).finish(),
			Value::Node(n) => f.debug_tuple("Node").field(n).finish(),
			Value::List(l) => f.debug_tuple("List").field(l).finish(),
			Value::Keyed(k) => f.debug_tuple("Keyed").field(k).finish(),
			Value::Listener(l) => f.debug_tuple("Listener").field(l).finish(),
			Value::Directive(d) => f.debug_tuple("Directive").field(d).finish(),
		}
	}
}

impl<D: Dom> Value<D> {
	/// Strict identity, as used for dirty-checking.
	///
	/// Primitives compare by value, everything else by reference. `NaN` counts as the same as itself,
	/// so that rebinding it doesn't write again.
	#[must_use]
	#[allow(clippy::float_cmp)]
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Nothing, Value::Nothing) | (Value::NoChange, Value::NoChange) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
			(Value::Str(a), Value::Str(b)) => a == b,
			(Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
			(Value::Node(a), Value::Node(b)) => a == b,
			(Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
			(Value::Keyed(a), Value::Keyed(b)) => Rc::ptr_eq(a, b),
			(Value::Listener(a), Value::Listener(b)) => a.same(b),
			_ => false,
		}
	}

	/// Whether a boolean attribute bound to this value is present.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Nothing | Value::NoChange | Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::Str(s) => !s.is_empty(),
			_ => true,
		}
	}

	/// For logging without the `dangerous-logging` feature.
	pub(crate) fn variant_name(&self) -> &'static str {
		match self {
			Value::Nothing => "nothing",
			Value::NoChange => "no-change",
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Number(_) => "number",
			Value::Str(_) => "string",
			Value::Object(_) => "object",
			Value::Template(_) => "template",
			Value::Node(_) => "node",
			Value::List(_) => "list",
			Value::Keyed(_) => "keyed list",
			Value::Listener(_) => "listener",
			Value::Directive(_) => "directive",
		}
	}

	#[must_use]
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Nothing | Value::Null)
	}

	/// The text this value renders as in text and attribute positions.
	#[must_use]
	pub fn to_text(&self) -> String {
		let mut text = String::new();
		self.write_text(&mut text);
		text
	}

	fn write_text(&self, out: &mut String) {
		match self {
			Value::Nothing | Value::NoChange | Value::Null => (),
			Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
			Value::Number(n) => out.push_str(&number_text(*n)),
			Value::Str(s) => out.push_str(s),
			Value::List(items) => {
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						out.push(',');
					}
					item.write_text(out);
				}
			}
			Value::Keyed(items) => {
				for (i, (_, item)) in items.iter().enumerate() {
					if i > 0 {
						out.push(',');
					}
					item.write_text(out);
				}
			}
			Value::Object(_) | Value::Template(_) | Value::Directive(_) => out.push_str("[object Object]"),
			Value::Node(_) => out.push_str("[object Node]"),
			Value::Listener(_) => out.push_str("[object Function]"),
		}
	}

	/// Wraps an arbitrary value for property bindings.
	pub fn object(value: impl Any) -> Self {
		Value::Object(Rc::new(value))
	}

	pub fn node(node: D::Node) -> Self {
		Value::Node(node)
	}

	/// An event listener with default [`ListenerOptions`].
	pub fn listener(handler: impl Fn(&D::Event) + 'static) -> Self {
		Value::Listener(EventListener::new(handler))
	}

	/// A list of child regions that are reordered by key instead of rewritten in place.
	pub fn keyed<K: Into<Key>, V: Into<Value<D>>>(items: impl IntoIterator<Item = (K, V)>) -> Self {
		Value::Keyed(items.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
	}
}

/// Formats like ECMAScript's `Number::prototype.toString()`.
fn number_text(n: f64) -> String {
	match n {
		_ if n.is_nan() => return "NaN".to_owned(),
		_ if n == f64::INFINITY => return "Infinity".to_owned(),
		_ if n == f64::NEG_INFINITY => return "-Infinity".to_owned(),
		_ if n == 0.0 => return "0".to_owned(),
		_ => (),
	}

	// Shortest round-tripping digits, as `d.ddde±x`.
	let scientific = format!("{:e}", n.abs());
	let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
	let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
	let exponent: i32 = exponent.parse().unwrap_or(0);
	// Position of the decimal point relative to the start of `digits`.
	let point = exponent + 1;
	let len = i32::try_from(digits.len()).unwrap_or(i32::MAX);

	let mut text = String::with_capacity(digits.len() + 8);
	if n < 0.0 {
		text.push('-');
	}
	if len <= point && point <= 21 {
		text.push_str(&digits);
		text.extend((len..point).map(|_| '0'));
	} else if 0 < point && point <= 21 {
		let (integer, fraction) = digits.split_at(point.unsigned_abs() as usize);
		text.push_str(integer);
		text.push('.');
		text.push_str(fraction);
	} else if -6 < point && point <= 0 {
		text.push_str("0.");
		text.extend((point..0).map(|_| '0'));
		text.push_str(&digits);
	} else {
		let (first, rest) = digits.split_at(1);
		text.push_str(first);
		if !rest.is_empty() {
			text.push('.');
			text.push_str(rest);
		}
		text.push('e');
		text.push(if exponent < 0 { '-' } else { '+' });
		text.push_str(&exponent.unsigned_abs().to_string());
	}
	text
}

/// Identifies an item of a [`Value::Keyed`] list across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Rc<str>),
}

macro_rules! key_from_int {
	($($int:ty),*) => {$(
		impl From<$int> for Key {
			fn from(key: $int) -> Self {
				Key::Int(key.into())
			}
		}
	)*};
}
key_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Key {
	#[allow(clippy::cast_possible_wrap)]
	fn from(key: usize) -> Self {
		Key::Int(key as i64)
	}
}

impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Key::Str(key.into())
	}
}

impl From<String> for Key {
	fn from(key: String) -> Self {
		Key::Str(key.into())
	}
}

impl From<Rc<str>> for Key {
	fn from(key: Rc<str>) -> Self {
		Key::Str(key)
	}
}

/// A bound event listener along with its registration options.
pub struct EventListener<D: Dom> {
	handler: EventHandler<D>,
	options: ListenerOptions,
}
impl<D: Dom> EventListener<D> {
	pub fn new(handler: impl Fn(&D::Event) + 'static) -> Self {
		Self {
			handler: Rc::new(handler),
			options: ListenerOptions::default(),
		}
	}

	#[must_use]
	pub fn from_handler(handler: EventHandler<D>, options: ListenerOptions) -> Self {
		Self { handler, options }
	}

	#[must_use]
	pub fn capture(mut self) -> Self {
		self.options.capture = true;
		self
	}

	#[must_use]
	pub fn once(mut self) -> Self {
		self.options.once = true;
		self
	}

	#[must_use]
	pub fn passive(mut self) -> Self {
		self.options.passive = true;
		self
	}

	#[must_use]
	pub fn options(&self) -> ListenerOptions {
		self.options
	}

	#[must_use]
	pub fn handler(&self) -> &EventHandler<D> {
		&self.handler
	}

	/// Same callback allocation and same options.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.handler, &other.handler) && self.options == other.options
	}
}
impl<D: Dom> Clone for EventListener<D> {
	fn clone(&self) -> Self {
		Self {
			handler: Rc::clone(&self.handler),
			options: self.options,
		}
	}
}
impl<D: Dom> fmt::Debug for EventListener<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventListener")
			.field("handler", &Rc::as_ptr(&self.handler).cast::<()>())
			.field("options", &self.options)
			.finish()
	}
}

#[derive(Clone)]
enum Source {
	Static {
		strings: &'static TemplateStrings,
		kind: TemplateKind,
	},
	Compiled(Rc<Template>),
}

/// A template paired with the values of one evaluation.
///
/// Usually created through [`html!`](`crate::html`), [`svg!`](`crate::svg`) or [`mathml!`](`crate::mathml`).
/// Two results share a template exactly when they were created by the same macro invocation.
pub struct TemplateResult<D: Dom> {
	source: Source,
	values: Vec<Value<D>>,
}
impl<D: Dom> TemplateResult<D> {
	#[must_use]
	pub fn new(strings: &'static TemplateStrings, kind: TemplateKind, values: Vec<Value<D>>) -> Self {
		Self {
			source: Source::Static { strings, kind },
			values,
		}
	}

	/// Uses an already compiled template, for example one created with [`Template::compile`].
	#[must_use]
	pub fn from_template(template: Rc<Template>, values: Vec<Value<D>>) -> Self {
		Self {
			source: Source::Compiled(template),
			values,
		}
	}

	#[must_use]
	pub fn key(&self) -> TemplateKey {
		match &self.source {
			Source::Static { strings, kind } => TemplateKey::of_static(strings, *kind),
			Source::Compiled(template) => template.key(),
		}
	}

	#[must_use]
	pub fn kind(&self) -> TemplateKind {
		match &self.source {
			Source::Static { kind, .. } => *kind,
			Source::Compiled(template) => template.kind(),
		}
	}

	#[must_use]
	pub fn values(&self) -> &[Value<D>] {
		&self.values
	}

	/// Looks the template up in `cache`, compiling it on first use.
	///
	/// # Errors
	///
	/// Iff the template's static strings are malformed.
	pub fn template(&self, cache: &TemplateCache) -> Result<Rc<Template>, TemplateError> {
		match &self.source {
			Source::Static { strings, kind } => cache.get_or_compile(strings, *kind),
			Source::Compiled(template) => Ok(Rc::clone(template)),
		}
	}

	pub(crate) fn into_values(self) -> Vec<Value<D>> {
		self.values
	}
}
impl<D: Dom> Clone for TemplateResult<D> {
	fn clone(&self) -> Self {
		Self {
			source: self.source.clone(),
			values: self.values.clone(),
		}
	}
}
impl<D: Dom> fmt::Debug for TemplateResult<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateResult")
			.field("key", &self.key())
			.field("values", &self.values)
			.finish()
	}
}

impl<D: Dom> From<bool> for Value<D> {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

macro_rules! value_from_number {
	($($number:ty),*) => {$(
		impl<D: Dom> From<$number> for Value<D> {
			fn from(value: $number) -> Self {
				Value::Number(value.into())
			}
		}
	)*};
}
value_from_number!(i8, i16, i32, u8, u16, u32, f32, f64);

macro_rules! value_from_wide_number {
	($($number:ty),*) => {$(
		impl<D: Dom> From<$number> for Value<D> {
			#[allow(clippy::cast_precision_loss)]
			fn from(value: $number) -> Self {
				Value::Number(value as f64)
			}
		}
	)*};
}
value_from_wide_number!(i64, u64, isize, usize);

impl<D: Dom> From<&str> for Value<D> {
	fn from(value: &str) -> Self {
		Value::Str(value.into())
	}
}

impl<D: Dom> From<String> for Value<D> {
	fn from(value: String) -> Self {
		Value::Str(value.into())
	}
}

impl<D: Dom> From<&String> for Value<D> {
	fn from(value: &String) -> Self {
		Value::Str(value.as_str().into())
	}
}

impl<D: Dom> From<Rc<str>> for Value<D> {
	fn from(value: Rc<str>) -> Self {
		Value::Str(value)
	}
}

impl<D: Dom> From<char> for Value<D> {
	fn from(value: char) -> Self {
		Value::Str(value.to_string().into())
	}
}

impl<D: Dom> From<()> for Value<D> {
	fn from((): ()) -> Self {
		Value::Null
	}
}

impl<D: Dom, T: Into<Value<D>>> From<Option<T>> for Value<D> {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

impl<D: Dom, T: Into<Value<D>>> From<Vec<T>> for Value<D> {
	fn from(value: Vec<T>) -> Self {
		Value::List(value.into_iter().map(Into::into).collect())
	}
}

impl<D: Dom> From<TemplateResult<D>> for Value<D> {
	fn from(value: TemplateResult<D>) -> Self {
		Value::Template(value)
	}
}

impl<D: Dom> From<DirectiveResult<D>> for Value<D> {
	fn from(value: DirectiveResult<D>) -> Self {
		Value::Directive(value)
	}
}

impl<D: Dom> From<EventListener<D>> for Value<D> {
	fn from(value: EventListener<D>) -> Self {
		Value::Listener(value)
	}
}

impl<D: Dom> FromIterator<Value<D>> for Value<D> {
	fn from_iter<I: IntoIterator<Item = Value<D>>>(iter: I) -> Self {
		Value::List(iter.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryDom;
	use pretty_assertions::assert_eq;

	type V = Value<MemoryDom>;

	#[test]
	fn numbers_render_like_script_numbers() {
		assert_eq!(V::from(1).to_text(), "1");
		assert_eq!(V::from(1.5).to_text(), "1.5");
		assert_eq!(V::from(-0.0).to_text(), "0");
		assert_eq!(V::from(f64::NAN).to_text(), "NaN");
		assert_eq!(V::from(f64::NEG_INFINITY).to_text(), "-Infinity");
		assert_eq!(V::from(123.456).to_text(), "123.456");
		assert_eq!(V::from(-0.5).to_text(), "-0.5");
		assert_eq!(V::from(0.000_001).to_text(), "0.000001");
		assert_eq!(V::from(1e20).to_text(), "100000000000000000000");
	}

	#[test]
	fn large_and_tiny_numbers_switch_to_exponents() {
		assert_eq!(V::from(1e21).to_text(), "1e+21");
		assert_eq!(V::from(1e-7).to_text(), "1e-7");
		assert_eq!(V::from(1.5e-7).to_text(), "1.5e-7");
		assert_eq!(V::from(-2.5e25).to_text(), "-2.5e+25");
		assert_eq!(V::from(f64::MAX).to_text(), "1.7976931348623157e+308");
		assert_eq!(V::from(5e-324).to_text(), "5e-324");
	}

	#[test]
	fn lists_join_with_commas() {
		let list: V = vec![V::from(1), V::Null, V::from("a")].into();
		assert_eq!(list.to_text(), "1,,a");
	}

	#[test]
	fn sameness_is_strict() {
		assert!(V::from("a").same(&V::from("a")));
		assert!(V::from(f64::NAN).same(&V::from(f64::NAN)));
		assert!(!V::from(f64::NAN).same(&V::from(0)));
		assert!(!V::from(1).same(&V::from("1")));

		let object = V::object(5_u8);
		assert!(object.same(&object.clone()));
		assert!(!object.same(&V::object(5_u8)));

		let listener = V::listener(|_| ());
		assert!(listener.same(&listener.clone()));
		assert!(!listener.same(&V::listener(|_| ())));
	}

	#[test]
	fn truthiness() {
		assert!(!V::Nothing.is_truthy());
		assert!(!V::from(0).is_truthy());
		assert!(!V::from("").is_truthy());
		assert!(!V::from(None::<bool>).is_truthy());
		assert!(V::from("false").is_truthy());
		assert!(V::object(()).is_truthy());
	}
}
