use crate::template::PartKind;
use thiserror::Error;

/// A malformed template, reported when it is first compiled.
///
/// `string` is the index of the static string the problem was found in,
/// `offset` the byte offset inside that string.
/// Offsets equal to the string's length point at the binding that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (static string {string}, byte {offset})")]
pub struct TemplateError {
	pub kind: TemplateErrorKind,
	pub string: usize,
	pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TemplateErrorKind {
	#[error("templates need at least one static string")]
	Empty,
	#[error("bindings are not allowed inside tag names")]
	BindingInTagName,
	#[error("bindings are not allowed inside end tags")]
	BindingInEndTag,
	#[error("bindings are not allowed inside attribute names")]
	BindingInAttributeName,
	#[error("bindings are not allowed inside comments")]
	BindingInComment,
	#[error("a binding inside <{0}> must be its entire text content")]
	PartialRawTextBinding(String),
	#[error("`{0}` must be bound to a single value without surrounding text")]
	InterpolatedBinding(String),
	#[error("the prefixed attribute `{0}` has no binding")]
	PrefixWithoutBinding(String),
	#[error("template ends inside a {0}")]
	Unterminated(&'static str),
}

/// A directive was used somewhere it can't work, or was handed a value it can't use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DirectiveError {
	#[error("`{directive}` can only be used in {expected} bindings, not in a {found} binding")]
	KindMismatch {
		directive: &'static str,
		expected: &'static str,
		found: PartKind,
	},
	#[error("`{directive}` {reason}")]
	Placement { directive: &'static str, reason: &'static str },
	#[error("`{directive}` expected {expected}")]
	InvalidValue { directive: &'static str, expected: &'static str },
}

/// Everything that can fail while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
	#[error(transparent)]
	Template(#[from] TemplateError),
	#[error(transparent)]
	Directive(#[from] DirectiveError),
	#[error("template expects {expected} value(s) but received {found}")]
	ValueCount { expected: usize, found: usize },
}
