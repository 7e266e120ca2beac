use crate::{dom::Dom, value::Value};

/// Turns [`Value::Null`] (for example from [`None`]) into [`Value::Nothing`], so that the binding is cleared.
///
/// For plain attributes, this removes the attribute.
pub fn if_defined<D: Dom>(value: impl Into<Value<D>>) -> Value<D> {
	match value.into() {
		Value::Null => Value::Nothing,
		value => value,
	}
}
