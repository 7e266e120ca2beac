use crate::{
	directive::{directive, Directive, PartContext, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	template::PartKind,
	value::Value,
};

/// See [`live`].
pub struct Live;

impl<D: Dom> Directive<D> for Live {
	type Props = Value<D>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require(
			"live",
			"attribute, property or boolean attribute",
			&[PartKind::Attribute, PartKind::Property, PartKind::BooleanAttribute],
		)?;
		if !part.is_single_value() {
			return Err(DirectiveError::Placement {
				directive: "live",
				reason: "must be the entire value of its binding",
			});
		}
		Ok(Self)
	}

	fn render(&mut self, value: &Value<D>) -> Value<D> {
		value.clone()
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, value: &Value<D>) -> Result<Value<D>, Error> {
		if matches!(value, Value::NoChange | Value::Nothing) {
			return Ok(value.clone());
		}

		let unchanged = {
			let (Some(element), Some(name)) = (part.element(), part.name()) else {
				return Ok(value.clone());
			};
			let dom = part.dom();
			match part.kind() {
				PartKind::Property => dom.property(element, name).same(value),
				PartKind::BooleanAttribute => dom.attribute(element, name).is_some() == value.is_truthy(),
				_ => dom.attribute(element, name).as_deref() == Some(value.to_text().as_str()),
			}
		};
		if unchanged {
			return Ok(Value::NoChange);
		}
		// Written even if it equals the last committed value.
		part.reset_committed();
		Ok(value.clone())
	}
}

/// Checks `value` against the element's current attribute or property instead of the last rendered value.
///
/// Use this for state the user can change, like an input's `.value`.
pub fn live<D: Dom>(value: impl Into<Value<D>>) -> Value<D> {
	directive::<D, Live>(value.into())
}
