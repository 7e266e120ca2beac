use crate::{
	directive::{directive, Directive, PartContext, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	part::AttributePart,
	template::PartKind,
	value::Value,
};
use core::mem;
use std::rc::Rc;
use tracing::trace;

/// See [`spread`].
pub struct Spread<D: Dom> {
	/// By prefixed name, in order of first appearance.
	parts: Vec<(Rc<str>, AttributePart<D>)>,
}

impl<D: Dom> Directive<D> for Spread<D> {
	type Props = Vec<(Rc<str>, Value<D>)>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require("spread", "element", &[PartKind::Element])?;
		Ok(Self { parts: Vec::new() })
	}

	fn render(&mut self, _: &Vec<(Rc<str>, Value<D>)>) -> Value<D> {
		Value::NoChange
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, entries: &Vec<(Rc<str>, Value<D>)>) -> Result<Value<D>, Error> {
		for (name, old) in mem::take(&mut self.parts) {
			if entries.iter().any(|(entry, _)| *entry == name) {
				self.parts.push((name, old));
			} else {
				trace!("Spread entry {:?} went away.", name);
				old.commit(Value::Nothing)?;
				old.set_connected(false);
			}
		}

		for (name, value) in entries {
			let index = match self.parts.iter().position(|(existing, _)| existing == name) {
				Some(index) => index,
				None => {
					let (kind, bare) = match name.chars().next() {
						Some('.') => (PartKind::Property, &name[1..]),
						Some('?') => (PartKind::BooleanAttribute, &name[1..]),
						Some('@') => (PartKind::Event, &name[1..]),
						_ => (PartKind::Attribute, &**name),
					};
					let Some(sub_part) = part.create_attribute_part(bare, kind) else {
						return Err(DirectiveError::Placement {
							directive: "spread",
							reason: "needs an element to bind to",
						}
						.into());
					};
					self.parts.push((Rc::clone(name), sub_part));
					self.parts.len() - 1
				}
			};
			self.parts[index].1.commit(value.clone())?;
		}
		Ok(Value::NoChange)
	}

	fn disconnected(&mut self) {
		for (_, part) in &self.parts {
			part.set_connected(false);
		}
	}

	fn reconnected(&mut self) {
		for (_, part) in &self.parts {
			part.set_connected(true);
		}
	}
}

/// Binds a dynamic set of attributes, properties (`.name`), boolean attributes (`?name`) and event listeners (`@name`)
/// to an element: `<input ${spread(…)}>`.
///
/// Entries missing from a later render are cleared. Entries also bound statically or by the template are not
/// coordinated with; whichever writes last wins.
pub fn spread<D, N, V>(entries: impl IntoIterator<Item = (N, V)>) -> Value<D>
where
	D: Dom,
	N: Into<Rc<str>>,
	V: Into<Value<D>>,
{
	directive::<D, Spread<D>>(entries.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
}
