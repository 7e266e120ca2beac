use crate::{
	directive::{directive, Directive, PartContext, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	template::PartKind,
	value::Value,
};
use hashbrown::HashSet;
use std::rc::Rc;

/// See [`class_map`].
pub struct ClassMap {
	/// Classes from the template's static text, which are never removed.
	fixed: HashSet<Rc<str>>,
	/// Classes this directive added. [`None`] before the first render.
	applied: Option<HashSet<Rc<str>>>,
}

impl<D: Dom> Directive<D> for ClassMap {
	type Props = Vec<(Rc<str>, bool)>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require("class_map", "attribute", &[PartKind::Attribute])?;
		if part.name != Some("class") || part.strings.map_or(false, |strings| strings.len() > 2) {
			return Err(DirectiveError::Placement {
				directive: "class_map",
				reason: "must be the only binding in a `class` attribute",
			});
		}
		Ok(Self {
			fixed: part
				.strings
				.into_iter()
				.flatten()
				.flat_map(|string| string.split_ascii_whitespace())
				.map(Rc::from)
				.collect(),
			applied: None,
		})
	}

	fn render(&mut self, classes: &Vec<(Rc<str>, bool)>) -> Value<D> {
		let names: Vec<&str> = classes.iter().filter(|(_, on)| *on).map(|(name, _)| &**name).collect();
		names.join(" ").into()
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, classes: &Vec<(Rc<str>, bool)>) -> Result<Value<D>, Error> {
		let wanted: HashSet<Rc<str>> = classes.iter().filter(|(_, on)| *on).map(|(name, _)| Rc::clone(name)).collect();
		let Some(applied) = self.applied.replace(wanted.clone()) else {
			return Ok(<Self as Directive<D>>::render(self, classes));
		};
		let Some(element) = part.element() else {
			return Ok(Value::NoChange);
		};

		// Edits the live attribute in place, so that classes added by others survive.
		let dom = part.dom();
		let current = dom.attribute(element, "class").unwrap_or_default();
		let mut tokens: Vec<&str> = current
			.split_ascii_whitespace()
			.filter(|token| wanted.contains(*token) || self.fixed.contains(*token) || !applied.contains(*token))
			.collect();
		for (name, on) in classes {
			if *on && !tokens.contains(&&**name) {
				tokens.push(name);
			}
		}
		let next = tokens.join(" ");
		if next != current {
			dom.set_attribute(element, "class", &next);
		}
		Ok(Value::NoChange)
	}
}

/// Sets the classes whose flag is `true` on a `class` attribute.
///
/// After the first render, classes are added and removed individually instead of rewriting the attribute.
pub fn class_map<D, N>(classes: impl IntoIterator<Item = (N, bool)>) -> Value<D>
where
	D: Dom,
	N: Into<Rc<str>>,
{
	directive::<D, ClassMap>(classes.into_iter().map(|(name, on)| (name.into(), on)).collect())
}
