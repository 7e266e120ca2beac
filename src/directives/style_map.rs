use crate::{
	directive::{directive, Directive, PartInfo},
	dom::Dom,
	error::DirectiveError,
	template::PartKind,
	value::Value,
};
use std::rc::Rc;

/// See [`style_map`].
pub struct StyleMap;

impl<D: Dom> Directive<D> for StyleMap {
	type Props = Vec<(Rc<str>, Option<Rc<str>>)>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require("style_map", "attribute", &[PartKind::Attribute])?;
		if part.name != Some("style") || part.strings.map_or(false, |strings| strings.len() > 2) {
			return Err(DirectiveError::Placement {
				directive: "style_map",
				reason: "must be the only binding in a `style` attribute",
			});
		}
		Ok(Self)
	}

	fn render(&mut self, declarations: &Vec<(Rc<str>, Option<Rc<str>>)>) -> Value<D> {
		let mut style = String::new();
		for (property, value) in declarations {
			if let Some(value) = value {
				style.push_str(&css_property_name(property));
				style.push(':');
				style.push_str(value);
				style.push(';');
			}
		}
		style.into()
	}
}

/// `fontSize` → `font-size`, `webkitAppearance` → `-webkit-appearance`. Names containing `-` are kept as they are.
fn css_property_name(name: &str) -> String {
	if name.contains('-') {
		return name.to_owned();
	}
	let vendor = ["webkit", "moz", "ms", "o"].iter().any(|prefix| {
		name.strip_prefix(prefix)
			.and_then(|rest| rest.chars().next())
			.map_or(false, char::is_uppercase)
	});
	let mut css = String::with_capacity(name.len() + 4);
	if vendor {
		css.push('-');
	}
	for c in name.chars() {
		if c.is_uppercase() {
			css.push('-');
			css.extend(c.to_lowercase());
		} else {
			css.push(c);
		}
	}
	css
}

/// Renders `property:value;` declarations into a `style` attribute, skipping properties without a value.
///
/// Property names may be given in `camelCase`.
pub fn style_map<D, P, V>(declarations: impl IntoIterator<Item = (P, Option<V>)>) -> Value<D>
where
	D: Dom,
	P: Into<Rc<str>>,
	V: Into<Rc<str>>,
{
	directive::<D, StyleMap>(
		declarations
			.into_iter()
			.map(|(property, value)| (property.into(), value.map(Into::into)))
			.collect(),
	)
}

#[cfg(test)]
mod tests {
	use super::css_property_name;

	#[test]
	fn property_names() {
		assert_eq!(css_property_name("color"), "color");
		assert_eq!(css_property_name("fontSize"), "font-size");
		assert_eq!(css_property_name("webkitAppearance"), "-webkit-appearance");
		assert_eq!(css_property_name("--my-var"), "--my-var");
		assert_eq!(css_property_name("opacity"), "opacity");
	}
}
