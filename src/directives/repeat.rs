use crate::{
	directive::{directive, Directive, PartInfo},
	dom::Dom,
	error::DirectiveError,
	template::PartKind,
	value::{Key, Value},
};
use std::rc::Rc;

/// See [`repeat`].
pub struct Repeat;

impl<D: Dom> Directive<D> for Repeat {
	type Props = Rc<[(Key, Value<D>)]>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require("repeat", "child", &[PartKind::Child])?;
		Ok(Self)
	}

	fn render(&mut self, items: &Rc<[(Key, Value<D>)]>) -> Value<D> {
		Value::Keyed(Rc::clone(items))
	}
}

/// Renders `items` as a keyed list, so that each item's DOM follows its key when the order changes.
///
/// Keys should be unique. Items with a key that was already used earlier in the list are re-created on every render.
///
/// ```
/// use lit_dom::{directives::repeat, html, memory::MemoryDom, value::Value};
///
/// let names = vec!["Ada", "Grace"];
/// let list: Value<MemoryDom> = repeat(names, |name, _| *name, |name, index| html!("<li>" {index} ": " {name} "</li>").into());
/// # let _ = list;
/// ```
pub fn repeat<D, T, K>(
	items: impl IntoIterator<Item = T>,
	key_fn: impl Fn(&T, usize) -> K,
	template_fn: impl Fn(T, usize) -> Value<D>,
) -> Value<D>
where
	D: Dom,
	K: Into<Key>,
{
	let items: Rc<[(Key, Value<D>)]> = items
		.into_iter()
		.enumerate()
		.map(|(index, item)| (key_fn(&item, index).into(), template_fn(item, index)))
		.collect();
	directive::<D, Repeat>(items)
}
