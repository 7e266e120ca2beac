//! Template instances: one cloned copy of a template's static tree plus a part per binding.

use crate::{
	dom::Dom,
	error::Error,
	part::{AttributePart, ChildPart, ElementPart, Part, RawTextPart, Scope},
	template::{PartKind, StaticNode, Template},
	value::Value,
};
use core::fmt;
use std::rc::Rc;
use tracing::{trace, trace_span};

pub struct TemplateInstance<D: Dom> {
	template: Rc<Template>,
	parts: Vec<Part<D>>,
}

impl<D: Dom> TemplateInstance<D> {
	/// Builds the template's nodes into a new fragment and creates its parts.
	///
	/// The parts are not committed yet; call [`TemplateInstance::update`] before inserting the fragment.
	pub(crate) fn create(template: Rc<Template>, scope: &Rc<Scope<D>>, connected: bool) -> (D::Node, Self) {
		let span = trace_span!("Instantiating template", key = ?template.key());
		let _enter = span.enter();

		let dom = &scope.dom;
		let fragment = dom.create_fragment();
		let mut created = Vec::new();
		build(dom, &fragment, template.nodes(), &mut created);

		let mut parts = Vec::with_capacity(template.bindings().len());
		for binding in template.bindings() {
			let node = created[binding.node_index()].clone();
			let part = match binding.kind() {
				PartKind::Child => {
					let mut end = dom.next_sibling(&node);
					if end.is_none() && binding.path().len() == 1 {
						// A trailing top-level binding still needs a bound once the fragment is emptied into a region.
						let marker = dom.create_comment("");
						dom.insert_before(&fragment, &marker, None);
						end = Some(marker);
					}
					Part::Child(ChildPart::new(Rc::clone(scope), node, end, connected))
				}
				kind @ (PartKind::Attribute | PartKind::Property | PartKind::BooleanAttribute | PartKind::Event) => {
					Part::Attribute(AttributePart::new(
						Rc::clone(scope),
						node,
						binding.name().unwrap_or_default().to_owned(),
						kind,
						binding.strings.clone(),
						connected,
					))
				}
				PartKind::Element => Part::Element(ElementPart::new(Rc::clone(scope), node, connected)),
				PartKind::RawText => {
					let Some(element) = dom.parent(&node) else {
						unreachable!("lit-dom bug: raw text node without its element")
					};
					Part::RawText(RawTextPart::new(Rc::clone(scope), element, node, connected))
				}
			};
			parts.push(part);
		}
		trace!("Created {} part(s) from {} node(s).", parts.len(), created.len());

		(fragment, Self { template, parts })
	}

	/// Commits one evaluation's values, in binding order.
	///
	/// # Errors
	///
	/// Iff the number of values doesn't match the template, or committing any of them fails.
	/// In the latter case, parts after the failing one keep their previous values.
	pub fn update(&mut self, values: Vec<Value<D>>) -> Result<(), Error> {
		if values.len() != self.template.value_count() {
			return Err(Error::ValueCount {
				expected: self.template.value_count(),
				found: values.len(),
			});
		}

		let mut values = values.into_iter();
		for (part, binding) in self.parts.iter().zip(self.template.bindings()) {
			match part {
				Part::Child(part) => part.commit(next(&mut values))?,
				Part::Attribute(part) if binding.strings().is_some() => {
					part.commit_all(values.by_ref().take(binding.value_count()).collect())?;
				}
				Part::Attribute(part) => part.commit(next(&mut values))?,
				Part::Element(part) => part.commit(next(&mut values))?,
				Part::RawText(part) => part.commit(next(&mut values))?,
			}
		}
		Ok(())
	}

	pub fn set_connected(&mut self, connected: bool) {
		for part in &self.parts {
			part.set_connected(connected);
		}
	}

	#[must_use]
	pub fn template(&self) -> &Rc<Template> {
		&self.template
	}

	#[must_use]
	pub fn parts(&self) -> &[Part<D>] {
		&self.parts
	}
}

impl<D: Dom> fmt::Debug for TemplateInstance<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateInstance")
			.field("template", &self.template.key())
			.field("parts", &self.parts)
			.finish()
	}
}

fn next<D: Dom>(values: &mut impl Iterator<Item = Value<D>>) -> Value<D> {
	// Counted beforehand.
	values.next().unwrap_or(Value::Nothing)
}

/// Creates `nodes` under `parent`, recording every node in pre-order.
fn build<D: Dom>(dom: &D, parent: &D::Node, nodes: &[StaticNode], created: &mut Vec<D::Node>) {
	for node in nodes {
		let handle = match node {
			StaticNode::Element {
				name,
				namespace,
				attributes,
				children,
			} => {
				let element = dom.create_element(name, *namespace);
				for (name, value) in attributes {
					dom.set_attribute(&element, name, value);
				}
				created.push(element.clone());
				build(dom, &element, children, created);
				element
			}
			StaticNode::Text(text) => {
				let text = dom.create_text(text);
				created.push(text.clone());
				text
			}
			StaticNode::Comment(comment) => {
				let comment = dom.create_comment(comment);
				created.push(comment.clone());
				comment
			}
			StaticNode::Marker => {
				let marker = dom.create_comment("");
				created.push(marker.clone());
				marker
			}
		};
		dom.insert_before(parent, &handle, None);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		dom::Namespace,
		memory::MemoryDom,
		template::{TemplateCache, TemplateKind},
	};
	use pretty_assertions::assert_eq;

	fn scope(dom: &MemoryDom) -> Rc<Scope<MemoryDom>> {
		Rc::new(Scope::new(dom.clone(), Rc::new(TemplateCache::new()), None, None))
	}

	#[test]
	fn parts_follow_binding_order() {
		let dom = MemoryDom::new();
		let template = Rc::new(
			Template::compile(&["<div a=", " b=\"x", "y\" @c=", "><p>", "</p></div>", ""], TemplateKind::Html).unwrap(),
		);
		let (_, instance) = TemplateInstance::create(template, &scope(&dom), true);
		let kinds: Vec<_> = instance.parts().iter().map(Part::kind).collect();
		assert_eq!(
			kinds,
			vec![
				PartKind::Attribute,
				PartKind::Attribute,
				PartKind::Event,
				PartKind::Child,
				PartKind::Child
			]
		);
	}

	#[test]
	fn trailing_bindings_get_an_end_marker() {
		let dom = MemoryDom::new();
		let template = Rc::new(Template::compile(&["<b></b>", ""], TemplateKind::Html).unwrap());
		let (fragment, mut instance) = TemplateInstance::create(template, &scope(&dom), true);
		instance.update(vec!["x".into()]).unwrap();

		let container = dom.create_element("div", Namespace::Html);
		let after = dom.create_text("after");
		dom.insert_before(&container, &after, None);
		dom.insert_before(&container, &fragment, Some(&after));
		match &instance.parts()[0] {
			Part::Child(part) => part.commit("y").unwrap(),
			part => panic!("unexpected {:?}", part),
		}
		assert_eq!(dom.markup(container), "<b></b>yafter");
	}

	#[test]
	fn value_count_is_checked() {
		let dom = MemoryDom::new();
		let template = Rc::new(Template::compile(&["<i>", "</i>"], TemplateKind::Html).unwrap());
		let (_, mut instance) = TemplateInstance::create(template, &scope(&dom), true);
		assert_eq!(
			instance.update(Vec::new()),
			Err(Error::ValueCount { expected: 1, found: 0 })
		);
	}
}
