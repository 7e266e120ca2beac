use crate::{
	directive::{directive, Directive, PartContext, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	part::DetachedTemplate,
	template::{PartKind, TemplateKey},
	value::Value,
};
use hashbrown::HashMap;
use tracing::trace;

/// See [`cache`].
pub struct Cache<D: Dom> {
	stash: HashMap<TemplateKey, DetachedTemplate<D>>,
}

impl<D: Dom> Directive<D> for Cache<D> {
	type Props = Value<D>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require("cache", "child", &[PartKind::Child])?;
		Ok(Self { stash: HashMap::new() })
	}

	fn render(&mut self, value: &Value<D>) -> Value<D> {
		value.clone()
	}

	fn update(&mut self, part: &mut PartContext<'_, D>, value: &Value<D>) -> Result<Value<D>, Error> {
		let Some(child) = part.child() else {
			return Ok(value.clone());
		};

		let next = match value {
			Value::Template(result) => Some(result.key()),
			_ => None,
		};
		let current = child.template_key();
		if current.is_some() && current != next {
			if let Some(detached) = child.detach_template() {
				self.stash.insert(detached.key(), detached);
			}
		}
		if let Some(key) = next.filter(|&key| current != Some(key)) {
			if let Some(detached) = self.stash.remove(&key) {
				trace!("Restoring a cached template instance.");
				child.attach_template(detached);
			}
		}
		Ok(value.clone())
	}
}

/// Keeps the DOM of templates rendered here around while other content is shown,
/// and reuses it when the same template is rendered again.
///
/// Cached instances are disconnected while detached and reconnected on reuse.
pub fn cache<D: Dom>(value: impl Into<Value<D>>) -> Value<D> {
	directive::<D, Cache<D>>(value.into())
}
