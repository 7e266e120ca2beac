use crate::{
	directive::{directive, Directive, PartInfo},
	dom::Dom,
	error::DirectiveError,
	value::Value,
};

/// See [`guard`].
pub struct Guard<D: Dom> {
	deps: Option<Vec<Value<D>>>,
}

pub struct GuardProps<D: Dom> {
	deps: Vec<Value<D>>,
	render: Box<dyn Fn() -> Value<D>>,
}

impl<D: Dom> Directive<D> for Guard<D> {
	type Props = GuardProps<D>;

	fn new(_: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		Ok(Self { deps: None })
	}

	fn render(&mut self, props: &GuardProps<D>) -> Value<D> {
		let unchanged = self.deps.as_ref().map_or(false, |deps| {
			deps.len() == props.deps.len() && deps.iter().zip(&props.deps).all(|(old, new)| old.same(new))
		});
		if unchanged {
			return Value::NoChange;
		}
		self.deps = Some(props.deps.clone());
		(props.render)()
	}
}

/// Calls `render` only if one of `deps` changed (by [`Value::same`]) since the last render here.
pub fn guard<D, I>(deps: I, render: impl Fn() -> Value<D> + 'static) -> Value<D>
where
	D: Dom,
	I: IntoIterator,
	I::Item: Into<Value<D>>,
{
	directive::<D, Guard<D>>(GuardProps {
		deps: deps.into_iter().map(Into::into).collect(),
		render: Box::new(render),
	})
}
