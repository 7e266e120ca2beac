use crate::{
	directive::{directive, Directive, PartContext, PartInfo},
	dom::Dom,
	error::{DirectiveError, Error},
	template::{PartKind, Template, TemplateKind},
	value::{TemplateResult, Value},
};
use std::rc::Rc;
use tracing::debug;

/// Compiles markup strings into binding-free templates, remembering the last one.
struct Markup {
	directive: &'static str,
	kind: TemplateKind,
	last: Option<(Rc<str>, Rc<Template>)>,
}

impl Markup {
	fn new<D: Dom>(directive: &'static str, kind: TemplateKind, part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		part.require(directive, "child", &[PartKind::Child])?;
		Ok(Self {
			directive,
			kind,
			last: None,
		})
	}

	fn update<D: Dom>(&mut self, value: &Value<D>) -> Result<Value<D>, Error> {
		let markup = match value {
			Value::NoChange => return Ok(Value::NoChange),
			Value::Nothing | Value::Null => {
				self.last = None;
				return Ok(Value::Nothing);
			}
			Value::Str(markup) => markup,
			_ => {
				return Err(DirectiveError::InvalidValue {
					directive: self.directive,
					expected: "a markup string",
				}
				.into())
			}
		};

		let template = match &self.last {
			Some((last, template)) if last == markup => Rc::clone(template),
			_ => {
				let template = Rc::new(Template::compile(&[&**markup], self.kind)?);
				debug!("Compiled {} bytes of unsafe markup.", markup.len());
				self.last = Some((Rc::clone(markup), Rc::clone(&template)));
				template
			}
		};
		Ok(TemplateResult::from_template(template, Vec::new()).into())
	}
}

/// See [`unsafe_html`].
pub struct UnsafeHtml(Markup);

impl<D: Dom> Directive<D> for UnsafeHtml {
	type Props = Value<D>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		Markup::new("unsafe_html", TemplateKind::Html, part).map(Self)
	}

	fn render(&mut self, value: &Value<D>) -> Value<D> {
		value.clone()
	}

	fn update(&mut self, _: &mut PartContext<'_, D>, value: &Value<D>) -> Result<Value<D>, Error> {
		self.0.update(value)
	}
}

/// See [`unsafe_svg`].
pub struct UnsafeSvg(Markup);

impl<D: Dom> Directive<D> for UnsafeSvg {
	type Props = Value<D>;

	fn new(part: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		Markup::new("unsafe_svg", TemplateKind::Svg, part).map(Self)
	}

	fn render(&mut self, value: &Value<D>) -> Value<D> {
		value.clone()
	}

	fn update(&mut self, _: &mut PartContext<'_, D>, value: &Value<D>) -> Result<Value<D>, Error> {
		self.0.update(value)
	}
}

/// Renders `markup` as HTML.
///
/// This parses its argument, so **never** pass it anything derived from user input.
/// [`Value::Nothing`] and [`Value::Null`] clear the binding, other non-string values are an error.
pub fn unsafe_html<D: Dom>(markup: impl Into<Value<D>>) -> Value<D> {
	directive::<D, UnsafeHtml>(markup.into())
}

/// Like [`unsafe_html`], but parses `markup` as SVG content.
pub fn unsafe_svg<D: Dom>(markup: impl Into<Value<D>>) -> Value<D> {
	directive::<D, UnsafeSvg>(markup.into())
}
