mod common;

use common::setup;
use lit_dom::{
	dom::{Dom, Namespace},
	error::{Error, TemplateError, TemplateErrorKind},
	html,
	memory::{MemoryDom, Mutations},
	value::Value,
	RenderOptions, TemplateResult,
};
use pretty_assertions::assert_eq;

fn paragraph(text: &str) -> TemplateResult<MemoryDom> {
	html!("<p>" {text} "</p>")
}

fn italic(value: Value<MemoryDom>) -> TemplateResult<MemoryDom> {
	html!("<i>" {value} "</i>")
}

#[test]
fn rerendering_updates_in_place() {
	let (dom, container, renderer) = setup();
	renderer.render(paragraph("A"), &container, RenderOptions::default()).unwrap();
	let p = dom.query(container, "p").unwrap();
	assert_eq!(dom.markup(container), "<p>A</p>");
	dom.reset_mutations();

	renderer.render(paragraph("B"), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.query_all(container, "p"), vec![p]);
	assert_eq!(dom.markup(container), "<p>B</p>");
	assert_eq!(dom.mutations().created, 0);
	assert_eq!(dom.mutations().writes(), 1);
	assert_eq!(renderer.templates().compilations(), 1);
}

#[test]
fn identical_values_cause_no_writes() {
	let (dom, container, renderer) = setup();
	let page = |title: &str, hidden: bool| -> TemplateResult<MemoryDom> {
		html!(
			"<section title=" {title} " ?hidden=" {hidden} ">"
				"<h1 class=\"heading " {title} "\">" {title} "</h1>"
				"<ul>" {vec![1, 2, 3]} "</ul>"
			"</section>"
		)
	};

	renderer.render(page("x", true), &container, RenderOptions::default()).unwrap();
	assert_eq!(
		dom.markup(container),
		r#"<section title="x" hidden=""><h1 class="heading x">x</h1><ul>123</ul></section>"#
	);
	dom.reset_mutations();

	renderer.render(page("x", true), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.mutations(), Mutations::default());
}

#[test]
fn rebinding_nan_causes_no_writes() {
	let (dom, container, renderer) = setup();
	let view = |value: f64| -> TemplateResult<MemoryDom> { html!("<meter value=" {value} ">" {value} "</meter>") };

	renderer.render(view(f64::NAN), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), r#"<meter value="NaN">NaN</meter>"#);
	dom.reset_mutations();

	renderer.render(view(f64::NAN), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.mutations(), Mutations::default());

	renderer.render(view(1e21), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), r#"<meter value="1e+21">1e+21</meter>"#);
}

#[test]
fn no_change_keeps_the_committed_value() {
	let (dom, container, renderer) = setup();
	renderer.render(italic("kept".into()), &container, RenderOptions::default()).unwrap();
	dom.reset_mutations();

	renderer.render(italic(Value::NoChange), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<i>kept</i>");
	assert_eq!(dom.mutations().writes(), 0);
}

#[test]
fn text_is_never_parsed_as_markup() {
	let (dom, container, renderer) = setup();
	renderer
		.render(paragraph("<img src=x onerror=alert(1)>"), &container, RenderOptions::default())
		.unwrap();
	assert_eq!(dom.query(container, "img"), None);
	assert_eq!(dom.markup(container), "<p>&lt;img src=x onerror=alert(1)&gt;</p>");
}

#[test]
fn boolean_attributes_toggle() {
	let (dom, container, renderer) = setup();
	let input = |disabled: bool| -> TemplateResult<MemoryDom> { html!("<input ?disabled=" {disabled} ">") };

	renderer.render(input(true), &container, RenderOptions::default()).unwrap();
	let element = dom.query(container, "input").unwrap();
	assert_eq!(dom.attribute(&element, "disabled"), Some(String::new()));

	renderer.render(input(false), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.query(container, "input"), Some(element));
	assert_eq!(dom.attribute(&element, "disabled"), None);
}

#[test]
fn switching_templates_replaces_the_content() {
	let (dom, container, renderer) = setup();
	renderer.render(paragraph("x"), &container, RenderOptions::default()).unwrap();
	renderer.render(italic("y".into()), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<i>y</i>");

	renderer.render("plain", &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "plain");

	renderer.render(Value::Nothing, &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "");
	assert_eq!(dom.children(container).len(), 1, "only the root's start marker remains");
}

#[test]
fn nested_templates_are_updated_in_place() {
	let (dom, container, renderer) = setup();
	let card = |title: &str, body: &str| -> TemplateResult<MemoryDom> {
		html!("<article><h2>" {title} "</h2>" {paragraph(body)} "</article>")
	};

	renderer.render(card("a", "b"), &container, RenderOptions::default()).unwrap();
	let p = dom.query(container, "p").unwrap();
	dom.reset_mutations();

	renderer.render(card("a", "c"), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<article><h2>a</h2><p>c</p></article>");
	assert_eq!(dom.query(container, "p"), Some(p));
	assert_eq!(dom.mutations().writes(), 1);
}

#[test]
fn existing_content_is_replaced() {
	let (dom, container, renderer) = setup();
	let stale = dom.create_text("stale");
	dom.insert_before(&container, &stale, None);

	renderer.render(paragraph("fresh"), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<p>fresh</p>");
}

#[test]
fn render_before_keeps_following_content() {
	let (dom, container, renderer) = setup();
	let footer = dom.create_element("footer", Namespace::Html);
	dom.insert_before(&container, &footer, None);
	let before_footer = || RenderOptions {
		render_before: Some(footer),
		..RenderOptions::default()
	};

	renderer.render(paragraph("x"), &container, before_footer()).unwrap();
	assert_eq!(dom.markup(container), "<p>x</p><footer></footer>");

	renderer.render(paragraph("y"), &container, before_footer()).unwrap();
	assert_eq!(dom.markup(container), "<p>y</p><footer></footer>");
	assert_eq!(dom.query_all(container, "p").len(), 1);
}

#[test]
fn unmount_clears_the_container() {
	let (dom, container, renderer) = setup();
	renderer.render(paragraph("x"), &container, RenderOptions::default()).unwrap();
	assert!(renderer.root(&container).is_some());

	assert!(renderer.unmount(&container).unwrap());
	assert_eq!(dom.inner_html(container), "");
	assert!(renderer.root(&container).is_none());
	assert!(!renderer.unmount(&container).unwrap());
}

#[test]
fn each_container_keeps_its_own_root() {
	let (dom, _, renderer) = setup();
	let containers: Vec<_> = (0..4).map(|_| dom.create_element("div", Namespace::Html)).collect();
	for (index, container) in containers.iter().enumerate() {
		renderer.render(paragraph(&index.to_string()), container, RenderOptions::default()).unwrap();
	}
	let paragraphs: Vec<_> = containers.iter().map(|container| dom.query(*container, "p").unwrap()).collect();

	for container in &containers {
		renderer.render(paragraph("again"), container, RenderOptions::default()).unwrap();
	}
	for (container, p) in containers.iter().zip(&paragraphs) {
		assert_eq!(dom.markup(*container), "<p>again</p>");
		assert_eq!(dom.query(*container, "p"), Some(*p));
	}

	assert!(renderer.unmount(&containers[1]).unwrap());
	assert!(renderer.root(&containers[1]).is_none());
	assert!(renderer.root(&containers[2]).is_some());
	assert_ne!(dom.node_key(&containers[0]), dom.node_key(&containers[1]));
}

#[test]
fn template_errors_reach_the_caller() {
	let (_, container, renderer) = setup();
	let error = renderer
		.render(html!("<!-- " {1} " -->"), &container, RenderOptions::default())
		.unwrap_err();
	assert_eq!(
		error,
		Error::Template(TemplateError {
			kind: TemplateErrorKind::BindingInComment,
			string: 0,
			offset: 5,
		})
	);
	assert!(renderer.templates().is_empty());
}

#[test]
fn templates_are_compiled_once_per_call_site() {
	let (_, container, renderer) = setup();
	for text in ["a", "b", "c"] {
		renderer.render(paragraph(text), &container, RenderOptions::default()).unwrap();
	}
	renderer.render(italic(1.into()), &container, RenderOptions::default()).unwrap();
	assert_eq!(renderer.templates().compilations(), 2);
	assert_eq!(renderer.templates().len(), 2);
}
