mod common;

use common::{setup, tracked, Log};
use lit_dom::{
	directives::repeat,
	dom::{Dom, Namespace},
	html,
	memory::MemoryDom,
	value::Value,
	RenderOptions, TemplateResult,
};
use pretty_assertions::assert_eq;

fn keyed(keys: &[&str]) -> TemplateResult<MemoryDom> {
	html!(
		"<ul>"
			{repeat(
				keys.to_vec(),
				|key: &&str, _: usize| *key,
				|key: &str, _: usize| -> Value<MemoryDom> { html!("<li>" {key} "</li>").into() },
			)}
		"</ul>"
	)
}

#[test]
fn shrinking_an_unkeyed_list_disconnects_the_rest() {
	let (dom, container, renderer) = setup();
	let log = Log::default();
	let items = |count: usize| -> TemplateResult<MemoryDom> {
		html!("<div>" {(1..=count).map(|i| tracked(&log, &i.to_string())).collect::<Value<MemoryDom>>()} "</div>")
	};

	renderer.render(items(3), &container, RenderOptions::default()).unwrap();
	let div = dom.query(container, "div").unwrap();
	assert_eq!(dom.markup(div), "123");

	renderer.render(items(1), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(div), "1");
	// The list's marker, then the remaining item's markers around its text.
	assert_eq!(dom.children(div).len(), 4);
	assert_eq!(*log.borrow(), ["2 disconnected", "3 disconnected"]);
}

#[test]
fn unkeyed_lists_update_items_in_place() {
	let (dom, container, renderer) = setup();
	let items = |texts: &[&str]| -> TemplateResult<MemoryDom> {
		let item = |text: &str| -> Value<MemoryDom> { html!("<li>" {text} "</li>").into() };
		html!("<ol>" {texts.iter().map(|text| item(text)).collect::<Value<MemoryDom>>()} "</ol>")
	};

	renderer.render(items(&["a", "b"]), &container, RenderOptions::default()).unwrap();
	let lis = dom.query_all(container, "li");
	dom.reset_mutations();

	renderer.render(items(&["b", "a", "c"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<ol><li>b</li><li>a</li><li>c</li></ol>");
	assert_eq!(dom.query_all(container, "li")[..2], lis[..]);
	assert_eq!(dom.mutations().elements_created, 1);
	assert_eq!(dom.mutations().moved, 0);
}

#[test]
fn keyed_rotation_moves_one_item() {
	let (dom, container, renderer) = setup();
	renderer.render(keyed(&["a", "b", "c"]), &container, RenderOptions::default()).unwrap();
	let lis = dom.query_all(container, "li");
	dom.reset_mutations();

	renderer.render(keyed(&["c", "a", "b"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<ul><li>c</li><li>a</li><li>b</li></ul>");
	assert_eq!(dom.query_all(container, "li"), vec![lis[2], lis[0], lis[1]]);
	assert_eq!(dom.mutations().created, 0);
	// One item: its two markers and its `<li>`.
	assert_eq!(dom.mutations().moved, 3);
	assert_eq!(dom.mutations().writes(), 3);
}

#[test]
fn keyed_lists_insert_and_remove_by_key() {
	let (dom, container, renderer) = setup();
	renderer.render(keyed(&["a", "b", "c"]), &container, RenderOptions::default()).unwrap();
	let b = dom.query_all(container, "li")[1];
	dom.reset_mutations();

	renderer.render(keyed(&["b", "d"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<ul><li>b</li><li>d</li></ul>");
	assert_eq!(dom.query_all(container, "li")[0], b);
	assert_eq!(dom.mutations().elements_created, 1);
	assert_eq!(dom.mutations().moved, 0);

	renderer.render(keyed(&[]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<ul></ul>");
}

#[test]
fn keyed_reversal_keeps_every_node() {
	let (dom, container, renderer) = setup();
	let keys = ["1", "2", "3", "4", "5"];
	renderer.render(keyed(&keys), &container, RenderOptions::default()).unwrap();
	let mut lis = dom.query_all(container, "li");
	dom.reset_mutations();

	let reversed: Vec<&str> = keys.iter().rev().copied().collect();
	renderer.render(keyed(&reversed), &container, RenderOptions::default()).unwrap();
	lis.reverse();
	assert_eq!(dom.query_all(container, "li"), lis);
	assert_eq!(dom.text_content(container), "54321");
	assert_eq!(dom.mutations().created, 0);
	assert_eq!(dom.mutations().moved, 4 * 3);
}

#[test]
fn duplicate_keys_still_render_every_item() {
	let (dom, container, renderer) = setup();
	renderer.render(keyed(&["a", "a", "b"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.text_content(container), "aab");

	renderer.render(keyed(&["b", "a", "a"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.text_content(container), "baa");
}

#[test]
fn lists_and_text_replace_each_other() {
	let (dom, container, renderer) = setup();
	let view = |value: Value<MemoryDom>| -> TemplateResult<MemoryDom> { html!("<p>" {value} "</p>") };

	renderer.render(view(vec!["a", "b"].into()), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<p>ab</p>");

	renderer.render(view("text".into()), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<p>text</p>");

	renderer.render(view(Value::keyed([("k", "keyed")])), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<p>keyed</p>");

	renderer.render(view(Value::Null), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<p></p>");
}

#[test]
fn nodes_are_inserted_as_they_are() {
	let (dom, container, renderer) = setup();
	let view = |value: Value<MemoryDom>| -> TemplateResult<MemoryDom> { html!("<figure>" {value} "</figure>") };
	let image = dom.create_element("img", Namespace::Html);
	dom.set_attribute(&image, "alt", "logo");

	renderer.render(view(Value::node(image)), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), r#"<figure><img alt="logo"></figure>"#);
	dom.reset_mutations();

	renderer.render(view(Value::node(image)), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.mutations().writes(), 0);

	renderer.render(view(Value::Nothing), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<figure></figure>");
	assert_eq!(dom.parent(&image), None);
}

#[test]
fn disconnecting_a_root_reaches_nested_directives() {
	let (_, container, renderer) = setup();
	let log = Log::default();
	renderer
		.render(html!("<section>" {tracked(&log, "inner")} "</section>"), &container, RenderOptions::default())
		.unwrap();

	assert!(renderer.set_connected(&container, false));
	assert!(renderer.set_connected(&container, false));
	assert!(renderer.set_connected(&container, true));
	assert_eq!(*log.borrow(), ["inner disconnected", "inner reconnected"]);
}

#[test]
fn removing_keyed_items_disconnects_each_of_them() {
	let (dom, container, renderer) = setup();
	let log = Log::default();
	let items = |keys: &[&str]| -> TemplateResult<MemoryDom> {
		html!(
			"<ul>"
				{repeat(
					keys.to_vec(),
					|key: &&str, _: usize| *key,
					|key: &str, _: usize| tracked(&log, key),
				)}
			"</ul>"
		)
	};

	renderer.render(items(&["a", "b", "c", "d"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.text_content(container), "abcd");

	renderer.render(items(&["c", "a"]), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.text_content(container), "ca");
	let mut removed = log.borrow().clone();
	removed.sort();
	assert_eq!(removed, ["b disconnected", "d disconnected"]);

	renderer.render(items(&[]), &container, RenderOptions::default()).unwrap();
	assert_eq!(log.borrow().len(), 4);
	assert!(log.borrow().contains(&"a disconnected".to_owned()));
	assert!(log.borrow().contains(&"c disconnected".to_owned()));
}
