mod common;

use common::setup;
use core::cell::{Cell, RefCell};
use lit_dom::{
	directives::if_defined,
	dom::Dom,
	error::{Error, TemplateError, TemplateErrorKind},
	html,
	memory::{Event, MemoryDom, NodeId},
	sanitize::{SanitizerFactory, SinkKind, ValueSanitizer},
	value::{EventListener, Value},
	RenderOptions, TemplateResult,
};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn link(href: Option<&str>) -> TemplateResult<MemoryDom> {
	html!("<a href=" {href} ">link</a>")
}

fn badge(kind: Value<MemoryDom>) -> TemplateResult<MemoryDom> {
	html!("<span class=\"badge " {kind} " small\"></span>")
}

fn on(handler: impl Fn(&Event) + 'static) -> Value<MemoryDom> {
	Value::listener(handler)
}

fn button(on_click: Value<MemoryDom>) -> TemplateResult<MemoryDom> {
	html!("<button @click=" {on_click} ">+</button>")
}

#[test]
fn null_removes_attributes() {
	let (dom, container, renderer) = setup();
	renderer.render(link(Some("/home")), &container, RenderOptions::default()).unwrap();
	let a = dom.query(container, "a").unwrap();
	assert_eq!(dom.attribute(&a, "href").as_deref(), Some("/home"));

	renderer.render(link(None), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.attribute(&a, "href"), None);
	assert_eq!(dom.markup(container), "<a>link</a>");

	renderer.render(link(Some("/away")), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.attribute(&a, "href").as_deref(), Some("/away"));
}

#[test]
fn static_attributes_are_kept() {
	let (dom, container, renderer) = setup();
	renderer
		.render(html!("<img alt=\"a &amp; b\" src=" {"/x.png"} " loading=lazy>"), &container, RenderOptions::default())
		.unwrap();
	let img = dom.query(container, "img").unwrap();
	assert_eq!(dom.attribute(&img, "alt").as_deref(), Some("a & b"));
	assert_eq!(dom.attribute(&img, "loading").as_deref(), Some("lazy"));
	assert_eq!(dom.attribute(&img, "src").as_deref(), Some("/x.png"));
}

#[test]
fn interpolations_are_written_once() {
	let (dom, container, renderer) = setup();
	let range = |from: i32, to: i32| -> TemplateResult<MemoryDom> { html!("<meter title=\"" {from} " to " {to} "\"></meter>") };

	renderer.render(range(1, 2), &container, RenderOptions::default()).unwrap();
	let meter = dom.query(container, "meter").unwrap();
	assert_eq!(dom.attribute(&meter, "title").as_deref(), Some("1 to 2"));
	dom.reset_mutations();

	renderer.render(range(3, 4), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.attribute(&meter, "title").as_deref(), Some("3 to 4"));
	assert_eq!(dom.mutations().attribute_writes, 1);

	renderer.render(range(3, 4), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.mutations().attribute_writes, 1);
}

#[test]
fn nothing_in_an_interpolation_removes_the_attribute() {
	let (dom, container, renderer) = setup();
	renderer.render(badge("new".into()), &container, RenderOptions::default()).unwrap();
	let span = dom.query(container, "span").unwrap();
	assert_eq!(dom.attribute(&span, "class").as_deref(), Some("badge new small"));

	renderer.render(badge(if_defined(None::<&str>)), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.attribute(&span, "class"), None);

	renderer.render(badge(Value::Null), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.attribute(&span, "class").as_deref(), Some("badge  small"));
}

#[test]
fn properties_are_assigned() {
	let (dom, container, renderer) = setup();
	let input = |value: Value<MemoryDom>| -> TemplateResult<MemoryDom> { html!("<input .value=" {value} ">") };

	renderer.render(input("hello".into()), &container, RenderOptions::default()).unwrap();
	let element = dom.query(container, "input").unwrap();
	assert_eq!(dom.property(&element, "value").to_text(), "hello");
	assert_eq!(dom.attribute(&element, "value"), None);

	let object = Value::object(vec![1_u8, 2, 3]);
	renderer.render(input(object.clone()), &container, RenderOptions::default()).unwrap();
	assert!(dom.property(&element, "value").same(&object));

	renderer.render(input(Value::Nothing), &container, RenderOptions::default()).unwrap();
	assert!(matches!(dom.property(&element, "value"), Value::Null));
}

#[test]
fn swapping_handlers_keeps_the_native_listener() {
	let (dom, container, renderer) = setup();
	let clicks = Rc::new(Cell::new(0));

	let counter = Rc::clone(&clicks);
	renderer
		.render(
			button(on(move |_| counter.set(counter.get() + 1))),
			&container,
			RenderOptions::default(),
		)
		.unwrap();
	let element = dom.query(container, "button").unwrap();
	assert_eq!(dom.dispatch(element, "click"), 1);
	assert_eq!(clicks.get(), 1);
	dom.reset_mutations();

	let counter = Rc::clone(&clicks);
	renderer
		.render(
			button(on(move |_| counter.set(counter.get() + 10))),
			&container,
			RenderOptions::default(),
		)
		.unwrap();
	assert_eq!(dom.mutations().writes(), 0);
	assert_eq!(dom.dispatch(element, "click"), 1);
	assert_eq!(clicks.get(), 11);

	renderer
		.render(button(EventListener::<MemoryDom>::new(|_: &Event| ()).capture().into()), &container, RenderOptions::default())
		.unwrap();
	assert_eq!(dom.mutations().listeners_removed, 1);
	assert_eq!(dom.mutations().listeners_added, 1);
	assert_eq!(dom.listener_count(element), 1);

	renderer.render(button(Value::Nothing), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.listener_count(element), 0);
	assert_eq!(dom.dispatch(element, "click"), 0);
	assert_eq!(clicks.get(), 11);
}

#[test]
fn listeners_see_the_event() {
	let (dom, container, renderer) = setup();
	let seen = Rc::new(Cell::new(None));
	let sink = Rc::clone(&seen);
	renderer
		.render(
			html!("<ul @toggle=" {on(move |event| sink.set(Some(event.target())))} "><li>item</li></ul>"),
			&container,
			RenderOptions::default(),
		)
		.unwrap();

	let li = dom.query(container, "li").unwrap();
	assert_eq!(dom.dispatch(li, "toggle"), 1);
	assert_eq!(seen.get(), Some(li));
}

#[test]
fn raw_text_elements_take_text() {
	let (dom, container, renderer) = setup();
	let style = |css: &str| -> TemplateResult<MemoryDom> { html!("<style>" {css} "</style>") };

	renderer.render(style("p > a { color: red }"), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<style>p > a { color: red }</style>");
	dom.reset_mutations();

	renderer.render(style("b { }"), &container, RenderOptions::default()).unwrap();
	assert_eq!(dom.markup(container), "<style>b { }</style>");
	assert_eq!(dom.mutations().text_writes, 1);
	assert_eq!(dom.mutations().created, 0);
}

#[test]
fn attribute_values_are_never_markup() {
	let (dom, container, renderer) = setup();
	renderer.render(link(Some("\"><script>")), &container, RenderOptions::default()).unwrap();
	let a = dom.query(container, "a").unwrap();
	assert_eq!(dom.attribute(&a, "href").as_deref(), Some("\"><script>"));
	assert_eq!(dom.query(container, "script"), None);
}

#[test]
fn events_cannot_be_interpolated() {
	let (_, container, renderer) = setup();
	let error = renderer
		.render(html!("<p @click=\"a" {1} "\"></p>"), &container, RenderOptions::default())
		.unwrap_err();
	assert!(matches!(
		error,
		Error::Template(TemplateError {
			kind: TemplateErrorKind::InterpolatedBinding(name),
			..
		}) if name == "@click"
	));
}

#[test]
fn sanitizers_rewrite_values_before_they_are_written() {
	let (dom, container, renderer) = setup();
	let sinks = Rc::new(RefCell::new(Vec::new()));
	let seen = Rc::clone(&sinks);
	let sanitizer: SanitizerFactory<MemoryDom> = Rc::new(move |_: &NodeId, name: &str, kind: SinkKind| -> ValueSanitizer<MemoryDom> {
		seen.borrow_mut().push((name.to_owned(), kind));
		if name == "href" {
			Box::new(|value: Value<MemoryDom>| {
				if value.to_text().starts_with("javascript:") {
					Value::from("about:blank")
				} else {
					value
				}
			})
		} else {
			Box::new(|value: Value<MemoryDom>| Value::from(value.to_text().to_uppercase()))
		}
	});
	let options = || RenderOptions {
		sanitizer: Some(Rc::clone(&sanitizer)),
		..RenderOptions::default()
	};
	let view = |href: &str, text: &str| -> TemplateResult<MemoryDom> { html!("<a href=" {href} ">" {text} "</a>") };

	renderer.render(view("javascript:alert(1)", "hi"), &container, options()).unwrap();
	assert_eq!(dom.markup(container), r#"<a href="about:blank">HI</a>"#);

	renderer.render(view("/home", "there"), &container, options()).unwrap();
	assert_eq!(dom.markup(container), r#"<a href="/home">THERE</a>"#);
	assert_eq!(
		*sinks.borrow(),
		[("href".to_owned(), SinkKind::Attribute), ("data".to_owned(), SinkKind::Property)]
	);
}

#[test]
fn sanitizers_see_properties_but_not_removals() {
	let (dom, container, renderer) = setup();
	let calls = Rc::new(Cell::new(0));
	let counter = Rc::clone(&calls);
	let sanitizer: SanitizerFactory<MemoryDom> = Rc::new(move |_: &NodeId, _: &str, _: SinkKind| -> ValueSanitizer<MemoryDom> {
		let counter = Rc::clone(&counter);
		Box::new(move |value: Value<MemoryDom>| {
			counter.set(counter.get() + 1);
			value
		})
	});
	let options = || RenderOptions {
		sanitizer: Some(Rc::clone(&sanitizer)),
		..RenderOptions::default()
	};

	renderer
		.render(html!("<input .value=" {"x"} " title=" {Value::Null} ">"), &container, options())
		.unwrap();
	let input = dom.query(container, "input").unwrap();
	assert_eq!(dom.property(&input, "value").to_text(), "x");
	assert_eq!(dom.attribute(&input, "title"), None);
	assert_eq!(calls.get(), 1);
}
