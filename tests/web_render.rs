#![cfg(all(target_arch = "wasm32", feature = "web"))]

use lit_dom::{html, value::Value, web::WebDom, RenderOptions, Renderer, TemplateResult};
use std::{cell::Cell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{HtmlElement, HtmlInputElement};

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

fn init_log() {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
}

fn container(dom: &WebDom, id: &str) -> web_sys::Node {
	let element = dom.document().create_element("div").unwrap();
	element.set_id(id);
	dom.document().body().unwrap().append_child(&element).unwrap();
	element.into()
}

#[wasm_bindgen_test]
fn click_counter() {
	init_log();
	let dom = WebDom::from_window();
	let root = container(&dom, "click-counter");
	let renderer = Renderer::new(dom.clone());
	let clicks = Rc::new(Cell::new(0));

	let view = |count: u32| -> TemplateResult<WebDom> {
		let clicks = Rc::clone(&clicks);
		html!(
			"<button id=\"counter\" @click=" {Value::listener(move |_: &web_sys::Event| clicks.set(clicks.get() + 1))} ">"
				"Clicked " {count} " times"
			"</button>"
		)
	};

	renderer.render(view(0), &root, RenderOptions::default()).unwrap();
	let button: HtmlElement = dom.document().get_element_by_id("counter").unwrap().dyn_into().unwrap();
	assert_eq!(button.text_content().unwrap(), "Clicked 0 times");

	button.click();
	assert_eq!(clicks.get(), 1);

	renderer.render(view(clicks.get()), &root, RenderOptions::default()).unwrap();
	let same: HtmlElement = dom.document().get_element_by_id("counter").unwrap().dyn_into().unwrap();
	assert_eq!(same, button);
	assert_eq!(button.text_content().unwrap(), "Clicked 1 times");

	button.click();
	assert_eq!(clicks.get(), 2);

	renderer.unmount(&root).unwrap();
	assert!(dom.document().get_element_by_id("counter").is_none());
}

#[wasm_bindgen_test]
fn properties_and_booleans() {
	init_log();
	let dom = WebDom::from_window();
	let root = container(&dom, "properties-and-booleans");
	let renderer = Renderer::new(dom.clone());
	let view = |value: &str, disabled: bool| -> TemplateResult<WebDom> {
		html!("<input id=\"field\" .value=" {value} " ?disabled=" {disabled} ">")
	};

	renderer.render(view("a", true), &root, RenderOptions::default()).unwrap();
	let input: HtmlInputElement = dom.document().get_element_by_id("field").unwrap().dyn_into().unwrap();
	assert_eq!(input.value(), "a");
	assert!(input.disabled());

	renderer.render(view("b", false), &root, RenderOptions::default()).unwrap();
	assert_eq!(input.value(), "b");
	assert!(!input.disabled());
	assert_eq!(input.get_attribute("value"), None);
}
