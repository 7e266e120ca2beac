//! Helpers shared by the integration tests.
#![allow(dead_code)]

use core::cell::RefCell;
use lit_dom::{
	directive::{directive, Directive, PartInfo},
	dom::{Dom, Namespace},
	error::DirectiveError,
	memory::{MemoryDom, NodeId},
	template::TemplateCache,
	value::Value,
	Renderer,
};
use std::rc::Rc;

pub type Log = Rc<RefCell<Vec<String>>>;

/// A fresh host with an empty `<div>` container, and a renderer with its own template cache.
pub fn setup() -> (MemoryDom, NodeId, Renderer<MemoryDom>) {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::TRACE)
		.with_test_writer()
		.try_init();
	let dom = MemoryDom::new();
	let container = dom.create_element("div", Namespace::Html);
	let renderer = Renderer::with_cache(dom.clone(), Rc::new(TemplateCache::new()));
	(dom, container, renderer)
}

/// Renders its label and records when it leaves or re-enters the document.
pub struct Lifecycle {
	log: Option<Log>,
	label: String,
}

impl<D: Dom> Directive<D> for Lifecycle {
	type Props = (Log, String);

	fn new(_: &PartInfo<'_, D>) -> Result<Self, DirectiveError> {
		Ok(Self {
			log: None,
			label: String::new(),
		})
	}

	fn render(&mut self, (log, label): &(Log, String)) -> Value<D> {
		self.log = Some(Rc::clone(log));
		self.label = label.clone();
		label.as_str().into()
	}

	fn disconnected(&mut self) {
		if let Some(log) = &self.log {
			log.borrow_mut().push(format!("{} disconnected", self.label));
		}
	}

	fn reconnected(&mut self) {
		if let Some(log) = &self.log {
			log.borrow_mut().push(format!("{} reconnected", self.label));
		}
	}
}

pub fn tracked(log: &Log, label: &str) -> Value<MemoryDom> {
	directive::<MemoryDom, Lifecycle>((Rc::clone(log), label.to_owned()))
}
