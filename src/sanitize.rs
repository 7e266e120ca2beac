//! A hook that sees every bound value right before it's written into the document as text, attribute or property.
//!
//! Set one through [`RenderOptions::sanitizer`](`crate::render::RenderOptions::sanitizer`).
//! The [`SanitizerFactory`] is asked once per sink (an attribute or property of one element, or one text node
//! created for a child binding) and the [`ValueSanitizer`] it returns is then applied to each value written there.
//!
//! Child text is reported as property `"data"` of its text node.
//! Event bindings and boolean attributes are never sanitized.
//!
//! ```
//! use lit_dom::{
//!     dom::{Dom, Namespace},
//!     html,
//!     memory::{MemoryDom, NodeId},
//!     sanitize::{SanitizerFactory, SinkKind, ValueSanitizer},
//!     value::Value,
//!     Renderer, RenderOptions,
//! };
//! use std::rc::Rc;
//!
//! let sanitizer: SanitizerFactory<MemoryDom> = Rc::new(|_: &NodeId, name: &str, kind: SinkKind| -> ValueSanitizer<MemoryDom> {
//!     if kind == SinkKind::Attribute && name == "href" {
//!         Box::new(|value: Value<MemoryDom>| {
//!             if value.to_text().trim_start().to_ascii_lowercase().starts_with("javascript:") {
//!                 Value::from("about:blank")
//!             } else {
//!                 value
//!             }
//!         })
//!     } else {
//!         Box::new(|value: Value<MemoryDom>| value)
//!     }
//! });
//!
//! let dom = MemoryDom::new();
//! let container = dom.create_element("div", Namespace::Html);
//! Renderer::new(dom.clone())
//!     .render(
//!         html!("<a href=" {"javascript:alert(1)"} ">x</a>"),
//!         &container,
//!         RenderOptions { sanitizer: Some(sanitizer), ..RenderOptions::default() },
//!     )
//!     .unwrap();
//! assert_eq!(dom.markup(container), r#"<a href="about:blank">x</a>"#);
//! ```

use crate::{dom::Dom, value::Value};
use std::rc::Rc;

/// Where a sanitized value is about to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
	Attribute,
	Property,
}

/// Maps each value written to one sink. May replace it with anything, [`Value::Nothing`] included.
pub type ValueSanitizer<D> = Box<dyn Fn(Value<D>) -> Value<D>>;

/// Creates the [`ValueSanitizer`] for `(node, name, kind)`.
pub type SanitizerFactory<D> = Rc<dyn Fn(&<D as Dom>::Node, &str, SinkKind) -> ValueSanitizer<D>>;
