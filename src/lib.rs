#![doc(html_root_url = "https://docs.rs/lit-dom/0.1.0")]
#![warn(clippy::pedantic)]
//! Tagged-template rendering for DOM hosts.
//!
//! Templates written with [`html!`], [`svg!`] or [`mathml!`] are compiled once per call site into a static node tree
//! plus binding sites. Rendering clones that tree once and afterwards only updates the bound values,
//! skipping every DOM write whose value didn't change.
//!
//! ```
//! use lit_dom::{dom::{Dom, Namespace}, html, memory::MemoryDom, Renderer, RenderOptions};
//!
//! let dom = MemoryDom::new();
//! let container = dom.create_element("main", Namespace::Html);
//! let renderer = Renderer::new(dom.clone());
//!
//! for count in 0..3 {
//!     renderer
//!         .render(html!("<button ?disabled=" {count == 2} ">Clicked " {count} " times</button>"), &container, RenderOptions::default())
//!         .unwrap();
//! }
//! assert_eq!(dom.markup(container), r#"<button disabled="">Clicked 2 times</button>"#);
//! assert_eq!(dom.mutations().elements_created, 2); // `<main>` and `<button>`.
//! ```

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod directive;
pub mod directives;
pub mod dom;
pub mod error;
pub mod instance;
pub mod keyed;
pub mod memory;
mod parse;
pub mod part;
pub mod render;
pub mod sanitize;
pub mod template;
pub mod value;

#[cfg(feature = "web")]
pub mod web;

pub use self::{
	error::Error,
	render::{RenderOptions, Renderer},
	value::{TemplateResult, Value},
};

/// An HTML template: string literals for the static parts, `{expression}`s for the bindings.
///
/// Each invocation is its own call site, compiled once per [`TemplateCache`](`template::TemplateCache`).
///
/// ```
/// use lit_dom::{html, memory::MemoryDom, TemplateResult};
///
/// let name = "world";
/// let greeting: TemplateResult<MemoryDom> = html!("<p class=\"greeting\">Hello " {name} "!</p>");
/// assert_eq!(greeting.values().len(), 1);
/// ```
#[macro_export]
macro_rules! html {
	($($input:tt)*) => {
		$crate::__template!(Html [] [] [] $($input)*)
	};
}

/// Like [`html!`], but the top-level content is SVG.
#[macro_export]
macro_rules! svg {
	($($input:tt)*) => {
		$crate::__template!(Svg [] [] [] $($input)*)
	};
}

/// Like [`html!`], but the top-level content is MathML.
#[macro_export]
macro_rules! mathml {
	($($input:tt)*) => {
		$crate::__template!(MathMl [] [] [] $($input)*)
	};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __template {
	($kind:ident [$($strings:expr),*] [$($current:literal)*] [$($values:expr),*]) => {{
		static STRINGS: $crate::template::TemplateStrings =
			$crate::template::TemplateStrings::new(&[$($strings,)* ::core::concat!("" $(, $current)*)]);
		$crate::value::TemplateResult::new(&STRINGS, $crate::template::TemplateKind::$kind, ::std::vec![$($values),*])
	}};
	($kind:ident [$($strings:expr),*] [$($current:literal)*] [$($values:expr),*] {$value:expr} $($rest:tt)*) => {
		$crate::__template!(
			$kind
			[$($strings,)* ::core::concat!("" $(, $current)*)]
			[]
			[$($values,)* $crate::value::Value::from($value)]
			$($rest)*
		)
	};
	($kind:ident [$($strings:expr),*] [$($current:literal)*] [$($values:expr),*] $literal:literal $($rest:tt)*) => {
		$crate::__template!($kind [$($strings),*] [$($current)* $literal] [$($values),*] $($rest)*)
	};
}
