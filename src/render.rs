//! The render entry point.
//!
//! A [`Renderer`] remembers one root [`ChildPart`] per container (or per `render_before` node),
//! so that rendering into the same place again updates what's there instead of starting over.

use crate::{
	dom::Dom,
	error::Error,
	part::{ChildPart, Scope},
	sanitize::SanitizerFactory,
	template::TemplateCache,
	value::Value,
};
use core::{any::Any, cell::RefCell, fmt};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument, trace};

/// Options for [`Renderer::render`]. Only the first render into a given place reads them.
pub struct RenderOptions<D: Dom> {
	/// Render before this child of the container instead of replacing the container's content.
	pub render_before: Option<D::Node>,
	/// Creates nodes through this host instead of the renderer's.
	pub creation_scope: Option<D>,
	/// Made available to directives through [`PartContext::host`](`crate::directive::PartContext::host`),
	/// for example as `this` of event handlers.
	pub host: Option<Rc<dyn Any>>,
	/// Sees text, attribute and property values right before they are written. See [`crate::sanitize`].
	pub sanitizer: Option<SanitizerFactory<D>>,
}
impl<D: Dom> Default for RenderOptions<D> {
	fn default() -> Self {
		Self {
			render_before: None,
			creation_scope: None,
			host: None,
			sanitizer: None,
		}
	}
}
impl<D: Dom> fmt::Debug for RenderOptions<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderOptions")
			.field("render_before", &self.render_before)
			.field("creation_scope", &self.creation_scope)
			.field("host", &self.host.is_some())
			.field("sanitizer", &self.sanitizer.is_some())
			.finish()
	}
}

/// Renders values into containers of one host.
pub struct Renderer<D: Dom> {
	dom: D,
	templates: Rc<TemplateCache>,
	/// Root parts by [`Dom::node_key`] of their owner.
	roots: RefCell<HashMap<u64, ChildPart<D>>>,
}

impl<D: Dom> Renderer<D> {
	/// Creates a renderer using the thread's [shared](`TemplateCache::shared`) template cache.
	#[must_use]
	pub fn new(dom: D) -> Self {
		Self::with_cache(dom, TemplateCache::shared())
	}

	#[must_use]
	pub fn with_cache(dom: D, templates: Rc<TemplateCache>) -> Self {
		Self {
			dom,
			templates,
			roots: RefCell::default(),
		}
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.dom
	}

	#[must_use]
	pub fn templates(&self) -> &Rc<TemplateCache> {
		&self.templates
	}

	/// Renders `value` into `container`.
	///
	/// The first render clears `container` (unless [`RenderOptions::render_before`] is set) and
	/// creates a root part there. Later renders into the same place update that part.
	///
	/// # Errors
	///
	/// Iff committing `value` fails. The root part is kept even then, so the next render can recover.
	#[instrument(skip(self, value, options))]
	pub fn render(&self, value: impl Into<Value<D>>, container: &D::Node, options: RenderOptions<D>) -> Result<ChildPart<D>, Error> {
		let owner = options.render_before.clone().unwrap_or_else(|| container.clone());
		let part = match self.root_of(&owner) {
			Some(part) => part,
			None => {
				let part = self.create_root(container, options);
				self.roots.borrow_mut().insert(self.dom.node_key(&owner), part.clone());
				part
			}
		};
		part.commit(value)?;
		Ok(part)
	}

	fn create_root(&self, container: &D::Node, options: RenderOptions<D>) -> ChildPart<D> {
		let dom = options.creation_scope.unwrap_or_else(|| self.dom.clone());
		if options.render_before.is_none() {
			let mut child = dom.first_child(container);
			while let Some(node) = child {
				child = dom.next_sibling(&node);
				dom.remove(&node);
			}
		}
		let start = dom.create_comment("");
		dom.insert_before(container, &start, options.render_before.as_ref());
		debug!("Created a render root.");
		let scope = Rc::new(Scope::new(dom, Rc::clone(&self.templates), options.host, options.sanitizer));
		ChildPart::new(scope, start, options.render_before, true)
	}

	fn root_of(&self, owner: &D::Node) -> Option<ChildPart<D>> {
		self.roots.borrow().get(&self.dom.node_key(owner)).cloned()
	}

	/// The root part previously rendered into `container` (or before that node).
	#[must_use]
	pub fn root(&self, container: &D::Node) -> Option<ChildPart<D>> {
		self.root_of(container)
	}

	/// Notifies the directives under a root that it left or re-entered the document.
	///
	/// Returns whether there was a root for `container`.
	pub fn set_connected(&self, container: &D::Node, connected: bool) -> bool {
		match self.root_of(container) {
			Some(part) => {
				trace!("Setting a render root's connection to {}.", connected);
				part.set_connected(connected);
				true
			}
			None => false,
		}
	}

	/// Clears and forgets the root rendered into `container`, disconnecting its directives.
	///
	/// Returns whether there was a root for `container`.
	///
	/// # Errors
	///
	/// Iff clearing the root fails.
	#[instrument(skip(self))]
	pub fn unmount(&self, container: &D::Node) -> Result<bool, Error> {
		let root = self.roots.borrow_mut().remove(&self.dom.node_key(container));
		let Some(part) = root else {
			return Ok(false);
		};
		part.unmount()?;
		debug!("Unmounted a render root.");
		Ok(true)
	}
}

impl<D: Dom> fmt::Debug for Renderer<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Renderer")
			.field("dom", &self.dom)
			.field("templates", &self.templates.len())
			.field("roots", &self.roots.borrow().len())
			.finish()
	}
}
