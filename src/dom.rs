//! A small [`lignin`] renderer for the card's and the editor's shadow roots.
//!
//! Nodes are matched by position after flattening [`Node::Multi`], [`Node::Keyed`] and [`Node::Memoized`].
//! Matching text, comments and same-named HTML elements are updated in place, anything else is replaced.
//! DOM bindings aren't reported, and SVG or MathML content isn't supported.

use crate::rc_hash_map::RcHashMap;
use core::slice;
use js_sys::Function;
use lignin::{CallbackRef, Node, ThreadBound};
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

type Handler = CallbackRef<ThreadBound, fn(lignin::web::Event)>;

/// Attached to a parent [`web_sys::Node`] (usually a [`web_sys::ShadowRoot`]), this `struct` keeps its child nodes in sync with a VDOM.
///
/// Event listeners start throwing into JavaScript once the renderer is dropped,
/// so it must live as long as the rendered nodes can receive events.
#[derive(Debug)]
pub struct DomRenderer {
	listeners: RcHashMap<Handler, u16, Function>,
	common_handler: Closure<dyn Fn(JsValue, web_sys::Event)>,
	parent: web_sys::Node,
	options_cache: [Option<web_sys::AddEventListenerOptions>; 8],
}

impl DomRenderer {
	#[must_use]
	#[instrument]
	pub fn new(parent: web_sys::Node) -> Self {
		Self {
			listeners: RcHashMap::new(),
			common_handler: Closure::wrap(Box::new(|callback_ref: JsValue, event: web_sys::Event| {
				let span = trace_span!("common_handler", callback_ref = ?&callback_ref, event = ?&event);
				let _enter = span.enter();

				//SAFETY: Only values produced by `CallbackRef::into_js` are bound to this handler.
				match unsafe { Handler::from_js(&callback_ref) } {
					Some(callback_ref) => callback_ref.call(event.into()),
					None => error!("Invalid `CallbackRef` {:?}; the event is dropped.", callback_ref),
				}
			}) as Box<dyn Fn(JsValue, web_sys::Event)>),
			parent,
			options_cache: Default::default(),
		}
	}

	#[must_use]
	pub fn parent(&self) -> &web_sys::Node {
		&self.parent
	}

	/// Turns the DOM described by `previous` (what was last rendered, or nothing) into `next`.
	#[instrument(skip(self, previous, next))]
	pub fn update(&mut self, previous: &[Node<'_, ThreadBound>], next: &[Node<'_, ThreadBound>]) {
		let parent = self.parent.clone();
		let document = match parent.owner_document() {
			Some(document) => document,
			None => return error!("No owner document found for the render root."),
		};
		self.diff_children(&document, &parent, previous, next);

		let freed = self.purge_listeners();
		trace!("Freed {} event listener(s).", freed);
	}

	/// Drops listener handles no longer in use and returns how many were dropped.
	pub fn purge_listeners(&mut self) -> usize {
		self.listeners.purge_weak()
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	fn diff_children(&mut self, document: &web_sys::Document, parent: &web_sys::Node, previous: &[Node<'_, ThreadBound>], next: &[Node<'_, ThreadBound>]) {
		let mut flat_previous = Vec::new();
		flatten(previous, &mut flat_previous);
		let mut flat_next = Vec::new();
		flatten(next, &mut flat_next);

		let child_nodes = parent.child_nodes();
		let mut i = 0;
		for index in 0..flat_previous.len().max(flat_next.len()) {
			match (flat_previous.get(index), flat_next.get(index)) {
				(Some(&previous), Some(&next)) => {
					match child_nodes.get(i) {
						Some(existing) => self.update_node(document, parent, &existing, previous, next),
						None => {
							error!("Expected a node beyond the end of `web_sys::NodeList`. Switching to insertion.");
							self.unbind(previous);
							self.insert(document, parent, next);
						}
					}
					i += 1;
				}
				(Some(&previous), None) => {
					match child_nodes.get(i) {
						Some(existing) => {
							if let Err(error) = parent.remove_child(&existing) {
								error!("Failed to remove node: {:?}", error);
							}
						}
						None => warn!("Node to remove is already gone."),
					}
					self.unbind(previous);
				}
				(None, Some(&next)) => {
					self.insert(document, parent, next);
					i += 1;
				}
				(None, None) => unreachable!(),
			}
		}
	}

	fn update_node(&mut self, document: &web_sys::Document, parent: &web_sys::Node, existing: &web_sys::Node, previous: &Node<'_, ThreadBound>, next: &Node<'_, ThreadBound>) {
		match (*previous, *next) {
			(Node::Text { text: t_1, .. }, Node::Text { text: t_2, .. }) => {
				if let Some(text) = existing.dyn_ref::<web_sys::Text>() {
					if t_1 != t_2 {
						text.set_data(t_2);
					}
					return;
				}
			}
			(Node::Comment { comment: c_1, .. }, Node::Comment { comment: c_2, .. }) => {
				if let Some(comment) = existing.dyn_ref::<web_sys::Comment>() {
					if c_1 != c_2 {
						comment.set_data(c_2);
					}
					return;
				}
			}
			(Node::HtmlElement { element: e_1, .. }, Node::HtmlElement { element: e_2, .. }) if e_1.name == e_2.name && e_1.creation_options == e_2.creation_options => {
				if let Some(element) = existing.dyn_ref::<web_sys::Element>() {
					let span = trace_span!("Diffing HTML element", tag = e_1.name);
					let _enter = span.enter();
					return self.update_element(document, element, e_1, e_2);
				}
			}
			_ => (),
		}

		trace!("Replacing node.");
		self.unbind(previous);
		if let Some(replacement) = self.create(document, next) {
			if let Err(error) = parent.replace_child(&replacement, existing) {
				error!("Failed to replace node: {:?}", error);
			}
		}
	}

	fn insert(&mut self, document: &web_sys::Document, parent: &web_sys::Node, node: &Node<'_, ThreadBound>) {
		if let Some(created) = self.create(document, node) {
			if let Err(error) = parent.append_child(&created) {
				error!("Failed to insert node: {:?}", error);
			}
		}
	}

	fn create(&mut self, document: &web_sys::Document, node: &Node<'_, ThreadBound>) -> Option<web_sys::Node> {
		match *node {
			Node::Text { text, .. } => Some(document.create_text_node(text).into()),
			Node::Comment { comment, .. } => Some(document.create_comment(comment).into()),
			Node::HtmlElement { element, .. } => {
				let &lignin::Element { name, creation_options, .. } = element;
				let span = trace_span!("Creating HTML element", name, ?creation_options);
				let _enter = span.enter();

				let created = match creation_options.is() {
					Some(is) => document.create_element_with_str(name, is),
					None => document.create_element(name),
				};
				let created = match created {
					Ok(created) => created,
					Err(error) => {
						error!("Failed to create HTML element: {:?}", error);
						return None;
					}
				};
				self.update_element(
					document,
					&created,
					&lignin::Element {
						name,
						creation_options,
						attributes: &[],
						content: Node::Multi(&[]),
						event_bindings: &[],
					},
					element,
				);
				Some(created.into())
			}
			_ => {
				error!("Unsupported VDOM node: {:?}", node);
				None
			}
		}
	}

	fn update_element(&mut self, document: &web_sys::Document, element: &web_sys::Element, previous: &lignin::Element<'_, ThreadBound>, next: &lignin::Element<'_, ThreadBound>) {
		for removed in previous.attributes.iter().filter(|a| next.attributes.iter().all(|b| b.name != a.name)) {
			if let Err(error) = element.remove_attribute(removed.name) {
				error!("Failed to remove attribute {:?}: {:?}", removed.name, error);
			}
		}
		for added in next.attributes {
			let unchanged = previous.attributes.iter().any(|a| a.name == added.name && a.value == added.value);
			if !unchanged {
				if let Err(error) = element.set_attribute(added.name, added.value) {
					error!("Failed to set attribute {:?}: {:?}", added.name, error);
				}
			}
		}

		for removed in previous.event_bindings.iter().filter(|binding| !next.event_bindings.contains(binding)) {
			self.remove_event_listener(element, removed);
		}
		for added in next.event_bindings.iter().filter(|binding| !previous.event_bindings.contains(binding)) {
			self.add_event_listener(element, added);
		}

		self.diff_children(document, element, slice::from_ref(&previous.content), slice::from_ref(&next.content));
	}

	fn add_event_listener(&mut self, element: &web_sys::Element, &lignin::EventBinding { name, callback, options }: &lignin::EventBinding<'_, ThreadBound>) {
		let common_handler = &self.common_handler;
		let listener = match self
			.listeners
			.increment_or_insert_with(callback, || common_handler.as_ref().unchecked_ref::<Function>().bind1(&JsValue::UNDEFINED, &callback.into_js()).unchecked_into::<Function>())
		{
			Ok(listener) => listener,
			Err(_) => return error!("Too many (more than 65k) active references to the same `CallbackRef`."),
		};

		let cached = &mut self.options_cache[usize::from(options.capture()) + usize::from(options.once()) * 2 + usize::from(options.passive()) * 4];
		let web_options = cached.get_or_insert_with(|| {
			let web_options = web_sys::AddEventListenerOptions::new();
			web_options.set_capture(options.capture());
			web_options.set_once(options.once());
			web_options.set_passive(options.passive());
			web_options
		});

		if let Err(error) = element.add_event_listener_with_callback_and_add_event_listener_options(name, listener, web_options) {
			error!("Failed to add event listener {:?}: {:?}", name, error);
		}
	}

	fn remove_event_listener(&mut self, element: &web_sys::Element, &lignin::EventBinding { name, callback, options }: &lignin::EventBinding<'_, ThreadBound>) {
		match self.listeners.weak_decrement(&callback) {
			Ok(Some(listener)) => {
				if let Err(error) = element.remove_event_listener_with_callback_and_bool(name, listener, options.capture()) {
					error!("Failed to remove event listener {:?}: {:?}", name, error);
				}
			}
			Ok(None) => error!("Tried to remove unknown event listener {:?}.", name),
			Err(_) => error!("Event listener {:?} released more often than acquired.", name),
		}
	}

	/// Releases the listener handles of a subtree that is going away with its DOM nodes.
	fn unbind(&mut self, node: &Node<'_, ThreadBound>) {
		let mut flat = Vec::new();
		flatten(slice::from_ref(node), &mut flat);
		for node in flat {
			if let Node::HtmlElement { element, .. } = *node {
				for binding in element.event_bindings {
					if self.listeners.weak_decrement(&binding.callback).is_err() {
						error!("Event listener {:?} released more often than acquired.", binding.name);
					}
				}
				self.unbind(&element.content);
			}
		}
	}
}

fn flatten<'b, 'a: 'b>(nodes: &'b [Node<'a, ThreadBound>], flat: &mut Vec<&'b Node<'a, ThreadBound>>) {
	for node in nodes {
		match node {
			Node::Multi(nodes) => flatten(nodes, flat),
			Node::Memoized { content, .. } => flatten(slice::from_ref(*content), flat),
			Node::Keyed(fragments) => {
				for fragment in fragments.iter() {
					flatten(slice::from_ref(&fragment.content), flat);
				}
			}
			node => flat.push(node),
		}
	}
}
