//! Applying received colours to the card.
//!
//! Payloads are colour-stop lists (`"red, blue"`, `"rgb(1,2,3),rgb(4,5,6)"`), which are not validated.
//! The configured angle is always applied on this side.

use crate::{error::Error, liveview, transport::Frame};
use lignin::{Attribute, Element, ElementCreationOptions, EventBinding, Node, ThreadBound};
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, ShadowRoot};

/// `id` of the element whose background shows the live view.
pub const SURFACE_ID: &str = "card";

const CARD_STYLE: &str = "\
ha-card {
	width: 100%;
	height: 100%;
	border-radius: var(--ha-card-border-radius, 8px);
	overflow: hidden;
}
.card-content {
	width: 100%;
	height: 100%;
	box-sizing: border-box;
	filter: brightness(var(--card-brightness, 100%));
}";

/// The colour stops of a text payload.
///
/// A complete `linear-gradient(<direction>, <stops>)` is unwrapped to its stops so that the configured angle wins.
/// Anything else is passed through as is.
#[must_use]
pub fn color_stops(payload: &str) -> &str {
	let trimmed = payload.trim();
	let prefix = "linear-gradient(";
	let inner = match trimmed.get(..prefix.len()) {
		Some(start) if start.eq_ignore_ascii_case(prefix) => trimmed[prefix.len()..].strip_suffix(')'),
		_ => None,
	};
	match inner {
		Some(inner) => match inner.split_once(',') {
			Some((first, rest)) if is_direction(first.trim()) => rest,
			_ => inner,
		},
		None => payload,
	}
}

fn is_direction(argument: &str) -> bool {
	if argument.starts_with("to ") {
		return true;
	}
	["deg", "grad", "rad", "turn"]
		.iter()
		.filter_map(|unit| argument.strip_suffix(unit))
		.any(|number| number.parse::<f64>().is_ok())
}

#[must_use]
pub fn gradient(angle: i64, stops: &str) -> String {
	format!("linear-gradient({}deg, {})", angle, stops)
}

/// The background for one received frame, or [`None`] if the frame carries nothing to show.
#[must_use]
pub fn frame_background(frame: &Frame, angle: i64) -> Option<String> {
	match frame {
		Frame::Text(text) => Some(gradient(angle, color_stops(text))),
		Frame::Binary(bytes) => liveview::decode_frame(bytes).map(|stops| gradient(angle, &stops)),
	}
}

/// Sets the surface's background in `root`. Returns `false` if the surface isn't rendered.
///
/// # Errors
///
/// Iff the style can't be set.
pub fn paint(root: &ShadowRoot, background: &str) -> Result<bool, Error> {
	match root.get_element_by_id(SURFACE_ID).and_then(|surface| surface.dyn_into::<HtmlElement>().ok()) {
		Some(surface) => {
			surface.style().set_property("background", background)?;
			Ok(true)
		}
		None => Ok(false),
	}
}

/// What the card's markup depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardView {
	pub brightness: i64,
}

impl CardView {
	/// Passes the card's VDOM to `render`. `bindings` go onto the `ha-card`.
	pub fn with_vdom<R>(&self, bindings: &[EventBinding<'_, ThreadBound>], render: impl FnOnce(&[Node<'_, ThreadBound>]) -> R) -> R {
		let style = format!(":host {{\n\t--card-brightness: {}%;\n}}\n{}", self.brightness, CARD_STYLE);
		let style_text = [Node::Text { text: &style, dom_binding: None }];
		let style_element = Element {
			name: "style",
			creation_options: ElementCreationOptions::new(),
			attributes: &[],
			content: Node::Multi(&style_text),
			event_bindings: &[],
		};

		let surface_attributes = [Attribute { name: "class", value: "card-content" }, Attribute { name: "id", value: SURFACE_ID }];
		let surface = Element {
			name: "div",
			creation_options: ElementCreationOptions::new(),
			attributes: &surface_attributes,
			content: Node::Multi(&[]),
			event_bindings: &[],
		};
		let surface = [Node::HtmlElement { element: &surface, dom_binding: None }];

		let card = Element {
			name: "ha-card",
			creation_options: ElementCreationOptions::new(),
			attributes: &[],
			content: Node::Multi(&surface),
			event_bindings: bindings,
		};

		render(&[Node::HtmlElement { element: &style_element, dom_binding: None }, Node::HtmlElement { element: &card, dom_binding: None }])
	}
}
