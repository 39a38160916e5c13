//! Custom element definitions.
//!
//! Rust can't extend `HTMLElement`, so a small JavaScript class forwards its lifecycle callbacks
//! and host-facing methods to a Rust object created by an injected factory.

use crate::{config, error::Error};
use js_sys::{Array, Function, Object, Reflect};
use serde_json::Value;
use tracing::{debug, warn};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{CustomEvent, CustomEventInit, EventTarget, HtmlElement};

#[wasm_bindgen(inline_js = r#"
export function define_card(tag, editorTag, create, stubConfig) {
	if (customElements.get(tag)) return false;
	customElements.define(tag, class extends HTMLElement {
		constructor() {
			super();
			this._inner = create(this);
		}
		get hass() { return this._hass; }
		set hass(hass) {
			this._hass = hass;
			this._inner.set_hass(hass);
		}
		get updateComplete() { return this._inner.update_complete(); }
		setConfig(config) { this._inner.set_config(config); }
		connectedCallback() { this._inner.connected(); }
		disconnectedCallback() { this._inner.disconnected(); }
		getCardSize() { return this._inner.card_size(); }
		getGridOptions() { return this._inner.grid_options(); }
		static getConfigElement() { return document.createElement(editorTag); }
		static getStubConfig() { return stubConfig(); }
	});
	return true;
}

export function define_editor(tag, create) {
	if (customElements.get(tag)) return false;
	customElements.define(tag, class extends HTMLElement {
		constructor() {
			super();
			this._inner = create(this);
		}
		get hass() { return this._hass; }
		set hass(hass) {
			this._hass = hass;
			this._inner.set_hass(hass);
		}
		get updateComplete() { return this._inner.update_complete(); }
		setConfig(config) { this._inner.set_config(config); }
		connectedCallback() { this._inner.connected(); }
	});
	return true;
}
"#)]
extern "C" {
	#[wasm_bindgen(catch)]
	fn define_card(tag: &str, editor_tag: &str, create: &Function, stub_config: &Function) -> Result<bool, JsValue>;

	#[wasm_bindgen(catch)]
	fn define_editor(tag: &str, create: &Function) -> Result<bool, JsValue>;
}

pub const CARD_TAG: &str = "wled-ws-card";
pub const EDITOR_TAG: &str = "wled-ws-card-editor";

/// Defines both elements. Factories are kept alive for the lifetime of the page.
pub(crate) fn define(create_card: impl Fn(HtmlElement) -> Result<JsValue, JsValue> + 'static, create_editor: impl Fn(HtmlElement) -> Result<JsValue, JsValue> + 'static) -> Result<(), Error> {
	let create_card = Closure::wrap(Box::new(create_card) as Box<dyn Fn(HtmlElement) -> Result<JsValue, JsValue>>).into_js_value();
	let stub_config = Closure::wrap(Box::new(|| config::to_js(&config::stub()).unwrap_or(JsValue::UNDEFINED)) as Box<dyn Fn() -> JsValue>).into_js_value();
	if !define_card(CARD_TAG, EDITOR_TAG, create_card.unchecked_ref(), stub_config.unchecked_ref())? {
		warn!("<{}> is already defined. Is the card loaded twice?", CARD_TAG);
	}

	let create_editor = Closure::wrap(Box::new(create_editor) as Box<dyn Fn(HtmlElement) -> Result<JsValue, JsValue>>).into_js_value();
	if !define_editor(EDITOR_TAG, create_editor.unchecked_ref())? {
		warn!("<{}> is already defined.", EDITOR_TAG);
	}
	Ok(())
}

/// Adds the card to `window.customCards`, which the dashboard's card picker lists.
pub(crate) fn announce() -> Result<(), Error> {
	let window = web_sys::window().ok_or_else(|| Error::Js("no `window`".to_owned()))?;
	let key = JsValue::from_str("customCards");
	let cards = match Reflect::get(&window, &key)?.dyn_into::<Array>() {
		Ok(cards) => cards,
		Err(_) => {
			let cards = Array::new();
			Reflect::set(&window, &key, &cards)?;
			cards
		}
	};

	let entry = Object::new();
	for (name, value) in [
		("type", JsValue::from_str(CARD_TAG)),
		("name", JsValue::from_str("WLED Live View Card")),
		("preview", JsValue::FALSE),
		("description", JsValue::from_str("Card for displaying live view from WLED via WebSocket.")),
		("documentationURL", JsValue::from_str("https://github.com/danishru/wled_liveviewproxy/?tab=readme-ov-file")),
	] {
		Reflect::set(&entry, &name.into(), &value)?;
	}
	cards.push(&entry);
	debug!("Announced <{}> to the card picker.", CARD_TAG);
	Ok(())
}

/// Dispatches a bubbling, composed `CustomEvent` with a JSON `detail`.
pub(crate) fn fire(target: &EventTarget, name: &str, detail: &Value) -> Result<(), Error> {
	let init = CustomEventInit::new();
	init.set_bubbles(true);
	init.set_composed(true);
	init.set_detail(&config::to_js(detail)?);
	let event = CustomEvent::new_with_event_init_dict(name, &init)?;
	target.dispatch_event(&event)?;
	Ok(())
}
