//! Module start-up.

use crate::{card::WledWsCard, editor::WledWsCardEditor, element};
use std::sync::Once;
use tracing::{error, info};
use wasm_bindgen::prelude::*;

static START: Once = Once::new();

/// Runs when the Wasm module is instantiated. Later calls do nothing.
#[wasm_bindgen(start)]
pub fn start() {
	START.call_once(|| {
		console_error_panic_hook::set_once();
		// Another module on the page may already have installed a subscriber.
		tracing_wasm::try_set_as_global_default().ok();

		info!("WLED-WS-CARD {}", env!("CARGO_PKG_VERSION"));

		let defined = element::define(
			|host| WledWsCard::new(host).map(JsValue::from).map_err(JsValue::from),
			|host| WledWsCardEditor::new(host).map(JsValue::from).map_err(JsValue::from),
		);
		if let Err(error) = defined.and_then(|()| element::announce()) {
			error!(%error, "Failed to register the card.");
		}
	});
}
