//! Tap, hold and double-tap actions.
//!
//! Action descriptors use the dashboard's usual `{ action: "…", … }` shape.
//! Unknown or incomplete descriptors become [`Action::None`] rather than an error.

use crate::{element, error::Error};
use js_sys::{Array, Function, Promise, Reflect};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlElement;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
	/// Open the host's detail dialog. `entity` defaults to the card's reference.
	MoreInfo { entity: Option<String> },
	/// `homeassistant.toggle` on `entity`, which defaults to the card's reference.
	Toggle { entity: Option<String> },
	Navigate { path: String },
	OpenUrl { url: String },
	/// Both `call-service` and `perform-action` descriptors.
	CallService {
		domain: String,
		service: String,
		data: Map<String, Value>,
		target: Option<Value>,
	},
	None,
}

impl Default for Action {
	fn default() -> Self {
		Self::None
	}
}

impl Action {
	#[must_use]
	pub fn from_value(value: &Value) -> Self {
		let text = |key: &str| value.get(key).and_then(Value::as_str).filter(|text| !text.is_empty()).map(str::to_owned);
		let object = |key: &str| value.get(key).and_then(Value::as_object).cloned();

		match value.get("action").and_then(Value::as_str) {
			Some("more-info") => Self::MoreInfo { entity: text("entity") },
			Some("toggle") => Self::Toggle { entity: text("entity") },
			Some("navigate") => text("navigation_path").map_or(Self::None, |path| Self::Navigate { path }),
			Some("url" | "open-url") => text("url_path").map_or(Self::None, |url| Self::OpenUrl { url }),
			Some(kind @ ("call-service" | "perform-action" | "call-action")) => {
				let service = if kind == "call-service" { text("service") } else { text("perform_action").or_else(|| text("service")) };
				let service = service.as_deref().and_then(|service| service.split_once('.'));
				match service {
					Some((domain, service)) if !domain.is_empty() && !service.is_empty() => Self::CallService {
						domain: domain.to_owned(),
						service: service.to_owned(),
						data: object("data").or_else(|| object("service_data")).unwrap_or_default(),
						target: value.get("target").cloned(),
					},
					_ => Self::None,
				}
			}
			other => {
				if let Some(other) = other.filter(|other| *other != "none") {
					debug!(action = other, "Ignoring unknown action.");
				}
				Self::None
			}
		}
	}

	#[must_use]
	pub fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}

	/// Performs the action. `reference` is the card's entity, used where the descriptor names none.
	pub fn execute(&self, host: &dyn ActionHost, reference: Option<&str>) {
		match self {
			Self::MoreInfo { entity } => match entity.as_deref().or(reference) {
				Some(entity) => host.more_info(entity),
				None => warn!("`more-info` without an entity."),
			},
			Self::Toggle { entity } => match entity.as_deref().or(reference) {
				Some(entity) => host.call_service("homeassistant", "toggle", &json!({ "entity_id": entity }), None),
				None => warn!("`toggle` without an entity."),
			},
			Self::Navigate { path } => host.navigate(path),
			Self::OpenUrl { url } => host.open_url(url),
			Self::CallService { domain, service, data, target } => host.call_service(domain, service, &Value::Object(data.clone()), target.as_ref()),
			Self::None => (),
		}
	}
}

/// What actions can do to the host.
pub trait ActionHost {
	fn more_info(&self, entity_id: &str);
	fn navigate(&self, path: &str);
	fn open_url(&self, url: &str);
	fn call_service(&self, domain: &str, service: &str, data: &Value, target: Option<&Value>);
}

/// [`ActionHost`] backed by the card element and the current `hass` object.
pub struct HassActions<'a> {
	pub element: &'a HtmlElement,
	pub hass: &'a JsValue,
}

impl HassActions<'_> {
	fn try_call_service(&self, domain: &str, service: &str, data: &Value, target: Option<&Value>) -> Result<(), Error> {
		let call_service = Reflect::get(self.hass, &"callService".into())?
			.dyn_into::<Function>()
			.map_err(|_| Error::Js("`hass.callService` is not a function".to_owned()))?;
		let target = match target {
			Some(target) => crate::config::to_js(target)?,
			None => JsValue::UNDEFINED,
		};
		let arguments = Array::of4(&domain.into(), &service.into(), &crate::config::to_js(data)?, &target);
		let result = call_service.apply(self.hass, &arguments)?;
		if let Ok(promise) = result.dyn_into::<Promise>() {
			let (domain, service) = (domain.to_owned(), service.to_owned());
			wasm_bindgen_futures::spawn_local(async move {
				if let Err(rejection) = JsFuture::from(promise).await {
					error!(%domain, %service, ?rejection, "Service call failed.");
				}
			});
		}
		Ok(())
	}
}

impl ActionHost for HassActions<'_> {
	fn more_info(&self, entity_id: &str) {
		if let Err(error) = element::fire(self.element, "hass-more-info", &json!({ "entityId": entity_id })) {
			error!(%error, "Failed to open more-info.");
		}
	}

	fn navigate(&self, path: &str) {
		let result = (|| {
			let window = web_sys::window().ok_or_else(|| Error::Js("no `window`".to_owned()))?;
			window.history()?.push_state_with_url(&JsValue::NULL, "", Some(path))?;
			element::fire(&window, "location-changed", &json!({ "replace": false }))
		})();
		if let Err(error) = result {
			error!(%error, path, "Failed to navigate.");
		}
	}

	fn open_url(&self, url: &str) {
		let opened = web_sys::window().map(|window| window.open_with_url_and_target(url, "_blank"));
		if let Some(Err(error)) = opened {
			error!(?error, url, "Failed to open URL.");
		}
	}

	fn call_service(&self, domain: &str, service: &str, data: &Value, target: Option<&Value>) {
		if let Err(error) = self.try_call_service(domain, service, data, target) {
			error!(%error, domain, service, "Failed to call service.");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;

	#[derive(Default)]
	struct Recorder(RefCell<Vec<String>>);
	impl ActionHost for Recorder {
		fn more_info(&self, entity_id: &str) {
			self.0.borrow_mut().push(format!("more-info {}", entity_id));
		}
		fn navigate(&self, path: &str) {
			self.0.borrow_mut().push(format!("navigate {}", path));
		}
		fn open_url(&self, url: &str) {
			self.0.borrow_mut().push(format!("url {}", url));
		}
		fn call_service(&self, domain: &str, service: &str, data: &Value, target: Option<&Value>) {
			let target = target.map_or_else(|| "-".to_owned(), ToString::to_string);
			self.0.borrow_mut().push(format!("{}.{} {} {}", domain, service, data, target));
		}
	}

	fn run(descriptor: Value, reference: Option<&str>) -> Vec<String> {
		let recorder = Recorder::default();
		Action::from_value(&descriptor).execute(&recorder, reference);
		recorder.0.into_inner()
	}

	#[test]
	fn toggle_uses_reference() {
		assert_eq!(run(json!({ "action": "toggle" }), Some("light.wled")), ["homeassistant.toggle {\"entity_id\":\"light.wled\"} -"]);
		assert_eq!(run(json!({ "action": "toggle", "entity": "switch.x" }), Some("light.wled")), ["homeassistant.toggle {\"entity_id\":\"switch.x\"} -"]);
	}

	#[test]
	fn more_info_without_entity_does_nothing() {
		assert!(run(json!({ "action": "more-info" }), None).is_empty());
		assert_eq!(run(json!({ "action": "more-info" }), Some("sensor.wlvp_a")), ["more-info sensor.wlvp_a"]);
	}

	#[test]
	fn navigation_and_urls() {
		assert_eq!(run(json!({ "action": "navigate", "navigation_path": "/lovelace/2" }), None), ["navigate /lovelace/2"]);
		assert_eq!(run(json!({ "action": "url", "url_path": "https://kno.wled.ge" }), None), ["url https://kno.wled.ge"]);
		assert_eq!(Action::from_value(&json!({ "action": "open-url", "url_path": "x" })), Action::OpenUrl { url: "x".to_owned() });
		assert_eq!(Action::from_value(&json!({ "action": "navigate" })), Action::None);
	}

	#[test]
	fn service_calls() {
		assert_eq!(
			run(json!({ "action": "call-service", "service": "light.turn_on", "service_data": { "brightness": 10 } }), None),
			["light.turn_on {\"brightness\":10} -"]
		);
		assert_eq!(
			run(json!({ "action": "perform-action", "perform_action": "scene.turn_on", "target": { "entity_id": "scene.a" } }), None),
			["scene.turn_on {} {\"entity_id\":\"scene.a\"}"]
		);
		assert_eq!(Action::from_value(&json!({ "action": "call-service", "service": "nodot" })), Action::None);
	}

	#[test]
	fn unknown_kinds_are_no_ops() {
		for descriptor in [json!({ "action": "fire-dom-event" }), json!({ "action": "none" }), json!({}), json!("toggle")] {
			assert!(Action::from_value(&descriptor).is_none());
			assert!(run(descriptor, Some("light.wled")).is_empty());
		}
	}
}
