//! Card configuration, as assigned by the dashboard and as used after [resolution](`crate::resolve`).

use crate::{action::Action, error::Error};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;
use wasm_bindgen::JsValue;

/// Path segment of the integration's WebSocket view below `/api/`.
pub const SERVICE_PATH: &str = "wled_ws";
/// Entity id prefix of the integration's live-view sensors.
pub const SENSOR_PREFIX: &str = "sensor.wlvp_";
/// A `sensor` containing this marker is replaced by the first matching sensor in host state.
pub const WILDCARD: char = '*';
/// Target identifier used when nothing better can be resolved.
pub const FALLBACK_ENTRY_ID: &str = "default";
pub const DEFAULT_BRIGHTNESS: i64 = 100;
pub const DEFAULT_ANGLE: i64 = 90;

/// The configuration object exactly as the host provides it.
///
/// Keys this card doesn't know about (`type`, view layout options…) are kept in [`extra`](`WidgetConfig::extra`)
/// so that the editor can hand them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
	#[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
	pub sensor: Option<String>,
	#[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
	pub entry_id: Option<String>,
	#[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
	pub entity: Option<String>,
	#[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
	pub brightness: Option<f64>,
	#[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
	pub angle: Option<f64>,
	#[serde(rename = "info", default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
	pub diagnostics: Option<bool>,
	#[serde(rename = "debug", default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
	pub verbose: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tap_action: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hold_action: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub double_tap_action: Option<Value>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl WidgetConfig {
	/// Reads a host configuration object.
	///
	/// `undefined` and `null` yield [`None`], which [`resolve`](`crate::resolve::resolve`) rejects.
	///
	/// # Errors
	///
	/// Iff the value can't be serialised by `JSON.stringify`.
	pub fn from_js(value: &JsValue) -> Result<Option<Self>, Error> {
		if value.is_undefined() || value.is_null() {
			return Ok(None);
		}
		let json = js_sys::JSON::stringify(value)?;
		let json: String = json.into();
		Ok(Some(Self::from_json(serde_json::from_str(&json)?)?))
	}

	/// Reads a configuration that isn't absent. Anything but an object counts as empty.
	///
	/// # Errors
	///
	/// Iff `serde_json` can't map the object, which the lenient fields make unlikely.
	pub fn from_json(value: Value) -> Result<Self, Error> {
		if value.is_object() {
			Ok(serde_json::from_value(value)?)
		} else {
			warn!(config = %value, "wled-ws-card: configuration is not an object, using defaults");
			Ok(Self::default())
		}
	}

	/// Whether `sensor` asks to be picked from host state.
	#[must_use]
	pub fn wants_sensor_lookup(sensor: Option<&str>) -> bool {
		sensor.map_or(true, |sensor| sensor.is_empty() || sensor.contains(WILDCARD))
	}
}

// Dashboard YAML often quotes scalars, and a value of the wrong type is defaulted instead of failing `setConfig`.

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
	Ok(match Option::<Value>::deserialize(deserializer)? {
		Some(Value::String(text)) => Some(text),
		Some(Value::Number(number)) => Some(number.to_string()),
		_ => None,
	})
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
	Ok(match Option::<Value>::deserialize(deserializer)? {
		Some(Value::Number(number)) => number.as_f64(),
		Some(Value::String(text)) => text.trim().parse::<f64>().ok().filter(|number| number.is_finite()),
		_ => None,
	})
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
	Ok(match Option::<Value>::deserialize(deserializer)? {
		Some(Value::Bool(flag)) => Some(flag),
		Some(Value::String(text)) => match text.trim() {
			"true" => Some(true),
			"false" => Some(false),
			_ => None,
		},
		_ => None,
	})
}

/// A [`WidgetConfig`] with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CardConfig {
	pub sensor: Option<String>,
	/// Never empty.
	pub entry_id: String,
	pub entity: Option<String>,
	pub brightness: i64,
	/// In degrees.
	pub angle: i64,
	pub diagnostics: bool,
	pub verbose: bool,
	pub tap_action: Action,
	pub hold_action: Action,
	/// [`None`] unless configured, so that single taps aren't delayed needlessly.
	pub double_tap_action: Option<Action>,
	pub extra: Map<String, Value>,
}

impl CardConfig {
	/// The entity that actions like `more-info` and `toggle` refer to by default.
	#[must_use]
	pub fn reference(&self) -> Option<&str> {
		self.entity.as_deref().or_else(|| self.sensor.as_deref().filter(|sensor| !sensor.is_empty() && !sensor.contains(WILDCARD)))
	}
}

/// The configuration offered to the card picker for new cards.
#[must_use]
pub fn stub() -> Value {
	json!({
		"sensor": "",
		"debug": false,
		"info": false,
		"brightness": DEFAULT_BRIGHTNESS,
		"angle": DEFAULT_ANGLE,
	})
}

/// Converts a JSON value into a plain JavaScript value.
///
/// # Errors
///
/// Iff `JSON.parse` rejects the serialised text, which shouldn't happen.
pub fn to_js(value: &Value) -> Result<JsValue, Error> {
	let json = serde_json::to_string(value)?;
	Ok(js_sys::JSON::parse(&json)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_keys_survive() {
		let config: WidgetConfig = serde_json::from_value(json!({
			"type": "custom:wled-ws-card",
			"sensor": "sensor.wlvp_kitchen",
			"info": true,
			"angle": 45,
		}))
		.unwrap();

		assert_eq!(config.sensor.as_deref(), Some("sensor.wlvp_kitchen"));
		assert_eq!(config.diagnostics, Some(true));
		assert_eq!(config.angle, Some(45.0));
		assert_eq!(config.extra.get("type"), Some(&json!("custom:wled-ws-card")));

		let back = serde_json::to_value(&config).unwrap();
		assert_eq!(back["type"], json!("custom:wled-ws-card"));
		assert_eq!(back["info"], json!(true));
		assert!(back.get("debug").is_none());
	}

	#[test]
	fn null_fields_are_unset() {
		let config: WidgetConfig = serde_json::from_value(json!({ "angle": null, "sensor": null })).unwrap();
		assert_eq!(config, WidgetConfig::default());
	}

	#[test]
	fn quoted_scalars_are_read() {
		let config: WidgetConfig = serde_json::from_value(json!({
			"brightness": "50",
			"angle": " 45 ",
			"info": "true",
			"debug": "false",
			"entry_id": 7,
		}))
		.unwrap();
		assert_eq!(config.brightness, Some(50.0));
		assert_eq!(config.angle, Some(45.0));
		assert_eq!(config.diagnostics, Some(true));
		assert_eq!(config.verbose, Some(false));
		assert_eq!(config.entry_id.as_deref(), Some("7"));
	}

	#[test]
	fn mistyped_values_are_unset() {
		let config: WidgetConfig = serde_json::from_value(json!({
			"sensor": 123.5,
			"entity": ["light.a"],
			"brightness": "bright",
			"angle": { "deg": 4 },
			"info": 1,
			"debug": "yes",
		}))
		.unwrap();
		assert_eq!(config.sensor.as_deref(), Some("123.5"));
		assert_eq!(config.entity, None);
		assert_eq!(config.brightness, None);
		assert_eq!(config.angle, None);
		assert_eq!(config.diagnostics, None);
		assert_eq!(config.verbose, None);
	}

	#[test]
	fn non_objects_count_as_empty() {
		assert_eq!(WidgetConfig::from_json(json!("sensor.wlvp_kitchen")).unwrap(), WidgetConfig::default());
		assert_eq!(WidgetConfig::from_json(json!([1, 2])).unwrap(), WidgetConfig::default());
	}

	#[test]
	fn sensor_lookup() {
		assert!(WidgetConfig::wants_sensor_lookup(None));
		assert!(WidgetConfig::wants_sensor_lookup(Some("")));
		assert!(WidgetConfig::wants_sensor_lookup(Some("sensor.wlvp_*")));
		assert!(!WidgetConfig::wants_sensor_lookup(Some("sensor.wlvp_kitchen")));
	}
}
