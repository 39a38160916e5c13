//! Turns a host configuration into a [`CardConfig`], filling in the target identifier from host state.

use crate::{
	action::Action,
	config::{CardConfig, WidgetConfig, DEFAULT_ANGLE, DEFAULT_BRIGHTNESS, FALLBACK_ENTRY_ID, SENSOR_PREFIX},
	error::Error,
	states::HostStates,
};
use tracing::{info, warn};

/// Normalises `raw`, which is consumed so that the host's own object is never touched.
///
/// `states` is the host state known at the time, if any.
/// Later state updates go through [`apply_host_state`].
///
/// # Errors
///
/// [`Error::InvalidConfiguration`] iff `raw` is [`None`]. Anything else is defaulted.
pub fn resolve(raw: Option<WidgetConfig>, states: Option<&dyn HostStates>) -> Result<CardConfig, Error> {
	let raw = raw.ok_or(Error::InvalidConfiguration)?;
	let diagnostics = raw.diagnostics.unwrap_or(false);
	if diagnostics {
		info!(config = ?raw, "wled-ws-card: config");
	}

	let mut sensor = raw.sensor.filter(|sensor| !sensor.is_empty());
	if let Some(states) = states {
		if let Some(found) = substitute_wildcard(sensor.as_deref(), states, diagnostics) {
			sensor = Some(found);
		}
	}

	let entry_id = match (&sensor, raw.entry_id.filter(|entry_id| !entry_id.is_empty())) {
		(Some(sensor), _) => match states.filter(|states| states.contains(sensor)) {
			Some(states) => match states.entry_id_of(sensor) {
				Some(entry_id) => {
					if diagnostics {
						info!(%entry_id, "wled-ws-card: entry_id extracted from sensor");
					}
					entry_id
				}
				None => {
					if diagnostics {
						warn!(%sensor, "wled-ws-card: entry_id not found in sensor attributes, using 'default'");
					}
					FALLBACK_ENTRY_ID.to_owned()
				}
			},
			None => {
				if diagnostics {
					warn!(%sensor, "wled-ws-card: Sensor not found, using 'default'");
				}
				FALLBACK_ENTRY_ID.to_owned()
			}
		},
		(None, Some(entry_id)) => entry_id,
		(None, None) => {
			if diagnostics {
				warn!("wled-ws-card: Neither sensor nor entry_id specified, using 'default'");
			}
			FALLBACK_ENTRY_ID.to_owned()
		}
	};

	let has_reference = raw.entity.is_some() || sensor.is_some();
	let tap_action = match &raw.tap_action {
		Some(value) => Action::from_value(value),
		None if has_reference => Action::MoreInfo { entity: None },
		None => Action::None,
	};

	Ok(CardConfig {
		sensor,
		entry_id,
		entity: raw.entity,
		// 0 means unset, as the editor shows it.
		brightness: raw.brightness.filter(|brightness| brightness.is_finite()).map(round).filter(|&brightness| brightness != 0).unwrap_or(DEFAULT_BRIGHTNESS),
		angle: raw.angle.filter(|angle| angle.is_finite()).map_or(DEFAULT_ANGLE, round),
		diagnostics,
		verbose: raw.verbose.unwrap_or(false),
		tap_action,
		hold_action: raw.hold_action.as_ref().map_or(Action::None, Action::from_value),
		double_tap_action: raw.double_tap_action.as_ref().map(Action::from_value),
		extra: raw.extra,
	})
}

/// Updates `config` from fresh host state: substitutes a missing or wildcard `sensor`
/// and adopts that sensor's `entry_id`.
///
/// Returns whether the target identifier changed.
pub fn apply_host_state(config: &mut CardConfig, states: &dyn HostStates) -> bool {
	if let Some(found) = substitute_wildcard(config.sensor.as_deref(), states, config.diagnostics) {
		config.sensor = Some(found);
	}

	let entry_id = match &config.sensor {
		Some(sensor) => states.entry_id_of(sensor),
		None => None,
	};
	match entry_id {
		Some(entry_id) if entry_id != config.entry_id => {
			if config.diagnostics {
				info!(%entry_id, "wled-ws-card: entry_id extracted from sensor");
			}
			config.entry_id = entry_id;
			true
		}
		_ => false,
	}
}

fn substitute_wildcard(sensor: Option<&str>, states: &dyn HostStates, diagnostics: bool) -> Option<String> {
	if !WidgetConfig::wants_sensor_lookup(sensor) {
		return None;
	}
	let found = states.first_with_prefix(SENSOR_PREFIX)?;
	if diagnostics {
		info!(sensor = %found, "wled-ws-card: Wildcard sensor substituted");
	}
	Some(found)
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i64 {
	value.round() as i64
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::states::StateMap;
	use serde_json::json;

	fn raw(value: serde_json::Value) -> Option<WidgetConfig> {
		Some(serde_json::from_value(value).unwrap())
	}

	fn kitchen() -> StateMap {
		StateMap::new()
			.with("light.kitchen", json!({ "entry_id": "not-ours" }))
			.with("sensor.wlvp_kitchen", json!({ "entry_id": "abc123" }))
	}

	#[test]
	fn absent_configuration_is_rejected() {
		assert!(matches!(resolve(None, None), Err(Error::InvalidConfiguration)));
	}

	#[test]
	fn empty_configuration_gets_defaults() {
		let states = StateMap::new().with("light.kitchen", json!({}));
		for states in [None, Some(&states as &dyn HostStates)] {
			let config = resolve(raw(json!({})), states).unwrap();
			assert_eq!(config.entry_id, "default");
			assert_eq!(config.brightness, 100);
			assert_eq!(config.angle, 90);
			assert!(!config.diagnostics);
			assert!(!config.verbose);
			assert_eq!(config.tap_action, Action::None);
		}
	}

	#[test]
	fn sensor_resolves_to_its_entry_id() {
		let states = kitchen();
		let config = resolve(raw(json!({ "sensor": "sensor.wlvp_kitchen" })), Some(&states)).unwrap();
		assert_eq!(config.entry_id, "abc123");
		assert_eq!(config.tap_action, Action::MoreInfo { entity: None });
		assert_eq!(config.reference(), Some("sensor.wlvp_kitchen"));
	}

	#[test]
	fn unresolvable_sensor_falls_back() {
		let states = StateMap::new().with("sensor.wlvp_kitchen", json!({}));
		let config = resolve(raw(json!({ "sensor": "sensor.wlvp_kitchen", "entry_id": "explicit" })), Some(&states)).unwrap();
		assert_eq!(config.entry_id, "default");

		let config = resolve(raw(json!({ "sensor": "sensor.wlvp_gone" })), Some(&states)).unwrap();
		assert_eq!(config.entry_id, "default");

		let config = resolve(raw(json!({ "sensor": "sensor.wlvp_kitchen" })), None).unwrap();
		assert_eq!(config.entry_id, "default");
	}

	#[test]
	fn explicit_entry_id_without_sensor() {
		let config = resolve(raw(json!({ "entry_id": "xyz" })), None).unwrap();
		assert_eq!(config.entry_id, "xyz");
	}

	#[test]
	fn wildcard_is_substituted() {
		let states = kitchen();
		let config = resolve(raw(json!({ "sensor": "sensor.wlvp_*" })), Some(&states)).unwrap();
		assert_eq!(config.sensor.as_deref(), Some("sensor.wlvp_kitchen"));
		assert_eq!(config.entry_id, "abc123");
	}

	#[test]
	fn host_state_arriving_later() {
		let mut config = resolve(raw(json!({ "sensor": "sensor.wlvp_*", "info": true })), None).unwrap();
		assert_eq!(config.entry_id, "default");

		assert!(apply_host_state(&mut config, &kitchen()));
		assert_eq!(config.sensor.as_deref(), Some("sensor.wlvp_kitchen"));
		assert_eq!(config.entry_id, "abc123");

		assert!(!apply_host_state(&mut config, &kitchen()));
	}

	#[test]
	fn host_state_without_match_keeps_fallback() {
		let mut config = resolve(raw(json!({})), None).unwrap();
		assert!(!apply_host_state(&mut config, &StateMap::new().with("light.kitchen", json!({}))));
		assert_eq!(config.sensor, None);
		assert_eq!(config.entry_id, "default");
	}

	#[test]
	fn numbers_are_rounded_and_zero_brightness_is_unset() {
		let config = resolve(raw(json!({ "brightness": 0, "angle": 44.6 })), None).unwrap();
		assert_eq!(config.brightness, 100);
		assert_eq!(config.angle, 45);

		let config = resolve(raw(json!({ "brightness": 0.2, "angle": 0 })), None).unwrap();
		assert_eq!(config.brightness, 100);
		assert_eq!(config.angle, 0);
	}

	#[test]
	fn quoted_numbers_are_used() {
		let config = resolve(raw(json!({ "brightness": "50", "angle": "45", "info": "true" })), None).unwrap();
		assert_eq!(config.brightness, 50);
		assert_eq!(config.angle, 45);
		assert!(config.diagnostics);
	}

	#[test]
	fn mistyped_values_are_defaulted() {
		let states = kitchen();
		let config = resolve(raw(json!({ "sensor": true, "brightness": [50], "angle": "steep", "debug": 1 })), Some(&states)).unwrap();
		assert_eq!(config.sensor.as_deref(), Some("sensor.wlvp_kitchen"));
		assert_eq!(config.entry_id, "abc123");
		assert_eq!(config.brightness, 100);
		assert_eq!(config.angle, 90);
		assert!(!config.verbose);
	}

	#[test]
	fn blank_sensor_is_no_reference() {
		let config = resolve(Some(WidgetConfig::from_json(crate::config::stub()).unwrap()), None).unwrap();
		assert_eq!(config.sensor, None);
		assert_eq!(config.tap_action, Action::None);
		assert_eq!(config.reference(), None);
	}

	#[test]
	fn configured_actions() {
		let config = resolve(
			raw(json!({
				"entity": "light.wled",
				"tap_action": { "action": "toggle" },
				"hold_action": { "action": "navigate", "navigation_path": "/lovelace/1" },
				"double_tap_action": { "action": "bogus" },
			})),
			None,
		)
		.unwrap();
		assert_eq!(config.tap_action, Action::Toggle { entity: None });
		assert_eq!(config.hold_action, Action::Navigate { path: "/lovelace/1".to_owned() });
		assert_eq!(config.double_tap_action, Some(Action::None));
		assert_eq!(config.reference(), Some("light.wled"));
	}
}
