//! Read access to the host's live entity states (`hass.states`).

use hashbrown::HashMap;
use js_sys::{Object, Reflect};
use serde_json::{Map, Value};
use wasm_bindgen::{JsCast, JsValue};

/// The lookups the card performs on host state.
pub trait HostStates {
	/// Entity ids in the host's enumeration order.
	fn entity_ids(&self) -> Vec<String>;
	fn contains(&self, entity_id: &str) -> bool;
	/// The `entry_id` attribute of `entity_id`, if it has a non-empty one.
	fn entry_id_of(&self, entity_id: &str) -> Option<String>;

	/// The first entity whose id starts with `prefix`.
	fn first_with_prefix(&self, prefix: &str) -> Option<String> {
		self.entity_ids().into_iter().find(|id| id.starts_with(prefix))
	}
}

/// The state of a single entity, reduced to what the card reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityState {
	pub state: String,
	pub attributes: Map<String, Value>,
}

/// An owned snapshot of host state.
///
/// Insertion order is kept so that prefix lookups behave like they do on the live object.
#[derive(Debug, Clone, Default)]
pub struct StateMap {
	order: Vec<String>,
	states: HashMap<String, EntityState>,
}

impl StateMap {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, entity_id: impl Into<String>, state: EntityState) {
		let entity_id = entity_id.into();
		if self.states.insert(entity_id.clone(), state).is_none() {
			self.order.push(entity_id);
		}
	}

	/// Builder-style [`insert`](`StateMap::insert`).
	#[must_use]
	pub fn with(mut self, entity_id: impl Into<String>, attributes: Value) -> Self {
		let attributes = match attributes {
			Value::Object(attributes) => attributes,
			_ => Map::new(),
		};
		self.insert(entity_id, EntityState { state: String::new(), attributes });
		self
	}
}

impl HostStates for StateMap {
	fn entity_ids(&self) -> Vec<String> {
		self.order.clone()
	}

	fn contains(&self, entity_id: &str) -> bool {
		self.states.contains_key(entity_id)
	}

	fn entry_id_of(&self, entity_id: &str) -> Option<String> {
		match self.states.get(entity_id)?.attributes.get("entry_id")? {
			Value::String(entry_id) if !entry_id.is_empty() => Some(entry_id.clone()),
			Value::Number(entry_id) => Some(entry_id.to_string()),
			_ => None,
		}
	}
}

/// The live `hass.states` object, read on demand.
///
/// `hass` is reassigned on every state change anywhere in the installation,
/// so nothing is copied out of it eagerly.
#[derive(Debug, Clone)]
pub struct JsStates(Object);

impl JsStates {
	/// Reads `hass.states`. Returns [`None`] if `hass` has no usable `states` object yet.
	#[must_use]
	pub fn from_hass(hass: &JsValue) -> Option<Self> {
		if !hass.is_object() {
			return None;
		}
		Reflect::get(hass, &"states".into()).ok()?.dyn_into::<Object>().ok().map(Self)
	}

	fn get(&self, entity_id: &str) -> Option<JsValue> {
		Reflect::get(&self.0, &entity_id.into()).ok().filter(JsValue::is_object)
	}
}

impl HostStates for JsStates {
	fn entity_ids(&self) -> Vec<String> {
		Object::keys(&self.0).iter().filter_map(|key| key.as_string()).collect()
	}

	fn contains(&self, entity_id: &str) -> bool {
		self.get(entity_id).is_some()
	}

	fn entry_id_of(&self, entity_id: &str) -> Option<String> {
		let attributes = Reflect::get(&self.get(entity_id)?, &"attributes".into()).ok().filter(JsValue::is_object)?;
		let entry_id = Reflect::get(&attributes, &"entry_id".into()).ok()?;
		entry_id
			.as_string()
			.or_else(|| entry_id.as_f64().map(|number| number.to_string()))
			.filter(|entry_id| !entry_id.is_empty())
	}
}
