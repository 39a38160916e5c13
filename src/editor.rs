//! The `wled-ws-card-editor` element.
//!
//! Edits are never written back into the host's configuration object.
//! Each one is reported as a `config-changed` event carrying a copy with that single key replaced.

use crate::{
	config::{self, SENSOR_PREFIX},
	dom::DomRenderer,
	element,
	error::Error,
	states::{HostStates, JsStates},
	update::UpdateQueue,
};
use core::{future::Future, pin::Pin};
use js_sys::{Function, Promise, Reflect};
use lignin::{Attribute, CallbackRef, CallbackRegistration, Element, ElementCreationOptions, EventBinding, EventBindingOptions, Materialize, Node, ThreadBound};
use serde_json::{json, Map, Value};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{debug, error};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{CustomEvent, HtmlElement, ShadowRoot, ShadowRootInit, ShadowRootMode};

pub const BRIGHTNESS_RANGE: (i64, i64) = (0, 1000);
/// Angles are kept in `[0, 360)`.
pub const FULL_TURN: i64 = 360;

/// A boolean configuration key with a switch in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
	Info,
	Debug,
}

impl Flag {
	#[must_use]
	pub fn key(self) -> &'static str {
		match self {
			Flag::Info => "info",
			Flag::Debug => "debug",
		}
	}
}

/// A number typed into one of the editor's fields. [`None`] for blank, non-numeric and non-finite input.
#[must_use]
pub fn parse_number(input: &str) -> Option<f64> {
	let input = input.trim();
	if input.is_empty() {
		return None;
	}
	input.parse::<f64>().ok().filter(|number| number.is_finite())
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn clamp_brightness(value: f64) -> i64 {
	let (min, max) = BRIGHTNESS_RANGE;
	(value.round() as i64).clamp(min, max)
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn wrap_angle(value: f64) -> i64 {
	(value.round() as i64).rem_euclid(FULL_TURN)
}

/// The live-view sensors that can be picked: integration sensors that carry an `entry_id`.
#[must_use]
pub fn sensor_options(states: &dyn HostStates) -> Vec<String> {
	states
		.entity_ids()
		.into_iter()
		.filter(|entity_id| entity_id.starts_with(SENSOR_PREFIX) && states.entry_id_of(entity_id).is_some())
		.collect()
}

/// The configuration being edited, as the host last assigned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
	config: Map<String, Value>,
}

impl EditorState {
	#[must_use]
	pub fn new(config: Map<String, Value>) -> Self {
		Self { config }
	}

	/// Anything but a plain object is treated as an empty configuration.
	///
	/// # Errors
	///
	/// Iff `value` can't be serialised by `JSON.stringify`.
	pub fn from_js(value: &JsValue) -> Result<Self, Error> {
		if !value.is_object() {
			return Ok(Self::default());
		}
		let json: String = js_sys::JSON::stringify(value)?.into();
		match serde_json::from_str::<Value>(&json)? {
			Value::Object(config) => Ok(Self::new(config)),
			_ => Ok(Self::default()),
		}
	}

	#[must_use]
	pub fn config(&self) -> &Map<String, Value> {
		&self.config
	}

	#[must_use]
	pub fn sensor(&self) -> &str {
		self.config.get("sensor").and_then(Value::as_str).unwrap_or_default()
	}

	/// Field text for the brightness. Unset and zero show the default.
	#[must_use]
	pub fn brightness_text(&self) -> String {
		match self.config.get("brightness") {
			Some(Value::Number(number)) if number.as_f64() != Some(0.0) => number.to_string(),
			Some(Value::String(text)) if !text.is_empty() => text.clone(),
			_ => config::DEFAULT_BRIGHTNESS.to_string(),
		}
	}

	#[must_use]
	pub fn angle_text(&self) -> String {
		match self.config.get("angle") {
			Some(Value::Number(number)) => number.to_string(),
			Some(Value::String(text)) => text.clone(),
			_ => config::DEFAULT_ANGLE.to_string(),
		}
	}

	#[must_use]
	pub fn flag(&self, flag: Flag) -> bool {
		match self.config.get(flag.key()) {
			Some(Value::Bool(on)) => *on,
			Some(Value::String(text)) => text.trim() == "true",
			_ => false,
		}
	}

	fn replace(&mut self, key: &str, value: Value) -> Map<String, Value> {
		self.config.insert(key.to_owned(), value);
		self.config.clone()
	}

	/// Each setter returns the configuration to report, or [`None`] if the input is unusable.
	pub fn set_sensor(&mut self, sensor: &str) -> Map<String, Value> {
		self.replace("sensor", sensor.into())
	}

	pub fn set_brightness(&mut self, input: &str) -> Option<Map<String, Value>> {
		let brightness = clamp_brightness(parse_number(input)?);
		Some(self.replace("brightness", brightness.into()))
	}

	pub fn set_angle(&mut self, input: &str) -> Option<Map<String, Value>> {
		let angle = wrap_angle(parse_number(input)?);
		Some(self.replace("angle", angle.into()))
	}

	pub fn set_flag(&mut self, flag: Flag, on: bool) -> Map<String, Value> {
		self.replace(flag.key(), on.into())
	}
}

/// `hass.localize(key)`, or `fallback` where that yields nothing.
#[must_use]
pub fn localize(hass: &JsValue, key: &str, fallback: &str) -> String {
	if !hass.is_object() {
		return fallback.to_owned();
	}
	Reflect::get(hass, &"localize".into())
		.ok()
		.and_then(|localize| localize.dyn_into::<Function>().ok())
		.and_then(|localize| localize.call1(hass, &key.into()).ok())
		.and_then(|text| text.as_string())
		.filter(|text| !text.is_empty())
		.unwrap_or_else(|| fallback.to_owned())
}

const WAITING: &str = "Waiting for Home Assistant state...";

const EDITOR_STYLE: &str = "\
.editor {
	padding: 16px;
	font-family: var(--ha-font-family, sans-serif);
	background: var(--card-background-color, #fff);
	color: var(--primary-text-color, #333);
}
.selector-wrapper,
.brightness-wrapper,
.angle-wrapper {
	margin-bottom: 16px;
}
ha-formfield {
	display: block;
	width: 100%;
}
ha-selector,
ha-textfield {
	width: 100%;
}
.brightness-wrapper label,
.angle-wrapper label {
	display: block;
	margin-bottom: 4px;
	font-weight: bold;
}
.switches-row {
	display: flex;
	gap: 16px;
}
.switches-row ha-formfield {
	flex: 1;
	display: flex;
	align-items: center;
	justify-content: center;
}
.switches-row ha-formfield > span[slot=\"label\"] {
	order: 1;
	margin-right: 8px;
	font-size: 14px;
}
.switches-row ha-formfield > ha-switch {
	order: 2;
}";

/// Field labels, looked up once per render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
	pub brightness: String,
	pub angle: String,
	pub info: String,
	pub debug: String,
}

impl Labels {
	#[must_use]
	pub fn new(hass: &JsValue) -> Self {
		let label = |key: &str, fallback| localize(hass, &format!("component.wled_liveviewproxy.editor.{}", key), fallback);
		Self {
			brightness: label("brightness", "Card Brightness (%)"),
			angle: label("angle", "Gradient Angle (degrees)"),
			info: label("info", "Info Mode"),
			debug: label("debug", "Debug Mode"),
		}
	}
}

/// What the editor's markup depends on. Field values are assigned as properties afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorView {
	Waiting,
	Ready(Labels),
}

type Handler = CallbackRef<ThreadBound, fn(lignin::web::Event)>;

/// Listeners for the five inputs.
#[derive(Clone, Copy)]
pub struct EditorHandlers {
	pub sensor: Handler,
	pub brightness: Handler,
	pub angle: Handler,
	pub info: Handler,
	pub debug: Handler,
}

fn element<'a>(name: &'a str, attributes: &'a [Attribute<'a>], content: Node<'a, ThreadBound>, event_bindings: &'a [EventBinding<'a, ThreadBound>]) -> Element<'a, ThreadBound> {
	Element {
		name,
		creation_options: ElementCreationOptions::new(),
		attributes,
		content,
		event_bindings,
	}
}

fn html<'a>(element: &'a Element<'a, ThreadBound>) -> Node<'a, ThreadBound> {
	Node::HtmlElement { element, dom_binding: None }
}

fn text(text: &str) -> Node<'_, ThreadBound> {
	Node::Text { text, dom_binding: None }
}

fn binding(name: &str, callback: Option<Handler>) -> Vec<EventBinding<'_, ThreadBound>> {
	callback
		.map(|callback| EventBinding {
			name,
			callback,
			options: EventBindingOptions::new(),
		})
		.into_iter()
		.collect()
}

impl EditorView {
	#[must_use]
	pub fn new(hass: &JsValue) -> Self {
		if hass.is_object() {
			Self::Ready(Labels::new(hass))
		} else {
			Self::Waiting
		}
	}

	/// Passes the editor's VDOM to `render`. Without `handlers`, the inputs are inert.
	pub fn with_vdom<R>(&self, handlers: Option<EditorHandlers>, render: impl FnOnce(&[Node<'_, ThreadBound>]) -> R) -> R {
		let style_text = [text(EDITOR_STYLE)];
		let style = element("style", &[], Node::Multi(&style_text), &[]);

		let labels = match self {
			Self::Waiting => {
				let waiting_text = [text(WAITING)];
				let waiting = element("div", &[], Node::Multi(&waiting_text), &[]);
				return render(&[html(&style), html(&waiting)]);
			}
			Self::Ready(labels) => labels,
		};

		let sensor_bindings = binding("value-changed", handlers.map(|handlers| handlers.sensor));
		let sensor_attributes = [Attribute { name: "id", value: "sensor" }];
		let sensor = element("ha-selector", &sensor_attributes, Node::Multi(&[]), &sensor_bindings);
		let slot_attributes = [Attribute { name: "slot", value: "label" }];
		let sensor_label = element("span", &slot_attributes, Node::Multi(&[]), &[]);
		let sensor_field = [html(&sensor), html(&sensor_label)];
		let sensor_field = element("ha-formfield", &[], Node::Multi(&sensor_field), &[]);
		let sensor_field = [html(&sensor_field)];
		let selector_attributes = [Attribute { name: "class", value: "selector-wrapper" }];
		let selector_wrapper = element("div", &selector_attributes, Node::Multi(&sensor_field), &[]);

		let brightness_bindings = binding("input", handlers.map(|handlers| handlers.brightness));
		let brightness_attributes = [
			Attribute { name: "id", value: "brightness" },
			Attribute { name: "type", value: "number" },
			Attribute { name: "min", value: "0" },
			Attribute { name: "max", value: "1000" },
			Attribute { name: "step", value: "1" },
		];
		let brightness_label_text = [text(&labels.brightness)];
		let brightness_label = element("label", &[], Node::Multi(&brightness_label_text), &[]);
		let brightness = element("ha-textfield", &brightness_attributes, Node::Multi(&[]), &brightness_bindings);
		let brightness_content = [html(&brightness_label), html(&brightness)];
		let brightness_wrapper_attributes = [Attribute { name: "class", value: "brightness-wrapper" }];
		let brightness_wrapper = element("div", &brightness_wrapper_attributes, Node::Multi(&brightness_content), &[]);

		let angle_bindings = binding("input", handlers.map(|handlers| handlers.angle));
		let angle_attributes = [
			Attribute { name: "id", value: "angle" },
			Attribute { name: "type", value: "number" },
			Attribute { name: "min", value: "0" },
			Attribute { name: "max", value: "360" },
			Attribute { name: "step", value: "1" },
		];
		let angle_label_text = [text(&labels.angle)];
		let angle_label = element("label", &[], Node::Multi(&angle_label_text), &[]);
		let angle = element("ha-textfield", &angle_attributes, Node::Multi(&[]), &angle_bindings);
		let angle_content = [html(&angle_label), html(&angle)];
		let angle_wrapper_attributes = [Attribute { name: "class", value: "angle-wrapper" }];
		let angle_wrapper = element("div", &angle_wrapper_attributes, Node::Multi(&angle_content), &[]);

		let info_bindings = binding("change", handlers.map(|handlers| handlers.info));
		let info_attributes = [Attribute { name: "id", value: "info" }];
		let info_label_text = [text(&labels.info)];
		let info_label = element("span", &slot_attributes, Node::Multi(&info_label_text), &[]);
		let info = element("ha-switch", &info_attributes, Node::Multi(&[]), &info_bindings);
		let info_content = [html(&info_label), html(&info)];
		let info_field = element("ha-formfield", &[], Node::Multi(&info_content), &[]);

		let debug_bindings = binding("change", handlers.map(|handlers| handlers.debug));
		let debug_attributes = [Attribute { name: "id", value: "debug" }];
		let debug_label_text = [text(&labels.debug)];
		let debug_label = element("span", &slot_attributes, Node::Multi(&debug_label_text), &[]);
		let debug = element("ha-switch", &debug_attributes, Node::Multi(&[]), &debug_bindings);
		let debug_content = [html(&debug_label), html(&debug)];
		let debug_field = element("ha-formfield", &[], Node::Multi(&debug_content), &[]);

		let switches = [html(&info_field), html(&debug_field)];
		let switches_attributes = [Attribute { name: "class", value: "switches-row" }];
		let switches_row = element("div", &switches_attributes, Node::Multi(&switches), &[]);

		let editor_content = [html(&selector_wrapper), html(&brightness_wrapper), html(&angle_wrapper), html(&switches_row)];
		let editor_attributes = [Attribute { name: "class", value: "editor" }];
		let editor = element("div", &editor_attributes, Node::Multi(&editor_content), &[]);

		render(&[html(&style), html(&editor)])
	}
}

struct Registrations {
	sensor: CallbackRegistration<EditorInner, fn(lignin::web::Event)>,
	brightness: CallbackRegistration<EditorInner, fn(lignin::web::Event)>,
	angle: CallbackRegistration<EditorInner, fn(lignin::web::Event)>,
	info: CallbackRegistration<EditorInner, fn(lignin::web::Event)>,
	debug: CallbackRegistration<EditorInner, fn(lignin::web::Event)>,
}

struct EditorInner {
	host: HtmlElement,
	root: ShadowRoot,
	state: RefCell<EditorState>,
	hass: RefCell<JsValue>,
	renderer: RefCell<DomRenderer>,
	rendered: RefCell<Option<EditorView>>,
	queue: UpdateQueue,
	handlers: RefCell<Option<EditorHandlers>>,
}

/// One editor instance.
pub struct Editor {
	// Dropped first, so that no callback outlives `inner`.
	_registrations: Registrations,
	inner: Rc<EditorInner>,
}

impl Editor {
	/// # Errors
	///
	/// Iff the shadow root can't be attached.
	pub fn new(host: HtmlElement) -> Result<Self, Error> {
		let root = match host.shadow_root() {
			Some(root) => root,
			None => host.attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))?,
		};

		let inner = Rc::new_cyclic(|this: &Weak<EditorInner>| EditorInner {
			host,
			renderer: RefCell::new(DomRenderer::new(root.clone().into())),
			root,
			state: RefCell::default(),
			hass: RefCell::new(JsValue::UNDEFINED),
			rendered: RefCell::new(None),
			queue: UpdateQueue::new({
				let this = this.clone();
				move || {
					if let Some(inner) = this.upgrade() {
						inner.render();
					}
				}
			}),
			handlers: RefCell::new(None),
		});

		let receiver = Pin::new(&*inner);
		let registrations = Registrations {
			sensor: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_sensor),
			brightness: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_brightness),
			angle: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_angle),
			info: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_info),
			debug: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_debug),
		};
		*inner.handlers.borrow_mut() = Some(EditorHandlers {
			sensor: registrations.sensor.to_ref_thread_bound(),
			brightness: registrations.brightness.to_ref_thread_bound(),
			angle: registrations.angle.to_ref_thread_bound(),
			info: registrations.info.to_ref_thread_bound(),
			debug: registrations.debug.to_ref_thread_bound(),
		});

		Ok(Self {
			_registrations: registrations,
			inner,
		})
	}

	/// # Errors
	///
	/// Iff `config` can't be read.
	pub fn set_config(&self, config: &JsValue) -> Result<(), Error> {
		*self.inner.state.borrow_mut() = EditorState::from_js(config)?;
		self.inner.queue.request_update();
		Ok(())
	}

	pub fn set_hass(&self, hass: JsValue) {
		*self.inner.hass.borrow_mut() = hass;
		self.inner.queue.request_update();
	}

	pub fn connected(&self) {
		self.inner.queue.request_update();
	}

	#[must_use]
	pub fn state(&self) -> EditorState {
		self.inner.state.borrow().clone()
	}

	#[must_use]
	pub fn shadow_root(&self) -> &ShadowRoot {
		&self.inner.root
	}

	pub fn update_complete(&self) -> impl Future<Output = ()> {
		self.inner.queue.update_complete()
	}
}

impl EditorInner {
	fn render(&self) {
		let next = EditorView::new(&self.hass.borrow());
		let previous = self.rendered.replace(Some(next.clone()));
		if previous.as_ref() != Some(&next) {
			let handlers = *self.handlers.borrow();
			let mut renderer = self.renderer.borrow_mut();
			next.with_vdom(handlers, |next| match &previous {
				Some(previous) => previous.with_vdom(handlers, |previous| renderer.update(previous, next)),
				None => renderer.update(&[], next),
			});
		}

		if let Err(error) = self.assign_properties() {
			error!(%error, "Failed to fill in the editor's fields.");
		}
	}

	fn assign_properties(&self) -> Result<(), Error> {
		let state = self.state.borrow();
		let hass = self.hass.borrow();
		let field = |id: &str| self.root.get_element_by_id(id);

		if let Some(sensor) = field("sensor") {
			let options = JsStates::from_hass(&hass).map(|states| sensor_options(&states)).unwrap_or_default();
			let selector = json!({ "entity": { "domain": "sensor", "include_entities": options } });
			set(&sensor, "selector", &config::to_js(&selector)?)?;
			set(&sensor, "hass", &hass)?;
			set(&sensor, "value", &state.sensor().into())?;
		}
		if let Some(brightness) = field("brightness") {
			set(&brightness, "value", &state.brightness_text().into())?;
		}
		if let Some(angle) = field("angle") {
			set(&angle, "value", &state.angle_text().into())?;
		}
		for flag in [Flag::Info, Flag::Debug] {
			if let Some(switch) = field(flag.key()) {
				set(&switch, "checked", &state.flag(flag).into())?;
			}
		}
		Ok(())
	}

	/// Applies one edit and reports the result to the host.
	fn change(&self, edit: impl FnOnce(&mut EditorState) -> Option<Map<String, Value>>) {
		let config = edit(&mut self.state.borrow_mut());
		match config {
			Some(config) => {
				if let Err(error) = element::fire(&self.host, "config-changed", &json!({ "config": config })) {
					error!(%error, "Failed to report the changed configuration.");
				}
				self.queue.request_update();
			}
			None => debug!("Ignoring unusable input."),
		}
	}
}

fn set(target: &JsValue, property: &str, value: &JsValue) -> Result<(), Error> {
	Reflect::set(target, &property.into(), value)?;
	Ok(())
}

fn with_event(inner: *const EditorInner, event: lignin::web::Event, f: impl FnOnce(&EditorInner, &web_sys::Event)) {
	//SAFETY: Registrations are dropped before the `EditorInner` they point to, after which they are never called.
	let inner = match unsafe { inner.as_ref() } {
		Some(inner) => inner,
		None => return error!("Editor event for a null editor."),
	};
	let event = event.materialize();
	let event: &JsValue = event.as_ref();
	match event.dyn_ref::<web_sys::Event>() {
		Some(event) => f(inner, event),
		None => error!("Expected an `Event` but received {:?}.", event),
	}
}

/// `event.target[property]`
fn target_property(event: &web_sys::Event, property: &str) -> JsValue {
	event
		.target()
		.and_then(|target| Reflect::get(&target, &property.into()).ok())
		.unwrap_or(JsValue::UNDEFINED)
}

fn on_sensor(inner: *const EditorInner, event: lignin::web::Event) {
	with_event(inner, event, |inner, event| {
		let value = event
			.dyn_ref::<CustomEvent>()
			.and_then(|event| Reflect::get(&event.detail(), &"value".into()).ok())
			.and_then(|value| value.as_string())
			.unwrap_or_default();
		inner.change(|state| Some(state.set_sensor(&value)));
	});
}

fn on_brightness(inner: *const EditorInner, event: lignin::web::Event) {
	with_event(inner, event, |inner, event| {
		let input = target_property(event, "value").as_string().unwrap_or_default();
		inner.change(|state| state.set_brightness(&input));
	});
}

fn on_angle(inner: *const EditorInner, event: lignin::web::Event) {
	with_event(inner, event, |inner, event| {
		let input = target_property(event, "value").as_string().unwrap_or_default();
		inner.change(|state| state.set_angle(&input));
	});
}

fn on_flag(flag: Flag, inner: *const EditorInner, event: lignin::web::Event) {
	with_event(inner, event, |inner, event| {
		let on = target_property(event, "checked").is_truthy();
		inner.change(|state| Some(state.set_flag(flag, on)));
	});
}

fn on_info(inner: *const EditorInner, event: lignin::web::Event) {
	on_flag(Flag::Info, inner, event);
}

fn on_debug(inner: *const EditorInner, event: lignin::web::Event) {
	on_flag(Flag::Debug, inner, event);
}

/// The object behind each `<wled-ws-card-editor>` element.
#[wasm_bindgen]
pub struct WledWsCardEditor(Editor);

impl WledWsCardEditor {
	/// # Errors
	///
	/// Iff the shadow root can't be attached.
	pub fn new(host: HtmlElement) -> Result<Self, Error> {
		Editor::new(host).map(Self)
	}
}

#[wasm_bindgen]
impl WledWsCardEditor {
	/// # Errors
	///
	/// Iff `config` can't be read.
	pub fn set_config(&self, config: JsValue) -> Result<(), JsValue> {
		self.0.set_config(&config).map_err(Into::into)
	}

	pub fn set_hass(&self, hass: JsValue) {
		self.0.set_hass(hass);
	}

	pub fn connected(&self) {
		self.0.connected();
	}

	#[must_use]
	pub fn update_complete(&self) -> Promise {
		let complete = self.0.update_complete();
		wasm_bindgen_futures::future_to_promise(async move {
			complete.await;
			Ok(JsValue::TRUE)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::states::StateMap;

	fn state(config: Value) -> EditorState {
		match config {
			Value::Object(config) => EditorState::new(config),
			_ => unreachable!(),
		}
	}

	#[test]
	fn brightness_is_clamped() {
		let mut editor = state(json!({}));
		assert_eq!(editor.set_brightness("1500").unwrap()["brightness"], json!(1000));
		assert_eq!(editor.set_brightness("-3").unwrap()["brightness"], json!(0));
		assert_eq!(editor.set_brightness(" 42.4 ").unwrap()["brightness"], json!(42));
	}

	#[test]
	fn angle_wraps() {
		let mut editor = state(json!({}));
		assert_eq!(editor.set_angle("400").unwrap()["angle"], json!(40));
		assert_eq!(editor.set_angle("-90").unwrap()["angle"], json!(270));
		assert_eq!(editor.set_angle("360").unwrap()["angle"], json!(0));
		assert_eq!(editor.set_angle("359").unwrap()["angle"], json!(359));
	}

	#[test]
	fn unusable_input_changes_nothing() {
		let mut editor = state(json!({ "brightness": 50 }));
		for input in ["abc", "", "  ", "NaN", "inf"] {
			assert_eq!(editor.set_brightness(input), None);
			assert_eq!(editor.set_angle(input), None);
		}
		assert_eq!(editor.config()["brightness"], json!(50));
	}

	#[test]
	fn edits_keep_other_keys() {
		let mut editor = state(json!({ "type": "custom:wled-ws-card", "sensor": "sensor.wlvp_a", "tap_action": { "action": "toggle" } }));
		let changed = editor.set_flag(Flag::Debug, true);
		assert_eq!(
			Value::Object(changed),
			json!({ "type": "custom:wled-ws-card", "sensor": "sensor.wlvp_a", "tap_action": { "action": "toggle" }, "debug": true })
		);
		let changed = editor.set_sensor("sensor.wlvp_b");
		assert_eq!(changed["sensor"], json!("sensor.wlvp_b"));
		assert_eq!(changed["debug"], json!(true));
	}

	#[test]
	fn field_texts() {
		let editor = state(json!({}));
		assert_eq!(editor.brightness_text(), "100");
		assert_eq!(editor.angle_text(), "90");
		assert_eq!(editor.sensor(), "");
		assert!(!editor.flag(Flag::Info));

		let editor = state(json!({ "brightness": 0, "angle": 0, "info": true }));
		assert_eq!(editor.brightness_text(), "100");
		assert_eq!(editor.angle_text(), "0");
		assert!(editor.flag(Flag::Info));
	}

	#[test]
	fn zero_brightness_agrees_with_the_card() {
		let mut editor = state(json!({ "brightness": 80 }));
		let changed = editor.set_brightness("0").unwrap();
		assert_eq!(editor.brightness_text(), "100");

		let raw = crate::config::WidgetConfig::from_json(Value::Object(changed)).unwrap();
		let card = crate::resolve::resolve(Some(raw), None).unwrap();
		assert_eq!(card.brightness.to_string(), editor.brightness_text());
	}

	#[test]
	fn quoted_flags_show_as_set() {
		let editor = state(json!({ "info": "true", "debug": "no" }));
		assert!(editor.flag(Flag::Info));
		assert!(!editor.flag(Flag::Debug));
	}

	#[test]
	fn only_live_view_sensors_with_entry_ids_are_offered() {
		let states = StateMap::new()
			.with("sensor.wlvp_kitchen", json!({ "entry_id": "abc123" }))
			.with("sensor.wlvp_orphan", json!({}))
			.with("sensor.temperature", json!({ "entry_id": "x" }))
			.with("sensor.wlvp_hall", json!({ "entry_id": 7 }));
		assert_eq!(sensor_options(&states), ["sensor.wlvp_kitchen", "sensor.wlvp_hall"]);
	}
}
