//! The `wled-ws-card` element.
//!
//! [`Card`] ties the pieces together: configuration goes through [`resolve`](`crate::resolve`),
//! the first visibility report activates the [`Transport`], and every frame is painted onto the card surface.

use crate::{
	action::HassActions,
	config::{self, CardConfig, WidgetConfig, DEFAULT_ANGLE},
	dom::DomRenderer,
	error::Error,
	gesture::{Gesture, Outcome, Recognizer, DOUBLE_TAP_MS},
	render::{self, CardView},
	resolve::{apply_host_state, resolve},
	socket::{Endpoint, WebSocketConnector},
	states::{HostStates, JsStates},
	transport::{Connector, Frame, Logging, Phase, Transport},
	update::UpdateQueue,
	visibility::{self, IntersectionWatcher, VisibilityGate},
};
use core::{future::Future, pin::Pin};
use gloo_timers::callback::Timeout;
use js_sys::{Date, Promise};
use lignin::{CallbackRef, CallbackRegistration, EventBinding, EventBindingOptions, ThreadBound};
use serde_json::{json, Value};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, ShadowRoot, ShadowRootInit, ShadowRootMode};

/// Reported to the dashboard's masonry layout.
pub const CARD_SIZE: u32 = 1;

/// Layout hints for section views.
#[must_use]
pub fn grid_options() -> Value {
	json!({ "rows": 1, "columns": 12 })
}

type Handler = CallbackRef<ThreadBound, fn(lignin::web::Event)>;

#[derive(Clone, Copy)]
struct PointerHandlers {
	down: Handler,
	up: Handler,
	cancel: Handler,
	leave: Handler,
}

impl PointerHandlers {
	fn bindings(self) -> [EventBinding<'static, ThreadBound>; 4] {
		let binding = |name, callback| EventBinding {
			name,
			callback,
			options: EventBindingOptions::new(),
		};
		[binding("pointerdown", self.down), binding("pointerup", self.up), binding("pointercancel", self.cancel), binding("pointerleave", self.leave)]
	}
}

struct Registrations<C: Connector + 'static> {
	down: CallbackRegistration<CardInner<C>, fn(lignin::web::Event)>,
	up: CallbackRegistration<CardInner<C>, fn(lignin::web::Event)>,
	cancel: CallbackRegistration<CardInner<C>, fn(lignin::web::Event)>,
	leave: CallbackRegistration<CardInner<C>, fn(lignin::web::Event)>,
}

struct CardInner<C: Connector + 'static> {
	this: Weak<CardInner<C>>,
	host: HtmlElement,
	root: ShadowRoot,
	config: RefCell<Option<CardConfig>>,
	hass: RefCell<JsValue>,
	transport: Transport<C>,
	gate: VisibilityGate<IntersectionWatcher>,
	renderer: RefCell<DomRenderer>,
	rendered: RefCell<Option<CardView>>,
	background: RefCell<Option<String>>,
	queue: UpdateQueue,
	recognizer: RefCell<Recognizer>,
	tap_timer: RefCell<Option<Timeout>>,
	handlers: RefCell<Option<PointerHandlers>>,
}

/// One card instance, driven by its host element's lifecycle.
pub struct Card<C: Connector + 'static> {
	// Dropped first, so that no callback outlives `inner`.
	_registrations: Registrations<C>,
	inner: Rc<CardInner<C>>,
}

impl<C: Connector + 'static> Card<C> {
	/// Attaches an open shadow root to `host` (or reuses its existing one) and renders nothing yet.
	///
	/// # Errors
	///
	/// Iff the shadow root can't be attached.
	pub fn new(host: HtmlElement, connector: C) -> Result<Self, Error> {
		let root = match host.shadow_root() {
			Some(root) => root,
			None => host.attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))?,
		};

		let inner = Rc::new_cyclic(|this: &Weak<CardInner<C>>| CardInner {
			this: this.clone(),
			host,
			renderer: RefCell::new(DomRenderer::new(root.clone().into())),
			root,
			config: RefCell::new(None),
			hass: RefCell::new(JsValue::UNDEFINED),
			transport: Transport::new(connector, String::new(), Logging::default(), {
				let this = this.clone();
				move |frame| {
					if let Some(inner) = this.upgrade() {
						inner.show(&frame);
					}
				}
			}),
			gate: VisibilityGate::new(),
			rendered: RefCell::new(None),
			background: RefCell::new(None),
			queue: UpdateQueue::new({
				let this = this.clone();
				move || {
					if let Some(inner) = this.upgrade() {
						inner.render();
					}
				}
			}),
			recognizer: RefCell::new(Recognizer::new(false)),
			tap_timer: RefCell::new(None),
			handlers: RefCell::new(None),
		});

		let receiver = Pin::new(&*inner);
		let registrations = Registrations {
			down: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_pointer_down::<C>),
			up: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_pointer_up::<C>),
			cancel: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_pointer_cancel::<C>),
			leave: CallbackRegistration::<_, fn(lignin::web::Event)>::new(receiver, on_pointer_cancel::<C>),
		};
		*inner.handlers.borrow_mut() = Some(PointerHandlers {
			down: registrations.down.to_ref_thread_bound(),
			up: registrations.up.to_ref_thread_bound(),
			cancel: registrations.cancel.to_ref_thread_bound(),
			leave: registrations.leave.to_ref_thread_bound(),
		});

		Ok(Self {
			_registrations: registrations,
			inner,
		})
	}

	/// Accepts a new host configuration. The previous one is kept if this fails.
	///
	/// # Errors
	///
	/// [`Error::InvalidConfiguration`] for `undefined` and `null`. Other values are read leniently.
	pub fn set_config(&self, config: &JsValue) -> Result<(), Error> {
		let raw = WidgetConfig::from_js(config)?;
		self.inner.apply_config(raw)
	}

	pub fn set_hass(&self, hass: JsValue) {
		let inner = &self.inner;
		if let Some(states) = JsStates::from_hass(&hass) {
			if let Some(config) = &mut *inner.config.borrow_mut() {
				if apply_host_state(config, &states) {
					if inner.transport.has_socket() {
						debug!(entry_id = %config.entry_id, "Target changed while connected; keeping the current connection.");
					} else if let Ok(endpoint) = Endpoint::current() {
						inner.transport.set_url(endpoint.url(&config.entry_id));
					}
				}
			}
		}
		*inner.hass.borrow_mut() = hass;
	}

	/// The host element was attached to a document.
	pub fn connected(&self) {
		let inner = &self.inner;
		if inner.config.borrow().is_none() {
			debug!("Connected without configuration; using defaults.");
			if let Err(error) = inner.apply_config(Some(WidgetConfig::default())) {
				return error!(%error, "Failed to apply the default configuration.");
			}
		}
		inner.queue.request_update();

		let entry_id = match &*inner.config.borrow() {
			Some(config) => config.entry_id.clone(),
			None => return,
		};
		match Endpoint::current() {
			Ok(endpoint) => inner.transport.set_url(endpoint.url(&entry_id)),
			Err(error) => return error!(%error, "Can't determine the WebSocket endpoint."),
		}

		inner.gate.rearm();
		if !visibility::observer_supported() {
			debug!("`IntersectionObserver` unavailable; connecting right away.");
			return inner.transport.activate();
		}
		let this = inner.this.clone();
		match IntersectionWatcher::observe(&inner.host, move |intersecting| {
			if let Some(inner) = this.upgrade() {
				if inner.gate.notify(intersecting) {
					inner.transport.activate();
				}
			}
		}) {
			Ok(watcher) => inner.gate.watch(watcher),
			Err(error) => {
				warn!(%error, "Failed to observe visibility; connecting right away.");
				inner.transport.activate();
			}
		}
	}

	/// The host element was removed from its document. Every step runs regardless of the others.
	pub fn disconnected(&self) {
		let inner = &self.inner;
		inner.transport.teardown();
		inner.gate.release();
		drop(inner.tap_timer.take());
		inner.recognizer.borrow_mut().cancel();
	}

	/// Connects immediately, as the first visibility report would.
	pub fn activate(&self) {
		self.inner.transport.activate();
	}

	/// Whether a visibility observer is still attached.
	#[must_use]
	pub fn is_watching(&self) -> bool {
		self.inner.gate.is_watching()
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.inner.transport.phase()
	}

	#[must_use]
	pub fn config(&self) -> Option<CardConfig> {
		self.inner.config.borrow().clone()
	}

	#[must_use]
	pub fn shadow_root(&self) -> &ShadowRoot {
		&self.inner.root
	}

	/// The last background that was painted.
	#[must_use]
	pub fn background(&self) -> Option<String> {
		self.inner.background.borrow().clone()
	}

	/// Resolves once a pending render, if any, has happened.
	pub fn update_complete(&self) -> impl Future<Output = ()> {
		self.inner.queue.update_complete()
	}
}

impl<C: Connector + 'static> CardInner<C> {
	fn apply_config(&self, raw: Option<WidgetConfig>) -> Result<(), Error> {
		let states = JsStates::from_hass(&self.hass.borrow());
		let resolved = resolve(raw, states.as_ref().map(|states| states as &dyn HostStates))?;

		if self.transport.has_socket() {
			debug!(entry_id = %resolved.entry_id, "Configured while connected; keeping the current connection.");
		} else {
			match Endpoint::current() {
				Ok(endpoint) => self.transport.set_url(endpoint.url(&resolved.entry_id)),
				Err(error) => warn!(%error, "Can't determine the WebSocket endpoint."),
			}
		}
		self.recognizer.borrow_mut().set_double_tap(resolved.double_tap_action.is_some());
		self.transport.set_logging(Logging {
			diagnostics: resolved.diagnostics,
			verbose: resolved.verbose,
		});
		*self.config.borrow_mut() = Some(resolved);
		self.queue.request_update();
		Ok(())
	}

	fn render(&self) {
		let next = match &*self.config.borrow() {
			Some(config) => CardView { brightness: config.brightness },
			None => return,
		};
		let previous = self.rendered.replace(Some(next));
		if previous == Some(next) {
			return;
		}

		let handlers = *self.handlers.borrow();
		let bindings = handlers.map(PointerHandlers::bindings);
		let bindings = bindings.as_ref().map_or(&[][..], |bindings| &bindings[..]);
		let mut renderer = self.renderer.borrow_mut();
		next.with_vdom(bindings, |next| match previous {
			Some(previous) => previous.with_vdom(bindings, |previous| renderer.update(previous, next)),
			None => renderer.update(&[], next),
		});
		drop(renderer);

		if previous.is_none() {
			if let Some(background) = &*self.background.borrow() {
				self.paint(background);
			}
		}
	}

	fn show(&self, frame: &Frame) {
		let angle = self.config.borrow().as_ref().map_or(DEFAULT_ANGLE, |config| config.angle);
		match render::frame_background(frame, angle) {
			Some(background) => {
				self.paint(&background);
				*self.background.borrow_mut() = Some(background);
			}
			None => debug!(?frame, "Frame carries no colours."),
		}
	}

	fn paint(&self, background: &str) {
		match render::paint(&self.root, background) {
			Ok(true) => (),
			Ok(false) => debug!("Surface not rendered yet; painting later."),
			Err(error) => error!(%error, "Failed to paint."),
		}
	}

	fn perform(&self, gesture: Gesture) {
		let (action, reference) = match &*self.config.borrow() {
			Some(config) => {
				let action = match gesture {
					Gesture::Tap => config.tap_action.clone(),
					Gesture::Hold => config.hold_action.clone(),
					Gesture::DoubleTap => config.double_tap_action.clone().unwrap_or_default(),
				};
				if config.diagnostics {
					info!(?gesture, ?action, "wled-ws-card: action");
				}
				(action, config.reference().map(str::to_owned))
			}
			None => return,
		};
		let hass = self.hass.borrow().clone();
		action.execute(&HassActions { element: &self.host, hass: &hass }, reference.as_deref());
	}

	fn schedule_tap(&self) {
		let this = self.this.clone();
		// A little slack, since timers and `Date.now()` are only precise to the millisecond.
		let timer = Timeout::new(DOUBLE_TAP_MILLIS + 10, move || {
			if let Some(inner) = this.upgrade() {
				let gesture = inner.recognizer.borrow_mut().expire(Date::now());
				if let Some(gesture) = gesture {
					inner.perform(gesture);
				}
			}
		});
		// The replaced timer has either fired already or belongs to a tap that was since resolved.
		drop(self.tap_timer.replace(Some(timer)));
	}
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const DOUBLE_TAP_MILLIS: u32 = DOUBLE_TAP_MS as u32;

fn with_inner<C: Connector + 'static>(inner: *const CardInner<C>, f: impl FnOnce(&CardInner<C>)) {
	//SAFETY: Registrations are dropped before the `CardInner` they point to, after which they are never called.
	match unsafe { inner.as_ref() } {
		Some(inner) => f(inner),
		None => error!("Pointer event for a null card."),
	}
}

fn on_pointer_down<C: Connector + 'static>(inner: *const CardInner<C>, _: lignin::web::Event) {
	with_inner(inner, |inner| inner.recognizer.borrow_mut().press(Date::now()));
}

fn on_pointer_up<C: Connector + 'static>(inner: *const CardInner<C>, _: lignin::web::Event) {
	with_inner(inner, |inner| {
		let released = inner.recognizer.borrow_mut().release(Date::now());
		if let Some(overdue) = released.overdue {
			inner.perform(overdue);
		}
		match released.outcome {
			Outcome::Recognized(gesture) => {
				drop(inner.tap_timer.take());
				inner.perform(gesture);
			}
			Outcome::Pending => inner.schedule_tap(),
			Outcome::Nothing => (),
		}
	});
}

fn on_pointer_cancel<C: Connector + 'static>(inner: *const CardInner<C>, _: lignin::web::Event) {
	with_inner(inner, |inner| inner.recognizer.borrow_mut().cancel());
}

/// The object behind each `<wled-ws-card>` element.
#[wasm_bindgen]
pub struct WledWsCard(Card<WebSocketConnector>);

impl WledWsCard {
	/// # Errors
	///
	/// Iff the shadow root can't be attached.
	pub fn new(host: HtmlElement) -> Result<Self, Error> {
		Card::new(host, WebSocketConnector).map(Self)
	}
}

#[wasm_bindgen]
impl WledWsCard {
	/// # Errors
	///
	/// See [`Card::set_config`].
	pub fn set_config(&self, config: JsValue) -> Result<(), JsValue> {
		self.0.set_config(&config).map_err(Into::into)
	}

	pub fn set_hass(&self, hass: JsValue) {
		self.0.set_hass(hass);
	}

	pub fn connected(&self) {
		self.0.connected();
	}

	pub fn disconnected(&self) {
		self.0.disconnected();
	}

	#[must_use]
	pub fn card_size(&self) -> u32 {
		CARD_SIZE
	}

	/// # Errors
	///
	/// Iff the options can't be converted, which shouldn't happen.
	pub fn grid_options(&self) -> Result<JsValue, JsValue> {
		config::to_js(&grid_options()).map_err(Into::into)
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
