//! Deferred activation: the card connects only once it has been at least partially on screen.

use crate::error::Error;
use core::cell::Cell;
use js_sys::{Array, Reflect};
use std::cell::RefCell;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

/// Fraction of the card that must be visible.
pub const THRESHOLD: f64 = 0.1;

pub trait Watcher {
	/// Stops reporting. May be called more than once.
	fn disconnect(&self);
}

/// Lets exactly one "now visible" report through.
///
/// The watcher is disconnected as soon as that happens, but only dropped by [`release`](`VisibilityGate::release`),
/// since the report usually arrives from within the watcher's own callback.
#[derive(Debug)]
pub struct VisibilityGate<W: Watcher> {
	fired: Cell<bool>,
	watcher: RefCell<Option<W>>,
}

impl<W: Watcher> Default for VisibilityGate<W> {
	fn default() -> Self {
		Self {
			fired: Cell::new(false),
			watcher: RefCell::new(None),
		}
	}
}

impl<W: Watcher> VisibilityGate<W> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `watcher`, releasing any previous one.
	pub fn watch(&self, watcher: W) {
		if let Some(previous) = self.watcher.replace(Some(watcher)) {
			previous.disconnect();
		}
	}

	/// Returns `true` for the first intersecting report only.
	pub fn notify(&self, intersecting: bool) -> bool {
		if !intersecting || self.fired.replace(true) {
			return false;
		}
		if let Some(watcher) = &*self.watcher.borrow() {
			watcher.disconnect();
		}
		true
	}

	/// Disconnects and drops the watcher, if any. Must not be called from within the watcher's callback.
	pub fn release(&self) {
		if let Some(watcher) = self.watcher.take() {
			watcher.disconnect();
		}
	}

	/// Allows another activation, for a card that is mounted again.
	pub fn rearm(&self) {
		self.release();
		self.fired.set(false);
	}

	#[must_use]
	pub fn has_fired(&self) -> bool {
		self.fired.get()
	}

	#[must_use]
	pub fn is_watching(&self) -> bool {
		self.watcher.borrow().is_some()
	}
}

/// Whether the page offers `IntersectionObserver`.
#[must_use]
pub fn observer_supported() -> bool {
	web_sys::window().map_or(false, |window| Reflect::has(&window, &"IntersectionObserver".into()).unwrap_or(false))
}

/// An `IntersectionObserver` on one element.
pub struct IntersectionWatcher {
	observer: IntersectionObserver,
	_callback: Closure<dyn FnMut(Array, JsValue)>,
}

impl IntersectionWatcher {
	/// Starts observing `target`. `on_report` is called with whether any reported entry intersects.
	///
	/// # Errors
	///
	/// Iff the observer can't be created.
	pub fn observe(target: &web_sys::Element, on_report: impl Fn(bool) + 'static) -> Result<Self, Error> {
		let callback = Closure::wrap(Box::new(move |entries: Array, _: JsValue| {
			let intersecting = entries
				.iter()
				.filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
				.any(|entry| entry.is_intersecting());
			on_report(intersecting);
		}) as Box<dyn FnMut(Array, JsValue)>);

		let options = IntersectionObserverInit::new();
		options.set_threshold(&JsValue::from_f64(THRESHOLD));
		let observer = IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)?;
		observer.observe(target);

		Ok(Self { observer, _callback: callback })
	}
}

impl Watcher for IntersectionWatcher {
	fn disconnect(&self) {
		self.observer.disconnect();
	}
}
