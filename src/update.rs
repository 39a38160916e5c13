//! Coalesced re-rendering.
//!
//! Any number of [`request_update`](`UpdateQueue::request_update`) calls within one task result in a single render
//! on the following microtask.

use core::{cell::Cell, future::Future};
use futures::channel::oneshot;
use js_sys::Promise;
use std::{cell::RefCell, rc::Rc};
use tracing::trace;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

pub struct UpdateQueue {
	inner: Rc<Inner>,
}

struct Inner {
	pending: Cell<bool>,
	waiters: RefCell<Vec<oneshot::Sender<()>>>,
	render: Box<dyn Fn()>,
}

impl Inner {
	fn flush(&self) {
		self.pending.set(false);
		trace!("Rendering queued update.");
		(self.render)();
		for waiter in self.waiters.take() {
			waiter.send(()).ok();
		}
	}
}

impl UpdateQueue {
	pub fn new(render: impl Fn() + 'static) -> Self {
		Self {
			inner: Rc::new(Inner {
				pending: Cell::new(false),
				waiters: RefCell::default(),
				render: Box::new(render),
			}),
		}
	}

	/// Schedules a render unless one is already pending. Returns whether this call scheduled it.
	pub fn request_update(&self) -> bool {
		if self.inner.pending.replace(true) {
			return false;
		}
		let inner = Rc::clone(&self.inner);
		wasm_bindgen_futures::spawn_local(async move {
			JsFuture::from(Promise::resolve(&JsValue::UNDEFINED)).await.ok();
			inner.flush();
		});
		true
	}

	#[must_use]
	pub fn is_pending(&self) -> bool {
		self.inner.pending.get()
	}

	/// Resolves once the pending render, if any, has run.
	pub fn update_complete(&self) -> impl Future<Output = ()> {
		let waiter = if self.inner.pending.get() {
			let (sender, receiver) = oneshot::channel();
			self.inner.waiters.borrow_mut().push(sender);
			Some(receiver)
		} else {
			None
		};
		async move {
			if let Some(waiter) = waiter {
				waiter.await.ok();
			}
		}
	}
}
