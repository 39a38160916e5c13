//! Browser [`WebSocket`] and timer backing for [`Transport`](`crate::transport::Transport`).

use crate::{
	config::SERVICE_PATH,
	error::Error,
	transport::{Connector, Events, Frame, Socket},
};
use gloo_timers::callback::Interval;
use js_sys::{ArrayBuffer, Uint8Array};
use tracing::debug;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{BinaryType, CloseEvent, Location, MessageEvent, WebSocket};

/// Where the integration's WebSocket view lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	pub secure: bool,
	/// `host[:port]`
	pub host: String,
}

impl Endpoint {
	/// The endpoint on the origin the page was served from; `wss` for `https:` pages.
	///
	/// # Errors
	///
	/// Iff there's no `window` or its `location` can't be read.
	pub fn current() -> Result<Self, Error> {
		let window = web_sys::window().ok_or_else(|| Error::Js("no `window`".to_owned()))?;
		Self::from_location(&window.location())
	}

	/// # Errors
	///
	/// Iff `location` can't be read.
	pub fn from_location(location: &Location) -> Result<Self, Error> {
		Ok(Self {
			secure: location.protocol()? == "https:",
			host: location.host()?,
		})
	}

	/// `ws(s)://<host>/api/wled_ws/<target>`, with `target` percent-encoded as one path segment.
	#[must_use]
	pub fn url(&self, target: &str) -> String {
		let scheme = if self.secure { "wss" } else { "ws" };
		let target: String = js_sys::encode_uri_component(target).into();
		format!("{}://{}/api/{}/{}", scheme, self.host, SERVICE_PATH, target)
	}
}

/// Opens browser WebSockets and runs keep-alive intervals on the page's event loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

/// A browser WebSocket with its event handlers. Dropping it detaches the handlers.
pub struct BrowserSocket {
	socket: WebSocket,
	_on_open: Closure<dyn FnMut(web_sys::Event)>,
	_on_message: Closure<dyn FnMut(MessageEvent)>,
	_on_close: Closure<dyn FnMut(CloseEvent)>,
	_on_error: Closure<dyn FnMut(web_sys::Event)>,
}

impl Socket for BrowserSocket {
	fn is_open(&self) -> bool {
		self.socket.ready_state() == WebSocket::OPEN
	}

	fn send_text(&self, text: &str) -> Result<(), Error> {
		Ok(self.socket.send_with_str(text)?)
	}

	fn close(&self) -> Result<(), Error> {
		Ok(self.socket.close()?)
	}
}

impl Drop for BrowserSocket {
	fn drop(&mut self) {
		self.socket.set_onopen(None);
		self.socket.set_onmessage(None);
		self.socket.set_onclose(None);
		self.socket.set_onerror(None);
	}
}

impl Connector for WebSocketConnector {
	type Socket = BrowserSocket;
	type KeepAlive = Interval;

	fn connect(&self, url: &str, events: Events) -> Result<Self::Socket, Error> {
		let socket = WebSocket::new(url)?;
		socket.set_binary_type(BinaryType::Arraybuffer);

		let on_open = {
			let events = events.clone();
			Closure::wrap(Box::new(move |_: web_sys::Event| events.opened()) as Box<dyn FnMut(web_sys::Event)>)
		};
		let on_message = {
			let events = events.clone();
			Closure::wrap(Box::new(move |event: MessageEvent| {
				let data = event.data();
				if let Some(text) = data.as_string() {
					events.received(Frame::Text(text));
				} else if let Some(buffer) = data.dyn_ref::<ArrayBuffer>() {
					events.received(Frame::Binary(Uint8Array::new(buffer).to_vec()));
				} else {
					debug!(?data, "Ignoring message of unexpected type.");
				}
			}) as Box<dyn FnMut(MessageEvent)>)
		};
		let on_close = {
			let events = events.clone();
			Closure::wrap(Box::new(move |event: CloseEvent| events.closed(event.code(), &event.reason())) as Box<dyn FnMut(CloseEvent)>)
		};
		let on_error = Closure::wrap(Box::new(move |event: web_sys::Event| events.failed(&event.type_())) as Box<dyn FnMut(web_sys::Event)>);

		socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
		socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
		socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
		socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

		Ok(BrowserSocket {
			socket,
			_on_open: on_open,
			_on_message: on_message,
			_on_close: on_close,
			_on_error: on_error,
		})
	}

	fn keep_alive(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Self::KeepAlive {
		Interval::new(period_ms, tick)
	}
}
