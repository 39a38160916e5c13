//! The live-feed connection: one socket, one keep-alive timer, no automatic reconnection.
//!
//! [`Transport`] goes `Idle → Connecting → Open → Closed`. A remote close or a transport error leaves it
//! `Closed` with its socket handle still held, so further [`activate`](`Transport::activate`) calls are no-ops
//! until [`teardown`](`Transport::teardown`) releases everything.

use crate::error::Error;
use core::cell::Cell;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{debug, info, trace, warn};

/// Sent every [`KEEP_ALIVE_MS`] while the socket is open.
pub const HEARTBEAT: &str = "heartbeat";
pub const KEEP_ALIVE_MS: u32 = 30_000;

/// A message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	Text(String),
	Binary(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Idle,
	Connecting,
	Open,
	Closed,
}

/// Which optional log output is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Logging {
	/// Connection lifecycle and heartbeats.
	pub diagnostics: bool,
	/// Every received frame.
	pub verbose: bool,
}

pub trait Socket {
	fn is_open(&self) -> bool;
	/// # Errors
	///
	/// Iff the underlying transport rejects the message.
	fn send_text(&self, text: &str) -> Result<(), Error>;
	/// # Errors
	///
	/// Iff the underlying transport fails to start closing.
	fn close(&self) -> Result<(), Error>;
}

/// Opens sockets and runs timers for a [`Transport`].
pub trait Connector {
	type Socket: Socket;
	/// Dropping this stops the timer.
	type KeepAlive;

	/// Starts connecting to `url`. The socket reports back through `events`.
	///
	/// # Errors
	///
	/// Iff no connection attempt could be started at all, e.g. because `url` is malformed.
	fn connect(&self, url: &str, events: Events) -> Result<Self::Socket, Error>;

	fn keep_alive(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Self::KeepAlive;
}

trait EventSink {
	fn opened(&self, generation: u64);
	fn received(&self, generation: u64, frame: Frame);
	fn closed(&self, generation: u64, code: u16, reason: &str);
	fn failed(&self, generation: u64, description: &str);
}

/// Handed to [`Connector::connect`] so that the socket can report what happens to it.
///
/// Events from a socket that has since been torn down are ignored.
#[derive(Clone)]
pub struct Events {
	sink: Weak<dyn EventSink>,
	generation: u64,
}

impl Events {
	pub fn opened(&self) {
		if let Some(sink) = self.sink.upgrade() {
			sink.opened(self.generation);
		}
	}

	pub fn received(&self, frame: Frame) {
		if let Some(sink) = self.sink.upgrade() {
			sink.received(self.generation, frame);
		}
	}

	pub fn closed(&self, code: u16, reason: &str) {
		if let Some(sink) = self.sink.upgrade() {
			sink.closed(self.generation, code, reason);
		}
	}

	pub fn failed(&self, description: &str) {
		if let Some(sink) = self.sink.upgrade() {
			sink.failed(self.generation, description);
		}
	}
}

struct State<C: Connector> {
	url: String,
	phase: Phase,
	generation: u64,
	socket: Option<C::Socket>,
	keep_alive: Option<C::KeepAlive>,
}

struct Shared<C: Connector> {
	connector: C,
	logging: Cell<Logging>,
	on_frame: Box<dyn Fn(Frame)>,
	state: RefCell<State<C>>,
}

pub struct Transport<C: Connector> {
	shared: Rc<Shared<C>>,
}

impl<C: Connector + 'static> Transport<C> {
	/// Creates an idle transport. `on_frame` receives every message in arrival order.
	pub fn new(connector: C, url: String, logging: Logging, on_frame: impl Fn(Frame) + 'static) -> Self {
		Self {
			shared: Rc::new(Shared {
				connector,
				logging: Cell::new(logging),
				on_frame: Box::new(on_frame),
				state: RefCell::new(State {
					url,
					phase: Phase::Idle,
					generation: 0,
					socket: None,
					keep_alive: None,
				}),
			}),
		}
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.shared.state.borrow().phase
	}

	#[must_use]
	pub fn url(&self) -> String {
		self.shared.state.borrow().url.clone()
	}

	/// Takes effect on the next connection.
	pub fn set_url(&self, url: String) {
		self.shared.state.borrow_mut().url = url;
	}

	pub fn set_logging(&self, logging: Logging) {
		self.shared.logging.set(logging);
	}

	#[must_use]
	pub fn has_socket(&self) -> bool {
		self.shared.state.borrow().socket.is_some()
	}

	#[must_use]
	pub fn has_keep_alive(&self) -> bool {
		self.shared.state.borrow().keep_alive.is_some()
	}

	/// Connects unless a socket handle is already held, and makes sure the keep-alive timer runs.
	pub fn activate(&self) {
		let shared = &self.shared;
		let (url, generation) = {
			let mut state = shared.state.borrow_mut();
			if state.socket.is_some() {
				trace!("Already connected or connecting.");
				return;
			}
			state.generation += 1;
			(state.url.clone(), state.generation)
		};

		if shared.logging.get().diagnostics {
			info!(%url, "wled-ws-card: Connecting to WebSocket");
		}
		let sink: Weak<Shared<C>> = Rc::downgrade(shared);
		let socket = shared.connector.connect(&url, Events { sink, generation });

		let mut state = shared.state.borrow_mut();
		match socket {
			Ok(socket) => {
				state.socket = Some(socket);
				state.phase = Phase::Connecting;
			}
			Err(error) => {
				if shared.logging.get().diagnostics {
					warn!(%error, "wled-ws-card: WebSocket could not be created");
				}
				state.phase = Phase::Closed;
				return;
			}
		}

		if state.keep_alive.is_none() {
			let weak = Rc::downgrade(shared);
			state.keep_alive = Some(shared.connector.keep_alive(
				KEEP_ALIVE_MS,
				Box::new(move || {
					if let Some(shared) = weak.upgrade() {
						shared.tick();
					}
				}),
			));
		}
	}

	/// Stops the keep-alive timer and closes the socket. Safe to call repeatedly or before [`activate`](`Transport::activate`).
	pub fn teardown(&self) {
		let (keep_alive, socket) = {
			let mut state = self.shared.state.borrow_mut();
			state.generation += 1;
			if state.socket.is_some() {
				state.phase = Phase::Closed;
			}
			(state.keep_alive.take(), state.socket.take())
		};

		drop(keep_alive);
		if let Some(socket) = socket {
			if let Err(error) = socket.close() {
				warn!(%error, "Failed to close WebSocket.");
			}
		}
	}
}

impl<C: Connector> Shared<C> {
	fn tick(&self) {
		let state = self.state.borrow();
		match &state.socket {
			Some(socket) if socket.is_open() => match socket.send_text(HEARTBEAT) {
				Ok(()) => {
					if self.logging.get().diagnostics {
						info!("wled-ws-card: Sent heartbeat");
					}
				}
				Err(error) => warn!(%error, "Failed to send heartbeat."),
			},
			_ => trace!("Skipping heartbeat: socket not open."),
		}
	}

	fn current(&self, generation: u64) -> bool {
		let current = self.state.borrow().generation == generation;
		if !current {
			trace!(generation, "Ignoring event from a torn-down socket.");
		}
		current
	}
}

impl<C: Connector> EventSink for Shared<C> {
	fn opened(&self, generation: u64) {
		if self.current(generation) {
			self.state.borrow_mut().phase = Phase::Open;
			if self.logging.get().diagnostics {
				info!("wled-ws-card: WebSocket connected");
			}
		}
	}

	fn received(&self, generation: u64, frame: Frame) {
		if !self.current(generation) {
			return;
		}
		if self.logging.get().verbose {
			debug!(?frame, "wled-ws-card: Received data");
		}
		(self.on_frame)(frame);
	}

	fn closed(&self, generation: u64, code: u16, reason: &str) {
		if self.current(generation) {
			self.state.borrow_mut().phase = Phase::Closed;
			if self.logging.get().diagnostics {
				info!(code, reason, "wled-ws-card: WebSocket disconnected");
			}
		}
	}

	fn failed(&self, generation: u64, description: &str) {
		if self.current(generation) && self.logging.get().diagnostics {
			warn!(description, "wled-ws-card: WebSocket error");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Default)]
	struct FakeSocket {
		open: Cell<bool>,
		closed: Cell<bool>,
		sent: RefCell<Vec<String>>,
	}

	impl Socket for Rc<FakeSocket> {
		fn is_open(&self) -> bool {
			self.open.get() && !self.closed.get()
		}
		fn send_text(&self, text: &str) -> Result<(), Error> {
			assert!(self.is_open(), "sent on a socket that isn't open");
			self.sent.borrow_mut().push(text.to_owned());
			Ok(())
		}
		fn close(&self) -> Result<(), Error> {
			self.closed.set(true);
			Ok(())
		}
	}

	struct FakeKeepAlive(Rc<Cell<usize>>);
	impl Drop for FakeKeepAlive {
		fn drop(&mut self) {
			self.0.set(self.0.get() - 1);
		}
	}

	#[derive(Default)]
	struct Fake {
		fail: Cell<bool>,
		sockets: RefCell<Vec<(Rc<FakeSocket>, Events, String)>>,
		ticks: RefCell<Vec<Box<dyn FnMut()>>>,
		running_timers: Rc<Cell<usize>>,
	}

	impl Connector for Rc<Fake> {
		type Socket = Rc<FakeSocket>;
		type KeepAlive = FakeKeepAlive;

		fn connect(&self, url: &str, events: Events) -> Result<Self::Socket, Error> {
			if self.fail.get() {
				return Err(Error::Js("SyntaxError".to_owned()));
			}
			let socket = Rc::new(FakeSocket::default());
			self.sockets.borrow_mut().push((Rc::clone(&socket), events, url.to_owned()));
			Ok(socket)
		}

		fn keep_alive(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Self::KeepAlive {
			assert_eq!(period_ms, 30_000);
			self.ticks.borrow_mut().push(tick);
			self.running_timers.set(self.running_timers.get() + 1);
			FakeKeepAlive(Rc::clone(&self.running_timers))
		}
	}

	impl Fake {
		fn tick(&self) {
			for tick in self.ticks.borrow_mut().iter_mut() {
				tick();
			}
		}

		fn socket(&self, index: usize) -> (Rc<FakeSocket>, Events) {
			let sockets = self.sockets.borrow();
			(Rc::clone(&sockets[index].0), sockets[index].1.clone())
		}
	}

	fn transport(logging: Logging) -> (Rc<Fake>, Transport<Rc<Fake>>, Rc<RefCell<Vec<Frame>>>) {
		let fake = Rc::new(Fake::default());
		let frames = Rc::new(RefCell::new(Vec::new()));
		let transport = Transport::new(Rc::clone(&fake), "ws://ha.local/api/wled_ws/abc123".to_owned(), logging, {
			let frames = Rc::clone(&frames);
			move |frame| frames.borrow_mut().push(frame)
		});
		(fake, transport, frames)
	}

	#[test]
	fn activation_is_single() {
		let (fake, transport, _) = transport(Logging::default());
		assert_eq!(transport.phase(), Phase::Idle);

		transport.activate();
		transport.activate();
		assert_eq!(fake.sockets.borrow().len(), 1);
		assert_eq!(fake.sockets.borrow()[0].2, "ws://ha.local/api/wled_ws/abc123");
		assert_eq!(fake.running_timers.get(), 1);
		assert_eq!(transport.phase(), Phase::Connecting);
	}

	#[test]
	fn heartbeat_only_while_open() {
		let (fake, transport, _) = transport(Logging { diagnostics: true, verbose: false });
		transport.activate();
		let (socket, events) = fake.socket(0);

		fake.tick();
		assert!(socket.sent.borrow().is_empty());

		socket.open.set(true);
		events.opened();
		assert_eq!(transport.phase(), Phase::Open);
		fake.tick();
		fake.tick();
		assert_eq!(*socket.sent.borrow(), [HEARTBEAT, HEARTBEAT]);

		socket.open.set(false);
		events.closed(1006, "");
		fake.tick();
		assert_eq!(socket.sent.borrow().len(), 2);
	}

	#[test]
	fn frames_arrive_in_order() {
		let (fake, transport, frames) = transport(Logging { diagnostics: false, verbose: true });
		transport.activate();
		let (socket, events) = fake.socket(0);
		socket.open.set(true);
		events.opened();

		events.received(Frame::Text("red, blue".to_owned()));
		events.received(Frame::Binary(vec![76, 1, 0, 0, 0]));
		assert_eq!(*frames.borrow(), [Frame::Text("red, blue".to_owned()), Frame::Binary(vec![76, 1, 0, 0, 0])]);
	}

	#[test]
	fn remote_close_is_not_retried() {
		let (fake, transport, _) = transport(Logging::default());
		transport.activate();
		let (_, events) = fake.socket(0);
		events.failed("error");
		events.closed(1006, "");
		assert_eq!(transport.phase(), Phase::Closed);

		transport.activate();
		assert_eq!(fake.sockets.borrow().len(), 1);
		assert_eq!(fake.running_timers.get(), 1);
	}

	#[test]
	fn teardown_is_idempotent() {
		let (fake, transport, _) = transport(Logging::default());
		transport.teardown();
		assert_eq!(transport.phase(), Phase::Idle);

		transport.activate();
		let (socket, _) = fake.socket(0);
		transport.teardown();
		transport.teardown();

		assert!(socket.closed.get());
		assert_eq!(fake.running_timers.get(), 0);
		assert!(!transport.has_socket());
		assert!(!transport.has_keep_alive());
		assert_eq!(transport.phase(), Phase::Closed);
	}

	#[test]
	fn teardown_before_first_tick() {
		let (fake, transport, frames) = transport(Logging::default());
		transport.activate();
		let (socket, events) = fake.socket(0);
		socket.open.set(true);
		events.opened();

		transport.teardown();
		fake.tick();
		events.received(Frame::Text("late".to_owned()));
		events.opened();

		assert!(socket.sent.borrow().is_empty());
		assert!(frames.borrow().is_empty());
		assert_eq!(transport.phase(), Phase::Closed);
	}

	#[test]
	fn reactivation_after_teardown() {
		let (fake, transport, _) = transport(Logging::default());
		transport.activate();
		transport.teardown();
		transport.set_url("ws://ha.local/api/wled_ws/other".to_owned());
		transport.activate();

		assert_eq!(fake.sockets.borrow().len(), 2);
		assert_eq!(fake.sockets.borrow()[1].2, "ws://ha.local/api/wled_ws/other");
		assert_eq!(fake.running_timers.get(), 1);

		let (_, stale) = fake.socket(0);
		stale.closed(1000, "");
		assert_eq!(transport.phase(), Phase::Connecting);
	}

	#[test]
	fn failed_connect_starts_no_timer() {
		let (fake, transport, _) = transport(Logging { diagnostics: true, verbose: true });
		fake.fail.set(true);
		transport.activate();

		assert_eq!(transport.phase(), Phase::Closed);
		assert!(!transport.has_socket());
		assert_eq!(fake.running_timers.get(), 0);
	}
}
