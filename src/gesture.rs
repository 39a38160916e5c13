//! Tap, hold and double-tap recognition from pointer presses and releases.
//!
//! Time is passed in explicitly (milliseconds, any epoch) so the recogniser is a plain state machine.

/// Presses at least this long are holds.
pub const HOLD_MS: f64 = 500.0;
/// Two taps released within this window form a double tap.
pub const DOUBLE_TAP_MS: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
	Tap,
	Hold,
	DoubleTap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Recognized(Gesture),
	/// A tap that may still become a double tap. Call [`Recognizer::expire`] once [`DOUBLE_TAP_MS`] have passed.
	Pending,
	Nothing,
}

#[derive(Debug, Default)]
pub struct Recognizer {
	double_tap: bool,
	pressed_at: Option<f64>,
	pending_tap_at: Option<f64>,
}

impl Recognizer {
	/// With `double_tap` off, taps are reported on release without waiting.
	#[must_use]
	pub fn new(double_tap: bool) -> Self {
		Self {
			double_tap,
			..Self::default()
		}
	}

	pub fn set_double_tap(&mut self, double_tap: bool) {
		self.double_tap = double_tap;
		if !double_tap {
			self.pending_tap_at = None;
		}
	}

	pub fn press(&mut self, now: f64) {
		self.pressed_at = Some(now);
	}

	/// The pointer left or was cancelled.
	pub fn cancel(&mut self) {
		self.pressed_at = None;
	}

	/// A pending tap whose window ran out before this release is reported as [`Released::overdue`],
	/// so that it isn't lost when its timer is late.
	pub fn release(&mut self, now: f64) -> Released {
		let pressed_at = match self.pressed_at.take() {
			Some(pressed_at) => pressed_at,
			None => return Released::new(None, Outcome::Nothing),
		};
		let overdue = self.expire_at(now, |elapsed| elapsed > DOUBLE_TAP_MS);

		let outcome = if now - pressed_at >= HOLD_MS {
			self.pending_tap_at = None;
			Outcome::Recognized(Gesture::Hold)
		} else if !self.double_tap {
			Outcome::Recognized(Gesture::Tap)
		} else if self.pending_tap_at.take().is_some() {
			Outcome::Recognized(Gesture::DoubleTap)
		} else {
			self.pending_tap_at = Some(now);
			Outcome::Pending
		};
		Released::new(overdue, outcome)
	}

	/// Resolves a [pending](`Outcome::Pending`) tap whose double-tap window has run out.
	pub fn expire(&mut self, now: f64) -> Option<Gesture> {
		self.expire_at(now, |elapsed| elapsed >= DOUBLE_TAP_MS)
	}

	fn expire_at(&mut self, now: f64, expired: impl FnOnce(f64) -> bool) -> Option<Gesture> {
		match self.pending_tap_at {
			Some(tapped_at) if expired(now - tapped_at) => {
				self.pending_tap_at = None;
				Some(Gesture::Tap)
			}
			_ => None,
		}
	}
}

/// What a [release](`Recognizer::release`) produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
	/// An earlier tap to perform first.
	pub overdue: Option<Gesture>,
	pub outcome: Outcome,
}

impl Released {
	fn new(overdue: Option<Gesture>, outcome: Outcome) -> Self {
		Self { overdue, outcome }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn plain_tap() {
		let mut recognizer = Recognizer::new(false);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(80.0).outcome, Outcome::Recognized(Gesture::Tap));
		assert_eq!(recognizer.release(90.0).outcome, Outcome::Nothing);
	}

	#[test]
	fn hold() {
		let mut recognizer = Recognizer::new(true);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(600.0).outcome, Outcome::Recognized(Gesture::Hold));
		assert_eq!(recognizer.expire(10_000.0), None);
	}

	#[test]
	fn double_tap() {
		let mut recognizer = Recognizer::new(true);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(50.0).outcome, Outcome::Pending);
		recognizer.press(150.0);
		assert_eq!(recognizer.release(200.0).outcome, Outcome::Recognized(Gesture::DoubleTap));
		assert_eq!(recognizer.expire(1_000.0), None);
	}

	#[test]
	fn slow_second_tap_is_two_taps() {
		let mut recognizer = Recognizer::new(true);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(50.0).outcome, Outcome::Pending);
		assert_eq!(recognizer.expire(200.0), None);
		assert_eq!(recognizer.expire(300.0), Some(Gesture::Tap));

		recognizer.press(400.0);
		assert_eq!(recognizer.release(450.0).outcome, Outcome::Pending);
		assert_eq!(recognizer.expire(700.0), Some(Gesture::Tap));
	}

	#[test]
	fn late_second_tap_reports_the_first() {
		let mut recognizer = Recognizer::new(true);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(50.0).outcome, Outcome::Pending);
		recognizer.press(280.0);
		assert_eq!(recognizer.release(305.0), Released::new(Some(Gesture::Tap), Outcome::Pending));
		assert_eq!(recognizer.expire(600.0), Some(Gesture::Tap));
		assert_eq!(recognizer.expire(900.0), None);
	}

	#[test]
	fn hold_after_a_tap_reports_the_tap() {
		let mut recognizer = Recognizer::new(true);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(50.0).outcome, Outcome::Pending);
		recognizer.press(100.0);
		assert_eq!(recognizer.release(700.0), Released::new(Some(Gesture::Tap), Outcome::Recognized(Gesture::Hold)));
		assert_eq!(recognizer.expire(2_000.0), None);
	}

	#[test]
	fn second_tap_at_the_window_edge_is_a_double_tap() {
		let mut recognizer = Recognizer::new(true);
		recognizer.press(0.0);
		assert_eq!(recognizer.release(50.0).outcome, Outcome::Pending);
		recognizer.press(250.0);
		assert_eq!(recognizer.release(300.0), Released::new(None, Outcome::Recognized(Gesture::DoubleTap)));
	}

	#[test]
	fn cancelled_press() {
		let mut recognizer = Recognizer::new(false);
		recognizer.press(0.0);
		recognizer.cancel();
		assert_eq!(recognizer.release(50.0).outcome, Outcome::Nothing);
	}
}
