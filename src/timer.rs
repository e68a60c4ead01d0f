//! [`RetryTimer`]: a monotonic-time-driven exponential-backoff timer.
//!
//! Wall-clock time is an external collaborator's capability (the platform
//! that embeds this crate owns the actual clock hardware), so this module
//! only defines the narrow [`Clock`] capability and the timer state machine
//! that is driven off it. `ARP`, `TFTP` and IPv4 fragment reassembly each
//! own one of these.

use spin::Once;

/// Milliseconds since an arbitrary epoch fixed at platform boot. Only
/// differences between two `Instant`s are meaningful.
pub type Instant = u64;

/// A capability for reading the monotonic clock. Implemented by the
/// embedding platform; this crate never reads hardware timers directly.
pub trait Clock: Send + Sync {
	fn now_ms(&self) -> Instant;
}

static CLOCK: Once<&'static dyn Clock> = Once::new();

/// Registers the platform clock. Call once during bring-up, before the
/// poll loop starts.
pub fn install(clock: &'static dyn Clock) {
	CLOCK.call_once(|| clock);
}

/// Current monotonic time, or `0` if no clock has been installed yet (unit
/// tests construct their own `Instant`s directly instead of calling this).
pub fn now() -> Instant {
	CLOCK.get().map_or(0, |c| c.now_ms())
}

/// Default initial retransmission delay, matching common TFTP/ARP
/// implementations: one second.
pub const DEFAULT_MIN_DELAY_MS: u64 = 1_000;
/// Default backoff ceiling: doubling stops once the delay would exceed
/// this, and the timer fails with `TimedOut` after reaching the ceiling
/// this many times.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Number of times the ceiling delay may be retried before the timer
/// gives up permanently.
const MAX_CEILING_RETRIES: u32 = 4;

/// Outcome of polling a [`RetryTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
	/// Not yet expired.
	Pending,
	/// Expired; caller should retransmit and the timer has already backed
	/// off for the next round.
	Expired,
	/// Expired enough times at the backoff ceiling that the operation
	/// should be abandoned with `Error::TimedOut`.
	TimedOut,
}

/// A single retry timer: monotonic deadline plus exponential backoff state.
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer {
	running: bool,
	deadline: Instant,
	delay: u64,
	min_delay: u64,
	max_delay: u64,
	ceiling_hits: u32,
}

impl RetryTimer {
	/// A timer with the default min/max delay (matching TFTP/ARP retry
	/// policy in spec §4.4/§4.2).
	pub const fn new() -> Self {
		Self::with_bounds(DEFAULT_MIN_DELAY_MS, DEFAULT_MAX_DELAY_MS)
	}

	pub const fn with_bounds(min_delay: u64, max_delay: u64) -> Self {
		Self {
			running: false,
			deadline: 0,
			delay: min_delay,
			min_delay,
			max_delay,
			ceiling_hits: 0,
		}
	}

	/// Starts (or restarts) the timer to fire `self.delay` after `now`.
	/// Resets the backoff to the minimum delay — call this when beginning
	/// a fresh operation, not on every retransmit (use [`RetryTimer::fire`]
	/// for that).
	pub fn start(&mut self, now: Instant) {
		self.running = true;
		self.delay = self.min_delay;
		self.ceiling_hits = 0;
		self.deadline = now + self.delay;
	}

	/// Cancels the timer. A canceled timer never fires again until
	/// `start` is called.
	pub fn stop(&mut self) {
		self.running = false;
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Polls the timer against the current time, firing and re-arming
	/// with a doubled delay (up to the ceiling) if expired.
	pub fn poll(&mut self, now: Instant) -> TimerEvent {
		if !self.running || now < self.deadline {
			return TimerEvent::Pending;
		}
		self.fire(now)
	}

	/// Forces expiry now (used after an explicit retransmit) and re-arms
	/// with the next backoff delay.
	fn fire(&mut self, now: Instant) -> TimerEvent {
		let at_ceiling = self.delay >= self.max_delay;
		if at_ceiling {
			self.ceiling_hits += 1;
			if self.ceiling_hits > MAX_CEILING_RETRIES {
				self.running = false;
				return TimerEvent::TimedOut;
			}
		} else {
			self.delay = (self.delay * 2).min(self.max_delay);
		}
		self.deadline = now + self.delay;
		TimerEvent::Expired
	}
}

impl Default for RetryTimer {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fires_after_delta_and_doubles() {
		let mut t = RetryTimer::with_bounds(100, 800);
		t.start(0);
		assert_eq!(t.poll(50), TimerEvent::Pending);
		assert_eq!(t.poll(100), TimerEvent::Expired);
		// delay doubled to 200
		assert_eq!(t.poll(250), TimerEvent::Pending);
		assert_eq!(t.poll(300), TimerEvent::Expired);
	}

	#[test]
	fn times_out_after_repeated_ceiling_hits() {
		let mut t = RetryTimer::with_bounds(100, 100);
		t.start(0);
		let mut now = 0u64;
		let mut last = TimerEvent::Pending;
		for _ in 0..(MAX_CEILING_RETRIES + 2) {
			now += 100;
			last = t.poll(now);
			if last == TimerEvent::TimedOut {
				break;
			}
		}
		assert_eq!(last, TimerEvent::TimedOut);
	}

	#[test]
	fn stop_prevents_further_firing() {
		let mut t = RetryTimer::new();
		t.start(0);
		t.stop();
		assert_eq!(t.poll(u64::MAX), TimerEvent::Pending);
	}
}
