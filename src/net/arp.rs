//! The ARP cache: IPv4-address-to-link-layer-address resolution (spec §4.2
//! "ARPEntry"), keyed per `(NetDevice, L3 protocol)` — this crate only
//! resolves IPv4, so the protocol half of the key is implicit.
//!
//! Broadcast and multicast destinations never enter this cache; callers
//! resolve those directly via [`crate::net::linklayer::resolve`] before
//! ever consulting ARP.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::HashMap;
use spin::Mutex;

use crate::error::{Error, Result};
use crate::timer::{Instant, RetryTimer, TimerEvent};
use crate::Buffer;

/// Bounds how many buffers may await a single unresolved address, so a
/// black-holed neighbor cannot accumulate unbounded memory.
const MAX_PENDING_PER_ENTRY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Incomplete,
	Resolved([u8; 6]),
}

struct Entry {
	state: State,
	timer: RetryTimer,
	pending: VecDeque<Buffer>,
}

/// Outcome of a resolution lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
	Resolved([u8; 6]),
	/// No resolved entry exists (or none at all); the caller should queue
	/// its buffer with [`queue_pending`] and an ARP request will go out
	/// on the next [`poll`].
	Pending,
}

static CACHE: Mutex<Option<HashMap<(u32, [u8; 4]), Entry>>> = Mutex::new(None);

fn with_cache<R>(f: impl FnOnce(&mut HashMap<(u32, [u8; 4]), Entry>) -> R) -> R {
	let mut guard = CACHE.lock();
	if guard.is_none() {
		*guard = Some(HashMap::new());
	}
	f(guard.as_mut().unwrap())
}

/// Clears the whole cache. Exists for tests.
pub fn reset() {
	*CACHE.lock() = Some(HashMap::new());
}

/// Looks up `ip` on device `scope_id`, creating an incomplete entry (and
/// arming its retry timer) if this is the first lookup.
pub fn resolve(scope_id: u32, ip: [u8; 4], now: Instant) -> Lookup {
	with_cache(|cache| {
		let entry = cache.entry((scope_id, ip)).or_insert_with(|| {
			let mut timer = RetryTimer::new();
			timer.start(now);
			Entry {
				state: State::Incomplete,
				timer,
				pending: VecDeque::new(),
			}
		});
		match entry.state {
			State::Resolved(ll) => Lookup::Resolved(ll),
			State::Incomplete => Lookup::Pending,
		}
	})
}

/// Queues a buffer awaiting resolution of `ip` on `scope_id`. Fails with
/// [`Error::NoEntry`] if no lookup was ever started, and [`Error::NoBufs`]
/// once the per-entry queue is full.
pub fn queue_pending(scope_id: u32, ip: [u8; 4], buf: Buffer) -> Result<()> {
	with_cache(|cache| {
		let entry = cache.get_mut(&(scope_id, ip)).ok_or(Error::NoEntry)?;
		if entry.pending.len() >= MAX_PENDING_PER_ENTRY {
			return Err(Error::NoBufs);
		}
		entry.pending.push_back(buf);
		Ok(())
	})
}

/// A retransmission the caller should send as an ARP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
	pub scope_id: u32,
	pub target_ip: [u8; 4],
}

/// Polls every incomplete entry's retry timer, returning the set that
/// should (re)transmit an ARP request now. Entries that time out are
/// dropped, discarding their pending buffers (spec §7 `HostUnreach`: the
/// caller surfaces this to whoever originated the transmit).
pub fn poll(now: Instant) -> Vec<Request> {
	with_cache(|cache| {
		let mut due = Vec::new();
		cache.retain(|&(scope_id, ip), entry| {
			if !matches!(entry.state, State::Incomplete) {
				return true;
			}
			match entry.timer.poll(now) {
				TimerEvent::Pending => true,
				TimerEvent::Expired => {
					due.push(Request { scope_id, target_ip: ip });
					true
				}
				TimerEvent::TimedOut => false,
			}
		});
		due
	})
}

/// Records a reply, resolving the entry and returning every buffer that
/// had been queued awaiting it, in arrival order, for the caller to
/// transmit now.
pub fn handle_reply(scope_id: u32, sender_ip: [u8; 4], sender_ll: [u8; 6]) -> Vec<Buffer> {
	with_cache(|cache| {
		let Some(entry) = cache.get_mut(&(scope_id, sender_ip)) else {
			return Vec::new();
		};
		entry.state = State::Resolved(sender_ll);
		entry.timer.stop();
		entry.pending.drain(..).collect()
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unresolved_lookup_queues_and_flushes_on_reply() {
		reset();
		assert_eq!(resolve(0, [192, 168, 0, 1], 0), Lookup::Pending);
		queue_pending(0, [192, 168, 0, 1], Buffer::with_capacity(8)).unwrap();
		queue_pending(0, [192, 168, 0, 1], Buffer::with_capacity(8)).unwrap();
		let flushed = handle_reply(0, [192, 168, 0, 1], [2, 0, 0, 0, 0, 9]);
		assert_eq!(flushed.len(), 2);
		assert_eq!(resolve(0, [192, 168, 0, 1], 0), Lookup::Resolved([2, 0, 0, 0, 0, 9]));
	}

	#[test]
	fn retransmits_and_eventually_expires() {
		reset();
		resolve(0, [10, 0, 0, 1], 0);
		assert!(poll(0).is_empty());
		assert_eq!(poll(1_000), alloc::vec![Request { scope_id: 0, target_ip: [10, 0, 0, 1] }]);
		// keep firing until the entry is dropped
		let mut now = 1_000u64;
		let mut dropped = false;
		for _ in 0..10 {
			now += 30_000;
			if poll(now).is_empty() {
				dropped = true;
				break;
			}
		}
		assert!(dropped);
		assert_eq!(resolve(0, [10, 0, 0, 1], now), Lookup::Pending);
	}

	#[test]
	fn pending_queue_is_bounded() {
		reset();
		resolve(0, [10, 0, 0, 2], 0);
		for _ in 0..MAX_PENDING_PER_ENTRY {
			queue_pending(0, [10, 0, 0, 2], Buffer::with_capacity(4)).unwrap();
		}
		assert_eq!(queue_pending(0, [10, 0, 0, 2], Buffer::with_capacity(4)), Err(Error::NoBufs));
	}
}
