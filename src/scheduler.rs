//! The poll loop (spec §4.9): a single-threaded, cooperative, run-to-completion
//! scheduler. There is no preemption and no blocking call anywhere in this
//! crate — every component that would otherwise wait records its state and
//! returns, to be driven again on the next iteration (spec §5 "Suspension
//! points").
//!
//! A `Process` is the generalization of "something that wants a callback
//! every iteration": TFTP/HTTP/NFS sessions, ARP cache maintenance, IPv4
//! fragment-reassembly timeouts, and the CLI's line reader are all
//! processes. [`crate::net::poll_all`] (device polling) is driven directly
//! by [`run_once`] rather than through a process, mirroring how tightly
//! the original couples "poll every net device" to its main loop.

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::{Mutex, Once};

use crate::timer::Instant;

/// What a [`Process::step`] accomplished this iteration. Determines both
/// whether the scheduler should loop again immediately (spec §4.9 step 4)
/// and whether the process should be retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
	/// Nothing to do; waiting on a timer or external event.
	Idle,
	/// Made forward progress (sent a packet, delivered data, fired a
	/// timer) — counts as "activity occurred" for this loop iteration.
	Progressed,
	/// Finished; remove this process from the ready list.
	Done,
}

/// A unit of cooperative work driven by the poll loop. `step` must never
/// block: if it cannot make progress without new input (a reply, a timer
/// expiry), it returns [`StepResult::Idle`] and is called again next
/// iteration (spec §5 "a process that would block instead returns").
pub trait Process: Send {
	fn step(&mut self, now: Instant) -> StepResult;
}

/// Handle to a registered process, stable for its lifetime. Exists mainly
/// so a caller can `process_del` something it added before it reaches
/// `StepResult::Done` on its own (e.g. the CLI canceling an in-flight
/// download).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(usize);

static PROCESSES: Mutex<Vec<Option<Box<dyn Process>>>> = Mutex::new(Vec::new());

/// Drops every registered process. Exists for tests.
pub fn reset() {
	PROCESSES.lock().clear();
}

/// Adds `process` to the ready list (spec §4.9 "process_add").
pub fn process_add(process: Box<dyn Process>) -> ProcessId {
	let mut processes = PROCESSES.lock();
	processes.push(Some(process));
	ProcessId(processes.len() - 1)
}

/// Removes a process before it has signaled `StepResult::Done` on its own.
/// A no-op if the id is unknown or already removed.
pub fn process_del(id: ProcessId) {
	if let Some(slot) = PROCESSES.lock().get_mut(id.0) {
		*slot = None;
	}
}

/// A capability for yielding the processor when a whole iteration found
/// no activity (spec §4.9 step 4: "HLT / WFI / none"). The embedding
/// platform supplies this the same way it supplies [`crate::timer::Clock`]
/// and [`crate::console::ConsoleWriter`]; a platform with nothing cheaper
/// to do than spin may implement this as a no-op.
pub trait Idle: Send + Sync {
	fn idle(&self);
}

static IDLE: Once<&'static dyn Idle> = Once::new();

/// Registers the platform idle capability. Call once during bring-up.
pub fn install_idle(idle: &'static dyn Idle) {
	IDLE.call_once(|| idle);
}

/// Runs every open `NetDevice`'s `poll` and dispatches every ready process
/// once, in registration order (spec §4.9 steps 2-3). Returns whether any
/// process reported progress — `poll_all`'s device-level work is not
/// itself counted, since a quiescent link polls cleanly every iteration
/// without that constituting "activity" in the sense step 4 means.
pub fn run_once(now: Instant) -> bool {
	crate::net::poll_all();

	let mut activity = false;
	let mut processes = PROCESSES.lock();
	for slot in processes.iter_mut() {
		let Some(process) = slot else { continue };
		match process.step(now) {
			StepResult::Idle => {}
			StepResult::Progressed => activity = true,
			StepResult::Done => {
				activity = true;
				*slot = None;
			}
		}
	}
	// compact occasionally so a long-running firmware doesn't accumulate
	// an ever-growing vector of `None` holes from finished downloads.
	if processes.len() > 64 && processes.iter().filter(|s| s.is_none()).count() * 2 > processes.len() {
		processes.retain(Option::is_some);
	}
	activity
}

/// Runs [`run_once`] forever, yielding to [`Idle::idle`] whenever an
/// iteration found nothing to do (spec §4.9). The embedding platform's
/// `main` calls this once, after installing the clock, console and idle
/// capabilities and registering its net devices.
pub fn run_forever() -> ! {
	loop {
		let now = crate::timer::now();
		if !run_once(now) {
			if let Some(idle) = IDLE.get() {
				idle.idle();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct CountToThree {
		remaining: u32,
	}

	impl Process for CountToThree {
		fn step(&mut self, _now: Instant) -> StepResult {
			if self.remaining == 0 {
				return StepResult::Done;
			}
			self.remaining -= 1;
			if self.remaining == 0 {
				StepResult::Done
			} else {
				StepResult::Progressed
			}
		}
	}

	struct AlwaysIdle;
	impl Process for AlwaysIdle {
		fn step(&mut self, _now: Instant) -> StepResult {
			StepResult::Idle
		}
	}

	#[test]
	fn a_process_runs_until_done_then_is_dropped() {
		reset();
		crate::net::reset();
		let id = process_add(Box::new(CountToThree { remaining: 2 }));
		assert!(run_once(0));
		assert!(run_once(0));
		// the process reported Done on its second step and was removed;
		// deleting it again is a harmless no-op.
		process_del(id);
	}

	#[test]
	fn an_idle_iteration_reports_no_activity() {
		reset();
		crate::net::reset();
		process_add(Box::new(AlwaysIdle));
		assert!(!run_once(0));
	}

	#[test]
	fn process_del_stops_further_stepping() {
		reset();
		crate::net::reset();
		let id = process_add(Box::new(CountToThree { remaining: 100 }));
		process_del(id);
		assert!(!run_once(0));
	}
}
