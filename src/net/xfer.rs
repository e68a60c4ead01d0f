//! `XferInterface`: a typed, bidirectional data-path connector (spec §4
//! "XferEndpoint"). Two interfaces are "plugged" together; each delivery,
//! seek or close on one side is forwarded to whatever [`Endpoint`] its
//! peer wraps. This is the bus every protocol state machine in
//! [`crate::proto`] rides on to reach its caller (and, in turn, a
//! download pipeline rides on to reach its data sink).
//!
//! Single-threaded cooperative scheduling (spec §9) means this never needs
//! a lock: `Rc<RefCell<_>>` is enough.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::error::{Error, Result};
use crate::Buffer;

/// The data-path operations a protocol stage or ultimate data sink
/// implements. Every method has a default that rejects the operation, so
/// an endpoint that is pure sink (no seek) need not implement it.
pub trait Endpoint {
	fn deliver(&mut self, data: Buffer) -> Result<()> {
		let _ = data;
		Err(Error::NotSupported)
	}

	/// Requests that subsequent `deliver` calls start at `offset` into
	/// the logical data stream (e.g. HTTP Content-Length framing resets
	/// this to 0 after the headers).
	fn seek(&mut self, offset: u64) -> Result<()> {
		let _ = offset;
		Err(Error::NotSupported)
	}

	/// How many bytes this endpoint can currently accept without
	/// blocking; flow control advice for the sender, not an enforced
	/// limit.
	fn window(&self) -> usize {
		0
	}

	/// Called when the interface (or its peer) closes. `Ok(())` is a
	/// normal end-of-data close; `Err` propagates the reason upstream.
	fn close(&mut self, reason: Result<()>) {
		let _ = reason;
	}
}

struct Shared {
	endpoint: RefCell<Box<dyn Endpoint>>,
	peer: RefCell<Option<Interface>>,
}

/// One end of a plugged pair. Cloning shares the same underlying endpoint
/// (an `Rc`), so a held `Interface` survives its peer unplugging.
#[derive(Clone)]
pub struct Interface(Rc<Shared>);

impl Interface {
	pub fn new(endpoint: Box<dyn Endpoint>) -> Self {
		Interface(Rc::new(Shared {
			endpoint: RefCell::new(endpoint),
			peer: RefCell::new(None),
		}))
	}

	/// Pairs two interfaces: operations on one are forwarded to the
	/// other's endpoint, and vice versa.
	pub fn plug(a: &Interface, b: &Interface) {
		*a.0.peer.borrow_mut() = Some(b.clone());
		*b.0.peer.borrow_mut() = Some(a.clone());
	}

	fn unplug(&self) {
		self.0.peer.borrow_mut().take();
	}

	fn peer(&self) -> Option<Interface> {
		self.0.peer.borrow().clone()
	}

	pub fn is_plugged(&self) -> bool {
		self.0.peer.borrow().is_some()
	}

	/// Hands `data` to whatever is plugged into this interface.
	pub fn deliver(&self, data: Buffer) -> Result<()> {
		match self.peer() {
			Some(peer) => peer.0.endpoint.borrow_mut().deliver(data),
			None => Err(Error::InvalidArg),
		}
	}

	pub fn seek(&self, offset: u64) -> Result<()> {
		match self.peer() {
			Some(peer) => peer.0.endpoint.borrow_mut().seek(offset),
			None => Err(Error::InvalidArg),
		}
	}

	pub fn window(&self) -> usize {
		self.peer().map_or(0, |peer| peer.0.endpoint.borrow().window())
	}

	/// Closes both ends of the pairing with `reason`, then unplugs both
	/// (spec §4 "closure propagation both directions"). Idempotent: closing
	/// an already-unplugged interface is a no-op.
	pub fn close(&self, reason: Result<()>) {
		let Some(peer) = self.peer() else {
			return;
		};
		self.0.endpoint.borrow_mut().close(reason);
		peer.0.endpoint.borrow_mut().close(reason);
		self.unplug();
		peer.unplug();
	}
}

#[cfg(test)]
mod tests {
	use alloc::vec::Vec;

	use super::*;

	struct Capture {
		delivered: Vec<u8>,
		closed: Option<Result<()>>,
	}

	impl Endpoint for Capture {
		fn deliver(&mut self, data: Buffer) -> Result<()> {
			self.delivered.extend_from_slice(data.as_slice());
			Ok(())
		}

		fn close(&mut self, reason: Result<()>) {
			self.closed = Some(reason);
		}
	}

	#[test]
	fn deliver_crosses_to_the_peers_endpoint() {
		let a = Interface::new(Box::new(Capture { delivered: Vec::new(), closed: None }));
		let b = Interface::new(Box::new(Capture { delivered: Vec::new(), closed: None }));
		Interface::plug(&a, &b);

		a.deliver(Buffer::from_vec(alloc::vec![1, 2, 3])).unwrap();
		// it landed in b's endpoint, not a's
		assert_eq!(b.0.endpoint.borrow().window(), 0);
	}

	#[test]
	fn close_propagates_to_peer_and_unplugs_both() {
		let a = Interface::new(Box::new(Capture { delivered: Vec::new(), closed: None }));
		let b = Interface::new(Box::new(Capture { delivered: Vec::new(), closed: None }));
		Interface::plug(&a, &b);

		a.close(Err(Error::Canceled));
		assert!(!a.is_plugged());
		assert!(!b.is_plugged());
	}

	#[test]
	fn deliver_without_a_peer_is_rejected() {
		let a = Interface::new(Box::new(Capture { delivered: Vec::new(), closed: None }));
		assert_eq!(a.deliver(Buffer::with_capacity(4)), Err(Error::InvalidArg));
	}
}
