//! A loopback `NetDevice`: every transmitted frame is immediately handed
//! back as received. Used by tests and by `shell`'s `ping 127.0.0.1`-style
//! self-checks; not part of the spec's hardware surface, but the simplest
//! possible grounding for the generic queueing machinery in
//! [`crate::net::device`].

use alloc::collections::VecDeque;

use crate::error::Result;
use crate::net::device::{Driver, DriverContext};
use crate::Buffer;

pub const MAC_ADDRESS: [u8; 6] = [0, 0, 0, 0, 0, 0];

#[derive(Default)]
pub struct LoopbackDriver {
	queued: VecDeque<Buffer>,
}

impl LoopbackDriver {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Driver for LoopbackDriver {
	fn open(&mut self) -> Result<()> {
		Ok(())
	}

	fn close(&mut self) {
		self.queued.clear();
	}

	fn transmit(&mut self, buf: Buffer) -> Result<()> {
		self.queued.push_back(buf);
		Ok(())
	}

	fn poll(&mut self, ctx: &mut DriverContext<'_>) {
		ctx.link_up();
		while let Some(buf) = ctx.next_tx() {
			self.queued.push_back(buf);
			ctx.tx_complete(Ok(()));
		}
		while let Some(buf) = self.queued.pop_front() {
			ctx.rx(buf);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::net::device::Device;

	#[test]
	fn transmitted_frames_are_received_back() {
		crate::settings::reset();
		let mut dev = Device::new("lo", 0, MAC_ADDRESS, 1500, alloc::boxed::Box::new(LoopbackDriver::new())).unwrap();
		dev.open().unwrap();
		dev.poll();
		dev.transmit(Buffer::from_vec(alloc::vec![1, 2, 3])).unwrap();
		dev.poll();
		let received = dev.pop_rx().unwrap();
		assert_eq!(received.as_slice(), [1, 2, 3]);
	}
}
