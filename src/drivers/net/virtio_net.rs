//! The one concrete hardware `NetDevice` this crate ships: a virtio-net
//! front end (spec §11 "virtio-net as the one concrete NetDevice"). The
//! actual descriptor ring and transport (PCI or MMIO register discovery,
//! queue notification) is a platform capability this module is handed,
//! the same way [`crate::timer::Clock`] and [`crate::console::ConsoleWriter`]
//! are — individual NIC register sequences are out of this crate's scope
//! (spec §1), only the framing above the ring is.

use alloc::boxed::Box;
use alloc::vec::Vec;

use virtio_spec::net::{Hdr as VirtioNetHdr, HdrGso};

use crate::error::{Error, Result};
use crate::net::device::{Driver, DriverContext};
use crate::Buffer;

/// The descriptor-ring mechanics a platform's virtio transport (PCI or
/// MMIO) provides. Mirrors the split the teacher's own
/// `drivers::virtio::virtqueue` module draws between ring plumbing and
/// the net-specific driver built on top of it.
pub trait VirtioTransport: Send {
	/// Submits one frame (virtio-net header followed by the Ethernet
	/// frame) to the TX ring. Returns `Error::NoBufs` if the ring is
	/// full; the caller retries on a later poll.
	fn submit_tx(&mut self, frame: &[u8]) -> Result<()>;

	/// Pulls one completed TX descriptor, if the device has used one
	/// since the last poll.
	fn poll_tx_complete(&mut self) -> Option<()>;

	/// Pulls one received frame (virtio-net header included), if any.
	fn poll_rx(&mut self) -> Option<Vec<u8>>;

	/// Replenishes the RX ring with a fresh buffer of at least `capacity`
	/// bytes. Called once per frame handed off via `poll_rx`.
	fn post_rx_buffer(&mut self, capacity: usize);

	fn mac_address(&self) -> [u8; 6];
}

const VIRTIO_NET_HDR_LEN: usize = core::mem::size_of::<VirtioNetHdr>();

/// Drives a [`VirtioTransport`] behind the generic [`crate::net::device::Device`]
/// queueing and link-state machinery.
pub struct VirtioNetDriver {
	transport: Box<dyn VirtioTransport>,
	max_packet_len: usize,
}

impl VirtioNetDriver {
	pub fn new(transport: Box<dyn VirtioTransport>, max_packet_len: usize) -> Self {
		Self { transport, max_packet_len }
	}

	pub fn mac_address(&self) -> [u8; 6] {
		self.transport.mac_address()
	}
}

impl Driver for VirtioNetDriver {
	fn open(&mut self) -> Result<()> {
		self.transport.post_rx_buffer(self.max_packet_len + VIRTIO_NET_HDR_LEN);
		Ok(())
	}

	fn close(&mut self) {}

	fn transmit(&mut self, buf: Buffer) -> Result<()> {
		// no offload: the header is all-zero beyond GSO_NONE, which is
		// also the default.
		let header = VirtioNetHdr {
			gso_type: HdrGso::NONE,
			..Default::default()
		};
		let mut frame = Vec::with_capacity(VIRTIO_NET_HDR_LEN + buf.len());
		frame.extend_from_slice(bytes_of(&header));
		frame.extend_from_slice(buf.as_slice());
		self.transport.submit_tx(&frame)
	}

	fn poll(&mut self, ctx: &mut DriverContext<'_>) {
		while let Some(buf) = ctx.next_tx() {
			let result = self.transmit_owned(&buf);
			ctx.tx_complete(result);
		}
		while self.transport.poll_tx_complete().is_some() {
			// ring slot reclaimed; nothing further to report, the
			// completion was already surfaced synchronously above in
			// this cooperative model.
		}
		while let Some(frame) = self.transport.poll_rx() {
			if frame.len() <= VIRTIO_NET_HDR_LEN {
				continue;
			}
			ctx.rx(Buffer::from_vec(frame[VIRTIO_NET_HDR_LEN..].to_vec()));
			self.transport.post_rx_buffer(self.max_packet_len + VIRTIO_NET_HDR_LEN);
		}
	}
}

impl VirtioNetDriver {
	fn transmit_owned(&mut self, buf: &Buffer) -> Result<()> {
		let header = VirtioNetHdr {
			gso_type: HdrGso::NONE,
			..Default::default()
		};
		let mut frame = Vec::with_capacity(VIRTIO_NET_HDR_LEN + buf.len());
		frame.extend_from_slice(bytes_of(&header));
		frame.extend_from_slice(buf.as_slice());
		self.transport.submit_tx(&frame)
	}
}

/// Reads a `#[repr(C)]` POD struct's bytes. `VirtioNetHdr` is plain old
/// data (all `le16`/`u8` fields, no padding-sensitive layout across
/// platforms), so this is sound for the one type it is used with here.
fn bytes_of(header: &VirtioNetHdr) -> &[u8] {
	unsafe { core::slice::from_raw_parts((header as *const VirtioNetHdr).cast::<u8>(), VIRTIO_NET_HDR_LEN) }
}

#[cfg(test)]
mod tests {
	use alloc::collections::VecDeque;

	use super::*;

	struct FakeTransport {
		tx: VecDeque<Vec<u8>>,
		rx: VecDeque<Vec<u8>>,
		mac: [u8; 6],
	}

	impl VirtioTransport for FakeTransport {
		fn submit_tx(&mut self, frame: &[u8]) -> Result<()> {
			self.tx.push_back(frame.to_vec());
			Ok(())
		}

		fn poll_tx_complete(&mut self) -> Option<()> {
			self.tx.pop_front().map(|_| ())
		}

		fn poll_rx(&mut self) -> Option<Vec<u8>> {
			self.rx.pop_front()
		}

		fn post_rx_buffer(&mut self, _capacity: usize) {}

		fn mac_address(&self) -> [u8; 6] {
			self.mac
		}
	}

	#[test]
	fn transmit_prepends_virtio_header() {
		let transport = FakeTransport { tx: VecDeque::new(), rx: VecDeque::new(), mac: [2, 0, 0, 0, 0, 1] };
		let mut driver = VirtioNetDriver::new(Box::new(transport), 1500);
		driver.transmit(Buffer::from_vec(alloc::vec![0xaa; 10])).unwrap();
	}

	#[test]
	fn rx_frame_has_header_stripped() {
		let mut transport = FakeTransport { tx: VecDeque::new(), rx: VecDeque::new(), mac: [2, 0, 0, 0, 0, 1] };
		let mut frame = alloc::vec![0u8; VIRTIO_NET_HDR_LEN];
		frame.extend_from_slice(b"hello");
		transport.rx.push_back(frame);
		let mut driver = VirtioNetDriver::new(Box::new(transport), 1500);

		let mut tx_queue = alloc::collections::VecDeque::new();
		let mut tx_in_flight = 0usize;
		let mut tx_completions = 0u64;
		let mut tx_errors = 0u64;
		let mut rx_queue = alloc::collections::VecDeque::new();
		let mut link_state = crate::net::LinkState::Down;
		let mut ctx = DriverContext::for_test(
			&mut tx_queue,
			&mut tx_in_flight,
			&mut tx_completions,
			&mut tx_errors,
			&mut rx_queue,
			&mut link_state,
			true,
		);
		driver.poll(&mut ctx);
		assert_eq!(rx_queue.len(), 1);
		assert_eq!(rx_queue[0].as_slice(), b"hello");
	}
}
