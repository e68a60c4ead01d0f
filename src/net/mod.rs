//! The network device core (spec §4.1/§4.2/§4.3): the `NetDevice`
//! abstraction, Ethernet framing, ARP, IPv4 routing/fragmentation, UDP/TCP
//! transport, and the `XferInterface` data-path bus everything above rides
//! on.
//!
//! This module additionally owns the process-wide device registry — the
//! one process-wide singleton spec §5 calls for at this layer (routing
//! table and ARP cache are their own singletons, owned by [`ipv4`] and
//! [`arp`] respectively).

pub mod arp;
pub mod device;
pub mod ipv4;
pub mod linklayer;
pub mod tcp;
pub mod udp;
pub mod xfer;

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::Mutex;

pub use device::{Device, DriverContext, LinkState};

use crate::error::{Error, Result};

/// Handle to a registered device. Stable for the device's lifetime; reused
/// indices are never handed out while a device occupies them (the slot is
/// only freed, not recycled, by [`unregister`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetDeviceId(u32);

struct Registry {
	devices: Vec<Option<Device>>,
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry { devices: Vec::new() });

/// Drops every registered device. Exists for tests.
pub fn reset() {
	*REGISTRY.lock() = Registry { devices: Vec::new() };
}

/// Registers a new device with the driver that backs it, returning its
/// stable id.
pub fn register(name: &str, hw_address: [u8; 6], max_packet_len: usize, driver: Box<dyn device::Driver>) -> Result<NetDeviceId> {
	let mut registry = REGISTRY.lock();
	let id = registry.devices.len() as u32;
	let dev = Device::new(name, id, hw_address, max_packet_len, driver)?;
	registry.devices.push(Some(dev));
	Ok(NetDeviceId(id))
}

/// Closes and drops a registered device. Its slot is left vacant; the id
/// is never reissued.
pub fn unregister(id: NetDeviceId) {
	let mut registry = REGISTRY.lock();
	if let Some(slot) = registry.devices.get_mut(id.0 as usize) {
		if let Some(dev) = slot.as_mut() {
			dev.close();
		}
		*slot = None;
	}
}

/// Runs `f` against the registered device `id`, or `Error::NoEntry` if it
/// is unknown or has already been unregistered.
pub fn with_device<R>(id: NetDeviceId, f: impl FnOnce(&mut Device) -> R) -> Result<R> {
	let mut registry = REGISTRY.lock();
	let dev = registry
		.devices
		.get_mut(id.0 as usize)
		.and_then(|slot| slot.as_mut())
		.ok_or(Error::NoEntry)?;
	Ok(f(dev))
}

/// Polls every open device once, in registration order. Called once per
/// scheduler iteration (spec §4.9).
pub fn poll_all() {
	let mut registry = REGISTRY.lock();
	for slot in registry.devices.iter_mut() {
		if let Some(dev) = slot {
			if dev.is_open() {
				dev.poll();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn register_open_and_unregister() {
		reset();
		crate::settings::reset();
		let id = register("net0", [2, 0, 0, 0, 0, 1], 1500, Box::new(device::test_support::NullDriver::new())).unwrap();
		with_device(id, |dev| dev.open().unwrap()).unwrap();
		poll_all();
		unregister(id);
		assert_eq!(with_device(id, |_| ()), Err(Error::NoEntry));
	}
}
