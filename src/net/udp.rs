//! UDP: connectionless datagram transport with port-based demultiplexing
//! (spec §4.3 "UDP"). TFTP and NFS's SunRPC layer both sit on top of this.

use hashbrown::HashMap;
use spin::Mutex;

use crate::error::{Error, Result};
use crate::net::ipv4;

pub const HLEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
	pub src_port: u16,
	pub dst_port: u16,
	pub length: u16,
	pub checksum: u16,
}

pub fn parse_header(data: &[u8]) -> Result<(Header, &[u8])> {
	if data.len() < HLEN {
		return Err(Error::InvalidArg);
	}
	let header = Header {
		src_port: u16::from_be_bytes([data[0], data[1]]),
		dst_port: u16::from_be_bytes([data[2], data[3]]),
		length: u16::from_be_bytes([data[4], data[5]]),
		checksum: u16::from_be_bytes([data[6], data[7]]),
	};
	if (header.length as usize) < HLEN || (header.length as usize) > data.len() {
		return Err(Error::InvalidArg);
	}
	Ok((header, &data[HLEN..header.length as usize]))
}

/// Builds a UDP segment (header + payload) and computes its checksum over
/// the IPv4 pseudo-header.
pub fn build_segment(src_ip: [u8; 4], dst_ip: [u8; 4], src_port: u16, dst_port: u16, payload: &[u8]) -> alloc::vec::Vec<u8> {
	let length = (HLEN + payload.len()) as u16;
	let mut segment = alloc::vec::Vec::with_capacity(length as usize);
	segment.extend_from_slice(&src_port.to_be_bytes());
	segment.extend_from_slice(&dst_port.to_be_bytes());
	segment.extend_from_slice(&length.to_be_bytes());
	segment.extend_from_slice(&[0, 0]);
	segment.extend_from_slice(payload);
	let checksum = ipv4::pseudo_header_checksum(src_ip, dst_ip, 17, &segment);
	// 0 is reserved to mean "no checksum computed"; UDP maps an all-zero
	// result onto all-ones instead (RFC 768).
	let checksum = if checksum == 0 { 0xffff } else { checksum };
	segment[6..8].copy_from_slice(&checksum.to_be_bytes());
	segment
}

/// Registers interest in `port` on device `scope_id`, returning a token
/// used to look delivered datagrams back up. Mirrors the ephemeral-port
/// bind every `XferEndpoint` using UDP performs (spec §4.3).
static BINDINGS: Mutex<HashMap<(u32, u16), ()>> = Mutex::new(HashMap::new());

pub fn reset() {
	BINDINGS.lock().clear();
}

pub fn bind(scope_id: u32, port: u16) -> Result<()> {
	let mut bindings = BINDINGS.lock();
	if bindings.contains_key(&(scope_id, port)) {
		return Err(Error::Exists);
	}
	bindings.insert((scope_id, port), ());
	Ok(())
}

pub fn unbind(scope_id: u32, port: u16) {
	BINDINGS.lock().remove(&(scope_id, port));
}

pub fn is_bound(scope_id: u32, port: u16) -> bool {
	BINDINGS.lock().contains_key(&(scope_id, port))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn segment_roundtrips() {
		let segment = build_segment([10, 0, 0, 1], [10, 0, 0, 2], 69, 1024, b"RRQ");
		let (header, payload) = parse_header(&segment).unwrap();
		assert_eq!(header.src_port, 69);
		assert_eq!(header.dst_port, 1024);
		assert_eq!(payload, b"RRQ");
	}

	#[test]
	fn double_bind_is_rejected() {
		reset();
		bind(0, 69).unwrap();
		assert_eq!(bind(0, 69), Err(Error::Exists));
		unbind(0, 69);
		bind(0, 69).unwrap();
	}
}
