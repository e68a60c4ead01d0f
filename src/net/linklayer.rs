//! Ethernet framing (spec §4.2 "LinkLayer").
//!
//! `LinkLayer` in the system this crate models also covers IPoIB framing;
//! this crate only implements Ethernet, the framing every driver in
//! [`crate::drivers::net`] speaks.

use crate::error::{Error, Result};
use crate::Buffer;

pub const ETH_ALEN: usize = 6;
pub const ETH_HLEN: usize = 14;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

pub const BROADCAST: [u8; ETH_ALEN] = [0xff; ETH_ALEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
	pub dest: [u8; ETH_ALEN],
	pub src: [u8; ETH_ALEN],
	pub ethertype: u16,
}

/// Prepends an Ethernet header ahead of whatever payload is already in
/// `buf`. Callers must have reserved at least [`ETH_HLEN`] bytes of
/// headroom (spec §4.2 "push header").
pub fn push_header(buf: &mut Buffer, dest: [u8; ETH_ALEN], src: [u8; ETH_ALEN], ethertype: u16) -> Result<()> {
	let hdr = buf.push(ETH_HLEN)?;
	hdr[0..6].copy_from_slice(&dest);
	hdr[6..12].copy_from_slice(&src);
	hdr[12..14].copy_from_slice(&ethertype.to_be_bytes());
	Ok(())
}

/// Strips and parses the Ethernet header from the front of `buf`'s payload
/// (spec §4.2 "pull header").
pub fn pull_header(buf: &mut Buffer) -> Result<EthernetHeader> {
	if buf.len() < ETH_HLEN {
		return Err(Error::InvalidArg);
	}
	let hdr = buf.pull(ETH_HLEN)?;
	Ok(EthernetHeader {
		dest: hdr[0..6].try_into().unwrap(),
		src: hdr[6..12].try_into().unwrap(),
		ethertype: u16::from_be_bytes([hdr[12], hdr[13]]),
	})
}

pub fn is_broadcast(addr: [u8; ETH_ALEN]) -> bool {
	addr == BROADCAST
}

/// The low bit of the first octet marks a multicast (or broadcast, a
/// special case of multicast) link-layer address.
pub fn is_multicast(addr: [u8; ETH_ALEN]) -> bool {
	addr[0] & 0x01 != 0
}

/// Maps an IPv4 multicast group address onto its well-known Ethernet
/// multicast address (RFC 1112 §6.4): `01:00:5e` followed by the low 23
/// bits of the group address.
pub fn ipv4_multicast_address(group: [u8; 4]) -> [u8; ETH_ALEN] {
	[0x01, 0x00, 0x5e, group[1] & 0x7f, group[2], group[3]]
}

pub fn is_ipv4_multicast(addr: [u8; 4]) -> bool {
	(224..=239).contains(&addr[0])
}

/// Address resolution dispatch (spec §4.2): broadcast and multicast
/// destinations have a link-layer address derivable without ARP; anything
/// else needs a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	Direct([u8; ETH_ALEN]),
	NeedsArp,
}

pub fn resolve(dest_ip: [u8; 4]) -> Resolution {
	if dest_ip == [255, 255, 255, 255] {
		return Resolution::Direct(BROADCAST);
	}
	if is_ipv4_multicast(dest_ip) {
		return Resolution::Direct(ipv4_multicast_address(dest_ip));
	}
	Resolution::NeedsArp
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn header_roundtrips() {
		let mut buf = Buffer::with_capacity(64);
		buf.reserve(ETH_HLEN);
		push_header(&mut buf, BROADCAST, [2, 0, 0, 0, 0, 1], ETHERTYPE_ARP).unwrap();
		let hdr = pull_header(&mut buf).unwrap();
		assert_eq!(hdr.dest, BROADCAST);
		assert_eq!(hdr.src, [2, 0, 0, 0, 0, 1]);
		assert_eq!(hdr.ethertype, ETHERTYPE_ARP);
	}

	#[test]
	fn multicast_mapping_masks_high_bit_of_second_octet() {
		// 239.255.255.250 (SSDP) -> 01:00:5e:7f:ff:fa
		assert_eq!(ipv4_multicast_address([239, 255, 255, 250]), [0x01, 0x00, 0x5e, 0x7f, 0xff, 0xfa]);
	}

	#[test]
	fn resolve_bypasses_arp_for_broadcast_and_multicast() {
		assert_eq!(resolve([255, 255, 255, 255]), Resolution::Direct(BROADCAST));
		assert!(matches!(resolve([224, 0, 0, 1]), Resolution::Direct(_)));
		assert_eq!(resolve([192, 168, 0, 1]), Resolution::NeedsArp);
	}
}
