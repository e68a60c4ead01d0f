//! iBFT/sBFT table publishing (spec §11 "ACPI iBFT/sBFT publishing
//! carrying NIC MAC/IP, initiator name, target path"), gated behind the
//! `acpi` feature. Grounded on the original's `drivers/block/ibft.c`:
//! this module builds the byte image of an iSCSI Boot Firmware Table
//! (iBFT, the ACPI table an OS installer reads to learn how it was
//! netbooted) but does not itself own ACPI table registration or
//! memory placement — publishing the finished bytes into the platform's
//! ACPI table list is an external collaborator's job, the same way
//! [`crate::timer::Clock`] and [`crate::console::ConsoleWriter`] are.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};

const IBFT_SIGNATURE: &[u8; 4] = b"iBFT";
const IBFT_REVISION: u8 = 1;
const OEM_ID: &[u8; 6] = b"PXBOOT";
const OEM_TABLE_ID: &[u8; 8] = b"PXEBOOT ";

const STRUCT_ID_INITIATOR: u8 = 1;
const STRUCT_ID_NIC: u8 = 2;
const STRUCT_ID_TARGET: u8 = 3;

const NIC_ORIGIN_DHCP: u8 = 3;

bitflags::bitflags! {
	/// The per-structure flags field every control structure header
	/// carries (`ibft_header::flags` in the original): bit 0 is always
	/// "block valid", bit 1 "boot selected" for the structure driving
	/// the current boot.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct StructFlags: u8 {
		const BLOCK_VALID = 0x01;
		const BOOT_SELECTED = 0x02;
	}
}

/// The network configuration the iBFT's NIC structure publishes,
/// gathered from the booting NetDevice's settings (spec §11).
#[derive(Debug, Clone)]
pub struct NicInfo {
	pub ip_address: [u8; 4],
	pub subnet_mask_prefix: u8,
	pub gateway: Option<[u8; 4]>,
	pub dns: Vec<[u8; 4]>,
	pub mac_address: [u8; 6],
}

/// The iSCSI-style initiator identity iBFT consumers expect, reused
/// here (per the original's layout) even though this firmware's actual
/// boot target is an NFS/HTTP/TFTP URI rather than an iSCSI LUN.
#[derive(Debug, Clone)]
pub struct InitiatorInfo {
	pub name: String,
}

/// The boot target this firmware fetched its kernel image from,
/// recorded for diagnostic/audit purposes the way `ibft_fill_target_*`
/// records the iSCSI target's address and name.
#[derive(Debug, Clone)]
pub struct TargetInfo {
	pub ip_address: [u8; 4],
	pub port: u16,
	pub target_name: String,
}

/// Builds the iBFT byte image. Kept intentionally small: one NIC
/// structure, one initiator structure, and an optional target
/// structure, which is all a single-NIC netboot firmware ever has
/// reason to publish.
pub struct Builder {
	nic: Option<NicInfo>,
	initiator: Option<InitiatorInfo>,
	target: Option<TargetInfo>,
}

impl Builder {
	pub fn new() -> Self {
		Self {
			nic: None,
			initiator: None,
			target: None,
		}
	}

	pub fn with_nic(mut self, nic: NicInfo) -> Self {
		self.nic = Some(nic);
		self
	}

	pub fn with_initiator(mut self, initiator: InitiatorInfo) -> Self {
		self.initiator = Some(initiator);
		self
	}

	pub fn with_target(mut self, target: TargetInfo) -> Self {
		self.target = Some(target);
		self
	}

	/// Serializes the accumulated structures into a complete table,
	/// including the standard ACPI table header and its checksum. The
	/// string heap (names, never fixed-width) is appended after the
	/// fixed structures, the layout `ibft_alloc_string` builds up
	/// incrementally in the original.
	pub fn build(&self) -> Result<Vec<u8>> {
		let nic = self.nic.as_ref().ok_or(Error::InvalidArg)?;
		let initiator = self.initiator.as_ref().ok_or(Error::InvalidArg)?;

		let mut strings: Vec<u8> = Vec::new();
		let initiator_name_off = push_string(&mut strings, &initiator.name);

		let mut structures = Vec::new();
		structures.extend(control_structure());
		let initiator_off = structures.len() as u16 + HEADER_LEN as u16;
		structures.extend(initiator_structure(initiator_name_off));
		let nic_off = structures.len() as u16 + HEADER_LEN as u16;
		structures.extend(nic_structure(nic));

		let target_off = if let Some(target) = &self.target {
			let name_off = push_string(&mut strings, &target.target_name);
			let off = structures.len() as u16 + HEADER_LEN as u16;
			structures.extend(target_structure(target, name_off));
			off
		} else {
			0
		};

		patch_control_structure(&mut structures, initiator_off, nic_off, target_off);

		let mut table = Vec::with_capacity(HEADER_LEN + structures.len() + strings.len());
		table.extend(core::iter::repeat(0u8).take(HEADER_LEN));
		table.extend(structures);
		let string_heap_offset = table.len();
		table.extend(strings);

		write_header(&mut table, string_heap_offset)?;
		Ok(table)
	}
}

impl Default for Builder {
	fn default() -> Self {
		Self::new()
	}
}

const HEADER_LEN: usize = 36;

fn write_header(table: &mut [u8], _string_heap_offset: usize) -> Result<()> {
	if table.len() < HEADER_LEN {
		return Err(Error::InvalidArg);
	}
	table[0..4].copy_from_slice(IBFT_SIGNATURE);
	let len = table.len() as u32;
	table[4..8].copy_from_slice(&len.to_le_bytes());
	table[8] = IBFT_REVISION;
	table[9] = 0; // checksum, patched below
	table[10..16].copy_from_slice(OEM_ID);
	table[16..24].copy_from_slice(OEM_TABLE_ID);

	let mut sum: u8 = 0;
	for &byte in table.iter() {
		sum = sum.wrapping_add(byte);
	}
	table[9] = (0u8).wrapping_sub(sum);
	Ok(())
}

/// The control structure (`ibft_control`) holds offsets to every other
/// structure in the table; its own offsets are patched in afterward
/// once the layout is known, since they depend on the variable-length
/// string heap.
fn control_structure() -> Vec<u8> {
	let mut s = vec![0u8; 18];
	s[0] = 0; // structure_id = reserved/control
	s[1] = IBFT_REVISION;
	// [2..4] length filled by caller convention (fixed-size here)
	s[2..4].copy_from_slice(&18u16.to_le_bytes());
	s[4] = 0; // index
	s[5] = StructFlags::empty().bits();
	s
}

fn patch_control_structure(structures: &mut [u8], initiator_off: u16, nic_off: u16, target_off: u16) {
	structures[10..12].copy_from_slice(&initiator_off.to_le_bytes());
	structures[12..14].copy_from_slice(&nic_off.to_le_bytes());
	structures[14..16].copy_from_slice(&target_off.to_le_bytes());
}

fn initiator_structure(name_off: (u16, u16)) -> Vec<u8> {
	let mut s = vec![0u8; 24];
	s[0] = STRUCT_ID_INITIATOR;
	s[1] = IBFT_REVISION;
	s[2..4].copy_from_slice(&24u16.to_le_bytes());
	s[4] = 1; // index
	s[5] = (StructFlags::BLOCK_VALID | StructFlags::BOOT_SELECTED).bits();
	s[16..18].copy_from_slice(&name_off.0.to_le_bytes());
	s[18..20].copy_from_slice(&name_off.1.to_le_bytes());
	s
}

fn nic_structure(nic: &NicInfo) -> Vec<u8> {
	let mut s = vec![0u8; 102];
	s[0] = STRUCT_ID_NIC;
	s[1] = IBFT_REVISION;
	s[2..4].copy_from_slice(&102u16.to_le_bytes());
	s[4] = 2; // index
	s[5] = (StructFlags::BLOCK_VALID | StructFlags::BOOT_SELECTED).bits();
	// IP addresses are carried as IPv4-mapped IPv6 per the iBFT spec;
	// the low four bytes of each 16-byte field hold the IPv4 address.
	s[6..10].copy_from_slice(&nic.ip_address);
	s[22] = nic.subnet_mask_prefix;
	s[23] = NIC_ORIGIN_DHCP;
	if let Some(gateway) = nic.gateway {
		s[24..28].copy_from_slice(&gateway);
	}
	if let Some(dns) = nic.dns.first() {
		s[40..44].copy_from_slice(dns);
	}
	s[70..76].copy_from_slice(&nic.mac_address);
	s
}

fn target_structure(target: &TargetInfo, name_off: (u16, u16)) -> Vec<u8> {
	let mut s = vec![0u8; 54];
	s[0] = STRUCT_ID_TARGET;
	s[1] = IBFT_REVISION;
	s[2..4].copy_from_slice(&54u16.to_le_bytes());
	s[4] = 3; // index
	s[5] = (StructFlags::BLOCK_VALID | StructFlags::BOOT_SELECTED).bits();
	s[6..10].copy_from_slice(&target.ip_address);
	s[10..12].copy_from_slice(&target.port.to_le_bytes());
	s[44..46].copy_from_slice(&name_off.0.to_le_bytes());
	s[46..48].copy_from_slice(&name_off.1.to_le_bytes());
	s
}

/// Appends a string to the heap and returns `(length, offset)`, the
/// pair every structure's string pointer fields record (offset is
/// relative to the start of the table, matching `ibft_set_string`).
fn push_string(heap: &mut Vec<u8>, s: &str) -> (u16, u16) {
	let offset = heap.len() as u16;
	heap.extend_from_slice(s.as_bytes());
	(s.len() as u16, offset)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn build_without_a_nic_is_invalid() {
		let builder = Builder::new().with_initiator(InitiatorInfo { name: "iqn.test".into() });
		assert_eq!(builder.build().unwrap_err(), Error::InvalidArg);
	}

	#[test]
	fn built_table_checksums_to_zero() {
		let builder = Builder::new()
			.with_nic(NicInfo {
				ip_address: [192, 168, 1, 50],
				subnet_mask_prefix: 24,
				gateway: Some([192, 168, 1, 1]),
				dns: vec![[192, 168, 1, 1]],
				mac_address: [0x52, 0x54, 0x00, 0x12, 0x34, 0x56],
			})
			.with_initiator(InitiatorInfo {
				name: "iqn.2026-01.org.pxeboot:client".into(),
			});
		let table = builder.build().unwrap();
		assert_eq!(&table[0..4], IBFT_SIGNATURE);
		let sum = table.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
		assert_eq!(sum, 0);
	}

	#[test]
	fn target_structure_is_addressable_when_present() {
		let builder = Builder::new()
			.with_nic(NicInfo {
				ip_address: [10, 0, 0, 2],
				subnet_mask_prefix: 8,
				gateway: None,
				dns: Vec::new(),
				mac_address: [0; 6],
			})
			.with_initiator(InitiatorInfo { name: "iqn.test".into() })
			.with_target(TargetInfo {
				ip_address: [10, 0, 0, 1],
				port: 3260,
				target_name: "iqn.2026-01.org.pxeboot:target".into(),
			});
		let table = builder.build().unwrap();
		let sum = table.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
		assert_eq!(sum, 0);
	}
}
