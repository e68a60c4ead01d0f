//! The Linux x86 boot protocol header (Documentation/x86/boot.rst),
//! read directly out of the byte slice rather than transmuted through a
//! `repr(C)` struct — consistent with how the rest of this workspace
//! parses untrusted wire data (see `pxeboot::proto::tftp`), and
//! necessary anyway since the header's field widths change across
//! protocol versions.

use bitflags::bitflags;

use pxeboot::error::{Error, Result};

const HEADER_OFFSET: usize = 0x1f1;
const BOOT_FLAG: u16 = 0xaa55;
const HDRS_SIGNATURE: &[u8; 4] = b"HdrS";

bitflags! {
	/// `loadflags` (Documentation/x86/boot.rst): only the two bits this
	/// loader acts on are named, the rest are passed through untouched.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct LoadFlags: u8 {
		/// Bit 0: the protected-mode half belongs at 1 MiB rather than
		/// the legacy 64 KiB load address.
		const LOAD_HIGH = 0x01;
		/// Bit 7: the bootloader may use the heap fields
		/// (`heap_end_ptr`), only meaningful once set by the loader itself.
		const CAN_USE_HEAP = 0x80;
	}
}

const OFF_SETUP_SECTS: usize = 0x1f1;
const OFF_BOOT_FLAG: usize = 0x1fe;
const OFF_HEADER: usize = 0x202;
const OFF_VERSION: usize = 0x206;
const OFF_LOADFLAGS: usize = 0x211;
const OFF_CODE32_START: usize = 0x214;
const OFF_RAMDISK_IMAGE: usize = 0x218;
const OFF_RAMDISK_SIZE: usize = 0x21c;
const OFF_HEAP_END_PTR: usize = 0x224;
const OFF_TYPE_OF_LOADER: usize = 0x210;
const OFF_CMD_LINE_PTR: usize = 0x228;
const OFF_INITRD_ADDR_MAX: usize = 0x22c;
const OFF_CMDLINE_SIZE: usize = 0x238;

const BZI_LOAD_LOW_ADDR: u32 = 0x10000;
const BZI_LOAD_HIGH_ADDR: u32 = 0x100000;
const DEFAULT_INITRD_ADDR_MAX: u32 = 0x37ffffff;
const DEFAULT_CMDLINE_SIZE: u32 = 255;

/// The loader id this firmware reports in `type_of_loader`. Unregistered
/// bootloaders (anything without an assigned id in the kernel's
/// `Documentation/x86/boot.rst`) use `0xff`.
const TYPE_OF_LOADER_UNREGISTERED: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version(pub u16);

impl Version {
	pub fn major(self) -> u8 {
		(self.0 >> 8) as u8
	}

	pub fn minor(self) -> u8 {
		self.0 as u8
	}

	pub fn at_least(self, other: Version) -> bool {
		self.0 >= other.0
	}
}

/// The header fields this loader actually acts on. Everything version-
/// gated below 2.00 (there is no real header at all, just the bare
/// `setup_sects`/`boot_flag` pair) degrades to the historical defaults
/// the boot protocol documents for that case.
#[derive(Debug, Clone, Copy)]
pub struct Header {
	pub version: Version,
	pub setup_sects: u8,
	pub loadflags: u8,
	pub code32_start: u32,
	pub(crate) initrd_addr_max: u32,
	pub(crate) cmdline_size: u32,
}

impl Header {
	pub fn load_high(&self) -> bool {
		self.loadflags & LOADFLAGS_LOAD_HIGH != 0
	}

	pub fn can_use_heap(&self) -> bool {
		self.loadflags & LOADFLAGS_CAN_USE_HEAP != 0
	}

	/// Number of 512-byte sectors making up the real-mode "setup" half,
	/// with the historical "zero means four" fallback
	/// (Documentation/x86/boot.rst, `setup_sects`).
	pub fn setup_sectors(&self) -> u32 {
		if self.setup_sects == 0 {
			4
		} else {
			self.setup_sects as u32
		}
	}

	/// Total length in bytes of the real-mode portion (setup sectors
	/// plus the one boot sector they follow).
	pub fn setup_len(&self) -> usize {
		((self.setup_sectors() + 1) * 512) as usize
	}

	pub fn protected_mode_addr(&self) -> u32 {
		if self.version.at_least(Version(0x0200)) && self.load_high() {
			BZI_LOAD_HIGH_ADDR
		} else {
			BZI_LOAD_LOW_ADDR
		}
	}

	pub fn initrd_addr_max(&self) -> u32 {
		self.initrd_addr_max
	}

	pub fn cmdline_size(&self) -> u32 {
		self.cmdline_size
	}
}

/// Parses the header out of a full kernel image. Validates `boot_flag`
/// (`0xAA55`) unconditionally; everything else degrades gracefully for
/// pre-2.00 images that predate the fields it would otherwise read.
pub fn parse(image: &[u8]) -> Result<Header> {
	if image.len() < HEADER_OFFSET + 1 {
		return Err(Error::InvalidArg);
	}
	let boot_flag = read_u16(image, OFF_BOOT_FLAG)?;
	if boot_flag != BOOT_FLAG {
		return Err(Error::InvalidArg);
	}

	let setup_sects = image[OFF_SETUP_SECTS];

	let has_hdrs = image.len() >= OFF_HEADER + 4 && &image[OFF_HEADER..OFF_HEADER + 4] == HDRS_SIGNATURE;
	let version = if has_hdrs {
		Version(read_u16(image, OFF_VERSION)?)
	} else {
		Version(0x0100)
	};

	let loadflags = if version.at_least(Version(0x0200)) { image[OFF_LOADFLAGS] } else { 0 };
	let code32_start = if version.at_least(Version(0x0200)) {
		read_u32(image, OFF_CODE32_START)?
	} else {
		BZI_LOAD_LOW_ADDR
	};

	let initrd_addr_max = if version.at_least(Version(0x0203)) {
		read_u32(image, OFF_INITRD_ADDR_MAX)?
	} else {
		DEFAULT_INITRD_ADDR_MAX
	};

	let cmdline_size = if version.at_least(Version(0x0206)) {
		read_u32(image, OFF_CMDLINE_SIZE)?
	} else {
		DEFAULT_CMDLINE_SIZE
	};

	Ok(Header {
		version,
		setup_sects,
		loadflags,
		code32_start,
		initrd_addr_max,
		cmdline_size,
	})
}

/// Patches the placed real-mode image in-place with the loader-owned
/// fields: loader id, heap flag/pointer, and (for 2.00+ images)
/// `ramdisk_image`/`ramdisk_size`. Called after [`parse`] once the
/// caller has decided where everything goes.
pub fn patch_loader_fields(image: &mut [u8], header: &Header, heap_end_ptr: u16) {
	if !header.version.at_least(Version(0x0200)) {
		return;
	}
	image[OFF_TYPE_OF_LOADER] = TYPE_OF_LOADER_UNREGISTERED;
	if header.version.at_least(Version(0x0201)) {
		image[OFF_LOADFLAGS] |= LOADFLAGS_CAN_USE_HEAP;
		write_u16(image, OFF_HEAP_END_PTR, heap_end_ptr);
	}
}

pub fn patch_ramdisk_fields(image: &mut [u8], address: u32, size: u32) {
	write_u32(image, OFF_RAMDISK_IMAGE, address);
	write_u32(image, OFF_RAMDISK_SIZE, size);
}

pub fn patch_cmd_line_ptr(image: &mut [u8], ptr: u32) {
	write_u32(image, OFF_CMD_LINE_PTR, ptr);
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
	let bytes: [u8; 2] = data.get(offset..offset + 2).ok_or(Error::InvalidArg)?.try_into().unwrap();
	Ok(u16::from_le_bytes(bytes))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
	let bytes: [u8; 4] = data.get(offset..offset + 4).ok_or(Error::InvalidArg)?.try_into().unwrap();
	Ok(u32::from_le_bytes(bytes))
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
	data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
	data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
	use super::*;

	fn minimal_image(version: u16, setup_sects: u8) -> alloc::vec::Vec<u8> {
		let mut image = alloc::vec![0u8; 0x300];
		image[OFF_SETUP_SECTS] = setup_sects;
		write_u16(&mut image, OFF_BOOT_FLAG, BOOT_FLAG);
		image[OFF_HEADER..OFF_HEADER + 4].copy_from_slice(HDRS_SIGNATURE);
		write_u16(&mut image, OFF_VERSION, version);
		write_u32(&mut image, OFF_INITRD_ADDR_MAX, 0x7fffffff);
		write_u32(&mut image, OFF_CMDLINE_SIZE, 2048);
		image
	}

	#[test]
	fn rejects_a_missing_boot_flag() {
		let image = alloc::vec![0u8; 0x300];
		assert_eq!(parse(&image).unwrap_err(), Error::InvalidArg);
	}

	#[test]
	fn zero_setup_sects_means_four() {
		let image = minimal_image(0x0206, 0);
		let header = parse(&image).unwrap();
		assert_eq!(header.setup_sectors(), 4);
		assert_eq!(header.setup_len(), 5 * 512);
	}

	#[test]
	fn load_high_picks_the_one_megabyte_address() {
		let mut image = minimal_image(0x0206, 8);
		image[OFF_LOADFLAGS] = LOADFLAGS_LOAD_HIGH;
		let header = parse(&image).unwrap();
		assert_eq!(header.protected_mode_addr(), BZI_LOAD_HIGH_ADDR);
	}

	#[test]
	fn pre_2_02_image_still_parses_with_legacy_defaults() {
		let mut image = alloc::vec![0u8; 0x300];
		write_u16(&mut image, OFF_BOOT_FLAG, BOOT_FLAG);
		image[OFF_SETUP_SECTS] = 0;
		// deliberately omit the "HdrS" signature entirely
		let header = parse(&image).unwrap();
		assert_eq!(header.version, Version(0x0100));
		assert_eq!(header.protected_mode_addr(), BZI_LOAD_LOW_ADDR);
		assert_eq!(header.initrd_addr_max(), DEFAULT_INITRD_ADDR_MAX);
		assert_eq!(header.cmdline_size(), DEFAULT_CMDLINE_SIZE);
	}
}
