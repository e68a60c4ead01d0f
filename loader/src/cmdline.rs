//! Command-line placement (spec §4.7 "cmd_line_ptr vs magic-sidecar
//! command line placement"): protocol 2.02+ kernels take a flat 32-bit
//! physical address in `cmd_line_ptr`; earlier kernels expect a
//! `0xA33F`-magic sidecar structure at a fixed offset within the
//! real-mode segment, pointing to the command line with a 16-bit
//! near offset (so the text must live in the segment's first 64 KiB).
//! Grounded on the original's `bzimage_parse_cmdline`.

use alloc::vec::Vec;

use pxeboot::error::{Error, Result};

use crate::header::{self, Header, Version};

/// Offset of the legacy `cmdline_magic`/`cmdline_offset` sidecar within
/// the real-mode segment (Documentation/x86/boot.rst, historical
/// fields predating the 2.02 `cmd_line_ptr`).
const CMDLINE_MAGIC_OFFSET: usize = 0x20;
const CMDLINE_MAGIC: u16 = 0xa33f;

/// Also scans the command line for `vga=` and `mem=`, the two
/// directives the original's loader intercepts itself rather than
/// leaving for the kernel to parse (`bzimage_parse_cmdline`): `vga=`
/// feeds `vid_mode`, and `mem=` is surfaced for the caller to cap the
/// memory limit it reports through [`crate::Platform::memory_limit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsedDirectives {
	pub vid_mode: Option<u16>,
	pub mem_limit: Option<u64>,
}

pub fn scan_directives(cmdline: &str) -> ParsedDirectives {
	let mut parsed = ParsedDirectives::default();
	for word in cmdline.split_whitespace() {
		if let Some(value) = word.strip_prefix("vga=") {
			parsed.vid_mode = parse_vga_mode(value);
		} else if let Some(value) = word.strip_prefix("mem=") {
			parsed.mem_limit = parse_mem_size(value);
		}
	}
	parsed
}

fn parse_vga_mode(value: &str) -> Option<u16> {
	match value {
		"normal" => Some(0xffff),
		"ext" => Some(0xfffe),
		"ask" => Some(0xfffd),
		_ => value.parse::<u16>().ok(),
	}
}

fn parse_mem_size(value: &str) -> Option<u64> {
	let (digits, multiplier) = match value.chars().last() {
		Some('k') | Some('K') => (&value[..value.len() - 1], 1024u64),
		Some('m') | Some('M') => (&value[..value.len() - 1], 1024 * 1024),
		Some('g') | Some('G') => (&value[..value.len() - 1], 1024 * 1024 * 1024),
		_ => (value, 1),
	};
	digits.parse::<u64>().ok().map(|n| n * multiplier)
}

/// Appends the NUL-terminated command line to the end of `real_mode_image`
/// (well within the segment's first 64 KiB for any realistic setup-plus-
/// cmdline size) and patches whichever header field the protocol version
/// expects to find it through.
pub fn install(real_mode_image: &mut Vec<u8>, header: &Header, real_mode_addr: u32, cmdline: &str) -> Result<()> {
	let mut bytes = cmdline.as_bytes().to_vec();
	bytes.push(0);
	if bytes.len() as u32 > header.cmdline_size() + 1 {
		return Err(Error::InvalidArg);
	}

	let offset = real_mode_image.len();
	if offset + bytes.len() > 0xffff {
		return Err(Error::NoBufs);
	}
	real_mode_image.extend_from_slice(&bytes);

	if header.version.at_least(Version(0x0202)) {
		header::patch_cmd_line_ptr(real_mode_image, real_mode_addr + offset as u32);
	} else {
		write_sidecar(real_mode_image, offset as u16);
	}
	Ok(())
}

fn write_sidecar(image: &mut [u8], cmdline_offset: u16) {
	image[CMDLINE_MAGIC_OFFSET..CMDLINE_MAGIC_OFFSET + 2].copy_from_slice(&CMDLINE_MAGIC.to_le_bytes());
	image[CMDLINE_MAGIC_OFFSET + 2..CMDLINE_MAGIC_OFFSET + 4].copy_from_slice(&cmdline_offset.to_le_bytes());
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scans_vga_and_mem_directives() {
		let parsed = scan_directives("console=ttyS0 vga=791 mem=512M quiet");
		assert_eq!(parsed.vid_mode, Some(791));
		assert_eq!(parsed.mem_limit, Some(512 * 1024 * 1024));
	}

	#[test]
	fn oversized_cmdline_is_rejected() {
		let mut image = alloc::vec![0u8; 16];
		let header = crate::header::parse(&minimal_header_bytes(0x0206, 4)).unwrap();
		let long = "x".repeat(header.cmdline_size() as usize + 10);
		assert_eq!(install(&mut image, &header, 0x1000, &long).unwrap_err(), Error::InvalidArg);
	}

	fn minimal_header_bytes(version: u16, setup_sects: u8) -> alloc::vec::Vec<u8> {
		let mut image = alloc::vec![0u8; 0x300];
		image[0x1f1] = setup_sects;
		image[0x1fe..0x200].copy_from_slice(&0xaa55u16.to_le_bytes());
		image[0x202..0x206].copy_from_slice(b"HdrS");
		image[0x206..0x208].copy_from_slice(&version.to_le_bytes());
		image[0x22c..0x230].copy_from_slice(&0x7fffffffu32.to_le_bytes());
		image[0x238..0x23c].copy_from_slice(&255u32.to_le_bytes());
		image
	}
}
