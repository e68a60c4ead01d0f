//! Initrd placement (spec §4.7 initrd placement algorithm): concatenate
//! whatever initrd images were downloaded, optionally wrapping each in a
//! `newc` cpio entry when it carries a name (mirroring how the original
//! synthesizes a single archive out of several named initrd images), and
//! find it a home below `initrd_addr_max` that doesn't collide with the
//! kernel's own protected-mode footprint.

use alloc::string::String;
use alloc::vec::Vec;

use pxeboot::error::{Error, Result};

/// One initrd as handed to the loader: raw bytes plus the filename it
/// was downloaded as, if any. A name turns the image into one entry of
/// a synthesized cpio archive instead of a raw standalone blob.
pub struct InitrdImage {
	pub name: Option<String>,
	pub data: Vec<u8>,
}

/// Where the finished initrd blob landed and how big it is, for
/// patching into the kernel header's `ramdisk_image`/`ramdisk_size`
/// fields.
pub struct Placed {
	pub address: u32,
	pub data: Vec<u8>,
}

/// Alignment the placed initrd's base address is rounded down to. The
/// boot protocol doesn't mandate a value; a 4 KiB page boundary is the
/// original's own conservative default.
const ALIGNMENT: u32 = 4096;

/// Builds the combined initrd blob and picks its load address: starting
/// from `initrd_addr_max` (clamped to the platform's actual top of
/// memory, rounded down to [`ALIGNMENT`]) and working down, rejecting
/// the placement if it would overlap the kernel's own
/// `[kernel_addr, kernel_addr + kernel_len)` range.
pub fn place(images: &[InitrdImage], initrd_addr_max: u32, kernel_addr: u32, kernel_len: u32) -> Result<Placed> {
	let data = build_archive(images);
	let len = data.len() as u32;

	let address = initrd_addr_max.saturating_sub(len) & !(ALIGNMENT - 1);
	let end = address.checked_add(len).ok_or(Error::NoBufs)?;
	if end > initrd_addr_max {
		return Err(Error::NoBufs);
	}

	let kernel_end = kernel_addr.checked_add(kernel_len).ok_or(Error::InvalidArg)?;
	let overlaps = address < kernel_end && kernel_addr < end;
	if overlaps {
		return Err(Error::NoBufs);
	}

	Ok(Placed { address, data })
}

/// Concatenates `images` into one blob. When any image carries a name,
/// the whole archive becomes a `newc` cpio stream (each named entry
/// gets a header, anonymous entries are concatenated as-is in between,
/// and a standard end-of-archive trailer is appended); with no names at
/// all the images are simply concatenated raw, which the kernel's
/// initramfs unpacker also accepts as a sequence of independently
/// decompressed segments.
fn build_archive(images: &[InitrdImage]) -> Vec<u8> {
	let any_named = images.iter().any(|image| image.name.is_some());
	let mut out = Vec::new();
	for (index, image) in images.iter().enumerate() {
		match &image.name {
			Some(name) => {
				out.extend_from_slice(&cpio_newc_header(name, image.data.len(), index as u32 + 1));
				pad_to_4(&mut out);
				out.extend_from_slice(&image.data);
				pad_to_4(&mut out);
			}
			None => out.extend_from_slice(&image.data),
		}
	}
	if any_named {
		out.extend_from_slice(&cpio_newc_header("TRAILER!!!", 0, 0));
		pad_to_4(&mut out);
		pad_to_4(&mut out);
	}
	out
}

fn pad_to_4(buf: &mut Vec<u8>) {
	let pad = (4 - buf.len() % 4) % 4;
	buf.extend(core::iter::repeat(0u8).take(pad));
}

/// Builds a 110-byte `newc` cpio header (the ASCII-hex format the Linux
/// initramfs unpacker expects). Mode/uid/gid/timestamps are zeroed,
/// which is exactly what a netboot initrd needs: the kernel only cares
/// about the header's magic, namesize and filesize fields to walk the
/// archive.
fn cpio_newc_header(name: &str, data_len: usize, ino: u32) -> Vec<u8> {
	let namesize = name.len() + 1; // including the NUL terminator
	let mode = if name == "TRAILER!!!" { 0 } else { 0o100644 };
	let mut header = Vec::with_capacity(110 + namesize);
	header.extend_from_slice(b"070701");
	push_hex8(&mut header, ino);
	push_hex8(&mut header, mode);
	push_hex8(&mut header, 0); // uid
	push_hex8(&mut header, 0); // gid
	push_hex8(&mut header, 1); // nlink
	push_hex8(&mut header, 0); // mtime
	push_hex8(&mut header, data_len as u32);
	push_hex8(&mut header, 0); // devmajor
	push_hex8(&mut header, 0); // devminor
	push_hex8(&mut header, 0); // rdevmajor
	push_hex8(&mut header, 0); // rdevminor
	push_hex8(&mut header, namesize as u32);
	push_hex8(&mut header, 0); // check
	header.extend_from_slice(name.as_bytes());
	header.push(0);
	header
}

fn push_hex8(buf: &mut Vec<u8>, value: u32) {
	let hex = "0123456789abcdef";
	let hex_bytes = hex.as_bytes();
	for shift in (0..8).rev() {
		let nibble = ((value >> (shift * 4)) & 0xf) as usize;
		buf.push(hex_bytes[nibble]);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unnamed_images_are_concatenated_raw() {
		let images = [
			InitrdImage { name: None, data: alloc::vec![1, 2, 3] },
			InitrdImage { name: None, data: alloc::vec![4, 5] },
		];
		assert_eq!(build_archive(&images), alloc::vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn named_images_produce_a_cpio_archive_with_a_trailer() {
		let images = [InitrdImage {
			name: Some("init".into()),
			data: alloc::vec![0xaa; 4],
		}];
		let archive = build_archive(&images);
		assert_eq!(&archive[0..6], b"070701");
		assert!(archive.windows(10).any(|w| w == b"TRAILER!!!"));
	}

	#[test]
	fn placement_rejects_overlap_with_the_kernel() {
		let images = [InitrdImage { name: None, data: alloc::vec![0u8; 8192] }];
		// kernel occupies [0x100000, 0x110000); ask for a ceiling right
		// at the kernel's end so the only room is inside it.
		let result = place(&images, 0x100000 + 4096, 0x100000, 0x10000);
		assert_eq!(result.unwrap_err(), Error::NoBufs);
	}

	#[test]
	fn placement_lands_below_the_ceiling_aligned() {
		let images = [InitrdImage { name: None, data: alloc::vec![0u8; 100] }];
		let placed = place(&images, 0x10000000, 0, 0).unwrap();
		assert_eq!(placed.address % ALIGNMENT, 0);
		assert!(placed.address + placed.data.len() as u32 <= 0x10000000);
	}
}
