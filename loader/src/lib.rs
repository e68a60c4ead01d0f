//! The bzImage loader (spec §4.7): parses a Linux x86 boot-protocol
//! kernel image, decides where its real-mode and protected-mode halves
//! belong in memory, places an optional initrd below the protocol's
//! `initrd_addr_max`, and prepares the final handoff. Grounded on the
//! original's `arch/x86/image/bzimage.c`.
//!
//! This crate has no notion of physical memory itself — reading image
//! bytes, writing placed segments out, and the final real-mode jump are
//! all performed through the [`Platform`] capability trait an embedding
//! loader supplies, the same external-collaborator pattern
//! [`pxeboot::timer::Clock`] and [`pxeboot::console::ConsoleWriter`]
//! use in the core crate.

#![no_std]

extern crate alloc;

pub mod cmdline;
pub mod handoff;
pub mod header;
pub mod initrd;

pub use handoff::{Platform, Placement};
pub use header::{Header, Version};

use alloc::vec::Vec;
use pxeboot::error::{Error, Result};

/// Drives a single bzImage load end to end: parse the header, compute
/// where everything goes, and hand the plan to `platform` to actually
/// write out and jump to.
pub fn load(image: &[u8], cmdline: &str, initrds: &[initrd::InitrdImage], platform: &mut dyn Platform) -> Result<()> {
	let header = header::parse(image)?;
	let setup_len = header.setup_len();
	if image.len() < setup_len {
		return Err(Error::InvalidArg);
	}

	let layout = handoff::Layout::compute(&header, cmdline, platform.memory_limit());
	let initrd_plan = if initrds.is_empty() {
		None
	} else {
		Some(initrd::place(initrds, header.initrd_addr_max(), layout.protected_mode_addr, layout.protected_mode_len)?)
	};

	let mut real_mode_image: Vec<u8> = image[..setup_len].to_vec();
	header::patch_loader_fields(&mut real_mode_image, &header, layout.heap_end as u16);
	cmdline::install(&mut real_mode_image, &header, layout.real_mode_addr, cmdline)?;
	if let Some(plan) = &initrd_plan {
		header::patch_ramdisk_fields(&mut real_mode_image, plan.address, plan.data.len() as u32);
	}

	platform.write_physical(layout.real_mode_addr, &real_mode_image);
	platform.write_physical(layout.protected_mode_addr, &image[setup_len..]);
	if let Some(plan) = &initrd_plan {
		platform.write_physical(plan.address, &plan.data);
	}

	platform.shutdown_boot();
	platform.jump_to_kernel(Placement {
		real_mode_segment: (layout.real_mode_addr / 16) as u16,
		entry_offset: handoff::REAL_MODE_ENTRY_OFFSET,
		stack_segment: (layout.real_mode_addr / 16) as u16,
		stack_pointer: layout.heap_end as u16,
	})
}
