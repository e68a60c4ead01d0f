//! A self-contained network bootstrap firmware library: a PXE/iPXE-class
//! NetDevice core, a TFTP/HTTP/NFS download pipeline, and a bzImage
//! loader, all driven by a single-threaded cooperative poll loop.
//!
//! This crate has no entry point of its own — it is a library that an
//! embedding platform (a UEFI application, a BIOS option ROM runtime, a
//! hypervisor firmware image) links against, supplying the handful of
//! external capabilities this crate cannot provide itself: a monotonic
//! clock ([`timer::Clock`]), a console sink ([`console::ConsoleWriter`]),
//! a virtio transport ([`drivers::net::virtio_net::VirtioTransport`], if
//! the `virtio-net` feature is enabled), and the loader's handoff
//! primitives (see the `pxeboot-loader` crate).

#![no_std]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "acpi")]
pub mod acpi;
pub mod buffer;
pub mod cli;
pub mod console;
#[cfg(feature = "crypto")]
pub mod crypto;
pub mod drivers;
pub mod error;
pub mod logging;
pub mod net;
pub mod proto;
pub mod scheduler;
pub mod settings;
pub mod timer;

pub use buffer::Buffer;
pub use error::{Error, Result};
