//! Process-wide logging, backed by the `log` facade.
//!
//! The teacher's original `KernelLogger`/`LOGGER` pair printed straight to
//! the active console device behind a level filter; we keep that shape but
//! route through `log::Log` so every module can just use
//! `log::{info,warn,debug,error,trace}!` instead of a crate-local macro.

use core::fmt::Write as _;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::console::ConsoleSink;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
	fn enabled(&self, metadata: &Metadata<'_>) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record<'_>) {
		if !self.enabled(record.metadata()) {
			return;
		}
		let tag = match record.level() {
			Level::Error => "ERROR",
			Level::Warn => "WARN ",
			Level::Info => "INFO ",
			Level::Debug => "DEBUG",
			Level::Trace => "TRACE",
		};
		let mut line = heapless::String::<256>::new();
		let _ = write!(line, "[{tag}] {}\n", record.args());
		ConsoleSink::write_str(&line);
	}

	fn flush(&self) {}
}

/// Installs the console logger as the global `log` backend.
///
/// Idempotent: calling this more than once is harmless, matching the
/// teacher's `logging::init()` which is likewise called once from the boot
/// path but tolerant of re-entry during tests.
pub fn init(level: LevelFilter) {
	log::set_max_level(level);
	// `set_logger` only errors if a logger is already installed; that is
	// not a failure condition here, every caller wants the same logger.
	let _ = log::set_logger(&LOGGER);
}
