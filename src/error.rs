//! The process-wide error taxonomy.
//!
//! Every fallible operation in this crate returns [`Result<T>`], a thin
//! wrapper around a compact, platform-neutral error enum. There is no
//! unwinding: every error exits through an ordinary return, and propagates
//! up an [`crate::xfer`] chain via `close(reason)` until it reaches the
//! originator of the top-level request.

use core::fmt;

/// A compact, platform-neutral error taxonomy.
///
/// Mirrors the small signed integer return codes of the system this crate
/// models: each variant also has a stable [`Error::code`] so it can cross a
/// wire boundary (CLI exit status, legacy protocol error codes) unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Operation would block; retry later. Never surfaced across an API
	/// boundary that returns [`Result`] — a component that cannot progress
	/// returns from its `poll` instead.
	#[error("operation would block")]
	Again,
	#[error("out of memory")]
	NoMem,
	#[error("invalid argument")]
	InvalidArg,
	#[error("no such entry")]
	NoEntry,
	#[error("entry already exists")]
	Exists,
	#[error("permission denied")]
	Permission,
	#[error("i/o error")]
	Io,
	#[error("timed out")]
	TimedOut,
	#[error("network unreachable")]
	NetUnreach,
	#[error("host unreachable")]
	HostUnreach,
	#[error("operation canceled")]
	Canceled,
	#[error("no buffers available")]
	NoBufs,
	#[error("not supported")]
	NotSupported,
	#[error("cryptographic verification failed")]
	VerifyFailed,
}

impl Error {
	/// Stable small signed integer for this error, for wire protocols and
	/// CLI exit statuses that need one.
	pub const fn code(self) -> i32 {
		match self {
			Error::Again => -1,
			Error::NoMem => -2,
			Error::InvalidArg => -3,
			Error::NoEntry => -4,
			Error::Exists => -5,
			Error::Permission => -6,
			Error::Io => -7,
			Error::TimedOut => -8,
			Error::NetUnreach => -9,
			Error::HostUnreach => -10,
			Error::Canceled => -11,
			Error::NoBufs => -12,
			Error::NotSupported => -13,
			Error::VerifyFailed => -14,
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Newtype wrapper so an [`Error`]'s numeric code can be displayed or
/// threaded through a wire format without re-deriving the mapping at each
/// call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub i32);

impl From<Error> for ErrorCode {
	fn from(e: Error) -> Self {
		ErrorCode(e.code())
	}
}

/// The result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codes_are_distinct_and_negative() {
		let all = [
			Error::Again,
			Error::NoMem,
			Error::InvalidArg,
			Error::NoEntry,
			Error::Exists,
			Error::Permission,
			Error::Io,
			Error::TimedOut,
			Error::NetUnreach,
			Error::HostUnreach,
			Error::Canceled,
			Error::NoBufs,
			Error::NotSupported,
			Error::VerifyFailed,
		];
		for (i, a) in all.iter().enumerate() {
			assert!(a.code() < 0);
			for b in &all[i + 1..] {
				assert_ne!(a.code(), b.code());
			}
		}
	}
}
