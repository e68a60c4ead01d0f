//! The interactive command surface (spec §6 "CLI surface"): `dhcp`,
//! `autoboot`, `boot <uri>`, `config`, `shell`, and `exit`, with exit
//! codes drawn straight from [`crate::error::Error::code`]. Modeled on
//! the line-buffering/command-table shape of this crate's `no_std`
//! ancestor's own interactive shell, but rebuilt around the cooperative
//! poll loop (spec §4.9): there is no executor to `.await` a line from,
//! so the line editor is fed one byte at a time by whatever owns the
//! console and is driven forward by [`crate::scheduler::Process::step`]
//! rather than blocking for input.
//!
//! Behind the `shell` feature this doubles as a free-standing REPL
//! (`Shell::step` reads bytes pushed in by the console driver and echoes
//! them back); with the feature disabled only [`parse_line`] and
//! [`exit_code`] are compiled, for platforms that just want to run one
//! scripted command non-interactively.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{Error, Result};

/// A single parsed command line (spec §6's CLI surface).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// Runs DHCP discovery on the given NetDevice name (or the first
	/// device if none is named).
	Dhcp { device: Option<String> },
	/// Runs the configured default boot action without prompting.
	Autoboot,
	/// Downloads and boots the image named by `uri`.
	Boot { uri: String },
	/// Prints (or, with `set`, modifies) the settings tree.
	Config { args: Vec<String> },
	/// Enters (or, already interactive, is a no-op within) the shell.
	Shell,
	/// Leaves the shell / stops processing the script.
	Exit,
	/// Anything that didn't match a known verb.
	Unknown(String),
	/// An empty line; never dispatched, just swallowed by the reader.
	Empty,
}

/// Splits `line` on whitespace and classifies it. Never fails — an
/// unrecognized verb becomes [`Command::Unknown`] rather than an error,
/// since the caller decides how to report that (spec §6 leaves the
/// exact wording of CLI diagnostics unspecified).
pub fn parse_line(line: &str) -> Command {
	let mut words = line.split_whitespace();
	match words.next() {
		None => Command::Empty,
		Some("dhcp") => Command::Dhcp {
			device: words.next().map(ToString::to_string),
		},
		Some("autoboot") => Command::Autoboot,
		Some("boot") => match words.next() {
			Some(uri) => Command::Boot { uri: uri.to_string() },
			None => Command::Unknown(line.to_string()),
		},
		Some("config") => Command::Config {
			args: words.map(ToString::to_string).collect(),
		},
		Some("shell") => Command::Shell,
		Some("exit") | Some("quit") => Command::Exit,
		Some(_) => Command::Unknown(line.to_string()),
	}
}

/// Maps a command's outcome to a process exit code: `0` for success,
/// the error taxonomy's small negative `code()` otherwise (spec §6 "exit
/// codes mapped from the error taxonomy").
pub fn exit_code(result: Result<()>) -> i32 {
	match result {
		Ok(()) => 0,
		Err(err) => err.code(),
	}
}

#[cfg(feature = "shell")]
pub use shell::Shell;

#[cfg(feature = "shell")]
mod shell {
	use super::{parse_line, Command};
	use alloc::string::String;
	use alloc::vec::Vec;

	const BACKSPACE: u8 = 0x08;
	const DELETE: u8 = 0x7f;
	const ENTER: u8 = b'\r';
	const LINE_FEED: u8 = b'\n';

	/// A byte-at-a-time line editor: the single-threaded counterpart of
	/// the teacher ancestor's async `Shell::run_async`, with the same
	/// backspace/enter handling but no cursor movement (arrow-key
	/// editing needs a smarter terminal than this firmware's console
	/// abstraction provides) and no history.
	pub struct Shell {
		buffer: String,
		history: Vec<String>,
	}

	impl Shell {
		pub fn new() -> Self {
			Self {
				buffer: String::new(),
				history: Vec::new(),
			}
		}

		/// Feeds one input byte. Returns a parsed [`Command`] once a
		/// line has been completed (on `\r` or `\n`), echoing it (and
		/// the printable character itself) to the console as it goes.
		pub fn feed_byte(&mut self, byte: u8) -> Option<Command> {
			match byte {
				ENTER | LINE_FEED => {
					crate::console::ConsoleSink::write_str("\r\n");
					let line = core::mem::take(&mut self.buffer);
					let command = parse_line(&line);
					if !line.is_empty() {
						self.history.push(line);
					}
					Some(command)
				}
				BACKSPACE | DELETE => {
					if self.buffer.pop().is_some() {
						crate::console::ConsoleSink::write_str("\u{8} \u{8}");
					}
					None
				}
				byte if byte.is_ascii_graphic() || byte == b' ' => {
					self.buffer.push(byte as char);
					let mut echoed = [0u8; 1];
					echoed[0] = byte;
					if let Ok(s) = core::str::from_utf8(&echoed) {
						crate::console::ConsoleSink::write_str(s);
					}
					None
				}
				_ => None,
			}
		}

		pub fn history(&self) -> &[String] {
			&self.history
		}
	}

	impl Default for Shell {
		fn default() -> Self {
			Self::new()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::vec;

	#[test]
	fn parses_boot_with_a_uri() {
		assert_eq!(
			parse_line("boot tftp://10.0.0.1/vmlinuz"),
			Command::Boot {
				uri: "tftp://10.0.0.1/vmlinuz".to_string()
			}
		);
	}

	#[test]
	fn bare_boot_is_unknown() {
		assert_eq!(parse_line("boot"), Command::Unknown("boot".to_string()));
	}

	#[test]
	fn dhcp_without_a_device_name_targets_none() {
		assert_eq!(parse_line("dhcp"), Command::Dhcp { device: None });
	}

	#[test]
	fn dhcp_with_a_device_name() {
		assert_eq!(
			parse_line("dhcp eth0"),
			Command::Dhcp {
				device: Some("eth0".to_string())
			}
		);
	}

	#[test]
	fn config_collects_trailing_args() {
		assert_eq!(
			parse_line("config set net0/ip 10.0.0.5"),
			Command::Config {
				args: vec!["set".to_string(), "net0/ip".to_string(), "10.0.0.5".to_string()]
			}
		);
	}

	#[test]
	fn blank_line_is_empty() {
		assert_eq!(parse_line("   "), Command::Empty);
	}

	#[test]
	fn exit_code_maps_ok_to_zero_and_errors_to_their_code() {
		assert_eq!(exit_code(Ok(())), 0);
		assert_eq!(exit_code(Err(Error::NoEntry)), Error::NoEntry.code());
	}

	#[cfg(feature = "shell")]
	#[test]
	fn shell_completes_a_line_on_enter() {
		let mut shell = shell::Shell::new();
		for byte in b"boot x" {
			assert!(shell.feed_byte(*byte).is_none());
		}
		let command = shell.feed_byte(b'\r').unwrap();
		assert_eq!(command, Command::Boot { uri: "x".to_string() });
	}

	#[cfg(feature = "shell")]
	#[test]
	fn shell_backspace_edits_the_pending_line() {
		let mut shell = shell::Shell::new();
		shell.feed_byte(b'a');
		shell.feed_byte(b'b');
		shell.feed_byte(0x08); // backspace
		shell.feed_byte(b'c');
		let command = shell.feed_byte(b'\r').unwrap();
		assert_eq!(command, Command::Unknown("ac".to_string()));
	}
}
