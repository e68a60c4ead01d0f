//! TFTP client (spec §4.4): RRQ → OACK/first-DATA → ACK/DATA loop → final
//! ACK, with RFC 2347/2348/2349 option negotiation (`blksize`, `tsize`,
//! `windowsize`).

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::timer::{Instant, RetryTimer, TimerEvent};

const OPCODE_RRQ: u16 = 1;
const OPCODE_DATA: u16 = 3;
const OPCODE_ACK: u16 = 4;
const OPCODE_ERROR: u16 = 5;
const OPCODE_OACK: u16 = 6;

const MIN_BLKSIZE: u16 = 8;

/// Options requested in the RRQ and, once negotiated, what the server
/// actually agreed to (spec §11 "windowsize ACK cadence defaulting to 1"
/// when the server does not support it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	pub blksize: u16,
	pub tsize: Option<u64>,
	pub windowsize: u16,
}

impl Options {
	/// Clamps `blksize` into `[8, mtu - 4]` (spec §4.4), leaving
	/// `windowsize` defaulted to 1 (ack every block) until negotiation
	/// says otherwise.
	pub fn requested(mtu: usize, tsize_probe: bool) -> Self {
		let max = (mtu.saturating_sub(4)).max(MIN_BLKSIZE as usize) as u16;
		Self {
			blksize: max.max(MIN_BLKSIZE),
			tsize: if tsize_probe { Some(0) } else { None },
			windowsize: 1,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	SentRrq,
	OptionAckExpected,
	Receiving,
	Done,
}

/// What the caller should do after feeding a packet to a [`Session`]:
/// zero or more of "deliver this payload upstream" and "send this
/// datagram back to the server" can apply to the same incoming packet
/// (e.g. the block that completes a window carries data to deliver *and*
/// triggers an ACK).
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Event {
	pub data: Option<Vec<u8>>,
	pub send: Option<Vec<u8>>,
	pub done: bool,
}

pub struct Session {
	state: State,
	filename: String,
	requested: Options,
	negotiated: Options,
	server_port: Option<u16>,
	next_block: u16,
	blocks_since_ack: u16,
	retry: RetryTimer,
	bytes_transferred: u64,
}

impl Session {
	/// Builds the initial RRQ and a session awaiting its reply.
	pub fn open(filename: &str, requested: Options, now: Instant) -> (Self, Vec<u8>) {
		let mut retry = RetryTimer::new();
		retry.start(now);
		let session = Self {
			state: State::SentRrq,
			filename: filename.to_string(),
			requested,
			negotiated: requested,
			server_port: None,
			next_block: 1,
			blocks_since_ack: 0,
			retry,
			bytes_transferred: 0,
		};
		let packet = session.build_rrq();
		(session, packet)
	}

	fn build_rrq(&self) -> Vec<u8> {
		let mut packet = Vec::new();
		packet.extend_from_slice(&OPCODE_RRQ.to_be_bytes());
		packet.extend_from_slice(self.filename.as_bytes());
		packet.push(0);
		packet.extend_from_slice(b"octet");
		packet.push(0);
		push_option(&mut packet, "blksize", &self.requested.blksize.to_string());
		if self.requested.tsize.is_some() {
			push_option(&mut packet, "tsize", "0");
		}
		if self.requested.windowsize > 1 {
			push_option(&mut packet, "windowsize", &self.requested.windowsize.to_string());
		}
		packet
	}

	pub fn bytes_transferred(&self) -> u64 {
		self.bytes_transferred
	}

	pub fn is_done(&self) -> bool {
		self.state == State::Done
	}

	/// Feeds one received UDP payload (from the server's TID) into the
	/// session.
	pub fn on_packet(&mut self, data: &[u8], src_port: u16, now: Instant) -> Result<Event> {
		if data.len() < 2 {
			return Err(Error::InvalidArg);
		}
		let opcode = u16::from_be_bytes([data[0], data[1]]);
		if let Some(bound) = self.server_port {
			if bound != src_port {
				// a packet from a different TID than the one that answered
				// our RRQ: ignore it rather than letting it derail the
				// transfer.
				return Ok(Event::default());
			}
		} else {
			self.server_port = Some(src_port);
		}

		if opcode == OPCODE_ERROR {
			self.state = State::Done;
			return Err(tftp_error_to_crate_error(data));
		}

		match self.state {
			State::SentRrq => match opcode {
				OPCODE_OACK => {
					self.negotiated = parse_oack(&data[2..], self.requested);
					self.state = State::OptionAckExpected;
					self.retry.stop();
					Ok(Event::default())
				}
				OPCODE_DATA => {
					// server ignored every option: fall back to defaults.
					self.negotiated = Options { blksize: 512, tsize: None, windowsize: 1 };
					self.state = State::Receiving;
					self.retry.stop();
					self.handle_data(&data[2..], now)
				}
				_ => Err(Error::InvalidArg),
			},
			State::OptionAckExpected => match opcode {
				OPCODE_DATA => {
					self.state = State::Receiving;
					self.handle_data(&data[2..], now)
				}
				_ => Err(Error::InvalidArg),
			},
			State::Receiving => match opcode {
				OPCODE_DATA => self.handle_data(&data[2..], now),
				_ => Err(Error::InvalidArg),
			},
			State::Done => Ok(Event::default()),
		}
	}

	/// Parses a DATA block, in order, and decides whether to surface the
	/// payload, ack it (window complete or final short block), or both.
	fn handle_data(&mut self, rest: &[u8], now: Instant) -> Result<Event> {
		if rest.len() < 2 {
			return Err(Error::InvalidArg);
		}
		let block = u16::from_be_bytes([rest[0], rest[1]]);
		if block == self.next_block.wrapping_sub(1) {
			// The server never saw our ACK and retransmitted the block we
			// already have; re-send the last ACK instead of waiting on the
			// server's own retransmit timer to eventually retry again
			// (spec §4.4 "DATA block N-1 (duplicate): re-send the last ACK
			// without advancing").
			return Ok(Event { data: None, send: Some(build_ack(block)), done: false });
		}
		if block != self.next_block {
			// Strictly in-order; anything beyond N-1 that isn't the next
			// expected block is out of window and simply ignored (spec
			// §4.4 "DATA block > next-expected: ignore").
			return Ok(Event::default());
		}
		let payload = &rest[2..];
		self.bytes_transferred += payload.len() as u64;
		self.next_block = self.next_block.wrapping_add(1);
		self.blocks_since_ack += 1;
		self.retry.start(now);

		let is_final = payload.len() < self.negotiated.blksize as usize;
		let window_full = self.blocks_since_ack >= self.negotiated.windowsize;
		let mut event = Event { data: Some(payload.to_vec()), send: None, done: false };
		if is_final || window_full {
			let ack_block = self.next_block.wrapping_sub(1);
			self.blocks_since_ack = 0;
			event.send = Some(build_ack(ack_block));
			if is_final {
				self.state = State::Done;
				event.done = true;
			}
		}
		Ok(event)
	}

	/// Retransmits the last unacked packet if the retry timer has fired.
	pub fn poll_retry(&mut self, now: Instant, last_sent: &[u8]) -> Option<RetryOutcome> {
		match self.retry.poll(now) {
			TimerEvent::Pending => None,
			TimerEvent::Expired => Some(RetryOutcome::Resend(last_sent.to_vec())),
			TimerEvent::TimedOut => {
				self.state = State::Done;
				Some(RetryOutcome::TimedOut)
			}
		}
	}
}

pub enum RetryOutcome {
	Resend(Vec<u8>),
	TimedOut,
}

fn build_ack(block: u16) -> Vec<u8> {
	let mut packet = Vec::with_capacity(4);
	packet.extend_from_slice(&OPCODE_ACK.to_be_bytes());
	packet.extend_from_slice(&block.to_be_bytes());
	packet
}

fn push_option(packet: &mut Vec<u8>, name: &str, value: &str) {
	packet.extend_from_slice(name.as_bytes());
	packet.push(0);
	packet.extend_from_slice(value.as_bytes());
	packet.push(0);
}

fn parse_oack(mut rest: &[u8], requested: Options) -> Options {
	let mut negotiated = Options { blksize: 512, tsize: None, windowsize: 1 };
	while let Some((name, value, tail)) = split_cstr_pair(rest) {
		match name.as_str() {
			"blksize" => {
				if let Ok(v) = value.parse::<u16>() {
					negotiated.blksize = v.clamp(MIN_BLKSIZE, requested.blksize);
				}
			}
			"tsize" => {
				negotiated.tsize = value.parse::<u64>().ok();
			}
			"windowsize" => {
				if let Ok(v) = value.parse::<u16>() {
					negotiated.windowsize = v.max(1);
				}
			}
			_ => {}
		}
		rest = tail;
	}
	negotiated
}

fn split_cstr_pair(data: &[u8]) -> Option<(String, String, &[u8])> {
	let first_nul = data.iter().position(|&b| b == 0)?;
	let name = core::str::from_utf8(&data[..first_nul]).ok()?.to_string();
	let rest = &data[first_nul + 1..];
	let second_nul = rest.iter().position(|&b| b == 0)?;
	let value = core::str::from_utf8(&rest[..second_nul]).ok()?.to_string();
	Some((name, value, &rest[second_nul + 1..]))
}

fn tftp_error_to_crate_error(data: &[u8]) -> Error {
	if data.len() < 4 {
		return Error::Io;
	}
	match u16::from_be_bytes([data[2], data[3]]) {
		1 => Error::NoEntry,
		2 => Error::Permission,
		3 => Error::NoBufs,
		_ => Error::Io,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn negotiates_blksize_down_to_server_offer() {
		let requested = Options::requested(1500, false);
		let mut oack = Vec::new();
		oack.extend_from_slice(&OPCODE_OACK.to_be_bytes());
		push_option(&mut oack, "blksize", "1024");
		let (mut session, _rrq) = Session::open("pxelinux.0", requested, 0);
		let event = session.on_packet(&oack, 55000, 0).unwrap();
		assert!(event.data.is_none() && event.send.is_none());
		assert_eq!(session.negotiated.blksize, 1024);
	}

	#[test]
	fn final_short_block_completes_transfer() {
		let requested = Options { blksize: 512, tsize: None, windowsize: 1 };
		let (mut session, _rrq) = Session::open("file.bin", requested, 0);
		let mut data = Vec::new();
		data.extend_from_slice(&OPCODE_DATA.to_be_bytes());
		data.extend_from_slice(&1u16.to_be_bytes());
		data.extend_from_slice(b"short block under 512 bytes");
		let event = session.on_packet(&data, 55000, 0).unwrap();
		assert!(event.send.is_some());
		assert!(event.done);
		assert!(session.is_done());
	}

	#[test]
	fn window_completes_before_final_block() {
		let requested = Options { blksize: 4, tsize: None, windowsize: 2 };
		let (mut session, _rrq) = Session::open("file.bin", requested, 0);
		let mut first = Vec::new();
		first.extend_from_slice(&OPCODE_DATA.to_be_bytes());
		first.extend_from_slice(&1u16.to_be_bytes());
		first.extend_from_slice(b"aaaa");
		let event = session.on_packet(&first, 55000, 0).unwrap();
		assert!(event.send.is_none(), "window of 2 shouldn't ack after only one block");

		let mut second = Vec::new();
		second.extend_from_slice(&OPCODE_DATA.to_be_bytes());
		second.extend_from_slice(&2u16.to_be_bytes());
		second.extend_from_slice(b"bbbb");
		let event = session.on_packet(&second, 55000, 0).unwrap();
		assert!(event.send.is_some());
		assert!(!event.done);
	}

	#[test]
	fn duplicate_of_last_block_resends_its_ack() {
		let requested = Options { blksize: 512, tsize: None, windowsize: 1 };
		let (mut session, _) = Session::open("file.bin", requested, 0);
		let mut data = Vec::new();
		data.extend_from_slice(&OPCODE_DATA.to_be_bytes());
		data.extend_from_slice(&1u16.to_be_bytes());
		data.extend_from_slice(&[0u8; 512]);
		let first = session.on_packet(&data, 55000, 0).unwrap();
		assert_eq!(first.send, Some(build_ack(1)));

		// The server never saw our ACK and retransmitted block 1: we must
		// re-send that ACK rather than silently drop the packet (spec
		// §4.4 "DATA block N-1 (duplicate): re-send the last ACK without
		// advancing").
		let event = session.on_packet(&data, 55000, 0).unwrap();
		assert!(event.data.is_none());
		assert_eq!(event.send, Some(build_ack(1)));
		assert!(!event.done);
	}

	#[test]
	fn block_past_next_expected_is_ignored() {
		let requested = Options { blksize: 512, tsize: None, windowsize: 1 };
		let (mut session, _) = Session::open("file.bin", requested, 0);
		let mut block3 = Vec::new();
		block3.extend_from_slice(&OPCODE_DATA.to_be_bytes());
		block3.extend_from_slice(&3u16.to_be_bytes());
		block3.extend_from_slice(&[0u8; 512]);
		// next_block is still 1; block 3 is neither the next expected block
		// nor its immediate predecessor, so it is dropped outright.
		let event = session.on_packet(&block3, 55000, 0).unwrap();
		assert_eq!(event, Event::default());
	}

	#[test]
	fn error_packet_maps_to_crate_error() {
		let requested = Options::requested(1500, false);
		let (mut session, _) = Session::open("missing", requested, 0);
		let mut err = Vec::new();
		err.extend_from_slice(&OPCODE_ERROR.to_be_bytes());
		err.extend_from_slice(&1u16.to_be_bytes());
		err.extend_from_slice(b"File not found\0");
		assert_eq!(session.on_packet(&err, 55000, 0), Err(Error::NoEntry));
	}
}
