//! A minimal TCP client: active-open handshake, then an ordered byte pipe
//! (spec §4.3 "TCP as ordered byte pipe"). There is no congestion control
//! and no per-segment retransmission queue — like the TCP this crate's
//! behavior is modeled on, the whole unacknowledged send buffer is
//! resent as one segment when the retry timer fires, which is adequate
//! for the short-lived HTTP downloads this crate uses TCP for.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::net::ipv4;
use crate::timer::{Instant, RetryTimer, TimerEvent};

pub const HLEN: usize = 20;

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct Flags: u8 {
		const FIN = 0x01;
		const SYN = 0x02;
		const RST = 0x04;
		const PSH = 0x08;
		const ACK = 0x10;
		const URG = 0x20;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
	pub src_port: u16,
	pub dst_port: u16,
	pub seq: u32,
	pub ack: u32,
	pub flags: Flags,
	pub window: u16,
}

pub fn parse_header(data: &[u8]) -> Result<(Header, &[u8])> {
	if data.len() < HLEN {
		return Err(Error::InvalidArg);
	}
	let data_offset = ((data[12] >> 4) as usize) * 4;
	if data_offset < HLEN || data_offset > data.len() {
		return Err(Error::InvalidArg);
	}
	let header = Header {
		src_port: u16::from_be_bytes([data[0], data[1]]),
		dst_port: u16::from_be_bytes([data[2], data[3]]),
		seq: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
		ack: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
		flags: Flags::from_bits_truncate(data[13]),
		window: u16::from_be_bytes([data[14], data[15]]),
	};
	Ok((header, &data[data_offset..]))
}

pub fn build_segment(
	src_ip: [u8; 4],
	dst_ip: [u8; 4],
	src_port: u16,
	dst_port: u16,
	seq: u32,
	ack: u32,
	flags: Flags,
	window: u16,
	payload: &[u8],
) -> Vec<u8> {
	let mut segment = Vec::with_capacity(HLEN + payload.len());
	segment.extend_from_slice(&src_port.to_be_bytes());
	segment.extend_from_slice(&dst_port.to_be_bytes());
	segment.extend_from_slice(&seq.to_be_bytes());
	segment.extend_from_slice(&ack.to_be_bytes());
	segment.push(((HLEN / 4) as u8) << 4);
	segment.push(flags.bits());
	segment.extend_from_slice(&window.to_be_bytes());
	segment.extend_from_slice(&[0, 0]); // checksum, filled below
	segment.extend_from_slice(&[0, 0]); // urgent pointer, unused
	segment.extend_from_slice(payload);
	let checksum = ipv4::pseudo_header_checksum(src_ip, dst_ip, 6, &segment);
	segment[16..18].copy_from_slice(&checksum.to_be_bytes());
	segment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	SynSent,
	Established,
	FinWait,
	Closed,
}

/// One TCP client connection: handshake state, retry timer, and the
/// ordered receive/send byte buffers higher layers read and write.
pub struct Connection {
	pub local_ip: [u8; 4],
	pub remote_ip: [u8; 4],
	pub local_port: u16,
	pub remote_port: u16,
	state: State,
	snd_una: u32,
	snd_nxt: u32,
	rcv_nxt: u32,
	send_buf: VecDeque<u8>,
	recv_buf: VecDeque<u8>,
	retry: RetryTimer,
}

impl Connection {
	/// Builds the initial SYN segment and the connection state awaiting
	/// its SYN-ACK.
	pub fn connect(local_ip: [u8; 4], remote_ip: [u8; 4], local_port: u16, remote_port: u16, isn: u32, now: Instant) -> (Self, Vec<u8>) {
		let mut retry = RetryTimer::new();
		retry.start(now);
		let syn = build_segment(local_ip, remote_ip, local_port, remote_port, isn, 0, Flags::SYN, u16::MAX, &[]);
		(
			Self {
				local_ip,
				remote_ip,
				local_port,
				remote_port,
				state: State::SynSent,
				snd_una: isn,
				snd_nxt: isn.wrapping_add(1),
				rcv_nxt: 0,
				send_buf: VecDeque::new(),
				recv_buf: VecDeque::new(),
				retry,
			},
			syn,
		)
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// Feeds an incoming segment, returning a reply segment to transmit
	/// (if any) and whether the handshake just completed.
	pub fn on_segment(&mut self, header: Header, payload: &[u8]) -> Result<Option<Vec<u8>>> {
		if header.flags.contains(Flags::RST) {
			self.state = State::Closed;
			return Err(Error::Canceled);
		}
		match self.state {
			State::SynSent => {
				if !header.flags.contains(Flags::SYN) || !header.flags.contains(Flags::ACK) {
					return Ok(None);
				}
				if header.ack != self.snd_nxt {
					return Err(Error::InvalidArg);
				}
				self.rcv_nxt = header.seq.wrapping_add(1);
				self.state = State::Established;
				self.retry.stop();
				Ok(Some(self.ack_segment(&[])))
			}
			State::Established | State::FinWait => {
				if header.seq != self.rcv_nxt {
					// strictly in-order delivery only, matching the rest of
					// this crate's reassembly policy.
					return Err(Error::InvalidArg);
				}
				if !payload.is_empty() {
					self.recv_buf.extend(payload.iter().copied());
					self.rcv_nxt = self.rcv_nxt.wrapping_add(payload.len() as u32);
				}
				if header.flags.contains(Flags::ACK) && header.ack > self.snd_una {
					let acked = header.ack.wrapping_sub(self.snd_una) as usize;
					self.send_buf.drain(..acked.min(self.send_buf.len()));
					self.snd_una = header.ack;
				}
				if header.flags.contains(Flags::FIN) {
					self.rcv_nxt = self.rcv_nxt.wrapping_add(1);
					self.state = State::Closed;
					return Ok(Some(self.ack_segment(&[])));
				}
				if payload.is_empty() {
					Ok(None)
				} else {
					Ok(Some(self.ack_segment(&[])))
				}
			}
			State::Closed => Ok(None),
		}
	}

	fn ack_segment(&self, payload: &[u8]) -> Vec<u8> {
		build_segment(
			self.local_ip,
			self.remote_ip,
			self.local_port,
			self.remote_port,
			self.snd_nxt,
			self.rcv_nxt,
			Flags::ACK,
			u16::MAX,
			payload,
		)
	}

	/// Queues `data` for transmission and returns the segment carrying it.
	pub fn send(&mut self, data: &[u8]) -> Result<Vec<u8>> {
		if self.state != State::Established {
			return Err(Error::InvalidArg);
		}
		self.send_buf.extend(data.iter().copied());
		let segment = build_segment(
			self.local_ip,
			self.remote_ip,
			self.local_port,
			self.remote_port,
			self.snd_nxt,
			self.rcv_nxt,
			Flags::ACK | Flags::PSH,
			u16::MAX,
			data,
		);
		self.snd_nxt = self.snd_nxt.wrapping_add(data.len() as u32);
		Ok(segment)
	}

	/// Builds a FIN segment and transitions toward close.
	pub fn close(&mut self) -> Vec<u8> {
		let segment = build_segment(
			self.local_ip,
			self.remote_ip,
			self.local_port,
			self.remote_port,
			self.snd_nxt,
			self.rcv_nxt,
			Flags::FIN | Flags::ACK,
			u16::MAX,
			&[],
		);
		self.snd_nxt = self.snd_nxt.wrapping_add(1);
		self.state = State::FinWait;
		segment
	}

	/// Drains and returns bytes delivered in order so far.
	pub fn recv(&mut self) -> Vec<u8> {
		self.recv_buf.drain(..).collect()
	}

	/// Polls the retry timer; `Some` means the handshake/last segment
	/// should be resent, `None` means either nothing is due or the
	/// connection has given up (`TimerEvent::TimedOut`, which also marks
	/// the connection closed).
	pub fn poll_retry(&mut self, now: Instant) -> Option<TimerEvent> {
		match self.retry.poll(now) {
			TimerEvent::Pending => None,
			TimerEvent::Expired => Some(TimerEvent::Expired),
			TimerEvent::TimedOut => {
				self.state = State::Closed;
				Some(TimerEvent::TimedOut)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn handshake_then_data_roundtrips() {
		let (mut conn, syn) = Connection::connect([10, 0, 0, 1], [10, 0, 0, 2], 4000, 80, 1000, 0);
		let (syn_hdr, _) = parse_header(&syn).unwrap();
		assert!(syn_hdr.flags.contains(Flags::SYN));

		let synack = build_segment([10, 0, 0, 2], [10, 0, 0, 1], 80, 4000, 5000, 1001, Flags::SYN | Flags::ACK, 1024, &[]);
		let (hdr, payload) = parse_header(&synack).unwrap();
		let reply = conn.on_segment(hdr, payload).unwrap();
		assert!(reply.is_some());
		assert_eq!(conn.state(), State::Established);

		let data_segment = build_segment([10, 0, 0, 2], [10, 0, 0, 1], 80, 4000, 5001, 1001, Flags::ACK | Flags::PSH, 1024, b"hi");
		let (hdr, payload) = parse_header(&data_segment).unwrap();
		conn.on_segment(hdr, payload).unwrap();
		assert_eq!(conn.recv(), b"hi");
	}

	#[test]
	fn out_of_order_data_is_rejected() {
		let (mut conn, _) = Connection::connect([10, 0, 0, 1], [10, 0, 0, 2], 4000, 80, 1000, 0);
		let synack = build_segment([10, 0, 0, 2], [10, 0, 0, 1], 80, 4000, 5000, 1001, Flags::SYN | Flags::ACK, 1024, &[]);
		let (hdr, payload) = parse_header(&synack).unwrap();
		conn.on_segment(hdr, payload).unwrap();

		let skipped = build_segment([10, 0, 0, 2], [10, 0, 0, 1], 80, 4000, 5050, 1001, Flags::ACK, 1024, b"late");
		let (hdr, payload) = parse_header(&skipped).unwrap();
		assert_eq!(conn.on_segment(hdr, payload), Err(Error::InvalidArg));
	}
}
