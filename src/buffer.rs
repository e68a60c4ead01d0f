//! [`Buffer`]: a heap-backed byte region with head/tail cursors.
//!
//! Mirrors `io_buffer` from the system this crate models, but replaces the
//! freely-transferred raw pointer with ordinary move semantics: every
//! `deliver`-style operation in this crate takes a `Buffer` by value, and
//! the type system forbids using it after the move (spec §9 "Buffer
//! ownership").

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// A contiguous byte region with reserved headroom and tailroom.
///
/// Invariant: `0 <= head <= data <= tail <= end` where `end` is
/// `storage.len()`, `head` is the start of reserved headroom, `data` is the
/// start of live payload and `tail` is one past the end of live payload.
#[derive(Debug, Clone)]
pub struct Buffer {
	storage: Vec<u8>,
	head: usize,
	data: usize,
	tail: usize,
}

impl Buffer {
	/// Allocates a new buffer of `capacity` bytes, entirely headroom.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			storage: alloc::vec![0u8; capacity],
			head: 0,
			data: 0,
			tail: 0,
		}
	}

	/// Wraps an already-filled byte vector as a buffer with no head/tail
	/// room: `data` spans the whole thing.
	pub fn from_vec(data: Vec<u8>) -> Self {
		let len = data.len();
		Self {
			storage: data,
			head: 0,
			data: 0,
			tail: len,
		}
	}

	/// Live payload length.
	pub fn len(&self) -> usize {
		self.tail - self.data
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn headroom(&self) -> usize {
		self.data - self.head
	}

	pub fn tailroom(&self) -> usize {
		self.storage.len() - self.tail
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.storage[self.data..self.tail]
	}

	pub fn as_mut_slice(&mut self) -> &mut [u8] {
		&mut self.storage[self.data..self.tail]
	}

	/// Reserves `n` bytes of headroom ahead of any existing payload,
	/// growing the backing storage if the current headroom is
	/// insufficient. Idempotent: reserving less than is already present is
	/// a no-op.
	pub fn reserve(&mut self, n: usize) {
		if self.headroom() >= n {
			return;
		}
		let shortfall = n - self.headroom();
		let mut grown = alloc::vec![0u8; shortfall];
		grown.extend_from_slice(&self.storage);
		self.storage = grown;
		self.head = 0;
		self.data += shortfall;
		self.tail += shortfall;
	}

	/// Prepends `n` bytes to the payload, returning a mutable view of the
	/// newly exposed region. Fails with [`Error::NoBufs`] if headroom is
	/// insufficient — callers that need growth must `reserve` first.
	pub fn push(&mut self, n: usize) -> Result<&mut [u8]> {
		if self.headroom() < n {
			return Err(Error::NoBufs);
		}
		self.data -= n;
		Ok(&mut self.storage[self.data..self.data + n])
	}

	/// Appends `n` bytes to the payload, returning a mutable view of the
	/// newly exposed region.
	pub fn put(&mut self, n: usize) -> Result<&mut [u8]> {
		if self.tailroom() < n {
			return Err(Error::NoBufs);
		}
		let start = self.tail;
		self.tail += n;
		Ok(&mut self.storage[start..self.tail])
	}

	/// Strips `n` bytes from the head of the payload, returning them.
	pub fn pull(&mut self, n: usize) -> Result<&[u8]> {
		if self.len() < n {
			return Err(Error::InvalidArg);
		}
		let start = self.data;
		self.data += n;
		Ok(&self.storage[start..start + n])
	}

	/// Strips `n` bytes from the tail of the payload.
	pub fn unput(&mut self, n: usize) -> Result<()> {
		if self.len() < n {
			return Err(Error::InvalidArg);
		}
		self.tail -= n;
		Ok(())
	}

	/// Appends bytes, growing tailroom if necessary (a convenience used by
	/// protocol parsers assembling a message over many deliveries).
	pub fn append(&mut self, bytes: &[u8]) {
		if self.tailroom() < bytes.len() {
			let shortfall = bytes.len() - self.tailroom();
			self.storage
				.extend(core::iter::repeat(0u8).take(shortfall));
		}
		let start = self.tail;
		self.tail += bytes.len();
		self.storage[start..self.tail].copy_from_slice(bytes);
	}

	/// Consumes the buffer, returning the live payload as an owned `Vec`.
	pub fn into_vec(mut self) -> Vec<u8> {
		self.storage.drain(..self.data);
		self.storage.truncate(self.len());
		self.storage
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_then_pull_roundtrips() {
		let mut buf = Buffer::with_capacity(32);
		buf.reserve(16);
		buf.push(4).unwrap().copy_from_slice(b"head");
		buf.put(4).unwrap().copy_from_slice(b"tail");
		assert_eq!(buf.as_slice(), b"headtail");
		assert_eq!(buf.pull(4).unwrap(), b"head");
		assert_eq!(buf.as_slice(), b"tail");
	}

	#[test]
	fn push_fails_without_headroom() {
		let mut buf = Buffer::with_capacity(4);
		assert_eq!(buf.push(1), Err(Error::NoBufs));
	}

	#[test]
	fn unput_shrinks_tail() {
		let mut buf = Buffer::with_capacity(8);
		buf.put(4).unwrap().copy_from_slice(b"data");
		buf.unput(2).unwrap();
		assert_eq!(buf.as_slice(), b"da");
	}

	#[test]
	fn into_vec_drops_head_and_tail_room() {
		let mut buf = Buffer::with_capacity(8);
		buf.reserve(2);
		buf.put(4).unwrap().copy_from_slice(b"data");
		assert_eq!(buf.into_vec(), b"data");
	}
}
