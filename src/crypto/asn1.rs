//! A minimal DER cursor, grounded on the original's `asn1_start`/
//! `asn1_enter`/`asn1_skip` family (`crypto/asn1.c`): enough BER/DER
//! navigation to walk a CMS `SignedData` and an X.509 certificate
//! without a general-purpose ASN.1 library. Only definite-length
//! encodings are handled, which is all CMS/X.509 ever produce.

use crate::error::{Error, Result};

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;

/// Builds the tag byte for a context-specific constructed tag, e.g.
/// `[0]` EXPLICIT as CMS and X.509 both use for optional fields.
pub const fn context_tag(number: u8) -> u8 {
	0xa0 | number
}

/// A parsed `(tag, contents)` pair plus whatever bytes followed it.
pub struct Tlv<'a> {
	pub tag: u8,
	pub contents: &'a [u8],
	pub rest: &'a [u8],
}

/// Reads one tag-length-value from the front of `data`.
pub fn read_tlv(data: &[u8]) -> Result<Tlv<'_>> {
	if data.len() < 2 {
		return Err(Error::InvalidArg);
	}
	let tag = data[0];
	let (len, header_len) = read_length(&data[1..])?;
	let header_len = header_len + 1;
	if data.len() < header_len + len {
		return Err(Error::InvalidArg);
	}
	Ok(Tlv {
		tag,
		contents: &data[header_len..header_len + len],
		rest: &data[header_len + len..],
	})
}

/// Parses a DER length field, returning `(length, bytes_consumed)`.
fn read_length(data: &[u8]) -> Result<(usize, usize)> {
	let first = *data.first().ok_or(Error::InvalidArg)?;
	if first & 0x80 == 0 {
		return Ok((first as usize, 1));
	}
	let num_bytes = (first & 0x7f) as usize;
	if num_bytes == 0 || num_bytes > core::mem::size_of::<usize>() {
		return Err(Error::InvalidArg);
	}
	if data.len() < 1 + num_bytes {
		return Err(Error::InvalidArg);
	}
	let mut len = 0usize;
	for &byte in &data[1..1 + num_bytes] {
		len = (len << 8) | byte as usize;
	}
	Ok((len, 1 + num_bytes))
}

/// Reads a TLV expected to carry a specific tag, erroring otherwise.
/// Mirrors `asn1_enter`'s tag check.
pub fn expect_tlv(data: &[u8], expected_tag: u8) -> Result<Tlv<'_>> {
	let tlv = read_tlv(data)?;
	if tlv.tag != expected_tag {
		return Err(Error::InvalidArg);
	}
	Ok(tlv)
}

/// Reads a DER `INTEGER`'s contents as an unsigned big-endian magnitude,
/// stripping a single leading `0x00` padding byte if present (required
/// whenever the high bit of the true value is set, since DER integers
/// are signed).
pub fn read_unsigned_integer(data: &[u8]) -> Result<&[u8]> {
	let tlv = expect_tlv(data, TAG_INTEGER)?;
	let contents = tlv.contents;
	if contents.len() > 1 && contents[0] == 0x00 {
		Ok(&contents[1..])
	} else {
		Ok(contents)
	}
}

/// Reads a `BIT STRING`'s contents, dropping the one-byte unused-bit
/// count (always `0` for the DER-encoded keys and signatures this crate
/// parses).
pub fn read_bit_string(data: &[u8]) -> Result<&[u8]> {
	let tlv = expect_tlv(data, TAG_BIT_STRING)?;
	let contents = tlv.contents;
	if contents.is_empty() {
		return Err(Error::InvalidArg);
	}
	Ok(&contents[1..])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_short_form_length() {
		let data = [TAG_SEQUENCE, 0x02, 0xaa, 0xbb, 0xff];
		let tlv = read_tlv(&data).unwrap();
		assert_eq!(tlv.contents, &[0xaa, 0xbb]);
		assert_eq!(tlv.rest, &[0xff]);
	}

	#[test]
	fn reads_long_form_length() {
		let mut data = alloc::vec![TAG_OCTET_STRING, 0x81, 130];
		data.extend(core::iter::repeat(0x42u8).take(130));
		let tlv = read_tlv(&data).unwrap();
		assert_eq!(tlv.contents.len(), 130);
	}

	#[test]
	fn strips_integer_padding_byte() {
		let data = [TAG_INTEGER, 0x03, 0x00, 0xff, 0x01];
		assert_eq!(read_unsigned_integer(&data).unwrap(), &[0xff, 0x01]);
	}

	#[test]
	fn mismatched_tag_is_invalid_arg() {
		let data = [TAG_SEQUENCE, 0x00];
		assert_eq!(expect_tlv(&data, TAG_INTEGER).unwrap_err(), Error::InvalidArg);
	}
}
