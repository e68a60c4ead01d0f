//! Minimal X.509 certificate parsing: just enough of `Certificate` /
//! `TBSCertificate` (RFC 5280 §4.1) to walk a CMS chain and verify an
//! RSA signature, grounded on the original's `x509.c`. Names (issuer,
//! subject) are compared as their raw DER `Name` bytes rather than
//! decoded into structured RDNs, the same shortcut `x509_compare_...`
//! takes by hashing the encoded name rather than parsing it.

use alloc::vec::Vec;

use super::asn1::{self, TAG_INTEGER, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE};
use crate::error::{Error, Result};

const OID_RSA_ENCRYPTION: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
const OID_KEY_USAGE: &[u8] = &[0x55, 0x1d, 0x0f];
const OID_EXT_KEY_USAGE: &[u8] = &[0x55, 0x1d, 0x25];
const OID_EKU_CODE_SIGNING: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x03];

const KEY_USAGE_DIGITAL_SIGNATURE: u8 = 0x80; // bit 0 of the KeyUsage BIT STRING

#[derive(Debug, Clone)]
pub struct RsaPublicKey {
	pub modulus: Vec<u8>,
	pub exponent: Vec<u8>,
}

/// The handful of fields a CMS signer-chain walk and a code-signing
/// policy check need out of a certificate; everything else (validity
/// period, CRL distribution points, policy OIDs...) is parsed past but
/// discarded.
#[derive(Debug, Clone)]
pub struct Certificate<'a> {
	pub issuer: &'a [u8],
	pub serial: &'a [u8],
	pub subject: &'a [u8],
	pub public_key: RsaPublicKey,
	key_usage: Option<u8>,
	extended_key_usage_codesign: bool,
}

impl<'a> Certificate<'a> {
	/// `key_usage` absent entirely (extension not present) is treated as
	/// "no restriction", matching RFC 5280's guidance that `keyUsage` is
	/// optional for older certificates.
	pub fn allows_digital_signature(&self) -> bool {
		match self.key_usage {
			Some(bits) => bits & KEY_USAGE_DIGITAL_SIGNATURE != 0,
			None => true,
		}
	}

	pub fn allows_code_signing(&self) -> bool {
		self.extended_key_usage_codesign
	}
}

/// Parses a DER-encoded `Certificate`. Returns the certificate plus the
/// unparsed remainder of `data` (certificates in a CMS `SET OF` are
/// packed back-to-back with no separators, so callers loop on the
/// remainder to enumerate the whole set).
pub fn parse(data: &[u8]) -> Result<(Certificate<'_>, &[u8])> {
	let outer = asn1::expect_tlv(data, TAG_SEQUENCE)?;
	let tbs = asn1::expect_tlv(outer.contents, TAG_SEQUENCE)?;
	let mut cursor = tbs.contents;

	// optional [0] EXPLICIT version
	if let Ok(tlv) = asn1::expect_tlv(cursor, asn1::context_tag(0)) {
		cursor = tlv.rest;
	}

	let serial_tlv = asn1::expect_tlv(cursor, TAG_INTEGER)?;
	let serial = serial_tlv.contents;
	cursor = serial_tlv.rest;

	// signature AlgorithmIdentifier
	let sig_alg = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = sig_alg.rest;

	let issuer_tlv = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	let issuer = issuer_tlv.contents;
	let issuer_raw_len = cursor.len() - issuer_tlv.rest.len();
	let issuer_raw = &cursor[..issuer_raw_len];
	cursor = issuer_tlv.rest;

	// validity
	let validity = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = validity.rest;

	let subject_tlv = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	let subject_raw_len = cursor.len() - subject_tlv.rest.len();
	let subject_raw = &cursor[..subject_raw_len];
	cursor = subject_tlv.rest;

	let spki = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = spki.rest;
	let public_key = parse_subject_public_key_info(spki.contents)?;

	let mut key_usage = None;
	let mut extended_key_usage_codesign = false;

	// issuerUniqueID [1], subjectUniqueID [2], extensions [3] may all be
	// present in any combination; scan whatever context tags remain.
	while let Ok(tlv) = asn1::read_tlv(cursor) {
		if tlv.tag == asn1::context_tag(3) {
			let (usage, codesign) = parse_extensions(tlv.contents)?;
			key_usage = usage;
			extended_key_usage_codesign = codesign;
		}
		if tlv.rest.len() == cursor.len() {
			break; // no forward progress; malformed trailing data
		}
		cursor = tlv.rest;
	}

	Ok((
		Certificate {
			issuer: issuer_raw,
			serial,
			subject: subject_raw,
			public_key,
			key_usage,
			extended_key_usage_codesign,
		},
		outer.rest,
	))
}

fn parse_subject_public_key_info(data: &[u8]) -> Result<RsaPublicKey> {
	let alg = asn1::expect_tlv(data, TAG_SEQUENCE)?;
	let oid = asn1::expect_tlv(alg.contents, TAG_OID)?;
	if oid.contents != OID_RSA_ENCRYPTION {
		return Err(Error::NotSupported);
	}
	let key_bits = asn1::read_bit_string(alg.rest)?;
	let key_seq = asn1::expect_tlv(key_bits, TAG_SEQUENCE)?;
	let modulus = asn1::read_unsigned_integer(key_seq.contents)?;
	let modulus_tlv = asn1::expect_tlv(key_seq.contents, TAG_INTEGER)?;
	let exponent = asn1::read_unsigned_integer(modulus_tlv.rest)?;
	Ok(RsaPublicKey {
		modulus: modulus.to_vec(),
		exponent: exponent.to_vec(),
	})
}

/// Walks the `Extensions` SEQUENCE OF `Extension`, picking out `keyUsage`
/// and `extKeyUsage` and ignoring the rest.
fn parse_extensions(data: &[u8]) -> Result<(Option<u8>, bool)> {
	let seq = asn1::expect_tlv(data, TAG_SEQUENCE)?;
	let mut cursor = seq.contents;
	let mut key_usage = None;
	let mut codesign = false;
	while !cursor.is_empty() {
		let ext = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
		cursor = ext.rest;
		let mut inner = ext.contents;
		let oid = asn1::expect_tlv(inner, TAG_OID)?;
		inner = oid.rest;
		// optional critical BOOLEAN
		if let Ok(tlv) = asn1::expect_tlv(inner, 0x01) {
			inner = tlv.rest;
		}
		let value = asn1::expect_tlv(inner, TAG_OCTET_STRING)?;
		if oid.contents == OID_KEY_USAGE {
			if let Ok(bits) = asn1::read_bit_string(value.contents) {
				key_usage = bits.first().copied();
			}
		} else if oid.contents == OID_EXT_KEY_USAGE {
			if let Ok(seq) = asn1::expect_tlv(value.contents, TAG_SEQUENCE) {
				let mut oids = seq.contents;
				while let Ok(oid_tlv) = asn1::expect_tlv(oids, TAG_OID) {
					if oid_tlv.contents == OID_EKU_CODE_SIGNING {
						codesign = true;
					}
					oids = oid_tlv.rest;
				}
			}
		}
	}
	Ok((key_usage, codesign))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_extensions_finds_code_signing_eku() {
		// Extensions ::= SEQUENCE OF Extension, one entry: extKeyUsage
		// with a single codeSigning OID, non-critical.
		let mut eku_oids = alloc::vec![TAG_OID, OID_EKU_CODE_SIGNING.len() as u8];
		eku_oids.extend_from_slice(OID_EKU_CODE_SIGNING);
		let mut eku_seq = alloc::vec![TAG_SEQUENCE, eku_oids.len() as u8];
		eku_seq.extend_from_slice(&eku_oids);

		let mut ext_value = alloc::vec![TAG_OCTET_STRING, eku_seq.len() as u8];
		ext_value.extend_from_slice(&eku_seq);

		let mut ext = alloc::vec![TAG_OID, OID_EXT_KEY_USAGE.len() as u8];
		ext.extend_from_slice(OID_EXT_KEY_USAGE);
		ext.extend_from_slice(&ext_value);

		let mut ext_seq = alloc::vec![TAG_SEQUENCE, ext.len() as u8];
		ext_seq.extend_from_slice(&ext);

		let mut extensions = alloc::vec![TAG_SEQUENCE, ext_seq.len() as u8];
		extensions.extend_from_slice(&ext_seq);

		let (key_usage, codesign) = parse_extensions(&extensions).unwrap();
		assert_eq!(key_usage, None);
		assert!(codesign);
	}
}
