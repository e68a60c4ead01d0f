//! Message digest dispatch for signature verification. The original picks
//! its digest implementation by walking a table of registered
//! `struct digest_algorithm`s keyed by ASN.1 OID (`asn1_algorithm` in
//! `crypto/asn1.c`); this crate's digest set is fixed at compile time, so
//! the lookup collapses to matching one of two known OIDs.

use alloc::vec::Vec;

use sha1::{Digest as _, Sha1};
use sha2::Sha256;

use crate::error::{Error, Result};

const OID_SHA1: &[u8] = &[0x2b, 0x0e, 0x03, 0x02, 0x1a];
const OID_SHA256: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

/// The `DigestInfo` ASN.1 prefix PKCS#1 v1.5 padding wraps around the raw
/// digest bytes (RFC 8017 §9.2), precomputed per algorithm since it never
/// varies.
const SHA1_DIGESTINFO_PREFIX: &[u8] = &[
	0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];
const SHA256_DIGESTINFO_PREFIX: &[u8] = &[
	0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00, 0x04, 0x20,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
	Sha1,
	Sha256,
}

impl DigestAlgorithm {
	pub fn from_oid(oid: &[u8]) -> Result<Self> {
		if oid == OID_SHA1 {
			Ok(Self::Sha1)
		} else if oid == OID_SHA256 {
			Ok(Self::Sha256)
		} else {
			Err(Error::NotSupported)
		}
	}

	pub fn output_len(self) -> usize {
		match self {
			Self::Sha1 => 20,
			Self::Sha256 => 32,
		}
	}

	/// The `DigestInfo` DER prefix this digest's PKCS#1 v1.5 padding is
	/// built around (RFC 8017 §9.2 step 2).
	pub fn digestinfo_prefix(self) -> &'static [u8] {
		match self {
			Self::Sha1 => SHA1_DIGESTINFO_PREFIX,
			Self::Sha256 => SHA256_DIGESTINFO_PREFIX,
		}
	}

	pub fn digest(self, data: &[u8]) -> Vec<u8> {
		match self {
			Self::Sha1 => Sha1::digest(data).to_vec(),
			Self::Sha256 => Sha256::digest(data).to_vec(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sha256_oid_round_trips() {
		let alg = DigestAlgorithm::from_oid(OID_SHA256).unwrap();
		assert_eq!(alg, DigestAlgorithm::Sha256);
		assert_eq!(alg.output_len(), 32);
	}

	#[test]
	fn unknown_oid_is_not_supported() {
		assert_eq!(DigestAlgorithm::from_oid(&[0, 0, 0]), Err(Error::NotSupported));
	}

	#[test]
	fn digest_length_matches_output_len() {
		assert_eq!(DigestAlgorithm::Sha256.digest(b"hello").len(), 32);
		assert_eq!(DigestAlgorithm::Sha1.digest(b"hello").len(), 20);
	}
}
