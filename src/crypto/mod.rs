//! Signature verification for downloaded images (spec §11 "CMS
//! certificate chain construction order"), gated behind the `crypto`
//! feature. Grounded on the original's `crypto/cms.c`, `crypto/rsa.c`
//! and `include/ipxe/bigint.h`: CMS/PKCS#7 `SignedData` parsing over a
//! minimal ASN.1 DER cursor and X.509 certificate reader, RSASSA-
//! PKCS1-v1_5 verification, and the const-generic big-integer type the
//! original's macro-generated `bigint_t` plays the same role for.
//!
//! Nothing here signs anything; this firmware only ever checks a
//! signature someone else produced.

pub mod asn1;
pub mod bigint;
pub mod cms;
pub mod digest;
pub mod rsa;
pub mod x509;

pub use cms::{verify, SignedMessage, TrustStore};
pub use digest::DigestAlgorithm;

use crate::error::Result;

/// Verifies a detached CMS signature (`signature_der`) over `payload`
/// against `trust`. The single entry point the download pipeline calls
/// once a signed image (or its accompanying `.sig`) has fully arrived.
pub fn verify_detached(signature_der: &[u8], payload: &[u8], trust: &TrustStore) -> Result<()> {
	let signed = cms::parse(signature_der)?;
	cms::verify(&signed, payload, trust)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verify_detached_rejects_malformed_input() {
		let trust = TrustStore::new();
		assert!(verify_detached(&[0xff, 0xff], b"payload", &trust).is_err());
	}
}
