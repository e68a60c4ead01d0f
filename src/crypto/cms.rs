//! CMS (RFC 5652) `SignedData` parsing and verification: enough of
//! `cms_parse`/`cms_parse_next` (the original's `crypto/cms.c`) to pull
//! a signer's chain of certificates and the detached signature out of a
//! PKCS#7 blob, then check it against a trust store (spec §11 "CMS
//! certificate chain construction order").

use alloc::vec::Vec;

use super::asn1::{self, TAG_INTEGER, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE, TAG_SET};
use super::digest::DigestAlgorithm;
use super::rsa;
use super::x509::{self, Certificate};
use crate::error::{Error, Result};

const OID_SIGNED_DATA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// The signer's identity as a `(issuer, serialNumber)` pair, the
/// `IssuerAndSerialNumber` CHOICE of `SignerIdentifier` — the only
/// variant the original's `cms_parse_signer_identifier` supports, since
/// subjectKeyIdentifier lookup needs an index this firmware has no use
/// building.
struct SignerInfo {
	issuer: Vec<u8>,
	serial: Vec<u8>,
	digest_algorithm_oid: Vec<u8>,
	signature: Vec<u8>,
}

/// A parsed `ContentInfo` carrying a detached `SignedData`: the signer
/// info plus the raw bytes of the accompanying certificate set, still
/// to be walked into a chain by [`verify`].
pub struct SignedMessage<'a> {
	signer: SignerInfo,
	certificates: &'a [u8],
}

/// Parses a DER `ContentInfo` wrapping `SignedData` (RFC 5652 §5.1).
/// The encapsulated content is assumed detached (not carried inline):
/// this firmware always verifies a signature block against a separately
/// downloaded payload, the same split the original's image-signing
/// support uses.
pub fn parse(data: &[u8]) -> Result<SignedMessage<'_>> {
	let content_info = asn1::expect_tlv(data, TAG_SEQUENCE)?;
	let mut cursor = content_info.contents;

	let content_type = asn1::expect_tlv(cursor, TAG_OID)?;
	if content_type.contents != OID_SIGNED_DATA {
		return Err(Error::InvalidArg);
	}
	cursor = content_type.rest;

	let wrapper = asn1::expect_tlv(cursor, asn1::context_tag(0))?;
	let signed_data = asn1::expect_tlv(wrapper.contents, TAG_SEQUENCE)?;
	cursor = signed_data.contents;

	let version = asn1::expect_tlv(cursor, TAG_INTEGER)?;
	cursor = version.rest;

	let digest_algorithms = asn1::expect_tlv(cursor, TAG_SET)?;
	cursor = digest_algorithms.rest;

	let encap_content_info = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = encap_content_info.rest;

	let certificates_tlv = asn1::expect_tlv(cursor, asn1::context_tag(0))?;
	cursor = certificates_tlv.rest;

	// optional [1] IMPLICIT crls
	if let Ok(crls) = asn1::expect_tlv(cursor, asn1::context_tag(1)) {
		cursor = crls.rest;
	}

	let signer_infos = asn1::expect_tlv(cursor, TAG_SET)?;
	let signer = parse_signer_info(signer_infos.contents)?;

	Ok(SignedMessage {
		signer,
		certificates: certificates_tlv.contents,
	})
}

fn parse_signer_info(data: &[u8]) -> Result<SignerInfo> {
	let info = asn1::expect_tlv(data, TAG_SEQUENCE)?;
	let mut cursor = info.contents;

	let version = asn1::expect_tlv(cursor, TAG_INTEGER)?;
	cursor = version.rest;

	let sid = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = sid.rest;
	let mut sid_cursor = sid.contents;
	let issuer_tlv = asn1::expect_tlv(sid_cursor, TAG_SEQUENCE)?;
	let issuer_len = sid_cursor.len() - issuer_tlv.rest.len();
	let issuer = sid_cursor[..issuer_len].to_vec();
	sid_cursor = issuer_tlv.rest;
	let serial = asn1::read_unsigned_integer(sid_cursor)?.to_vec();

	let digest_algorithm = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = digest_algorithm.rest;
	let digest_algorithm_oid = asn1::expect_tlv(digest_algorithm.contents, TAG_OID)?.contents.to_vec();

	// optional [0] IMPLICIT signedAttrs
	if let Ok(signed_attrs) = asn1::expect_tlv(cursor, asn1::context_tag(0)) {
		cursor = signed_attrs.rest;
	}

	let signature_algorithm = asn1::expect_tlv(cursor, TAG_SEQUENCE)?;
	cursor = signature_algorithm.rest;

	let signature = asn1::expect_tlv(cursor, TAG_OCTET_STRING)?.contents.to_vec();

	Ok(SignerInfo {
		issuer,
		serial,
		digest_algorithm_oid,
		signature,
	})
}

/// A minimal trust anchor set: a handful of DER-encoded root
/// certificates this firmware was built or configured to trust.
pub struct TrustStore {
	roots: Vec<Vec<u8>>,
}

impl TrustStore {
	pub fn new() -> Self {
		Self { roots: Vec::new() }
	}

	pub fn add_der(&mut self, der: &[u8]) {
		self.roots.push(der.to_vec());
	}
}

impl Default for TrustStore {
	fn default() -> Self {
		Self::new()
	}
}

const MAX_CHAIN_DEPTH: usize = 8;

/// Verifies `message` against the detached signature in `signed` (a
/// [`parse`]d CMS blob), building the certificate chain the same way
/// `cms_parse_next` does: the first certificate matched by
/// issuer-and-serial against the signer info, then each subsequent
/// certificate matched by `subject == previous.issuer`, terminating
/// when a certificate's issuer is itself one of `trust`'s roots (spec
/// §11).
pub fn verify(signed: &SignedMessage<'_>, message: &[u8], trust: &TrustStore) -> Result<()> {
	let mut remaining = signed.certificates;
	let mut all = Vec::new();
	while !remaining.is_empty() {
		let (cert, rest) = x509::parse(remaining)?;
		all.push(cert);
		remaining = rest;
	}

	let leaf_index = all
		.iter()
		.position(|cert| cert.issuer == signed.signer.issuer.as_slice() && cert.serial == signed.signer.serial.as_slice())
		.ok_or(Error::Permission)?;

	let mut chain: Vec<&Certificate<'_>> = Vec::new();
	let mut current = &all[leaf_index];
	chain.push(current);
	let mut depth = 0;
	loop {
		if trust.roots.iter().any(|root| root_subject_matches(root, current.issuer)) {
			break;
		}
		let next = all.iter().find(|cert| cert.subject == current.issuer).ok_or(Error::Permission)?;
		chain.push(next);
		current = next;
		depth += 1;
		if depth > MAX_CHAIN_DEPTH {
			return Err(Error::Permission);
		}
	}

	let leaf = chain[0];
	if !leaf.allows_digital_signature() {
		return Err(Error::Permission);
	}
	if !leaf.allows_code_signing() {
		return Err(Error::Permission);
	}

	let alg = DigestAlgorithm::from_oid(&signed.signer.digest_algorithm_oid)?;
	rsa::verify(&leaf.public_key, alg, message, &signed.signer.signature)
}

fn root_subject_matches(root_der: &[u8], issuer: &[u8]) -> bool {
	match x509::parse(root_der) {
		Ok((root, _)) => root.subject == issuer,
		Err(_) => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parsing_garbage_is_invalid_arg() {
		assert_eq!(parse(&[0x00, 0x01]).unwrap_err(), Error::InvalidArg);
	}

	#[test]
	fn empty_trust_store_has_no_roots() {
		let store = TrustStore::new();
		assert!(store.roots.is_empty());
	}
}
