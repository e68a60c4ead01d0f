//! Portmapper (RFC 1057 appendix A) `GETPORT` — resolves the dynamic
//! port `mountd` and `nfsd` are actually listening on before either can
//! be called (spec §11 "NFS ... coordinated state machines").

use alloc::vec::Vec;

use super::sunrpc::{self, Credentials};
use crate::error::{Error, Result};

const PROC_GETPORT: u32 = 3;
pub const PROTO_UDP: u32 = 17;
pub const PROTO_TCP: u32 = 6;

/// Builds a `PMAPPROC_GETPORT` call asking for the port serving
/// `(program, version)` over `protocol`.
pub fn build_getport_call(xid: u32, program: u32, version: u32, protocol: u32, creds: &Credentials) -> Vec<u8> {
	let mut args = Vec::with_capacity(16);
	args.extend_from_slice(&program.to_be_bytes());
	args.extend_from_slice(&version.to_be_bytes());
	args.extend_from_slice(&protocol.to_be_bytes());
	args.extend_from_slice(&0u32.to_be_bytes()); // port, ignored in the request
	sunrpc::build_call(xid, sunrpc::PROG_PORTMAP, 2, PROC_GETPORT, creds, &args)
}

/// Parses the reply. A port of zero means the program isn't registered
/// on the portmapper, surfaced as [`Error::NoEntry`].
pub fn parse_getport_reply(data: &[u8]) -> Result<(u32, u16)> {
	let (xid, payload) = sunrpc::parse_reply(data)?;
	if payload.len() < 4 {
		return Err(Error::InvalidArg);
	}
	let port = u32::from_be_bytes(payload[0..4].try_into().unwrap());
	if port == 0 || port > u16::MAX as u32 {
		return Err(Error::NoEntry);
	}
	Ok((xid, port as u16))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::proto::nfs::sunrpc::PROG_MOUNT;

	#[test]
	fn getport_reply_yields_resolved_port() {
		let xid = sunrpc::next_xid();
		let call = build_getport_call(xid, PROG_MOUNT, 1, PROTO_UDP, &Credentials::anonymous());
		assert!(call.len() > 8);

		let mut reply = Vec::new();
		reply.extend_from_slice(&xid.to_be_bytes());
		reply.extend_from_slice(&1u32.to_be_bytes()); // REPLY
		reply.extend_from_slice(&0u32.to_be_bytes()); // MSG_ACCEPTED
		reply.extend_from_slice(&0u32.to_be_bytes()); // AUTH_NONE
		reply.extend_from_slice(&0u32.to_be_bytes()); // zero-length verifier
		reply.extend_from_slice(&0u32.to_be_bytes()); // SUCCESS
		reply.extend_from_slice(&635u32.to_be_bytes());

		let (got_xid, port) = parse_getport_reply(&reply).unwrap();
		assert_eq!(got_xid, xid);
		assert_eq!(port, 635);
	}

	#[test]
	fn unregistered_program_is_no_entry() {
		let mut reply = Vec::new();
		reply.extend_from_slice(&1u32.to_be_bytes());
		reply.extend_from_slice(&1u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes()); // port 0

		assert_eq!(parse_getport_reply(&reply), Err(Error::NoEntry));
	}
}
