//! SunRPC (RFC 1057) message framing: the wire format every portmap,
//! mount and NFS call in this module rides on, plus `AUTH_SYS`
//! credentials and the monotonic XID generator every call needs
//! (spec §11 "NFS ... coordinated state machines").

use alloc::string::String;
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{Error, Result};

const MSG_TYPE_CALL: u32 = 0;
const MSG_TYPE_REPLY: u32 = 1;
const REPLY_STAT_ACCEPTED: u32 = 0;
const ACCEPT_STAT_SUCCESS: u32 = 0;

const AUTH_NONE: u32 = 0;
const AUTH_SYS: u32 = 1;

pub const PROG_PORTMAP: u32 = 100000;
pub const PROG_MOUNT: u32 = 100005;
pub const PROG_NFS: u32 = 100003;

static NEXT_XID: Mutex<u32> = Mutex::new(1);

/// A fresh, process-wide-monotonic transaction id.
pub fn next_xid() -> u32 {
	let mut xid = NEXT_XID.lock();
	let value = *xid;
	*xid = xid.wrapping_add(1).max(1);
	value
}

/// `AUTH_SYS` credentials (RFC 1057 §9.2): the only auth flavor this
/// crate's NFS client presents, matching an anonymous-ish PXE client
/// identity.
#[derive(Debug, Clone)]
pub struct Credentials {
	pub hostname: String,
	pub uid: u32,
	pub gid: u32,
	pub gids: Vec<u32>,
}

impl Credentials {
	pub fn anonymous() -> Self {
		Self {
			hostname: String::new(),
			uid: 0,
			gid: 0,
			gids: Vec::new(),
		}
	}
}

fn push_xdr_string(buf: &mut Vec<u8>, s: &str) {
	push_xdr_opaque(buf, s.as_bytes());
}

fn push_xdr_opaque(buf: &mut Vec<u8>, bytes: &[u8]) {
	buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
	buf.extend_from_slice(bytes);
	let pad = (4 - bytes.len() % 4) % 4;
	buf.extend(core::iter::repeat(0u8).take(pad));
}

fn auth_sys_body(creds: &Credentials) -> Vec<u8> {
	let mut body = Vec::new();
	body.extend_from_slice(&0u32.to_be_bytes()); // stamp
	push_xdr_string(&mut body, &creds.hostname);
	body.extend_from_slice(&creds.uid.to_be_bytes());
	body.extend_from_slice(&creds.gid.to_be_bytes());
	body.extend_from_slice(&(creds.gids.len() as u32).to_be_bytes());
	for gid in &creds.gids {
		body.extend_from_slice(&gid.to_be_bytes());
	}
	body
}

/// Builds an RPC call message: header, `AUTH_SYS` credentials, a null
/// verifier, and the procedure-specific `args` appended verbatim.
pub fn build_call(xid: u32, program: u32, version: u32, procedure: u32, creds: &Credentials, args: &[u8]) -> Vec<u8> {
	let mut msg = Vec::new();
	msg.extend_from_slice(&xid.to_be_bytes());
	msg.extend_from_slice(&MSG_TYPE_CALL.to_be_bytes());
	msg.extend_from_slice(&2u32.to_be_bytes()); // rpcvers
	msg.extend_from_slice(&program.to_be_bytes());
	msg.extend_from_slice(&version.to_be_bytes());
	msg.extend_from_slice(&procedure.to_be_bytes());

	msg.extend_from_slice(&AUTH_SYS.to_be_bytes());
	push_xdr_opaque(&mut msg, &auth_sys_body(creds));

	msg.extend_from_slice(&AUTH_NONE.to_be_bytes());
	push_xdr_opaque(&mut msg, &[]);

	msg.extend_from_slice(args);
	msg
}

/// Verifies the reply header (accepted, success) and returns `(xid,
/// procedure-specific payload)`.
pub fn parse_reply(data: &[u8]) -> Result<(u32, &[u8])> {
	if data.len() < 8 {
		return Err(Error::InvalidArg);
	}
	let xid = u32::from_be_bytes(data[0..4].try_into().unwrap());
	let msg_type = u32::from_be_bytes(data[4..8].try_into().unwrap());
	if msg_type != MSG_TYPE_REPLY {
		return Err(Error::InvalidArg);
	}
	let mut cursor = 8;
	let reply_stat = read_u32(data, &mut cursor)?;
	if reply_stat != REPLY_STAT_ACCEPTED {
		return Err(Error::Permission);
	}
	// verifier: flavor + opaque body
	let _flavor = read_u32(data, &mut cursor)?;
	skip_xdr_opaque(data, &mut cursor)?;
	let accept_stat = read_u32(data, &mut cursor)?;
	if accept_stat != ACCEPT_STAT_SUCCESS {
		return Err(Error::Io);
	}
	Ok((xid, &data[cursor..]))
}

fn read_u32(data: &[u8], cursor: &mut usize) -> Result<u32> {
	if data.len() < *cursor + 4 {
		return Err(Error::InvalidArg);
	}
	let value = u32::from_be_bytes(data[*cursor..*cursor + 4].try_into().unwrap());
	*cursor += 4;
	Ok(value)
}

fn skip_xdr_opaque(data: &[u8], cursor: &mut usize) -> Result<()> {
	let len = read_u32(data, cursor)? as usize;
	let padded = len + (4 - len % 4) % 4;
	if data.len() < *cursor + padded {
		return Err(Error::InvalidArg);
	}
	*cursor += padded;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn xid_generator_is_monotonic_and_nonzero() {
		let a = next_xid();
		let b = next_xid();
		assert!(b > a);
		assert_ne!(a, 0);
	}

	#[test]
	fn call_then_reply_roundtrip_xid() {
		let xid = next_xid();
		let call = build_call(xid, PROG_PORTMAP, 2, 3, &Credentials::anonymous(), &[]);
		assert_eq!(u32::from_be_bytes(call[0..4].try_into().unwrap()), xid);

		let mut reply = Vec::new();
		reply.extend_from_slice(&xid.to_be_bytes());
		reply.extend_from_slice(&MSG_TYPE_REPLY.to_be_bytes());
		reply.extend_from_slice(&REPLY_STAT_ACCEPTED.to_be_bytes());
		reply.extend_from_slice(&AUTH_NONE.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes()); // zero-length verifier
		reply.extend_from_slice(&ACCEPT_STAT_SUCCESS.to_be_bytes());
		reply.extend_from_slice(&[0xab, 0xcd, 0xef, 0x01]);

		let (got_xid, payload) = parse_reply(&reply).unwrap();
		assert_eq!(got_xid, xid);
		assert_eq!(payload, [0xab, 0xcd, 0xef, 0x01]);
	}
}
