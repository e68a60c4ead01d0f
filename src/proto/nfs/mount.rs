//! Mount protocol (`MOUNTPROC_MNT`) client, including the
//! mountpoint-shortening retry this module's grounding source performs:
//! servers routinely export only a prefix of the path a boot URI names
//! (e.g. exporting `/export` while the URI names
//! `/export/images/boot.img`), so a single `MNT` of the full path fails
//! on most real exports. The fix mirrors the original's `nfs_open.c`:
//! try the full path first, and on failure strip one trailing segment
//! and retry, down to the root, remembering whatever suffix never made
//! it into the mount request so the NFS layer can `LOOKUP` it
//! component-by-component against the mounted root (spec §11 "NFS
//! mountpoint-shortening+symlink interaction").

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::sunrpc::{self, Credentials};
use crate::error::{Error, Result};

const PROC_MNT: u32 = 1;
const PROC_UMNT: u32 = 3;
const MNT_OK: u32 = 0;

fn push_xdr_string(buf: &mut Vec<u8>, s: &str) {
	buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
	buf.extend_from_slice(s.as_bytes());
	let pad = (4 - s.len() % 4) % 4;
	buf.extend(core::iter::repeat(0u8).take(pad));
}

fn split_path(path: &str) -> Vec<String> {
	path.split('/').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

fn join_path(segments: &[String]) -> String {
	if segments.is_empty() {
		"/".to_string()
	} else {
		let mut out = String::new();
		for seg in segments {
			out.push('/');
			out.push_str(seg);
		}
		out
	}
}

/// Drives a single mount attempt, shortening the requested directory
/// on each `NoEntry`/`Permission` failure until either a mount
/// succeeds or the root itself is rejected.
pub struct Session {
	segments: Vec<String>,
	/// Number of leading `segments` currently included in the mount
	/// request; shrinks by one on each failed attempt.
	mount_len: usize,
	creds: Credentials,
	pending_xid: Option<u32>,
}

/// Outcome of a mount reply.
pub enum Outcome {
	/// Mount succeeded: `root_handle` is the NFS file handle for
	/// `join_path(&segments[..mount_len])`, and `remaining` is the
	/// suffix of path segments still to be resolved via `LOOKUP`.
	Mounted { root_handle: Vec<u8>, remaining: Vec<String> },
	/// This attempt failed; `call` is the next (shorter) attempt to
	/// send, or `None` if even the root was rejected.
	Retry { call: Option<Vec<u8>> },
}

impl Session {
	pub fn new(path: &str, creds: Credentials) -> Self {
		let segments = split_path(path);
		let mount_len = segments.len();
		Self {
			segments,
			mount_len,
			creds,
			pending_xid: None,
		}
	}

	/// Builds the `MNT` call for the current (initially full) path.
	pub fn build_mnt_call(&mut self) -> Vec<u8> {
		let xid = sunrpc::next_xid();
		self.pending_xid = Some(xid);
		let dirpath = join_path(&self.segments[..self.mount_len]);
		let mut args = Vec::new();
		push_xdr_string(&mut args, &dirpath);
		sunrpc::build_call(xid, sunrpc::PROG_MOUNT, 1, PROC_MNT, &self.creds, &args)
	}

	pub fn build_umnt_call(&self, dirpath: &str) -> Vec<u8> {
		let xid = sunrpc::next_xid();
		let mut args = Vec::new();
		push_xdr_string(&mut args, dirpath);
		sunrpc::build_call(xid, sunrpc::PROG_MOUNT, 1, PROC_UMNT, &self.creds, &args)
	}

	/// Feeds a reply to the most recent `MNT` call. On failure, shortens
	/// the path by one segment and returns the next call to send (or
	/// `None` once even `/` has been rejected).
	pub fn on_reply(&mut self, data: &[u8]) -> Result<Outcome> {
		let (xid, payload) = sunrpc::parse_reply(data)?;
		if self.pending_xid != Some(xid) {
			return Err(Error::InvalidArg);
		}
		if payload.len() < 4 {
			return Err(Error::InvalidArg);
		}
		let status = u32::from_be_bytes(payload[0..4].try_into().unwrap());
		if status == MNT_OK {
			if payload.len() < 36 {
				return Err(Error::InvalidArg);
			}
			let handle = payload[4..36].to_vec();
			let remaining = self.segments[self.mount_len..].to_vec();
			return Ok(Outcome::Mounted {
				root_handle: handle,
				remaining,
			});
		}
		if self.mount_len == 0 {
			return Ok(Outcome::Retry { call: None });
		}
		self.mount_len -= 1;
		Ok(Outcome::Retry {
			call: Some(self.build_mnt_call()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ok_reply(xid: u32, handle: &[u8; 32]) -> Vec<u8> {
		let mut reply = Vec::new();
		reply.extend_from_slice(&xid.to_be_bytes());
		reply.extend_from_slice(&1u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&MNT_OK.to_be_bytes());
		reply.extend_from_slice(handle);
		reply
	}

	fn err_reply(xid: u32) -> Vec<u8> {
		let mut reply = Vec::new();
		reply.extend_from_slice(&xid.to_be_bytes());
		reply.extend_from_slice(&1u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&0u32.to_be_bytes());
		reply.extend_from_slice(&2u32.to_be_bytes()); // ENOENT-ish mount status
		reply
	}

	fn xid_of(call: &[u8]) -> u32 {
		u32::from_be_bytes(call[0..4].try_into().unwrap())
	}

	#[test]
	fn full_path_mount_succeeds_immediately() {
		let mut session = Session::new("/export/images/boot.img", Credentials::anonymous());
		let call = session.build_mnt_call();
		let handle = [7u8; 32];
		match session.on_reply(&ok_reply(xid_of(&call), &handle)).unwrap() {
			Outcome::Mounted { root_handle, remaining } => {
				assert_eq!(root_handle, handle.to_vec());
				assert!(remaining.is_empty());
			}
			Outcome::Retry { .. } => panic!("expected immediate mount"),
		}
	}

	#[test]
	fn failed_full_mount_shortens_path_and_retries() {
		let mut session = Session::new("/export/images/boot.img", Credentials::anonymous());
		let first = session.build_mnt_call();
		let retry_call = match session.on_reply(&err_reply(xid_of(&first))).unwrap() {
			Outcome::Retry { call: Some(call) } => call,
			_ => panic!("expected a shortened retry"),
		};

		let handle = [9u8; 32];
		match session.on_reply(&ok_reply(xid_of(&retry_call), &handle)).unwrap() {
			Outcome::Mounted { root_handle, remaining } => {
				assert_eq!(root_handle, handle.to_vec());
				assert_eq!(remaining, vec!["boot.img".to_string()]);
			}
			Outcome::Retry { .. } => panic!("expected mount on the shortened path"),
		}
	}

	#[test]
	fn rejecting_the_root_gives_up() {
		let mut session = Session::new("/a", Credentials::anonymous());
		let first = session.build_mnt_call();
		let retry = match session.on_reply(&err_reply(xid_of(&first))).unwrap() {
			Outcome::Retry { call: Some(call) } => call,
			_ => panic!("expected one retry at the root"),
		};
		match session.on_reply(&err_reply(xid_of(&retry))).unwrap() {
			Outcome::Retry { call: None } => {}
			_ => panic!("expected final failure once root is rejected"),
		}
	}
}
