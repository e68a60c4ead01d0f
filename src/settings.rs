//! [`Settings`]: a named, typed, hierarchical configuration store.
//!
//! Blocks form a tree rooted at [`ROOT`]; each `NetDevice` owns a child
//! block named after it (spec §3 "Setting"). Lookup walks upward from a
//! starting block, returning the most specific definition found — this is
//! how a per-device `next-server` override shadows a global default.
//!
//! Back-references are (container, key) pairs rather than pointers (spec §9
//! "Back-references"): a [`BlockId`] is just an index into the process-wide
//! block arena, so a stale id degrades to `Error::NoEntry` instead of
//! dangling.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use spin::Mutex;

use crate::error::{Error, Result};

/// Identifies a settings block. `ROOT` is the global block every other
/// block is a descendant of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

/// The process-wide root settings block.
pub const ROOT: BlockId = BlockId(0);

/// The DHCP option tag a setting is conventionally sourced from, and the
/// type its value is parsed as. Mirrors iPXE's `struct setting` pairing a
/// name with a DHCP tag and type (spec §3 "Setting").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
	String,
	Ipv4,
	Integer,
	HexBytes,
	Uuid,
	Boolean,
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	String(String),
	Ipv4([u8; 4]),
	Integer(i64),
	HexBytes(Vec<u8>),
	Uuid([u8; 16]),
	Boolean(bool),
}

impl Value {
	pub fn type_of(&self) -> SettingType {
		match self {
			Value::String(_) => SettingType::String,
			Value::Ipv4(_) => SettingType::Ipv4,
			Value::Integer(_) => SettingType::Integer,
			Value::HexBytes(_) => SettingType::HexBytes,
			Value::Uuid(_) => SettingType::Uuid,
			Value::Boolean(_) => SettingType::Boolean,
		}
	}

	pub fn as_ipv4(&self) -> Result<[u8; 4]> {
		match self {
			Value::Ipv4(a) => Ok(*a),
			_ => Err(Error::InvalidArg),
		}
	}

	pub fn as_str(&self) -> Result<&str> {
		match self {
			Value::String(s) => Ok(s.as_str()),
			_ => Err(Error::InvalidArg),
		}
	}

	pub fn as_integer(&self) -> Result<i64> {
		match self {
			Value::Integer(i) => Ok(*i),
			_ => Err(Error::InvalidArg),
		}
	}

	pub fn as_bytes(&self) -> Result<&[u8]> {
		match self {
			Value::HexBytes(b) => Ok(b.as_slice()),
			_ => Err(Error::InvalidArg),
		}
	}

	pub fn as_bool(&self) -> Result<bool> {
		match self {
			Value::Boolean(b) => Ok(*b),
			_ => Err(Error::InvalidArg),
		}
	}
}

struct Block {
	name: String,
	parent: Option<BlockId>,
	values: HashMap<String, Value>,
}

struct Tree {
	blocks: Vec<Block>,
}

impl Tree {
	fn new() -> Self {
		Self {
			blocks: alloc::vec![Block {
				name: String::new(),
				parent: None,
				values: HashMap::new(),
			}],
		}
	}
}

static TREE: Mutex<Option<Tree>> = Mutex::new(None);

fn with_tree<R>(f: impl FnOnce(&mut Tree) -> R) -> R {
	let mut guard = TREE.lock();
	if guard.is_none() {
		*guard = Some(Tree::new());
	}
	f(guard.as_mut().unwrap())
}

/// Resets the whole settings tree. Exists for tests; production firmware
/// calls this at most once, at boot.
pub fn reset() {
	*TREE.lock() = Some(Tree::new());
}

/// Creates a child block of `parent` named `name` (conventionally a
/// `NetDevice`'s name), returning its id. Calling this twice with the same
/// `(parent, name)` returns the existing block rather than creating a
/// duplicate.
pub fn child_block(parent: BlockId, name: &str) -> Result<BlockId> {
	with_tree(|tree| {
		if parent.0 >= tree.blocks.len() {
			return Err(Error::NoEntry);
		}
		for (idx, block) in tree.blocks.iter().enumerate() {
			if block.parent == Some(parent) && block.name == name {
				return Ok(BlockId(idx));
			}
		}
		tree.blocks.push(Block {
			name: name.to_string(),
			parent: Some(parent),
			values: HashMap::new(),
		});
		Ok(BlockId(tree.blocks.len() - 1))
	})
}

/// Sets `name` to `value` directly on `block` (not its ancestors).
pub fn set(block: BlockId, name: &str, value: Value) -> Result<()> {
	with_tree(|tree| {
		let b = tree.blocks.get_mut(block.0).ok_or(Error::NoEntry)?;
		b.values.insert(name.to_string(), value);
		Ok(())
	})
}

/// Removes `name` from `block` directly (not its ancestors).
pub fn clear(block: BlockId, name: &str) -> Result<()> {
	with_tree(|tree| {
		let b = tree.blocks.get_mut(block.0).ok_or(Error::NoEntry)?;
		b.values.remove(name);
		Ok(())
	})
}

/// Resolves `name` starting at `block` and walking upward to `ROOT`,
/// returning the first (most specific) match (spec §3 "Resolution rule").
pub fn get(block: BlockId, name: &str) -> Result<Value> {
	with_tree(|tree| {
		let mut cur = Some(block);
		while let Some(id) = cur {
			let b = tree.blocks.get(id.0).ok_or(Error::NoEntry)?;
			if let Some(v) = b.values.get(name) {
				return Ok(v.clone());
			}
			cur = b.parent;
		}
		Err(Error::NoEntry)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn child_shadows_root() {
		reset();
		set(ROOT, "next-server", Value::Ipv4([192, 168, 0, 254])).unwrap();
		let net0 = child_block(ROOT, "net0").unwrap();
		assert_eq!(
			get(net0, "next-server").unwrap().as_ipv4().unwrap(),
			[192, 168, 0, 254]
		);
		set(net0, "next-server", Value::Ipv4([10, 0, 0, 1])).unwrap();
		assert_eq!(
			get(net0, "next-server").unwrap().as_ipv4().unwrap(),
			[10, 0, 0, 1]
		);
		// root is untouched
		assert_eq!(
			get(ROOT, "next-server").unwrap().as_ipv4().unwrap(),
			[192, 168, 0, 254]
		);
	}

	#[test]
	fn missing_setting_is_no_entry() {
		reset();
		let net0 = child_block(ROOT, "net0").unwrap();
		assert_eq!(get(net0, "missing"), Err(Error::NoEntry));
	}

	#[test]
	fn child_block_is_idempotent() {
		reset();
		let a = child_block(ROOT, "net0").unwrap();
		let b = child_block(ROOT, "net0").unwrap();
		assert_eq!(a, b);
	}
}
