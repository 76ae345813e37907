//! Session identity map
//!
//! Tracks loaded entities by `(hierarchy root, key)`. Every type in a
//! table-per-hierarchy tree shares the root's key space, so a `DerivedType`
//! tracked under key 78 is found by a lookup of `BaseType` 78.

use std::collections::HashMap;

use pklookup_query::Value;

use crate::record::EntityRecord;

/// Hashable, width-independent form of one key component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
	Bool(bool),
	Integer(i64),
	Real(u64),
	Text(String),
	Blob(Vec<u8>),
}

impl KeyPart {
	fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Bool(Some(b)) => Some(Self::Bool(*b)),
			Value::Int(Some(i)) => Some(Self::Integer(i64::from(*i))),
			Value::BigInt(Some(i)) => Some(Self::Integer(*i)),
			Value::Double(Some(f)) => Some(Self::Real(f.to_bits())),
			Value::String(Some(s)) => Some(Self::Text(s.as_ref().clone())),
			Value::Bytes(Some(b)) => Some(Self::Blob(b.as_ref().clone())),
			_ => None,
		}
	}
}

/// Canonical identity of a tracked entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
	root: String,
	parts: Vec<KeyPart>,
}

impl IdentityKey {
	/// Build the identity of `values` within the hierarchy rooted at `root`
	///
	/// Returns `None` if any component is `NULL`.
	pub fn new(root: impl Into<String>, values: &[Value]) -> Option<Self> {
		let parts = values
			.iter()
			.map(KeyPart::from_value)
			.collect::<Option<Vec<_>>>()?;
		Some(Self {
			root: root.into(),
			parts,
		})
	}

	pub fn root(&self) -> &str {
		&self.root
	}
}

/// Per-session map of loaded entities
#[derive(Debug, Default)]
pub struct IdentityMap {
	entries: HashMap<IdentityKey, EntityRecord>,
}

impl IdentityMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Track `record` under `key`, returning the entry it replaced
	pub fn attach(&mut self, key: IdentityKey, record: EntityRecord) -> Option<EntityRecord> {
		self.entries.insert(key, record)
	}

	pub fn get(&self, key: &IdentityKey) -> Option<&EntityRecord> {
		self.entries.get(key)
	}

	pub fn contains(&self, key: &IdentityKey) -> bool {
		self.entries.contains_key(key)
	}

	/// Stop tracking the entity under `key`
	pub fn detach(&mut self, key: &IdentityKey) -> Option<EntityRecord> {
		self.entries.remove(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}
}
