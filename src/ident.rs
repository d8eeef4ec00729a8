//! Node identifiers: hashing, equality, and the four identifier kinds.

use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;

/// The value half of a [`NodeId`].
///
/// Mirrors the four identifier encodings of the information model: a small
/// integer, a human-readable string, a GUID, and an opaque byte string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identifier {
  Numeric(u32),
  String(String),
  Guid([u8; 16]),
  ByteString(Vec<u8>),
}

/// A stable identifier for a node in the address space.
///
/// `NodeId` is the key type for the store: every lookup, insert, and remove
/// is keyed by one of these. Hash and equality are total over the namespace
/// index plus the identifier variant; there is no ordering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
  pub namespace_index: u16,
  pub identifier: Identifier,
}

impl NodeId {
  #[must_use]
  pub fn numeric(namespace_index: u16, value: u32) -> Self {
    Self { namespace_index, identifier: Identifier::Numeric(value) }
  }

  #[must_use]
  pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
    Self { namespace_index, identifier: Identifier::String(value.into()) }
  }

  #[must_use]
  pub fn guid(namespace_index: u16, value: [u8; 16]) -> Self {
    Self { namespace_index, identifier: Identifier::Guid(value) }
  }

  #[must_use]
  pub fn byte_string(namespace_index: u16, value: impl Into<Vec<u8>>) -> Self {
    Self { namespace_index, identifier: Identifier::ByteString(value.into()) }
  }

  /// `true` for the sentinel `ns=0;i=0` id used to request an auto-assigned
  /// numeric identifier on insert.
  #[must_use]
  pub fn is_null_numeric(&self) -> bool {
    self.namespace_index == 0 && matches!(self.identifier, Identifier::Numeric(0))
  }

  /// Non-cryptographic hash of this identifier, stable within a process.
  ///
  /// This is deliberately not [`Hash`]/[`core::hash::Hash`]'s own
  /// `DefaultHasher` result: the table stores this value alongside the slot
  /// so it must be cheap to recompute and compare without re-hashing the
  /// whole key.
  #[must_use]
  pub fn table_hash(&self) -> u32 {
    let mut hasher = FnvHasher::new();
    self.namespace_index.hash(&mut hasher);
    match &self.identifier {
      Identifier::Numeric(v) => {
        0u8.hash(&mut hasher);
        v.hash(&mut hasher);
      }
      Identifier::String(v) => {
        1u8.hash(&mut hasher);
        v.hash(&mut hasher);
      }
      Identifier::Guid(v) => {
        2u8.hash(&mut hasher);
        v.hash(&mut hasher);
      }
      Identifier::ByteString(v) => {
        3u8.hash(&mut hasher);
        v.hash(&mut hasher);
      }
    }
    hasher.finish() as u32
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.identifier {
      Identifier::Numeric(v) => write!(f, "ns={};i={v}", self.namespace_index),
      Identifier::String(v) => write!(f, "ns={};s={v}", self.namespace_index),
      Identifier::Guid(v) => write!(f, "ns={};g={v:02x?}", self.namespace_index),
      Identifier::ByteString(v) => write!(f, "ns={};b={v:02x?}", self.namespace_index),
    }
  }
}

/// Small non-cryptographic hasher (FNV-1a). Deterministic across runs of the
/// same binary, which is all [`NodeId::table_hash`] requires.
struct FnvHasher(u64);

impl FnvHasher {
  const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
  const PRIME: u64 = 0x0000_0100_0000_01b3;

  fn new() -> Self {
    Self(Self::OFFSET)
  }
}

impl Hasher for FnvHasher {
  fn finish(&self) -> u64 {
    self.0
  }

  fn write(&mut self, bytes: &[u8]) {
    for byte in bytes {
      self.0 ^= u64::from(*byte);
      self.0 = self.0.wrapping_mul(Self::PRIME);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_deterministic() {
    let id = NodeId::numeric(1, 42);
    assert_eq!(id.table_hash(), id.table_hash());
  }

  #[test]
  fn distinct_ids_usually_hash_distinct() {
    let a = NodeId::numeric(1, 42);
    let b = NodeId::numeric(1, 43);
    assert_ne!(a.table_hash(), b.table_hash());
  }

  #[test]
  fn namespace_index_participates_in_hash() {
    let a = NodeId::numeric(0, 42);
    let b = NodeId::numeric(1, 42);
    assert_ne!(a, b);
    assert_ne!(a.table_hash(), b.table_hash());
  }

  #[test]
  fn null_numeric_sentinel() {
    assert!(NodeId::numeric(0, 0).is_null_numeric());
    assert!(!NodeId::numeric(1, 0).is_null_numeric());
    assert!(!NodeId::numeric(0, 1).is_null_numeric());
  }
}
