//! Table-internal entry wrapping a published node.

use core::sync::atomic::AtomicBool;
use core::sync::atomic::AtomicU16;
use core::sync::atomic::Ordering;

use crate::node::Node;

/// The table-internal record behind every occupied slot.
///
/// `orig` is the copy-on-write back-pointer described in the design notes:
/// it is set only on copies produced by [`crate::store::NodeStore::get_node_copy`]
/// and is compared (never dereferenced) by
/// [`crate::store::NodeStore::replace_node`] to detect a stale copy. It is
/// `None` for entries that were never a copy.
pub struct Entry {
  pub node_id_hash: u32,
  pub orig: Option<*const Entry>,
  ref_count: AtomicU16,
  deleted: AtomicBool,
  pub node: Node,
}

// SAFETY: `orig` is a bare comparison key, never dereferenced; all fields
// that are mutated after publication (`ref_count`, `deleted`) are atomics.
// The embedding store guarantees single-writer access to everything else,
// per the external service lock described in the crate's concurrency model.
unsafe impl Send for Entry {}
unsafe impl Sync for Entry {}

impl Entry {
  #[must_use]
  pub fn new(node_id_hash: u32, node: Node) -> Self {
    Self { node_id_hash, orig: None, ref_count: AtomicU16::new(0), deleted: AtomicBool::new(false), node }
  }

  /// Returns an entry carrying a `Node` that is a deep copy of `self`'s, with
  /// `orig` pointing back at `self`.
  #[must_use]
  pub fn copy_from(&self, node: Node) -> Self {
    Self {
      node_id_hash: self.node_id_hash,
      orig: Some(core::ptr::from_ref(self)),
      ref_count: AtomicU16::new(0),
      deleted: AtomicBool::new(false),
      node,
    }
  }

  #[must_use]
  pub fn ref_count(&self) -> u16 {
    self.ref_count.load(Ordering::Acquire)
  }

  pub fn incr_ref(&self) {
    self.ref_count.fetch_add(1, Ordering::AcqRel);
  }

  /// Decrements the refcount and returns the value it held *before* the
  /// decrement, mirroring the original's bare-integer convention so callers
  /// can tell a 1-to-0 transition apart from an already-zero count.
  #[track_caller]
  pub fn decr_ref(&self) -> u16 {
    let prev = self.ref_count.fetch_sub(1, Ordering::AcqRel);
    debug_assert!(prev > 0, "refcount underflow");
    prev
  }

  #[must_use]
  pub fn is_deleted(&self) -> bool {
    self.deleted.load(Ordering::Acquire)
  }

  pub fn mark_deleted(&self) {
    self.deleted.store(true, Ordering::Release);
  }

  /// `true` once the entry is both marked deleted and has no outstanding
  /// borrows, i.e. it is safe to free.
  #[must_use]
  pub fn is_reclaimable(&self) -> bool {
    self.is_deleted() && self.ref_count() == 0
  }
}

/// Frees an entry once it is no longer reachable from any table slot.
///
/// # Safety
/// `ptr` must have been produced by `Box::into_raw` on an `Entry` this crate
/// allocated, must already be unreachable from every slot (tombstoned or
/// overwritten), and must not be passed to `reclaim` more than once.
pub(crate) unsafe fn reclaim(ptr: *const Entry) {
  // SAFETY: forwarded to caller.
  debug_assert!(unsafe { (*ptr).is_reclaimable() });
  // SAFETY: forwarded to caller.
  drop(unsafe { Box::from_raw(ptr.cast_mut()) });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::NodeId;
  use crate::node::NodeClass;

  #[test]
  fn fresh_entry_is_not_reclaimable() {
    let entry = Entry::new(1, Node::new(NodeClass::Object, NodeId::numeric(1, 1)));
    assert!(!entry.is_reclaimable());
  }

  #[test]
  fn reclaimable_only_once_deleted_and_unreferenced() {
    let entry = Entry::new(1, Node::new(NodeClass::Object, NodeId::numeric(1, 1)));
    entry.incr_ref();
    entry.mark_deleted();
    assert!(!entry.is_reclaimable(), "still referenced");
    entry.decr_ref();
    assert!(entry.is_reclaimable());
  }

  #[test]
  fn copy_from_records_orig() {
    let original = Entry::new(7, Node::new(NodeClass::Object, NodeId::numeric(1, 1)));
    let copy = original.copy_from(Node::new(NodeClass::Object, NodeId::numeric(1, 1)));
    assert_eq!(copy.orig, Some(core::ptr::from_ref(&original)));
    assert_eq!(copy.node_id_hash, original.node_id_hash);
  }
}
