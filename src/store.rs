//! The public Nodestore interface: `new`/`delete`/`get`/`release`/`get_copy`/
//! `insert`/`replace`/`remove`/`iterate`/`clear`.

use core::ops::Deref;

use log::debug;
use log::warn;

use crate::config::StoreConfig;
use crate::entry::reclaim;
use crate::entry::Entry;
use crate::error::Error;
use crate::ident::NodeId;
use crate::node::Node;
use crate::node::NodeClass;
use crate::table::Table;

/// The starting point for auto-assigned numeric identifiers, matching the
/// historical reserved range below which the information model's own
/// well-known nodes live.
const AUTO_ID_BASE: u32 = 50_000;

/// A lock-free address-space node store.
///
/// All ten operations are available through `&self`: mutation is serialized
/// by whatever external lock the embedding server holds (see the
/// crate-level docs on the concurrency model), not by Rust's borrow checker.
/// Lookups (`get_node`) may run concurrently with that writer from a
/// signal-context caller, per the same model.
pub struct NodeStore {
  table: Table,
}

impl NodeStore {
  #[must_use]
  pub fn new() -> Self {
    Self::with_config(StoreConfig::default())
  }

  #[must_use]
  pub fn with_config(config: StoreConfig) -> Self {
    Self { table: Table::with_capacity(config.initial_capacity) }
  }

  /// Allocates a fresh, unattached node of the given class (component B in
  /// the crate's design docs). The caller must pass the result to
  /// [`NodeStore::insert_node`] or simply drop it.
  #[must_use]
  pub fn new_node(&self, class: NodeClass, node_id: NodeId) -> Node {
    Node::new(class, node_id)
  }

  /// Inserts `node`, auto-assigning a numeric identifier when its id is the
  /// `ns=0;i=0` sentinel. Returns the id the node was actually stored under.
  pub fn insert_node(&self, mut node: Node) -> Result<NodeId, Error> {
    if node.node_id().is_null_numeric() {
      let namespace_index = node.node_id().namespace_index;
      let id = self.assign_auto_id(namespace_index)?;
      node.header_mut().node_id = id;
    }
    let id = node.node_id().clone();
    let hash = id.table_hash();
    let entry = Box::new(Entry::new(hash, node));
    match self.table.insert(&id, entry) {
      Ok(_) => {
        debug!(target: "nodestore::store", "inserted node {id}");
        Ok(id)
      }
      Err((err, _freed)) => {
        warn!(target: "nodestore::store", "insert of {id} failed: {err}");
        Err(err)
      }
    }
  }

  fn assign_auto_id(&self, namespace_index: u16) -> Result<NodeId, Error> {
    let size = self.table.size();
    let count = self.table.count();
    let start = AUTO_ID_BASE + size + 1;
    let step = 1 + ((count + 1) % (size - 2));
    let mut candidate = start;
    for _ in 0..size {
      let id = NodeId::numeric(namespace_index, candidate);
      if self.table.find(&id).is_none() {
        return Ok(id);
      }
      candidate = candidate.wrapping_add(step);
    }
    Err(Error::NodeIdExists(format!("ns={namespace_index}; auto-id space exhausted")))
  }

  /// Looks up `id`, returning a borrowed, refcounted guard on a hit.
  #[must_use]
  pub fn get_node(&self, id: &NodeId) -> Option<NodeGuard<'_>> {
    let entry = self.table.find(id)?;
    entry.incr_ref();
    Some(NodeGuard { entry })
  }

  /// Produces a writable copy of the node stored under `id`, suitable for
  /// mutation and a later [`NodeStore::replace_node`] call. The copy
  /// remembers which stored entry it was copied from, so `replace_node` can
  /// detect a write-write conflict (property P6).
  pub fn get_node_copy(&self, id: &NodeId) -> Result<NodeCopy, Error> {
    let entry = self.table.find(id).ok_or_else(|| Error::NodeIdUnknown(id.to_string()))?;
    Ok(NodeCopy { node: entry.node.clone(), orig: core::ptr::from_ref(entry) })
  }

  /// Replaces the node stored under `copy`'s id, provided `copy` was
  /// produced by a still-current [`NodeStore::get_node_copy`] call (the
  /// copy-on-write stale-copy check, property P6).
  pub fn replace_node(&self, copy: NodeCopy) -> Result<(), Error> {
    let NodeCopy { node, orig } = copy;
    let id = node.node_id().clone();
    let hash = id.table_hash();
    let mut new_entry = Box::new(Entry::new(hash, node));
    new_entry.orig = Some(orig);
    match self.table.replace(&id, orig, new_entry) {
      Ok(old_ptr) => {
        // SAFETY: `old_ptr` just came back from the table as the entry it
        // atomically unpublished; it cannot be reached by a new lookup.
        let old = unsafe { &*old_ptr };
        old.mark_deleted();
        self.try_reclaim(old_ptr);
        debug!(target: "nodestore::store", "replaced node {id}");
        Ok(())
      }
      Err((err, _freed)) => {
        warn!(target: "nodestore::store", "replace of {id} failed: {err}");
        Err(err)
      }
    }
  }

  /// Removes the node stored under `id`.
  pub fn remove_node(&self, id: &NodeId) -> Result<(), Error> {
    match self.table.remove(id) {
      Some(ptr) => {
        // SAFETY: `ptr` was just unpublished by `Table::remove` and cannot
        // be reached by a new lookup.
        let entry = unsafe { &*ptr };
        entry.mark_deleted();
        self.try_reclaim(ptr);
        debug!(target: "nodestore::store", "removed node {id}");
        Ok(())
      }
      None => Err(Error::NodeIdUnknown(id.to_string())),
    }
  }

  /// Calls `visitor` once per live node. The visitor must not call back into
  /// a mutating store operation; it would deadlock against the external
  /// service lock in any real embedding.
  pub fn iterate(&self, mut visitor: impl FnMut(&Node)) {
    for ptr in self.table.occupied() {
      // SAFETY: snapshot taken under the writer's exclusive access, per the
      // crate's concurrency model; the entry cannot be freed while we hold
      // this borrow because we bump its refcount first.
      let entry = unsafe { &*ptr };
      entry.incr_ref();
      visitor(&entry.node);
      entry.decr_ref();
      self.try_reclaim(ptr);
    }
  }

  /// Frees every live node and the slot array itself. Named explicitly to
  /// mirror the ten-operation interface this store is modeled on, even
  /// though `Drop` would do the same thing on scope exit.
  pub fn clear(self) {
    drop(self);
  }

  /// Attempts to free `ptr` if it is both deleted and unreferenced. A no-op
  /// otherwise (some other borrow is still outstanding, or a concurrent
  /// caller already reclaimed it).
  fn try_reclaim(&self, ptr: *const Entry) {
    // SAFETY: `ptr` always originates from this store's own table, and is
    // never reclaimed more than once because `is_reclaimable` only reports
    // `true` once, at the single 1-to-0 refcount transition that follows a
    // tombstone (the external write lock serializes writers, so there is no
    // concurrent second caller to race with).
    let entry = unsafe { &*ptr };
    if entry.is_reclaimable() {
      // SAFETY: see `reclaim`'s contract; `ptr` is unreachable from the
      // table (it was tombstoned/overwritten before `mark_deleted`) and is
      // reclaimed exactly once.
      unsafe { reclaim(ptr) };
    }
  }
}

impl Default for NodeStore {
  fn default() -> Self {
    Self::new()
  }
}

/// A borrowed, refcounted handle on a node returned by [`NodeStore::get_node`].
///
/// Dropping the guard releases the borrow, replacing the source material's
/// manual `releaseNode` call with RAII — the natural idiom for a
/// scope-bound borrow in Rust.
pub struct NodeGuard<'a> {
  entry: &'a Entry,
}

impl Deref for NodeGuard<'_> {
  type Target = Node;

  fn deref(&self) -> &Node {
    &self.entry.node
  }
}

impl Drop for NodeGuard<'_> {
  fn drop(&mut self) {
    let prev = self.entry.decr_ref();
    if prev == 1 && self.entry.is_reclaimable() {
      // SAFETY: this guard held the last outstanding borrow (`prev == 1`)
      // and the entry is already tombstoned; nothing else can reach it.
      unsafe { reclaim(core::ptr::from_ref(self.entry)) };
    }
  }
}

/// A writable copy of a stored node, produced by [`NodeStore::get_node_copy`].
///
/// Carries the entry it was copied from so [`NodeStore::replace_node`] can
/// detect that the original was concurrently replaced out from under it
/// (property P6). `orig` is only ever compared, never dereferenced — the
/// entry it points at may already have been freed by the time a stale copy
/// is rejected.
pub struct NodeCopy {
  node: Node,
  orig: *const Entry,
}

impl Deref for NodeCopy {
  type Target = Node;

  fn deref(&self) -> &Node {
    &self.node
  }
}

impl core::ops::DerefMut for NodeCopy {
  fn deref_mut(&mut self) -> &mut Node {
    &mut self.node
  }
}

impl Clone for NodeCopy {
  fn clone(&self) -> Self {
    Self { node: self.node.clone(), orig: self.orig }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::Identifier;

  #[test]
  fn insert_get_release_remove_round_trip() {
    let store = NodeStore::new();
    let node = store.new_node(NodeClass::Variable, NodeId::numeric(1, 42));
    let id = store.insert_node(node).unwrap();
    assert_eq!(id, NodeId::numeric(1, 42));

    {
      let guard = store.get_node(&id).unwrap();
      assert_eq!(guard.node_class(), NodeClass::Variable);
    }

    store.remove_node(&id).unwrap();
    assert!(store.get_node(&id).is_none());
  }

  #[test]
  fn get_missing_returns_none() {
    let store = NodeStore::new();
    assert!(store.get_node(&NodeId::numeric(0, 1)).is_none());
  }

  #[test]
  fn remove_missing_is_node_id_unknown() {
    let store = NodeStore::new();
    let err = store.remove_node(&NodeId::numeric(0, 1)).unwrap_err();
    assert!(matches!(err, Error::NodeIdUnknown(_)));
  }

  #[test]
  fn auto_id_assigns_numeric_id_at_or_above_base() {
    let store = NodeStore::new();
    let node = store.new_node(NodeClass::Variable, NodeId::numeric(0, 0));
    let id = store.insert_node(node).unwrap();
    match id.identifier {
      Identifier::Numeric(v) => assert!(v >= AUTO_ID_BASE),
      other => panic!("expected a numeric id, got {other:?}"),
    }
    assert!(store.get_node(&id).is_some());
  }

  #[test]
  fn copy_then_replace_succeeds_once() {
    let store = NodeStore::new();
    let node = store.new_node(NodeClass::Variable, NodeId::numeric(1, 42));
    let id = store.insert_node(node).unwrap();

    let mut copy = store.get_node_copy(&id).unwrap();
    copy.header_mut().browse_name = "renamed".to_owned();
    store.replace_node(copy.clone()).unwrap();

    let guard = store.get_node(&id).unwrap();
    assert_eq!(guard.header().browse_name, "renamed");
    drop(guard);

    // The same stale copy must not apply twice (property P6).
    let err = store.replace_node(copy).unwrap_err();
    assert!(matches!(err, Error::InternalError(_)));
  }

  #[test]
  fn iterate_visits_every_live_node() {
    let store = NodeStore::new();
    for i in 0..5 {
      let node = store.new_node(NodeClass::Variable, NodeId::numeric(1, i));
      store.insert_node(node).unwrap();
    }
    let mut seen = Vec::new();
    store.iterate(|node| seen.push(node.node_id().clone()));
    assert_eq!(seen.len(), 5);
  }

  #[test]
  fn collision_scenario_both_ids_retrievable() {
    let store = NodeStore::with_config(StoreConfig { initial_capacity: 7 });
    let a = NodeId::numeric(1, 1);
    let b = NodeId::numeric(1, 8);
    store.insert_node(store.new_node(NodeClass::Variable, a.clone())).unwrap();
    store.insert_node(store.new_node(NodeClass::Variable, b.clone())).unwrap();
    assert!(store.get_node(&a).is_some());
    assert!(store.get_node(&b).is_some());
  }
}
