//! The open-addressed, double-hashed slot array with atomic publication.
//!
//! This is the hard part: slots are published with a compare-and-set so a
//! reader that never takes a lock (see the crate-level docs) observes either
//! the pre-publication value or a fully initialized [`Entry`], never a torn
//! pointer. Resizing and tombstone bookkeeping are serialized by whatever
//! external lock the embedding server holds; see [`crate::store`].

use core::cell::UnsafeCell;
use core::sync::atomic::AtomicPtr;
use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering;

use log::warn;

use crate::entry::Entry;
use crate::error::Error;
use crate::ident::NodeId;
use crate::padded::CachePadded;

/// Prime sizes the table grows and shrinks between. Each is roughly double
/// the previous, which keeps the `1 + (h mod (size - 2))` probe step
/// well-distributed regardless of the resident hash.
const PRIMES: &[u32] = &[
  7, 13, 31, 61, 127, 251, 509, 1021, 2039, 4093, 8191, 16381, 32749, 65521, 131_071, 262_139,
  524_287, 1_048_573, 2_097_143, 4_194_301, 8_388_593, 16_777_213, 33_554_393, 67_108_859,
  134_217_689, 268_435_399, 536_870_909, 1_073_741_789, 2_147_483_647, 4_294_967_291,
];

/// Smallest ladder entry that is `>= minimum`, or the largest entry if the
/// ladder is exhausted.
fn ceil_prime(minimum: u32) -> u32 {
  PRIMES.iter().copied().find(|&p| p >= minimum).unwrap_or(*PRIMES.last().unwrap())
}

fn tombstone() -> *mut Entry {
  core::ptr::without_provenance_mut(1)
}

fn is_tombstone(ptr: *mut Entry) -> bool {
  core::ptr::eq(ptr.cast_const(), tombstone().cast_const())
}

/// Decoded contents of one slot.
enum Slot<'a> {
  Empty,
  Tombstone,
  Occupied(&'a Entry),
}

fn decode<'a>(ptr: *mut Entry) -> Slot<'a> {
  if ptr.is_null() {
    Slot::Empty
  } else if is_tombstone(ptr) {
    Slot::Tombstone
  } else {
    // SAFETY: any non-null, non-tombstone value ever stored in a slot was
    // produced by `Box::into_raw` on a live `Entry` and is only ever freed
    // after being removed from the slot array (see `NodeStore::reclaim`).
    Slot::Occupied(unsafe { &*ptr })
  }
}

/// The slot array plus its resident/logical size.
///
/// `slots` sits behind an [`UnsafeCell`] because resizing replaces the whole
/// boxed slice; per the crate's concurrency model this is only ever done by
/// the single writer the embedding server serializes through its own lock,
/// and lock-free readers are only expected to run during quiescent periods
/// with no concurrent resize (see the crate-level docs). `size`/`count` are
/// plain atomics so a reader can snapshot them without even that caveat.
pub(crate) struct Table {
  slots: UnsafeCell<Box<[CachePadded<AtomicPtr<Entry>>]>>,
  size: AtomicU32,
  count: AtomicU32,
}

// SAFETY: see the module and struct docs: all mutation of `slots` beyond a
// single slot's own CAS happens under the embedding server's external write
// lock, which the caller is responsible for upholding. This is a documented
// departure from requiring every caller to prove exclusivity to the
// compiler, matching this crate's concurrency model.
unsafe impl Send for Table {}
unsafe impl Sync for Table {}

impl Table {
  pub(crate) fn with_capacity(minimum: u32) -> Self {
    let size = ceil_prime(minimum);
    Self::with_prime_size(size)
  }

  fn with_prime_size(size: u32) -> Self {
    let slots = (0..size).map(|_| CachePadded::new(AtomicPtr::new(core::ptr::null_mut()))).collect();
    Self { slots: UnsafeCell::new(slots), size: AtomicU32::new(size), count: AtomicU32::new(0) }
  }

  #[must_use]
  pub(crate) fn size(&self) -> u32 {
    self.size.load(Ordering::Acquire)
  }

  #[must_use]
  pub(crate) fn count(&self) -> u32 {
    self.count.load(Ordering::Acquire)
  }

  /// # Safety
  /// Must not be called concurrently with [`Table::grow_if_needed`] or
  /// [`Table::shrink_if_needed`] actually reallocating (i.e. a resize really
  /// taking place). Every call site in this crate holds the caller's
  /// external write lock while this is live, except the signal-context
  /// read path, whose own contract forbids concurrent resize.
  unsafe fn slots(&self) -> &[CachePadded<AtomicPtr<Entry>>] {
    // SAFETY: forwarded to caller, see above.
    unsafe { &*self.slots.get() }
  }

  fn primary_index(hash: u32, size: u32) -> u32 {
    hash % size
  }

  fn step(hash: u32, size: u32) -> u32 {
    1 + (hash % (size - 2))
  }

  /// Looks up `id` by probing, returning a borrowed reference to the
  /// occupied entry on a hit.
  pub(crate) fn find(&self, id: &NodeId) -> Option<&Entry> {
    let hash = id.table_hash();
    let size = self.size();
    // SAFETY: no resize can be concurrently reallocating across this probe
    // per the contract documented on `Table`/`slots`.
    let slots = unsafe { self.slots() };
    let mut index = Self::primary_index(hash, size);
    let step = Self::step(hash, size);
    for _ in 0..size {
      match decode(slots[index as usize].load(Ordering::Acquire)) {
        Slot::Empty => return None,
        Slot::Tombstone => {}
        Slot::Occupied(entry) => {
          if entry.node_id_hash == hash && entry.node.node_id() == id {
            return Some(entry);
          }
        }
      }
      index = (index + step) % size;
    }
    None
  }

  /// Finds a slot suitable for inserting `id`, preferring the first
  /// tombstone seen over a trailing empty slot. Returns `None` on a
  /// duplicate id or a full table with no tombstones.
  fn find_free_index(&self, id: &NodeId, hash: u32) -> Option<u32> {
    let size = self.size();
    // SAFETY: see `find`.
    let slots = unsafe { self.slots() };
    let mut index = Self::primary_index(hash, size);
    let step = Self::step(hash, size);
    let mut candidate = None;
    for _ in 0..size {
      match decode(slots[index as usize].load(Ordering::Acquire)) {
        Slot::Empty => return Some(candidate.unwrap_or(index)),
        Slot::Tombstone => {
          if candidate.is_none() {
            candidate = Some(index);
          }
        }
        Slot::Occupied(entry) => {
          if entry.node_id_hash == hash && entry.node.node_id() == id {
            return None;
          }
        }
      }
      index = (index + step) % size;
    }
    candidate
  }

  /// Publishes `entry` (already heap-allocated) into a free slot for `id`.
  /// Runs a grow check first, per invariant I1.
  pub(crate) fn insert(&self, id: &NodeId, entry: Box<Entry>) -> Result<*const Entry, (Error, Box<Entry>)> {
    if let Err(err) = self.grow_if_needed() {
      return Err((err, entry));
    }
    let hash = id.table_hash();
    let Some(index) = self.find_free_index(id, hash) else {
      let is_duplicate = self.find(id).is_some();
      let kind = if is_duplicate { Error::NodeIdExists(id.to_string()) } else { Error::InternalError("table full") };
      return Err((kind, entry));
    };
    let ptr = Box::into_raw(entry);
    // SAFETY: see `find`.
    let slots = unsafe { self.slots() };
    let slot = &slots[index as usize];
    let previous = slot.load(Ordering::Acquire);
    match slot.compare_exchange(previous, ptr, Ordering::AcqRel, Ordering::Acquire) {
      Ok(_) => {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(ptr.cast_const())
      }
      Err(_) => {
        // SAFETY: `ptr` was just produced by `Box::into_raw` above and has
        // not been published anywhere.
        let entry = unsafe { Box::from_raw(ptr) };
        Err((Error::InternalError("slot publication conflict"), entry))
      }
    }
  }

  /// Replaces the currently-published entry for `id` with `new_entry`,
  /// provided it still matches `expected_current` (the copy-on-write
  /// stale-copy check). On success returns the replaced (now orphaned)
  /// entry pointer for the caller to mark deleted and reclaim.
  pub(crate) fn replace(
    &self,
    id: &NodeId,
    expected_current: *const Entry,
    new_entry: Box<Entry>,
  ) -> Result<*const Entry, (Error, Box<Entry>)> {
    let hash = id.table_hash();
    let size = self.size();
    // SAFETY: see `find`.
    let slots = unsafe { self.slots() };
    let mut index = Self::primary_index(hash, size);
    let step = Self::step(hash, size);
    for _ in 0..size {
      let slot = &slots[index as usize];
      match decode(slot.load(Ordering::Acquire)) {
        Slot::Empty => return Err((Error::NodeIdUnknown(id.to_string()), new_entry)),
        Slot::Tombstone => {}
        Slot::Occupied(entry) if entry.node_id_hash == hash && entry.node.node_id() == id => {
          let current = core::ptr::from_ref(entry).cast_mut();
          if !core::ptr::eq(current.cast_const(), expected_current) {
            return Err((Error::InternalError("stale copy: node was modified concurrently"), new_entry));
          }
          let new_ptr = Box::into_raw(new_entry);
          return match slot.compare_exchange(current, new_ptr, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(current.cast_const()),
            Err(_) => {
              // SAFETY: just allocated, not yet published.
              let entry = unsafe { Box::from_raw(new_ptr) };
              Err((Error::InternalError("slot publication conflict"), entry))
            }
          };
        }
        Slot::Occupied(_) => {}
      }
      index = (index + step) % size;
    }
    Err((Error::NodeIdUnknown(id.to_string()), new_entry))
  }

  /// Tombstones the slot holding `id`. Returns the removed entry pointer so
  /// the caller can mark it deleted and attempt reclamation. Runs a shrink
  /// check afterward, per the design's resize-on-remove policy.
  pub(crate) fn remove(&self, id: &NodeId) -> Option<*const Entry> {
    let hash = id.table_hash();
    let size = self.size();
    // SAFETY: see `find`.
    let slots = unsafe { self.slots() };
    let mut index = Self::primary_index(hash, size);
    let step = Self::step(hash, size);
    let mut found = None;
    for _ in 0..size {
      let slot = &slots[index as usize];
      match decode(slot.load(Ordering::Acquire)) {
        Slot::Empty => break,
        Slot::Tombstone => {}
        Slot::Occupied(entry) if entry.node_id_hash == hash && entry.node.node_id() == id => {
          let current = core::ptr::from_ref(entry).cast_mut();
          if slot.compare_exchange(current, tombstone(), Ordering::AcqRel, Ordering::Acquire).is_ok() {
            found = Some(current.cast_const());
          }
          break;
        }
        Slot::Occupied(_) => {}
      }
      index = (index + step) % size;
    }
    if found.is_some() {
      self.count.fetch_sub(1, Ordering::AcqRel);
      self.shrink_if_needed();
    }
    found
  }

  /// Snapshot of every occupied entry at call time, for `iterate`/`clear`.
  pub(crate) fn occupied(&self) -> Vec<*const Entry> {
    // SAFETY: see `find`.
    let slots = unsafe { self.slots() };
    slots
      .iter()
      .filter_map(|slot| match decode(slot.load(Ordering::Acquire)) {
        Slot::Occupied(entry) => Some(core::ptr::from_ref(entry)),
        _ => None,
      })
      .collect()
  }

  /// Checks the load factor the insert in progress would produce — the
  /// count *after* this insert publishes its new slot, not the count before
  /// it — against the 75% grow threshold (invariant I1).
  fn grow_if_needed(&self) -> Result<(), Error> {
    let size = self.size();
    let projected_count = self.count() + 1;
    if 4 * u64::from(projected_count) >= 3 * u64::from(size) {
      self.resize_to(ceil_prime(2 * projected_count))?;
    }
    Ok(())
  }

  /// A failed shrink is non-fatal (§4.C): the table just keeps its current
  /// size, logging the attempt.
  fn shrink_if_needed(&self) {
    let size = self.size();
    let count = self.count();
    if size > 32 && 8 * count < size {
      if let Err(err) = self.resize_to(ceil_prime((2 * count).max(7))) {
        warn!(target: "nodestore::table", "shrink attempt failed, keeping size {size}: {err}");
      }
    }
  }

  fn resize_to(&self, new_size: u32) -> Result<(), Error> {
    if new_size == self.size() {
      return Ok(());
    }
    let occupied = self.occupied();
    let mut new_vec: Vec<CachePadded<AtomicPtr<Entry>>> = Vec::new();
    new_vec
      .try_reserve_exact(new_size as usize)
      .map_err(|_| Error::BadInternalError("rehash allocation failed"))?;
    new_vec.extend((0..new_size).map(|_| CachePadded::new(AtomicPtr::new(core::ptr::null_mut()))));
    let new_slots = new_vec.into_boxed_slice();
    for ptr in occupied {
      // SAFETY: `ptr` came from this table's own `occupied()` snapshot and
      // is still live (no concurrent writer, per the external lock
      // contract).
      let entry = unsafe { &*ptr };
      let hash = entry.node_id_hash;
      let mut index = Self::primary_index(hash, new_size);
      let step = Self::step(hash, new_size);
      loop {
        let slot = &new_slots[index as usize];
        if slot.load(Ordering::Relaxed).is_null() {
          slot.store(ptr.cast_mut(), Ordering::Relaxed);
          break;
        }
        index = (index + step) % new_size;
      }
    }
    // SAFETY: only the single writer reaches this assignment, per the
    // contract documented on `Table`.
    unsafe {
      *self.slots.get() = new_slots;
    }
    self.size.store(new_size, Ordering::Release);
    Ok(())
  }
}

impl Drop for Table {
  fn drop(&mut self) {
    for ptr in self.occupied() {
      // SAFETY: `self` is being dropped, so no other reference to these
      // entries can remain; every live slot pointer was produced by
      // `Box::into_raw`.
      drop(unsafe { Box::from_raw(ptr.cast_mut()) });
    }
  }
}
