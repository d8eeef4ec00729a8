//! Loom model of the slot-publication primitive (§4.C): a writer publishing
//! an entry pointer via compare-and-set while a reader concurrently loads
//! the same slot must never observe a torn value.
//!
//! This deliberately models just the single-slot CAS, not the whole
//! resizable table — loom's state-space explosion makes a full-table model
//! impractical, and the slot CAS is the one piece of `crate::table` that
//! genuinely needs to be lock-free under concurrent readers (writers are
//! externally serialized; see the crate-level docs).
//!
//! Run with `RUSTFLAGS="--cfg loom" cargo test --test loom --features loom`.

#![cfg(loom)]

use loom::sync::atomic::AtomicPtr;
use loom::sync::atomic::Ordering;
use loom::sync::Arc;
use loom::thread;

const TOMBSTONE: usize = 1;

#[test]
fn publish_is_visible_whole_or_not_at_all() {
  loom::model(|| {
    let slot: Arc<AtomicPtr<u64>> = Arc::new(AtomicPtr::new(core::ptr::null_mut()));
    let payload = Box::into_raw(Box::new(42_u64));

    let writer_slot = Arc::clone(&slot);
    let writer = thread::spawn(move || {
      writer_slot
        .compare_exchange(core::ptr::null_mut(), payload, Ordering::AcqRel, Ordering::Acquire)
        .expect("slot starts empty, CAS must succeed");
    });

    let reader_slot = Arc::clone(&slot);
    let reader = thread::spawn(move || {
      let observed = reader_slot.load(Ordering::Acquire);
      if !observed.is_null() && (observed as usize) != TOMBSTONE {
        // SAFETY: the only non-null, non-tombstone value ever stored here
        // is `payload`, fully initialized before the CAS that published it.
        let value = unsafe { *observed };
        assert_eq!(value, 42);
      }
    });

    writer.join().unwrap();
    reader.join().unwrap();

    // SAFETY: both threads have joined; nothing else can reach `payload`.
    drop(unsafe { Box::from_raw(payload) });
  });
}

#[test]
fn tombstone_write_is_never_confused_with_a_live_pointer() {
  loom::model(|| {
    let payload = Box::into_raw(Box::new(7_u64));
    let slot: Arc<AtomicPtr<u64>> = Arc::new(AtomicPtr::new(payload));

    let remover_slot = Arc::clone(&slot);
    let remover = thread::spawn(move || {
      remover_slot
        .compare_exchange(payload, TOMBSTONE as *mut u64, Ordering::AcqRel, Ordering::Acquire)
        .expect("slot starts occupied, CAS must succeed");
    });

    let reader_slot = Arc::clone(&slot);
    let reader = thread::spawn(move || {
      let observed = reader_slot.load(Ordering::Acquire);
      assert!(observed == payload || (observed as usize) == TOMBSTONE);
    });

    remover.join().unwrap();
    reader.join().unwrap();

    // SAFETY: both threads have joined; nothing else can reach `payload`.
    drop(unsafe { Box::from_raw(payload) });
  });
}
