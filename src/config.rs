//! Construction-time knobs for [`crate::store::NodeStore`].

/// Tunables for a [`crate::store::NodeStore`].
///
/// The resize ladder itself is fixed (see `crate::table`); this only
/// controls where on that ladder a fresh store starts out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreConfig {
  /// Minimum number of slots to allocate up front. Rounded up to the
  /// nearest entry on the internal prime ladder.
  pub initial_capacity: u32,
}

impl StoreConfig {
  /// Matches the historical `UA_NODEMAP_MINSIZE` default of 64 entries,
  /// rounded up to the nearest ladder prime (127).
  pub const DEFAULT_INITIAL_CAPACITY: u32 = 64;
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self { initial_capacity: Self::DEFAULT_INITIAL_CAPACITY }
  }
}
