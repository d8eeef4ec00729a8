//! Monitored items: the per-subscription (or server-local) sampling
//! configuration the change detector (`crate::detector`) consumes.

use crate::ident::NodeId;
use crate::value::DataValue;
use crate::value::Value;

/// Which fields of a sample carry signal for change comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataChangeTrigger {
  /// Only the status code is compared.
  Status,
  /// Status and value are compared; source timestamps are stripped first.
  StatusValue,
  /// Status, value, and source timestamp are all compared.
  StatusValueTimestamp,
}

/// Which timestamps a read request should populate, passed through to
/// `AttributeReader::read_attribute` unchanged (§4.E).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimestampsToReturn {
  Source,
  Server,
  #[default]
  Both,
  Neither,
}

/// Numeric deadband filtering applied before the byte-level comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeadbandType {
  None,
  Absolute(f64),
  /// Percent of the monitored node's `EURange` (browsed lazily, see
  /// `crate::detector`).
  Percent(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataChangeFilter {
  pub trigger: DataChangeTrigger,
  pub deadband: DeadbandType,
}

impl Default for DataChangeFilter {
  fn default() -> Self {
    Self { trigger: DataChangeTrigger::StatusValue, deadband: DeadbandType::None }
  }
}

/// A single item a subscription (or the server itself) samples.
pub struct MonitoredItem {
  pub monitored_node_id: NodeId,
  pub attribute_id: u32,
  pub index_range: Option<String>,
  pub timestamps_to_return: TimestampsToReturn,
  pub filter: DataChangeFilter,
  /// Target of a server-local monitored item's notification, invoked with
  /// the lock released (§4.F). `None` for subscription-backed items, whose
  /// notifications go through `crate::detector::NotificationSink` instead.
  pub local_callback: Option<Box<dyn FnMut(&DataValue) + Send>>,

  pub(crate) last_sampled_value: Vec<u8>,
  pub(crate) last_value: Option<Value>,
  pub(crate) last_status: u32,
}

impl MonitoredItem {
  #[must_use]
  pub fn new(monitored_node_id: NodeId, attribute_id: u32) -> Self {
    Self {
      monitored_node_id,
      attribute_id,
      index_range: None,
      timestamps_to_return: TimestampsToReturn::default(),
      filter: DataChangeFilter::default(),
      local_callback: None,
      last_sampled_value: Vec::new(),
      last_value: None,
      last_status: 0,
    }
  }

  /// `true` for items with no owning subscription, i.e. the ones whose
  /// change notifications go to `local_callback` instead of a notification
  /// queue.
  #[must_use]
  pub fn is_server_local(&self) -> bool {
    self.local_callback.is_some()
  }
}
