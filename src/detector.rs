//! The change detector: filter projection, deadband pre-filtering, and
//! binary-encoding comparison (§4.F).

use log::debug;
use log::warn;

use crate::codec::encode_to_vec;
use crate::ident::NodeId;
use crate::monitored::DataChangeTrigger;
use crate::monitored::DeadbandType;
use crate::monitored::MonitoredItem;
use crate::value::DataValue;
use crate::value::Value;

/// A confirmed change, ready to hand to a subscription's publish queue.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
  pub monitored_node_id: NodeId,
  pub value: DataValue,
}

/// Where a confirmed change goes for a subscription-backed monitored item.
/// Implemented by the embedding server; see `crate::store`'s discussion of
/// external collaborators for why this is a trait rather than a concrete
/// publish-engine type.
pub trait NotificationSink {
  fn enqueue(&mut self, notification: Notification);
}

/// Looks up a monitored node's `EURange` child, for percent deadband.
/// Implemented by the embedding server's browse logic.
pub trait EuRangeLookup {
  fn eu_range(&self, node_id: &NodeId) -> Option<(f64, f64)>;
}

/// Strips the fields a trigger doesn't care about, per §4.F step 1.
fn project(trigger: DataChangeTrigger, mut sample: DataValue) -> DataValue {
  sample.server_timestamp = None;
  match trigger {
    DataChangeTrigger::Status => {
      sample.value = None;
      sample.source_timestamp = None;
    }
    DataChangeTrigger::StatusValue => {
      sample.source_timestamp = None;
    }
    DataChangeTrigger::StatusValueTimestamp => {}
  }
  sample
}

/// `true` if the deadband filter says this is a "real" change, `false` if
/// it should be suppressed before even reaching the byte-level comparison.
/// Non-numeric values and `DeadbandType::None` always pass through.
fn passes_deadband(
  deadband: DeadbandType,
  sample: &DataValue,
  last_value: Option<&Value>,
  last_status: u32,
  eu_range: &dyn EuRangeLookup,
  node_id: &NodeId,
) -> bool {
  let DeadbandType::Absolute(_) | DeadbandType::Percent(_) = deadband else {
    return true;
  };
  let Some(new_value) = sample.value.as_ref() else {
    return true;
  };
  if !new_value.is_numeric() {
    return true;
  }
  let Some(last_value) = last_value else {
    return true; // nothing to compare against yet: treat as changed.
  };
  if !last_value.is_numeric() {
    return true;
  }

  let max_dist = match deadband {
    DeadbandType::Absolute(d) => d,
    DeadbandType::Percent(percent) => {
      let is_scalar = !matches!(new_value, Value::DoubleArray(_));
      if is_scalar && sample.status != last_status {
        // A status change short-circuits to "changed" (scalar only).
        return true;
      }
      match eu_range.eu_range(node_id) {
        Some((low, high)) => (percent / 100.0) * (high - low),
        None => return false, // missing/malformed EURange: treat as no change.
      }
    }
    DeadbandType::None => unreachable!(),
  };

  out_of_deadband(new_value, last_value, max_dist)
}

fn out_of_deadband(new_value: &Value, last_value: &Value, max_dist: f64) -> bool {
  let (Some(new_arr), Some(last_arr)) = (new_value.as_double_slice(), last_value.as_double_slice())
  else {
    return true;
  };
  if new_arr.len() != last_arr.len() {
    return true;
  }
  new_arr.iter().zip(last_arr.iter()).any(|(a, b)| (a - b).abs() > max_dist)
}

/// Runs one sample through the full change-detection pipeline for `item`.
///
/// On a confirmed change, the notification is handed to `sink` (when the
/// item belongs to a subscription) or, for a server-local item, the lock is
/// released via `release_lock`, the item's `local_callback` is invoked, and
/// the lock is reacquired via `reacquire_lock` — matching the ordering in
/// §4.F step 4.
pub fn detect_and_sample(
  item: &mut MonitoredItem,
  sample: DataValue,
  eu_range: &dyn EuRangeLookup,
  sink: Option<&mut dyn NotificationSink>,
  release_lock: impl FnOnce(),
  reacquire_lock: impl FnOnce(),
) {
  let filtered = project(item.filter.trigger, sample);

  if !passes_deadband(
    item.filter.deadband,
    &filtered,
    item.last_value.as_ref(),
    item.last_status,
    eu_range,
    &item.monitored_node_id,
  ) {
    debug!(target: "nodestore::detector", "{} suppressed by deadband", item.monitored_node_id);
    return;
  }

  let encoded = encode_to_vec(&filtered);
  if encoded == item.last_sampled_value {
    debug!(target: "nodestore::detector", "{} unchanged", item.monitored_node_id);
    return;
  }

  // Best-effort: always update, matching the ground truth's unconditional
  // lastValue/lastStatus refresh on a confirmed change (every
  // trigger/deadband combination ends up running this).
  item.last_sampled_value = encoded;
  item.last_status = filtered.status;
  item.last_value = filtered.value.clone();

  if item.is_server_local() {
    release_lock();
    if let Some(callback) = item.local_callback.as_mut() {
      callback(&filtered);
    } else {
      warn!(target: "nodestore::detector", "{} marked server-local with no callback", item.monitored_node_id);
    }
    reacquire_lock();
  } else if let Some(sink) = sink {
    sink.enqueue(Notification { monitored_node_id: item.monitored_node_id.clone(), value: filtered });
  } else {
    warn!(target: "nodestore::detector", "{} changed but has no subscription sink", item.monitored_node_id);
  }
}
