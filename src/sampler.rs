//! The value sampler (§4.E): reads one attribute of a monitored node,
//! synthesizing a status-only value when the node has disappeared.

use log::warn;

use crate::monitored::MonitoredItem;
use crate::store::NodeStore;
use crate::value::AttributeReader;
use crate::value::DataValue;

/// `BadNodeIdUnknown`, the status code synthesized when the monitored
/// node no longer exists in the store.
pub const STATUS_BAD_NODE_ID_UNKNOWN: u32 = 0x8035_0000;

/// Samples `item`'s attribute through `reader`, borrowing the node from
/// `store` only for the duration of the read.
#[must_use]
pub fn sample(store: &NodeStore, item: &MonitoredItem, reader: &dyn AttributeReader) -> DataValue {
  let Some(guard) = store.get_node(&item.monitored_node_id) else {
    warn!(target: "nodestore::sampler", "{} not found while sampling", item.monitored_node_id);
    return DataValue::bad(STATUS_BAD_NODE_ID_UNKNOWN);
  };
  match reader.read_attribute(guard.node_id(), item.attribute_id, item.index_range.as_deref(), item.timestamps_to_return) {
    Ok(value) => value,
    Err(err) => {
      warn!(target: "nodestore::sampler", "{} attribute read failed: {err}", item.monitored_node_id);
      DataValue::bad(STATUS_BAD_NODE_ID_UNKNOWN)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use crate::ident::NodeId;
  use crate::monitored::TimestampsToReturn;
  use crate::node::NodeClass;
  use crate::value::Value;

  struct FixedReader(Value);
  impl AttributeReader for FixedReader {
    fn read_attribute(
      &self,
      _node_id: &NodeId,
      _attribute_id: u32,
      _index_range: Option<&str>,
      _timestamps_to_return: TimestampsToReturn,
    ) -> Result<DataValue, Error> {
      Ok(DataValue::good(self.0.clone()))
    }
  }

  #[test]
  fn missing_node_synthesizes_bad_status() {
    let store = NodeStore::new();
    let item = MonitoredItem::new(NodeId::numeric(1, 1), 13);
    let reader = FixedReader(Value::Double(1.0));
    let value = sample(&store, &item, &reader);
    assert_eq!(value.status, STATUS_BAD_NODE_ID_UNKNOWN);
    assert!(value.value.is_none());
  }

  #[test]
  fn present_node_reads_through() {
    let store = NodeStore::new();
    let id = store.insert_node(store.new_node(NodeClass::Variable, NodeId::numeric(1, 1))).unwrap();
    let item = MonitoredItem::new(id, 13);
    let reader = FixedReader(Value::Double(2.5));
    let value = sample(&store, &item, &reader);
    assert_eq!(value.value, Some(Value::Double(2.5)));
  }
}
