//! A lock-free address-space node store and change-detection sampler for an
//! OPC UA-style server.
//!
//! [`NodeStore`] maps stable [`NodeId`]s to variant-sized [`Node`] records in
//! an open-addressed, double-hashed table. Writes (insert/replace/remove)
//! are expected to be serialized by an external lock held by the embedding
//! server; lookups may run concurrently with that writer from a
//! signal-context caller that never blocks, because every slot is published
//! with a single atomic compare-and-set (see the `table` module).
//!
//! # Usage
//!
//! ```
//! use nodestore::{NodeClass, NodeId, NodeStore};
//!
//! let store = NodeStore::new();
//! let node = store.new_node(NodeClass::Variable, NodeId::numeric(1, 42));
//! let id = store.insert_node(node).unwrap();
//!
//! let guard = store.get_node(&id).unwrap();
//! assert_eq!(guard.node_class(), NodeClass::Variable);
//! drop(guard);
//!
//! store.remove_node(&id).unwrap();
//! assert!(store.get_node(&id).is_none());
//! ```
//!
//! # Change detection
//!
//! [`detector::detect_and_sample`] applies trigger-based field projection,
//! numeric deadband filtering, and a binary-encoding comparison to decide
//! whether a freshly [`sampler::sample`]d value is worth a notification; see
//! those modules' docs for the full pipeline.
//!
//! # Configuration
//!
//! [`StoreConfig`] controls the table's starting capacity; see its docs.
//!
//! # Errors
//!
//! Every fallible operation returns [`Error`]; nothing in this crate panics
//! on a caller-reachable bad path.

mod codec;
mod config;
mod detector;
mod entry;
mod error;
mod ident;
mod monitored;
mod node;
mod padded;
mod sampler;
mod store;
mod table;
mod value;

pub use config::StoreConfig;
pub use detector::detect_and_sample;
pub use detector::EuRangeLookup;
pub use detector::Notification;
pub use detector::NotificationSink;
pub use error::Error;
pub use ident::Identifier;
pub use ident::NodeId;
pub use monitored::DataChangeFilter;
pub use monitored::DataChangeTrigger;
pub use monitored::DeadbandType;
pub use monitored::MonitoredItem;
pub use monitored::TimestampsToReturn;
pub use node::DataTypeNode;
pub use node::MethodNode;
pub use node::Node;
pub use node::NodeClass;
pub use node::NodeHeader;
pub use node::ObjectNode;
pub use node::ObjectTypeNode;
pub use node::Reference;
pub use node::ReferenceTypeNode;
pub use node::VariableNode;
pub use node::VariableTypeNode;
pub use node::ViewNode;
pub use sampler::sample;
pub use sampler::STATUS_BAD_NODE_ID_UNKNOWN;
pub use store::NodeCopy;
pub use store::NodeGuard;
pub use store::NodeStore;
pub use value::AttributeReader;
pub use value::DataValue;
pub use value::Value;
