//! Attribute values and the `DataValue` envelope the sampler reads.

use crate::error::Error;
use crate::monitored::TimestampsToReturn;

/// The attribute value carried by a Variable or VariableType node.
///
/// Only the variants the change detector needs to reason about (numeric
/// arrays, for deadband filtering) are broken out; everything else that
/// isn't a plain scalar/array of numbers collapses to `Other`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  Empty,
  Boolean(bool),
  Int32(i32),
  UInt32(u32),
  Double(f64),
  String(String),
  DoubleArray(Vec<f64>),
  Other(Vec<u8>),
}

impl Value {
  /// `true` for the numeric scalar/array variants deadband filtering applies
  /// to.
  #[must_use]
  pub fn is_numeric(&self) -> bool {
    matches!(
      self,
      Value::Int32(_) | Value::UInt32(_) | Value::Double(_) | Value::DoubleArray(_)
    )
  }

  /// This value as a slice of `f64`, widening scalars to a one-element
  /// array. `None` for non-numeric values.
  #[must_use]
  pub fn as_double_slice(&self) -> Option<Vec<f64>> {
    match self {
      Value::Int32(v) => Some(vec![f64::from(*v)]),
      Value::UInt32(v) => Some(vec![f64::from(*v)]),
      Value::Double(v) => Some(vec![*v]),
      Value::DoubleArray(v) => Some(v.clone()),
      _ => None,
    }
  }
}

/// A sampled value together with its status and timestamps, the unit the
/// change detector filters and compares.
#[derive(Clone, Debug, PartialEq)]
pub struct DataValue {
  pub value: Option<Value>,
  pub status: u32,
  pub source_timestamp: Option<i64>,
  pub server_timestamp: Option<i64>,
}

impl DataValue {
  #[must_use]
  pub fn good(value: Value) -> Self {
    Self { value: Some(value), status: 0, source_timestamp: None, server_timestamp: None }
  }

  #[must_use]
  pub fn bad(status: u32) -> Self {
    Self { value: None, status, source_timestamp: None, server_timestamp: None }
  }
}

/// Reads a single attribute of a node. Implemented by the embedding server;
/// the sampler (`crate::sampler`) only ever calls through this trait.
pub trait AttributeReader {
  fn read_attribute(
    &self,
    node_id: &crate::ident::NodeId,
    attribute_id: u32,
    index_range: Option<&str>,
    timestamps_to_return: TimestampsToReturn,
  ) -> Result<DataValue, Error>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scalar_widens_to_one_element_array() {
    assert_eq!(Value::Double(1.5).as_double_slice(), Some(vec![1.5]));
    assert_eq!(Value::Int32(3).as_double_slice(), Some(vec![3.0]));
  }

  #[test]
  fn non_numeric_has_no_double_slice() {
    assert_eq!(Value::String("x".into()).as_double_slice(), None);
  }
}
