//! The error taxonomy shared by every public operation.

/// Everything that can go wrong in the store or the sampler.
///
/// `Good` from the source material this crate is modeled on is represented
/// by `Ok(())`/`Ok(value)` rather than a variant here.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  #[error("allocation failed")]
  OutOfMemory,

  #[error("node id {0} is not present in the store")]
  NodeIdUnknown(String),

  #[error("node id {0} already exists")]
  NodeIdExists(String),

  #[error("internal error: {0}")]
  InternalError(&'static str),

  #[error("binary encoding failed: {0}")]
  EncodingError(&'static str),

  #[error("rehash failed during insert: {0}")]
  BadInternalError(&'static str),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_includes_node_id() {
    let err = Error::NodeIdUnknown("ns=1;i=1".to_owned());
    assert!(err.to_string().contains("ns=1;i=1"));
  }
}
