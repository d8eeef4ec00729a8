//! A small binary encoder used only to compare successive samples for
//! equality (§4.G). Deliberately not `serde`: the wire format here is an
//! internal comparison key, never exchanged with a peer, so a direct
//! tag-and-bytes writer is simpler and matches the source material's
//! stack-buffer-then-heap-fallback sizing pattern.

use crate::error::Error;
use crate::value::DataValue;
use crate::value::Value;

/// Size of the inline buffer tried before falling back to a heap
/// allocation, mirroring the original's stack-buffer-first strategy.
const INLINE_CAPACITY: usize = 64;

/// Computes the exact encoded size of `value`, so a caller that overflowed
/// the inline buffer can allocate precisely once.
#[must_use]
pub fn calc_size(value: &DataValue) -> usize {
  let mut size = 4; // status code, always present
  size += match &value.value {
    None => 1,
    Some(v) => 1 + value_size(v),
  };
  size += 1 + usize::from(value.source_timestamp.is_some()) * 8;
  size += 1 + usize::from(value.server_timestamp.is_some()) * 8;
  size
}

fn value_size(value: &Value) -> usize {
  match value {
    Value::Empty => 0,
    Value::Boolean(_) => 1,
    Value::Int32(_) | Value::UInt32(_) => 4,
    Value::Double(_) => 8,
    Value::String(s) => 4 + s.len(),
    Value::DoubleArray(a) => 4 + 8 * a.len(),
    Value::Other(b) => 4 + b.len(),
  }
}

/// Encodes `value` into `buf`, returning the number of bytes written.
///
/// # Errors
/// Returns [`Error::EncodingError`] if `buf` is too small; the caller should
/// retry with a buffer sized by [`calc_size`].
pub fn encode(value: &DataValue, buf: &mut [u8]) -> Result<usize, Error> {
  let needed = calc_size(value);
  if buf.len() < needed {
    return Err(Error::EncodingError("buffer too small"));
  }
  let mut w = Writer { buf, pos: 0 };
  w.put_u32(value.status);
  match &value.value {
    None => w.put_u8(0),
    Some(v) => {
      w.put_u8(1);
      encode_value(v, &mut w);
    }
  }
  encode_timestamp(value.source_timestamp, &mut w);
  encode_timestamp(value.server_timestamp, &mut w);
  Ok(w.pos)
}

/// Encodes `value` into a buffer sized automatically: the small inline
/// buffer first, falling back to a heap allocation sized exactly by
/// [`calc_size`] only when that overflows.
#[must_use]
pub fn encode_to_vec(value: &DataValue) -> Vec<u8> {
  let mut inline = [0_u8; INLINE_CAPACITY];
  if let Ok(len) = encode(value, &mut inline) {
    return inline[..len].to_vec();
  }
  let mut heap = vec![0_u8; calc_size(value)];
  let len = encode(value, &mut heap).expect("heap buffer sized by calc_size");
  heap.truncate(len);
  heap
}

fn encode_timestamp(ts: Option<i64>, w: &mut Writer<'_>) {
  match ts {
    None => w.put_u8(0),
    Some(v) => {
      w.put_u8(1);
      w.put_i64(v);
    }
  }
}

fn encode_value(value: &Value, w: &mut Writer<'_>) {
  match value {
    Value::Empty => {}
    Value::Boolean(v) => w.put_u8(u8::from(*v)),
    Value::Int32(v) => w.put_i32(*v),
    Value::UInt32(v) => w.put_u32(*v),
    Value::Double(v) => w.put_f64(*v),
    Value::String(v) => w.put_bytes(v.as_bytes()),
    Value::DoubleArray(v) => {
      w.put_u32(v.len() as u32);
      for item in v {
        w.put_f64(*item);
      }
    }
    Value::Other(v) => w.put_bytes(v),
  }
}

struct Writer<'a> {
  buf: &'a mut [u8],
  pos: usize,
}

impl Writer<'_> {
  fn put_u8(&mut self, v: u8) {
    self.buf[self.pos] = v;
    self.pos += 1;
  }

  fn put_u32(&mut self, v: u32) {
    self.buf[self.pos..self.pos + 4].copy_from_slice(&v.to_le_bytes());
    self.pos += 4;
  }

  fn put_i32(&mut self, v: i32) {
    self.buf[self.pos..self.pos + 4].copy_from_slice(&v.to_le_bytes());
    self.pos += 4;
  }

  fn put_i64(&mut self, v: i64) {
    self.buf[self.pos..self.pos + 8].copy_from_slice(&v.to_le_bytes());
    self.pos += 8;
  }

  fn put_f64(&mut self, v: f64) {
    self.buf[self.pos..self.pos + 8].copy_from_slice(&v.to_le_bytes());
    self.pos += 8;
  }

  fn put_bytes(&mut self, v: &[u8]) {
    self.put_u32(v.len() as u32);
    self.buf[self.pos..self.pos + v.len()].copy_from_slice(v);
    self.pos += v.len();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_values_encode_identically() {
    let a = DataValue::good(Value::Double(1.5));
    let b = DataValue::good(Value::Double(1.5));
    assert_eq!(encode_to_vec(&a), encode_to_vec(&b));
  }

  #[test]
  fn different_values_encode_differently() {
    let a = DataValue::good(Value::Double(1.5));
    let b = DataValue::good(Value::Double(1.6));
    assert_ne!(encode_to_vec(&a), encode_to_vec(&b));
  }

  #[test]
  fn status_change_alone_changes_encoding() {
    let a = DataValue { status: 0, ..DataValue::good(Value::Double(1.5)) };
    let b = DataValue { status: 1, ..DataValue::good(Value::Double(1.5)) };
    assert_ne!(encode_to_vec(&a), encode_to_vec(&b));
  }

  #[test]
  fn calc_size_matches_actual_encoded_length() {
    let value = DataValue::good(Value::String("hello world, this is long enough to overflow the inline buffer for sure".into()));
    let exact = calc_size(&value);
    let mut buf = vec![0_u8; exact];
    let written = encode(&value, &mut buf).unwrap();
    assert_eq!(written, exact);
  }

  #[test]
  fn encoding_error_on_undersized_buffer() {
    let value = DataValue::good(Value::Double(1.0));
    let mut tiny = [0_u8; 1];
    assert!(matches!(encode(&value, &mut tiny), Err(Error::EncodingError(_))));
  }
}
