//! Positional-array message encoding, the inverse of [`decode`](super::decode).

use super::decoded::{DecodedMessage, FieldValue, ScalarValue};
use crate::value::Value;

/// Encode a message as a positional array.
///
/// Field ordinal `n` lands at position `n - 1`; absent fields become `null`
/// and trailing `null`s are dropped. Enums encode as their numbers and bytes
/// as byte values.
///
/// # Example
///
/// ```
/// use batchexecute_core::{encode, DecodedMessage, FieldKind, Schema};
///
/// let schema = Schema::builder("Rename")
///     .field(1, "id", FieldKind::string())
///     .field(4, "title", FieldKind::string())
///     .build()
///     .unwrap();
/// let message = DecodedMessage::new(schema).with("title", "New title").unwrap();
///
/// assert_eq!(encode(&message).to_json_string(), r#"[null,null,null,"New title"]"#);
/// ```
pub fn encode(message: &DecodedMessage) -> Value {
    let len = message.iter().map(|(ordinal, _)| ordinal).max().unwrap_or(0) as usize;
    let mut items = vec![Value::Null; len];
    for (ordinal, value) in message.iter() {
        items[ordinal as usize - 1] = encode_field(value);
    }
    Value::Array(items)
}

fn encode_field(value: &FieldValue) -> Value {
    match value {
        FieldValue::Scalar(scalar) => encode_scalar(scalar),
        FieldValue::Message(message) => encode(message),
        FieldValue::Repeated(items) => Value::Array(items.iter().map(encode_field).collect()),
    }
}

fn encode_scalar(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::String(s) => Value::String(s.clone()),
        ScalarValue::Int32(n) | ScalarValue::Enum(n) => Value::from(*n),
        ScalarValue::Int64(n) => Value::from(*n),
        ScalarValue::UInt32(n) => Value::from(*n),
        ScalarValue::UInt64(n) => Value::from(*n),
        ScalarValue::Float(f) => Value::from(*f),
        ScalarValue::Double(f) => Value::from(*f),
        ScalarValue::Bool(b) => Value::Bool(*b),
        ScalarValue::Bytes(b) => Value::Bytes(b.clone()),
    }
}

impl DecodedMessage {
    /// Encode this message as a positional array. See [`encode`].
    pub fn to_value(&self) -> Value {
        encode(self)
    }
}

impl From<&DecodedMessage> for Value {
    fn from(message: &DecodedMessage) -> Self {
        encode(message)
    }
}
