//! Decoded message values.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use super::schema::{Schema, SchemaError};

/// A decoded scalar.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    String(String),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Bytes(Bytes),
    /// The numeric value of an enum.
    Enum(i32),
}

impl ScalarValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any integral value (including enums) widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ScalarValue::Int32(n) | ScalarValue::Enum(n) => Some(n.into()),
            ScalarValue::Int64(n) => Some(n),
            ScalarValue::UInt32(n) => Some(n.into()),
            ScalarValue::UInt64(n) => i64::try_from(n).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ScalarValue::Float(f) => Some(f.into()),
            ScalarValue::Double(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ScalarValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ScalarValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// The value of one field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    Message(DecodedMessage),
    Repeated(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DecodedMessage> {
        match self {
            FieldValue::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_repeated(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Repeated(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar()?.as_str()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar()?.as_i64()
    }
}

impl From<ScalarValue> for FieldValue {
    fn from(v: ScalarValue) -> Self {
        FieldValue::Scalar(v)
    }
}

impl From<DecodedMessage> for FieldValue {
    fn from(m: DecodedMessage) -> Self {
        FieldValue::Message(m)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::Repeated(items)
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::Scalar(ScalarValue::$variant(v.into()))
                }
            }
        )*
    };
}

scalar_from!(
    String => String,
    &str => String,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    Bytes => Bytes,
);

/// A message decoded against a [`Schema`].
///
/// Fields are keyed by ordinal. Absent fields are simply missing; there is no
/// separate notion of a default value.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMessage {
    schema: Arc<Schema>,
    fields: BTreeMap<u32, FieldValue>,
}

impl DecodedMessage {
    /// An empty message of `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            fields: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Present fields in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldValue)> {
        self.fields.iter().map(|(ordinal, value)| (*ordinal, value))
    }

    pub fn get(&self, ordinal: u32) -> Option<&FieldValue> {
        self.fields.get(&ordinal)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FieldValue> {
        self.get(self.schema.field_by_name(name)?.ordinal)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    /// The string field `name`.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get_by_name(name)?.as_str()
    }

    /// The integral field `name`, widened to `i64`.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get_by_name(name)?.as_i64()
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get_by_name(name)?.as_scalar()?.as_bool()
    }

    /// The nested message field `name`.
    pub fn message(&self, name: &str) -> Option<&DecodedMessage> {
        self.get_by_name(name)?.as_message()
    }

    /// Items of the repeated field `name`; empty when absent.
    pub fn repeated(&self, name: &str) -> &[FieldValue] {
        self.get_by_name(name)
            .and_then(FieldValue::as_repeated)
            .unwrap_or_default()
    }

    /// The symbolic name of the enum field `name`.
    pub fn enum_name(&self, name: &str) -> Option<&str> {
        let field = self.schema.field_by_name(name)?;
        let super::FieldKind::Scalar(super::ScalarKind::Enum(descriptor)) = &field.kind else {
            return None;
        };
        match self.get(field.ordinal)?.as_scalar()? {
            ScalarValue::Enum(n) => descriptor.name_of(*n),
            _ => None,
        }
    }

    /// Set a field by ordinal, replacing any previous value.
    pub(crate) fn insert(&mut self, ordinal: u32, value: FieldValue) {
        self.fields.insert(ordinal, value);
    }

    /// Set the field `name`.
    ///
    /// The value is not checked against the field's kind.
    pub fn set<V: Into<FieldValue>>(&mut self, name: &str, value: V) -> Result<&mut Self, SchemaError> {
        let ordinal = self
            .schema
            .field_by_name(name)
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))?
            .ordinal;
        self.fields.insert(ordinal, value.into());
        Ok(self)
    }

    /// Builder form of [`set`](Self::set).
    pub fn with<V: Into<FieldValue>>(mut self, name: &str, value: V) -> Result<Self, SchemaError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Remove the field `name`, returning its value.
    pub fn clear(&mut self, name: &str) -> Option<FieldValue> {
        let ordinal = self.schema.field_by_name(name)?.ordinal;
        self.fields.remove(&ordinal)
    }
}
