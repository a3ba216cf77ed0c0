//! Positional-array schemas.
//!
//! A [`Schema`] maps 1-based ordinals to field descriptors. Array position
//! `i` of a wire message holds the field with ordinal `i + 1`.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Symbolic names of an enum's numeric values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    values: BTreeMap<String, i32>,
}

impl EnumDescriptor {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Declare a named value.
    pub fn value<S: Into<String>>(mut self, name: S, number: i32) -> Self {
        self.values.insert(name.into(), number);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the number for a symbolic name.
    pub fn number(&self, name: &str) -> Option<i32> {
        self.values.get(name).copied()
    }

    /// Look up the first symbolic name for a number.
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, n)| **n == number)
            .map(|(name, _)| name.as_str())
    }
}

/// Kinds of scalar fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float,
    Double,
    Bool,
    Bytes,
    Enum(Arc<EnumDescriptor>),
}

impl ScalarKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Bool => "bool",
            ScalarKind::Bytes => "bytes",
            ScalarKind::Enum(_) => "enum",
        }
    }
}

/// The kind of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Message(Arc<Schema>),
    Repeated(Box<FieldKind>),
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::Scalar(ScalarKind::String)
    }

    pub fn int32() -> Self {
        FieldKind::Scalar(ScalarKind::Int32)
    }

    pub fn int64() -> Self {
        FieldKind::Scalar(ScalarKind::Int64)
    }

    pub fn uint32() -> Self {
        FieldKind::Scalar(ScalarKind::UInt32)
    }

    pub fn uint64() -> Self {
        FieldKind::Scalar(ScalarKind::UInt64)
    }

    pub fn float() -> Self {
        FieldKind::Scalar(ScalarKind::Float)
    }

    pub fn double() -> Self {
        FieldKind::Scalar(ScalarKind::Double)
    }

    pub fn bool() -> Self {
        FieldKind::Scalar(ScalarKind::Bool)
    }

    pub fn bytes() -> Self {
        FieldKind::Scalar(ScalarKind::Bytes)
    }

    pub fn enumeration(descriptor: Arc<EnumDescriptor>) -> Self {
        FieldKind::Scalar(ScalarKind::Enum(descriptor))
    }

    pub fn message(schema: Arc<Schema>) -> Self {
        FieldKind::Message(schema)
    }

    /// A repeated field of `inner`.
    pub fn repeated(inner: FieldKind) -> Self {
        FieldKind::Repeated(Box::new(inner))
    }
}

/// One field of a schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub ordinal: u32,
    pub name: String,
    pub kind: FieldKind,
    /// Required fields must be present unless partial messages are allowed.
    pub required: bool,
}

/// Errors raised while building a schema.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("field {name:?} has ordinal 0; ordinals start at 1")]
    ZeroOrdinal { name: String },
    #[error("ordinal {0} is declared twice")]
    DuplicateOrdinal(u32),
    #[error("field name {0:?} is declared twice")]
    DuplicateName(String),
    #[error("no field named {0:?}")]
    UnknownField(String),
}

/// A positional-array message schema.
///
/// # Example
///
/// ```
/// use batchexecute_core::{FieldKind, Schema};
///
/// let source_id = Schema::builder("SourceId")
///     .field(1, "source_id", FieldKind::string())
///     .build()
///     .unwrap();
/// let project = Schema::builder("Project")
///     .field(1, "title", FieldKind::string())
///     .field(2, "sources", FieldKind::repeated(FieldKind::message(source_id)))
///     .required(3, "project_id", FieldKind::string())
///     .build()
///     .unwrap();
///
/// assert_eq!(project.field(3).unwrap().name, "project_id");
/// assert!(project.field(5).is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    name: String,
    fields: BTreeMap<u32, FieldDescriptor>,
    wrapper: bool,
}

impl Schema {
    pub fn builder<S: Into<String>>(name: S) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// A wrapper schema boxing a single scalar in field 1, `value`.
    ///
    /// When a message field has a wrapper schema the decoder also accepts the
    /// bare scalar in place of the one-element array.
    pub fn wrapper<S: Into<String>>(name: S, kind: ScalarKind) -> Arc<Self> {
        let mut fields = BTreeMap::new();
        fields.insert(
            1,
            FieldDescriptor {
                ordinal: 1,
                name: "value".to_string(),
                kind: FieldKind::Scalar(kind),
                required: false,
            },
        );
        Arc::new(Self {
            name: name.into(),
            fields,
            wrapper: true,
        })
    }

    pub fn int32_value() -> Arc<Self> {
        Self::wrapper("Int32Value", ScalarKind::Int32)
    }

    pub fn int64_value() -> Arc<Self> {
        Self::wrapper("Int64Value", ScalarKind::Int64)
    }

    pub fn uint32_value() -> Arc<Self> {
        Self::wrapper("UInt32Value", ScalarKind::UInt32)
    }

    pub fn uint64_value() -> Arc<Self> {
        Self::wrapper("UInt64Value", ScalarKind::UInt64)
    }

    pub fn float_value() -> Arc<Self> {
        Self::wrapper("FloatValue", ScalarKind::Float)
    }

    pub fn double_value() -> Arc<Self> {
        Self::wrapper("DoubleValue", ScalarKind::Double)
    }

    pub fn bool_value() -> Arc<Self> {
        Self::wrapper("BoolValue", ScalarKind::Bool)
    }

    pub fn string_value() -> Arc<Self> {
        Self::wrapper("StringValue", ScalarKind::String)
    }

    pub fn bytes_value() -> Arc<Self> {
        Self::wrapper("BytesValue", ScalarKind::Bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, ordinal: u32) -> Option<&FieldDescriptor> {
        self.fields.get(&ordinal)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.values().find(|f| f.name == name)
    }

    /// Fields in ordinal order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn is_wrapper(&self) -> bool {
        self.wrapper
    }

    /// The scalar kind boxed by a wrapper schema.
    pub fn wrapped_kind(&self) -> Option<&ScalarKind> {
        if !self.wrapper {
            return None;
        }
        match &self.field(1)?.kind {
            FieldKind::Scalar(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Declare an optional field.
    pub fn field<S: Into<String>>(self, ordinal: u32, name: S, kind: FieldKind) -> Self {
        self.push(ordinal, name.into(), kind, false)
    }

    /// Declare a required field.
    pub fn required<S: Into<String>>(self, ordinal: u32, name: S, kind: FieldKind) -> Self {
        self.push(ordinal, name.into(), kind, true)
    }

    fn push(mut self, ordinal: u32, name: String, kind: FieldKind, required: bool) -> Self {
        self.fields.push(FieldDescriptor {
            ordinal,
            name,
            kind,
            required,
        });
        self
    }

    /// Build the schema.
    ///
    /// # Errors
    ///
    /// Fails if an ordinal is zero, or if an ordinal or name is declared twice.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let mut fields = BTreeMap::new();
        for field in self.fields {
            if field.ordinal == 0 {
                return Err(SchemaError::ZeroOrdinal { name: field.name });
            }
            if fields
                .values()
                .any(|f: &FieldDescriptor| f.name == field.name)
            {
                return Err(SchemaError::DuplicateName(field.name));
            }
            if fields.contains_key(&field.ordinal) {
                return Err(SchemaError::DuplicateOrdinal(field.ordinal));
            }
            fields.insert(field.ordinal, field);
        }
        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            wrapper: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_orders_fields() {
        let schema = Schema::builder("M")
            .field(3, "c", FieldKind::string())
            .field(1, "a", FieldKind::int32())
            .build()
            .unwrap();
        let ordinals: Vec<u32> = schema.fields().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![1, 3]);
        assert_eq!(schema.field_by_name("c").unwrap().ordinal, 3);
        assert!(!schema.is_wrapper());
        assert!(schema.wrapped_kind().is_none());
    }

    #[test]
    fn test_builder_rejects_bad_fields() {
        assert_eq!(
            Schema::builder("M")
                .field(0, "a", FieldKind::string())
                .build()
                .unwrap_err(),
            SchemaError::ZeroOrdinal { name: "a".into() }
        );
        assert_eq!(
            Schema::builder("M")
                .field(1, "a", FieldKind::string())
                .field(1, "b", FieldKind::string())
                .build()
                .unwrap_err(),
            SchemaError::DuplicateOrdinal(1)
        );
        assert_eq!(
            Schema::builder("M")
                .field(1, "a", FieldKind::string())
                .field(2, "a", FieldKind::string())
                .build()
                .unwrap_err(),
            SchemaError::DuplicateName("a".into())
        );
    }

    #[test]
    fn test_wrappers() {
        let schema = Schema::int32_value();
        assert!(schema.is_wrapper());
        assert_eq!(schema.name(), "Int32Value");
        assert_eq!(schema.wrapped_kind(), Some(&ScalarKind::Int32));
        assert_eq!(schema.field(1).unwrap().name, "value");
        assert_eq!(Schema::bytes_value().wrapped_kind(), Some(&ScalarKind::Bytes));
    }

    #[test]
    fn test_enum_lookup() {
        let status = EnumDescriptor::new("SourceStatus")
            .value("SOURCE_STATUS_UNSPECIFIED", 0)
            .value("SOURCE_STATUS_ENABLED", 1)
            .value("SOURCE_STATUS_DISABLED", 2);
        assert_eq!(status.number("SOURCE_STATUS_DISABLED"), Some(2));
        assert_eq!(status.number("nope"), None);
        assert_eq!(status.name_of(1), Some("SOURCE_STATUS_ENABLED"));
        assert_eq!(status.name_of(9), None);
    }
}
