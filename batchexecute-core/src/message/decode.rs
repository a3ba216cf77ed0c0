//! Positional-array message decoding.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Number;

use super::decoded::{DecodedMessage, FieldValue, ScalarValue};
use super::schema::{FieldKind, ScalarKind, Schema};
use crate::error::DecodeError;
use crate::value::Value;

/// Options for [`decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Skip positions that have no field in the schema. Default `true`.
    pub discard_unknown: bool,
    /// Accept messages with missing required fields. Default `false`.
    pub allow_partial: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            discard_unknown: true,
            allow_partial: false,
        }
    }
}

impl DecodeOptions {
    pub fn discard_unknown(mut self, discard: bool) -> Self {
        self.discard_unknown = discard;
        self
    }

    pub fn allow_partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }
}

/// Decode a positional array into a message of `schema`.
///
/// Position `i` of the array holds the field with ordinal `i + 1`. `null`
/// positions leave the field absent.
///
/// # Example
///
/// ```
/// use batchexecute_core::{decode, DecodeOptions, FieldKind, Schema, Value};
///
/// let schema = Schema::builder("Note")
///     .field(1, "id", FieldKind::string())
///     .field(3, "pinned", FieldKind::bool())
///     .build()
///     .unwrap();
/// let value = Value::from_slice(br#"["n1", null, true]"#).unwrap();
///
/// let note = decode(&value, &schema, DecodeOptions::default()).unwrap();
/// assert_eq!(note.string("id"), Some("n1"));
/// assert_eq!(note.bool("pinned"), Some(true));
/// ```
pub fn decode(
    value: &Value,
    schema: &Arc<Schema>,
    options: DecodeOptions,
) -> Result<DecodedMessage, DecodeError> {
    let Value::Array(items) = value else {
        return Err(mismatch("array", value));
    };
    let message = Decoder { options }.populate(items, schema)?;
    if !options.allow_partial {
        check_initialized(&message)?;
    }
    Ok(message)
}

/// Parse JSON text and [`decode`] it.
pub fn decode_slice(
    bytes: &[u8],
    schema: &Arc<Schema>,
    options: DecodeOptions,
) -> Result<DecodedMessage, DecodeError> {
    let value = Value::from_slice(bytes).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    decode(&value, schema, options)
}

fn mismatch(expected: &'static str, actual: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        expected,
        actual: actual.kind_name(),
    }
}

struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    fn populate(&self, items: &[Value], schema: &Arc<Schema>) -> Result<DecodedMessage, DecodeError> {
        let mut message = DecodedMessage::new(Arc::clone(schema));
        for (position, item) in items.iter().enumerate() {
            if item.is_null() {
                continue;
            }
            let ordinal = position as u32 + 1;
            let Some(field) = schema.field(ordinal) else {
                if self.options.discard_unknown {
                    continue;
                }
                return Err(DecodeError::UnknownField(ordinal));
            };
            let value = self
                .field_value(&field.kind, item)
                .map_err(|e| e.in_field(&field.name))?;
            message.insert(ordinal, value);
        }
        Ok(message)
    }

    fn field_value(&self, kind: &FieldKind, item: &Value) -> Result<FieldValue, DecodeError> {
        match kind {
            FieldKind::Scalar(kind) => scalar(kind, item).map(FieldValue::Scalar),
            FieldKind::Message(schema) => self.message(schema, item).map(FieldValue::Message),
            FieldKind::Repeated(inner) => self.repeated(inner, item).map(FieldValue::Repeated),
        }
    }

    fn message(&self, schema: &Arc<Schema>, item: &Value) -> Result<DecodedMessage, DecodeError> {
        // Senders may drop the array around a wrapped scalar.
        if let Some(kind) = schema.wrapped_kind() {
            if let Ok(value) = scalar(kind, item) {
                let mut message = DecodedMessage::new(Arc::clone(schema));
                message.insert(1, FieldValue::Scalar(value));
                return Ok(message);
            }
        }

        let Value::Array(items) = item else {
            return Err(mismatch("array", item));
        };
        self.populate(items, schema)
    }

    fn repeated(&self, inner: &FieldKind, item: &Value) -> Result<Vec<FieldValue>, DecodeError> {
        let Value::Array(items) = item else {
            return Err(mismatch("array", item));
        };

        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let value = match inner {
                FieldKind::Message(schema) => self.repeated_message(schema, item),
                kind => self.field_value(kind, item),
            };
            values.push(value.map_err(|e| e.in_field(&i.to_string()))?);
        }
        Ok(values)
    }

    /// Decode one message item of a repeated field.
    ///
    /// Items like `[[["id"]]]` are flattened through their single-element
    /// arrays. A flattened scalar becomes field 1 of the message.
    fn repeated_message(
        &self,
        schema: &Arc<Schema>,
        item: &Value,
    ) -> Result<FieldValue, DecodeError> {
        if !matches!(item, Value::Array(_)) {
            return Err(mismatch("array", item));
        }

        let flat = flatten_single_value(item);
        let message = match flat {
            Value::Array(items) => self.populate(items, schema)?,
            scalar_value => {
                let mut message = DecodedMessage::new(Arc::clone(schema));
                match schema.field(1) {
                    Some(field) => {
                        let value = self
                            .field_value(&field.kind, scalar_value)
                            .map_err(|e| e.in_field(&field.name))?;
                        message.insert(1, value);
                    }
                    None if self.options.discard_unknown => {}
                    None => return Err(DecodeError::UnknownField(1)),
                }
                message
            }
        };
        Ok(FieldValue::Message(message))
    }
}

/// Unwrap single-element arrays until a scalar or a longer array remains.
fn flatten_single_value(mut value: &Value) -> &Value {
    while let Value::Array(items) = value {
        match items.as_slice() {
            [only] => value = only,
            _ => break,
        }
    }
    value
}

fn scalar(kind: &ScalarKind, value: &Value) -> Result<ScalarValue, DecodeError> {
    Ok(match kind {
        ScalarKind::String => ScalarValue::String(string(value)?),
        ScalarKind::Int32 => ScalarValue::Int32(integer(kind, value)?),
        ScalarKind::Int64 => ScalarValue::Int64(integer(kind, value)?),
        ScalarKind::UInt32 => ScalarValue::UInt32(integer(kind, value)?),
        ScalarKind::UInt64 => ScalarValue::UInt64(integer(kind, value)?),
        ScalarKind::Float => ScalarValue::Float(float(value)? as f32),
        ScalarKind::Double => ScalarValue::Double(float(value)?),
        ScalarKind::Bool => match value {
            Value::Bool(b) => ScalarValue::Bool(*b),
            other => return Err(mismatch("bool", other)),
        },
        ScalarKind::Bytes => match value {
            Value::String(s) => ScalarValue::Bytes(Bytes::copy_from_slice(s.as_bytes())),
            Value::Bytes(b) => ScalarValue::Bytes(b.clone()),
            other => return Err(mismatch("string or bytes", other)),
        },
        ScalarKind::Enum(descriptor) => match value {
            Value::Number(_) => ScalarValue::Enum(integer(kind, value)?),
            Value::String(name) => {
                ScalarValue::Enum(descriptor.number(name).ok_or_else(|| {
                    DecodeError::UnknownEnumValue {
                        enum_name: descriptor.name().to_string(),
                        value: name.clone(),
                    }
                })?)
            }
            other => return Err(mismatch("number or string", other)),
        },
    })
}

/// A string, or the first string reached through leading array elements.
fn string(value: &Value) -> Result<String, DecodeError> {
    let mut current = value;
    loop {
        match current {
            Value::String(s) => return Ok(s.clone()),
            Value::Array(items) => match items.first() {
                Some(first) => current = first,
                None => return Err(mismatch("string", value)),
            },
            _ => return Err(mismatch("string", value)),
        }
    }
}

fn integer<T: TryFrom<i128>>(kind: &ScalarKind, value: &Value) -> Result<T, DecodeError> {
    let Value::Number(n) = value else {
        return Err(mismatch("number", value));
    };
    let wide = integral(n).ok_or(DecodeError::TypeMismatch {
        expected: "integer",
        actual: "fractional number",
    })?;
    T::try_from(wide).map_err(|_| DecodeError::OutOfRange {
        kind: kind.name(),
        value: n.to_string(),
    })
}

/// The integral value of `n`, accepting floats without a fractional part.
fn integral(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.into());
    }
    let f = n.as_f64()?;
    // Beyond this every integer width overflows anyway.
    if f.fract() != 0.0 || !f.is_finite() || f.abs() > 1e30 {
        return None;
    }
    Some(f as i128)
}

fn float(value: &Value) -> Result<f64, DecodeError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch("number", value)),
        other => Err(mismatch("number", other)),
    }
}

/// Check required fields of `message` and of every nested message.
fn check_initialized(message: &DecodedMessage) -> Result<(), DecodeError> {
    let schema = message.schema();
    let missing: Vec<String> = schema
        .fields()
        .filter(|f| f.required && message.get(f.ordinal).is_none())
        .map(|f| f.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(DecodeError::IncompleteMessage {
            message: schema.name().to_string(),
            missing,
        });
    }

    for (ordinal, value) in message.iter() {
        let name = schema
            .field(ordinal)
            .map_or_else(|| ordinal.to_string(), |f| f.name.clone());
        check_value(value).map_err(|e| e.in_field(&name))?;
    }
    Ok(())
}

fn check_value(value: &FieldValue) -> Result<(), DecodeError> {
    match value {
        FieldValue::Scalar(_) => Ok(()),
        FieldValue::Message(message) => check_initialized(message),
        FieldValue::Repeated(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_value(item).map_err(|e| e.in_field(&i.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use crate::message::EnumDescriptor;

    fn source_id() -> Arc<Schema> {
        Schema::builder("SourceId")
            .field(1, "source_id", FieldKind::string())
            .build()
            .unwrap()
    }

    fn timestamp() -> Arc<Schema> {
        Schema::builder("Timestamp")
            .field(1, "seconds", FieldKind::int64())
            .field(2, "nanos", FieldKind::int32())
            .build()
            .unwrap()
    }

    fn source() -> Arc<Schema> {
        let source_type = Arc::new(
            EnumDescriptor::new("SourceType")
                .value("SOURCE_TYPE_UNKNOWN", 0)
                .value("SOURCE_TYPE_YOUTUBE_VIDEO", 9),
        );
        let status = Arc::new(
            EnumDescriptor::new("SourceStatus")
                .value("SOURCE_STATUS_ENABLED", 1)
                .value("SOURCE_STATUS_DISABLED", 2),
        );
        let metadata = Schema::builder("SourceMetadata")
            .field(2, "last_update_time_seconds", FieldKind::message(Schema::int32_value()))
            .field(3, "last_modified_time", FieldKind::message(timestamp()))
            .field(5, "source_type", FieldKind::enumeration(source_type))
            .build()
            .unwrap();
        let settings = Schema::builder("SourceSettings")
            .field(2, "status", FieldKind::enumeration(status))
            .build()
            .unwrap();
        Schema::builder("Source")
            .field(1, "source_id", FieldKind::message(source_id()))
            .field(2, "title", FieldKind::string())
            .field(3, "metadata", FieldKind::message(metadata))
            .field(4, "settings", FieldKind::message(settings))
            .build()
            .unwrap()
    }

    fn project() -> Arc<Schema> {
        let metadata = Schema::builder("ProjectMetadata")
            .field(1, "user_role", FieldKind::int32())
            .field(6, "modified_time", FieldKind::message(timestamp()))
            .field(7, "type", FieldKind::int32())
            .field(9, "create_time", FieldKind::message(timestamp()))
            .build()
            .unwrap();
        Schema::builder("Project")
            .field(1, "title", FieldKind::string())
            .field(2, "sources", FieldKind::repeated(FieldKind::message(source())))
            .field(3, "project_id", FieldKind::string())
            .field(4, "emoji", FieldKind::string())
            .field(6, "metadata", FieldKind::message(metadata))
            .build()
            .unwrap()
    }

    fn decode_str(json: &str, schema: &Arc<Schema>) -> Result<DecodedMessage, DecodeError> {
        decode_slice(json.as_bytes(), schema, DecodeOptions::default())
    }

    #[test]
    fn test_basic_project() {
        let project = decode_str(r#"["project1", [], "id1", "📚"]"#, &project()).unwrap();
        assert_eq!(project.string("title"), Some("project1"));
        assert_eq!(project.string("project_id"), Some("id1"));
        assert_eq!(project.string("emoji"), Some("📚"));
        assert!(project.repeated("sources").is_empty());
        assert!(!project.has("metadata"));
    }

    #[test]
    fn test_single_value_nested_array_is_flattened() {
        let schema = Schema::builder("Project")
            .field(1, "title", FieldKind::string())
            .field(2, "sources", FieldKind::repeated(FieldKind::message(source_id())))
            .field(3, "id", FieldKind::string())
            .field(4, "emoji", FieldKind::string())
            .build()
            .unwrap();
        let project = decode_str(r#"["t", [[["s1"]]], "id2", "📚"]"#, &schema).unwrap();

        assert_eq!(project.string("title"), Some("t"));
        let sources = project.repeated("sources");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].as_message().unwrap().string("source_id"), Some("s1"));
        assert_eq!(project.string("id"), Some("id2"));
        assert_eq!(project.string("emoji"), Some("📚"));
    }

    #[test]
    fn test_project_with_sources() {
        let project =
            decode_str(r#"["project2", [[["source1"], "Source One"]], "id2", "📚"]"#, &project())
                .unwrap();
        let sources = project.repeated("sources");
        assert_eq!(sources.len(), 1);
        let source = sources[0].as_message().unwrap();
        assert_eq!(
            source.message("source_id").unwrap().string("source_id"),
            Some("source1")
        );
        assert_eq!(source.string("title"), Some("Source One"));
    }

    #[test]
    fn test_project_with_youtube_source() {
        let json = r#"[
            "Untitled notebook",
            [[
                [["39ed97de-7b93-4e08-8d9b-b86d5a58b35a"]],
                "Building with Anthropic Claude: Prompt Workshop with Zack Witten",
                [null, 15108, [1728034802, 578385000],
                 ["0319adc7-1458-4555-a813-17aff0f72938", [1728034801, 818692000]],
                 9,
                 ["https://www.youtube.com/watch?v=hkhDdcM5V94", "hkhDdcM5V94", "AI Engineer"]],
                [null, 2]
            ]],
            "ec266e3d-cb7a-4c6d-a34a-f108a55faf52",
            "🕵️",
            null,
            [1, false, true, null, null, [1731910459, 665561000], 1, false, [1731827837, 76688000]]
        ]"#;
        let project = decode_str(json, &project()).unwrap();

        assert_eq!(project.string("title"), Some("Untitled notebook"));
        assert_eq!(project.string("emoji"), Some("🕵️"));

        let source = project.repeated("sources")[0].as_message().unwrap();
        assert_eq!(
            source.message("source_id").unwrap().string("source_id"),
            Some("39ed97de-7b93-4e08-8d9b-b86d5a58b35a")
        );
        let metadata = source.message("metadata").unwrap();
        let wrapped = metadata.message("last_update_time_seconds").unwrap();
        assert_eq!(wrapped.get(1), Some(&FieldValue::from(15108i32)));
        assert_eq!(
            metadata.message("last_modified_time").unwrap().int("seconds"),
            Some(1728034802)
        );
        assert_eq!(metadata.enum_name("source_type"), Some("SOURCE_TYPE_YOUTUBE_VIDEO"));
        assert_eq!(
            source.message("settings").unwrap().enum_name("status"),
            Some("SOURCE_STATUS_DISABLED")
        );

        let metadata = project.message("metadata").unwrap();
        assert_eq!(metadata.int("user_role"), Some(1));
        assert_eq!(metadata.int("type"), Some(1));
        assert_eq!(
            metadata.message("create_time").unwrap().int("nanos"),
            Some(76688000)
        );
    }

    #[test]
    fn test_unknown_positions() {
        let json = r#"["project1", [], "My Project", "📚", "extra"]"#;
        assert!(decode_str(json, &project()).is_ok());

        let strict = DecodeOptions::default().discard_unknown(false);
        let err = decode_slice(json.as_bytes(), &project(), strict).unwrap_err();
        assert_eq!(err, DecodeError::UnknownField(5));
        assert_eq!(err.code(), Code::UnknownField);
    }

    #[test]
    fn test_unknown_positions_in_nested_message() {
        let json = r#"["p", null, null, null, null, [1, false]]"#;
        let strict = DecodeOptions::default().discard_unknown(false);
        let err = decode_slice(json.as_bytes(), &project(), strict).unwrap_err();
        assert_eq!(err.root(), &DecodeError::UnknownField(2));
        assert_eq!(err.to_string(), "field metadata: no field for position 2");
    }

    #[test]
    fn test_required_fields() {
        let schema = Schema::builder("Note")
            .required(1, "id", FieldKind::string())
            .field(2, "title", FieldKind::string())
            .build()
            .unwrap();

        let err = decode_str(r#"[null, "t"]"#, &schema).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncompleteMessage {
                message: "Note".into(),
                missing: vec!["id".into()],
            }
        );
        assert_eq!(err.code(), Code::IncompleteMessage);

        let partial = DecodeOptions::default().allow_partial(true);
        let note = decode_slice(br#"[null, "t"]"#, &schema, partial).unwrap();
        assert_eq!(note.string("title"), Some("t"));
    }

    #[test]
    fn test_required_fields_in_nested_messages() {
        let inner = Schema::builder("Inner")
            .required(1, "id", FieldKind::string())
            .build()
            .unwrap();
        let outer = Schema::builder("Outer")
            .field(1, "items", FieldKind::repeated(FieldKind::message(inner)))
            .build()
            .unwrap();

        let err = decode_str(r#"[[["a"], [null, 1]]]"#, &outer).unwrap_err();
        assert_eq!(err.code(), Code::IncompleteMessage);
        assert!(err.to_string().starts_with("field items.1: Inner"));
    }

    #[test]
    fn test_empty_array_is_default_message() {
        let project = decode_str(r#"["p", null, null, null, null, []]"#, &project()).unwrap();
        assert!(project.message("metadata").unwrap().is_empty());
    }

    #[test]
    fn test_message_field_requires_array() {
        let err = decode_str(r#"["p", null, null, null, null, "x"]"#, &project()).unwrap_err();
        assert_eq!(err.to_string(), "field metadata: expected array, got string");
        assert_eq!(err.code(), Code::InvalidMessage);
    }

    #[test]
    fn test_wrapper_accepts_array_or_bare_value() {
        let schema = Schema::builder("M")
            .field(1, "count", FieldKind::message(Schema::int64_value()))
            .field(2, "label", FieldKind::message(Schema::string_value()))
            .build()
            .unwrap();
        let bare = decode_str(r#"[5, "x"]"#, &schema).unwrap();
        let wrapped = decode_str(r#"[[5], ["x"]]"#, &schema).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.message("count").unwrap().int("value"), Some(5));
        assert_eq!(bare.message("label").unwrap().string("value"), Some("x"));
    }

    #[test]
    fn test_string_unwraps_nested_arrays() {
        let schema = Schema::builder("M")
            .field(1, "s", FieldKind::string())
            .build()
            .unwrap();
        assert_eq!(decode_str(r#"[[["deep"], 1]]"#, &schema).unwrap().string("s"), Some("deep"));

        let err = decode_str(r#"[[[1]]]"#, &schema).unwrap_err();
        assert_eq!(err.code(), Code::InvalidMessage);
        let err = decode_str(r#"[[]]"#, &schema).unwrap_err();
        assert_eq!(err.code(), Code::InvalidMessage);
    }

    #[test]
    fn test_integer_widths() {
        let schema = Schema::builder("M")
            .field(1, "a", FieldKind::int32())
            .field(2, "b", FieldKind::uint64())
            .field(3, "c", FieldKind::float())
            .build()
            .unwrap();
        let m = decode_str(r#"[7.0, 18446744073709551615, 1.5]"#, &schema).unwrap();
        assert_eq!(m.int("a"), Some(7));
        assert_eq!(m.get(2), Some(&FieldValue::from(u64::MAX)));
        assert_eq!(m.get(3), Some(&FieldValue::from(1.5f32)));

        let err = decode_str(r#"[2147483648]"#, &schema).unwrap_err();
        assert_eq!(
            err.root(),
            &DecodeError::OutOfRange {
                kind: "int32",
                value: "2147483648".into()
            }
        );
        let err = decode_str(r#"[null, -1]"#, &schema).unwrap_err();
        assert!(matches!(err.root(), DecodeError::OutOfRange { kind: "uint64", .. }));
        let err = decode_str(r#"[1.5]"#, &schema).unwrap_err();
        assert!(matches!(err.root(), DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_enum_by_number_and_name() {
        let kind = Arc::new(EnumDescriptor::new("Kind").value("A", 1).value("B", 2));
        let schema = Schema::builder("M")
            .field(1, "k", FieldKind::enumeration(kind))
            .build()
            .unwrap();
        assert_eq!(decode_str("[2]", &schema).unwrap().enum_name("k"), Some("B"));
        assert_eq!(decode_str(r#"["A"]"#, &schema).unwrap().int("k"), Some(1));

        let err = decode_str(r#"["C"]"#, &schema).unwrap_err();
        assert_eq!(err.code(), Code::UnknownEnumValue);
        assert_eq!(
            err.root(),
            &DecodeError::UnknownEnumValue {
                enum_name: "Kind".into(),
                value: "C".into()
            }
        );
    }

    #[test]
    fn test_bytes_from_string_and_bytes() {
        let schema = Schema::builder("M")
            .field(1, "raw", FieldKind::bytes())
            .build()
            .unwrap();
        let m = decode_str(r#"["abc"]"#, &schema).unwrap();
        assert_eq!(
            m.get(1).unwrap().as_scalar().unwrap().as_bytes().unwrap().as_ref(),
            b"abc"
        );

        let value = Value::Array(vec![Value::bytes(vec![0u8, 255])]);
        let m = decode(&value, &schema, DecodeOptions::default()).unwrap();
        assert_eq!(
            m.get(1).unwrap().as_scalar().unwrap().as_bytes().unwrap().as_ref(),
            &[0u8, 255]
        );
    }

    #[test]
    fn test_repeated_scalars() {
        let schema = Schema::builder("M")
            .field(1, "ids", FieldKind::repeated(FieldKind::int64()))
            .build()
            .unwrap();
        let m = decode_str("[[1, 2, 3]]", &schema).unwrap();
        let ids: Vec<i64> = m.repeated("ids").iter().filter_map(FieldValue::as_i64).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let err = decode_str(r#"[[1, "x"]]"#, &schema).unwrap_err();
        assert_eq!(err.to_string(), "field ids.1: expected number, got string");
    }

    #[test]
    fn test_top_level_must_be_array() {
        let err = decode_str(r#"{"a": 1}"#, &project()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                expected: "array",
                actual: "object"
            }
        );
        assert!(matches!(
            decode_str("not json", &project()),
            Err(DecodeError::InvalidJson(_))
        ));
    }
}
