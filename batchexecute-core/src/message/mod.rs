//! Positional-array messages.
//!
//! Payloads encode messages as JSON arrays where position `i` holds the field
//! with ordinal `i + 1`:
//!
//! ```text
//! ["title", [[["source-id"]]], "project-id", "📚"]
//!  ^1       ^2                 ^3            ^4
//! ```
//!
//! A [`Schema`] describes the fields; [`decode`] interprets an array against
//! it and [`encode`] produces an array from a [`DecodedMessage`].

mod decode;
mod decoded;
mod encode;
mod schema;

pub use decode::{decode, decode_slice, DecodeOptions};
pub use decoded::{DecodedMessage, FieldValue, ScalarValue};
pub use encode::encode;
pub use schema::{
    EnumDescriptor, FieldDescriptor, FieldKind, ScalarKind, Schema, SchemaBuilder, SchemaError,
};
