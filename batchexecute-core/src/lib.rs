//! Core protocol types for batchexecute.
//!
//! This crate holds the I/O-free pieces of the batchexecute batched-RPC
//! protocol, shared by the client (`batchexecute-client`) and by anything
//! else that needs to build requests or read responses.
//!
//! ## Modules
//!
//! - [`call`]: A single remote call
//! - [`value`]: Untyped wire values
//! - [`reqid`]: Request id generation
//! - [`request`]: Request encoding
//! - [`framer`]: Response framing (single and chunked transports)
//! - [`envelope`]: Response envelope decoding
//! - [`message`]: Positional-array schemas, decoding and encoding
//! - [`error`]: Error codes and error types
//!
//! ## Decoding a response
//!
//! ```
//! use batchexecute_core::{decode_body, FrameOptions};
//!
//! let body = b")]}'\n\n[[\"wrb.fr\",\"wXbhsf\",\"[[\\\"nb\\\"]]\",null,null,null,\"generic\"]]";
//! let envelopes = decode_body(body.as_slice().into(), FrameOptions::single()).unwrap();
//!
//! assert_eq!(envelopes[0].id, "wXbhsf");
//! assert_eq!(envelopes[0].payload, "[[\"nb\"]]");
//! ```

pub mod call;
pub mod envelope;
pub mod error;
pub mod framer;
pub mod message;
pub mod reqid;
pub mod request;
pub mod value;

pub use call::Call;
pub use envelope::{decode_body, decode_payload, decode_response, ResponseEnvelope};
pub use error::{Code, DecodeError, Error, ParseCodeError};
pub use framer::{FrameOptions, LengthRadix, ResponseFramer, Transport};
pub use message::{
    decode, decode_slice, encode, DecodeOptions, DecodedMessage, EnumDescriptor, FieldDescriptor,
    FieldKind, FieldValue, ScalarKind, ScalarValue, Schema, SchemaBuilder, SchemaError,
};
pub use reqid::SequenceIdGenerator;
pub use request::{EncodedRequest, RequestEncoder};
pub use value::Value;
