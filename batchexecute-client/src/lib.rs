//! Async client for the batchexecute batched-RPC protocol.
//!
//! batchexecute endpoints live at `https://{host}/_/{app}/data/batchexecute`
//! and answer form-encoded POSTs carrying one or more calls. This crate
//! builds those requests, sends them over hyper and decodes the response
//! envelopes with [`batchexecute_core`].
//!
//! ## Example
//!
//! ```ignore
//! use batchexecute_client::{BatchClient, Call, Value};
//!
//! let client = BatchClient::builder("LabsTailwindUi")
//!     .host("notebooklm.google.com")
//!     .auth_token(token)
//!     .cookies(cookies)
//!     .header("x-same-domain", "1")
//!     .url_param("bl", "boq_labs-tailwind-frontend_20241114.01_p0")
//!     .build()?;
//!
//! // List projects
//! let response = client
//!     .execute(Call::new("wXbhsf").arg(Value::Null).arg(1))
//!     .await?;
//!
//! println!("{}", response.payload_value()?);
//! ```
//!
//! ## Decoding into messages
//!
//! [`BatchClient::call_decoded`] runs the payload through a [`Schema`]:
//!
//! ```ignore
//! use batchexecute_client::{DecodeOptions, FieldKind, Schema};
//!
//! let project = Schema::builder("Project")
//!     .field(1, "title", FieldKind::string())
//!     .field(3, "project_id", FieldKind::string())
//!     .build()?;
//!
//! let response = client
//!     .call_decoded(Call::new("rLM1Ne").arg(id).context(id), &project, DecodeOptions::default())
//!     .await?;
//! println!("{:?}", response.string("title"));
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`ClientError`] whose [`code`](ClientError::code)
//! classifies it. A 401 answer is [`ClientError::Unauthorized`]; callers
//! refresh credentials and rebuild the client. The client never retries.
//!
//! ### Timeouts
//!
//! Set timeouts using [`ClientBuilder::timeout`] or [`CallOptions::timeout`].
//! A call that exceeds its timeout fails with [`ClientError::Timeout`].
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` |
//! | `tls-ring` / `tls-aws-lc` | rustls crypto provider |
//! | `tls-native-roots` / `tls-webpki-roots` | Root certificates |
//! | `tracing` (default) | Spans and events for batch calls |
//!
//! When `tracing` is enabled, each call runs in a `batchexecute.call` span
//! with:
//! - `rpc.ids`: Comma-joined call ids
//! - `rpc.app`: The application name
//! - `otel.kind`: "client"

mod builder;
mod client;
mod error;
mod options;
mod response;
pub mod transport;

pub use builder::ClientBuilder;
pub use client::{BatchClient, FORM_CONTENT_TYPE};
pub use error::{ClientBuildError, ClientError};
pub use options::CallOptions;
pub use response::{BatchResponse, Metadata};
pub use transport::{HyperTransport, HyperTransportBuilder, Transport};

// Re-export core types callers need to build calls and read results
pub use batchexecute_core::{
    Call, Code, DecodeError, DecodeOptions, DecodedMessage, EnumDescriptor, Error, FieldKind,
    FieldValue, LengthRadix, ResponseEnvelope, ScalarKind, ScalarValue, Schema, SchemaError,
    SequenceIdGenerator, Value,
};

pub use http;
