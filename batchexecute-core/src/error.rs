//! batchexecute error codes and types.
//!
//! This module provides the core error types used by the protocol pieces:
//! - [`Code`]: Closed classification of every failure the core can report
//! - [`Error`]: Framing, envelope and request encoding errors
//! - [`DecodeError`]: Positional-array message decoding errors

use std::str::FromStr;

use serde::Serialize;

/// Classification of batchexecute failures.
///
/// Every error produced by this crate (and by the client built on top of it)
/// maps onto exactly one code, so callers can branch on the class of failure
/// without matching on message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    /// The body was empty once the anti-hijacking prefix was removed.
    EmptyResponse,
    /// A chunk length line could not be parsed.
    InvalidChunkLength,
    /// The body ended before a chunk's declared length was available.
    IncompleteChunk,
    /// A framed payload was neither an array of rows nor a string holding one.
    ParseChunk,
    /// No `wrb.fr` row was found in the whole response.
    NoValidResponses,
    /// A row's payload string could not be decoded as JSON.
    DecodePayload,
    /// A positional array carried a value for an ordinal the schema lacks.
    UnknownField,
    /// An enum name did not match any value of the enum.
    UnknownEnumValue,
    /// A required field was absent after decoding.
    IncompleteMessage,
    /// A value had the wrong JSON shape for its field.
    InvalidMessage,
    /// The caller asked for something the wire format cannot express.
    InvalidRequest,
    /// The server answered with HTTP 401.
    Unauthorized,
    /// Any other HTTP status, I/O failure or timeout.
    Transport,
}

impl Code {
    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::EmptyResponse => "empty_response",
            Code::InvalidChunkLength => "invalid_chunk_length",
            Code::IncompleteChunk => "incomplete_chunk",
            Code::ParseChunk => "parse_chunk",
            Code::NoValidResponses => "no_valid_responses",
            Code::DecodePayload => "decode_payload",
            Code::UnknownField => "unknown_field",
            Code::UnknownEnumValue => "unknown_enum_value",
            Code::IncompleteMessage => "incomplete_message",
            Code::InvalidMessage => "invalid_message",
            Code::InvalidRequest => "invalid_request",
            Code::Unauthorized => "unauthorized",
            Code::Transport => "transport",
        }
    }

    /// Returns whether the surrounding system is expected to refresh
    /// credentials and re-issue the call.
    ///
    /// Only [`Unauthorized`](Code::Unauthorized) qualifies; every other code
    /// is terminal for the call.
    ///
    /// # Example
    ///
    /// ```
    /// use batchexecute_core::Code;
    ///
    /// assert!(Code::Unauthorized.needs_reauth());
    /// assert!(!Code::Transport.needs_reauth());
    /// assert!(!Code::NoValidResponses.needs_reauth());
    /// ```
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Code::Unauthorized)
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`Code`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseCodeError(());

impl std::fmt::Display for ParseCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown error code")
    }
}

impl std::error::Error for ParseCodeError {}

impl FromStr for Code {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty_response" => Ok(Code::EmptyResponse),
            "invalid_chunk_length" => Ok(Code::InvalidChunkLength),
            "incomplete_chunk" => Ok(Code::IncompleteChunk),
            "parse_chunk" => Ok(Code::ParseChunk),
            "no_valid_responses" => Ok(Code::NoValidResponses),
            "decode_payload" => Ok(Code::DecodePayload),
            "unknown_field" => Ok(Code::UnknownField),
            "unknown_enum_value" => Ok(Code::UnknownEnumValue),
            "incomplete_message" => Ok(Code::IncompleteMessage),
            "invalid_message" => Ok(Code::InvalidMessage),
            "invalid_request" => Ok(Code::InvalidRequest),
            "unauthorized" => Ok(Code::Unauthorized),
            "transport" => Ok(Code::Transport),
            _ => Err(ParseCodeError(())),
        }
    }
}

/// Framing, envelope decoding and request encoding errors.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// Nothing left after stripping the anti-hijacking prefix.
    #[error("empty response after trimming prefix")]
    EmptyResponse,

    /// A chunk length line was not a number in the accepted radix.
    #[error("invalid chunk length: {line:?}")]
    InvalidChunkLength { line: String },

    /// The body ended before the declared chunk length was read.
    #[error("incomplete chunk: declared {declared} bytes, {available} available")]
    IncompleteChunk { declared: usize, available: usize },

    /// A payload was neither a JSON array of rows nor a string wrapping one.
    #[error("parse chunk: {0}")]
    ParseChunk(String),

    /// No `wrb.fr` row was found across all payloads.
    #[error("no valid responses found")]
    NoValidResponses,

    /// The payload string of a row could not be decoded.
    #[error("decode payload of {id:?}: {reason}")]
    DecodePayload { id: String, reason: String },

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Get the error code.
    pub fn code(&self) -> Code {
        match self {
            Error::EmptyResponse => Code::EmptyResponse,
            Error::InvalidChunkLength { .. } => Code::InvalidChunkLength,
            Error::IncompleteChunk { .. } => Code::IncompleteChunk,
            Error::ParseChunk(_) => Code::ParseChunk,
            Error::NoValidResponses => Code::NoValidResponses,
            Error::DecodePayload { .. } => Code::DecodePayload,
            Error::InvalidRequest(_) => Code::InvalidRequest,
        }
    }
}

/// Positional-array message decoding errors.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The input bytes were not JSON at all.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// A position had no field in the schema and unknown fields are rejected.
    #[error("no field for position {0}")]
    UnknownField(u32),

    /// An enum name is not declared by the enum.
    #[error("unknown enum value {value:?} for {enum_name}")]
    UnknownEnumValue { enum_name: String, value: String },

    /// Required fields were absent after decoding.
    #[error("{message}: missing required fields {missing:?}")]
    IncompleteMessage {
        message: String,
        missing: Vec<String>,
    },

    /// A value had the wrong shape for its declared kind.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A number did not fit the declared width.
    #[error("number {value} out of range for {kind}")]
    OutOfRange { kind: &'static str, value: String },

    /// An error raised while decoding a named field.
    #[error("field {path}: {source}")]
    Field {
        path: String,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Wrap this error with the name of the field being decoded.
    ///
    /// Nested wrapping joins names with `.`, so the outermost error reads
    /// like `field sources.source_id: expected string, got number`.
    pub fn in_field(self, name: &str) -> Self {
        match self {
            DecodeError::Field { path, source } => DecodeError::Field {
                path: format!("{name}.{path}"),
                source,
            },
            other => DecodeError::Field {
                path: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Get the innermost error, skipping field context.
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get the error code of the innermost error.
    pub fn code(&self) -> Code {
        match self.root() {
            DecodeError::UnknownField(_) => Code::UnknownField,
            DecodeError::UnknownEnumValue { .. } => Code::UnknownEnumValue,
            DecodeError::IncompleteMessage { .. } => Code::IncompleteMessage,
            DecodeError::InvalidJson(_)
            | DecodeError::TypeMismatch { .. }
            | DecodeError::OutOfRange { .. }
            | DecodeError::Field { .. } => Code::InvalidMessage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(Code::EmptyResponse.as_str(), "empty_response");
        assert_eq!(Code::InvalidChunkLength.as_str(), "invalid_chunk_length");
        assert_eq!(Code::Unauthorized.as_str(), "unauthorized");
    }

    #[test]
    fn test_code_from_str() {
        assert_eq!("parse_chunk".parse(), Ok(Code::ParseChunk));
        assert_eq!("unauthorized".parse(), Ok(Code::Unauthorized));
        assert_eq!("transport".parse(), Ok(Code::Transport));
        assert_eq!("not_a_code".parse::<Code>(), Err(ParseCodeError(())));
    }

    #[test]
    fn test_code_round_trips_through_str() {
        let all = [
            Code::EmptyResponse,
            Code::InvalidChunkLength,
            Code::IncompleteChunk,
            Code::ParseChunk,
            Code::NoValidResponses,
            Code::DecodePayload,
            Code::UnknownField,
            Code::UnknownEnumValue,
            Code::IncompleteMessage,
            Code::InvalidMessage,
            Code::InvalidRequest,
            Code::Unauthorized,
            Code::Transport,
        ];
        for code in all {
            assert_eq!(code.as_str().parse::<Code>(), Ok(code));
        }
    }

    #[test]
    fn test_only_unauthorized_needs_reauth() {
        assert!(Code::Unauthorized.needs_reauth());
        assert!(!Code::Transport.needs_reauth());
        assert!(!Code::IncompleteChunk.needs_reauth());
        assert!(!Code::DecodePayload.needs_reauth());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::EmptyResponse.to_string(),
            "empty response after trimming prefix"
        );
        assert_eq!(
            Error::InvalidChunkLength { line: "abc".into() }.to_string(),
            "invalid chunk length: \"abc\""
        );
        assert_eq!(
            Error::IncompleteChunk {
                declared: 100,
                available: 20
            }
            .to_string(),
            "incomplete chunk: declared 100 bytes, 20 available"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NoValidResponses.code(), Code::NoValidResponses);
        assert_eq!(
            Error::DecodePayload {
                id: "x".into(),
                reason: "bad".into()
            }
            .code(),
            Code::DecodePayload
        );
        assert_eq!(
            Error::InvalidRequest("no calls".into()).code(),
            Code::InvalidRequest
        );
    }

    #[test]
    fn test_decode_error_field_path() {
        let err = DecodeError::TypeMismatch {
            expected: "string",
            actual: "number",
        }
        .in_field("source_id")
        .in_field("sources");

        assert_eq!(
            err.to_string(),
            "field sources.source_id: expected string, got number"
        );
        assert_eq!(err.code(), Code::InvalidMessage);
    }

    #[test]
    fn test_decode_error_code_sees_through_context() {
        let err = DecodeError::UnknownField(7).in_field("metadata");
        assert_eq!(err.code(), Code::UnknownField);
        assert_eq!(err.root(), &DecodeError::UnknownField(7));
    }
}
