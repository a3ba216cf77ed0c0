//! Client-side error types.
//!
//! [`ClientError`] is returned by every call; [`ClientBuildError`] by
//! [`ClientBuilder::build`](crate::ClientBuilder::build).

use batchexecute_core::{Code, DecodeError, Error};
use http::StatusCode;

/// Errors from a batch call.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The response could not be framed or its envelopes read, or the
    /// request could not be encoded.
    #[error(transparent)]
    Protocol(#[from] Error),

    /// A payload did not match the schema it was decoded against.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The server answered 401. Credentials need refreshing.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with a status other than 200 or 401.
    #[error("request failed: {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Connection or I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not finish within its timeout.
    #[error("request timed out")]
    Timeout,
}

impl ClientError {
    /// The failure class.
    ///
    /// Non-200 statuses, I/O failures and timeouts all report
    /// [`Code::Transport`]; a 401 reports [`Code::Unauthorized`].
    pub fn code(&self) -> Code {
        match self {
            ClientError::Protocol(err) => err.code(),
            ClientError::Decode(err) => err.code(),
            ClientError::Unauthorized(_) => Code::Unauthorized,
            ClientError::Status { .. } | ClientError::Transport(_) | ClientError::Timeout => {
                Code::Transport
            }
        }
    }

    /// Whether the server rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        self.code().needs_reauth()
    }

    /// The HTTP status for errors that carry one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a non-200 response.
    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = String::from_utf8_lossy(body).trim().to_string();
        if status == StatusCode::UNAUTHORIZED {
            ClientError::Unauthorized(message)
        } else {
            ClientError::Status { status, message }
        }
    }
}

/// Errors from building a client or transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// No host was configured.
    #[error("host is required")]
    MissingHost,

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The host and app do not form a valid URI.
    #[error("invalid uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// TLS could not be configured from the enabled features.
    #[error("tls error: {0}")]
    Tls(String),

    /// The transport type has no default and none was supplied.
    #[error("no transport configured")]
    MissingTransport,
}
