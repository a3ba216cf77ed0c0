//! HTTP transport layer.
//!
//! [`BatchClient`](crate::BatchClient) sends its requests through a
//! [`Transport`]. The default is [`HyperTransport`], built on hyper_util's
//! legacy client:
//!
//! - HTTP/1.1 and HTTP/2 with ALPN negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//! - Tower service integration for middleware
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots`
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use batchexecute_client::transport::HyperTransport;
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//! ```

mod connector;
mod hyper;

use std::future::Future;

use bytes::Bytes;

use crate::error::{ClientBuildError, ClientError};

pub use connector::{build_https_connector, default_tls_config, has_tls_support};
pub use self::hyper::{HyperTransport, HyperTransportBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

/// Sends one fully buffered HTTP exchange.
///
/// Implementations return the response whatever its status; status handling
/// belongs to the client. Failures to reach the server or to read the body
/// are [`ClientError::Transport`].
pub trait Transport: Clone + Send + Sync + 'static {
    /// Send `request` and collect the response body.
    fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> impl Future<Output = Result<http::Response<Bytes>, ClientError>> + Send;

    /// The transport a builder uses when none was supplied.
    fn from_defaults() -> Result<Self, ClientBuildError> {
        Err(ClientBuildError::MissingTransport)
    }
}
