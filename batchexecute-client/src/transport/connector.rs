//! TLS connector setup for the hyper client.
//!
//! TLS needs both a crypto provider and root certificates:
//!
//! - **Crypto providers** (choose one): `tls-ring` (default with `tls`) or
//!   `tls-aws-lc`. Without either, a process-wide default installed through
//!   `rustls::crypto::CryptoProvider::install_default()` is used.
//! - **Root certificates** (choose one): `tls-native-roots` (default with
//!   `tls`) or `tls-webpki-roots`.
//!
//! Connectors built here speak plain HTTP as well, so a client configured
//! with `use_http(true)` works through the same connector.

#[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::error::ClientBuildError;

/// Whether both a crypto provider and root certificates are compiled in.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(
            feature = "tls-native-roots",
            feature = "tls-webpki-roots"
        ))
}

type WantsVerifier = rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>;

/// Pick a crypto provider: the feature-gated one first, then the global
/// default.
fn crypto_provider_builder() -> Result<WantsVerifier, ClientBuildError> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    let provider = provider.ok_or_else(|| {
        ClientBuildError::Tls(
            "no crypto provider: enable `tls-ring` or `tls-aws-lc`, or install a global default"
                .into(),
        )
    })?;

    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientBuildError::Tls(e.to_string()))
}

/// Build the default TLS configuration from the enabled features.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Result<ClientConfig, ClientBuildError> {
    let builder = crypto_provider_builder()?;
    Ok(builder
        .with_root_certificates(root_store())
        .with_no_client_auth())
}

/// Without root certificate features there is nothing to verify servers
/// against.
#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
pub fn default_tls_config() -> Result<ClientConfig, ClientBuildError> {
    Err(ClientBuildError::Tls(
        "no root certificates: enable `tls-native-roots` or `tls-webpki-roots`".into(),
    ))
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    // Native roots win when both features are on.
    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            // Some certificates may still have loaded.
            #[cfg(feature = "tracing")]
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build a connector that speaks HTTPS (and plain HTTP).
///
/// Uses `tls_config` when given, otherwise [`default_tls_config`].
///
/// # Errors
///
/// Returns [`ClientBuildError::Tls`] when no configuration was given and no
/// default can be built from the enabled features.
pub fn build_https_connector(
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientBuildError> {
    let config = match tls_config {
        Some(config) => config,
        None => default_tls_config()?,
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_default_connector_builds() {
        assert!(has_tls_support());
        let config = default_tls_config().expect("tls features are enabled");
        assert!(config.alpn_protocols.is_empty());
        assert!(build_https_connector(None).is_ok());
    }

    #[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
    #[test]
    fn test_missing_roots_is_an_error() {
        assert!(!has_tls_support());
        assert!(matches!(
            build_https_connector(None),
            Err(ClientBuildError::Tls(_))
        ));
    }
}
