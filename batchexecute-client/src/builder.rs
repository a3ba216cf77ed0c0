//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`BatchClient`].

use std::sync::Arc;
use std::time::Duration;

use batchexecute_core::{FrameOptions, LengthRadix, RequestEncoder, SequenceIdGenerator};
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::client::{BatchClient, ClientConfig};
use crate::error::ClientBuildError;
use crate::transport::{HyperTransport, Transport};

/// Builder for creating a [`BatchClient`].
///
/// Only the host is required. Everything else defaults to an anonymous,
/// single-transport client over HTTPS.
///
/// # Example
///
/// ```ignore
/// use batchexecute_client::BatchClient;
/// use std::time::Duration;
///
/// let client = BatchClient::builder("LabsTailwindUi")
///     .host("notebooklm.google.com")
///     .auth_token(token)
///     .cookies(cookies)
///     .header("x-same-domain", "1")
///     .url_param("hl", "en")
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub struct ClientBuilder<T = HyperTransport> {
    app: String,
    host: Option<String>,
    auth_token: String,
    cookies: Option<String>,
    headers: Vec<(String, String)>,
    url_params: Vec<(String, String)>,
    use_http: bool,
    chunked: bool,
    length_radix: LengthRadix,
    timeout: Option<Duration>,
    reqid: Option<Arc<SequenceIdGenerator>>,
    transport: Option<T>,
}

impl<T> std::fmt::Debug for ClientBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("app", &self.app)
            .field("host", &self.host)
            .field("auth_token", &redacted(!self.auth_token.is_empty()))
            .field("cookies", &redacted(self.cookies.is_some()))
            .field("headers", &self.headers)
            .field("url_params", &self.url_params)
            .field("use_http", &self.use_http)
            .field("chunked", &self.chunked)
            .field("length_radix", &self.length_radix)
            .field("timeout", &self.timeout)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

pub(crate) fn redacted(present: bool) -> &'static str {
    if present { "<redacted>" } else { "<none>" }
}

impl ClientBuilder<HyperTransport> {
    /// Create a builder for the application `app` (the path segment in
    /// `/_/{app}/data/batchexecute`).
    pub fn new<S: Into<String>>(app: S) -> Self {
        Self {
            app: app.into(),
            host: None,
            auth_token: String::new(),
            cookies: None,
            headers: Vec::new(),
            url_params: Vec::new(),
            use_http: false,
            chunked: false,
            length_radix: LengthRadix::default(),
            timeout: None,
            reqid: None,
            transport: None,
        }
    }
}

impl<T> ClientBuilder<T> {
    /// Set the host the endpoint lives on, e.g. `notebooklm.google.com`.
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the token sent as the `at` form field.
    pub fn auth_token<S: Into<String>>(mut self, token: S) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Set the raw `cookie` header value.
    pub fn cookies<S: Into<String>>(mut self, cookies: S) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    /// Add a header sent with every request.
    ///
    /// Later values for the same name replace earlier ones. Names and values
    /// are validated by [`build`](Self::build).
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter sent with every request (`bl`, `f.sid`, `hl`...).
    pub fn url_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.url_params.push((key.into(), value.into()));
        self
    }

    /// Talk plain HTTP instead of HTTPS.
    pub fn use_http(mut self, enabled: bool) -> Self {
        self.use_http = enabled;
        self
    }

    /// Ask for the chunked response transport and frame responses
    /// accordingly.
    pub fn chunked(mut self, enabled: bool) -> Self {
        self.chunked = enabled;
        self
    }

    /// How chunk length lines are parsed in chunked mode.
    pub fn length_radix(mut self, radix: LengthRadix) -> Self {
        self.length_radix = radix;
        self
    }

    /// Default timeout for every call. [`CallOptions`](crate::CallOptions)
    /// can override it per call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share a request id generator, e.g. between clients for the same
    /// session.
    pub fn reqid(mut self, reqid: Arc<SequenceIdGenerator>) -> Self {
        self.reqid = Some(reqid);
        self
    }

    /// Send requests through a custom transport.
    pub fn transport<U: Transport>(self, transport: U) -> ClientBuilder<U> {
        ClientBuilder {
            app: self.app,
            host: self.host,
            auth_token: self.auth_token,
            cookies: self.cookies,
            headers: self.headers,
            url_params: self.url_params,
            use_http: self.use_http,
            chunked: self.chunked,
            length_radix: self.length_radix,
            timeout: self.timeout,
            reqid: self.reqid,
            transport: Some(transport),
        }
    }
}

impl<T: Transport> ClientBuilder<T> {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// - [`ClientBuildError::MissingHost`] if no host was set.
    /// - [`ClientBuildError::InvalidHeader`] for a bad header or cookie.
    /// - [`ClientBuildError::InvalidUri`] if host and app do not form a URI.
    /// - Whatever [`Transport::from_defaults`] returns when no transport was
    ///   supplied.
    pub fn build(self) -> Result<BatchClient<T>, ClientBuildError> {
        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or(ClientBuildError::MissingHost)?;

        let scheme = if self.use_http { "http" } else { "https" };
        let endpoint = format!("{scheme}://{host}/_/{}/data/batchexecute", self.app);
        endpoint
            .parse::<http::Uri>()
            .map_err(|e| ClientBuildError::InvalidUri {
                uri: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let invalid = |reason: String| ClientBuildError::InvalidHeader {
                name: name.clone(),
                reason,
            };
            let header_name =
                HeaderName::try_from(name.as_str()).map_err(|e| invalid(e.to_string()))?;
            let header_value =
                HeaderValue::try_from(value.as_str()).map_err(|e| invalid(e.to_string()))?;
            headers.insert(header_name, header_value);
        }

        let cookies = match self.cookies {
            Some(cookies) => {
                let mut value = HeaderValue::try_from(cookies).map_err(|e| {
                    ClientBuildError::InvalidHeader {
                        name: http::header::COOKIE.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let encoder = self
            .url_params
            .into_iter()
            .fold(RequestEncoder::new(), |encoder, (k, v)| encoder.param(k, v))
            .chunked(self.chunked);

        let frame = if self.chunked {
            FrameOptions::chunked()
        } else {
            FrameOptions::single()
        }
        .length_radix(self.length_radix);

        let transport = match self.transport {
            Some(transport) => transport,
            None => T::from_defaults()?,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(%endpoint, chunked = self.chunked, "built batchexecute client");

        Ok(BatchClient::new(
            transport,
            ClientConfig {
                app: self.app,
                endpoint,
                auth_token: self.auth_token,
                cookies,
                headers,
                encoder,
                frame,
                timeout: self.timeout,
                reqid: self.reqid.unwrap_or_default(),
            },
        ))
    }
}
