//! Per-call options.

use http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Options for a single batch call.
///
/// Anything set here applies to one call only and takes precedence over the
/// client's configuration.
///
/// # Example
///
/// ```
/// use batchexecute_client::CallOptions;
/// use http::header::{HeaderName, HeaderValue};
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .header(HeaderName::from_static("x-goog-ext-353267353-jspb"), HeaderValue::from_static("[null]"));
///
/// assert_eq!(options.get_timeout(), Some(Duration::from_secs(5)));
/// assert_eq!(options.get_headers().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Overrides the client's timeout when set.
    pub(crate) timeout: Option<Duration>,
    /// Sent after the client's configured headers, replacing same-named ones.
    pub(crate) headers: HeaderMap,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this call.
    ///
    /// The whole exchange, including reading the body, must finish within it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Add a header for this call.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header for this call from strings.
    ///
    /// Returns `None` if the header name or value is invalid.
    ///
    /// # Example
    ///
    /// ```
    /// use batchexecute_client::CallOptions;
    ///
    /// assert!(CallOptions::new().try_header("x-same-domain", "1").is_some());
    /// assert!(CallOptions::new().try_header("bad\nname", "1").is_none());
    /// ```
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }

    /// Replace all headers for this call.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}
