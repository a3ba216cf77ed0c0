//! Response types.
//!
//! [`BatchResponse`] wraps the value a call produced together with the
//! response headers ([`Metadata`]).

use http::HeaderMap;
use std::ops::Deref;

use batchexecute_core::ResponseEnvelope;

/// A call's result together with the response headers.
///
/// Derefs to the inner value, which is a [`ResponseEnvelope`] for
/// [`execute`](crate::BatchClient::execute).
///
/// # Example
///
/// ```ignore
/// let response = client.execute(Call::new("wXbhsf")).await?;
///
/// println!("{} answered {}", response.id, response.payload_value()?);
///
/// if let Some(server) = response.metadata().get("server") {
///     println!("served by {server}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BatchResponse<T = ResponseEnvelope> {
    inner: T,
    metadata: Metadata,
}

impl<T> BatchResponse<T> {
    pub fn new(inner: T, metadata: Metadata) -> Self {
        Self { inner, metadata }
    }

    /// Extract the inner value, discarding metadata.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Transform the inner value, preserving metadata.
    pub fn map<U, F>(self, f: F) -> BatchResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        BatchResponse {
            inner: f(self.inner),
            metadata: self.metadata,
        }
    }

    /// Transform the inner value with a fallible function, preserving
    /// metadata on success.
    pub fn try_map<U, E, F>(self, f: F) -> Result<BatchResponse<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(BatchResponse {
            inner: f(self.inner)?,
            metadata: self.metadata,
        })
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Decompose into inner value and metadata.
    pub fn into_parts(self) -> (T, Metadata) {
        (self.inner, self.metadata)
    }
}

impl<T> Deref for BatchResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> AsRef<T> for BatchResponse<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

/// Headers of the HTTP response that carried a batch.
///
/// batchexecute puts nothing protocol-level in headers, but callers read
/// them for rotated cookies (`set-cookie`) and server diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    headers: HeaderMap,
}

impl Metadata {
    /// Wrap response headers.
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Metadata with no headers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get a header value by name.
    ///
    /// Returns `None` if the header is absent or not visible ASCII.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// All values of a repeated header, such as `set-cookie`.
    pub fn get_all(&self, key: &str) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(key)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// The raw header map.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl From<HeaderMap> for Metadata {
    fn from(headers: HeaderMap) -> Self {
        Self::new(headers)
    }
}

impl From<Metadata> for HeaderMap {
    fn from(metadata: Metadata) -> Self {
        metadata.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::HeaderValue;

    fn envelope() -> ResponseEnvelope {
        ResponseEnvelope {
            id: "wXbhsf".into(),
            index: 0,
            payload: Bytes::from_static(b"[[\"nb\"]]"),
            error: None,
        }
    }

    #[test]
    fn test_deref_to_envelope() {
        let response = BatchResponse::new(envelope(), Metadata::empty());
        assert_eq!(response.id, "wXbhsf");
        assert!(!response.is_null());
    }

    #[test]
    fn test_map_and_try_map_keep_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("x-test", HeaderValue::from_static("kept"));
        let response = BatchResponse::new(envelope(), Metadata::new(headers));

        let ids = response.map(|e| e.id);
        assert_eq!(*ids, "wXbhsf");
        assert_eq!(ids.metadata().get("x-test"), Some("kept"));

        let failed: Result<BatchResponse<u8>, &str> = ids.try_map(|_| Err("nope"));
        assert_eq!(failed.unwrap_err(), "nope");
    }

    #[test]
    fn test_metadata_get_all() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let metadata = Metadata::from(headers);

        assert_eq!(metadata.get_all("set-cookie").collect::<Vec<_>>(), ["a=1", "b=2"]);
        assert!(metadata.contains("set-cookie"));
        assert!(!metadata.contains("x-absent"));
        assert_eq!(metadata.get("set-cookie"), Some("a=1"));
        assert_eq!(metadata.headers().len(), 2);
        assert_eq!(metadata.into_headers().len(), 2);
    }

    #[test]
    fn test_into_parts() {
        let (inner, metadata) = BatchResponse::new(7, Metadata::empty()).into_parts();
        assert_eq!(inner, 7);
        assert!(metadata.is_empty());
        assert!(HeaderMap::from(metadata).is_empty());
    }
}
