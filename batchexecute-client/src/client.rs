//! The batchexecute client.
//!
//! [`BatchClient`] turns [`Call`]s into one form-encoded POST, sends it
//! through a [`Transport`] and decodes the response envelopes.

use std::sync::Arc;
use std::time::Duration;

use batchexecute_core::{
    decode_body, decode_slice, Call, DecodeOptions, DecodedMessage, Error, FrameOptions,
    RequestEncoder, ResponseEnvelope, Schema, SequenceIdGenerator,
};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, StatusCode, Uri};
use tokio::time::timeout;

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::builder::{redacted, ClientBuilder};
use crate::error::ClientError;
use crate::options::CallOptions;
use crate::response::{BatchResponse, Metadata};
use crate::transport::{HyperTransport, Transport};

/// Content type of every batch request.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Immutable configuration shared by clones of a client.
pub(crate) struct ClientConfig {
    pub(crate) app: String,
    pub(crate) endpoint: String,
    pub(crate) auth_token: String,
    pub(crate) cookies: Option<HeaderValue>,
    pub(crate) headers: HeaderMap,
    pub(crate) encoder: RequestEncoder,
    pub(crate) frame: FrameOptions,
    pub(crate) timeout: Option<Duration>,
    pub(crate) reqid: Arc<SequenceIdGenerator>,
}

/// Client for one batchexecute endpoint.
///
/// Cloning is cheap: clones share configuration, the request id sequence
/// and the transport's connection pool.
///
/// # Example
///
/// ```ignore
/// use batchexecute_client::{BatchClient, Call};
///
/// let client = BatchClient::builder("LabsTailwindUi")
///     .host("notebooklm.google.com")
///     .auth_token(token)
///     .cookies(cookies)
///     .build()?;
///
/// let response = client.execute(Call::new("wXbhsf").arg(Value::Null).arg(1)).await?;
/// println!("{}", response.payload_value()?);
/// ```
#[derive(Clone)]
pub struct BatchClient<T = HyperTransport> {
    transport: T,
    config: Arc<ClientConfig>,
}

impl<T> std::fmt::Debug for BatchClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchClient")
            .field("endpoint", &self.config.endpoint)
            .field("auth_token", &redacted(!self.config.auth_token.is_empty()))
            .field("cookies", &redacted(self.config.cookies.is_some()))
            .field("headers", &self.config.headers.keys().collect::<Vec<_>>())
            .field("params", self.config.encoder.static_params())
            .field("frame", &self.config.frame)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl BatchClient<HyperTransport> {
    /// Create a builder for the application `app`.
    pub fn builder<S: Into<String>>(app: S) -> ClientBuilder<HyperTransport> {
        ClientBuilder::new(app)
    }
}

impl<T: Transport> BatchClient<T> {
    pub(crate) fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// The full endpoint URL, without query.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn app(&self) -> &str {
        &self.config.app
    }

    /// The request id generator.
    pub fn reqid(&self) -> &Arc<SequenceIdGenerator> {
        &self.config.reqid
    }

    /// The default timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute one call and return its envelope.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthorized`] when the server answers 401.
    /// - [`ClientError::Status`] for any other non-200 status.
    /// - [`ClientError::Transport`] / [`ClientError::Timeout`] when the
    ///   exchange fails.
    /// - [`ClientError::Protocol`] when the body cannot be framed or holds
    ///   no result rows.
    pub async fn execute(&self, call: Call) -> Result<BatchResponse, ClientError> {
        self.execute_with_options(call, CallOptions::default()).await
    }

    /// Execute one call with per-call options.
    pub async fn execute_with_options(
        &self,
        call: Call,
        options: CallOptions,
    ) -> Result<BatchResponse, ClientError> {
        let response = self
            .execute_all_with_options(std::slice::from_ref(&call), options)
            .await?;
        response.try_map(|envelopes| {
            envelopes
                .into_iter()
                .next()
                .ok_or(ClientError::Protocol(Error::NoValidResponses))
        })
    }

    /// Execute several calls in one request and return every envelope in
    /// response order.
    pub async fn execute_all(
        &self,
        calls: &[Call],
    ) -> Result<BatchResponse<Vec<ResponseEnvelope>>, ClientError> {
        self.execute_all_with_options(calls, CallOptions::default()).await
    }

    /// Execute several calls in one request with per-call options.
    pub async fn execute_all_with_options(
        &self,
        calls: &[Call],
        options: CallOptions,
    ) -> Result<BatchResponse<Vec<ResponseEnvelope>>, ClientError> {
        #[cfg(feature = "tracing")]
        {
            let ids: Vec<&str> = calls.iter().map(Call::id).collect();
            let span = info_span!(
                "batchexecute.call",
                rpc.ids = %ids.join(","),
                rpc.app = %self.config.app,
                otel.kind = "client",
            );
            return self.send_batch(calls, options).instrument(span).await;
        }

        #[cfg(not(feature = "tracing"))]
        self.send_batch(calls, options).await
    }

    /// Execute one call and decode its payload against `schema`.
    ///
    /// A `null` payload is not a message and fails with a type mismatch.
    pub async fn call_decoded(
        &self,
        call: Call,
        schema: &Arc<Schema>,
        options: DecodeOptions,
    ) -> Result<BatchResponse<DecodedMessage>, ClientError> {
        let response = self.execute(call).await?;
        response.try_map(|envelope| {
            decode_slice(&envelope.payload, schema, options).map_err(ClientError::from)
        })
    }

    async fn send_batch(
        &self,
        calls: &[Call],
        options: CallOptions,
    ) -> Result<BatchResponse<Vec<ResponseEnvelope>>, ClientError> {
        let request = self.build_request(calls, &options)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %request.uri().path(), "sending batch request");

        let effective_timeout = options.timeout.or(self.config.timeout);
        let response = match effective_timeout {
            Some(t) => timeout(t, self.transport.send(request))
                .await
                .map_err(|_| ClientError::Timeout)??,
            None => self.transport.send(request).await?,
        };

        let (parts, body) = response.into_parts();

        #[cfg(feature = "tracing")]
        tracing::debug!(status = %parts.status, bytes = body.len(), "received batch response");

        if parts.status != StatusCode::OK {
            return Err(ClientError::from_status(parts.status, &body));
        }

        let envelopes = decode_body(body, self.config.frame)?;
        Ok(BatchResponse::new(envelopes, Metadata::new(parts.headers)))
    }

    /// Build the HTTP request for `calls`.
    ///
    /// Header precedence, lowest first: content type, client headers,
    /// per-call headers, cookie.
    fn build_request(
        &self,
        calls: &[Call],
        options: &CallOptions,
    ) -> Result<Request<Bytes>, ClientError> {
        let config = &self.config;
        let encoded = config
            .encoder
            .encode(calls, &config.auth_token, &config.reqid)?;

        let uri = format!("{}?{}", config.endpoint, encoded.query_string()?)
            .parse::<Uri>()
            .map_err(|e| Error::InvalidRequest(format!("invalid request uri: {e}")))?;

        let mut request = Request::new(encoded.body);
        *request.method_mut() = Method::POST;
        *request.uri_mut() = uri;

        let headers = request.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(FORM_CONTENT_TYPE),
        );
        headers.extend(config.headers.clone());
        headers.extend(options.headers.clone());
        if let Some(cookies) = &config.cookies {
            headers.insert(header::COOKIE, cookies.clone());
        }

        Ok(request)
    }
}
