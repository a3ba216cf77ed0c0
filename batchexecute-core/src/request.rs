//! Request encoding.
//!
//! A batch is a form-encoded POST body with two fields:
//!
//! ```text
//! f.req = [[[<id>, "<json args>", null, "generic"], ...]]
//! at    = <auth token>
//! ```
//!
//! plus query parameters naming the called ids and identifying the request.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;

use crate::call::Call;
use crate::error::Error;
use crate::reqid::SequenceIdGenerator;

/// Index tag sent with every call tuple.
pub const GENERIC_INDEX: &str = "generic";

/// Query parameter names set by the encoder.
pub mod params {
    pub const RPC_IDS: &str = "rpcids";
    pub const REQUEST_ID: &str = "_reqid";
    pub const SOURCE_PATH: &str = "source-path";
    /// Asks the server for the chunked response transport.
    pub const RESPONSE_TYPE: &str = "rt";
    pub const CHUNKED: &str = "c";
}

/// Form fields of the request body.
#[derive(Serialize)]
struct FormBody<'a> {
    #[serde(rename = "f.req")]
    f_req: &'a str,
    at: &'a str,
}

/// The query parameters and form body of one batch request.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedRequest {
    /// Query parameters, including `rpcids` and `_reqid`.
    pub query: BTreeMap<String, String>,
    /// `application/x-www-form-urlencoded` body.
    pub body: Bytes,
}

impl EncodedRequest {
    /// Encode the query parameters as a query string.
    pub fn query_string(&self) -> Result<String, Error> {
        serde_qs::to_string(&self.query)
            .map_err(|e| Error::InvalidRequest(format!("query encoding failed: {e}")))
    }
}

/// Encodes calls into batch requests.
///
/// Holds the static query parameters shared by every request (application
/// build label, locale, session id). Per-request parameters are computed into
/// a fresh map on each [`encode`](Self::encode), so one encoder can be used
/// from many tasks at once.
#[derive(Clone, Debug, Default)]
pub struct RequestEncoder {
    params: BTreeMap<String, String>,
    chunked: bool,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static query parameter sent with every request.
    pub fn param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Ask the server for the chunked response transport (`rt=c`).
    pub fn chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    /// Whether requests ask for the chunked transport.
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// The static query parameters.
    pub fn static_params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Encode `calls` into one batch request.
    ///
    /// The `source-path` parameter is derived from the first call's context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `calls` is empty.
    pub fn encode(
        &self,
        calls: &[Call],
        auth_token: &str,
        reqid: &SequenceIdGenerator,
    ) -> Result<EncodedRequest, Error> {
        let Some(first) = calls.first() else {
            return Err(Error::InvalidRequest("at least one call is required".into()));
        };

        let f_req = encode_f_req(calls)?;
        let body = serde_qs::to_string(&FormBody {
            f_req: &f_req,
            at: auth_token,
        })
        .map_err(|e| Error::InvalidRequest(format!("form encoding failed: {e}")))?;

        let mut query = self.params.clone();
        query.insert(params::SOURCE_PATH.into(), first.source_path());
        let ids: Vec<&str> = calls.iter().map(Call::id).collect();
        query.insert(params::RPC_IDS.into(), ids.join(","));
        if self.chunked {
            query.insert(params::RESPONSE_TYPE.into(), params::CHUNKED.into());
        }
        query.insert(params::REQUEST_ID.into(), reqid.next());

        Ok(EncodedRequest {
            query,
            body: Bytes::from(body),
        })
    }
}

/// Build the `f.req` JSON text for `calls`.
pub fn encode_f_req(calls: &[Call]) -> Result<String, Error> {
    let mut rows = Vec::with_capacity(calls.len());
    for call in calls {
        let args = serde_json::to_string(call.arguments())
            .map_err(|e| Error::InvalidRequest(format!("argument encoding failed: {e}")))?;
        rows.push(serde_json::json!([call.id(), args, null, GENERIC_INDEX]));
    }
    serde_json::to_string(&serde_json::Value::Array(vec![serde_json::Value::Array(rows)]))
        .map_err(|e| Error::InvalidRequest(format!("f.req encoding failed: {e}")))
}
