//! Response envelope decoding.
//!
//! Each framed payload is a JSON array of rows. Rows carrying call results
//! have the shape
//!
//! ```text
//! ["wrb.fr", <id>, <json string | null>, null, null, <status | null>, <index | "generic">]
//! ```
//!
//! Other rows (`"di"`, `"af.httprm"`, `"e"`) are bookkeeping and are skipped.

use bytes::Bytes;
use serde_json::Value as Json;

use crate::error::{DecodeError, Error};
use crate::framer::{FrameOptions, ResponseFramer};
use crate::request::GENERIC_INDEX;
use crate::value::Value;

/// Tag in element 0 of a result row.
pub const RESULT_ROW_TAG: &str = "wrb.fr";

/// Result rows shorter than this are skipped.
const MIN_ROW_LEN: usize = 7;

mod column {
    pub const TAG: usize = 0;
    pub const ID: usize = 1;
    pub const PAYLOAD: usize = 2;
    pub const STATUS: usize = 5;
    pub const INDEX: usize = 6;
}

/// The decoded result of one call.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
    /// The endpoint id the row answers.
    pub id: String,
    /// Position of the call within the batch; `"generic"` maps to 0.
    pub index: i64,
    /// Compact JSON text of the decoded payload. `null` when the row had none.
    pub payload: Bytes,
    /// Compact JSON of the row's status element, when the server set one.
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Parse the payload into a [`Value`].
    pub fn payload_value(&self) -> Result<Value, DecodeError> {
        Value::from_slice(&self.payload).map_err(|e| DecodeError::InvalidJson(e.to_string()))
    }

    /// Whether the payload is JSON `null`.
    pub fn is_null(&self) -> bool {
        self.payload.as_ref() == b"null"
    }

    /// Whether the server flagged this call as failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The first integer inside the status element, e.g. `3` for `[3]`.
    pub fn status_code(&self) -> Option<i64> {
        let status: Json = serde_json::from_str(self.error.as_deref()?).ok()?;
        first_integer(&status)
    }
}

fn first_integer(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => n.as_i64(),
        Json::Array(items) => items.iter().find_map(first_integer),
        _ => None,
    }
}

type BatchStrategy = fn(&[u8]) -> Option<Vec<Json>>;

/// Ways a framed payload may carry its rows, tried in order.
const BATCH_STRATEGIES: &[(&str, BatchStrategy)] = &[
    ("direct", parse_rows_direct),
    ("string-wrapped", parse_rows_wrapped),
];

/// Accepts only an array whose elements are all rows (or `null`).
fn parse_rows_direct(payload: &[u8]) -> Option<Vec<Json>> {
    match serde_json::from_slice::<Json>(payload).ok()? {
        Json::Array(rows) if rows.iter().all(|row| row.is_array() || row.is_null()) => Some(rows),
        _ => None,
    }
}

fn parse_rows_wrapped(payload: &[u8]) -> Option<Vec<Json>> {
    let inner: String = serde_json::from_slice(payload).ok()?;
    parse_rows_direct(inner.as_bytes())
}

type PayloadStrategy = fn(&str) -> Result<Json, serde_json::Error>;

/// Ways a row's payload string may be encoded, tried in order.
const PAYLOAD_STRATEGIES: &[(&str, PayloadStrategy)] = &[
    ("direct", parse_payload_direct),
    ("unescaped", parse_payload_unescaped),
];

fn parse_payload_direct(text: &str) -> Result<Json, serde_json::Error> {
    let value: Json = serde_json::from_str(text)?;
    if let Json::String(inner) = &value {
        // Double encoding: a JSON string whose content is itself structured.
        if let Ok(nested @ (Json::Array(_) | Json::Object(_))) = serde_json::from_str::<Json>(inner) {
            return Ok(nested);
        }
    }
    Ok(value)
}

fn parse_payload_unescaped(text: &str) -> Result<Json, serde_json::Error> {
    let unescaped: String = serde_json::from_str(&format!("\"{text}\""))?;
    serde_json::from_str(&unescaped)
}

/// Decode the rows of one framed payload into envelopes.
///
/// Rows that are not result rows are skipped. A payload holding no result
/// rows yields an empty list.
///
/// # Errors
///
/// - [`Error::ParseChunk`] if the payload is neither an array of rows nor a
///   JSON string wrapping one.
/// - [`Error::DecodePayload`] if a row's payload string is not JSON.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<ResponseEnvelope>, Error> {
    let rows = BATCH_STRATEGIES
        .iter()
        .find_map(|(_name, parse)| parse(payload))
        .ok_or_else(|| {
            Error::ParseChunk(format!(
                "not an array of rows: {}",
                String::from_utf8_lossy(&payload[..payload.len().min(64)])
            ))
        })?;

    let mut envelopes = Vec::new();
    for row in rows {
        let Json::Array(row) = row else {
            continue;
        };
        if let Some(envelope) = decode_row(row)? {
            envelopes.push(envelope);
        }
    }
    Ok(envelopes)
}

fn decode_row(mut row: Vec<Json>) -> Result<Option<ResponseEnvelope>, Error> {
    if row.len() < MIN_ROW_LEN || row[column::TAG].as_str() != Some(RESULT_ROW_TAG) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            tag = ?row.first().and_then(Json::as_str),
            len = row.len(),
            "skipping row"
        );
        return Ok(None);
    }

    let id = match &row[column::ID] {
        Json::String(id) => id.clone(),
        other => other.to_string(),
    };
    let index = decode_index(&row[column::INDEX]);
    let error = match &row[column::STATUS] {
        Json::Null => None,
        status => Some(status.to_string()),
    };

    let payload = match row[column::PAYLOAD].take() {
        Json::Null => Json::Null,
        Json::String(text) => decode_payload_text(&id, &text)?,
        decoded => decoded,
    };
    let payload = serde_json::to_vec(&payload).map_err(|e| Error::DecodePayload {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(ResponseEnvelope {
        id,
        index,
        payload: Bytes::from(payload),
        error,
    }))
}

fn decode_payload_text(id: &str, text: &str) -> Result<Json, Error> {
    let mut reason = String::new();
    for (name, parse) in PAYLOAD_STRATEGIES {
        match parse(text) {
            Ok(value) => return Ok(value),
            Err(e) => reason = format!("{name}: {e}"),
        }
    }
    Err(Error::DecodePayload {
        id: id.to_string(),
        reason,
    })
}

fn decode_index(value: &Json) -> i64 {
    match value {
        Json::String(s) if s == GENERIC_INDEX => 0,
        Json::String(s) => s.parse().unwrap_or(0),
        Json::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

/// Decode every payload a framer produces.
///
/// Envelopes keep the order of rows across payloads.
///
/// # Errors
///
/// Propagates the first framing or payload error, and returns
/// [`Error::NoValidResponses`] if no payload held a result row.
pub fn decode_response<I>(payloads: I) -> Result<Vec<ResponseEnvelope>, Error>
where
    I: IntoIterator<Item = Result<Bytes, Error>>,
{
    let mut envelopes = Vec::new();
    for payload in payloads {
        envelopes.extend(decode_payload(&payload?)?);
    }
    if envelopes.is_empty() {
        return Err(Error::NoValidResponses);
    }
    Ok(envelopes)
}

/// Frame and decode a whole response body.
pub fn decode_body(body: Bytes, options: FrameOptions) -> Result<Vec<ResponseEnvelope>, Error> {
    decode_response(ResponseFramer::new(body, options)?)
}
