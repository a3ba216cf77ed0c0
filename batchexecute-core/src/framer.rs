//! Response framing.
//!
//! A batchexecute response body starts with the anti-hijacking prefix
//! `)]}'` and then takes one of two shapes:
//!
//! ```text
//! single:   [["wrb.fr", ...], ...]
//! chunked:  <length>\n<chunk>\n<length>\n<chunk>...
//! ```
//!
//! [`ResponseFramer`] splits a body into the JSON payloads those shapes carry.
//! Which shape applies is chosen by the caller through [`Transport`]; the
//! framer never guesses.

use bytes::Bytes;

use crate::error::Error;

/// Anti-hijacking prefix at the start of every response body.
pub const ANTI_HIJACK_PREFIX: &[u8] = b")]}'";

/// Response transport shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    /// The body is one JSON array of rows.
    #[default]
    Single,
    /// The body is a sequence of length-prefixed chunks (`rt=c`).
    Chunked,
}

/// Accepted radix for chunk length lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthRadix {
    /// Lengths must be decimal.
    #[default]
    Decimal,
    /// Lengths are decimal, or hexadecimal when they do not parse as decimal.
    DecimalOrHex,
}

/// Framing options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOptions {
    pub transport: Transport,
    pub length_radix: LengthRadix,
}

impl FrameOptions {
    /// Options for the single-array transport.
    pub fn single() -> Self {
        Self::default()
    }

    /// Options for the chunked transport with decimal lengths.
    pub fn chunked() -> Self {
        Self {
            transport: Transport::Chunked,
            length_radix: LengthRadix::Decimal,
        }
    }

    /// Set the accepted length radix.
    pub fn length_radix(mut self, radix: LengthRadix) -> Self {
        self.length_radix = radix;
        self
    }
}

/// Iterator over the JSON payloads of one response body.
///
/// Payloads are produced lazily. After the first error the framer yields
/// nothing more, and it cannot be restarted.
///
/// # Example
///
/// ```
/// use batchexecute_core::{FrameOptions, ResponseFramer};
///
/// let body = b")]}'\n\n12\n[[\"di\",125]]\n";
/// let payloads: Vec<_> = ResponseFramer::new(body.as_slice().into(), FrameOptions::chunked())
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(payloads, vec![bytes::Bytes::from_static(b"[[\"di\",125]]")]);
/// ```
#[derive(Debug)]
pub struct ResponseFramer {
    body: Bytes,
    pos: usize,
    options: FrameOptions,
    finished: bool,
}

impl ResponseFramer {
    /// Create a framer over `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyResponse`] if nothing but whitespace follows the
    /// anti-hijacking prefix.
    pub fn new(body: Bytes, options: FrameOptions) -> Result<Self, Error> {
        let body = trim_body(body);
        if body.is_empty() {
            return Err(Error::EmptyResponse);
        }
        Ok(Self {
            body,
            pos: 0,
            options,
            finished: false,
        })
    }

    /// The options this framer was created with.
    pub fn options(&self) -> FrameOptions {
        self.options
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            if self.pos >= self.body.len() {
                return Ok(None);
            }

            let line_end = find_line_end(&self.body, self.pos);
            let line = self.body[self.pos..line_end].trim_ascii();
            let declared = if line.is_empty() {
                None
            } else {
                Some(parse_length(line, self.options.length_radix)?)
            };
            self.pos = (line_end + 1).min(self.body.len());

            let Some(declared) = declared else {
                continue;
            };
            return self.take_chunk(declared).map(Some);
        }
    }

    /// Extract the chunk that follows a length line.
    ///
    /// Declared lengths count UTF-16 units and framing newlines, so they are
    /// not byte-exact. A chunk that is a complete JSON document on its own
    /// line is taken as-is; otherwise exactly `declared` bytes are read.
    fn take_chunk(&mut self, declared: usize) -> Result<Bytes, Error> {
        let start = self.pos;
        let line_end = find_line_end(&self.body, start);
        let line = &self.body[start..line_end];

        if is_complete_json(line) {
            self.pos = (line_end + 1).min(self.body.len());
            let chunk = self.body.slice(start..line_end);
            trace_chunk(declared, &chunk);
            return Ok(chunk);
        }

        let available = self.body.len() - start;
        if declared > available {
            return Err(Error::IncompleteChunk {
                declared,
                available,
            });
        }
        self.pos = start + declared;
        let chunk = self.body.slice(start..start + declared);
        trace_chunk(declared, &chunk);
        Ok(chunk)
    }
}

impl Iterator for ResponseFramer {
    type Item = Result<Bytes, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.options.transport {
            Transport::Single => {
                self.finished = true;
                Some(Ok(self.body.clone()))
            }
            Transport::Chunked => match self.next_chunk() {
                Ok(Some(chunk)) => Some(Ok(chunk)),
                Ok(None) => {
                    self.finished = true;
                    None
                }
                Err(e) => {
                    self.finished = true;
                    Some(Err(e))
                }
            },
        }
    }
}

impl std::iter::FusedIterator for ResponseFramer {}

/// Strip the anti-hijacking prefix and surrounding whitespace.
pub fn trim_body(body: Bytes) -> Bytes {
    let body = if body.starts_with(ANTI_HIJACK_PREFIX) {
        body.slice(ANTI_HIJACK_PREFIX.len()..)
    } else {
        body
    };
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let end = body
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    body.slice(start..end)
}

fn find_line_end(body: &[u8], from: usize) -> usize {
    body[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(body.len(), |i| from + i)
}

fn parse_length(line: &[u8], radix: LengthRadix) -> Result<usize, Error> {
    let invalid = || Error::InvalidChunkLength {
        line: String::from_utf8_lossy(line).into_owned(),
    };
    let text = std::str::from_utf8(line).map_err(|_| invalid())?;

    match text.parse::<usize>() {
        Ok(n) => Ok(n),
        Err(_) if radix == LengthRadix::DecimalOrHex => {
            usize::from_str_radix(text, 16).map_err(|_| invalid())
        }
        Err(_) => Err(invalid()),
    }
}

fn is_complete_json(line: &[u8]) -> bool {
    let line = line.trim_ascii();
    !line.is_empty() && serde_json::from_slice::<serde::de::IgnoredAny>(line).is_ok()
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn trace_chunk(declared: usize, chunk: &[u8]) {
    #[cfg(feature = "tracing")]
    tracing::trace!(
        declared,
        len = chunk.len(),
        preview = %String::from_utf8_lossy(&chunk[..chunk.len().min(64)]),
        "framed chunk"
    );
}
