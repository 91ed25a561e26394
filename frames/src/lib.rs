//! Shared frame model and SSE codec for the fortune stream.
//!
//! This crate owns the wire representation used by both `server` and
//! `client-rust`. Every frame travels as one Server-Sent-Events record of the
//! form `data: <json>\n\n`, where the JSON object carries the optional fields
//! `content`, `done`, `error`, plus any side-payload extension fields.
//!
//! DECODE PRECEDENCE
//! =================
//! `error` wins over everything, then `done`, then `content`. A payload with
//! none of the three is ignored rather than rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Payload key for streamed text, and for the final text of a done frame.
pub const FIELD_CONTENT: &str = "content";

/// Payload key marking the terminal success frame.
pub const FIELD_DONE: &str = "done";

/// Payload key for the terminal error message.
pub const FIELD_ERROR: &str = "error";

/// Side-payload key carrying the lucky numbers of a reading.
pub const FIELD_LUCKY_NUMBERS: &str = "luckyNumbers";

/// Extension fields attached to a done frame.
pub type SidePayload = Map<String, Value>;

// =============================================================================
// ERROR
// =============================================================================

/// Error returned by [`decode_frame`] and [`decode_payload`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The record payload is not a JSON object of the expected shape.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

// =============================================================================
// FRAME
// =============================================================================

/// One decoded unit of the stream protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Incremental text. Non-terminal.
    Content { text: String },
    /// Successful terminal frame with the authoritative full text.
    Done { final_text: String, side_payload: SidePayload },
    /// Error terminal frame.
    Error { message: String },
}

impl Frame {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn done(final_text: impl Into<String>, side_payload: SidePayload) -> Self {
        Self::Done { final_text: final_text.into(), side_payload }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    /// Terminal frames end a stream. At most one is expected per stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Integers under `luckyNumbers` on a done frame, if present.
    ///
    /// Non-integer entries are skipped; nothing is assumed about length or range.
    #[must_use]
    pub fn lucky_numbers(&self) -> Option<Vec<i64>> {
        let Self::Done { side_payload, .. } = self else {
            return None;
        };
        let values = side_payload.get(FIELD_LUCKY_NUMBERS)?.as_array()?;
        Some(values.iter().filter_map(Value::as_i64).collect())
    }
}

// =============================================================================
// ENCODE
// =============================================================================

#[derive(Serialize, Deserialize, Default)]
struct WirePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<&Frame> for WirePayload {
    fn from(frame: &Frame) -> Self {
        match frame {
            Frame::Content { text } => Self { content: Some(text.clone()), ..Self::default() },
            Frame::Done { final_text, side_payload } => {
                // Reserved keys in the side payload would shadow the protocol fields.
                let extra = side_payload
                    .iter()
                    .filter(|(k, _)| !matches!(k.as_str(), FIELD_CONTENT | FIELD_DONE | FIELD_ERROR))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Self { done: Some(true), content: Some(final_text.clone()), error: None, extra }
            }
            Frame::Error { message } => Self { error: Some(message.clone()), ..Self::default() },
        }
    }
}

/// Encode a frame into its JSON payload (the part after `data: `).
#[must_use]
pub fn encode_payload(frame: &Frame) -> String {
    // Strings and JSON maps always serialize; the fallback is unreachable.
    serde_json::to_string(&WirePayload::from(frame)).unwrap_or_else(|_| "{}".to_owned())
}

/// Encode a frame into one complete SSE record, blank-line terminated.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    format!("data: {}\n\n", encode_payload(frame))
}

// =============================================================================
// DECODE
// =============================================================================

/// Decode one raw SSE record (without its terminating blank line).
///
/// Returns `Ok(None)` for records that carry no frame: comments, records
/// without a `data:` field, and payloads with none of the protocol fields.
///
/// # Errors
///
/// Returns [`CodecError::MalformedFrame`] if the `data:` payload is not a
/// valid JSON object.
pub fn decode_frame(raw: &str) -> Result<Option<Frame>, CodecError> {
    match Record::parse(raw).data {
        Some(data) => decode_payload(&data),
        None => Ok(None),
    }
}

/// Decode a JSON payload into a frame using the error > done > content rule.
///
/// # Errors
///
/// Returns [`CodecError::MalformedFrame`] if the payload is not a JSON object
/// or if `content` is present with a non-string value.
pub fn decode_payload(data: &str) -> Result<Option<Frame>, CodecError> {
    let value: Value = serde_json::from_str(data).map_err(|e| CodecError::MalformedFrame(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(CodecError::MalformedFrame(format!("expected JSON object, got `{data}`")));
    };

    if let Some(error) = fields.remove(FIELD_ERROR).filter(|v| !v.is_null()) {
        let message = match error {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Ok(Some(Frame::Error { message }));
    }

    let content = match fields.remove(FIELD_CONTENT) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            return Err(CodecError::MalformedFrame(format!("`content` must be a string, got {other}")));
        }
    };

    if fields.remove(FIELD_DONE) == Some(Value::Bool(true)) {
        return Ok(Some(Frame::Done { final_text: content.unwrap_or_default(), side_payload: fields }));
    }

    Ok(content.map(|text| Frame::Content { text }))
}

// =============================================================================
// RECORD
// =============================================================================

/// The fields of one SSE record that matter to this protocol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    /// Value of the last `event:` line, if any.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`; `None` when the record has none.
    pub data: Option<String>,
}

impl Record {
    /// Parse the lines of one record. Comment lines and unknown fields are skipped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut record = Self::default();
        let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
        for line in normalized.split('\n') {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "data" => match &mut record.data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => record.data = Some(value.to_owned()),
                },
                "event" => record.event = Some(value.to_owned()),
                _ => {}
            }
        }
        record
    }
}

// =============================================================================
// RECORD DECODER
// =============================================================================

/// Incremental splitter that turns arbitrary byte chunks into complete records.
///
/// Lines end in `\n`, `\r\n` or a lone `\r`; a record ends at the first empty
/// line. Bytes are held until a boundary arrives, so multi-byte characters
/// split across chunks are reassembled intact. Scanning resumes where the
/// previous chunk stopped, so each byte is examined once.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buf: Vec<u8>,
    scan: usize,
    line_start: usize,
}

impl RecordDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every record it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some((end, consumed)) = self.next_boundary() {
            let raw = String::from_utf8_lossy(&self.buf[..end]).into_owned();
            self.buf.drain(..consumed);
            self.scan = 0;
            self.line_start = 0;
            if !raw.trim().is_empty() {
                records.push(raw);
            }
        }
        records
    }

    /// Take whatever partial record remains once the byte stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let raw = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        self.scan = 0;
        self.line_start = 0;
        if raw.trim().is_empty() { None } else { Some(raw) }
    }

    /// Advance to the first empty line. Returns (record end, bytes consumed).
    fn next_boundary(&mut self) -> Option<(usize, usize)> {
        while self.scan < self.buf.len() {
            let i = self.scan;
            let eol_len = match self.buf[i] {
                b'\n' => 1,
                b'\r' => match self.buf.get(i + 1) {
                    // A trailing `\r` may be the first half of `\r\n`.
                    None => return None,
                    Some(b'\n') => 2,
                    Some(_) => 1,
                },
                _ => {
                    self.scan += 1;
                    continue;
                }
            };
            if i == self.line_start {
                return Some((i, i + eol_len));
            }
            self.scan = i + eol_len;
            self.line_start = self.scan;
        }
        None
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
