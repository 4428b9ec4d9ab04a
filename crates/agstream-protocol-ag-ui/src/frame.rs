//! SSE framing for run events.
//!
//! A frame is `event: <Kind>\n`, `data: <json object>\n`, then a blank line.
//! The JSON payload is serialized on one line (`serde_json` escapes control
//! characters), so the `\n\n` terminator cannot occur inside a frame.

use crate::error::ProtocolError;
use crate::events::{Event, EventKind};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

const TERMINATOR: &[u8] = b"\n\n";

/// Serialize one payload into one self-delimited frame.
pub fn encode_frame<P>(kind: EventKind, payload: &P) -> Result<Bytes, ProtocolError>
where
    P: Serialize + ?Sized,
{
    let value = serde_json::to_value(payload)
        .map_err(|e| ProtocolError::Encoding(format!("{kind} payload: {e}")))?;
    if !value.is_object() {
        return Err(ProtocolError::Encoding(format!(
            "{kind} payload must be a JSON object"
        )));
    }
    let json = serde_json::to_string(&value)
        .map_err(|e| ProtocolError::Encoding(format!("{kind} payload: {e}")))?;
    Ok(Bytes::from(format!("event: {kind}\ndata: {json}\n\n")))
}

impl Event {
    /// Validate and frame this event.
    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        self.validate()?;
        encode_frame(self.kind(), self)
    }
}

/// One parsed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub kind: EventKind,
    pub data: Value,
}

impl DecodedFrame {
    pub fn into_event(self) -> Result<Event, ProtocolError> {
        Event::from_payload(self.kind, self.data)
    }
}

/// Incremental frame parser for consumers reading a byte stream whose
/// chunk boundaries need not line up with frame boundaries.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; returns every frame completed by them.
    ///
    /// A malformed frame is never consumed. Frames decoded ahead of it in
    /// the same call are returned first, and the error surfaces on the next
    /// `push` or on [`finish`](Self::finish). From then on the decoder is
    /// poisoned: every call reports the same bad frame.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<DecodedFrame>, ProtocolError> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = find_terminator(&self.buf) {
            match parse_block(&self.buf[..pos]) {
                Ok(frame) => {
                    self.buf.drain(..pos + TERMINATOR.len());
                    frames.push(frame);
                }
                Err(_) if !frames.is_empty() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(frames)
    }

    /// Whether bytes of an unterminated frame are buffered.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Signal end of stream; a pending malformed frame or a dangling
    /// partial frame is an error.
    pub fn finish(self) -> Result<(), ProtocolError> {
        if let Some(pos) = find_terminator(&self.buf) {
            parse_block(&self.buf[..pos])?;
        }
        if self.has_partial() {
            return Err(ProtocolError::Decode(format!(
                "stream ended inside a frame ({} bytes buffered)",
                self.buf.len()
            )));
        }
        Ok(())
    }

    /// Decode a complete body in one call.
    pub fn decode_all(body: &[u8]) -> Result<Vec<DecodedFrame>, ProtocolError> {
        let mut decoder = Self::new();
        let frames = decoder.push(body)?;
        decoder.finish()?;
        Ok(frames)
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

fn parse_block(block: &[u8]) -> Result<DecodedFrame, ProtocolError> {
    let text = std::str::from_utf8(block)
        .map_err(|e| ProtocolError::Decode(format!("frame is not utf-8: {e}")))?;
    let mut kind = None;
    let mut data = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            kind = Some(rest.parse::<EventKind>()?);
        } else if let Some(rest) = line.strip_prefix("data: ") {
            let value: Value = serde_json::from_str(rest)
                .map_err(|e| ProtocolError::Decode(format!("data is not JSON: {e}")))?;
            data = Some(value);
        } else {
            return Err(ProtocolError::Decode(format!("unexpected line: {line:?}")));
        }
    }
    match (kind, data) {
        (Some(kind), Some(data)) => Ok(DecodedFrame { kind, data }),
        (None, _) => Err(ProtocolError::Decode("frame has no event line".into())),
        (_, None) => Err(ProtocolError::Decode("frame has no data line".into())),
    }
}
