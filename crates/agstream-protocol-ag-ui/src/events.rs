use crate::error::ProtocolError;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Event Kinds
// ============================================================================

/// Closed set of run event kinds. The wire name is the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    RunStarted,
    TextMessageStart,
    TextMessageContent,
    TextMessageEnd,
    RunFinished,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::RunStarted,
        Self::TextMessageStart,
        Self::TextMessageContent,
        Self::TextMessageEnd,
        Self::RunFinished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "RunStarted",
            Self::TextMessageStart => "TextMessageStart",
            Self::TextMessageContent => "TextMessageContent",
            Self::TextMessageEnd => "TextMessageEnd",
            Self::RunFinished => "RunFinished",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ProtocolError::Decode(format!("unknown event kind: {s}")))
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Signals the start of an agent run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunStarted {
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    /// Milliseconds since epoch.
    pub timestamp: u64,
}

/// Opens an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TextMessageStart {
    #[serde(rename = "messageId")]
    pub message_id: String,
    /// Always `assistant` when produced by the sequencer.
    pub role: Role,
    pub timestamp: u64,
}

/// One incremental chunk of the open message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TextMessageContent {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub delta: String,
}

/// Closes a message; no further deltas follow for its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TextMessageEnd {
    #[serde(rename = "messageId")]
    pub message_id: String,
}

/// Signals successful completion of an agent run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunFinished {
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub timestamp: u64,
}

// ============================================================================
// Event
// ============================================================================

/// One run event. Serializes as its bare payload; the kind travels in the
/// frame's `event:` line.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Event {
    RunStarted(RunStarted),
    TextMessageStart(TextMessageStart),
    TextMessageContent(TextMessageContent),
    TextMessageEnd(TextMessageEnd),
    RunFinished(RunFinished),
}

impl Event {
    pub fn run_started(
        run_id: impl Into<String>,
        thread_id: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self::RunStarted(RunStarted {
            run_id: run_id.into(),
            thread_id: thread_id.into(),
            timestamp,
        })
    }

    pub fn text_message_start(message_id: impl Into<String>, timestamp: u64) -> Self {
        Self::TextMessageStart(TextMessageStart {
            message_id: message_id.into(),
            role: Role::Assistant,
            timestamp,
        })
    }

    pub fn text_message_content(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextMessageContent(TextMessageContent {
            message_id: message_id.into(),
            delta: delta.into(),
        })
    }

    pub fn text_message_end(message_id: impl Into<String>) -> Self {
        Self::TextMessageEnd(TextMessageEnd {
            message_id: message_id.into(),
        })
    }

    pub fn run_finished(
        run_id: impl Into<String>,
        thread_id: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self::RunFinished(RunFinished {
            run_id: run_id.into(),
            thread_id: thread_id.into(),
            timestamp,
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::RunStarted(_) => EventKind::RunStarted,
            Self::TextMessageStart(_) => EventKind::TextMessageStart,
            Self::TextMessageContent(_) => EventKind::TextMessageContent,
            Self::TextMessageEnd(_) => EventKind::TextMessageEnd,
            Self::RunFinished(_) => EventKind::RunFinished,
        }
    }

    /// Message id for text message events.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::TextMessageStart(e) => Some(&e.message_id),
            Self::TextMessageContent(e) => Some(&e.message_id),
            Self::TextMessageEnd(e) => Some(&e.message_id),
            Self::RunStarted(_) | Self::RunFinished(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Self::RunStarted(e) => Some(e.timestamp),
            Self::TextMessageStart(e) => Some(e.timestamp),
            Self::RunFinished(e) => Some(e.timestamp),
            Self::TextMessageContent(_) | Self::TextMessageEnd(_) => None,
        }
    }

    /// Check identifier and content constraints.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        fn non_empty(kind: EventKind, field: &str, value: &str) -> Result<(), ProtocolError> {
            if value.is_empty() {
                return Err(ProtocolError::InvalidEvent(format!(
                    "{kind}.{field} must not be empty"
                )));
            }
            Ok(())
        }

        let kind = self.kind();
        match self {
            Self::RunStarted(e) => {
                non_empty(kind, "runId", &e.run_id)?;
                non_empty(kind, "threadId", &e.thread_id)
            }
            Self::RunFinished(e) => {
                non_empty(kind, "runId", &e.run_id)?;
                non_empty(kind, "threadId", &e.thread_id)
            }
            Self::TextMessageStart(e) => non_empty(kind, "messageId", &e.message_id),
            Self::TextMessageContent(e) => {
                non_empty(kind, "messageId", &e.message_id)?;
                non_empty(kind, "delta", &e.delta)
            }
            Self::TextMessageEnd(e) => non_empty(kind, "messageId", &e.message_id),
        }
    }

    /// Rebuild an event from a decoded frame. Extra or missing fields are
    /// rejected.
    pub fn from_payload(kind: EventKind, payload: Value) -> Result<Self, ProtocolError> {
        fn parse<T: serde::de::DeserializeOwned>(
            kind: EventKind,
            payload: Value,
        ) -> Result<T, ProtocolError> {
            serde_json::from_value(payload)
                .map_err(|e| ProtocolError::Decode(format!("{kind} payload: {e}")))
        }

        let event = match kind {
            EventKind::RunStarted => Self::RunStarted(parse(kind, payload)?),
            EventKind::TextMessageStart => Self::TextMessageStart(parse(kind, payload)?),
            EventKind::TextMessageContent => Self::TextMessageContent(parse(kind, payload)?),
            EventKind::TextMessageEnd => Self::TextMessageEnd(parse(kind, payload)?),
            EventKind::RunFinished => Self::RunFinished(parse(kind, payload)?),
        };
        Ok(event)
    }
}
