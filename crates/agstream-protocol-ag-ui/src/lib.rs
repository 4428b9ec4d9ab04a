//! AG-UI run streaming: event model, SSE frame codec, and the run sequencer
//! that enforces event ordering.
#![allow(missing_docs)]

mod error;
pub mod events;
pub mod frame;
mod sequencer;
pub mod types;

pub use error::ProtocolError;
pub use events::{
    Event, EventKind, RunFinished, RunStarted, TextMessageContent, TextMessageEnd,
    TextMessageStart,
};
pub use frame::{encode_frame, DecodedFrame, FrameDecoder, EVENT_STREAM_CONTENT_TYPE};
pub use sequencer::{RunSequencer, RunState, DEFAULT_THREAD_ID};
pub use types::Role;
