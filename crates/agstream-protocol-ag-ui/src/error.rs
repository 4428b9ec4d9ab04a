use crate::sequencer::RunState;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Operation outside its legal state-machine transition.
    #[error("invalid state: cannot {op} while run is {state}")]
    InvalidState { op: &'static str, state: RunState },

    /// Event fails the event model's field constraints.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Payload cannot be represented on the wire.
    #[error("encoding failure: {0}")]
    Encoding(String),

    /// Inbound bytes are not a well-formed frame.
    #[error("malformed frame: {0}")]
    Decode(String),
}
