//! Delivery of encoded frames to HTTP consumers.

pub mod http_run;
pub mod http_sse;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The consumer went away; nothing more can be delivered.
    #[error("closed")]
    Closed,
}
