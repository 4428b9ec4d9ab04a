//! Collaborator contracts shared by the protocol, state, and server crates.
//!
//! Everything the core consumes from the outside world (identifiers, time,
//! generated text, tool execution) is expressed here as a narrow trait so
//! that each collaborator can be swapped for a deterministic fixture.
#![allow(missing_docs)]

pub mod clock;
pub mod ids;
pub mod source;
pub mod tool;

#[cfg(feature = "test-support")]
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use ids::{IdGenerator, UuidIdGenerator};
pub use source::{Pacing, StaticChunks, TextSource, WordChunks};
pub use tool::{
    Tool, ToolCallContext, ToolDescriptor, ToolError, ToolMessage, ToolRegistry,
    ToolRegistryBuilder, ToolRegistryError, ToolResult, ToolStatus,
};
