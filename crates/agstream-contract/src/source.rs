//! Content sources feeding an assistant message, and the pacing applied
//! between chunks.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

/// Order-preserving producer of message content fragments.
///
/// Chunk boundaries are decided by the source; consumers forward each
/// fragment verbatim.
#[async_trait]
pub trait TextSource: Send {
    /// Next fragment, or `None` once the message is complete.
    async fn next_chunk(&mut self) -> Option<String>;
}

/// Splits a text on single spaces and yields each word followed by one
/// space, so `"Hello world"` becomes `["Hello ", "world "]`.
#[derive(Debug, Clone)]
pub struct WordChunks {
    words: VecDeque<String>,
}

impl WordChunks {
    pub fn new(text: &str) -> Self {
        Self {
            words: text.split(' ').map(|w| format!("{w} ")).collect(),
        }
    }
}

#[async_trait]
impl TextSource for WordChunks {
    async fn next_chunk(&mut self) -> Option<String> {
        self.words.pop_front()
    }
}

/// Yields a fixed list of fragments as given.
#[derive(Debug, Clone, Default)]
pub struct StaticChunks {
    chunks: VecDeque<String>,
}

impl StaticChunks {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TextSource for StaticChunks {
    async fn next_chunk(&mut self) -> Option<String> {
        self.chunks.pop_front()
    }
}

/// Delay inserted before each content chunk to simulate gradual generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    None,
    Fixed(Duration),
}

impl Pacing {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::None
        } else {
            Self::Fixed(Duration::from_millis(ms))
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed(d) => Some(*d),
        }
    }
}
