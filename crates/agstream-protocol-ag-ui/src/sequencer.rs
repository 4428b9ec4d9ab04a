use crate::error::ProtocolError;
use crate::events::Event;
use agstream_contract::{Clock, IdGenerator};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Thread id used when the caller supplies none.
pub const DEFAULT_THREAD_ID: &str = "default-thread";

/// Lifecycle of one run.
///
/// `Created → Started ⇄ Messaging → Finished`; `Aborted` is reachable from
/// any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Started,
    /// A message is open and accepts content.
    Messaging,
    Finished,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Messaging => "messaging",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
        })
    }
}

/// Event state machine for a single run.
///
/// Each operation either returns the one event it produced or fails without
/// producing anything. A rejected operation aborts the run, so nothing is
/// emitted after an integration error.
pub struct RunSequencer {
    thread_id: String,
    run_id: Option<String>,
    state: RunState,
    open_message_id: Option<String>,
    message_ids: HashSet<String>,
    started_at: Option<u64>,
    finished_at: Option<u64>,
    last_timestamp: u64,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl RunSequencer {
    /// Create a sequencer for one run. An absent or empty `thread_id` falls
    /// back to [`DEFAULT_THREAD_ID`].
    pub fn new(
        thread_id: Option<String>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let thread_id = thread_id
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_ID.to_string());
        Self {
            thread_id,
            run_id: None,
            state: RunState::Created,
            open_message_id: None,
            message_ids: HashSet::new(),
            started_at: None,
            finished_at: None,
            last_timestamp: 0,
            ids,
            clock,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Run id, assigned by [`start_run`](Self::start_run).
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn open_message_id(&self) -> Option<&str> {
        self.open_message_id.as_deref()
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<u64> {
        self.finished_at
    }

    /// Number of messages opened so far in this run.
    pub fn message_count(&self) -> usize {
        self.message_ids.len()
    }

    pub fn start_run(&mut self) -> Result<Event, ProtocolError> {
        self.expect_state("start run", &[RunState::Created])?;
        let run_id = self.ids.next_id();
        if run_id.is_empty() {
            return Err(self.reject(ProtocolError::InvalidEvent(
                "id generator produced an empty run id".into(),
            )));
        }
        let ts = self.stamp();
        self.started_at = Some(ts);
        self.run_id = Some(run_id.clone());
        self.state = RunState::Started;
        debug!(run_id = %run_id, thread_id = %self.thread_id, "run started");
        Ok(Event::run_started(run_id, self.thread_id.clone(), ts))
    }

    pub fn open_message(&mut self) -> Result<Event, ProtocolError> {
        self.expect_state("open message", &[RunState::Started])?;
        let message_id = self.ids.next_id();
        if message_id.is_empty() || self.message_ids.contains(&message_id) {
            return Err(self.reject(ProtocolError::InvalidEvent(format!(
                "id generator produced an unusable message id: {message_id:?}"
            ))));
        }
        let ts = self.stamp();
        self.message_ids.insert(message_id.clone());
        self.open_message_id = Some(message_id.clone());
        self.state = RunState::Messaging;
        Ok(Event::text_message_start(message_id, ts))
    }

    /// Forward one chunk of the open message verbatim.
    pub fn append_content(&mut self, delta: impl Into<String>) -> Result<Event, ProtocolError> {
        self.expect_state("append content", &[RunState::Messaging])?;
        let delta = delta.into();
        if delta.is_empty() {
            return Err(self.reject(ProtocolError::InvalidEvent(
                "TextMessageContent.delta must not be empty".into(),
            )));
        }
        let message_id = self.current_message_id()?;
        Ok(Event::text_message_content(message_id, delta))
    }

    pub fn close_message(&mut self) -> Result<Event, ProtocolError> {
        self.expect_state("close message", &[RunState::Messaging])?;
        let message_id = self.current_message_id()?;
        self.open_message_id = None;
        self.state = RunState::Started;
        Ok(Event::text_message_end(message_id))
    }

    pub fn finish_run(&mut self) -> Result<Event, ProtocolError> {
        self.expect_state("finish run", &[RunState::Started])?;
        let Some(run_id) = self.run_id.clone() else {
            return Err(self.reject(ProtocolError::InvalidState {
                op: "finish run",
                state: self.state,
            }));
        };
        let ts = self.stamp();
        self.finished_at = Some(ts);
        self.state = RunState::Finished;
        debug!(
            run_id = %run_id,
            thread_id = %self.thread_id,
            messages = self.message_ids.len(),
            "run finished"
        );
        Ok(Event::run_finished(run_id, self.thread_id.clone(), ts))
    }

    /// Abandon the run without emitting anything. Returns `false` when the
    /// run had already reached a terminal state.
    pub fn abort(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        debug!(
            run_id = self.run_id.as_deref().unwrap_or(""),
            thread_id = %self.thread_id,
            state = %self.state,
            "run aborted"
        );
        self.state = RunState::Aborted;
        self.open_message_id = None;
        true
    }

    fn expect_state(
        &mut self,
        op: &'static str,
        allowed: &[RunState],
    ) -> Result<(), ProtocolError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(self.reject(ProtocolError::InvalidState {
            op,
            state: self.state,
        }))
    }

    fn current_message_id(&mut self) -> Result<String, ProtocolError> {
        match self.open_message_id.clone() {
            Some(id) => Ok(id),
            None => Err(self.reject(ProtocolError::InvalidState {
                op: "use open message",
                state: self.state,
            })),
        }
    }

    fn reject(&mut self, err: ProtocolError) -> ProtocolError {
        self.abort();
        err
    }

    /// Non-decreasing timestamp for the next event.
    fn stamp(&mut self) -> u64 {
        let now = self.clock.now_millis().max(self.last_timestamp);
        self.last_timestamp = now;
        now
    }
}

impl fmt::Debug for RunSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSequencer")
            .field("thread_id", &self.thread_id)
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("open_message_id", &self.open_message_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agstream_contract::testing::{ManualClock, SequentialIdGenerator};

    fn sequencer() -> RunSequencer {
        RunSequencer::new(
            Some("thread-1".into()),
            Arc::new(SequentialIdGenerator::new("id")),
            Arc::new(ManualClock::new(1_000)),
        )
    }

    #[test]
    fn start_assigns_run_id_and_timestamp() {
        let mut seq = sequencer();
        assert_eq!(seq.run_id(), None);
        let event = seq.start_run().unwrap();
        assert_eq!(event, Event::run_started("id-1", "thread-1", 1_000));
        assert_eq!(seq.state(), RunState::Started);
        assert_eq!(seq.started_at(), Some(1_000));
    }

    #[test]
    fn missing_or_empty_thread_id_uses_default() {
        let ids: Arc<dyn IdGenerator> = Arc::new(SequentialIdGenerator::default());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let seq = RunSequencer::new(None, ids.clone(), clock.clone());
        assert_eq!(seq.thread_id(), DEFAULT_THREAD_ID);
        let seq = RunSequencer::new(Some(String::new()), ids, clock);
        assert_eq!(seq.thread_id(), DEFAULT_THREAD_ID);
    }

    #[test]
    fn start_twice_is_invalid_state() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        let err = seq.start_run().unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidState {
                op: "start run",
                state: RunState::Started
            }
        );
        assert_eq!(seq.state(), RunState::Aborted);
    }

    #[test]
    fn open_message_before_start_is_invalid_state() {
        let mut seq = sequencer();
        assert!(matches!(
            seq.open_message(),
            Err(ProtocolError::InvalidState {
                state: RunState::Created,
                ..
            })
        ));
    }

    #[test]
    fn second_open_while_message_open_is_invalid_state() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        seq.open_message().unwrap();
        assert!(matches!(
            seq.open_message(),
            Err(ProtocolError::InvalidState {
                state: RunState::Messaging,
                ..
            })
        ));
    }

    #[test]
    fn append_without_open_message_fails_and_aborts() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        let err = seq.append_content("Hi").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidState { .. }));
        assert_eq!(seq.state(), RunState::Aborted);
        assert!(seq.finish_run().is_err());
    }

    #[test]
    fn empty_delta_is_invalid_event() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        seq.open_message().unwrap();
        assert!(matches!(
            seq.append_content(""),
            Err(ProtocolError::InvalidEvent(_))
        ));
    }

    #[test]
    fn close_without_open_message_is_invalid_state() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        assert!(matches!(
            seq.close_message(),
            Err(ProtocolError::InvalidState { .. })
        ));
    }

    #[test]
    fn finish_with_open_message_is_invalid_state() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        seq.open_message().unwrap();
        assert_eq!(
            seq.finish_run().unwrap_err(),
            ProtocolError::InvalidState {
                op: "finish run",
                state: RunState::Messaging
            }
        );
    }

    #[test]
    fn finished_run_accepts_nothing() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        seq.finish_run().unwrap();
        assert_eq!(seq.state(), RunState::Finished);
        assert!(seq.open_message().is_err());
        assert!(seq.finish_run().is_err());
        // Terminal state is kept, not overwritten by the rejection.
        assert_eq!(seq.state(), RunState::Finished);
        assert!(!seq.abort());
    }

    #[test]
    fn messages_get_fresh_ids() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        let first = seq.open_message().unwrap();
        seq.close_message().unwrap();
        let second = seq.open_message().unwrap();
        assert_ne!(first.message_id(), second.message_id());
        assert_eq!(seq.message_count(), 2);
    }

    #[test]
    fn content_and_end_reference_the_open_message() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        let start = seq.open_message().unwrap();
        let id = start.message_id().unwrap().to_string();
        assert_eq!(seq.open_message_id(), Some(id.as_str()));
        assert_eq!(seq.append_content("Hi").unwrap().message_id(), Some(id.as_str()));
        assert_eq!(seq.close_message().unwrap().message_id(), Some(id.as_str()));
        assert_eq!(seq.open_message_id(), None);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let clock = Arc::new(ManualClock::new(5_000));
        let mut seq = RunSequencer::new(
            None,
            Arc::new(SequentialIdGenerator::default()),
            clock.clone(),
        );
        let started = seq.start_run().unwrap();
        clock.set(4_000);
        let finished = seq.finish_run().unwrap();
        assert_eq!(started.timestamp(), Some(5_000));
        assert_eq!(finished.timestamp(), Some(5_000));
        assert!(seq.finished_at() >= seq.started_at());
    }

    #[test]
    fn abort_moves_to_terminal_state_once() {
        let mut seq = sequencer();
        seq.start_run().unwrap();
        seq.open_message().unwrap();
        assert!(seq.abort());
        assert_eq!(seq.state(), RunState::Aborted);
        assert_eq!(seq.open_message_id(), None);
        assert!(!seq.abort());
    }

    struct RepeatingIds;

    impl IdGenerator for RepeatingIds {
        fn next_id(&self) -> String {
            "same".to_string()
        }
    }

    #[test]
    fn repeated_message_id_is_rejected() {
        let mut seq = RunSequencer::new(
            None,
            Arc::new(RepeatingIds),
            Arc::new(ManualClock::new(0)),
        );
        seq.start_run().unwrap();
        seq.open_message().unwrap();
        seq.close_message().unwrap();
        assert!(matches!(
            seq.open_message(),
            Err(ProtocolError::InvalidEvent(_))
        ));
    }
}
