//! Run driver: pulls content from a [`TextSource`], applies pacing, and
//! pushes every event the sequencer emits to the SSE sink.

use agstream_contract::{Pacing, TextSource};
use agstream_protocol_ag_ui::{Event, ProtocolError, RunSequencer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::http_sse::{sse_channel, SseBody, SseFrameSink, SSE_CHANNEL_CAPACITY};

#[derive(Debug, thiserror::Error)]
pub enum AbortReason {
    #[error("client disconnected")]
    Disconnected,
    #[error("cancelled")]
    Cancelled,
    #[error("timed out")]
    TimedOut,
    #[error(transparent)]
    Failed(#[from] ProtocolError),
}

#[derive(Debug)]
pub enum RunOutcome {
    Finished,
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Stream one assistant message built from `source` as a complete run:
/// `RunStarted`, the message, `RunFinished`.
///
/// Empty chunks are skipped. Whenever the run cannot complete the
/// sequencer is aborted and nothing further is sent.
pub async fn stream_text<S>(
    seq: &mut RunSequencer,
    source: &mut S,
    pacing: Pacing,
    sink: &SseFrameSink,
    cancel: &CancellationToken,
) -> RunOutcome
where
    S: TextSource + ?Sized,
{
    match drive(seq, source, pacing, sink, cancel).await {
        Ok(()) => RunOutcome::Finished,
        Err(reason) => {
            seq.abort();
            RunOutcome::Aborted(reason)
        }
    }
}

async fn drive<S>(
    seq: &mut RunSequencer,
    source: &mut S,
    pacing: Pacing,
    sink: &SseFrameSink,
    cancel: &CancellationToken,
) -> Result<(), AbortReason>
where
    S: TextSource + ?Sized,
{
    emit(sink, cancel, seq.start_run()).await?;
    emit(sink, cancel, seq.open_message()).await?;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AbortReason::Cancelled),
            _ = sink.closed() => return Err(AbortReason::Disconnected),
            chunk = source.next_chunk() => chunk,
        };
        let Some(chunk) = chunk else { break };
        if chunk.is_empty() {
            continue;
        }
        if let Some(delay) = pacing.delay() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AbortReason::Cancelled),
                _ = sink.closed() => return Err(AbortReason::Disconnected),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        emit(sink, cancel, seq.append_content(chunk)).await?;
    }

    emit(sink, cancel, seq.close_message()).await?;
    emit(sink, cancel, seq.finish_run()).await?;
    Ok(())
}

async fn emit(
    sink: &SseFrameSink,
    cancel: &CancellationToken,
    event: Result<Event, ProtocolError>,
) -> Result<(), AbortReason> {
    let frame = event.and_then(|e| e.to_frame()).map_err(|e| {
        warn!(error = %e, "dropping run after protocol error");
        AbortReason::Failed(e)
    })?;
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AbortReason::Cancelled),
        sent = sink.send(frame) => sent.map_err(|_| AbortReason::Disconnected),
    }
}

/// Run `source` on a spawned task and return the SSE body its frames
/// arrive on.
pub fn spawn_sse_run(
    mut seq: RunSequencer,
    mut source: Box<dyn TextSource>,
    pacing: Pacing,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) -> SseBody {
    let (sink, body) = sse_channel(SSE_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let run = stream_text(&mut seq, source.as_mut(), pacing, &sink, &cancel);
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    seq.abort();
                    RunOutcome::Aborted(AbortReason::TimedOut)
                }
            },
            None => run.await,
        };

        let run_id = seq.run_id().unwrap_or_default().to_string();
        match outcome {
            RunOutcome::Finished => info!(
                run_id = %run_id,
                thread_id = %seq.thread_id(),
                messages = seq.message_count(),
                "run finished"
            ),
            RunOutcome::Aborted(reason) => debug!(
                run_id = %run_id,
                thread_id = %seq.thread_id(),
                reason = %reason,
                "run aborted"
            ),
        }
    });
    body
}
