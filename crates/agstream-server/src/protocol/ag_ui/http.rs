use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tracing::debug;

use agstream_contract::WordChunks;
use agstream_protocol_ag_ui::RunSequencer;

use crate::service::{ApiError, AppState};
use crate::transport::http_run::spawn_sse_run;

const RUN_PATH: &str = "/agents/:agent_id/runs";

/// Build AG-UI HTTP routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(RUN_PATH, post(run))
}

/// Optional run input. An empty request body is accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    #[serde(default)]
    thread_id: Option<String>,
}

impl RunRequest {
    fn parse(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

async fn run(
    State(st): State<AppState>,
    Path(agent_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let agent = st.agent(&agent_id)?;
    let req = RunRequest::parse(&body)?;

    let thread_id = req
        .thread_id
        .filter(|t| !t.is_empty())
        .or_else(|| agent.thread_id.clone());
    let seq = RunSequencer::new(thread_id, st.ids.clone(), st.clock.clone());
    debug!(agent_id = %agent_id, thread_id = %seq.thread_id(), "starting run");

    let sse = spawn_sse_run(
        seq,
        Box::new(WordChunks::new(&agent.text)),
        st.pacing_for(agent),
        st.run_timeout,
        st.shutdown.child_token(),
    );
    Ok(sse.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_uses_defaults() {
        assert!(RunRequest::parse(b"").unwrap().thread_id.is_none());
        assert!(RunRequest::parse(b" \n").unwrap().thread_id.is_none());
    }

    #[test]
    fn thread_id_is_read_from_camel_case_body() {
        let req = RunRequest::parse(br#"{"threadId": "t-9"}"#).unwrap();
        assert_eq!(req.thread_id.as_deref(), Some("t-9"));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        assert!(matches!(
            RunRequest::parse(b"{not json"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
