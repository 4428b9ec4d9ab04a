use agstream_contract::{
    Clock, IdGenerator, Pacing, SystemClock, ToolError, ToolRegistry, ToolRegistryError,
    UuidIdGenerator,
};
use agstream_todo::{GetTodosTool, ManageTodosTool, TodoStore};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{AgentSpec, Config};

/// Everything a request handler needs, assembled once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub agents: Arc<HashMap<String, AgentSpec>>,
    pub tools: Arc<ToolRegistry>,
    pub todos: Arc<TodoStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    /// Upper bound on a single run; the run is aborted when it elapses.
    pub run_timeout: Option<Duration>,
    /// When set, replaces every agent's own chunk delay.
    pub pacing_override: Option<Pacing>,
    /// Cancelled on server shutdown; in-flight runs are aborted.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ToolRegistryError> {
        let todos = Arc::new(TodoStore::new(ids.clone()));
        let tools = ToolRegistry::builder()
            .with_tool(Arc::new(ManageTodosTool::new(todos.clone())))
            .with_tool(Arc::new(GetTodosTool::new(todos.clone())))
            .build()?;
        Ok(Self {
            agents: Arc::new(config.into_agent_map()),
            tools: Arc::new(tools),
            todos,
            ids,
            clock,
            run_timeout: None,
            pacing_override: None,
            shutdown: CancellationToken::new(),
        })
    }

    /// State with UUID identifiers and the system clock.
    pub fn from_config(config: Config) -> Result<Self, ToolRegistryError> {
        Self::new(config, Arc::new(UuidIdGenerator), Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_pacing_override(mut self, pacing: Option<Pacing>) -> Self {
        self.pacing_override = pacing;
        self
    }

    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn agent(&self, agent_id: &str) -> Result<&AgentSpec, ApiError> {
        self.agents
            .get(agent_id)
            .ok_or_else(|| ApiError::AgentNotFound(agent_id.to_string()))
    }

    pub fn pacing_for(&self, agent: &AgentSpec) -> Pacing {
        self.pacing_override
            .or_else(|| agent.chunk_delay_ms.map(Pacing::from_millis))
            .unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self {
            ApiError::AgentNotFound(_) | ApiError::ToolNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (code, body).into_response()
    }
}

impl From<ToolError> for ApiError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::InvalidArguments(msg) => ApiError::BadRequest(msg),
            ToolError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}
