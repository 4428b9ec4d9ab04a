use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use agstream_contract::{ToolCallContext, ToolResult};

use crate::protocol;
use crate::service::ApiError;

pub use crate::service::AppState;

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Tool invocation against one thread's state.
pub const THREAD_TOOL_CALLS_PATH: &str = "/v1/threads/:thread_id/tool-calls";
/// Read-only view of one thread's todo list.
pub const THREAD_TODOS_PATH: &str = "/v1/threads/:thread_id/todos";
/// Descriptors of the registered tools.
pub const TOOLS_PATH: &str = "/v1/tools";

/// Build health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route(HEALTH_PATH, get(health))
}

/// Build thread routes: tool calls and todo reads.
pub fn thread_routes() -> Router<AppState> {
    Router::new()
        .route(THREAD_TOOL_CALLS_PATH, post(call_tool))
        .route(THREAD_TODOS_PATH, get(get_todos))
}

/// Build the tool catalog route.
pub fn tool_routes() -> Router<AppState> {
    Router::new().route(TOOLS_PATH, get(list_tools))
}

/// Full application router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(thread_routes())
        .merge(tool_routes())
        .nest("/v1/ag-ui", protocol::ag_ui::http::routes())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn list_tools(State(st): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": st.tools.descriptors() }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallRequest {
    tool_call_id: String,
    tool_name: String,
    #[serde(default)]
    args: Value,
}

async fn call_tool(
    State(st): State<AppState>,
    Path(thread_id): Path<String>,
    Json(req): Json<ToolCallRequest>,
) -> Result<Json<ToolResult>, ApiError> {
    if req.tool_call_id.trim().is_empty() {
        return Err(ApiError::BadRequest("toolCallId must not be empty".into()));
    }
    let tool = st
        .tools
        .get(&req.tool_name)
        .ok_or_else(|| ApiError::ToolNotFound(req.tool_name.clone()))?;

    debug!(
        thread_id = %thread_id,
        tool_call_id = %req.tool_call_id,
        tool = %req.tool_name,
        "executing tool call"
    );
    let ctx = ToolCallContext::new(&thread_id, &req.tool_call_id);
    let result = tool.execute(req.args, &ctx).await?;
    Ok(Json(result))
}

async fn get_todos(
    State(st): State<AppState>,
    Path(thread_id): Path<String>,
) -> Json<Value> {
    let todos = st.todos.get(&thread_id).await;
    Json(json!({ "threadId": thread_id, "todos": todos }))
}
