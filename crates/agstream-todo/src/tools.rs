use crate::reducer::TodoError;
use crate::store::TodoStore;
use crate::todo::Todo;
use agstream_contract::{Tool, ToolCallContext, ToolDescriptor, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const MANAGE_TODOS_TOOL: &str = "manage_todos";
pub const GET_TODOS_TOOL: &str = "get_todos";

fn todo_item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "description": "Existing id; omit for new items" },
            "title": { "type": "string" },
            "description": { "type": "string" },
            "emoji": { "type": "string" },
            "status": { "type": "string", "enum": ["pending", "completed"] }
        },
        "required": ["title"]
    })
}

/// Replaces the thread's todo list with the complete desired list.
pub struct ManageTodosTool {
    store: Arc<TodoStore>,
}

impl ManageTodosTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ManageTodosTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            MANAGE_TODOS_TOOL,
            "Manage Todos",
            "Manage the current todos. Send the complete list; items without an id are created.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "todos": { "type": "array", "items": todo_item_schema() }
            },
            "required": ["todos"]
        }))
    }

    async fn execute(
        &self,
        args: Value,
        ctx: &ToolCallContext<'_>,
    ) -> Result<ToolResult, ToolError> {
        let raw = args
            .get("todos")
            .cloned()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'todos'".into()))?;
        let proposed: Vec<Todo> =
            serde_json::from_value(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let update = self
            .store
            .apply(ctx.thread_id, proposed, ctx.tool_call_id)
            .await
            .map_err(ToolError::from)?;

        Ok(ToolResult::success_with_message(
            MANAGE_TODOS_TOOL,
            json!({
                "todos": update.todos,
                "summary": update.summary,
                "message": update.ack,
            }),
            update.ack.content.clone(),
        ))
    }
}

/// Returns the thread's todo list unchanged.
pub struct GetTodosTool {
    store: Arc<TodoStore>,
}

impl GetTodosTool {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetTodosTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(GET_TODOS_TOOL, "Get Todos", "Get the current todos.")
    }

    async fn execute(
        &self,
        _args: Value,
        ctx: &ToolCallContext<'_>,
    ) -> Result<ToolResult, ToolError> {
        let todos = self.store.get(ctx.thread_id).await;
        Ok(ToolResult::success(GET_TODOS_TOOL, json!({ "todos": todos })))
    }
}

impl From<TodoError> for ToolError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::DuplicateId(_) => ToolError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agstream_contract::testing::SequentialIdGenerator;
    use agstream_contract::ToolStatus;

    fn store() -> Arc<TodoStore> {
        Arc::new(TodoStore::new(Arc::new(SequentialIdGenerator::new("todo"))))
    }

    #[tokio::test]
    async fn manage_todos_returns_ack_and_list() {
        let store = store();
        let tool = ManageTodosTool::new(store.clone());
        let ctx = ToolCallContext::new("thread-1", "call_1");
        let result = tool
            .execute(json!({"todos": [{"title": "Write docs", "emoji": "📝"}]}), &ctx)
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::Success);
        assert_eq!(result.message.as_deref(), Some("Successfully updated todos"));
        assert_eq!(result.data["message"]["toolCallId"], "call_1");
        assert_eq!(result.data["todos"][0]["id"], "todo-1");
        assert_eq!(result.data["todos"][0]["status"], "pending");
        assert_eq!(store.get("thread-1").await.len(), 1);
    }

    #[tokio::test]
    async fn manage_todos_requires_todos_array() {
        let tool = ManageTodosTool::new(store());
        let ctx = ToolCallContext::new("t", "c");
        let err = tool.execute(json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        let err = tool
            .execute(json!({"todos": [{"status": "later"}]}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn null_id_is_treated_as_new_item() {
        let store = store();
        let tool = ManageTodosTool::new(store.clone());
        let ctx = ToolCallContext::new("t", "c");
        let result = tool
            .execute(json!({"todos": [{"id": null, "title": "A"}]}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.data["todos"][0]["id"], "todo-1");
        assert_eq!(result.data["summary"]["created"], 1);
    }

    #[tokio::test]
    async fn malformed_todos_report_serde_error_once() {
        let tool = ManageTodosTool::new(store());
        let ctx = ToolCallContext::new("t", "c");
        let err = tool
            .execute(json!({"todos": "nope"}), &ctx)
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Invalid arguments: invalid type"), "{text}");
        assert_eq!(text.matches("nvalid arguments").count(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_map_to_conflict() {
        let tool = ManageTodosTool::new(store());
        let ctx = ToolCallContext::new("t", "c");
        let err = tool
            .execute(
                json!({"todos": [{"id": "1", "title": "A"}, {"id": "1", "title": "B"}]}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_todos_reads_current_list() {
        let store = store();
        let ctx = ToolCallContext::new("t", "c");
        ManageTodosTool::new(store.clone())
            .execute(json!({"todos": [{"title": "A"}]}), &ctx)
            .await
            .unwrap();
        let result = GetTodosTool::new(store).execute(json!({}), &ctx).await.unwrap();
        assert_eq!(result.data["todos"][0]["title"], "A");
    }
}
