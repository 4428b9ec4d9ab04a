use crate::todo::Todo;
use agstream_contract::{IdGenerator, ToolMessage};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Confirmation text sent back for every accepted update.
pub const UPDATE_ACK: &str = "Successfully updated todos";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    /// Two proposed items share one id; nothing is applied.
    #[error("duplicate todo id: {0}")]
    DuplicateId(String),
}

/// How the accepted list relates to the one it replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Items whose id was not in the previous list (including assigned ids).
    pub created: usize,
    /// Items replacing a previous item with the same id.
    pub replaced: usize,
    /// Previous items absent from the new list.
    pub removed: usize,
}

/// Accepted list plus the acknowledgment for the triggering tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoUpdate {
    pub todos: Vec<Todo>,
    pub ack: ToolMessage,
    pub summary: MergeSummary,
}

/// Reconcile `proposed` against `current`.
///
/// Items without an id get a fresh one from `ids`; the resulting list
/// replaces `current` wholesale (items are full replacements, never field
/// patches). `current` is only read, to compute the summary.
pub fn merge(
    current: &[Todo],
    proposed: Vec<Todo>,
    tool_call_id: &str,
    ids: &dyn IdGenerator,
) -> Result<TodoUpdate, TodoError> {
    let todos: Vec<Todo> = proposed
        .into_iter()
        .map(|mut todo| {
            if !todo.has_id() {
                todo.id = ids.next_id();
            }
            todo
        })
        .collect();

    let mut seen = HashSet::with_capacity(todos.len());
    for todo in &todos {
        if !seen.insert(todo.id.as_str()) {
            return Err(TodoError::DuplicateId(todo.id.clone()));
        }
    }

    let previous: HashSet<&str> = current.iter().map(|t| t.id.as_str()).collect();
    let replaced = todos
        .iter()
        .filter(|t| previous.contains(t.id.as_str()))
        .count();
    let summary = MergeSummary {
        created: todos.len() - replaced,
        replaced,
        removed: previous.iter().filter(|id| !seen.contains(*id)).count(),
    };

    Ok(TodoUpdate {
        todos,
        ack: ToolMessage::new(UPDATE_ACK, tool_call_id),
        summary,
    })
}

/// Read-only view of the current list.
pub fn get(current: &[Todo]) -> Vec<Todo> {
    current.to_vec()
}
