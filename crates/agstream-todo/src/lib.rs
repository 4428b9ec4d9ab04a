//! Shared todo list state mutated by agent tools.
//!
//! [`merge`] is the pure reducer; [`TodoStore`] serializes updates per
//! thread; [`ManageTodosTool`] and [`GetTodosTool`] expose both to the
//! tool registry.
#![allow(missing_docs)]

mod reducer;
mod store;
mod todo;
mod tools;

pub use reducer::{get, merge, MergeSummary, TodoError, TodoUpdate, UPDATE_ACK};
pub use store::TodoStore;
pub use todo::{Todo, TodoStatus};
pub use tools::{GetTodosTool, ManageTodosTool, GET_TODOS_TOOL, MANAGE_TODOS_TOOL};
