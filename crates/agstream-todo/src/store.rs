use crate::reducer::{self, TodoError, TodoUpdate};
use crate::todo::Todo;
use agstream_contract::{IdGenerator, UuidIdGenerator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type Session = Arc<Mutex<Vec<Todo>>>;

/// Todo lists keyed by thread id.
///
/// Updates against one thread are serialized by that thread's lock, so a
/// merge always reads the state produced by the previous one.
pub struct TodoStore {
    sessions: RwLock<HashMap<String, Session>>,
    ids: Arc<dyn IdGenerator>,
}

impl TodoStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ids,
        }
    }

    async fn existing_session(&self, thread_id: &str) -> Option<Session> {
        self.sessions.read().await.get(thread_id).cloned()
    }

    async fn session_or_create(&self, thread_id: &str) -> Session {
        if let Some(session) = self.existing_session(thread_id).await {
            return session;
        }
        self.sessions
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }

    /// Snapshot of a thread's list; empty for unknown threads. Reading never
    /// creates a session.
    pub async fn get(&self, thread_id: &str) -> Vec<Todo> {
        let Some(session) = self.existing_session(thread_id).await else {
            return Vec::new();
        };
        let todos = session.lock().await;
        reducer::get(&todos)
    }

    /// Merge `proposed` into the thread's list and store the result. On
    /// error the stored list is left untouched.
    pub async fn apply(
        &self,
        thread_id: &str,
        proposed: Vec<Todo>,
        tool_call_id: &str,
    ) -> Result<TodoUpdate, TodoError> {
        let session = self.session_or_create(thread_id).await;
        let mut todos = session.lock().await;
        let update = reducer::merge(&todos, proposed, tool_call_id, self.ids.as_ref())?;
        *todos = update.todos.clone();
        debug!(
            thread_id,
            tool_call_id,
            count = todos.len(),
            created = update.summary.created,
            removed = update.summary.removed,
            "todos updated"
        );
        Ok(update)
    }
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new(Arc::new(UuidIdGenerator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agstream_contract::testing::SequentialIdGenerator;

    fn store() -> TodoStore {
        TodoStore::new(Arc::new(SequentialIdGenerator::new("todo")))
    }

    #[tokio::test]
    async fn unknown_thread_is_empty() {
        assert!(store().get("nope").await.is_empty());
    }

    #[tokio::test]
    async fn reads_do_not_create_sessions() {
        let store = store();
        for i in 0..100 {
            assert!(store.get(&format!("never-written-{i}")).await.is_empty());
        }
        assert_eq!(store.sessions.read().await.len(), 0);

        store.apply("t1", vec![Todo::new("A")], "c1").await.unwrap();
        assert_eq!(store.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn apply_replaces_stored_list() {
        let store = store();
        store
            .apply("t1", vec![Todo::new("A"), Todo::new("B")], "c1")
            .await
            .unwrap();
        let update = store
            .apply("t1", vec![Todo::new("A*").with_id("todo-1")], "c2")
            .await
            .unwrap();
        assert_eq!(update.summary.removed, 1);
        let todos = store.get("t1").await;
        assert_eq!(todos, vec![Todo::new("A*").with_id("todo-1")]);
    }

    #[tokio::test]
    async fn rejected_update_leaves_state_unchanged() {
        let store = store();
        store.apply("t1", vec![Todo::new("A")], "c1").await.unwrap();
        let before = store.get("t1").await;
        let err = store
            .apply(
                "t1",
                vec![Todo::new("X").with_id("dup"), Todo::new("Y").with_id("dup")],
                "c2",
            )
            .await
            .unwrap_err();
        assert_eq!(err, TodoError::DuplicateId("dup".into()));
        assert_eq!(store.get("t1").await, before);
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let store = store();
        store.apply("t1", vec![Todo::new("A")], "c1").await.unwrap();
        assert!(store.get("t2").await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_updates_on_one_thread_are_serialized() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut todos = store.get("t1").await;
                todos.push(Todo::new(format!("item {i}")));
                store.apply("t1", todos, &format!("call_{i}")).await
            }));
        }
        for handle in handles {
            // A stale read may race and drop items, but every accepted
            // state must be internally consistent.
            handle.await.unwrap().unwrap();
        }
        let todos = store.get("t1").await;
        let ids: std::collections::HashSet<&str> = todos.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), todos.len());
        assert!(!todos.is_empty());
    }
}
