use std::collections::HashMap;
use std::sync::Mutex;

use pailflow_core::types::{CheckpointId, WorkflowThreadId};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{instrument, warn};

use crate::error::Result;

/// A serialized workflow graph state, opaque to the store (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct CheckpointRecord {
    pub checkpoint_id: CheckpointId,
    pub workflow_thread_id: WorkflowThreadId,
    pub state: serde_json::Value,
    pub created_at: String,
}

/// Persists and retrieves workflow checkpoints for pause/resume across
/// process restarts (spec.md §4.3 "Durable Workflow Engine").
pub trait CheckpointStore: Send + Sync {
    fn save(&self, thread_id: &WorkflowThreadId, state: serde_json::Value) -> Result<CheckpointId>;
    fn latest(&self, thread_id: &WorkflowThreadId) -> Result<Option<CheckpointRecord>>;
}

/// SQLite-backed checkpointer — one row per save, latest-by-timestamp wins.
pub struct SqliteCheckpointStore {
    db: Mutex<Connection>,
}

impl SqliteCheckpointStore {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    #[instrument(skip(self, state), fields(workflow_thread_id = %thread_id))]
    fn save(&self, thread_id: &WorkflowThreadId, state: serde_json::Value) -> Result<CheckpointId> {
        let checkpoint_id = CheckpointId::new();
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO checkpoints (checkpoint_id, workflow_thread_id, state, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                checkpoint_id.to_string(),
                thread_id.as_str(),
                serde_json::to_string(&state)?,
                now,
            ],
        )?;
        Ok(checkpoint_id)
    }

    #[instrument(skip(self), fields(workflow_thread_id = %thread_id))]
    fn latest(&self, thread_id: &WorkflowThreadId) -> Result<Option<CheckpointRecord>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT checkpoint_id, workflow_thread_id, state, created_at FROM checkpoints
             WHERE workflow_thread_id = ?1 ORDER BY created_at DESC LIMIT 1",
            params![thread_id.as_str()],
            |row| {
                let state_str: String = row.get(2)?;
                Ok(CheckpointRecord {
                    checkpoint_id: CheckpointId::from(row.get::<_, String>(0)?),
                    workflow_thread_id: WorkflowThreadId::from(row.get::<_, String>(1)?),
                    state: serde_json::from_str(&state_str).unwrap_or(serde_json::Value::Null),
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }
}

/// Process-memory fallback used when no durable database is configured.
/// Checkpoints do not survive a restart — a startup warning is logged so
/// the gap is visible in production rather than discovered during an
/// incident (spec.md §9 "Open Question: checkpointer backend").
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    records: Mutex<HashMap<String, CheckpointRecord>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        warn!("using in-memory checkpoint store — checkpoints will not survive a restart");
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&self, thread_id: &WorkflowThreadId, state: serde_json::Value) -> Result<CheckpointId> {
        let checkpoint_id = CheckpointId::new();
        let record = CheckpointRecord {
            checkpoint_id: checkpoint_id.clone(),
            workflow_thread_id: thread_id.clone(),
            state,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.records
            .lock()
            .unwrap()
            .insert(thread_id.as_str().to_string(), record);
        Ok(checkpoint_id)
    }

    fn latest(&self, thread_id: &WorkflowThreadId) -> Result<Option<CheckpointRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(thread_id.as_str())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_db;
    use pailflow_core::types::WorkflowThread;

    #[test]
    fn sqlite_checkpoint_round_trips_latest() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let thread = WorkflowThread::new("room", "https://meet.example/room");
        conn.execute(
            "INSERT INTO workflow_threads (workflow_thread_id, room_name, room_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))",
            params![thread.workflow_thread_id.as_str(), thread.room_name, thread.room_url],
        )
        .unwrap();

        let store = SqliteCheckpointStore::new(conn);
        store
            .save(&thread.workflow_thread_id, serde_json::json!({"step": 1}))
            .unwrap();
        store
            .save(&thread.workflow_thread_id, serde_json::json!({"step": 2}))
            .unwrap();

        let latest = store.latest(&thread.workflow_thread_id).unwrap().unwrap();
        assert_eq!(latest.state, serde_json::json!({"step": 2}));
    }

    #[test]
    fn in_memory_checkpoint_round_trips() {
        let store = InMemoryCheckpointStore::new();
        let thread_id = WorkflowThreadId::new();
        store
            .save(&thread_id, serde_json::json!({"node": "join_bot"}))
            .unwrap();
        let latest = store.latest(&thread_id).unwrap().unwrap();
        assert_eq!(latest.state, serde_json::json!({"node": "join_bot"}));
    }

    #[test]
    fn missing_checkpoint_returns_none() {
        let store = InMemoryCheckpointStore::new();
        let thread_id = WorkflowThreadId::new();
        assert!(store.latest(&thread_id).unwrap().is_none());
    }
}
