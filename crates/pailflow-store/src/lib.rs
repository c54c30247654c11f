mod bot_sessions;
mod checkpoints;
mod error;
mod fields;
mod schema;
mod workflow_threads;

pub use bot_sessions::BotSessionStore;
pub use checkpoints::{
    CheckpointRecord, CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore,
};
pub use error::{Result, StoreError};
pub use fields::FieldCrypto;
pub use schema::init_db;
pub use workflow_threads::WorkflowThreadStore;

use std::sync::Arc;

use rusqlite::Connection;
use tracing::instrument;

/// Bundles every persistence manager this crate owns behind one handle, the
/// way `skynet-gateway::app::AppState` groups its subsystem managers.
pub struct PailflowStore {
    pub workflow_threads: WorkflowThreadStore,
    pub bot_sessions: BotSessionStore,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl PailflowStore {
    /// Opens (and migrates) the SQLite database at `path`, applying
    /// field-level encryption when `encryption_key` is set.
    #[instrument(skip(encryption_key))]
    pub fn open(path: &str, encryption_key: Option<&str>) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let threads_conn = Connection::open(path)?;
        init_db(&threads_conn)?;
        let sessions_conn = Connection::open(path)?;
        let checkpoints_conn = Connection::open(path)?;

        let crypto = FieldCrypto::new(encryption_key);
        Ok(Self {
            workflow_threads: WorkflowThreadStore::new(threads_conn, crypto.clone()),
            bot_sessions: BotSessionStore::new(sessions_conn, crypto),
            checkpoints: Arc::new(SqliteCheckpointStore::new(checkpoints_conn)),
        })
    }

    /// In-memory store for tests — one connection shared by everything
    /// except the checkpointer, which gets its own in-memory fallback since
    /// `:memory:` connections don't share state across handles.
    pub fn open_in_memory(encryption_key: Option<&str>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        let crypto = FieldCrypto::new(encryption_key);
        let sessions_conn = Connection::open_in_memory()?;
        init_db(&sessions_conn)?;
        Ok(Self {
            workflow_threads: WorkflowThreadStore::new(conn, crypto.clone()),
            bot_sessions: BotSessionStore::new(sessions_conn, crypto),
            checkpoints: Arc::new(InMemoryCheckpointStore::new()),
        })
    }
}
