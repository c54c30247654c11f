use std::sync::Mutex;

use pailflow_core::types::{BotId, BotSession, BotSessionStatus, Insights, QaPair, WorkflowThreadId};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::fields::FieldCrypto;

const SELECT_COLUMNS: &str = "bot_id, status, started_at, completed_at, bot_config,
     transcript_text, qa_pairs, insights, error";

/// Thread-safe manager for the legacy per-bot mirror row (spec.md §3
/// `BotSession`), kept alongside `workflow_threads` for callers still keyed
/// on `bot_id`.
pub struct BotSessionStore {
    db: Mutex<Connection>,
    crypto: FieldCrypto,
}

impl BotSessionStore {
    pub fn new(conn: Connection, crypto: FieldCrypto) -> Self {
        Self {
            db: Mutex::new(conn),
            crypto,
        }
    }

    #[instrument(skip(self), fields(bot_id = %bot_id, workflow_thread_id = %thread_id))]
    pub fn create(&self, bot_id: &BotId, thread_id: &WorkflowThreadId) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO bot_sessions (bot_id, workflow_thread_id, status, started_at)
             VALUES (?1, ?2, 'running', ?3)",
            params![bot_id.as_str(), thread_id.as_str(), now],
        )?;
        Ok(())
    }

    #[instrument(skip(self), fields(bot_id = %bot_id))]
    pub fn get(&self, bot_id: &BotId) -> Result<Option<BotSession>> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM bot_sessions WHERE bot_id = ?1"),
                params![bot_id.as_str()],
                row_to_session,
            )
            .optional()?;
        row.map(|r| self.open(r)).transpose()
    }

    #[instrument(skip(self, session), fields(bot_id = %session.bot_id))]
    pub fn complete(&self, session: &BotSession) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE bot_sessions SET
                status = ?2, completed_at = ?3, transcript_text = ?4, qa_pairs = ?5,
                insights = ?6, error = ?7
             WHERE bot_id = ?1",
            params![
                session.bot_id.as_str(),
                session.status.to_string(),
                session.completed_at,
                self.crypto.seal_opt(session.transcript_text.as_deref())?,
                serde_json::to_string(&session.qa_pairs)?,
                session
                    .insights
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                session.error,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::BotSessionNotFound(session.bot_id.to_string()));
        }
        Ok(())
    }

    fn open(&self, row: RawRow) -> Result<BotSession> {
        Ok(BotSession {
            bot_id: row.bot_id,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            bot_config: serde_json::from_str(&row.bot_config)?,
            transcript_text: self.crypto.open_opt(row.transcript_text)?,
            qa_pairs: serde_json::from_str::<Vec<QaPair>>(&row.qa_pairs)?,
            insights: row
                .insights
                .map(|s| serde_json::from_str::<Insights>(&s))
                .transpose()?,
            error: row.error,
        })
    }
}

struct RawRow {
    bot_id: BotId,
    status: BotSessionStatus,
    started_at: String,
    completed_at: Option<String>,
    bot_config: String,
    transcript_text: Option<String>,
    qa_pairs: String,
    insights: Option<String>,
    error: Option<String>,
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    use std::str::FromStr;
    Ok(RawRow {
        bot_id: BotId::from(row.get::<_, String>(0)?),
        status: BotSessionStatus::from_str(&row.get::<_, String>(1)?)
            .unwrap_or(BotSessionStatus::Running),
        started_at: row.get(2)?,
        completed_at: row.get(3)?,
        bot_config: row.get(4)?,
        transcript_text: row.get(5)?,
        qa_pairs: row.get(6)?,
        insights: row.get(7)?,
        error: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_db;
    use pailflow_core::types::WorkflowThread;

    #[test]
    fn create_then_get_roundtrips() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let thread = WorkflowThread::new("room", "https://meet.example/room");
        conn.execute(
            "INSERT INTO workflow_threads (workflow_thread_id, room_name, room_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))",
            params![thread.workflow_thread_id.as_str(), thread.room_name, thread.room_url],
        )
        .unwrap();

        let store = BotSessionStore::new(conn, FieldCrypto::disabled());
        let bot_id = BotId::new();
        store.create(&bot_id, &thread.workflow_thread_id).unwrap();

        let fetched = store.get(&bot_id).unwrap().unwrap();
        assert_eq!(fetched.bot_id, bot_id);
        assert_eq!(fetched.status, BotSessionStatus::Running);
    }

    #[test]
    fn complete_updates_status_and_fields() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let thread = WorkflowThread::new("room", "https://meet.example/room");
        conn.execute(
            "INSERT INTO workflow_threads (workflow_thread_id, room_name, room_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))",
            params![thread.workflow_thread_id.as_str(), thread.room_name, thread.room_url],
        )
        .unwrap();

        let store = BotSessionStore::new(conn, FieldCrypto::disabled());
        let bot_id = BotId::new();
        store.create(&bot_id, &thread.workflow_thread_id).unwrap();

        let mut session = store.get(&bot_id).unwrap().unwrap();
        session.status = BotSessionStatus::Completed;
        session.completed_at = Some(chrono::Utc::now().to_rfc3339());
        session.transcript_text = Some("full transcript".to_string());
        store.complete(&session).unwrap();

        let fetched = store.get(&bot_id).unwrap().unwrap();
        assert_eq!(fetched.status, BotSessionStatus::Completed);
        assert_eq!(fetched.transcript_text.as_deref(), Some("full transcript"));
    }
}
