use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::error::Result;

/// Append-only ledger row that charges the customer for one completed bot
/// call (spec.md §3 `UsageTransaction`).
#[derive(Debug, Clone)]
pub struct UsageTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub duration_s: i64,
    pub lpl_cost: Option<f64>,
    pub workflow_thread_id: String,
    pub bot_id: Option<String>,
    pub room_name: String,
}

/// Thread-safe manager for `usage_transactions`. A unique constraint on
/// `workflow_thread_id` is the application-level dedup key for spec.md
/// §4.7 step 6 — at most one transaction per run.
pub struct TransactionStore {
    db: Mutex<Connection>,
}

impl TransactionStore {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS usage_transactions (
                id                  TEXT PRIMARY KEY NOT NULL,
                user_id             TEXT NOT NULL,
                amount              REAL NOT NULL,
                type                TEXT NOT NULL DEFAULT 'usage_burn',
                duration            INTEGER NOT NULL,
                lpl_cost            REAL,
                workflow_thread_id  TEXT NOT NULL UNIQUE,
                bot_id              TEXT,
                room_name           TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    #[instrument(skip(self, txn), fields(workflow_thread_id = %txn.workflow_thread_id))]
    pub fn insert_if_absent(&self, txn: &UsageTransaction) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "INSERT OR IGNORE INTO usage_transactions
                (id, user_id, amount, type, duration, lpl_cost, workflow_thread_id, bot_id,
                 room_name, created_at)
             VALUES (?1, ?2, ?3, 'usage_burn', ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                txn.id,
                txn.user_id,
                txn.amount,
                txn.duration_s,
                txn.lpl_cost,
                txn.workflow_thread_id,
                txn.bot_id,
                txn.room_name,
                now,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn exists_for_thread(&self, workflow_thread_id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let found: Option<String> = db
            .query_row(
                "SELECT id FROM usage_transactions WHERE workflow_thread_id = ?1",
                params![workflow_thread_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(thread_id: &str) -> UsageTransaction {
        UsageTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "user-1".to_string(),
            amount: -0.15,
            duration_s: 60,
            lpl_cost: Some(0.02),
            workflow_thread_id: thread_id.to_string(),
            bot_id: None,
            room_name: "room-1".to_string(),
        }
    }

    #[test]
    fn insert_then_duplicate_is_no_op() {
        let store = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let txn = sample("thread-1");
        assert!(store.insert_if_absent(&txn).unwrap());
        assert!(!store.insert_if_absent(&txn).unwrap());
        assert!(store.exists_for_thread("thread-1").unwrap());
    }
}
