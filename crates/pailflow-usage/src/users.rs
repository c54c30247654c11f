use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::error::Result;

/// A billable account, indexed by the external `unkeyId` carried on
/// requests (spec.md §3 `User`).
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub unkey_id: String,
    pub credit_balance: f64,
}

/// Thread-safe manager for the `users` table, following
/// `skynet-users::db::create_users_table`'s `CREATE TABLE IF NOT EXISTS` +
/// doc-commented index convention.
pub struct UserStore {
    db: Mutex<Connection>,
}

impl UserStore {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id              TEXT PRIMARY KEY NOT NULL,
                unkey_id        TEXT NOT NULL UNIQUE,
                credit_balance  REAL NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_unkey_id ON users (unkey_id);",
        )?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    #[instrument(skip(self))]
    pub fn create(&self, unkey_id: &str, credit_balance: f64) -> Result<User> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO users (id, unkey_id, credit_balance, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, unkey_id, credit_balance, now],
        )?;
        Ok(User {
            id,
            unkey_id: unkey_id.to_string(),
            credit_balance,
        })
    }

    #[instrument(skip(self))]
    pub fn get_by_unkey_id(&self, unkey_id: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, unkey_id, credit_balance FROM users WHERE unkey_id = ?1",
            params![unkey_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    unkey_id: row.get(1)?,
                    credit_balance: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Subtracts `amount` from `user_id`'s balance. Negative resulting
    /// balances are allowed (spec.md §4.7 step 5) — the caller is
    /// responsible for logging the warning.
    #[instrument(skip(self))]
    pub fn debit(&self, user_id: &str, amount: f64) -> Result<f64> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE users SET credit_balance = credit_balance - ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, amount, now],
        )?;
        db.query_row(
            "SELECT credit_balance FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_by_unkey_id() {
        let store = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        store.create("unkey-1", 5.0).unwrap();
        let user = store.get_by_unkey_id("unkey-1").unwrap().unwrap();
        assert_eq!(user.credit_balance, 5.0);
    }

    #[test]
    fn debit_allows_negative_balance() {
        let store = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let user = store.create("unkey-2", 0.10).unwrap();
        let balance = store.debit(&user.id, 0.15).unwrap();
        assert!((balance - (-0.05)).abs() < 1e-9);
    }

    #[test]
    fn missing_user_returns_none() {
        let store = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        assert!(store.get_by_unkey_id("nope").unwrap().is_none());
    }
}
