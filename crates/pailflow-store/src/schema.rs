use rusqlite::Connection;

use crate::error::Result;

/// Initialise all tables owned by this crate. Safe to call on every
/// startup — `CREATE TABLE IF NOT EXISTS` keeps it idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_workflow_threads_table(conn)?;
    create_bot_sessions_table(conn)?;
    create_checkpoints_table(conn)?;
    Ok(())
}

fn create_workflow_threads_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS workflow_threads (
            workflow_thread_id              TEXT PRIMARY KEY NOT NULL,
            room_name                       TEXT NOT NULL,
            room_url                        TEXT NOT NULL,
            bot_id                          TEXT,
            bot_config                      TEXT NOT NULL DEFAULT '{}',
            bot_enabled                     INTEGER NOT NULL DEFAULT 0,
            meeting_status                  TEXT NOT NULL DEFAULT 'in_progress',
            meeting_start_time              TEXT,
            meeting_end_time                TEXT,
            bot_join_time                   TEXT,
            bot_leave_time                  TEXT,
            bot_duration_s                  INTEGER,
            transcript_text                 TEXT,
            transcript_processed            INTEGER NOT NULL DEFAULT 0,
            email_sent                      INTEGER NOT NULL DEFAULT 0,
            webhook_sent                    INTEGER NOT NULL DEFAULT 0,
            candidate_summary               TEXT,
            insights                        TEXT,
            qa_pairs                        TEXT NOT NULL DEFAULT '[]',
            webhook_callback_url            TEXT,
            email_results_to                TEXT,
            workflow_paused                 INTEGER NOT NULL DEFAULT 0,
            waiting_for_meeting_ended       INTEGER NOT NULL DEFAULT 0,
            waiting_for_transcript_webhook  INTEGER NOT NULL DEFAULT 0,
            checkpoint_id                   TEXT,
            usage_stats                     TEXT NOT NULL DEFAULT '{\"total_cost_usd\":0.0}',
            unkey_key_id                    TEXT,
            metadata                        TEXT NOT NULL DEFAULT '{}',
            created_at                      TEXT NOT NULL,
            updated_at                      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_workflow_threads_room
            ON workflow_threads (room_name);",
    )?;
    Ok(())
}

fn create_bot_sessions_table(conn: &Connection) -> Result<()> {
    // Legacy per-bot mirror row, kept alongside workflow_threads for
    // callers still keyed on bot_id (spec.md §3 "BotSession").
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bot_sessions (
            bot_id              TEXT PRIMARY KEY NOT NULL,
            workflow_thread_id  TEXT NOT NULL REFERENCES workflow_threads(workflow_thread_id),
            status              TEXT NOT NULL DEFAULT 'running',
            started_at          TEXT NOT NULL,
            completed_at        TEXT,
            bot_config          TEXT NOT NULL DEFAULT '{}',
            transcript_text     TEXT,
            qa_pairs            TEXT NOT NULL DEFAULT '[]',
            insights            TEXT,
            error               TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_bot_sessions_thread
            ON bot_sessions (workflow_thread_id);",
    )?;
    Ok(())
}

fn create_checkpoints_table(conn: &Connection) -> Result<()> {
    // One row per checkpoint write; resume reads the latest row for the thread.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS checkpoints (
            checkpoint_id       TEXT PRIMARY KEY NOT NULL,
            workflow_thread_id  TEXT NOT NULL REFERENCES workflow_threads(workflow_thread_id),
            state               TEXT NOT NULL,
            created_at          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_checkpoints_thread
            ON checkpoints (workflow_thread_id, created_at);",
    )?;
    Ok(())
}
