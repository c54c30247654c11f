use std::sync::Mutex;

use pailflow_core::types::{
    BotId, CheckpointId, Insights, MeetingStatus, QaPair, WorkflowThread,
    WorkflowThreadId,
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::fields::FieldCrypto;

const SELECT_COLUMNS: &str = "workflow_thread_id, room_name, room_url, bot_id, bot_config,
     bot_enabled, meeting_status, meeting_start_time, meeting_end_time, bot_join_time,
     bot_leave_time, bot_duration_s, transcript_text, transcript_processed, email_sent,
     webhook_sent, candidate_summary, insights, qa_pairs, webhook_callback_url,
     email_results_to, workflow_paused, waiting_for_meeting_ended,
     waiting_for_transcript_webhook, checkpoint_id, usage_stats, unkey_key_id, metadata,
     created_at, updated_at";

/// Thread-safe manager for `workflow_threads`, the canonical per-run record
/// (spec.md §3). Sensitive columns are sealed with [`FieldCrypto`] before
/// they hit SQLite and opened again on the way out.
pub struct WorkflowThreadStore {
    db: Mutex<Connection>,
    crypto: FieldCrypto,
}

impl WorkflowThreadStore {
    pub fn new(conn: Connection, crypto: FieldCrypto) -> Self {
        Self {
            db: Mutex::new(conn),
            crypto,
        }
    }

    #[instrument(skip(self, thread), fields(workflow_thread_id = %thread.workflow_thread_id))]
    pub fn create(&self, thread: &WorkflowThread) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let row = self.seal(thread)?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO workflow_threads (
                workflow_thread_id, room_name, room_url, bot_id, bot_config, bot_enabled,
                meeting_status, meeting_start_time, meeting_end_time, bot_join_time,
                bot_leave_time, bot_duration_s, transcript_text, transcript_processed,
                email_sent, webhook_sent, candidate_summary, insights, qa_pairs,
                webhook_callback_url, email_results_to, workflow_paused,
                waiting_for_meeting_ended, waiting_for_transcript_webhook, checkpoint_id,
                usage_stats, unkey_key_id, metadata, created_at, updated_at
             ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?29
             )",
            params![
                row.workflow_thread_id.as_str(),
                row.room_name,
                row.room_url,
                row.bot_id.as_ref().map(|b| b.as_str().to_string()),
                row.bot_config,
                row.bot_enabled as i32,
                row.meeting_status.to_string(),
                row.meeting_start_time,
                row.meeting_end_time,
                row.bot_join_time,
                row.bot_leave_time,
                row.bot_duration_s,
                row.transcript_text,
                row.transcript_processed as i32,
                row.email_sent as i32,
                row.webhook_sent as i32,
                row.candidate_summary,
                row.insights,
                row.qa_pairs,
                row.webhook_callback_url,
                row.email_results_to,
                row.workflow_paused as i32,
                row.waiting_for_meeting_ended as i32,
                row.waiting_for_transcript_webhook as i32,
                row.checkpoint_id.as_ref().map(|c| c.to_string()),
                row.usage_stats,
                row.unkey_key_id,
                row.metadata,
                now,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self), fields(workflow_thread_id = %id))]
    pub fn get(&self, id: &WorkflowThreadId) -> Result<Option<WorkflowThread>> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM workflow_threads WHERE workflow_thread_id = ?1"),
                params![id.as_str()],
                row_to_thread,
            )
            .optional()?;
        row.map(|r| self.open(r)).transpose()
    }

    #[instrument(skip(self), fields(room_name))]
    pub fn get_by_room(&self, room_name: &str) -> Result<Option<WorkflowThread>> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM workflow_threads
                     WHERE room_name = ?1 ORDER BY created_at DESC LIMIT 1"
                ),
                params![room_name],
                row_to_thread,
            )
            .optional()?;
        row.map(|r| self.open(r)).transpose()
    }

    /// Full-row update; callers read-modify-write through [`Self::get`].
    #[instrument(skip(self, thread), fields(workflow_thread_id = %thread.workflow_thread_id))]
    pub fn update(&self, thread: &WorkflowThread) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let row = self.seal(thread)?;
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE workflow_threads SET
                room_name = ?2, room_url = ?3, bot_id = ?4, bot_config = ?5,
                bot_enabled = ?6, meeting_status = ?7, meeting_start_time = ?8,
                meeting_end_time = ?9, bot_join_time = ?10, bot_leave_time = ?11,
                bot_duration_s = ?12, transcript_text = ?13, transcript_processed = ?14,
                email_sent = ?15, webhook_sent = ?16, candidate_summary = ?17,
                insights = ?18, qa_pairs = ?19, webhook_callback_url = ?20,
                email_results_to = ?21, workflow_paused = ?22,
                waiting_for_meeting_ended = ?23, waiting_for_transcript_webhook = ?24,
                checkpoint_id = ?25, usage_stats = ?26, unkey_key_id = ?27,
                metadata = ?28, updated_at = ?29
             WHERE workflow_thread_id = ?1",
            params![
                row.workflow_thread_id.as_str(),
                row.room_name,
                row.room_url,
                row.bot_id.as_ref().map(|b| b.as_str().to_string()),
                row.bot_config,
                row.bot_enabled as i32,
                row.meeting_status.to_string(),
                row.meeting_start_time,
                row.meeting_end_time,
                row.bot_join_time,
                row.bot_leave_time,
                row.bot_duration_s,
                row.transcript_text,
                row.transcript_processed as i32,
                row.email_sent as i32,
                row.webhook_sent as i32,
                row.candidate_summary,
                row.insights,
                row.qa_pairs,
                row.webhook_callback_url,
                row.email_results_to,
                row.workflow_paused as i32,
                row.waiting_for_meeting_ended as i32,
                row.waiting_for_transcript_webhook as i32,
                row.checkpoint_id.as_ref().map(|c| c.to_string()),
                row.usage_stats,
                row.unkey_key_id,
                row.metadata,
                now,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::ThreadNotFound(
                thread.workflow_thread_id.to_string(),
            ));
        }
        Ok(())
    }

    /// Every thread currently eligible for the long-running-bot sweep
    /// (spec.md §4.4 "cleanup_long_running_bots" — `bot_enabled` and not
    /// yet completed).
    pub fn list_active(&self) -> Result<Vec<WorkflowThread>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM workflow_threads
             WHERE bot_enabled = 1 AND meeting_status = 'in_progress'"
        ))?;
        let rows = stmt
            .query_map([], row_to_thread)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(db);
        rows.into_iter().map(|r| self.open(r)).collect()
    }

    fn seal(&self, thread: &WorkflowThread) -> Result<SealedRow> {
        Ok(SealedRow {
            workflow_thread_id: thread.workflow_thread_id.clone(),
            room_name: thread.room_name.clone(),
            room_url: thread.room_url.clone(),
            bot_id: thread.bot_id.clone(),
            bot_config: serde_json::to_string(&thread.bot_config)?,
            bot_enabled: thread.bot_enabled,
            meeting_status: thread.meeting_status,
            meeting_start_time: thread.meeting_start_time.clone(),
            meeting_end_time: thread.meeting_end_time.clone(),
            bot_join_time: thread.bot_join_time.clone(),
            bot_leave_time: thread.bot_leave_time.clone(),
            bot_duration_s: thread.bot_duration_s,
            transcript_text: self.crypto.seal_opt(thread.transcript_text.as_deref())?,
            transcript_processed: thread.transcript_processed,
            email_sent: thread.email_sent,
            webhook_sent: thread.webhook_sent,
            candidate_summary: self.crypto.seal_opt(thread.candidate_summary.as_deref())?,
            insights: thread
                .insights
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            qa_pairs: serde_json::to_string(&thread.qa_pairs)?,
            webhook_callback_url: self
                .crypto
                .seal_opt(thread.webhook_callback_url.as_deref())?,
            email_results_to: self.crypto.seal_opt(thread.email_results_to.as_deref())?,
            workflow_paused: thread.workflow_paused,
            waiting_for_meeting_ended: thread.waiting_for_meeting_ended,
            waiting_for_transcript_webhook: thread.waiting_for_transcript_webhook,
            checkpoint_id: thread.checkpoint_id.clone(),
            usage_stats: serde_json::to_string(&thread.usage_stats)?,
            unkey_key_id: thread.unkey_key_id.clone(),
            metadata: serde_json::to_string(&thread.metadata)?,
        })
    }

    fn open(&self, row: RawRow) -> Result<WorkflowThread> {
        Ok(WorkflowThread {
            workflow_thread_id: row.workflow_thread_id,
            room_name: row.room_name,
            room_url: row.room_url,
            bot_id: row.bot_id,
            bot_config: serde_json::from_str(&row.bot_config)?,
            bot_enabled: row.bot_enabled,
            meeting_status: row.meeting_status,
            meeting_start_time: row.meeting_start_time,
            meeting_end_time: row.meeting_end_time,
            bot_join_time: row.bot_join_time,
            bot_leave_time: row.bot_leave_time,
            bot_duration_s: row.bot_duration_s,
            transcript_text: self.crypto.open_opt(row.transcript_text)?,
            transcript_processed: row.transcript_processed,
            email_sent: row.email_sent,
            webhook_sent: row.webhook_sent,
            candidate_summary: self.crypto.open_opt(row.candidate_summary)?,
            insights: row
                .insights
                .map(|s| serde_json::from_str::<Insights>(&s))
                .transpose()?,
            qa_pairs: serde_json::from_str::<Vec<QaPair>>(&row.qa_pairs)?,
            webhook_callback_url: self.crypto.open_opt(row.webhook_callback_url)?,
            email_results_to: self.crypto.open_opt(row.email_results_to)?,
            workflow_paused: row.workflow_paused,
            waiting_for_meeting_ended: row.waiting_for_meeting_ended,
            waiting_for_transcript_webhook: row.waiting_for_transcript_webhook,
            checkpoint_id: row.checkpoint_id,
            usage_stats: serde_json::from_str(&row.usage_stats)?,
            unkey_key_id: row.unkey_key_id,
            metadata: serde_json::from_str(&row.metadata)?,
        })
    }
}

struct SealedRow {
    workflow_thread_id: WorkflowThreadId,
    room_name: String,
    room_url: String,
    bot_id: Option<BotId>,
    bot_config: String,
    bot_enabled: bool,
    meeting_status: MeetingStatus,
    meeting_start_time: Option<String>,
    meeting_end_time: Option<String>,
    bot_join_time: Option<String>,
    bot_leave_time: Option<String>,
    bot_duration_s: Option<i64>,
    transcript_text: Option<String>,
    transcript_processed: bool,
    email_sent: bool,
    webhook_sent: bool,
    candidate_summary: Option<String>,
    insights: Option<String>,
    qa_pairs: String,
    webhook_callback_url: Option<String>,
    email_results_to: Option<String>,
    workflow_paused: bool,
    waiting_for_meeting_ended: bool,
    waiting_for_transcript_webhook: bool,
    checkpoint_id: Option<CheckpointId>,
    usage_stats: String,
    unkey_key_id: Option<String>,
    metadata: String,
}

struct RawRow {
    workflow_thread_id: WorkflowThreadId,
    room_name: String,
    room_url: String,
    bot_id: Option<BotId>,
    bot_config: String,
    bot_enabled: bool,
    meeting_status: MeetingStatus,
    meeting_start_time: Option<String>,
    meeting_end_time: Option<String>,
    bot_join_time: Option<String>,
    bot_leave_time: Option<String>,
    bot_duration_s: Option<i64>,
    transcript_text: Option<String>,
    transcript_processed: bool,
    email_sent: bool,
    webhook_sent: bool,
    candidate_summary: Option<String>,
    insights: Option<String>,
    qa_pairs: String,
    webhook_callback_url: Option<String>,
    email_results_to: Option<String>,
    workflow_paused: bool,
    waiting_for_meeting_ended: bool,
    waiting_for_transcript_webhook: bool,
    checkpoint_id: Option<CheckpointId>,
    usage_stats: String,
    unkey_key_id: Option<String>,
    metadata: String,
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    use std::str::FromStr;
    Ok(RawRow {
        workflow_thread_id: WorkflowThreadId::from(row.get::<_, String>(0)?),
        room_name: row.get(1)?,
        room_url: row.get(2)?,
        bot_id: row.get::<_, Option<String>>(3)?.map(BotId::from),
        bot_config: row.get(4)?,
        bot_enabled: row.get::<_, i32>(5)? != 0,
        meeting_status: MeetingStatus::from_str(&row.get::<_, String>(6)?)
            .unwrap_or(MeetingStatus::InProgress),
        meeting_start_time: row.get(7)?,
        meeting_end_time: row.get(8)?,
        bot_join_time: row.get(9)?,
        bot_leave_time: row.get(10)?,
        bot_duration_s: row.get(11)?,
        transcript_text: row.get(12)?,
        transcript_processed: row.get::<_, i32>(13)? != 0,
        email_sent: row.get::<_, i32>(14)? != 0,
        webhook_sent: row.get::<_, i32>(15)? != 0,
        candidate_summary: row.get(16)?,
        insights: row.get(17)?,
        qa_pairs: row.get(18)?,
        webhook_callback_url: row.get(19)?,
        email_results_to: row.get(20)?,
        workflow_paused: row.get::<_, i32>(21)? != 0,
        waiting_for_meeting_ended: row.get::<_, i32>(22)? != 0,
        waiting_for_transcript_webhook: row.get::<_, i32>(23)? != 0,
        checkpoint_id: row.get::<_, Option<String>>(24)?.map(CheckpointId::from),
        usage_stats: row.get(25)?,
        unkey_key_id: row.get(26)?,
        metadata: row.get(27)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_db;

    fn open_test_store() -> WorkflowThreadStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        WorkflowThreadStore::new(conn, FieldCrypto::new(Some("test-secret")))
    }

    #[test]
    fn create_then_get_roundtrips() {
        let store = open_test_store();
        let mut thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        thread.email_results_to = Some("hiring@example.com".to_string());
        thread.transcript_text = Some("hello world".to_string());
        store.create(&thread).unwrap();

        let fetched = store.get(&thread.workflow_thread_id).unwrap().unwrap();
        assert_eq!(fetched.room_name, "room-1");
        assert_eq!(
            fetched.email_results_to.as_deref(),
            Some("hiring@example.com")
        );
        assert_eq!(fetched.transcript_text.as_deref(), Some("hello world"));
    }

    #[test]
    fn get_by_room_returns_latest() {
        let store = open_test_store();
        let thread = WorkflowThread::new("room-2", "https://meet.example/room-2");
        store.create(&thread).unwrap();

        let fetched = store.get_by_room("room-2").unwrap().unwrap();
        assert_eq!(fetched.workflow_thread_id, thread.workflow_thread_id);
    }

    #[test]
    fn update_missing_thread_errors() {
        let store = open_test_store();
        let thread = WorkflowThread::new("room-3", "https://meet.example/room-3");
        let err = store.update(&thread).unwrap_err();
        assert!(matches!(err, StoreError::ThreadNotFound(_)));
    }

    #[test]
    fn update_persists_changes() {
        let store = open_test_store();
        let mut thread = WorkflowThread::new("room-4", "https://meet.example/room-4");
        store.create(&thread).unwrap();

        thread.workflow_paused = true;
        thread.usage_stats.total_cost_usd = 1.23;
        store.update(&thread).unwrap();

        let fetched = store.get(&thread.workflow_thread_id).unwrap().unwrap();
        assert!(fetched.workflow_paused);
        assert_eq!(fetched.usage_stats.total_cost_usd, 1.23);
    }

    #[test]
    fn list_active_filters_by_status_and_enabled() {
        let store = open_test_store();
        let mut enabled = WorkflowThread::new("room-5", "https://meet.example/room-5");
        enabled.bot_enabled = true;
        store.create(&enabled).unwrap();

        let mut disabled = WorkflowThread::new("room-6", "https://meet.example/room-6");
        disabled.bot_enabled = false;
        store.create(&disabled).unwrap();

        let active = store.list_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].workflow_thread_id, enabled.workflow_thread_id);
    }
}
