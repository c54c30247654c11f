use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque 128-bit workflow thread identifier (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowThreadId(pub String);

impl WorkflowThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkflowThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkflowThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkflowThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Legacy per-bot identifier (spec.md §3 `BotSession`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotId(pub String);

impl BotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BotId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque checkpoint identifier handed back by the checkpointer (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointId(pub String);

impl CheckpointId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CheckpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CheckpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Meeting/call lifecycle state on a [`WorkflowThread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingStatus::InProgress => write!(f, "in_progress"),
            MeetingStatus::Completed => write!(f, "completed"),
            MeetingStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for MeetingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown meeting status: {other}")),
        }
    }
}

/// `BotSession.status` (spec.md §3, legacy mirror row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BotSessionStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl fmt::Display for BotSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotSessionStatus::Running => write!(f, "running"),
            BotSessionStatus::Completed => write!(f, "completed"),
            BotSessionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for BotSessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown bot session status: {other}")),
        }
    }
}

/// A single question/answer pair derived from a transcript (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// One scored question/answer assessment embedded in [`Insights`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionAssessment {
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub notes: String,
}

/// Structured interview insights (spec.md §3).
///
/// `extra` carries any additional top-level keys the LLM returned so that
/// user-defined schema extensions (`person_name`, `timeline`, …) survive a
/// round trip through the store — see DESIGN NOTES "Dynamic key sets in rows".
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Insights {
    pub overall_score: f64,
    #[serde(default)]
    pub competency_scores: std::collections::BTreeMap<String, f64>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub question_assessments: Vec<QuestionAssessment>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accumulated LLM/STT cost for one workflow run (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UsageStats {
    pub total_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posthog_trace_id: Option<String>,
}

/// The canonical per-run record — primary key for all bot-call state (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowThread {
    pub workflow_thread_id: WorkflowThreadId,
    pub room_name: String,
    pub room_url: String,
    pub bot_id: Option<BotId>,
    #[serde(default)]
    pub bot_config: serde_json::Map<String, serde_json::Value>,
    pub bot_enabled: bool,
    pub meeting_status: MeetingStatus,
    pub meeting_start_time: Option<String>,
    pub meeting_end_time: Option<String>,
    pub bot_join_time: Option<String>,
    pub bot_leave_time: Option<String>,
    pub bot_duration_s: Option<i64>,
    pub transcript_text: Option<String>,
    pub transcript_processed: bool,
    pub email_sent: bool,
    pub webhook_sent: bool,
    pub candidate_summary: Option<String>,
    #[serde(default)]
    pub insights: Option<Insights>,
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
    pub webhook_callback_url: Option<String>,
    pub email_results_to: Option<String>,
    pub workflow_paused: bool,
    pub waiting_for_meeting_ended: bool,
    pub waiting_for_transcript_webhook: bool,
    pub checkpoint_id: Option<CheckpointId>,
    #[serde(default)]
    pub usage_stats: UsageStats,
    pub unkey_key_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowThread {
    /// Construct a freshly-requested thread (spec.md §3 "created when a call is requested").
    pub fn new(room_name: impl Into<String>, room_url: impl Into<String>) -> Self {
        Self {
            workflow_thread_id: WorkflowThreadId::new(),
            room_name: room_name.into(),
            room_url: room_url.into(),
            bot_id: None,
            bot_config: serde_json::Map::new(),
            bot_enabled: false,
            meeting_status: MeetingStatus::InProgress,
            meeting_start_time: None,
            meeting_end_time: None,
            bot_join_time: None,
            bot_leave_time: None,
            bot_duration_s: None,
            transcript_text: None,
            transcript_processed: false,
            email_sent: false,
            webhook_sent: false,
            candidate_summary: None,
            insights: None,
            qa_pairs: Vec::new(),
            webhook_callback_url: None,
            email_results_to: None,
            workflow_paused: false,
            waiting_for_meeting_ended: false,
            waiting_for_transcript_webhook: false,
            checkpoint_id: None,
            usage_stats: UsageStats::default(),
            unkey_key_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// A thread is resumable iff paused with a known checkpoint.
    pub fn is_resumable(&self) -> bool {
        self.workflow_paused && self.checkpoint_id.is_some()
    }
}

/// Legacy per-bot mirror row (spec.md §3 `BotSession`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSession {
    pub bot_id: BotId,
    pub status: BotSessionStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    #[serde(default)]
    pub bot_config: serde_json::Map<String, serde_json::Value>,
    pub transcript_text: Option<String>,
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
    pub insights: Option<Insights>,
    pub error: Option<String>,
}

/// A single line of in-memory transcript (spec.md §3 "Transcript line").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker_name: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_thread_is_not_resumable() {
        let t = WorkflowThread::new("roomA", "https://r.example/roomA");
        assert!(!t.is_resumable());
    }

    #[test]
    fn resumable_requires_both_paused_and_checkpoint() {
        let mut t = WorkflowThread::new("roomA", "https://r.example/roomA");
        t.workflow_paused = true;
        assert!(!t.is_resumable());
        t.checkpoint_id = Some(CheckpointId::from("ckpt-1"));
        assert!(t.is_resumable());
    }

    #[test]
    fn insights_extra_roundtrips_unknown_keys() {
        let json = serde_json::json!({
            "overall_score": 7.5,
            "competency_scores": {"communication": 8.0},
            "strengths": ["clear answers"],
            "weaknesses": [],
            "question_assessments": [],
            "person_name": "Alex",
            "timeline": "2 years"
        });
        let insights: Insights = serde_json::from_value(json).unwrap();
        assert_eq!(insights.extra.get("person_name").unwrap(), "Alex");
        assert_eq!(insights.extra.get("timeline").unwrap(), "2 years");
    }
}
