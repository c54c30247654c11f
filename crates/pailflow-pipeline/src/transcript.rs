use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pailflow_core::types::WorkflowThreadId;
use pailflow_store::PailflowStore;
use tracing::{instrument, warn};

use crate::error::Result;

/// A room participant, keyed by session id in [`TranscriptHandler`]'s map.
#[derive(Debug, Clone)]
pub struct Participant {
    pub name: String,
    pub user_id: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One raw transcript message handed to [`TranscriptHandler::on_transcript_update`],
/// before speaker-name resolution.
#[derive(Debug, Clone)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

/// Owns the in-memory transcript for one bot-worker session (spec.md
/// §4.2.1). Shares `participant_join_order` with [`crate::speaker::SpeakerTracker`]
/// via the same `Arc` instead of a back-reference (DESIGN NOTES §9).
pub struct TranscriptHandler {
    room_name: String,
    bot_name: String,
    store: Arc<PailflowStore>,
    workflow_thread_id: RwLock<Option<WorkflowThreadId>>,
    participants_map: RwLock<HashMap<String, Participant>>,
    participant_join_order: Arc<RwLock<Vec<String>>>,
    transcript_text: RwLock<String>,
}

impl TranscriptHandler {
    pub fn new(
        room_name: impl Into<String>,
        bot_name: impl Into<String>,
        store: Arc<PailflowStore>,
        workflow_thread_id: Option<WorkflowThreadId>,
        participant_join_order: Arc<RwLock<Vec<String>>>,
    ) -> Self {
        Self {
            room_name: room_name.into(),
            bot_name: bot_name.into(),
            store,
            workflow_thread_id: RwLock::new(workflow_thread_id),
            participants_map: RwLock::new(HashMap::new()),
            participant_join_order,
            transcript_text: RwLock::new(String::new()),
        }
    }

    pub fn workflow_thread_id(&self) -> Option<WorkflowThreadId> {
        self.workflow_thread_id.read().unwrap().clone()
    }

    pub fn transcript_text(&self) -> String {
        self.transcript_text.read().unwrap().clone()
    }

    pub fn participant_join_order(&self) -> Arc<RwLock<Vec<String>>> {
        Arc::clone(&self.participant_join_order)
    }

    /// Rebuilds the participants map from a transport snapshot, appending
    /// newly-seen session ids to join order (`on_participant_joined`).
    pub fn sync_participants(&self, participants: Vec<Participant>, bot_session_id: Option<&str>) {
        let mut map = self.participants_map.write().unwrap();
        map.clear();
        let mut order = self.participant_join_order.write().unwrap();
        for p in participants {
            if Some(p.session_id.as_str()) == bot_session_id || p.name == self.bot_name {
                continue;
            }
            if !order.contains(&p.session_id) {
                order.push(p.session_id.clone());
            }
            map.insert(p.session_id.clone(), p);
        }
    }

    fn resolve_speaker_name(&self, msg: &TranscriptMessage) -> String {
        if msg.role == Role::Assistant {
            return self.bot_name.clone();
        }

        let map = self.participants_map.read().unwrap();

        if let Some(user_id) = &msg.user_id {
            if let Some(p) = map.values().find(|p| p.user_id.as_deref() == Some(user_id)) {
                return p.name.clone();
            }
        }
        if let Some(session_id) = &msg.session_id {
            if let Some(p) = map.get(session_id) {
                return p.name.clone();
            }
        }
        if map.len() == 1 {
            return map.values().next().unwrap().name.clone();
        }
        "User".to_string()
    }

    /// Appends resolved lines to the in-memory transcript and persists the
    /// accumulated text to the workflow thread row (spec.md §4.2.1).
    #[instrument(skip(self, messages), fields(room_name = %self.room_name))]
    pub fn on_transcript_update(&self, messages: &[TranscriptMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut appended = String::new();
        for msg in messages {
            let speaker = self.resolve_speaker_name(msg);
            let timestamp = chrono::Utc::now().to_rfc3339();
            appended.push_str(&format!("[{timestamp}] {speaker}: {}\n", msg.content));
        }

        {
            let mut text = self.transcript_text.write().unwrap();
            text.push_str(&appended);
        }

        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let thread_id = {
            let cached = self.workflow_thread_id.read().unwrap().clone();
            match cached {
                Some(id) => Some(id),
                None => self.lookup_and_cache_thread_id()?,
            }
        };

        let Some(thread_id) = thread_id else {
            warn!(room_name = %self.room_name, "no workflow thread to persist transcript to yet");
            return Ok(());
        };

        let Some(mut thread) = self.store.workflow_threads.get(&thread_id)? else {
            warn!(workflow_thread_id = %thread_id, "workflow thread vanished before transcript persist");
            return Ok(());
        };

        thread.transcript_text = Some(self.transcript_text());
        self.store.workflow_threads.update(&thread)?;
        Ok(())
    }

    fn lookup_and_cache_thread_id(&self) -> Result<Option<WorkflowThreadId>> {
        let latest = self.store.workflow_threads.get_by_room(&self.room_name)?;
        let paused = latest.filter(|t| t.workflow_paused);
        if let Some(thread) = paused {
            let id = thread.workflow_thread_id.clone();
            *self.workflow_thread_id.write().unwrap() = Some(id.clone());
            return Ok(Some(id));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pailflow_core::types::WorkflowThread;

    fn handler_with_thread() -> (Arc<PailflowStore>, TranscriptHandler, WorkflowThreadId) {
        let store = Arc::new(PailflowStore::open_in_memory(None).unwrap());
        let thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();

        let join_order = Arc::new(RwLock::new(Vec::new()));
        let handler = TranscriptHandler::new(
            "room-1",
            "Pailbot",
            Arc::clone(&store),
            Some(id.clone()),
            join_order,
        );
        (store, handler, id)
    }

    #[test]
    fn assistant_message_uses_bot_name() {
        let (_store, handler, _id) = handler_with_thread();
        handler
            .on_transcript_update(&[TranscriptMessage {
                role: Role::Assistant,
                content: "Hello there".to_string(),
                user_id: None,
                session_id: None,
            }])
            .unwrap();
        assert!(handler.transcript_text().contains("Pailbot: Hello there"));
    }

    #[test]
    fn user_message_resolves_by_session_id() {
        let (_store, handler, _id) = handler_with_thread();
        handler.sync_participants(
            vec![Participant {
                name: "Alex".to_string(),
                user_id: None,
                session_id: "sess-1".to_string(),
            }],
            None,
        );
        handler
            .on_transcript_update(&[TranscriptMessage {
                role: Role::User,
                content: "Hi".to_string(),
                user_id: None,
                session_id: Some("sess-1".to_string()),
            }])
            .unwrap();
        assert!(handler.transcript_text().contains("Alex: Hi"));
    }

    #[test]
    fn user_message_falls_back_to_sole_known_participant() {
        let (_store, handler, _id) = handler_with_thread();
        handler.sync_participants(
            vec![Participant {
                name: "Jordan".to_string(),
                user_id: None,
                session_id: "sess-2".to_string(),
            }],
            None,
        );
        handler
            .on_transcript_update(&[TranscriptMessage {
                role: Role::User,
                content: "Hey".to_string(),
                user_id: None,
                session_id: None,
            }])
            .unwrap();
        assert!(handler.transcript_text().contains("Jordan: Hey"));
    }

    #[test]
    fn unknown_user_falls_back_to_generic_name() {
        let (_store, handler, _id) = handler_with_thread();
        handler
            .on_transcript_update(&[TranscriptMessage {
                role: Role::User,
                content: "Hey".to_string(),
                user_id: None,
                session_id: None,
            }])
            .unwrap();
        assert!(handler.transcript_text().contains("User: Hey"));
    }

    #[test]
    fn persists_transcript_text_to_store() {
        let (store, handler, id) = handler_with_thread();
        handler
            .on_transcript_update(&[TranscriptMessage {
                role: Role::Assistant,
                content: "Welcome".to_string(),
                user_id: None,
                session_id: None,
            }])
            .unwrap();
        let persisted = store.workflow_threads.get(&id).unwrap().unwrap();
        assert!(persisted.transcript_text.unwrap().contains("Welcome"));
    }

    #[test]
    fn unknown_thread_id_looks_up_paused_thread_by_room() {
        let store = Arc::new(PailflowStore::open_in_memory(None).unwrap());
        let mut thread = WorkflowThread::new("room-2", "https://meet.example/room-2");
        thread.workflow_paused = true;
        thread.checkpoint_id = Some(pailflow_core::types::CheckpointId::from("ckpt-1"));
        let expected_id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();

        let join_order = Arc::new(RwLock::new(Vec::new()));
        let handler = TranscriptHandler::new("room-2", "Pailbot", Arc::clone(&store), None, join_order);
        handler
            .on_transcript_update(&[TranscriptMessage {
                role: Role::Assistant,
                content: "Resuming".to_string(),
                user_id: None,
                session_id: None,
            }])
            .unwrap();

        assert_eq!(handler.workflow_thread_id(), Some(expected_id.clone()));
        let persisted = store.workflow_threads.get(&expected_id).unwrap().unwrap();
        assert!(persisted.transcript_text.unwrap().contains("Resuming"));
    }
}
