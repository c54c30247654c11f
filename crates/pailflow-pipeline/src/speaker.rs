use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Tracks which participant is speaking and maps Deepgram's diarization
/// speaker ids onto room participant session ids (spec.md §4.2
/// "speaker_tracker").
///
/// Shares `participant_join_order` with [`crate::transcript::TranscriptHandler`]
/// via the same `Arc` rather than holding a reference to the handler itself
/// (DESIGN NOTES §9 "Cyclic handler/tracker back-references").
pub struct SpeakerTracker {
    last_speaker_id: RwLock<Option<String>>,
    speaker_map: RwLock<HashMap<String, String>>,
    participant_join_order: Arc<RwLock<Vec<String>>>,
}

impl SpeakerTracker {
    pub fn new(participant_join_order: Arc<RwLock<Vec<String>>>) -> Self {
        Self {
            last_speaker_id: RwLock::new(None),
            speaker_map: RwLock::new(HashMap::new()),
            participant_join_order,
        }
    }

    pub fn last_speaker_id(&self) -> Option<String> {
        self.last_speaker_id.read().unwrap().clone()
    }

    pub fn set_last_speaker_id(&self, id: Option<String>) {
        *self.last_speaker_id.write().unwrap() = id;
    }

    pub fn mapped_participant(&self, speaker_id: &str) -> Option<String> {
        self.speaker_map.read().unwrap().get(speaker_id).cloned()
    }

    /// Binds `speaker_id` to `participant_session_id` directly — used by
    /// `on_active_speaker_changed` once the transport names a peer.
    pub fn bind(&self, speaker_id: &str, participant_session_id: &str) {
        self.speaker_map
            .write()
            .unwrap()
            .insert(speaker_id.to_string(), participant_session_id.to_string());
        debug!(speaker_id, participant_session_id, "speaker bound");
    }

    /// Resolves `speaker_id` to a participant session id, auto-mapping to
    /// the first unmapped participant in join order if it isn't known yet
    /// (spec.md §4.2 "speaker_tracker").
    pub fn resolve_or_automap(&self, speaker_id: &str) -> Option<String> {
        if let Some(existing) = self.mapped_participant(speaker_id) {
            return Some(existing);
        }

        let mapped: std::collections::HashSet<String> =
            self.speaker_map.read().unwrap().values().cloned().collect();
        let join_order = self.participant_join_order.read().unwrap();
        let candidate = join_order.iter().find(|p| !mapped.contains(*p)).cloned();
        drop(join_order);

        if let Some(participant_session_id) = candidate.clone() {
            self.bind(speaker_id, &participant_session_id);
        }
        candidate
    }
}
