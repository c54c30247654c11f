use serde::{Deserialize, Serialize};

/// The frame (tagged union) that flows between pipeline nodes (spec.md
/// §4.2). These never cross a network boundary — they're internal
/// `tokio::sync::mpsc` payloads — but are serde-tagged like
/// `skynet-protocol`'s wire frames anyway, for symmetry with the rest of
/// the pack's frame types and because a tagged enum round-trips through
/// `tracing` fields cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Frame {
    AudioIn {
        pcm: Vec<u8>,
    },
    AudioOut {
        pcm: Vec<u8>,
    },
    UserTranscription {
        text: String,
        is_final: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        speaker_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    AssistantTranscription {
        text: String,
        timestamp: String,
    },
    BotStartedSpeaking,
    BotStoppedSpeaking,
    /// Signal to produce a reply — queued e.g. after the first participant
    /// joins, or after the user-aggregator flushes.
    LLMRun,
    MetricsLLMUsage {
        model: String,
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    ImageOutput {
        image_id: String,
    },
    AnimatedSprite {
        frame_ids: Vec<String>,
    },
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::AudioIn { .. } => "AudioIn",
            Frame::AudioOut { .. } => "AudioOut",
            Frame::UserTranscription { .. } => "UserTranscription",
            Frame::AssistantTranscription { .. } => "AssistantTranscription",
            Frame::BotStartedSpeaking => "BotStartedSpeaking",
            Frame::BotStoppedSpeaking => "BotStoppedSpeaking",
            Frame::LLMRun => "LLMRun",
            Frame::MetricsLLMUsage { .. } => "MetricsLLMUsage",
            Frame::ImageOutput { .. } => "ImageOutput",
            Frame::AnimatedSprite { .. } => "AnimatedSprite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization_round_trips() {
        let frame = Frame::UserTranscription {
            text: "hello".to_string(),
            is_final: true,
            speaker_id: Some("spk-1".to_string()),
            user_id: None,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"kind\":\"UserTranscription\""));
        let back: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), "UserTranscription");
    }
}
