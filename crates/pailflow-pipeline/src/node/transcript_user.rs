use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;
use crate::transcript::{Role, TranscriptHandler, TranscriptMessage};

/// Appends finalized user utterances to the transcript (spec.md §4.2
/// "transcript_user"). `speaker_tracker` stamps the resolved participant
/// session id into `user_id`; that's what keys `participants_map`.
pub struct TranscriptUserNode {
    handler: Arc<TranscriptHandler>,
}

impl TranscriptUserNode {
    pub fn new(handler: Arc<TranscriptHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl PipelineNode for TranscriptUserNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        if let Frame::UserTranscription {
            is_final, ref text, ref user_id, ..
        } = frame
        {
            if is_final {
                self.handler.on_transcript_update(&[TranscriptMessage {
                    role: Role::User,
                    content: text.clone(),
                    user_id: None,
                    session_id: user_id.clone(),
                }])?;
            }
        }
        let _ = tx.send(frame).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pailflow_core::types::WorkflowThread;
    use pailflow_store::PailflowStore;
    use std::sync::RwLock;

    #[tokio::test]
    async fn final_transcription_is_appended() {
        let store = Arc::new(PailflowStore::open_in_memory(None).unwrap());
        let thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();
        let handler = Arc::new(TranscriptHandler::new(
            "room-1",
            "Pailbot",
            Arc::clone(&store),
            Some(id.clone()),
            Arc::new(RwLock::new(Vec::new())),
        ));
        let mut node = TranscriptUserNode::new(Arc::clone(&handler));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);

        node.process(
            Frame::UserTranscription {
                text: "hello".to_string(),
                is_final: true,
                speaker_id: None,
                user_id: None,
            },
            &tx,
        )
        .await
        .unwrap();

        assert!(handler.transcript_text().contains("User: hello"));
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn partial_transcription_is_not_appended() {
        let store = Arc::new(PailflowStore::open_in_memory(None).unwrap());
        let thread = WorkflowThread::new("room-2", "https://meet.example/room-2");
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();
        let handler = Arc::new(TranscriptHandler::new(
            "room-2",
            "Pailbot",
            Arc::clone(&store),
            Some(id),
            Arc::new(RwLock::new(Vec::new())),
        ));
        let mut node = TranscriptUserNode::new(handler.clone());
        let (tx, _rx) = tokio::sync::mpsc::channel(4);

        node.process(
            Frame::UserTranscription {
                text: "partial".to_string(),
                is_final: false,
                speaker_id: None,
                user_id: None,
            },
            &tx,
        )
        .await
        .unwrap();

        assert!(handler.transcript_text().is_empty());
    }
}
