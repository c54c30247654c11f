use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;
use crate::transcript::{Role, TranscriptHandler, TranscriptMessage};

/// Appends assistant replies to the transcript (spec.md §4.2
/// "transcript_assistant").
pub struct TranscriptAssistantNode {
    handler: Arc<TranscriptHandler>,
}

impl TranscriptAssistantNode {
    pub fn new(handler: Arc<TranscriptHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl PipelineNode for TranscriptAssistantNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        if let Frame::AssistantTranscription { ref text, .. } = frame {
            self.handler.on_transcript_update(&[TranscriptMessage {
                role: Role::Assistant,
                content: text.clone(),
                user_id: None,
                session_id: None,
            }])?;
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
    async fn appends_assistant_text() {
        let store = Arc::new(PailflowStore::open_in_memory(None).unwrap());
        let thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();
        let handler = Arc::new(TranscriptHandler::new(
            "room-1",
            "Pailbot",
            store,
            Some(id),
            Arc::new(RwLock::new(Vec::new())),
        ));
        let mut node = TranscriptAssistantNode::new(Arc::clone(&handler));
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);

        node.process(
            Frame::AssistantTranscription {
                text: "hello there".to_string(),
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            },
            &tx,
        )
        .await
        .unwrap();

        assert!(handler.transcript_text().contains("Pailbot: hello there"));
        assert!(rx.recv().await.is_some());
    }
}
