use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;
use crate::speaker::SpeakerTracker;

/// Wraps a shared [`SpeakerTracker`] as a pipeline stage: resolves
/// `speaker_id` to a participant and stamps `user_id` on `UserTranscription`
/// frames before forwarding (spec.md §4.2 "speaker_tracker").
pub struct SpeakerTrackerNode {
    tracker: Arc<SpeakerTracker>,
}

impl SpeakerTrackerNode {
    pub fn new(tracker: Arc<SpeakerTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl PipelineNode for SpeakerTrackerNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        let Frame::UserTranscription {
            text,
            is_final,
            speaker_id,
            user_id,
        } = frame
        else {
            let _ = tx.send(frame).await;
            return Ok(());
        };

        let resolved_user_id = match &speaker_id {
            Some(sid) => {
                self.tracker.set_last_speaker_id(Some(sid.clone()));
                self.tracker.resolve_or_automap(sid).or(user_id)
            }
            None => user_id,
        };

        let _ = tx
            .send(Frame::UserTranscription {
                text,
                is_final,
                speaker_id,
                user_id: resolved_user_id,
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;

    #[tokio::test]
    async fn stamps_user_id_from_automapped_participant() {
        let join_order = Arc::new(RwLock::new(vec!["p1".to_string()]));
        let tracker = Arc::new(SpeakerTracker::new(join_order));
        let mut node = SpeakerTrackerNode::new(tracker);
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);

        node.process(
            Frame::UserTranscription {
                text: "hi".to_string(),
                is_final: true,
                speaker_id: Some("dg-0".to_string()),
                user_id: None,
            },
            &tx,
        )
        .await
        .unwrap();

        match rx.recv().await.unwrap() {
            Frame::UserTranscription { user_id, .. } => {
                assert_eq!(user_id.as_deref(), Some("p1"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
