use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// Builds the slowed, ping-ponged sprite sequence used for `AnimatedSprite`
/// frames, ported behaviorally from
/// `flow/steps/agent_call/bot/video_frames.py::load_bot_video_frames`'s
/// animated branch: the sequence is extended by appending itself reversed
/// (forward then backward, for a smooth loop), then each frame is
/// duplicated `frames_per_sprite` times to slow playback down.
pub fn build_animation_sequence(frames: Vec<String>, frames_per_sprite: usize) -> Vec<String> {
    if frames.is_empty() || frames_per_sprite == 0 {
        return Vec::new();
    }

    let mut sequence = frames.clone();
    sequence.extend(frames.iter().rev().cloned());

    let mut slowed = Vec::with_capacity(sequence.len() * frames_per_sprite);
    for frame_id in sequence {
        for _ in 0..frames_per_sprite {
            slowed.push(frame_id.clone());
        }
    }
    slowed
}

/// Holds a quiet frame and a talking sequence (static image or animated
/// sprite); emits the talking frame exactly once on `BotStartedSpeaking`
/// and the quiet frame on `BotStoppedSpeaking` (spec.md §4.2 "animation").
pub struct AnimationNode {
    quiet_frame: Option<String>,
    talking_sequence: Vec<String>,
}

impl AnimationNode {
    pub fn new(quiet_frame: Option<String>, talking_sequence: Vec<String>) -> Self {
        Self {
            quiet_frame,
            talking_sequence,
        }
    }
}

#[async_trait]
impl PipelineNode for AnimationNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        match frame {
            Frame::BotStartedSpeaking => {
                if !self.talking_sequence.is_empty() {
                    let _ = tx
                        .send(Frame::AnimatedSprite {
                            frame_ids: self.talking_sequence.clone(),
                        })
                        .await;
                }
                let _ = tx.send(Frame::BotStartedSpeaking).await;
                Ok(())
            }
            Frame::BotStoppedSpeaking => {
                if let Some(quiet) = &self.quiet_frame {
                    let _ = tx
                        .send(Frame::ImageOutput {
                            image_id: quiet.clone(),
                        })
                        .await;
                }
                let _ = tx.send(Frame::BotStoppedSpeaking).await;
                Ok(())
            }
            other => {
                let _ = tx.send(other).await;
                Ok(())
            }
        }
    }
}
