use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::frame::Frame;
use crate::node::PipelineNode;

/// One completed LLM turn: assistant text plus the token counts needed to
/// price it (spec.md §4.5/§4.6).
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub model: String,
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// LLM provider abstraction. Vendor SDK wiring is out of scope per spec.md
/// §1 — `pailflow-gateway` supplies a real implementation at process wiring
/// time.
#[async_trait]
pub trait LlmEngine: Send + Sync {
    async fn reply(&self, context: &str) -> crate::error::Result<LlmReply>;
}

/// `llm` node: produces assistant text on `LLMRun`, given the text
/// accumulated since the last reply as "context" (spec.md §4.2). The
/// default interruption strategy ("interrupt after ≥1 word spoken by
/// user") lives upstream, in whatever drives cancellation of this node's
/// in-flight `reply` future.
pub struct LlmNode {
    engine: Arc<dyn LlmEngine>,
    pending_context: String,
}

impl LlmNode {
    pub fn new(engine: Arc<dyn LlmEngine>) -> Self {
        Self {
            engine,
            pending_context: String::new(),
        }
    }
}

#[async_trait]
impl PipelineNode for LlmNode {
    async fn process(&mut self, frame: Frame, tx: &Sender<Frame>) -> Result<()> {
        match frame {
            Frame::UserTranscription { text, is_final, .. } if is_final => {
                self.pending_context.push_str(&text);
                self.pending_context.push(' ');
                Ok(())
            }
            Frame::LLMRun => {
                let context = std::mem::take(&mut self.pending_context);
                let reply = self.engine.reply(context.trim()).await?;
                let timestamp = chrono::Utc::now().to_rfc3339();
                let _ = tx
                    .send(Frame::AssistantTranscription {
                        text: reply.text,
                        timestamp,
                    })
                    .await;
                let _ = tx
                    .send(Frame::MetricsLLMUsage {
                        model: reply.model,
                        prompt_tokens: reply.prompt_tokens,
                        completion_tokens: reply.completion_tokens,
                    })
                    .await;
                Ok(())
            }
            other => {
                let _ = tx.send(other).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLlm;

    #[async_trait]
    impl LlmEngine for FixedLlm {
        async fn reply(&self, context: &str) -> crate::error::Result<LlmReply> {
            Ok(LlmReply {
                model: "gpt-4o".to_string(),
                text: format!("you said: {context}"),
                prompt_tokens: 10,
                completion_tokens: 5,
            })
        }
    }

    #[tokio::test]
    async fn llm_run_emits_reply_and_usage() {
        let mut node = LlmNode::new(Arc::new(FixedLlm));
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);

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
        node.process(Frame::LLMRun, &tx).await.unwrap();

        match rx.recv().await.unwrap() {
            Frame::AssistantTranscription { text, .. } => {
                assert_eq!(text, "you said: hello");
            }
            other => panic!("unexpected: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            Frame::MetricsLLMUsage {
                model,
                prompt_tokens,
                completion_tokens,
            } => {
                assert_eq!(model, "gpt-4o");
                assert_eq!(prompt_tokens, 10);
                assert_eq!(completion_tokens, 5);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
