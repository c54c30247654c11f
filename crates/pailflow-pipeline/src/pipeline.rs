use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::frame::Frame;
use crate::node::PipelineNode;

const CHANNEL_CAPACITY: usize = 64;
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Wires a fixed list of [`PipelineNode`]s into the topology ordered by
/// spec.md §4.2 (`transport_in → stt → speaker_tracker → transcript_user →
/// user_aggregator → llm → metrics_tap → tts → animation → transport_out →
/// transcript_assistant → assistant_aggregator`), each stage connected to
/// the next by a bounded `tokio::sync::mpsc` channel.
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineNode>>,
    tick_interval: Duration,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn PipelineNode>>) -> Self {
        Self {
            stages,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Spawns one task per stage and returns the sender feeding
    /// `transport_in` plus a handle that resolves once every stage has
    /// drained and exited (either the input closed, or `cancel` fired).
    #[instrument(skip(self, cancel))]
    pub fn spawn(self, cancel: CancellationToken) -> (mpsc::Sender<Frame>, JoinHandle<()>) {
        let stage_count = self.stages.len();
        let mut senders = Vec::with_capacity(stage_count);
        let mut receivers = Vec::with_capacity(stage_count);
        for _ in 0..stage_count {
            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            senders.push(tx);
            receivers.push(rx);
        }
        // Sink for whatever the terminal stage emits.
        let (sink_tx, mut sink_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);
        tokio::spawn(async move { while sink_rx.recv().await.is_some() {} });

        let input_tx = senders[0].clone();
        let mut handles = Vec::with_capacity(stage_count);

        let mut stages = self.stages;
        for (i, rx) in receivers.into_iter().enumerate() {
            let node = stages.remove(0);
            let out_tx = if i + 1 < stage_count {
                senders[i + 1].clone()
            } else {
                sink_tx.clone()
            };
            let cancel = cancel.clone();
            let tick_interval = self.tick_interval;
            handles.push(tokio::spawn(run_stage(node, rx, out_tx, cancel, tick_interval)));
        }
        drop(senders);

        let joined = tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
        });

        (input_tx, joined)
    }
}

async fn run_stage(
    mut node: Box<dyn PipelineNode>,
    mut rx: mpsc::Receiver<Frame>,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("pipeline stage cancelled");
                break;
            }
            _ = interval.tick() => {
                if let Err(err) = node.tick(&tx).await {
                    debug!(error = %err, "pipeline stage tick error");
                }
            }
            maybe_frame = rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if let Err(err) = node.process(frame, &tx).await {
                            debug!(error = %err, "pipeline stage process error");
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
