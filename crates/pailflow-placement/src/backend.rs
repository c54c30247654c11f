use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::error::Result;

/// Opaque handle returned by a successful [`PlacementBackend::spawn`].
/// Each variant carries just enough to check status or clean up later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementHandle {
    InProcess { task_id: String },
    Function { invocation_id: String },
    Vm { machine_id: String },
}

/// Capability set every placement backend implements (spec.md §4.1
/// "Placement backends"), directly grounded on
/// `skynet_channels::channel::Channel`'s `connect`/`status` shape,
/// generalized from "channel adapter" to "placement backend".
#[async_trait]
pub trait PlacementBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn spawn(
        &self,
        room_url: &str,
        token: &str,
        bot_config: &Map<String, Value>,
        workflow_thread_id: Option<&str>,
    ) -> Result<PlacementHandle>;

    async fn is_running(&self, handle: &PlacementHandle) -> bool;

    /// Stops the session identified by `handle` (spec.md §4.1 `stop_bot`).
    /// Function/VM sessions auto-destroy on completion and aren't required
    /// to stop early, so the default just reports success; `InProcess`
    /// overrides this to cancel and await its task.
    async fn stop(&self, _handle: &PlacementHandle, _timeout: Duration) -> bool {
        true
    }
}
