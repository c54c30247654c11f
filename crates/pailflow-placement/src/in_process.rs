use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::backend::{PlacementBackend, PlacementHandle};
use crate::error::Result;

/// Everything a bot worker needs to run one session, handed to the
/// `InProcessBackend`'s worker factory.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub room_url: String,
    pub token: String,
    pub bot_config: Map<String, Value>,
    pub workflow_thread_id: Option<String>,
}

pub type WorkerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type WorkerFactory = Arc<dyn Fn(SpawnRequest) -> WorkerFuture + Send + Sync>;

/// Runs the Media Pipeline on a scheduler-managed `tokio::task` in the
/// current process (spec.md §4.1 "InProcess"). Doesn't know how to build a
/// bot worker itself — that's `pailflow-orchestrator`'s job, supplied here
/// as a factory closure, the same way each `skynet-discord`/`skynet-telegram`
/// adapter owns its own connection state independently behind the shared
/// `Channel` trait rather than through a common base struct.
pub struct InProcessBackend {
    factory: WorkerFactory,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl InProcessBackend {
    pub fn new(factory: WorkerFactory) -> Self {
        Self {
            factory,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Cancels the worker task and awaits it bounded by `timeout` (spec.md
    /// §4.1 `stop_bot` for InProcess placement).
    pub async fn abort(&self, handle: &PlacementHandle, timeout: Duration) {
        let PlacementHandle::InProcess { task_id } = handle else {
            return;
        };
        let task = self.tasks.lock().unwrap().remove(task_id);
        if let Some(task) = task {
            task.abort();
            let _ = tokio::time::timeout(timeout, task).await;
        }
    }
}

#[async_trait]
impl PlacementBackend for InProcessBackend {
    fn name(&self) -> &'static str {
        "in_process"
    }

    #[instrument(skip(self, bot_config), fields(room_url))]
    async fn spawn(
        &self,
        room_url: &str,
        token: &str,
        bot_config: &Map<String, Value>,
        workflow_thread_id: Option<&str>,
    ) -> Result<PlacementHandle> {
        let task_id = Uuid::new_v4().to_string();
        let request = SpawnRequest {
            room_url: room_url.to_string(),
            token: token.to_string(),
            bot_config: bot_config.clone(),
            workflow_thread_id: workflow_thread_id.map(String::from),
        };
        let worker = (self.factory)(request);
        let handle = tokio::spawn(worker);
        self.tasks.lock().unwrap().insert(task_id.clone(), handle);
        info!(task_id, "in-process bot worker spawned");
        Ok(PlacementHandle::InProcess { task_id })
    }

    async fn is_running(&self, handle: &PlacementHandle) -> bool {
        let PlacementHandle::InProcess { task_id } = handle else {
            return false;
        };
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(task_id) {
            Some(task) if task.is_finished() => {
                tasks.remove(task_id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    async fn stop(&self, handle: &PlacementHandle, timeout: Duration) -> bool {
        self.abort(handle, timeout).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawns_and_reports_running_until_complete() {
        let backend = InProcessBackend::new(Arc::new(|_req: SpawnRequest| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }) as WorkerFuture
        }));

        let handle = backend
            .spawn("https://room.example/a", "", &Map::new(), None)
            .await
            .unwrap();
        assert!(backend.is_running(&handle).await);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!backend.is_running(&handle).await);
    }

    #[tokio::test]
    async fn abort_stops_the_task() {
        let backend = InProcessBackend::new(Arc::new(|_req: SpawnRequest| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }) as WorkerFuture
        }));
        let handle = backend
            .spawn("https://room.example/b", "", &Map::new(), None)
            .await
            .unwrap();
        backend.abort(&handle, Duration::from_millis(100)).await;
        assert!(!backend.is_running(&handle).await);
    }
}
