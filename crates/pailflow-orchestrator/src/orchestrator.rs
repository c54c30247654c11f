use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use pailflow_core::types::WorkflowThreadId;
use pailflow_placement::PlacementBackend;
use pailflow_store::PailflowStore;
use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::error::{OrchestratorError, Result};
use crate::session::ActiveSession;

/// Bot sessions running more than this long get flagged in
/// [`BotSessionOrchestrator::list_active_bots`] (spec.md §4.1, default 1h).
const WARNING_THRESHOLD_HOURS: f64 = 1.0;

/// One backend entry in fallback-priority order (Function → VM →
/// InProcess, spec.md §4.1 "Backend selection").
struct BackendEntry {
    name: &'static str,
    backend: Box<dyn PlacementBackend>,
    configured: bool,
}

/// Point-in-time status returned by [`BotSessionOrchestrator::get_bot_status`]
/// / [`BotSessionOrchestrator::list_active_bots`].
#[derive(Debug, Clone)]
pub struct BotStatus {
    pub room_name: String,
    pub backend_name: &'static str,
    pub is_running: bool,
    pub runtime_seconds: u64,
    pub warning: Option<String>,
}

/// Places and supervises exactly one bot session per room name (spec.md
/// §4.1), grounded on `skynet_scheduler::engine::SchedulerEngine`'s
/// `Connection` + registry shape. The "tick loop" here is
/// `cleanup_long_running_bots`, driven externally from
/// `pailflow-gateway::main` on an interval rather than owned by this
/// struct, the same way `SchedulerEngine::run` is driven by its caller.
pub struct BotSessionOrchestrator {
    store: std::sync::Arc<PailflowStore>,
    backends: Vec<BackendEntry>,
    registry: Mutex<HashMap<String, ActiveSession>>,
    start_lock: AsyncMutex<()>,
}

impl BotSessionOrchestrator {
    pub fn new(
        store: std::sync::Arc<PailflowStore>,
        function_backend: Option<(Box<dyn PlacementBackend>, bool)>,
        vm_backend: Option<(Box<dyn PlacementBackend>, bool)>,
        in_process_backend: Box<dyn PlacementBackend>,
    ) -> Self {
        let mut backends = Vec::new();
        if let Some((backend, configured)) = function_backend {
            backends.push(BackendEntry { name: "function", backend, configured });
        }
        if let Some((backend, configured)) = vm_backend {
            backends.push(BackendEntry { name: "vm", backend, configured });
        }
        backends.push(BackendEntry {
            name: "in_process",
            backend: in_process_backend,
            configured: true,
        });

        Self {
            store,
            backends,
            registry: Mutex::new(HashMap::new()),
            start_lock: AsyncMutex::new(()),
        }
    }

    /// Places exactly one bot session for `room_name` (spec.md §4.1
    /// `start_bot`), serialized by a single process-wide lock so two
    /// concurrent requests for the same room never both spawn — grounded
    /// on `bot_service.py::start_bot`'s `async with self._start_lock`
    /// double-checked-locking pattern.
    #[instrument(skip(self, bot_config, token), fields(room_name))]
    pub async fn start_bot(
        &self,
        room_url: &str,
        token: &str,
        bot_config: &Map<String, Value>,
        room_name: Option<&str>,
        backend_hint: Option<&str>,
        workflow_thread_id: Option<WorkflowThreadId>,
    ) -> Result<()> {
        let room_name = room_name
            .map(String::from)
            .unwrap_or_else(|| room_url.rsplit('/').next().unwrap_or(room_url).to_string());

        let _guard = self.start_lock.lock().await;

        if self.is_bot_running(&room_name).await {
            info!(room_name, "bot already running, skipping duplicate start");
            return Ok(());
        }

        let thread_id = workflow_thread_id.unwrap_or_else(WorkflowThreadId::new);
        if let Some(mut thread) = self.store.workflow_threads.get(&thread_id)? {
            thread.bot_enabled = true;
            self.store.workflow_threads.update(&thread)?;
        }

        let order = self.backend_order(backend_hint);
        let mut last_error: Option<String> = None;

        for idx in order {
            let entry = &self.backends[idx];
            if !entry.configured {
                continue;
            }
            match entry
                .backend
                .spawn(room_url, token, bot_config, Some(thread_id.as_str()))
                .await
            {
                Ok(handle) => {
                    if entry.name == "in_process" {
                        if let Some(mut thread) = self.store.workflow_threads.get(&thread_id)? {
                            thread.bot_config = bot_config.clone();
                            self.store.workflow_threads.update(&thread)?;
                        }
                    }
                    self.registry.lock().unwrap().insert(
                        room_name.clone(),
                        ActiveSession {
                            backend_name: entry.name,
                            handle,
                            started_at: std::time::Instant::now(),
                            workflow_thread_id: thread_id.clone(),
                        },
                    );
                    info!(room_name, backend = entry.name, "bot started");
                    return Ok(());
                }
                Err(err) => {
                    warn!(room_name, backend = entry.name, error = %err, "placement backend failed, trying next");
                    last_error = Some(format!("{}: {err}", entry.name));
                }
            }
        }

        match last_error {
            Some(cause) => Err(OrchestratorError::PlacementFailed(cause)),
            None => Err(OrchestratorError::PlacementUnavailable),
        }
    }

    fn backend_order(&self, backend_hint: Option<&str>) -> Vec<usize> {
        if let Some(hint) = backend_hint {
            if let Some(idx) = self.backends.iter().position(|b| b.name == hint) {
                let mut order = vec![idx];
                order.extend((0..self.backends.len()).filter(|&i| i != idx));
                return order;
            }
        }
        (0..self.backends.len()).collect()
    }

    /// Stops the session for `room_name` (spec.md §4.1 `stop_bot`). Remote
    /// backends auto-destroy on completion, so this is a no-op success for
    /// them; InProcess sessions are cancelled and awaited bounded.
    #[instrument(skip(self))]
    pub async fn stop_bot(&self, room_name: &str) -> bool {
        let session = self.registry.lock().unwrap().remove(room_name);
        let Some(session) = session else {
            warn!(room_name, "no bot running for room");
            return false;
        };

        match self.backends.iter().find(|b| b.name == session.backend_name) {
            Some(entry) => entry.backend.stop(&session.handle, Duration::from_secs(5)).await,
            None => true,
        }
    }

    /// Returns true if any known backend still reports the session active
    /// (spec.md §4.1 `is_bot_running`). Evicts expired/not-found handles.
    pub async fn is_bot_running(&self, room_name: &str) -> bool {
        let handle = {
            let registry = self.registry.lock().unwrap();
            registry.get(room_name).map(|s| (s.backend_name, s.handle.clone()))
        };
        let Some((backend_name, handle)) = handle else {
            return false;
        };
        let Some(entry) = self.backends.iter().find(|b| b.name == backend_name) else {
            return false;
        };
        let running = entry.backend.is_running(&handle).await;
        if !running {
            self.registry.lock().unwrap().remove(room_name);
        }
        running
    }

    pub fn get_bot_status(&self, room_name: &str) -> Option<BotStatus> {
        let registry = self.registry.lock().unwrap();
        let session = registry.get(room_name)?;
        let runtime_seconds = session.runtime_seconds();
        let runtime_hours = runtime_seconds as f64 / 3600.0;
        Some(BotStatus {
            room_name: room_name.to_string(),
            backend_name: session.backend_name,
            is_running: true,
            runtime_seconds,
            warning: (runtime_hours > WARNING_THRESHOLD_HOURS)
                .then(|| format!("Bot has been running for {runtime_hours:.2} hours")),
        })
    }

    pub fn list_active_bots(&self) -> HashMap<String, BotStatus> {
        let registry = self.registry.lock().unwrap();
        registry
            .keys()
            .filter_map(|room_name| self.get_bot_status(room_name).map(|s| (room_name.clone(), s)))
            .collect()
    }

    /// Stops InProcess sessions older than `max_hours` (spec.md §4.1
    /// `cleanup_long_running_bots`, default 2h).
    #[instrument(skip(self))]
    pub async fn cleanup_long_running_bots(&self, max_hours: f64) -> usize {
        let max_seconds = (max_hours * 3600.0) as u64;
        let stale: Vec<String> = {
            let registry = self.registry.lock().unwrap();
            registry
                .iter()
                .filter(|(_, s)| s.runtime_seconds() > max_seconds)
                .map(|(room, _)| room.clone())
                .collect()
        };

        let mut stopped = 0;
        for room_name in stale {
            warn!(room_name, "stopping long-running bot");
            if self.stop_bot(&room_name).await {
                stopped += 1;
            }
        }
        if stopped > 0 {
            info!(stopped, "cleaned up long-running bots");
        }
        stopped
    }

    /// Process-shutdown sequence (spec.md §4.1 `cleanup`): leave rooms,
    /// drain native audio threads, then cancel remaining tasks. The
    /// ordering matters — abrupt cancellation before transport cleanup is
    /// observed to cause native-layer panics on shutdown.
    #[instrument(skip(self, rooms))]
    pub async fn cleanup(&self, rooms: &HashMap<String, std::sync::Arc<dyn pailflow_pipeline::RoomQuery>>) {
        let room_names: Vec<String> = self.registry.lock().unwrap().keys().cloned().collect();
        info!(count = room_names.len(), "cleaning up active bots");

        for room_name in &room_names {
            if let Some(room) = rooms.get(room_name) {
                match tokio::time::timeout(Duration::from_secs(2), room.leave(2000)).await {
                    Ok(Ok(())) => info!(room_name, "left room during cleanup"),
                    Ok(Err(err)) => warn!(room_name, error = %err, "error leaving room during cleanup"),
                    Err(_) => warn!(room_name, "timed out leaving room during cleanup"),
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(1500)).await;

        for room_name in &room_names {
            self.stop_bot(room_name).await;
        }
        self.registry.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pailflow_placement::PlacementHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct CountingInProcess {
        spawn_count: AtomicUsize,
    }

    #[async_trait]
    impl PlacementBackend for CountingInProcess {
        fn name(&self) -> &'static str {
            "in_process"
        }

        async fn spawn(&self, _: &str, _: &str, _: &Map<String, Value>, _: Option<&str>) -> pailflow_placement::Result<PlacementHandle> {
            self.spawn_count.fetch_add(1, Ordering::SeqCst);
            Ok(PlacementHandle::InProcess { task_id: "t1".to_string() })
        }

        async fn is_running(&self, _: &PlacementHandle) -> bool {
            true
        }
    }

    struct FailingBackend(&'static str);

    #[async_trait]
    impl PlacementBackend for FailingBackend {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn spawn(&self, _: &str, _: &str, _: &Map<String, Value>, _: Option<&str>) -> pailflow_placement::Result<PlacementHandle> {
            Err(pailflow_placement::PlacementError::Failed("unreachable".to_string()))
        }

        async fn is_running(&self, _: &PlacementHandle) -> bool {
            false
        }
    }

    fn orchestrator_with(in_process: Box<dyn PlacementBackend>) -> BotSessionOrchestrator {
        let store = StdArc::new(PailflowStore::open_in_memory(None).unwrap());
        BotSessionOrchestrator::new(store, None, None, in_process)
    }

    #[tokio::test]
    async fn start_bot_registers_session_and_is_running() {
        let orch = orchestrator_with(Box::new(CountingInProcess { spawn_count: AtomicUsize::new(0) }));
        orch.start_bot("https://meet.example/room-1", "tok", &Map::new(), None, None, None)
            .await
            .unwrap();
        assert!(orch.is_bot_running("room-1").await);
        assert!(orch.get_bot_status("room-1").is_some());
    }

    #[tokio::test]
    async fn duplicate_start_does_not_spawn_twice() {
        let backend = StdArc::new(CountingInProcess { spawn_count: AtomicUsize::new(0) });

        struct Wrapper(StdArc<CountingInProcess>);
        #[async_trait]
        impl PlacementBackend for Wrapper {
            fn name(&self) -> &'static str {
                "in_process"
            }
            async fn spawn(&self, a: &str, b: &str, c: &Map<String, Value>, d: Option<&str>) -> pailflow_placement::Result<PlacementHandle> {
                self.0.spawn(a, b, c, d).await
            }
            async fn is_running(&self, h: &PlacementHandle) -> bool {
                self.0.is_running(h).await
            }
        }

        let orch = orchestrator_with(Box::new(Wrapper(backend.clone())));
        orch.start_bot("https://meet.example/room-2", "tok", &Map::new(), None, None, None)
            .await
            .unwrap();
        orch.start_bot("https://meet.example/room-2", "tok", &Map::new(), None, None, None)
            .await
            .unwrap();

        assert_eq!(backend.spawn_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_bot_removes_registration() {
        let orch = orchestrator_with(Box::new(CountingInProcess { spawn_count: AtomicUsize::new(0) }));
        orch.start_bot("https://meet.example/room-3", "tok", &Map::new(), None, None, None)
            .await
            .unwrap();
        assert!(orch.stop_bot("room-3").await);
        assert!(orch.get_bot_status("room-3").is_none());
    }

    #[tokio::test]
    async fn placement_failure_with_no_fallback_returns_error() {
        let store = StdArc::new(PailflowStore::open_in_memory(None).unwrap());
        let function: Box<dyn PlacementBackend> = Box::new(FailingBackend("function"));
        let orch = BotSessionOrchestrator::new(store, Some((function, true)), None, Box::new(FailingBackend("in_process")));
        let result = orch
            .start_bot("https://meet.example/room-4", "tok", &Map::new(), None, None, None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn falls_back_to_in_process_when_function_backend_fails() {
        let store = StdArc::new(PailflowStore::open_in_memory(None).unwrap());
        let function: Box<dyn PlacementBackend> = Box::new(FailingBackend("function"));
        let in_process: Box<dyn PlacementBackend> = Box::new(CountingInProcess { spawn_count: AtomicUsize::new(0) });
        let orch = BotSessionOrchestrator::new(store, Some((function, true)), None, in_process);
        orch.start_bot("https://meet.example/room-5", "tok", &Map::new(), None, None, None)
            .await
            .unwrap();
        assert!(orch.is_bot_running("room-5").await);
    }
}
