use std::sync::Arc;

use pailflow_core::config::PailflowConfig;
use pailflow_orchestrator::{BotSessionOrchestrator, SessionRequest, SessionRuntime};
use pailflow_pipeline::{RoomQuery, WorkflowResumer};
use pailflow_placement::{FunctionBackend, InProcessBackend, PlacementBackend, VmBackend, WorkerFuture};
use pailflow_postcall::insights::InsightsLlm;
use pailflow_postcall::EmailSender;
use pailflow_store::PailflowStore;
use pailflow_usage::{TransactionStore, UserStore};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::runtime_stub::{NullInsightsLlm, NullSessionRuntime};

/// Central shared state — passed as `Arc<AppState>` to every Axum handler,
/// the same layout `skynet_gateway::app::AppState` uses to bundle its
/// subsystem managers behind one struct.
pub struct AppState {
    pub config: PailflowConfig,
    pub store: Arc<PailflowStore>,
    pub users: Arc<UserStore>,
    pub transactions: Arc<TransactionStore>,
    pub orchestrator: Arc<BotSessionOrchestrator>,
    pub llm: Arc<dyn InsightsLlm>,
    pub email_sender: Option<Arc<dyn EmailSender>>,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Wires the orchestrator's backend fallback list from `config.placement`
    /// (spec.md §4.1 "Backend selection" — Function and VM only appear when
    /// their config block is present) and an `InProcessBackend` whose worker
    /// factory assembles a [`pailflow_orchestrator::BotWorker`] per spawn.
    pub fn new(
        config: PailflowConfig,
        store: Arc<PailflowStore>,
        users: Arc<UserStore>,
        transactions: Arc<TransactionStore>,
    ) -> Self {
        let rate_per_minute = config.placement.bot_call_rate_per_minute;

        let function_backend = config.placement.function.clone().map(|cfg| {
            let configured = FunctionBackend::is_configured(&cfg);
            let backend: Box<dyn PlacementBackend> = Box::new(FunctionBackend::new(cfg));
            (backend, configured)
        });
        let vm_backend = config.placement.vm.clone().map(|cfg| {
            let configured = !cfg.api_host.is_empty() && !cfg.app_name.is_empty();
            let backend: Box<dyn PlacementBackend> = Box::new(VmBackend::new(cfg));
            (backend, configured)
        });

        let worker_store = store.clone();
        let worker_users = users.clone();
        let worker_transactions = transactions.clone();
        let factory: pailflow_placement::WorkerFactory = Arc::new(move |request| {
            let store = worker_store.clone();
            let users = worker_users.clone();
            let transactions = worker_transactions.clone();
            Box::pin(async move {
                let worker = pailflow_orchestrator::BotWorker {
                    store,
                    users,
                    transactions,
                    rate_per_minute,
                };
                let room_name = request
                    .room_url
                    .rsplit('/')
                    .next()
                    .unwrap_or(&request.room_url)
                    .to_string();
                let session_request = SessionRequest {
                    room_name: room_name.clone(),
                    room_url: request.room_url,
                    token: request.token,
                    bot_config: request.bot_config,
                    workflow_thread_id: request
                        .workflow_thread_id
                        .map(|id| pailflow_core::types::WorkflowThreadId::from(id.as_str()))
                        .unwrap_or_default(),
                };
                let runtime: Arc<dyn SessionRuntime> = Arc::new(NullSessionRuntime);
                let room: Arc<dyn RoomQuery> = Arc::new(NoopRoom);
                let resumer: Arc<dyn WorkflowResumer> = Arc::new(NoopResumer);
                worker
                    .run_to_completion(runtime, session_request, room, resumer, CancellationToken::new())
                    .await;
            }) as WorkerFuture
        });
        let in_process_backend: Box<dyn PlacementBackend> = Box::new(InProcessBackend::new(factory));

        let orchestrator = Arc::new(BotSessionOrchestrator::new(
            store.clone(),
            function_backend,
            vm_backend,
            in_process_backend,
        ));

        Self {
            config,
            store,
            users,
            transactions,
            orchestrator,
            llm: Arc::new(NullInsightsLlm),
            email_sender: None,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Placeholder `RoomQuery` for sessions with no real transport wired — see
/// `runtime_stub::NullSessionRuntime`'s doc comment for why this exists.
struct NoopRoom;

#[async_trait::async_trait]
impl RoomQuery for NoopRoom {
    async fn participant_count(&self) -> usize {
        0
    }

    async fn leave(&self, _timeout_ms: u64) -> pailflow_pipeline::Result<()> {
        Ok(())
    }
}

struct NoopResumer;

#[async_trait::async_trait]
impl WorkflowResumer for NoopResumer {
    async fn resume(&self, _workflow_thread_id: &str) -> pailflow_pipeline::Result<()> {
        Ok(())
    }

    async fn run_post_call(&self, _workflow_thread_id: &str) -> pailflow_pipeline::Result<()> {
        Ok(())
    }
}

/// Assembles the full Axum router (spec.md §6 "HTTP surface").
pub fn build_router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};
    use axum::Router;

    let protected = Router::new()
        .route("/v1/bots/join", post(crate::http::bots::join_bot))
        .route("/v1/bots/{bot_id}/status", get(crate::http::bots::bot_status))
        .route(
            "/v1/workflows/{name}/execute",
            post(crate::http::workflows::execute_workflow),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/meet/{room_name}", get(crate::http::meet::meet_page))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
