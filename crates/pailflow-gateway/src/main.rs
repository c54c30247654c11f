use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pailflow_core::config::PailflowConfig;
use pailflow_store::PailflowStore;
use pailflow_usage::{TransactionStore, UserStore};
use tracing::info;

mod app;
mod auth;
mod http;
mod runtime_stub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pailflow_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("PAILFLOW_CONFIG").ok();
    let config = PailflowConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        PailflowConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let db_path = config.database.path.clone();
    let encryption_key = config.encryption.key.clone();

    let store = Arc::new(PailflowStore::open(&db_path, encryption_key.as_deref())?);
    let users = Arc::new(UserStore::new(rusqlite::Connection::open(&db_path)?)?);
    let transactions = Arc::new(TransactionStore::new(rusqlite::Connection::open(&db_path)?)?);

    let state = Arc::new(app::AppState::new(config, store, users, transactions));
    let router = app::build_router(state.clone());

    spawn_cleanup_loop(state.clone());

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("pailflow gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Background sweep that stops bots running past `cleanup_long_running_bots`'s
/// default threshold (spec.md §4.1), the same interval-driven shape
/// `SchedulerEngine::run` uses for its own tick loop.
fn spawn_cleanup_loop(state: Arc<app::AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let stopped = state.orchestrator.cleanup_long_running_bots(2.0).await;
            if stopped > 0 {
                info!(stopped, "cleanup loop stopped long-running bots");
            }
        }
    });
}
