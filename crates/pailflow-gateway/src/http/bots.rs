use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pailflow_core::types::{BotId, WorkflowThread};
use pailflow_usage::{has_sufficient_credits, DEFAULT_MIN_CREDITS};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::AuthenticatedKey;

#[derive(Deserialize)]
pub struct JoinBotRequest {
    pub provider: Option<String>,
    pub room_url: String,
    pub token: Option<String>,
    #[serde(default)]
    pub bot_config: serde_json::Map<String, Value>,
    pub process_insights: Option<bool>,
    pub email: Option<String>,
    pub analysis_prompt: Option<String>,
    pub summary_format_prompt: Option<String>,
    pub webhook_callback_url: Option<String>,
}

/// `POST /v1/bots/join` (spec.md §6) — runs the admission check, creates the
/// workflow thread, then hands placement to
/// [`pailflow_orchestrator::BotSessionOrchestrator::start_bot`].
pub async fn join_bot(
    State(state): State<Arc<AppState>>,
    axum::Extension(auth): axum::Extension<AuthenticatedKey>,
    Json(req): Json<JoinBotRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (has_credits, balance) =
        has_sufficient_credits(&state.users, &auth.unkey_key_id, Some(DEFAULT_MIN_CREDITS)).map_err(|e| {
            warn!(error = %e, "admission check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"})))
        })?;

    if !has_credits {
        return Err((
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({"error": "insufficient_credits", "balance": balance})),
        ));
    }

    let mut thread = WorkflowThread::new(
        req.room_url.rsplit('/').next().unwrap_or(&req.room_url).to_string(),
        req.room_url.clone(),
    );
    thread.bot_config = req.bot_config.clone();
    thread.unkey_key_id = Some(auth.unkey_key_id.clone());
    thread.webhook_callback_url = req.webhook_callback_url.clone();
    thread.email_results_to = req.email.clone();
    if let Some(prompt) = &req.analysis_prompt {
        thread.metadata.insert("analysis_prompt".to_string(), json!(prompt));
    }
    if let Some(prompt) = &req.summary_format_prompt {
        thread.metadata.insert("summary_format_prompt".to_string(), json!(prompt));
    }
    if let Some(process_insights) = req.process_insights {
        thread
            .bot_config
            .insert("process_insights".to_string(), json!(process_insights));
    }
    if let Some(provider) = &req.provider {
        thread.metadata.insert("provider".to_string(), json!(provider));
    }

    state.store.workflow_threads.create(&thread).map_err(|e| {
        warn!(error = %e, "failed to persist workflow thread");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"})))
    })?;

    let bot_id = BotId::new();
    state
        .store
        .bot_sessions
        .create(&bot_id, &thread.workflow_thread_id)
        .map_err(|e| {
            warn!(error = %e, "failed to create bot session row");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"})))
        })?;

    state
        .orchestrator
        .start_bot(
            &req.room_url,
            req.token.as_deref().unwrap_or(""),
            &thread.bot_config,
            Some(&thread.room_name),
            None,
            Some(thread.workflow_thread_id.clone()),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "placement failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()})))
        })?;

    info!(bot_id = %bot_id, workflow_thread_id = %thread.workflow_thread_id, "bot joined");
    Ok(Json(json!({
        "success": true,
        "bot_id": bot_id.as_str(),
        "workflow_thread_id": thread.workflow_thread_id.as_str(),
    })))
}

/// `GET /v1/bots/{bot_id}/status` (spec.md §6).
pub async fn bot_status(
    State(state): State<Arc<AppState>>,
    axum::Extension(_auth): axum::Extension<AuthenticatedKey>,
    Path(bot_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let bot_id = BotId::from(bot_id.as_str());
    let session = state.store.bot_sessions.get(&bot_id).map_err(|e| {
        warn!(error = %e, "failed to load bot session");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"})))
    })?;

    let Some(session) = session else {
        return Err((StatusCode::NOT_FOUND, Json(json!({"error": "bot not found"}))));
    };

    Ok(Json(json!({
        "bot_id": session.bot_id.as_str(),
        "status": session.status.to_string(),
        "started_at": session.started_at,
        "completed_at": session.completed_at,
        "transcript_text": session.transcript_text,
        "qa_pairs": session.qa_pairs,
        "insights": session.insights,
        "error": session.error,
    })))
}

