use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pailflow_core::types::WorkflowThreadId;
use pailflow_workflow::{resume_or_fallback, ResumeContext};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::app::AppState;
use crate::auth::AuthenticatedKey;

#[derive(Deserialize)]
pub struct ExecuteWorkflowRequest {
    pub message: String,
}

/// `POST /v1/workflows/{name}/execute` (spec.md §6, "illustrative name" —
/// generic workflow invocation). This core exposes exactly one named
/// workflow, `resume`, whose `message` carries the `workflow_thread_id` to
/// resume (spec.md §4.3); any other name is rejected with 404.
pub async fn execute_workflow(
    State(state): State<Arc<AppState>>,
    axum::Extension(_auth): axum::Extension<AuthenticatedKey>,
    Path(name): Path<String>,
    Json(req): Json<ExecuteWorkflowRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if name != "resume" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("unknown workflow '{name}'")})),
        ));
    }

    let thread_id = WorkflowThreadId::from(req.message.as_str());
    let ctx = ResumeContext {
        store: &state.store,
        users: &state.users,
        transactions: &state.transactions,
        llm: state.llm.as_ref(),
        http_client: &state.http_client,
        email_sender: state.email_sender.as_deref(),
        rate_per_minute: state.config.placement.bot_call_rate_per_minute,
    };

    resume_or_fallback(state.store.checkpoints.as_ref(), &ctx, &thread_id)
        .await
        .map_err(|e| {
            warn!(error = %e, "workflow execution failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()})))
        })?;

    Ok(Json(json!({"success": true, "workflow_thread_id": thread_id.as_str()})))
}
