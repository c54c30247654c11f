//! Bearer-auth middleware (spec.md §6 "Authentication contract"), grounded
//! on `skynet_gateway`'s `auth` module shape: check the `Authorization`
//! header, resolve the caller, stash the result on the request for
//! downstream handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::app::AppState;

/// Stashed in request extensions on a successful auth check so downstream
/// handlers can resolve the caller's usage/credit row.
#[derive(Debug, Clone)]
pub struct AuthenticatedKey {
    pub unkey_key_id: String,
}

#[derive(Deserialize)]
struct VerifyResponse {
    unkey_key_id: String,
}

fn unauthorized(reason: &str) -> Response {
    warn!(reason, "bearer auth failed");
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized", "reason": reason}))).into_response()
}

/// Applied to every route under `/v1` (spec.md §6: "Bearer-authenticated
/// unless noted" — `/health` and `/meet/{room_name}` are the exceptions and
/// sit outside this layer).
pub async fn require_bearer_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return unauthorized("missing Authorization: Bearer <token> header");
    };

    let unkey_key_id = match &state.config.gateway.auth.verify_url {
        Some(verify_url) => match verify_with_service(&state.http_client, verify_url, token).await {
            Ok(id) => id,
            Err(reason) => return unauthorized(&reason),
        },
        None => match &state.config.gateway.auth.token {
            Some(expected) if expected == token => token.to_string(),
            Some(_) => return unauthorized("token mismatch"),
            None => return unauthorized("no local token or verification service configured"),
        },
    };

    request
        .extensions_mut()
        .insert(AuthenticatedKey { unkey_key_id });
    next.run(request).await
}

async fn verify_with_service(client: &reqwest::Client, verify_url: &str, token: &str) -> Result<String, String> {
    let res = client
        .post(verify_url)
        .json(&json!({"token": token}))
        .send()
        .await
        .map_err(|e| format!("verification service unreachable: {e}"))?;

    if !res.status().is_success() {
        return Err(format!("verification service returned {}", res.status()));
    }

    let body: VerifyResponse = res
        .json()
        .await
        .map_err(|e| format!("verification service returned an unexpected body: {e}"))?;
    Ok(body.unkey_key_id)
}
