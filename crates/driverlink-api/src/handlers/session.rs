//! /session handlers: imperative entry points into the session actor.
//!
//! Each call only enqueues a command; the response reports acceptance,
//! not the outcome. Poll `/status` for the resulting state.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{session_gone, ApiState};

#[derive(Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

const ACCEPTED: Json<AcceptedResponse> = Json(AcceptedResponse { accepted: true });

// ── /session/token ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TokenRequest {
    pub access: String,
}

pub async fn handle_session_token(
    State(state): State<ApiState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<AcceptedResponse>, (StatusCode, String)> {
    let access = req.access.trim();
    if access.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "access token is empty".to_string()));
    }
    state
        .session
        .accept_external_token(access)
        .await
        .map_err(session_gone)?;
    tracing::info!("access token handed over via API");
    Ok(ACCEPTED)
}

// ── /session/expired/clear ───────────────────────────────────────────────────

pub async fn handle_session_expired_clear(
    State(state): State<ApiState>,
) -> Result<Json<AcceptedResponse>, (StatusCode, String)> {
    state
        .session
        .clear_session_expired()
        .await
        .map_err(session_gone)?;
    Ok(ACCEPTED)
}

// ── /session/connect ─────────────────────────────────────────────────────────

pub async fn handle_session_connect(
    State(state): State<ApiState>,
) -> Result<Json<AcceptedResponse>, (StatusCode, String)> {
    state.session.connect().await.map_err(session_gone)?;
    Ok(ACCEPTED)
}

// ── /session/logout ──────────────────────────────────────────────────────────

pub async fn handle_session_logout(
    State(state): State<ApiState>,
) -> Result<Json<AcceptedResponse>, (StatusCode, String)> {
    state.session.logout().await.map_err(session_gone)?;
    tracing::info!("logout requested via API");
    Ok(ACCEPTED)
}
