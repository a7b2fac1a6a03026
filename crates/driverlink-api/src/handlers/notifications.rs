//! /notifications handlers: the driver's pending ride offers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use driverlink_core::RideNotification;

use super::ApiState;

// ── /notifications ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<RideNotification>,
}

pub async fn handle_notifications(State(state): State<ApiState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        notifications: state.session.notifications().list(),
    })
}

// ── /notifications/{ride_id} (DELETE) ────────────────────────────────────────

#[derive(Serialize)]
pub struct DismissResponse {
    pub ride_id: String,
    pub removed: bool,
}

pub async fn handle_notification_dismiss(
    State(state): State<ApiState>,
    Path(ride_id): Path<String>,
) -> Json<DismissResponse> {
    let removed = state.session.notifications().remove(&ride_id);
    if removed {
        tracing::info!(ride_id = %ride_id, "notification dismissed via API");
    }
    Json(DismissResponse { ride_id, removed })
}

// ── /notifications/clear ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

pub async fn handle_notifications_clear(State(state): State<ApiState>) -> Json<ClearResponse> {
    let cleared = state.session.notifications().clear();
    tracing::info!(cleared, "notifications cleared via API");
    Json(ClearResponse { cleared })
}
