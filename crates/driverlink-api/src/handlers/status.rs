//! /status handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use driverlink_services::SessionStatus;

use super::ApiState;

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub session: SessionStatus,
    pub pending_notifications: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        session: state.session.status(),
        pending_notifications: state.session.notifications().len(),
    })
}
