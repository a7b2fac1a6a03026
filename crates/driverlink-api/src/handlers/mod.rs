//! HTTP API handlers: exposes the driver session to a local UI process.

pub mod notifications;
pub mod session;
pub mod status;

use axum::http::StatusCode;

use driverlink_services::{SessionClosed, SessionHandle};

#[derive(Clone)]
pub struct ApiState {
    pub session: SessionHandle,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// A stopped session actor is reported as 503 so the UI can retry later.
fn session_gone(e: SessionClosed) -> (StatusCode, String) {
    (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}

pub use notifications::{
    handle_notification_dismiss, handle_notifications, handle_notifications_clear,
};
pub use session::{
    handle_session_connect, handle_session_expired_clear, handle_session_logout,
    handle_session_token,
};
pub use status::handle_status;
