pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/notifications", get(handlers::handle_notifications))
        .route(
            "/notifications/{ride_id}",
            delete(handlers::handle_notification_dismiss),
        )
        .route("/notifications/clear", post(handlers::handle_notifications_clear))
        .route("/session/token", post(handlers::handle_session_token))
        .route(
            "/session/expired/clear",
            post(handlers::handle_session_expired_clear),
        )
        .route("/session/connect", post(handlers::handle_session_connect))
        .route("/session/logout", post(handlers::handle_session_logout))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
