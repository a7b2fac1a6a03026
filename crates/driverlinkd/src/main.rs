//! driverlinkd: driver session daemon.
//!
//! Keeps the driver's real-time session to the backend alive and serves its
//! state to the local UI over HTTP.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use driverlink_core::config::DriverLinkConfig;
use driverlink_core::LocationSample;
use driverlink_services::{
    DriverSession, FileCredentialStore, FixedLocationProvider, HttpTokenRefresher,
    LoggingNavigator, SessionDeps, SessionSettings, WebSocketConnector,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = DriverLinkConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = DriverLinkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        DriverLinkConfig::default()
    });
    tracing::info!(socket_url = %config.server.socket_url, "driverlinkd starting");

    // Collaborators
    let credentials = FileCredentialStore::open(&config.credentials.path)
        .await
        .with_context(|| {
            format!(
                "failed to open credential store at {}",
                config.credentials.path.display()
            )
        })?;
    tracing::info!(path = %credentials.path().display(), "credential store ready");

    let refresher = HttpTokenRefresher::new(
        config.server.refresh_url.clone(),
        Duration::from_secs(config.server.refresh_timeout_secs),
    )
    .context("failed to build refresh client")?;

    let connector = WebSocketConnector::new(
        &config.server.socket_url,
        config.session.connect_timeout(),
    )
    .context("invalid server.socket_url")?;

    let fixed_position = match (config.location.lat, config.location.long) {
        (Some(lat), Some(long)) => Some(LocationSample::new(lat, long)),
        _ => {
            tracing::warn!("no location configured, telemetry will stay off");
            None
        }
    };

    let deps = SessionDeps {
        credentials: Arc::new(credentials),
        refresher: Arc::new(refresher),
        connector: Arc::new(connector),
        location: Arc::new(FixedLocationProvider::new(fixed_position)),
        navigator: Arc::new(LoggingNavigator),
    };

    // Session
    let session = DriverSession::start(deps, SessionSettings::from_config(&config));

    // Local API
    let state = driverlink_api::ApiState {
        session: session.handle(),
    };
    let api_port = config.api.port;
    let api_task = tokio::spawn(async move {
        if let Err(e) = driverlink_api::serve(state, api_port).await {
            tracing::error!(error = %e, "API server failed");
        }
    });

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        r = tokio::signal::ctrl_c() => match r {
            Ok(()) => tracing::info!("shutting down"),
            Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
        },
        r = api_task => tracing::error!("API task exited: {:?}", r),
    }

    session.stop().await;
    Ok(())
}
