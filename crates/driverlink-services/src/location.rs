//! Device location collaborator.
//!
//! Mirrors what a mobile geolocation API offers: a foreground permission
//! prompt, a one-shot position read, and a change-triggered watch.

use async_trait::async_trait;
use tokio::sync::mpsc;

use driverlink_core::{LocationSample, WatchOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("no position fix available")]
    Unavailable,
    #[error("position watch could not be started: {0}")]
    Watch(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_foreground_permission(&self) -> Permission;

    async fn current_position(&self) -> Result<LocationSample, LocationError>;

    /// Start a change-triggered watch. Dropping the returned
    /// [`LocationWatch`] removes the subscription.
    async fn watch_position(&self, options: WatchOptions) -> Result<LocationWatch, LocationError>;
}

/// Subscription handle for a position watch.
pub struct LocationWatch {
    rx: mpsc::Receiver<LocationSample>,
}

impl LocationWatch {
    pub fn new(rx: mpsc::Receiver<LocationSample>) -> Self {
        Self { rx }
    }

    /// Next sample, or `None` once the provider ends the watch.
    pub async fn next(&mut self) -> Option<LocationSample> {
        self.rx.recv().await
    }
}

/// Reports a single configured position and never moves.
///
/// Permission is denied when no position is configured, which leaves
/// telemetry disabled without affecting the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocationProvider {
    sample: Option<LocationSample>,
}

impl FixedLocationProvider {
    pub fn new(sample: Option<LocationSample>) -> Self {
        Self { sample }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn request_foreground_permission(&self) -> Permission {
        if self.sample.is_some() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn current_position(&self) -> Result<LocationSample, LocationError> {
        self.sample.ok_or(LocationError::Unavailable)
    }

    async fn watch_position(&self, _options: WatchOptions) -> Result<LocationWatch, LocationError> {
        // A stationary device never crosses the distance threshold, so the
        // watch stays silent until the subscriber goes away.
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move { tx.closed().await });
        Ok(LocationWatch::new(rx))
    }
}
