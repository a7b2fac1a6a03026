//! Location telemetry publisher.
//!
//! Keeps the latest position in a `watch` cache. The session actor reads
//! the cache whenever it changes (opportunistic publish) and again on its
//! own republish interval, so a stationary driver still reports a position
//! every few seconds. Telemetry is best-effort: a denied permission or a
//! failed read stops it quietly and never touches the connection.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use driverlink_core::{LocationSample, WatchOptions};

use crate::location::{LocationProvider, Permission};

pub struct LocationTelemetry {
    provider: Arc<dyn LocationProvider>,
    options: WatchOptions,
    cache: Arc<watch::Sender<Option<LocationSample>>>,
}

impl LocationTelemetry {
    pub fn new(provider: Arc<dyn LocationProvider>, options: WatchOptions) -> Self {
        let (cache, _) = watch::channel(None);
        Self {
            provider,
            options,
            cache: Arc::new(cache),
        }
    }

    /// Receiver for the cached latest sample.
    pub fn subscribe(&self) -> watch::Receiver<Option<LocationSample>> {
        self.cache.subscribe()
    }

    pub fn latest(&self) -> Option<LocationSample> {
        *self.cache.borrow()
    }

    /// Start acquiring positions. The returned guard stops the watch when
    /// dropped or when [`TelemetryGuard::stop`] is called.
    pub fn start(&self) -> TelemetryGuard {
        let provider = self.provider.clone();
        let options = self.options;
        let cache = self.cache.clone();
        TelemetryGuard {
            task: Some(tokio::spawn(run(provider, options, cache))),
        }
    }
}

async fn run(
    provider: Arc<dyn LocationProvider>,
    options: WatchOptions,
    cache: Arc<watch::Sender<Option<LocationSample>>>,
) {
    if provider.request_foreground_permission().await == Permission::Denied {
        tracing::warn!("location permission denied, telemetry disabled");
        return;
    }

    match provider.current_position().await {
        Ok(sample) => {
            tracing::debug!(lat = sample.lat, long = sample.long, "initial position");
            cache.send_replace(Some(sample));
        }
        Err(e) => tracing::warn!(error = %e, "initial position read failed"),
    }

    let mut watch = match provider.watch_position(options).await {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(error = %e, "position watch unavailable, telemetry disabled");
            return;
        }
    };

    while let Some(sample) = watch.next().await {
        tracing::trace!(lat = sample.lat, long = sample.long, "position changed");
        cache.send_replace(Some(sample));
    }
    tracing::debug!("position watch ended");
}

/// Running telemetry. Aborts the watch task on drop.
pub struct TelemetryGuard {
    task: Option<JoinHandle<()>>,
}

impl TelemetryGuard {
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        self.abort();
    }
}
