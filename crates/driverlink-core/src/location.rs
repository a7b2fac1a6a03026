//! Location samples carried by telemetry frames.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One device position fix.
///
/// Wire: the `data` object of a `location_update` frame, `{ "lat", "long" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub long: f64,
}

impl LocationSample {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }
}

/// Thresholds for a change-triggered position watch. The device only
/// reports a new fix once both have been exceeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(5),
            min_distance_m: 50.0,
        }
    }
}
