//! driverlink-core: shared types, wire frames, token claims, and retry policy.
//! All other DriverLink crates depend on this one.

pub mod config;
pub mod location;
pub mod notification;
pub mod retry;
pub mod token;
pub mod wire;

pub use location::{LocationSample, WatchOptions};
pub use notification::{ExtractError, RideNotification};
pub use retry::{Backoff, RetryPolicy};
pub use wire::{InboundFrame, OutboundFrame, RideEvent};
