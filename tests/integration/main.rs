//! DriverLink integration test harness.
//!
//! Every test runs a real local backend (a WebSocket server plus an HTTP
//! refresh endpoint, both on 127.0.0.1 ephemeral ports) and a real session
//! wired with the production collaborators: file credential store, HTTP
//! refresher and WebSocket connector.
//!
//!   cargo test --test integration

mod api;
mod session;

pub use infra::*;
