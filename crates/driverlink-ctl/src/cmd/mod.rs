//! CLI command modules.

pub mod http;
pub mod notifications;
pub mod session;
pub mod status;
