//! Navigation collaborator: the only thing the session asks of the UI
//! stack is "go back to the login screen".

pub trait Navigator: Send + Sync {
    fn reset_to_entry_point(&self, route: &str);
}

/// Headless navigator for the daemon. A UI process polls `session_expired`
/// over the local API and does the actual redirect.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn reset_to_entry_point(&self, route: &str) {
        tracing::warn!(route, "session ended, resetting navigation to entry point");
    }
}
