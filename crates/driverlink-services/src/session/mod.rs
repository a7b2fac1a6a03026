//! Driver session: the façade over the connection actor.
//!
//! [`DriverSession::start`] spawns one actor task that owns the connection,
//! the retry timer, the republish interval and the telemetry watch. Callers
//! talk to it through a cloneable [`SessionHandle`]: commands go in over an
//! mpsc channel, state comes back out as a `watch` snapshot.

mod connection;
mod token;


use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use driverlink_core::config::DriverLinkConfig;
use driverlink_core::{RetryPolicy, WatchOptions};

use crate::credentials::CredentialStore;
use crate::location::LocationProvider;
use crate::navigation::Navigator;
use crate::notifications::NotificationStore;
use crate::refresh::TokenRefresher;
use crate::transport::Connector;

use connection::SessionActor;

pub use token::{AuthError, TokenManager};

const COMMAND_QUEUE: usize = 32;

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub retry: RetryPolicy,
    pub republish_interval: Duration,
    pub logout_redirect_delay: Duration,
    pub login_route: String,
    pub watch: WatchOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            republish_interval: Duration::from_secs(5),
            logout_redirect_delay: Duration::from_millis(300),
            login_route: "Login".to_string(),
            watch: WatchOptions::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &DriverLinkConfig) -> Self {
        Self {
            retry: config.session.retry_policy(),
            republish_interval: Duration::from_secs(config.session.republish_interval_secs),
            logout_redirect_delay: Duration::from_millis(config.session.logout_redirect_delay_ms),
            login_route: config.session.login_route.clone(),
            watch: config.location.watch_options(),
        }
    }
}

/// Collaborators the session is wired to.
#[derive(Clone)]
pub struct SessionDeps {
    pub credentials: Arc<dyn CredentialStore>,
    pub refresher: Arc<dyn TokenRefresher>,
    pub connector: Arc<dyn Connector>,
    pub location: Arc<dyn LocationProvider>,
    pub navigator: Arc<dyn Navigator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    RetryScheduled,
    /// Reconnection is off until a new token is accepted.
    Disabled,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::RetryScheduled => "retry_scheduled",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the session, published after every actor step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub session_expired: bool,
    pub should_reconnect: bool,
    pub has_token: bool,
    pub retry_attempt: u32,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
            is_connected: false,
            session_expired: false,
            should_reconnect: true,
            has_token: false,
            retry_attempt: 0,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    AcceptToken(String),
    ClearSessionExpired,
    Logout,
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("session has shut down")]
pub struct SessionClosed;

/// Cloneable command half of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
    notifications: NotificationStore,
}

impl SessionHandle {
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    /// A token obtained elsewhere (fresh login). Re-enables reconnection
    /// and opens a new connection with it straight away.
    pub async fn accept_external_token(&self, token: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::AcceptToken(token.into())).await
    }

    pub async fn clear_session_expired(&self) -> Result<(), SessionClosed> {
        self.send(Command::ClearSessionExpired).await
    }

    /// Try to connect now. Ignored while connected or disabled.
    pub async fn connect(&self) -> Result<(), SessionClosed> {
        self.send(Command::Connect).await
    }

    /// Forced logout: credentials wiped, reconnection disabled.
    pub async fn logout(&self) -> Result<(), SessionClosed> {
        self.send(Command::Logout).await
    }

    /// Tear the session down and wait for the actor to release everything.
    /// Calling it on an already stopped session is fine.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }
}

/// A running session. Derefs to its [`SessionHandle`].
pub struct DriverSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl DriverSession {
    /// Spawn the actor and make the first connection attempt.
    pub fn start(deps: SessionDeps, settings: SessionSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());
        let notifications = NotificationStore::new();

        let actor = SessionActor::new(deps, settings, notifications.clone(), status_tx, cmd_rx);
        let task = tokio::spawn(actor.run());

        Self {
            handle: SessionHandle {
                commands: cmd_tx,
                status: status_rx,
                notifications,
            },
            task,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Shut down and join the actor task.
    pub async fn stop(self) {
        self.handle.shutdown().await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "session task failed");
        }
    }
}

impl Deref for DriverSession {
    type Target = SessionHandle;

    fn deref(&self) -> &SessionHandle {
        &self.handle
    }
}
