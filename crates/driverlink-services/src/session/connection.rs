//! Connection state machine.
//!
//! ```text
//! Idle ─► Connecting ─► Open ─► Closed ─► RetryScheduled ─► Connecting …
//!              any ─► Disabled (forced logout, shutdown)
//! ```
//!
//! Every resource that belongs to a state lives inside that state's
//! variant: the transport, republish interval and telemetry guard in
//! `Open`, the retry timer in `RetryScheduled`. Replacing `self.phase`
//! therefore releases them.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

use driverlink_core::wire::decode_inbound;
use driverlink_core::{Backoff, InboundFrame, LocationSample, OutboundFrame};

use crate::navigation::Navigator;
use crate::notifications::{ingest, NotificationStore};
use crate::telemetry::{LocationTelemetry, TelemetryGuard};
use crate::transport::{Connector, Transport, TransportError};

use super::token::TokenManager;
use super::{Command, ConnectionState, SessionDeps, SessionSettings, SessionStatus};

/// Upper bound on a single send or close over an open transport.
pub(super) const TRANSPORT_IO_TIMEOUT: Duration = Duration::from_secs(5);

enum Phase {
    Idle,
    Connecting,
    Open(OpenConnection),
    Closed,
    RetryScheduled(Pin<Box<Sleep>>),
    Disabled,
}

impl Phase {
    fn state(&self) -> ConnectionState {
        match self {
            Self::Idle => ConnectionState::Idle,
            Self::Connecting => ConnectionState::Connecting,
            Self::Open(_) => ConnectionState::Open,
            Self::Closed => ConnectionState::Closed,
            Self::RetryScheduled(_) => ConnectionState::RetryScheduled,
            Self::Disabled => ConnectionState::Disabled,
        }
    }
}

struct OpenConnection {
    transport: Box<dyn Transport>,
    republish: Interval,
    telemetry: TelemetryGuard,
}

enum Event {
    Command(Command),
    CommandsClosed,
    Frame(Option<Result<String, TransportError>>),
    Republish,
    LocationChanged,
    RetryDue,
}

impl From<Option<Command>> for Event {
    fn from(cmd: Option<Command>) -> Self {
        match cmd {
            Some(cmd) => Event::Command(cmd),
            None => Event::CommandsClosed,
        }
    }
}

pub(super) struct SessionActor {
    phase: Phase,
    tokens: TokenManager,
    connector: Arc<dyn Connector>,
    navigator: Arc<dyn Navigator>,
    telemetry: LocationTelemetry,
    location: watch::Receiver<Option<LocationSample>>,
    notifications: NotificationStore,
    backoff: Backoff,
    settings: SessionSettings,
    should_reconnect: bool,
    session_expired: bool,
    status: watch::Sender<SessionStatus>,
    commands: mpsc::Receiver<Command>,
    /// Command that interrupted a handshake, handled on the next turn.
    deferred: Option<Event>,
    redirect: Option<JoinHandle<()>>,
}

impl SessionActor {
    pub(super) fn new(
        deps: SessionDeps,
        settings: SessionSettings,
        notifications: NotificationStore,
        status: watch::Sender<SessionStatus>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        let telemetry = LocationTelemetry::new(deps.location, settings.watch);
        let location = telemetry.subscribe();
        Self {
            phase: Phase::Idle,
            tokens: TokenManager::new(deps.credentials, deps.refresher),
            connector: deps.connector,
            navigator: deps.navigator,
            telemetry,
            location,
            notifications,
            backoff: Backoff::new(settings.retry),
            settings,
            should_reconnect: true,
            session_expired: false,
            status,
            commands,
            deferred: None,
            redirect: None,
        }
    }

    pub(super) async fn run(mut self) {
        self.attempt_connection().await;
        self.publish_status();

        loop {
            match self.next_event().await {
                Event::Command(Command::Shutdown(done)) => {
                    self.teardown().await;
                    let _ = done.send(());
                    break;
                }
                Event::CommandsClosed => {
                    self.teardown().await;
                    break;
                }
                Event::Command(cmd) => self.handle_command(cmd).await,
                Event::Frame(Some(Ok(text))) => self.handle_frame(&text),
                Event::Frame(Some(Err(e))) => {
                    tracing::warn!(error = %e, "session transport failed");
                    self.connection_lost();
                }
                Event::Frame(None) => {
                    tracing::info!("session connection closed by server");
                    self.connection_lost();
                }
                Event::Republish | Event::LocationChanged => self.publish_cached().await,
                Event::RetryDue => self.attempt_connection().await,
            }
            self.publish_status();
        }
        tracing::debug!("session actor stopped");
    }

    async fn next_event(&mut self) -> Event {
        if let Some(event) = self.deferred.take() {
            return event;
        }
        match &mut self.phase {
            Phase::Open(conn) => tokio::select! {
                cmd = self.commands.recv() => Event::from(cmd),
                frame = conn.transport.recv() => Event::Frame(frame),
                _ = conn.republish.tick() => Event::Republish,
                Ok(()) = self.location.changed() => Event::LocationChanged,
            },
            Phase::RetryScheduled(timer) => tokio::select! {
                cmd = self.commands.recv() => Event::from(cmd),
                () = timer.as_mut() => Event::RetryDue,
            },
            _ => Event::from(self.commands.recv().await),
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.attempt_connection().await,
            Command::AcceptToken(token) => self.accept_token(token).await,
            Command::ClearSessionExpired => self.clear_session_expired(),
            Command::Logout => self.force_logout().await,
            // Handled by the run loop.
            Command::Shutdown(_) => {}
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    async fn attempt_connection(&mut self) {
        match self.phase {
            Phase::Disabled => {
                tracing::debug!("reconnection disabled, connect ignored");
                return;
            }
            Phase::Connecting | Phase::Open(_) => return,
            _ => {}
        }

        self.release_phase().await;
        self.phase = Phase::Connecting;
        self.publish_status();

        match self.tokens.valid_token().await {
            Ok(token) => self.open_with(token).await,
            Err(e) => {
                tracing::warn!(error = %e, "no usable access token");
                self.force_logout().await;
            }
        }
    }

    /// Handshake with `token`. Commands that arrive meanwhile are served
    /// without waiting for the handshake to finish.
    async fn open_with(&mut self, token: String) {
        self.release_phase().await;
        self.phase = Phase::Connecting;
        self.publish_status();

        let connector = self.connector.clone();
        tracing::debug!(attempt = self.backoff.attempt(), "opening session connection");
        let mut connect = connector.connect(&token);

        let outcome = loop {
            tokio::select! {
                res = &mut connect => break Some(res),
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Connect) => {}
                    Some(Command::ClearSessionExpired) => {
                        self.clear_session_expired();
                        self.publish_status();
                    }
                    other => {
                        self.deferred = Some(Event::from(other));
                        break None;
                    }
                },
            }
        };

        let transport = match outcome {
            Some(Ok(transport)) => transport,
            Some(Err(e)) => {
                tracing::warn!(error = %e, attempt = self.backoff.attempt(), "connection attempt failed");
                self.phase = Phase::Closed;
                self.schedule_retry();
                return;
            }
            None => {
                tracing::debug!("connection attempt interrupted");
                self.phase = Phase::Closed;
                return;
            }
        };

        self.backoff.reset();
        self.location.borrow_and_update();

        let period = self.settings.republish_interval;
        let mut republish = tokio::time::interval_at(Instant::now() + period, period);
        republish.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.phase = Phase::Open(OpenConnection {
            transport,
            republish,
            telemetry: self.telemetry.start(),
        });
        tracing::info!("session connected");
    }

    fn connection_lost(&mut self) {
        self.phase = Phase::Closed;
        self.schedule_retry();
    }

    /// Arm the retry timer. Replaces any timer already armed.
    fn schedule_retry(&mut self) {
        if !self.should_reconnect {
            return;
        }
        let attempt = self.backoff.attempt();
        let delay = self.backoff.next_delay();
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        self.phase = Phase::RetryScheduled(Box::pin(tokio::time::sleep(delay)));
    }

    async fn accept_token(&mut self, token: String) {
        tracing::info!("external access token accepted");
        if let Some(redirect) = self.redirect.take() {
            redirect.abort();
        }
        self.backoff.reset();
        self.session_expired = false;
        self.should_reconnect = true;
        self.release_phase().await;
        self.tokens.adopt(&token).await;
        self.open_with(token).await;
    }

    fn clear_session_expired(&mut self) {
        self.session_expired = false;
    }

    /// The single escalation point for authentication failures.
    async fn force_logout(&mut self) {
        if matches!(self.phase, Phase::Disabled) && self.session_expired {
            tracing::debug!("already logged out");
            return;
        }

        self.should_reconnect = false;
        self.release_phase().await;
        self.phase = Phase::Disabled;

        if let Err(e) = self.tokens.clear().await {
            tracing::warn!(error = %e, "failed to clear stored credentials");
        }
        self.session_expired = true;
        self.publish_status();
        tracing::warn!("session expired, reconnection disabled");

        let navigator = self.navigator.clone();
        let route = self.settings.login_route.clone();
        let delay = self.settings.logout_redirect_delay;
        let redirect = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.reset_to_entry_point(&route);
        });
        if let Some(previous) = self.redirect.replace(redirect) {
            previous.abort();
        }
    }

    async fn teardown(&mut self) {
        self.should_reconnect = false;
        self.release_phase().await;
        self.phase = Phase::Disabled;
        if let Some(redirect) = self.redirect.take() {
            redirect.abort();
        }
        self.publish_status();
        tracing::info!("session torn down");
    }

    /// Leave the current phase, closing an open transport politely.
    /// Leaves the actor in `Closed`; callers pick the next phase.
    async fn release_phase(&mut self) {
        if let Phase::Open(mut conn) = std::mem::replace(&mut self.phase, Phase::Closed) {
            conn.telemetry.stop();
            if tokio::time::timeout(TRANSPORT_IO_TIMEOUT, conn.transport.close())
                .await
                .is_err()
            {
                tracing::warn!("transport close timed out, dropping connection");
            }
        }
    }

    // ── Traffic ───────────────────────────────────────────────────────────────

    fn handle_frame(&mut self, text: &str) {
        match decode_inbound(text) {
            Ok(InboundFrame::Notify { event }) => {
                if !event.is_ride_request() {
                    tracing::debug!(
                        notification_type = %event.notification_type,
                        "ignoring notification"
                    );
                    return;
                }
                if let Some(notification) = ingest(&event) {
                    self.notifications.add(notification);
                }
            }
            Ok(InboundFrame::Subscribed) => tracing::debug!("subscription acknowledged"),
            Ok(InboundFrame::Unknown) => tracing::debug!("ignoring unknown frame type"),
            Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
        }
    }

    /// Send the cached sample if there is one and the socket is open.
    /// Nothing is queued while closed.
    async fn publish_cached(&mut self) {
        let cached = *self.location.borrow_and_update();
        let Some(sample) = cached else {
            return;
        };
        let Phase::Open(conn) = &mut self.phase else {
            return;
        };
        let frame = OutboundFrame::LocationUpdate(sample);
        match tokio::time::timeout(TRANSPORT_IO_TIMEOUT, conn.transport.send(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "location update not sent"),
            Err(_) => {
                tracing::warn!("location update stalled, dropping connection");
                self.connection_lost();
            }
        }
    }

    fn publish_status(&self) {
        let next = SessionStatus {
            state: self.phase.state(),
            is_connected: matches!(self.phase, Phase::Open(_)),
            session_expired: self.session_expired,
            should_reconnect: self.should_reconnect,
            has_token: self.tokens.current().is_some(),
            retry_attempt: self.backoff.attempt(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
