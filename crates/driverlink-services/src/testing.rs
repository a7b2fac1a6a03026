//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite;

use driverlink_core::{LocationSample, OutboundFrame, WatchOptions};

use crate::credentials::{CredentialError, CredentialStore, MemoryCredentialStore};
use crate::location::{LocationError, LocationProvider, LocationWatch, Permission};
use crate::navigation::Navigator;
use crate::refresh::{RefreshError, TokenRefresher};
use crate::transport::{Connector, Transport, TransportError};

/// Unsigned JWT whose `exp` is `secs` from now (negative = already expired).
pub fn jwt_expiring_in(secs: i64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, now + secs));
    format!("{header}.{claims}.sig")
}

// ── Refresher ────────────────────────────────────────────────────────────────

pub struct StaticRefresher {
    outcome: Result<String, u16>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StaticRefresher {
    pub fn ok(access: &str) -> Self {
        Self::with(Ok(access.to_string()))
    }

    pub fn status(code: u16) -> Self {
        Self::with(Err(code))
    }

    fn with(outcome: Result<String, u16>) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn seen_refresh_tokens(&self) -> Arc<Mutex<Vec<String>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl TokenRefresher for StaticRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(refresh_token.to_string());
        match &self.outcome {
            Ok(access) => Ok(access.clone()),
            Err(code) => Err(RefreshError::Status(
                reqwest::StatusCode::from_u16(*code).unwrap(),
            )),
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────────

/// Reads and removes go through to `inner`; every write fails.
pub struct ReadOnlyStore {
    inner: MemoryCredentialStore,
}

impl ReadOnlyStore {
    pub fn new(inner: MemoryCredentialStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CredentialStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CredentialError> {
        Err(CredentialError::Write(
            std::path::PathBuf::from("credentials.json"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        ))
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), CredentialError> {
        self.inner.remove_many(keys).await
    }
}

// ── Navigator ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<(Instant, String)>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn first_at(&self) -> Option<Instant> {
        self.routes.lock().unwrap().first().map(|(at, _)| *at)
    }
}

impl Navigator for RecordingNavigator {
    fn reset_to_entry_point(&self, route: &str) {
        self.routes.lock().unwrap().push((Instant::now(), route.to_string()));
    }
}

// ── Location ─────────────────────────────────────────────────────────────────

pub struct ScriptedLocation {
    permission: Permission,
    initial: Option<LocationSample>,
    watch_tx: Mutex<Option<mpsc::Sender<LocationSample>>>,
    watches: watch::Sender<usize>,
}

impl ScriptedLocation {
    pub fn granted(initial: LocationSample) -> Self {
        Self::with(Permission::Granted, Some(initial))
    }

    pub fn denied() -> Self {
        Self::with(Permission::Denied, None)
    }

    fn with(permission: Permission, initial: Option<LocationSample>) -> Self {
        let (watches, _) = watch::channel(0);
        Self {
            permission,
            initial,
            watch_tx: Mutex::new(None),
            watches,
        }
    }

    pub fn watch_count(&self) -> usize {
        *self.watches.borrow()
    }

    pub async fn wait_for_watch(&self) {
        let mut rx = self.watches.subscribe();
        rx.wait_for(|n| *n > 0).await.unwrap();
    }

    /// Deliver a sample on the current watch.
    pub async fn push(&self, sample: LocationSample) {
        let tx = self.watch_tx.lock().unwrap().clone().expect("no active watch");
        tx.send(sample).await.unwrap();
    }

    /// Resolves once the current watch's receiver has been dropped.
    pub async fn wait_for_unsubscribe(&self) {
        let tx = self.watch_tx.lock().unwrap().clone().expect("no active watch");
        tx.closed().await;
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocation {
    async fn request_foreground_permission(&self) -> Permission {
        self.permission
    }

    async fn current_position(&self) -> Result<LocationSample, LocationError> {
        self.initial.ok_or(LocationError::Unavailable)
    }

    async fn watch_position(&self, _options: WatchOptions) -> Result<LocationWatch, LocationError> {
        let (tx, rx) = mpsc::channel(8);
        *self.watch_tx.lock().unwrap() = Some(tx);
        self.watches.send_modify(|n| *n += 1);
        Ok(LocationWatch::new(rx))
    }
}

// ── Connector ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Refuse,
    /// Handshake never completes.
    Hang,
    /// Handshake completes but sends and closes never do.
    Stall,
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub at: Instant,
    pub token: String,
}

/// Server side of a scripted connection.
pub struct ServerEnd {
    pub token: String,
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl ServerEnd {
    pub fn push(&self, text: &str) {
        let _ = self.to_client.send(text.to_string());
    }

    pub async fn next_frame(&mut self) -> Option<OutboundFrame> {
        self.from_client.recv().await
    }

    pub fn try_next_frame(&mut self) -> Option<OutboundFrame> {
        self.from_client.try_recv().ok()
    }

    /// Drop the connection from the server side.
    pub fn disconnect(self) {}
}

pub struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    attempts: watch::Sender<Vec<Attempt>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    servers_tx: mpsc::UnboundedSender<ServerEnd>,
    servers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ServerEnd>>,
}

impl ScriptedConnector {
    pub fn new(fallback: Outcome) -> Self {
        Self::scripted([], fallback)
    }

    /// Play `script` in order, then `fallback` for every later attempt.
    pub fn scripted(script: impl IntoIterator<Item = Outcome>, fallback: Outcome) -> Self {
        let (attempts, _) = watch::channel(Vec::new());
        let (servers_tx, servers_rx) = mpsc::unbounded_channel();
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            attempts,
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
            servers_tx,
            servers_rx: tokio::sync::Mutex::new(servers_rx),
        }
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.borrow().clone()
    }

    pub async fn wait_for_attempts(&self, n: usize) -> Vec<Attempt> {
        let mut rx = self.attempts.subscribe();
        let attempts = rx.wait_for(|a| a.len() >= n).await.unwrap().clone();
        attempts
    }

    pub async fn next_server(&self) -> ServerEnd {
        self.servers_rx.lock().await.recv().await.unwrap()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, token: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.send_modify(|a| {
            a.push(Attempt {
                at: Instant::now(),
                token: token.to_string(),
            })
        });
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match outcome {
            Outcome::Refuse => Err(TransportError::WebSocket(
                tungstenite::Error::ConnectionClosed,
            )),
            Outcome::Hang => std::future::pending().await,
            Outcome::Accept | Outcome::Stall => {
                let (to_client, client_rx) = mpsc::unbounded_channel();
                let (client_tx, from_client) = mpsc::unbounded_channel();
                let now_live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_live.fetch_max(now_live, Ordering::SeqCst);
                let _ = self.servers_tx.send(ServerEnd {
                    token: token.to_string(),
                    to_client,
                    from_client,
                });
                Ok(Box::new(MockTransport {
                    rx: client_rx,
                    tx: client_tx,
                    live: self.live.clone(),
                    closed: false,
                    stalled: outcome == Outcome::Stall,
                }))
            }
        }
    }
}

struct MockTransport {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<OutboundFrame>,
    live: Arc<AtomicUsize>,
    closed: bool,
    stalled: bool,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.tx.send(frame.clone()).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if self.closed {
            return None;
        }
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        self.closed = true;
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
