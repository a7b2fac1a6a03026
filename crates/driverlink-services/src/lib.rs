//! driverlink-services: collaborators and the session state machine.
//!
//! The session actor in [`session`] owns the live connection. Everything
//! else here is either a collaborator it talks to (credential store,
//! refresh endpoint, transport, location provider, navigator) or state it
//! feeds (the notification store, the location cache).

pub mod credentials;
pub mod location;
pub mod navigation;
pub mod notifications;
pub mod refresh;
pub mod session;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use credentials::{
    CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
pub use location::{FixedLocationProvider, LocationError, LocationProvider, LocationWatch, Permission};
pub use navigation::{LoggingNavigator, Navigator};
pub use notifications::{ingest, NotificationStore};
pub use refresh::{HttpTokenRefresher, RefreshError, TokenRefresher};
pub use session::{
    ConnectionState, DriverSession, SessionClosed, SessionDeps, SessionHandle, SessionSettings,
    SessionStatus,
};
pub use telemetry::{LocationTelemetry, TelemetryGuard};
pub use transport::{Connector, Transport, TransportError, WebSocketConnector};
