//! Token lifecycle: validity checks and the refresh exchange.
//!
//! The manager is the only writer of the access token. It does not decide
//! what happens on failure; the session actor turns any [`AuthError`] into
//! a forced logout.

use std::sync::Arc;

use driverlink_core::token;

use crate::credentials::{CredentialError, CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::refresh::{RefreshError, TokenRefresher};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("credential store failed: {0}")]
    Store(#[from] CredentialError),
    #[error("no refresh credential stored")]
    MissingRefreshToken,
    #[error("token refresh failed: {0}")]
    Refresh(#[from] RefreshError),
}

pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    cached: Option<String>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            cached: None,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.cached.as_deref()
    }

    /// A non-expired access token: cached, stored, or freshly refreshed.
    pub async fn valid_token(&mut self) -> Result<String, AuthError> {
        if let Some(cached) = &self.cached {
            if !token::is_expired(cached) {
                return Ok(cached.clone());
            }
            tracing::debug!("cached access token expired");
        }

        if let Some(stored) = self.store.get(ACCESS_TOKEN_KEY).await? {
            if !token::is_expired(&stored) {
                self.cached = Some(stored.clone());
                return Ok(stored);
            }
            tracing::debug!("stored access token expired");
        }

        let refresh = self
            .store
            .get(REFRESH_TOKEN_KEY)
            .await?
            .ok_or(AuthError::MissingRefreshToken)?;

        let access = self.refresher.refresh(&refresh).await?;
        tracing::info!("access token refreshed");
        self.cached = Some(access.clone());
        // The refreshed token stays usable for this run even if it can't be saved.
        if let Err(e) = self.store.set(ACCESS_TOKEN_KEY, &access).await {
            tracing::warn!(error = %e, "failed to persist refreshed access token");
        }
        Ok(access)
    }

    /// Take a token issued elsewhere (a fresh login). Persisting is
    /// best-effort; the token is usable either way.
    pub async fn adopt(&mut self, access: &str) {
        self.cached = Some(access.to_string());
        if let Err(e) = self.store.set(ACCESS_TOKEN_KEY, access).await {
            tracing::warn!(error = %e, "failed to persist accepted access token");
        }
    }

    /// Forget the cached token and wipe both stored credentials.
    pub async fn clear(&mut self) -> Result<(), CredentialError> {
        self.cached = None;
        self.store
            .remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
            .await
    }
}
