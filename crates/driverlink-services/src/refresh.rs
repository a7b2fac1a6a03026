//! Token refresh exchange.
//!
//! `POST <refresh_url> { "refresh": "<token>" }` → `{ "data": { "access": "<token>" } }`.
//! Anything other than a 2xx carrying a non-empty `access` is a failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("refresh endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("refresh response carried no access token")]
    MissingAccess,
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange a refresh credential for a fresh access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    data: Option<RefreshData>,
}

#[derive(Deserialize)]
struct RefreshData {
    access: Option<String>,
}

pub struct HttpTokenRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RefreshError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RefreshError::Status(status));
        }

        let body: RefreshResponse = resp.json().await?;
        body.data
            .and_then(|d| d.access)
            .filter(|a| !a.is_empty())
            .ok_or(RefreshError::MissingAccess)
    }
}
