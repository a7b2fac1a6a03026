//! Access-token claims.
//!
//! Tokens are JWTs. Only the payload's `exp` claim is read; the signature
//! is the server's business. Anything that cannot be decoded counts as
//! expired.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("payload is not a JSON claims object: {0}")]
    Claims(#[from] serde_json::Error),
    #[error("token carries no exp claim")]
    MissingExpiry,
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Expiry of `token` in seconds since the unix epoch.
pub fn expiry(token: &str) -> Result<u64, TokenError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => return Err(TokenError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: Claims = serde_json::from_slice(&bytes)?;
    match claims.exp {
        Some(exp) if exp.is_finite() && exp >= 0.0 => Ok(exp as u64),
        _ => Err(TokenError::MissingExpiry),
    }
}

/// True when `token` expires at or before `now_secs`, or cannot be decoded.
pub fn is_expired_at(token: &str, now_secs: u64) -> bool {
    match expiry(token) {
        Ok(exp) => exp <= now_secs,
        Err(_) => true,
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_secs())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
