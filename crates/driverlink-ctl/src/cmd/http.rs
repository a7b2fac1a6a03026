//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

/// API URL with `segments` appended, each percent-encoded.
pub fn endpoint(port: u16, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(&base_url(port)).context("invalid API base URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("API base URL cannot take a path"))?
        .extend(segments);
    Ok(url)
}

fn unreachable(url: &str) -> String {
    format!("failed to connect to driverlinkd at {} (is it running?)", url)
}

async fn read_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("driverlinkd returned {}: {}", status, body);
    }
    resp.json::<T>().await.context("failed to parse response")
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url).await.with_context(|| unreachable(url))?;
    read_json(resp).await
}

pub async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| unreachable(url))?;
    read_json(resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| unreachable(url))?;
    read_json(resp).await
}

pub async fn delete_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .delete(url)
        .send()
        .await
        .with_context(|| unreachable(url))?;
    read_json(resp).await
}
