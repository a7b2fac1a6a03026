use anyhow::Result;
use serde_json::{Value, json};

use driverlink_services::SessionHandle;

use crate::*;

/// Serve the local API on an ephemeral port.
async fn serve_api(session: SessionHandle) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}/api", listener.local_addr()?);
    let app = driverlink_api::router(driverlink_api::ApiState { session });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(base)
}

#[tokio::test]
async fn api_exposes_status_and_notifications() -> Result<()> {
    let mut backend = Backend::start(RefreshReply::Status(500)).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(3600)), Some("r1"), None).await?;
    let base = serve_api(driver.session.handle()).await?;
    let http = reqwest::Client::new();

    let mut conn = backend.next_connection().await?;
    driver.wait_status(|s| s.is_connected).await?;
    conn.send_text(&notify_frame("ride-1", "Rider offer: 1200")).await?;
    conn.send_text(&notify_frame("ride-2", "Rider offer: 900")).await?;
    conn.send_text(&notify_frame("ride-3", "Rider offer: 700")).await?;
    let mut list = driver.session.notifications().subscribe();
    tokio::time::timeout(WAIT, list.wait_for(|l| l.len() == 3)).await??;

    let status: Value = http.get(format!("{base}/status")).send().await?.json().await?;
    assert_eq!(status["state"], "open");
    assert_eq!(status["is_connected"], true);
    assert_eq!(status["session_expired"], false);
    assert_eq!(status["pending_notifications"], 3);

    let listed: Value = http.get(format!("{base}/notifications")).send().await?.json().await?;
    let ids: Vec<&str> = listed["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["ride_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ride-1", "ride-2", "ride-3"]);
    assert_eq!(listed["notifications"][0]["offer_amount"], 1200.0);

    let dismissed: Value = http
        .delete(format!("{base}/notifications/ride-2"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(dismissed["removed"], true);
    let again: Value = http
        .delete(format!("{base}/notifications/ride-2"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(again["removed"], false);

    let cleared: Value = http
        .post(format!("{base}/notifications/clear"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(cleared["cleared"], 2);
    assert!(driver.session.notifications().is_empty());

    driver.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn api_drives_logout_and_login() -> Result<()> {
    let mut backend = Backend::start(RefreshReply::Status(500)).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(3600)), Some("r1"), None).await?;
    let base = serve_api(driver.session.handle()).await?;
    let http = reqwest::Client::new();
    let _conn = backend.next_connection().await?;

    let resp: Value = http.post(format!("{base}/session/logout")).send().await?.json().await?;
    assert_eq!(resp["accepted"], true);
    driver.wait_status(|s| s.session_expired).await?;

    let resp: Value = http
        .post(format!("{base}/session/expired/clear"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(resp["accepted"], true);
    driver.wait_status(|s| !s.session_expired).await?;

    let empty = http
        .post(format!("{base}/session/token"))
        .json(&json!({ "access": "  " }))
        .send()
        .await?;
    assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

    let fresh = jwt_expiring_in(3600);
    let resp: Value = http
        .post(format!("{base}/session/token"))
        .json(&json!({ "access": fresh }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(resp["accepted"], true);

    let conn = backend.next_connection().await?;
    assert_eq!(conn.token, fresh);
    let status: Value = http.get(format!("{base}/status")).send().await?.json().await?;
    assert_eq!(status["should_reconnect"], true);

    driver.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn api_reports_a_stopped_session() -> Result<()> {
    let backend = Backend::start(RefreshReply::Status(500)).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(3600)), Some("r1"), None).await?;
    let base = serve_api(driver.session.handle()).await?;
    driver.session.stop().await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/session/connect"))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
