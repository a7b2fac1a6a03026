use std::time::Duration;

use anyhow::Result;

use driverlink_core::LocationSample;
use driverlink_services::{ConnectionState, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

use crate::*;

/// Expired stored token: the driver refreshes first and connects with the
/// new token, never the old one.
#[tokio::test]
async fn expired_token_is_refreshed_before_connecting() -> Result<()> {
    let t2 = jwt_expiring_in(3600);
    let mut backend = Backend::start(RefreshReply::Access(t2.clone())).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(-60)), Some("r1"), None).await?;

    let conn = backend.next_connection().await?;
    assert_eq!(conn.token, t2);
    assert_eq!(backend.refresh_calls(), vec!["r1"]);

    let status = driver.wait_status(|s| s.is_connected).await?;
    assert_eq!(status.retry_attempt, 0);
    assert_eq!(driver.stored(ACCESS_TOKEN_KEY).await?, Some(t2));

    driver.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_expires_the_session() -> Result<()> {
    let mut backend = Backend::start(RefreshReply::Status(401)).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(-60)), Some("r1"), None).await?;

    let status = driver.wait_status(|s| s.session_expired).await?;
    assert_eq!(status.state, ConnectionState::Disabled);
    assert!(!status.should_reconnect);

    backend.expect_no_connection(Duration::from_millis(500)).await?;
    assert_eq!(driver.stored(ACCESS_TOKEN_KEY).await?, None);
    assert_eq!(driver.stored(REFRESH_TOKEN_KEY).await?, None);
    assert_eq!(backend.refresh_calls().len(), 1);

    driver.session.stop().await;
    Ok(())
}

/// A 2xx refresh reply without a usable access token is a failed refresh.
#[tokio::test]
async fn refresh_without_access_expires_the_session() -> Result<()> {
    for body in [
        serde_json::json!({ "data": {} }),
        serde_json::json!({ "data": { "access": "" } }),
    ] {
        let mut backend = Backend::start(RefreshReply::Body(body)).await?;
        let driver =
            Driver::start(&backend, Some(&jwt_expiring_in(-60)), Some("r1"), None).await?;

        let status = driver.wait_status(|s| s.session_expired).await?;
        assert_eq!(status.state, ConnectionState::Disabled);
        assert!(!status.should_reconnect);

        backend.expect_no_connection(Duration::from_millis(500)).await?;
        assert_eq!(driver.stored(REFRESH_TOKEN_KEY).await?, None);
        assert_eq!(backend.refresh_calls().len(), 1);

        driver.session.stop().await;
    }
    Ok(())
}

#[tokio::test]
async fn server_side_close_triggers_reconnect() -> Result<()> {
    let access = jwt_expiring_in(3600);
    let mut backend = Backend::start(RefreshReply::Status(500)).await?;
    let driver = Driver::start(&backend, Some(&access), Some("r1"), None).await?;

    let first = backend.next_connection().await?;
    driver.wait_status(|s| s.is_connected).await?;
    first.close().await?;

    let second = backend.next_connection().await?;
    assert_eq!(second.token, access);
    let status = driver.wait_status(|s| s.is_connected).await?;
    assert_eq!(status.retry_attempt, 0);
    assert!(backend.refresh_calls().is_empty());

    driver.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn ride_notifications_are_deduplicated() -> Result<()> {
    let mut backend = Backend::start(RefreshReply::Status(500)).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(3600)), Some("r1"), None).await?;
    let mut conn = backend.next_connection().await?;

    conn.send_text(r#"{"type":"subscribed"}"#).await?;
    conn.send_text(&notify_frame("ride-42", "Rider offer: 1,500 · 2 km away")).await?;
    conn.send_text(&notify_frame("ride-42", "Rider offer: 9,999")).await?;
    conn.send_text("{broken").await?;
    conn.send_text(&notify_frame("ride-43", "Rider offer: 800")).await?;

    let mut list = driver.session.notifications().subscribe();
    tokio::time::timeout(WAIT, list.wait_for(|l| l.len() == 2)).await??;

    let store = driver.session.notifications();
    let first = store.get("ride-42").unwrap();
    assert_eq!(first.offer_amount, Some(1500.0));
    assert_eq!(first.distance_km, Some(2.0));
    assert_eq!(first.time_to_pickup, Some(240));
    assert_eq!(first.estimated_fare, Some(2100.0));
    assert_eq!(first.rider_rating.as_deref(), Some("4.8"));
    assert_eq!(first.address.as_deref(), Some("12 Marina Rd"));
    assert!(driver.session.status().is_connected);

    driver.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn location_is_published_over_the_socket() -> Result<()> {
    let mut backend = Backend::start(RefreshReply::Status(500)).await?;
    let here = LocationSample::new(6.4474, 3.4703);
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(3600)), Some("r1"), Some(here)).await?;
    let mut conn = backend.next_connection().await?;

    for _ in 0..2 {
        let frame = conn.next_json().await?;
        assert_eq!(frame["type"], "location_update");
        assert_eq!(frame["data"]["lat"], 6.4474);
        assert_eq!(frame["data"]["long"], 3.4703);
    }

    driver.session.stop().await;
    Ok(())
}

#[tokio::test]
async fn logout_closes_socket_until_new_token() -> Result<()> {
    let mut backend = Backend::start(RefreshReply::Status(500)).await?;
    let driver = Driver::start(&backend, Some(&jwt_expiring_in(3600)), Some("r1"), None).await?;
    let mut conn = backend.next_connection().await?;
    driver.wait_status(|s| s.is_connected).await?;

    driver.session.logout().await?;
    conn.wait_closed().await?;
    driver.wait_status(|s| s.session_expired).await?;
    driver.session.connect().await?;
    backend.expect_no_connection(Duration::from_millis(500)).await?;

    let fresh = jwt_expiring_in(3600);
    driver.session.accept_external_token(fresh.clone()).await?;
    let conn = backend.next_connection().await?;
    assert_eq!(conn.token, fresh);
    assert_eq!(driver.stored(ACCESS_TOKEN_KEY).await?, Some(fresh));

    driver.session.stop().await;
    Ok(())
}
