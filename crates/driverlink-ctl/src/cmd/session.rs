//! Session control commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, post_json, post_json_body};

#[derive(Deserialize)]
struct AcceptedResponse {
    accepted: bool,
}

fn report(resp: AcceptedResponse, done: &str) {
    if resp.accepted {
        println!("✓ {}", done);
    } else {
        println!("Request was not accepted.");
    }
}

pub async fn cmd_login(port: u16, access: &str) -> Result<()> {
    #[derive(Serialize)]
    struct TokenRequest<'a> {
        access: &'a str,
    }

    let resp: AcceptedResponse = post_json_body(
        &format!("{}/session/token", base_url(port)),
        &TokenRequest { access },
    )
    .await?;
    report(resp, "Token handed to the session, reconnecting");
    Ok(())
}

pub async fn cmd_ack_expired(port: u16) -> Result<()> {
    let resp: AcceptedResponse =
        post_json(&format!("{}/session/expired/clear", base_url(port))).await?;
    report(resp, "Session-expired flag cleared");
    Ok(())
}

pub async fn cmd_connect(port: u16) -> Result<()> {
    let resp: AcceptedResponse =
        post_json(&format!("{}/session/connect", base_url(port))).await?;
    report(resp, "Connection attempt requested");
    Ok(())
}

pub async fn cmd_logout(port: u16) -> Result<()> {
    let resp: AcceptedResponse =
        post_json(&format!("{}/session/logout", base_url(port))).await?;
    report(resp, "Logged out, stored credentials removed");
    Ok(())
}
