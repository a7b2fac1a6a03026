//! Session status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    state:                 String,
    is_connected:          bool,
    session_expired:       bool,
    should_reconnect:      bool,
    has_token:             bool,
    retry_attempt:         u32,
    pending_notifications: usize,
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  DriverLink Session Status");
    println!("═══════════════════════════════════════");
    println!("  State            : {}", resp.state);
    println!("  Connected        : {}", yes_no(resp.is_connected));
    println!("  Token held       : {}", yes_no(resp.has_token));
    println!("  Reconnect        : {}", if resp.should_reconnect { "enabled" } else { "disabled" });
    println!("  Retry attempt    : {}", resp.retry_attempt);
    println!("  Ride offers      : {}", resp.pending_notifications);

    if resp.session_expired {
        println!();
        println!("  ⚠ Session expired. Log in again with `driverlink-ctl login <token>`,");
        println!("    or acknowledge with `driverlink-ctl ack-expired`.");
    }

    Ok(())
}
