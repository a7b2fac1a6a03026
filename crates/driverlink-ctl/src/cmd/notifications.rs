//! Ride notification commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, delete_json, endpoint, get_json, post_json};

#[derive(Deserialize)]
struct Notification {
    ride_id:        String,
    ride_type:      String,
    message:        String,
    rider_name:     Option<String>,
    rider_rating:   Option<String>,
    time_to_pickup: Option<u64>,
    address:        Option<String>,
    offer_amount:   Option<f64>,
    estimated_fare: Option<f64>,
    distance_km:    Option<f64>,
}

#[derive(Deserialize)]
struct NotificationsResponse {
    notifications: Vec<Notification>,
}

fn or_dash<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub async fn cmd_notifications(port: u16) -> Result<()> {
    let resp: NotificationsResponse =
        get_json(&format!("{}/notifications", base_url(port))).await?;

    if resp.notifications.is_empty() {
        println!("No pending ride offers.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Ride Offers ({})", resp.notifications.len());
    println!("═══════════════════════════════════════");

    for n in &resp.notifications {
        let rider = match (&n.rider_name, &n.rider_rating) {
            (Some(name), Some(rating)) => format!("{} ({}★)", name, rating),
            (Some(name), None) => name.clone(),
            _ => "-".to_string(),
        };
        let pickup = n
            .time_to_pickup
            .map(|s| format!("~{} min", s.div_ceil(60)))
            .unwrap_or_else(|| "-".to_string());

        println!("  ┌─ {}", n.ride_id);
        if !n.ride_type.is_empty() {
            println!("  │  type     : {}", n.ride_type);
        }
        println!("  │  rider    : {}", rider);
        println!("  │  pickup   : {}", or_dash(n.address.as_deref()));
        println!("  │  distance : {} km", or_dash(n.distance_km));
        println!("  │  eta      : {}", pickup);
        println!("  │  offer    : {}", or_dash(n.offer_amount));
        println!("  │  fare     : {}", or_dash(n.estimated_fare));
        println!("  └─ {}", n.message);
    }

    Ok(())
}

pub async fn cmd_dismiss(port: u16, ride_id: &str) -> Result<()> {
    #[derive(Deserialize)]
    struct DismissResponse {
        ride_id: String,
        removed: bool,
    }

    let url = endpoint(port, &["notifications", ride_id])?;
    let resp: DismissResponse = delete_json(url.as_str()).await?;

    if resp.removed {
        println!("✓ Dismissed ride offer {}", resp.ride_id);
    } else {
        println!("No pending offer for ride {}", resp.ride_id);
    }
    Ok(())
}

pub async fn cmd_clear(port: u16) -> Result<()> {
    #[derive(Deserialize)]
    struct ClearResponse {
        cleared: usize,
    }

    let resp: ClearResponse =
        post_json(&format!("{}/notifications/clear", base_url(port))).await?;
    println!("Cleared {} ride offers.", resp.cleared);
    Ok(())
}
