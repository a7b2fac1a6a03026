//! Ride notification model and field extraction.
//!
//! Ride offers arrive with most of their interesting numbers embedded in
//! free text, e.g. `"Rider offer: 1,500 · 3.2 km away"`. Extraction pulls
//! the offer amount and pickup distance out of that text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::wire::RideEvent;

/// Assumed average approach speed when estimating time to pickup.
pub const AVERAGE_SPEED_KM_PER_MIN: f64 = 0.5;

static OFFER_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?i)offer[^0-9]{0,16}?([0-9][0-9,]*(?:\.[0-9]+)?)"));

static DISTANCE_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?i)([0-9][0-9,]*(?:\.[0-9]+)?)\s*km\b"));

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("event has no ride_id")]
    MissingRideId,
    #[error("extraction pattern failed to compile: {0}")]
    Pattern(regex::Error),
    #[error("{field} is not a usable number: {raw:?}")]
    InvalidNumber { field: &'static str, raw: String },
}

/// One ride offer surfaced to the driver. `ride_id` is the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideNotification {
    pub ride_id: String,
    pub notification_type: String,
    pub ride_type: String,
    pub message: String,
    pub rider_name: Option<String>,
    pub rider_rating: Option<String>,
    /// Estimated seconds until pickup, derived from the distance.
    pub time_to_pickup: Option<u64>,
    pub address: Option<String>,
    pub offer_amount: Option<f64>,
    pub estimated_fare: Option<f64>,
    pub distance_km: Option<f64>,
    /// Unix milliseconds at which the event was taken in.
    pub received_at: u64,
}

impl RideNotification {
    /// Build a notification from a raw `notify` event.
    ///
    /// An explicit `offer_amount` field wins over the amount found in the
    /// message text.
    pub fn from_event(event: &RideEvent, received_at: u64) -> Result<Self, ExtractError> {
        let ride_id = event
            .ride_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ExtractError::MissingRideId)?
            .to_string();

        let message = event.message.clone().unwrap_or_default();

        let offer_amount = match event.offer_amount {
            Some(amount) => Some(amount),
            None => extract_offer(&message)?,
        };
        let distance_km = extract_distance_km(&message)?;

        Ok(Self {
            ride_id,
            notification_type: event.notification_type.clone(),
            ride_type: event.ride_type.clone().unwrap_or_default(),
            message,
            rider_name: event.rider_name.clone(),
            rider_rating: event.rider_rating.clone(),
            time_to_pickup: distance_km.map(pickup_secs),
            address: event.pickup_address.clone(),
            offer_amount,
            estimated_fare: event.estimated_fare,
            distance_km,
            received_at,
        })
    }
}

/// Offer amount embedded in free text, if any.
pub fn extract_offer(text: &str) -> Result<Option<f64>, ExtractError> {
    capture_number(&OFFER_PATTERN, text, "offer_amount")
}

/// Pickup distance in kilometres embedded in free text, if any.
pub fn extract_distance_km(text: &str) -> Result<Option<f64>, ExtractError> {
    capture_number(&DISTANCE_PATTERN, text, "distance_km")
}

/// Seconds to cover `distance_km` at [`AVERAGE_SPEED_KM_PER_MIN`].
pub fn pickup_secs(distance_km: f64) -> u64 {
    let minutes = distance_km / AVERAGE_SPEED_KM_PER_MIN;
    (minutes * 60.0).round().max(0.0) as u64
}

fn capture_number(
    pattern: &Lazy<Result<Regex, regex::Error>>,
    text: &str,
    field: &'static str,
) -> Result<Option<f64>, ExtractError> {
    let re = pattern
        .as_ref()
        .map_err(|e| ExtractError::Pattern(e.clone()))?;

    let Some(raw) = re.captures(text).and_then(|caps| caps.get(1)) else {
        return Ok(None);
    };

    let cleaned = raw.as_str().replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ExtractError::InvalidNumber {
            field,
            raw: raw.as_str().to_string(),
        }),
    }
}
