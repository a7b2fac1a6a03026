//! DriverLink wire format: JSON frames exchanged over the session socket.
//!
//! Inbound frames are decoded at the boundary into [`InboundFrame`]. Any
//! `type` this client does not know decodes to [`InboundFrame::Unknown`]
//! rather than failing, so the server can add frame types freely.
//!
//! The only outbound frame is the location update:
//!
//! ```text
//! { "type": "location_update", "data": { "lat": 12.97, "long": 77.59 } }
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::location::LocationSample;

/// Nested `notification_type` of a ride offer.
pub const RIDE_REQUESTED: &str = "RIDE_REQUESTED";

// ── Inbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Push event. Only `RIDE_REQUESTED` events are surfaced to the driver.
    Notify { event: RideEvent },
    /// Subscription acknowledgement. Carries no state.
    Subscribed,
    #[serde(other)]
    Unknown,
}

/// The `event` object of a `notify` frame.
///
/// Every field is optional on the wire; the notification intake decides
/// which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RideEvent {
    #[serde(default)]
    pub notification_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ride_id: Option<String>,
    #[serde(default)]
    pub ride_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rider_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rider_rating: Option<String>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub estimated_fare: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub offer_amount: Option<f64>,
}

impl RideEvent {
    pub fn is_ride_request(&self) -> bool {
        self.notification_type == RIDE_REQUESTED
    }
}

/// Decode one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<InboundFrame, serde_json::Error> {
    serde_json::from_str(text)
}

// ── Outbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundFrame {
    LocationUpdate(LocationSample),
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Lenient field decoding ───────────────────────────────────────────────────

/// Ids and ratings arrive as either strings or numbers depending on the
/// backend serializer.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Amounts may be numbers or numeric strings. Non-numeric strings are
/// treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => Ok(s.trim().parse::<f64>().ok().filter(|v| v.is_finite())),
        Some(other) => Err(de::Error::custom(format!(
            "expected number, got {other}"
        ))),
    }
}
