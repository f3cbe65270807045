use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Whether the app was in the foreground when a notification arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOrigin {
    Foreground,
    Background,
}

/// The platform delivered a scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub key: String,
    pub origin: DeliveryOrigin,
    pub delivered_at: NaiveDateTime,
}

impl DeliveryEvent {
    pub fn new(key: impl Into<String>, origin: DeliveryOrigin, delivered_at: NaiveDateTime) -> Self {
        Self {
            key: key.into(),
            origin,
            delivered_at,
        }
    }
}
