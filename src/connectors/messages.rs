// src/connectors/messages.rs
use rust_decimal::Decimal;
use serde::Deserialize;

/// Rate frame pushed by the rate service, e.g. `{"rate": "19133.74"}`.
/// `timestamp` is milliseconds since the epoch when present.
#[derive(Debug, Deserialize)]
pub struct RateMessage {
    pub rate: Decimal,

    #[serde(default)]
    pub timestamp: Option<u64>,
}
