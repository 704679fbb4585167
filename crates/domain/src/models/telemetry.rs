//! Telemetry ingestion payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Position/battery report sent by a physical band.
///
/// The device-supplied clock is not trusted; the server stamps the reading
/// at ingestion time.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReport {
    #[validate(length(min = 1, message = "Serial is required"))]
    pub serial: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,

    #[validate(custom(function = "shared::validation::validate_battery_percent"))]
    pub battery: Option<i16>,
}

/// Acknowledgement returned to the hardware.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryAck {
    pub status: String,
    pub server_time: DateTime<Utc>,
}

impl TelemetryAck {
    pub fn success(server_time: DateTime<Utc>) -> Self {
        Self {
            status: "success".to_string(),
            server_time,
        }
    }
}
