//! Band domain model.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::pilgrim::PilgrimSummary;

lazy_static! {
    static ref SERIAL_RE: Regex = Regex::new(r"^[A-Z0-9][A-Z0-9-]{2,31}$").expect("valid regex");
}

/// Lifecycle status of a hardware band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandStatus {
    Active,
    Maintenance,
    Inactive,
}

impl BandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BandStatus::Active => "active",
            BandStatus::Maintenance => "maintenance",
            BandStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for BandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, thiserror::Error)]
#[error("unknown band status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for BandStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BandStatus::Active),
            "maintenance" => Ok(BandStatus::Maintenance),
            "inactive" => Ok(BandStatus::Inactive),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Represents a registered hardware band.
///
/// `assigned_pilgrim` is a weak reference: a lookup key into the pilgrim
/// directory, never an owning edge. `assignment_version` is the
/// optimistic-concurrency token; telemetry writes leave it untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub serial: String,
    pub imei: Option<String>,
    pub battery_percent: Option<i16>,
    pub status: BandStatus,
    pub assigned_pilgrim: Option<Uuid>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub assignment_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Band {
    pub fn is_assigned(&self) -> bool {
        self.assigned_pilgrim.is_some()
    }
}

/// Request payload for band registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBandRequest {
    #[validate(custom(function = "validate_serial"))]
    pub serial: String,

    #[validate(length(max = 32, message = "IMEI must be at most 32 characters"))]
    pub imei: Option<String>,
}

/// Band summary embedded in group dashboards and availability listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSummary {
    pub serial: String,
    pub status: BandStatus,
    pub battery_percent: Option<i16>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Band detail with the assigned pilgrim resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDetailResponse {
    #[serde(flatten)]
    pub band: Band,
    pub pilgrim: Option<PilgrimSummary>,
}

pub fn validate_serial(serial: &str) -> Result<(), validator::ValidationError> {
    if SERIAL_RE.is_match(serial) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("invalid_serial");
        err.message = Some(
            "Serial must be 3-32 uppercase alphanumeric characters or hyphens".into(),
        );
        Err(err)
    }
}

impl From<Band> for BandSummary {
    fn from(band: Band) -> Self {
        Self {
            serial: band.serial,
            status: band.status,
            battery_percent: band.battery_percent,
            last_latitude: band.last_latitude,
            last_longitude: band.last_longitude,
            last_seen_at: band.last_seen_at,
        }
    }
}
