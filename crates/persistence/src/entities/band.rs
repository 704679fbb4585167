//! Band entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::band::UnknownStatus;
use domain::models::Band;

/// Database row mapping for the bands table.
#[derive(Debug, Clone, FromRow)]
pub struct BandEntity {
    pub serial: String,
    pub imei: Option<String>,
    pub battery_percent: Option<i16>,
    pub status: String,
    pub assigned_pilgrim: Option<Uuid>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub assignment_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BandEntity> for Band {
    type Error = UnknownStatus;

    fn try_from(entity: BandEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            serial: entity.serial,
            imei: entity.imei,
            battery_percent: entity.battery_percent,
            status: entity.status.parse()?,
            assigned_pilgrim: entity.assigned_pilgrim,
            last_latitude: entity.last_latitude,
            last_longitude: entity.last_longitude,
            last_seen_at: entity.last_seen_at,
            assignment_version: entity.assignment_version,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
