//! Pilgrim entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::Pilgrim;

/// Database row mapping for the pilgrims table.
#[derive(Debug, Clone, FromRow)]
pub struct PilgrimEntity {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
    pub medical_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PilgrimEntity> for Pilgrim {
    fn from(entity: PilgrimEntity) -> Self {
        Self {
            id: entity.id,
            full_name: entity.full_name,
            email: entity.email,
            phone_number: entity.phone_number,
            national_id: entity.national_id,
            medical_notes: entity.medical_notes,
            created_at: entity.created_at,
        }
    }
}
