//! Pilgrim domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::band::BandSummary;

/// A person who can be bound to at most one band at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilgrim {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
    pub medical_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a pilgrim record.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePilgrimRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Full name must be between 3 and 100 characters"
    ))]
    pub full_name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "Phone number must be at most 32 characters"))]
    pub phone_number: Option<String>,

    #[validate(length(max = 64, message = "National ID must be at most 64 characters"))]
    pub national_id: Option<String>,

    #[validate(length(max = 500, message = "Medical notes must be at most 500 characters"))]
    pub medical_notes: Option<String>,
}

/// Pilgrim summary for embedding in band details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilgrimSummary {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
}

/// A group member with their band state resolved through the weak reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilgrimWithBand {
    #[serde(flatten)]
    pub pilgrim: Pilgrim,
    pub band_info: Option<BandSummary>,
}

impl From<Pilgrim> for PilgrimSummary {
    fn from(pilgrim: Pilgrim) -> Self {
        Self {
            id: pilgrim.id,
            full_name: pilgrim.full_name,
            phone_number: pilgrim.phone_number,
            national_id: pilgrim.national_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let request = CreatePilgrimRequest {
            full_name: "Ahmed Al-Farsi".to_string(),
            email: Some("ahmed@example.com".to_string()),
            phone_number: None,
            national_id: Some("SA-1029384756".to_string()),
            medical_notes: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_short_name() {
        let request = CreatePilgrimRequest {
            full_name: "Al".to_string(),
            email: None,
            phone_number: None,
            national_id: None,
            medical_notes: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_rejects_bad_email() {
        let request = CreatePilgrimRequest {
            full_name: "Ahmed Al-Farsi".to_string(),
            email: Some("not-an-email".to_string()),
            phone_number: None,
            national_id: None,
            medical_notes: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_summary_from_pilgrim() {
        let pilgrim = Pilgrim {
            id: Uuid::new_v4(),
            full_name: "Fatima Zahra".to_string(),
            email: None,
            phone_number: Some("+966501234567".to_string()),
            national_id: None,
            medical_notes: Some("diabetic".to_string()),
            created_at: Utc::now(),
        };
        let summary = PilgrimSummary::from(pilgrim.clone());
        assert_eq!(summary.id, pilgrim.id);
        assert_eq!(summary.full_name, "Fatima Zahra");
    }
}
