//! Group domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::pilgrim::PilgrimWithBand;

/// An administrative group with its available-band pool.
///
/// `pool` holds serials of bands staged for this group. Invariant G1: every
/// pooled band is unassigned. Invariant G2: a serial appears in at most one
/// group's pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub moderator_ids: Vec<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub enforce_pool: bool,
    pub pool: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn pool_contains(&self, serial: &str) -> bool {
        self.pool.iter().any(|s| s == serial)
    }
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Group name must be between 3 and 100 characters"
    ))]
    pub name: String,

    #[serde(default)]
    pub moderator_ids: Vec<Uuid>,

    #[serde(default)]
    pub member_ids: Vec<Uuid>,

    /// When true, only staged bands may be assigned by this group.
    #[serde(default)]
    pub enforce_pool: bool,
}

/// Request payload for staging a band into a group's pool.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StageBandRequest {
    #[validate(length(min = 1, message = "Serial is required"))]
    pub serial: String,
}

/// Group detail with member pilgrims enriched by their band state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub moderator_ids: Vec<Uuid>,
    pub enforce_pool: bool,
    pub pool: Vec<String>,
    pub members: Vec<PilgrimWithBand>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_contains() {
        let group = Group {
            id: Uuid::new_v4(),
            name: "Mina Camp 12".to_string(),
            moderator_ids: vec![],
            member_ids: vec![],
            enforce_pool: false,
            pool: vec!["BAND-01".to_string(), "BAND-02".to_string()],
            created_at: Utc::now(),
        };
        assert!(group.pool_contains("BAND-01"));
        assert!(!group.pool_contains("BAND-03"));
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateGroupRequest =
            serde_json::from_str(r#"{"name": "Mina Camp 12"}"#).unwrap();
        assert!(request.moderator_ids.is_empty());
        assert!(request.member_ids.is_empty());
        assert!(!request.enforce_pool);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_short_name() {
        let request: CreateGroupRequest = serde_json::from_str(r#"{"name": "ab"}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
