//! Assignment endpoint handlers.
//!
//! Both handlers delegate to the assignment coordinator; this module never
//! mutates band or pool state itself.

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_band_assigned, record_band_released};
use domain::models::Band;
use domain::services::AssignmentCoordinator;

/// Request payload for binding a band to a pilgrim.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignBandRequest {
    #[validate(length(min = 1, message = "Serial is required"))]
    pub serial: String,

    pub pilgrim_id: Uuid,

    pub group_id: Uuid,
}

/// Request payload for releasing a pilgrim's band back into a group pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseBandRequest {
    pub pilgrim_id: Uuid,

    pub group_id: Uuid,
}

/// Bind a band to a pilgrim.
///
/// POST /api/v1/assignments
pub async fn assign_band(
    State(state): State<AppState>,
    Json(request): Json<AssignBandRequest>,
) -> Result<Json<Band>, ApiError> {
    request.validate()?;

    let coordinator = AssignmentCoordinator::new(state.store.clone());
    let band = coordinator
        .assign(&request.serial, request.pilgrim_id, request.group_id)
        .await?;
    record_band_assigned();

    Ok(Json(band))
}

/// Release the band held by a pilgrim back into a group's pool.
///
/// POST /api/v1/assignments/release
pub async fn release_band(
    State(state): State<AppState>,
    Json(request): Json<ReleaseBandRequest>,
) -> Result<Json<Band>, ApiError> {
    let coordinator = AssignmentCoordinator::new(state.store.clone());
    let band = coordinator
        .unassign(request.pilgrim_id, request.group_id)
        .await?;
    record_band_released();

    Ok(Json(band))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_request_deserialization() {
        let json = r#"{
            "serial": "BAND-01",
            "pilgrimId": "550e8400-e29b-41d4-a716-446655440000",
            "groupId": "660e8400-e29b-41d4-a716-446655440000"
        }"#;
        let request: AssignBandRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.serial, "BAND-01");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_assign_request_rejects_empty_serial() {
        let request = AssignBandRequest {
            serial: String::new(),
            pilgrim_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_release_request_deserialization() {
        let json = r#"{
            "pilgrimId": "550e8400-e29b-41d4-a716-446655440000",
            "groupId": "660e8400-e29b-41d4-a716-446655440000"
        }"#;
        let request: ReleaseBandRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.pilgrim_id,
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()
        );
    }
}
