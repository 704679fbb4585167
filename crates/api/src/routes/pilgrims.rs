//! Pilgrim directory endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{BandSummary, CreatePilgrimRequest, Pilgrim, PilgrimWithBand};
use domain::services::AssignmentCoordinator;
use domain::store::NewPilgrim;
use shared::pagination::{PageInfo, PageParams};

/// Query parameters for pilgrim listing.
#[derive(Debug, Deserialize)]
pub struct ListPilgrimsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Response for pilgrim listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPilgrimsResponse {
    pub pilgrims: Vec<Pilgrim>,
    pub pagination: PageInfo,
}

/// Create a pilgrim record.
///
/// POST /api/v1/pilgrims
pub async fn create_pilgrim(
    State(state): State<AppState>,
    Json(request): Json<CreatePilgrimRequest>,
) -> Result<(StatusCode, Json<Pilgrim>), ApiError> {
    request.validate()?;

    let pilgrim = state
        .store
        .insert_pilgrim(NewPilgrim {
            full_name: request.full_name,
            email: request.email,
            phone_number: request.phone_number,
            national_id: request.national_id,
            medical_notes: request.medical_notes,
        })
        .await?;

    info!(pilgrim_id = %pilgrim.id, "Pilgrim created");
    Ok((StatusCode::CREATED, Json(pilgrim)))
}

/// Get a pilgrim with their band state resolved.
///
/// GET /api/v1/pilgrims/:pilgrim_id
pub async fn get_pilgrim(
    State(state): State<AppState>,
    Path(pilgrim_id): Path<Uuid>,
) -> Result<Json<PilgrimWithBand>, ApiError> {
    let pilgrim = state
        .store
        .pilgrim_by_id(pilgrim_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("pilgrim not found".to_string()))?;

    let band_info = state
        .store
        .band_by_pilgrim(pilgrim_id)
        .await?
        .map(BandSummary::from);

    Ok(Json(PilgrimWithBand { pilgrim, band_info }))
}

/// List pilgrims with pagination.
///
/// GET /api/v1/pilgrims?page=&limit=
pub async fn list_pilgrims(
    State(state): State<AppState>,
    Query(query): Query<ListPilgrimsQuery>,
) -> Result<Json<ListPilgrimsResponse>, ApiError> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let (pilgrims, total) = state
        .store
        .list_pilgrims(params.offset(), params.limit())
        .await?;

    Ok(Json(ListPilgrimsResponse {
        pilgrims,
        pagination: PageInfo::new(params, total),
    }))
}

/// Delete a pilgrim, releasing any held band first.
///
/// DELETE /api/v1/pilgrims/:pilgrim_id
///
/// The release goes through the assignment coordinator so the weak
/// reference on the band can never dangle.
pub async fn delete_pilgrim(
    State(state): State<AppState>,
    Path(pilgrim_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    // Surface NotFound before touching assignment state.
    state
        .store
        .pilgrim_by_id(pilgrim_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("pilgrim not found".to_string()))?;

    let coordinator = AssignmentCoordinator::new(state.store.clone());
    coordinator.release_for_pilgrim(pilgrim_id).await?;
    state.store.delete_pilgrim(pilgrim_id).await?;

    info!(pilgrim_id = %pilgrim_id, "Pilgrim deleted");
    Ok(StatusCode::NO_CONTENT)
}
