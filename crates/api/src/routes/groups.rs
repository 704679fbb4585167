//! Group and pool endpoint handlers.
//!
//! Staging endpoints mutate pools directly through the store's atomic
//! primitives; pool changes driven by assignment state go through the
//! assignment coordinator and are not exposed here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{
    BandSummary, CreateGroupRequest, Group, GroupDetailResponse, PilgrimWithBand, StageBandRequest,
};
use domain::store::NewGroup;

/// Response for the availability query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBandsResponse {
    pub bands: Vec<BandSummary>,
}

/// Create a group.
///
/// POST /api/v1/groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    request.validate()?;

    let group = state
        .store
        .insert_group(NewGroup {
            name: request.name,
            moderator_ids: request.moderator_ids,
            member_ids: request.member_ids,
            enforce_pool: request.enforce_pool,
        })
        .await?;

    info!(group_id = %group.id, name = %group.name, "Group created");
    Ok((StatusCode::CREATED, Json(group)))
}

/// Get a group with member pilgrims enriched by their band state.
///
/// GET /api/v1/groups/:group_id
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupDetailResponse>, ApiError> {
    let group = state
        .store
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("group not found".to_string()))?;

    let mut members = Vec::with_capacity(group.member_ids.len());
    for pilgrim_id in &group.member_ids {
        let Some(pilgrim) = state.store.pilgrim_by_id(*pilgrim_id).await? else {
            continue;
        };
        let band_info = state
            .store
            .band_by_pilgrim(*pilgrim_id)
            .await?
            .map(BandSummary::from);
        members.push(PilgrimWithBand { pilgrim, band_info });
    }

    Ok(Json(GroupDetailResponse {
        id: group.id,
        name: group.name,
        moderator_ids: group.moderator_ids,
        enforce_pool: group.enforce_pool,
        pool: group.pool,
        members,
        created_at: group.created_at,
    }))
}

/// Stage a band into a group's available pool.
///
/// POST /api/v1/groups/:group_id/pool
pub async fn stage_band(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<StageBandRequest>,
) -> Result<Json<Group>, ApiError> {
    request.validate()?;

    let group = state.store.add_to_pool(group_id, &request.serial).await?;
    info!(group_id = %group_id, serial = %request.serial, "Band staged into pool");
    Ok(Json(group))
}

/// Remove a band from a group's available pool.
///
/// DELETE /api/v1/groups/:group_id/pool/:serial
pub async fn unstage_band(
    State(state): State<AppState>,
    Path((group_id, serial)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    let removed = state.store.remove_from_pool(group_id, &serial).await?;
    if !removed {
        return Err(ApiError::NotFound("pool entry not found".to_string()));
    }
    info!(group_id = %group_id, serial = %serial, "Band removed from pool");
    Ok(StatusCode::NO_CONTENT)
}

/// List bands currently assignable from a group's pool.
///
/// GET /api/v1/groups/:group_id/available-bands
pub async fn get_available_bands(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<AvailableBandsResponse>, ApiError> {
    let bands = state.store.available_bands(group_id).await?;
    Ok(Json(AvailableBandsResponse {
        bands: bands.into_iter().map(BandSummary::from).collect(),
    }))
}
