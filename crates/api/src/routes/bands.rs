//! Band registry endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{Band, BandDetailResponse, BandStatus, RegisterBandRequest};
use domain::services::AssignmentCoordinator;
use domain::store::{BandFilter, NewBand};
use shared::pagination::{PageInfo, PageParams};

/// Query parameters for band listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBandsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Response for band listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBandsResponse {
    pub bands: Vec<Band>,
    pub pagination: PageInfo,
}

/// Register a new band.
///
/// POST /api/v1/bands
pub async fn register_band(
    State(state): State<AppState>,
    Json(request): Json<RegisterBandRequest>,
) -> Result<(StatusCode, Json<Band>), ApiError> {
    request.validate()?;

    let band = state
        .store
        .insert_band(NewBand {
            serial: request.serial,
            imei: request.imei,
        })
        .await?;

    info!(serial = %band.serial, "Band registered");
    Ok((StatusCode::CREATED, Json(band)))
}

/// Get a single band with its assigned pilgrim resolved.
///
/// GET /api/v1/bands/:serial
pub async fn get_band(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<BandDetailResponse>, ApiError> {
    let band = state
        .store
        .band_by_serial(&serial)
        .await?
        .ok_or_else(|| ApiError::NotFound("band not found".to_string()))?;

    let pilgrim = match band.assigned_pilgrim {
        Some(pilgrim_id) => state
            .store
            .pilgrim_by_id(pilgrim_id)
            .await?
            .map(Into::into),
        None => None,
    };

    Ok(Json(BandDetailResponse { band, pilgrim }))
}

/// List bands with optional status filter and pagination.
///
/// GET /api/v1/bands?status=&page=&limit=
pub async fn list_bands(
    State(state): State<AppState>,
    Query(query): Query<ListBandsQuery>,
) -> Result<Json<ListBandsResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<BandStatus>)
        .transpose()
        .map_err(|err| ApiError::Validation(err.to_string()))?;

    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let (bands, total) = state
        .store
        .list_bands(BandFilter { status }, params.offset(), params.limit())
        .await?;

    Ok(Json(ListBandsResponse {
        bands,
        pagination: PageInfo::new(params, total),
    }))
}

/// Deactivate a band, cascading through the assignment release path.
///
/// POST /api/v1/bands/:serial/deactivate
pub async fn deactivate_band(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<Band>, ApiError> {
    let coordinator = AssignmentCoordinator::new(state.store.clone());
    let band = coordinator.deactivate(&serial).await?;
    Ok(Json(band))
}

/// Reactivate a band.
///
/// POST /api/v1/bands/:serial/activate
pub async fn activate_band(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<Band>, ApiError> {
    let band = state
        .store
        .band_by_serial(&serial)
        .await?
        .ok_or_else(|| ApiError::NotFound("band not found".to_string()))?;

    let band = state
        .store
        .set_band_status(&serial, band.assignment_version, BandStatus::Active)
        .await?;

    info!(serial = %serial, "Band activated");
    Ok(Json(band))
}

/// Deregister a band permanently.
///
/// DELETE /api/v1/bands/:serial
///
/// Fails with 409 while the band is assigned; pool entries are scrubbed in
/// the same store transaction.
pub async fn deregister_band(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_band(&serial).await?;
    info!(serial = %serial, "Band deregistered");
    Ok(StatusCode::NO_CONTENT)
}
