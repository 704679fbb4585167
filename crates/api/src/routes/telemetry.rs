//! Telemetry ingestion endpoint handlers.

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_telemetry_report;
use domain::models::{TelemetryAck, TelemetryReport};
use domain::store::TelemetryUpdate;

/// Accept a position/battery report from a physical band.
///
/// POST /api/v1/hardware/ping
///
/// The reading is stamped with server time at ingestion; the device clock is
/// never trusted for ordering. Unknown serials are rejected with 404 and
/// never auto-registered. This path touches only the band record — never
/// assignment or pool state.
pub async fn report_location(
    State(state): State<AppState>,
    Json(request): Json<TelemetryReport>,
) -> Result<Json<TelemetryAck>, ApiError> {
    request.validate()?;

    let server_time = Utc::now();
    let update = TelemetryUpdate {
        latitude: request.lat,
        longitude: request.lng,
        battery_percent: request.battery,
        seen_at: server_time,
    };

    let band = state.store.record_telemetry(&request.serial, update).await?;
    record_telemetry_report();

    info!(
        serial = %band.serial,
        latitude = request.lat,
        longitude = request.lng,
        battery = ?request.battery,
        "Telemetry recorded"
    );

    Ok(Json(TelemetryAck::success(server_time)))
}
