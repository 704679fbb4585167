//! Admin endpoint handlers.

use axum::{extract::State, Json};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_pool_repairs;
use domain::models::AuditReport;
use domain::services::PoolAuditor;
use domain::store::FleetStats;

/// Fleet-wide statistics.
///
/// GET /api/v1/admin/stats
pub async fn get_fleet_stats(
    State(state): State<AppState>,
) -> Result<Json<FleetStats>, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(stats))
}

/// Run the pool consistency auditor on demand.
///
/// POST /api/v1/admin/pool-audit
pub async fn run_pool_audit(
    State(state): State<AppState>,
) -> Result<Json<AuditReport>, ApiError> {
    let auditor = PoolAuditor::new(state.store.clone());
    let report = auditor.run_once().await?;
    record_pool_repairs(report.repairs.len());

    info!(
        groups_scanned = report.groups_scanned,
        entries_scanned = report.entries_scanned,
        repairs = report.repairs.len(),
        "On-demand pool audit completed"
    );

    Ok(Json(report))
}
