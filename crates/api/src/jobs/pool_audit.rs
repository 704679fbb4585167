//! Pool consistency audit background job.

use std::sync::Arc;
use tracing::{info, warn};

use domain::services::PoolAuditor;
use domain::store::BandStore;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_pool_repairs;

/// Background job that periodically repairs pool/assignment divergence.
pub struct PoolAuditJob {
    auditor: PoolAuditor,
    interval_secs: u64,
}

impl PoolAuditJob {
    /// Create a new audit job.
    ///
    /// # Arguments
    /// * `store` - The band store to scan
    /// * `interval_secs` - Seconds between audit passes
    pub fn new(store: Arc<dyn BandStore>, interval_secs: u64) -> Self {
        Self {
            auditor: PoolAuditor::new(store),
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for PoolAuditJob {
    fn name(&self) -> &'static str {
        "pool_audit"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let report = self
            .auditor
            .run_once()
            .await
            .map_err(|e| format!("Pool audit failed: {}", e))?;

        record_pool_repairs(report.repairs.len());

        if report.is_clean() {
            info!(
                groups_scanned = report.groups_scanned,
                entries_scanned = report.entries_scanned,
                "Pool audit clean"
            );
        } else {
            // A recurring non-zero repair count means some write path is
            // bypassing the assignment coordinator.
            warn!(
                groups_scanned = report.groups_scanned,
                entries_scanned = report.entries_scanned,
                repairs = report.repairs.len(),
                "Pool audit repaired inconsistent entries"
            );
        }

        Ok(())
    }
}
