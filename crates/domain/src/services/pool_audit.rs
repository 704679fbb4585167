//! Pool consistency auditor.
//!
//! Scans every group's available pool for entries that contradict assignment
//! state and repairs them. Repair policy: the pool entry is discarded, never
//! the assignment — an assigned band is in active use, so pool membership is
//! the stale side. Repairs go through the same `remove_from_pool` primitive
//! the coordinator uses, so the auditor can race a concurrent assignment
//! only benignly.

use std::sync::Arc;

use tracing::warn;

use crate::models::{AuditReport, PoolRepair, RepairReason};
use crate::store::{BandStore, StoreError};

/// Detects and repairs divergence between pools and assignment records.
#[derive(Clone)]
pub struct PoolAuditor {
    store: Arc<dyn BandStore>,
}

impl PoolAuditor {
    pub fn new(store: Arc<dyn BandStore>) -> Self {
        Self { store }
    }

    /// One full scan-and-repair pass.
    ///
    /// Idempotent: with no intervening writes, a second pass performs zero
    /// repairs. Each repair emits one structured log record.
    pub async fn run_once(&self) -> Result<AuditReport, StoreError> {
        let groups = self.store.list_groups().await?;

        let mut report = AuditReport {
            groups_scanned: groups.len(),
            entries_scanned: 0,
            repairs: Vec::new(),
        };

        for group in groups {
            for serial in &group.pool {
                report.entries_scanned += 1;

                let violation = match self.store.band_by_serial(serial).await? {
                    Some(band) => band
                        .assigned_pilgrim
                        .map(|pilgrim| (RepairReason::Assigned, Some(pilgrim))),
                    None => Some((RepairReason::Unregistered, None)),
                };

                let Some((reason, assigned_pilgrim)) = violation else {
                    continue;
                };

                let removed = self.store.remove_from_pool(group.id, serial).await?;
                if !removed {
                    // Another writer already took the entry out; nothing to log.
                    continue;
                }

                warn!(
                    group_id = %group.id,
                    group_name = %group.name,
                    serial = %serial,
                    assigned_pilgrim = ?assigned_pilgrim,
                    reason = ?reason,
                    "Repaired pool entry that contradicted assignment state"
                );

                report.repairs.push(PoolRepair {
                    group_id: group.id,
                    group_name: group.name.clone(),
                    serial: serial.clone(),
                    assigned_pilgrim,
                    reason,
                });
            }
        }

        Ok(report)
    }
}
