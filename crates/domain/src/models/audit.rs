//! Pool audit records.

use serde::Serialize;
use uuid::Uuid;

/// Why a pool entry was repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairReason {
    /// The band is bound to a pilgrim and may not sit in an available pool.
    Assigned,
    /// The band is no longer registered; the pool entry is dangling.
    Unregistered,
}

/// One corrective write performed by the auditor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRepair {
    pub group_id: Uuid,
    pub group_name: String,
    pub serial: String,
    pub assigned_pilgrim: Option<Uuid>,
    pub reason: RepairReason,
}

/// Outcome of one auditor pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub groups_scanned: usize,
    pub entries_scanned: usize,
    pub repairs: Vec<PoolRepair>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}
