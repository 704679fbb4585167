//! Storage port for the band fleet.
//!
//! [`BandStore`] is the contract the persistence crate implements: a
//! transactional store with per-record atomic update. Every method is one
//! atomic unit — one SQL transaction in the Postgres backend, one write-lock
//! scope in the in-memory backend. Cross-aggregate writes (binding a band and
//! scrubbing pool entries) exist only as single commit primitives so callers
//! cannot apply them partially.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Band, BandStatus, Group, Pilgrim};

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// The assignment-version token moved between read and commit.
    #[error("stale assignment version")]
    Version,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Field set for registering a band.
#[derive(Debug, Clone)]
pub struct NewBand {
    pub serial: String,
    pub imei: Option<String>,
}

/// Field set for creating a pilgrim.
#[derive(Debug, Clone)]
pub struct NewPilgrim {
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
    pub medical_notes: Option<String>,
}

/// Field set for creating a group.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub moderator_ids: Vec<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub enforce_pool: bool,
}

/// Single-aggregate telemetry merge applied to a band record.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub battery_percent: Option<i16>,
    pub seen_at: DateTime<Utc>,
}

/// Filter for band listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandFilter {
    pub status: Option<BandStatus>,
}

/// Fleet-wide counters for the admin surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_bands: i64,
    pub active_bands: i64,
    pub assigned_bands: i64,
    pub unassigned_bands: i64,
    pub total_pilgrims: i64,
    pub total_groups: i64,
    pub pooled_bands: i64,
}

/// Transactional store over bands, pilgrims, and groups.
#[async_trait]
pub trait BandStore: Send + Sync {
    // --- Bands ---

    /// Registers a band. Fails with `Conflict` if the serial already exists.
    async fn insert_band(&self, new: NewBand) -> Result<Band, StoreError>;

    async fn band_by_serial(&self, serial: &str) -> Result<Option<Band>, StoreError>;

    /// Resolves the weak assignment reference from the pilgrim side.
    async fn band_by_pilgrim(&self, pilgrim_id: Uuid) -> Result<Option<Band>, StoreError>;

    /// Lists bands matching the filter; returns the page and the total count.
    async fn list_bands(
        &self,
        filter: BandFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Band>, i64), StoreError>;

    /// Merges a telemetry reading into the band record.
    ///
    /// Overwrites position, battery (when present) and `last_seen_at`
    /// unconditionally. Never reads or bumps `assignment_version` and never
    /// touches assignment or pool state. Fails `NotFound` for unregistered
    /// serials; never creates a record.
    async fn record_telemetry(
        &self,
        serial: &str,
        update: TelemetryUpdate,
    ) -> Result<Band, StoreError>;

    /// CAS write of the lifecycle status.
    ///
    /// Fails `Version` if the token moved, and `Conflict` if the transition
    /// would leave an assigned band non-active (invariant D1). Moving out of
    /// `active` scrubs the serial from every pool in the same atomic unit.
    async fn set_band_status(
        &self,
        serial: &str,
        expected_version: i64,
        status: BandStatus,
    ) -> Result<Band, StoreError>;

    /// Deregisters a band and scrubs its pool entries atomically.
    ///
    /// Fails `Conflict` while the band is assigned.
    async fn delete_band(&self, serial: &str) -> Result<(), StoreError>;

    // --- Pilgrims ---

    async fn insert_pilgrim(&self, new: NewPilgrim) -> Result<Pilgrim, StoreError>;

    async fn pilgrim_by_id(&self, id: Uuid) -> Result<Option<Pilgrim>, StoreError>;

    async fn list_pilgrims(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Pilgrim>, i64), StoreError>;

    /// Deletes a pilgrim record. Callers must release any held band first.
    async fn delete_pilgrim(&self, id: Uuid) -> Result<(), StoreError>;

    // --- Groups and pools ---

    async fn insert_group(&self, new: NewGroup) -> Result<Group, StoreError>;

    async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, StoreError>;

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Stages a band into a group's pool.
    ///
    /// Fails `Conflict` when the band is assigned or not active; a serial
    /// staged elsewhere is moved, so it belongs to at most one pool
    /// (invariant G2).
    async fn add_to_pool(&self, group_id: Uuid, serial: &str) -> Result<Group, StoreError>;

    /// Removes a pool entry; returns whether an entry was removed.
    async fn remove_from_pool(&self, group_id: Uuid, serial: &str) -> Result<bool, StoreError>;

    /// Pool members re-filtered by live assignment state at read time.
    async fn available_bands(&self, group_id: Uuid) -> Result<Vec<Band>, StoreError>;

    // --- Assignment commit points ---

    /// Binds a band to a pilgrim: sets the assignment reference, forces
    /// `status = active`, and removes the serial from every pool, as one
    /// atomic unit guarded by the version token.
    async fn bind_band(
        &self,
        serial: &str,
        expected_version: i64,
        pilgrim_id: Uuid,
    ) -> Result<Band, StoreError>;

    /// Clears a band's assignment and optionally returns it to one group's
    /// pool, as one atomic unit guarded by the version token.
    async fn release_band(
        &self,
        serial: &str,
        expected_version: i64,
        return_to_pool: Option<Uuid>,
    ) -> Result<Band, StoreError>;

    // --- Operational ---

    async fn ping(&self) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<FleetStats, StoreError>;
}
