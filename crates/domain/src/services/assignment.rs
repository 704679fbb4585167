//! Assignment coordinator: the one write path for band/pilgrim binding.
//!
//! All state transitions that touch a band record and a group pool together
//! go through this service. It validates against fresh reads, then commits
//! through the store's single-transaction primitives, using the band's
//! assignment-version token so a lost race surfaces as `Conflict` instead of
//! a silent overwrite.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::{Band, BandStatus};
use crate::store::{BandStore, StoreError};

/// Errors returned by assignment operations.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    NotAllowed(String),

    #[error("storage backend error: {0}")]
    Internal(String),
}

impl From<StoreError> for AssignmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AssignmentError::NotFound(what),
            StoreError::Conflict(msg) => AssignmentError::Conflict(msg),
            StoreError::Version => AssignmentError::Conflict(
                "band was modified concurrently, retry with fresh state".to_string(),
            ),
            StoreError::Backend(msg) => AssignmentError::Internal(msg),
        }
    }
}

/// Coordinates band/pilgrim binding across the device registry and the
/// group pools.
#[derive(Clone)]
pub struct AssignmentCoordinator {
    store: Arc<dyn BandStore>,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<dyn BandStore>) -> Self {
        Self { store }
    }

    /// Binds a band to a pilgrim on behalf of a group.
    ///
    /// Validation ladder: unknown band/pilgrim/group → `NotFound`; band held
    /// by a different pilgrim → `Conflict`; band not active →
    /// `InvalidState`; group enforces its pool and the band is not staged →
    /// `NotAllowed`. A band already held by the same pilgrim converges to
    /// success. The pilgrim's previous band, if different, is auto-released
    /// into the group's pool before the bind commits.
    pub async fn assign(
        &self,
        serial: &str,
        pilgrim_id: Uuid,
        group_id: Uuid,
    ) -> Result<Band, AssignmentError> {
        let band = self
            .store
            .band_by_serial(serial)
            .await?
            .ok_or(AssignmentError::NotFound("band"))?;
        self.store
            .pilgrim_by_id(pilgrim_id)
            .await?
            .ok_or(AssignmentError::NotFound("pilgrim"))?;
        let group = self
            .store
            .group_by_id(group_id)
            .await?
            .ok_or(AssignmentError::NotFound("group"))?;

        let already_held = band.assigned_pilgrim == Some(pilgrim_id);
        if let Some(current) = band.assigned_pilgrim {
            if current != pilgrim_id {
                return Err(AssignmentError::Conflict(format!(
                    "band {serial} is already assigned to another pilgrim"
                )));
            }
        }

        if band.status != BandStatus::Active {
            return Err(AssignmentError::InvalidState(format!(
                "band {serial} is {}, only active bands can be assigned",
                band.status
            )));
        }

        // An assigned band is never staged, so re-binding the holder skips
        // the allow-list.
        if group.enforce_pool && !already_held && !group.pool_contains(serial) {
            return Err(AssignmentError::NotAllowed(format!(
                "band {serial} is not staged in group \"{}\"",
                group.name
            )));
        }

        // Invariant P1: free the pilgrim's previous band before binding the
        // new one. The freed band returns to the commanding group's pool.
        if let Some(previous) = self.store.band_by_pilgrim(pilgrim_id).await? {
            if previous.serial != serial {
                self.store
                    .release_band(&previous.serial, previous.assignment_version, Some(group_id))
                    .await?;
                info!(
                    serial = %previous.serial,
                    pilgrim_id = %pilgrim_id,
                    "Auto-released previous band"
                );
            }
        }

        let bound = self
            .store
            .bind_band(serial, band.assignment_version, pilgrim_id)
            .await?;

        info!(
            serial = %serial,
            pilgrim_id = %pilgrim_id,
            group_id = %group_id,
            "Band assigned"
        );

        Ok(bound)
    }

    /// Releases the band currently held by a pilgrim back into a group's pool.
    pub async fn unassign(
        &self,
        pilgrim_id: Uuid,
        group_id: Uuid,
    ) -> Result<Band, AssignmentError> {
        self.store
            .group_by_id(group_id)
            .await?
            .ok_or(AssignmentError::NotFound("group"))?;

        let band = self
            .store
            .band_by_pilgrim(pilgrim_id)
            .await?
            .ok_or(AssignmentError::NotFound("assignment"))?;

        let released = self
            .store
            .release_band(&band.serial, band.assignment_version, Some(group_id))
            .await?;

        info!(
            serial = %released.serial,
            pilgrim_id = %pilgrim_id,
            group_id = %group_id,
            "Band released"
        );

        Ok(released)
    }

    /// Releases a pilgrim's band without returning it to any pool.
    ///
    /// Used before deleting a pilgrim so the weak assignment reference can
    /// never dangle. Returns the released band, if one was held.
    pub async fn release_for_pilgrim(
        &self,
        pilgrim_id: Uuid,
    ) -> Result<Option<Band>, AssignmentError> {
        let Some(band) = self.store.band_by_pilgrim(pilgrim_id).await? else {
            return Ok(None);
        };
        let released = self
            .store
            .release_band(&band.serial, band.assignment_version, None)
            .await?;
        info!(
            serial = %released.serial,
            pilgrim_id = %pilgrim_id,
            "Band released on pilgrim removal"
        );
        Ok(Some(released))
    }

    /// Deactivates a band, cascading through the release path first.
    ///
    /// The assignment field is never written directly: an assigned band is
    /// released (no pool return), then the status transition commits with
    /// the fresh version token. Pool entries are scrubbed by the status
    /// write itself.
    pub async fn deactivate(&self, serial: &str) -> Result<Band, AssignmentError> {
        let band = self
            .store
            .band_by_serial(serial)
            .await?
            .ok_or(AssignmentError::NotFound("band"))?;

        let band = if band.is_assigned() {
            self.store
                .release_band(serial, band.assignment_version, None)
                .await?
        } else {
            band
        };

        let band = self
            .store
            .set_band_status(serial, band.assignment_version, BandStatus::Inactive)
            .await?;

        info!(serial = %serial, "Band deactivated");
        Ok(band)
    }
}
