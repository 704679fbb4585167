//! In-memory `BandStore` implementation.
//!
//! A transactional store with per-record atomic update: every trait method
//! runs inside a single lock scope, so the multi-record commit primitives
//! (`bind_band`, `release_band`, `add_to_pool`, `delete_band`) observe and
//! mutate bands and pools together without torn intermediate states. Used by
//! the test suite and by the `memory` database backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::{Band, BandStatus, Group, Pilgrim};
use domain::store::{
    BandFilter, BandStore, FleetStats, NewBand, NewGroup, NewPilgrim, StoreError, TelemetryUpdate,
};

#[derive(Default)]
struct MemoryInner {
    bands: HashMap<String, Band>,
    pilgrims: HashMap<Uuid, Pilgrim>,
    groups: HashMap<Uuid, Group>,
}

/// Volatile store holding the whole fleet behind one async lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "test-util")]
impl MemoryStore {
    /// Fault injection: inserts a pool entry without any staging checks.
    ///
    /// Recreates the pool/assignment divergence the consistency auditor
    /// exists to repair. Returns false if the group does not exist.
    pub async fn inject_pool_entry(&self, group_id: Uuid, serial: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.groups.get_mut(&group_id) {
            Some(group) => {
                if !group.pool.iter().any(|s| s == serial) {
                    group.pool.push(serial.to_string());
                }
                true
            }
            None => false,
        }
    }
}

/// Removes a serial from every group's pool.
fn scrub_pools(groups: &mut HashMap<Uuid, Group>, serial: &str) {
    for group in groups.values_mut() {
        group.pool.retain(|s| s != serial);
    }
}

#[async_trait]
impl BandStore for MemoryStore {
    async fn insert_band(&self, new: NewBand) -> Result<Band, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.bands.contains_key(&new.serial) {
            return Err(StoreError::Conflict(format!(
                "band with serial {} already exists",
                new.serial
            )));
        }
        let now = Utc::now();
        let band = Band {
            serial: new.serial.clone(),
            imei: new.imei,
            battery_percent: None,
            status: BandStatus::Active,
            assigned_pilgrim: None,
            last_latitude: None,
            last_longitude: None,
            last_seen_at: None,
            assignment_version: 0,
            created_at: now,
            updated_at: now,
        };
        inner.bands.insert(new.serial, band.clone());
        Ok(band)
    }

    async fn band_by_serial(&self, serial: &str) -> Result<Option<Band>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.bands.get(serial).cloned())
    }

    async fn band_by_pilgrim(&self, pilgrim_id: Uuid) -> Result<Option<Band>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bands
            .values()
            .find(|band| band.assigned_pilgrim == Some(pilgrim_id))
            .cloned())
    }

    async fn list_bands(
        &self,
        filter: BandFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Band>, i64), StoreError> {
        let inner = self.inner.read().await;
        let mut bands: Vec<Band> = inner
            .bands
            .values()
            .filter(|band| filter.status.map_or(true, |status| band.status == status))
            .cloned()
            .collect();
        bands.sort_by(|a, b| a.serial.cmp(&b.serial));
        let total = bands.len() as i64;
        let page = bands
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn record_telemetry(
        &self,
        serial: &str,
        update: TelemetryUpdate,
    ) -> Result<Band, StoreError> {
        let mut inner = self.inner.write().await;
        let band = inner
            .bands
            .get_mut(serial)
            .ok_or(StoreError::NotFound("band"))?;
        band.last_latitude = Some(update.latitude);
        band.last_longitude = Some(update.longitude);
        if let Some(battery) = update.battery_percent {
            band.battery_percent = Some(battery);
        }
        band.last_seen_at = Some(update.seen_at);
        band.updated_at = update.seen_at;
        Ok(band.clone())
    }

    async fn set_band_status(
        &self,
        serial: &str,
        expected_version: i64,
        status: BandStatus,
    ) -> Result<Band, StoreError> {
        let mut inner = self.inner.write().await;
        let MemoryInner { bands, groups, .. } = &mut *inner;
        let band = bands.get_mut(serial).ok_or(StoreError::NotFound("band"))?;
        if band.assignment_version != expected_version {
            return Err(StoreError::Version);
        }
        if band.assigned_pilgrim.is_some() && status != BandStatus::Active {
            return Err(StoreError::Conflict(format!(
                "band {serial} is assigned and must stay active"
            )));
        }
        band.status = status;
        band.assignment_version += 1;
        band.updated_at = Utc::now();
        if status != BandStatus::Active {
            scrub_pools(groups, serial);
        }
        Ok(band.clone())
    }

    async fn delete_band(&self, serial: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let band = inner
            .bands
            .get(serial)
            .ok_or(StoreError::NotFound("band"))?;
        if band.is_assigned() {
            return Err(StoreError::Conflict(format!(
                "band {serial} is assigned, release it before deregistering"
            )));
        }
        inner.bands.remove(serial);
        scrub_pools(&mut inner.groups, serial);
        Ok(())
    }

    async fn insert_pilgrim(&self, new: NewPilgrim) -> Result<Pilgrim, StoreError> {
        let mut inner = self.inner.write().await;
        let pilgrim = Pilgrim {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            phone_number: new.phone_number,
            national_id: new.national_id,
            medical_notes: new.medical_notes,
            created_at: Utc::now(),
        };
        inner.pilgrims.insert(pilgrim.id, pilgrim.clone());
        Ok(pilgrim)
    }

    async fn pilgrim_by_id(&self, id: Uuid) -> Result<Option<Pilgrim>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.pilgrims.get(&id).cloned())
    }

    async fn list_pilgrims(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Pilgrim>, i64), StoreError> {
        let inner = self.inner.read().await;
        let mut pilgrims: Vec<Pilgrim> = inner.pilgrims.values().cloned().collect();
        pilgrims.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        let total = pilgrims.len() as i64;
        let page = pilgrims
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete_pilgrim(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .pilgrims
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("pilgrim"))
    }

    async fn insert_group(&self, new: NewGroup) -> Result<Group, StoreError> {
        let mut inner = self.inner.write().await;
        let group = Group {
            id: Uuid::new_v4(),
            name: new.name,
            moderator_ids: new.moderator_ids,
            member_ids: new.member_ids,
            enforce_pool: new.enforce_pool,
            pool: Vec::new(),
            created_at: Utc::now(),
        };
        inner.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.groups.get(&id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let inner = self.inner.read().await;
        let mut groups: Vec<Group> = inner.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn add_to_pool(&self, group_id: Uuid, serial: &str) -> Result<Group, StoreError> {
        let mut inner = self.inner.write().await;
        let MemoryInner { bands, groups, .. } = &mut *inner;
        if !groups.contains_key(&group_id) {
            return Err(StoreError::NotFound("group"));
        }
        let band = bands.get(serial).ok_or(StoreError::NotFound("band"))?;
        if band.is_assigned() {
            return Err(StoreError::Conflict(format!(
                "band {serial} is assigned and cannot be pooled"
            )));
        }
        if band.status != BandStatus::Active {
            return Err(StoreError::Conflict(format!(
                "band {serial} is {} and cannot be pooled",
                band.status
            )));
        }
        // Invariant G2: a serial lives in at most one pool, so staging moves it.
        scrub_pools(groups, serial);
        let group = groups
            .get_mut(&group_id)
            .ok_or(StoreError::NotFound("group"))?;
        group.pool.push(serial.to_string());
        Ok(group.clone())
    }

    async fn remove_from_pool(&self, group_id: Uuid, serial: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let group = inner
            .groups
            .get_mut(&group_id)
            .ok_or(StoreError::NotFound("group"))?;
        let before = group.pool.len();
        group.pool.retain(|s| s != serial);
        Ok(group.pool.len() < before)
    }

    async fn available_bands(&self, group_id: Uuid) -> Result<Vec<Band>, StoreError> {
        let inner = self.inner.read().await;
        let group = inner
            .groups
            .get(&group_id)
            .ok_or(StoreError::NotFound("group"))?;
        // Pool membership can lag behind assignment state; re-filter live.
        Ok(group
            .pool
            .iter()
            .filter_map(|serial| inner.bands.get(serial))
            .filter(|band| !band.is_assigned())
            .cloned()
            .collect())
    }

    async fn bind_band(
        &self,
        serial: &str,
        expected_version: i64,
        pilgrim_id: Uuid,
    ) -> Result<Band, StoreError> {
        let mut inner = self.inner.write().await;
        let MemoryInner { bands, groups, .. } = &mut *inner;
        let band = bands.get_mut(serial).ok_or(StoreError::NotFound("band"))?;
        if band.assignment_version != expected_version {
            return Err(StoreError::Version);
        }
        band.assigned_pilgrim = Some(pilgrim_id);
        band.status = BandStatus::Active;
        band.assignment_version += 1;
        band.updated_at = Utc::now();
        // Invariant G1: an assigned band sits in no pool.
        scrub_pools(groups, serial);
        Ok(band.clone())
    }

    async fn release_band(
        &self,
        serial: &str,
        expected_version: i64,
        return_to_pool: Option<Uuid>,
    ) -> Result<Band, StoreError> {
        let mut inner = self.inner.write().await;
        let MemoryInner { bands, groups, .. } = &mut *inner;
        if let Some(group_id) = return_to_pool {
            if !groups.contains_key(&group_id) {
                return Err(StoreError::NotFound("group"));
            }
        }
        let band = bands.get_mut(serial).ok_or(StoreError::NotFound("band"))?;
        if band.assignment_version != expected_version {
            return Err(StoreError::Version);
        }
        band.assigned_pilgrim = None;
        band.assignment_version += 1;
        band.updated_at = Utc::now();
        let released = band.clone();
        if let Some(group_id) = return_to_pool {
            scrub_pools(groups, serial);
            let group = groups
                .get_mut(&group_id)
                .ok_or(StoreError::NotFound("group"))?;
            group.pool.push(serial.to_string());
        }
        Ok(released)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn stats(&self) -> Result<FleetStats, StoreError> {
        let inner = self.inner.read().await;
        let total_bands = inner.bands.len() as i64;
        let active_bands = inner
            .bands
            .values()
            .filter(|band| band.status == BandStatus::Active)
            .count() as i64;
        let assigned_bands = inner
            .bands
            .values()
            .filter(|band| band.is_assigned())
            .count() as i64;
        let pooled_bands = inner
            .groups
            .values()
            .map(|group| group.pool.len() as i64)
            .sum();
        Ok(FleetStats {
            total_bands,
            active_bands,
            assigned_bands,
            unassigned_bands: total_bands - assigned_bands,
            total_pilgrims: inner.pilgrims.len() as i64,
            total_groups: inner.groups.len() as i64,
            pooled_bands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_band(serial: &str) -> NewBand {
        NewBand {
            serial: serial.to_string(),
            imei: None,
        }
    }

    fn new_pilgrim(name: &str) -> NewPilgrim {
        NewPilgrim {
            full_name: name.to_string(),
            email: None,
            phone_number: None,
            national_id: None,
            medical_notes: None,
        }
    }

    fn new_group(name: &str) -> NewGroup {
        NewGroup {
            name: name.to_string(),
            moderator_ids: vec![],
            member_ids: vec![],
            enforce_pool: false,
        }
    }

    #[tokio::test]
    async fn test_insert_band_rejects_duplicate_serial() {
        let store = MemoryStore::new();
        store.insert_band(new_band("BAND-01")).await.unwrap();
        let err = store.insert_band(new_band("BAND-01")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_telemetry_does_not_bump_version() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let update = TelemetryUpdate {
            latitude: 21.4225,
            longitude: 39.8262,
            battery_percent: Some(50),
            seen_at: Utc::now(),
        };
        let updated = store.record_telemetry("BAND-01", update).await.unwrap();
        assert_eq!(updated.assignment_version, band.assignment_version);
        assert_eq!(updated.last_latitude, Some(21.4225));
        assert_eq!(updated.battery_percent, Some(50));
    }

    #[tokio::test]
    async fn test_telemetry_keeps_battery_when_absent() {
        let store = MemoryStore::new();
        store.insert_band(new_band("BAND-01")).await.unwrap();
        let seen_at = Utc::now();
        store
            .record_telemetry(
                "BAND-01",
                TelemetryUpdate {
                    latitude: 1.0,
                    longitude: 2.0,
                    battery_percent: Some(70),
                    seen_at,
                },
            )
            .await
            .unwrap();
        let updated = store
            .record_telemetry(
                "BAND-01",
                TelemetryUpdate {
                    latitude: 3.0,
                    longitude: 4.0,
                    battery_percent: None,
                    seen_at,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.battery_percent, Some(70));
        assert_eq!(updated.last_latitude, Some(3.0));
    }

    #[tokio::test]
    async fn test_bind_band_cas() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();

        let bound = store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();
        assert_eq!(bound.assigned_pilgrim, Some(pilgrim.id));
        assert_eq!(bound.assignment_version, band.assignment_version + 1);

        // The stale token must lose.
        let other = store.insert_pilgrim(new_pilgrim("Fatima Zahra")).await.unwrap();
        let err = store
            .bind_band("BAND-01", band.assignment_version, other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Version));
    }

    #[tokio::test]
    async fn test_bind_band_scrubs_pool() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();

        store.add_to_pool(group.id, "BAND-01").await.unwrap();
        store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();

        let group = store.group_by_id(group.id).await.unwrap().unwrap();
        assert!(group.pool.is_empty());
    }

    #[tokio::test]
    async fn test_add_to_pool_moves_between_groups() {
        let store = MemoryStore::new();
        store.insert_band(new_band("BAND-01")).await.unwrap();
        let g1 = store.insert_group(new_group("Mina Camp 12")).await.unwrap();
        let g2 = store.insert_group(new_group("Arafat Camp 3")).await.unwrap();

        store.add_to_pool(g1.id, "BAND-01").await.unwrap();
        store.add_to_pool(g2.id, "BAND-01").await.unwrap();

        let g1 = store.group_by_id(g1.id).await.unwrap().unwrap();
        let g2 = store.group_by_id(g2.id).await.unwrap().unwrap();
        assert!(g1.pool.is_empty());
        assert_eq!(g2.pool, vec!["BAND-01".to_string()]);
    }

    #[tokio::test]
    async fn test_add_to_pool_rejects_assigned_band() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();

        store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();
        let err = store.add_to_pool(group.id, "BAND-01").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_release_band_returns_to_pool() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();

        let bound = store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();
        let released = store
            .release_band("BAND-01", bound.assignment_version, Some(group.id))
            .await
            .unwrap();
        assert!(released.assigned_pilgrim.is_none());

        let group = store.group_by_id(group.id).await.unwrap().unwrap();
        assert_eq!(group.pool, vec!["BAND-01".to_string()]);
    }

    #[tokio::test]
    async fn test_set_band_status_guards_d1() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        let bound = store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();

        let err = store
            .set_band_status("BAND-01", bound.assignment_version, BandStatus::Inactive)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_band_status_inactive_scrubs_pool() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();
        store.add_to_pool(group.id, "BAND-01").await.unwrap();

        store
            .set_band_status("BAND-01", band.assignment_version, BandStatus::Maintenance)
            .await
            .unwrap();

        let group = store.group_by_id(group.id).await.unwrap().unwrap();
        assert!(group.pool.is_empty());
    }

    #[tokio::test]
    async fn test_delete_band_rejects_assigned() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();

        let err = store.delete_band("BAND-01").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_band_scrubs_pool() {
        let store = MemoryStore::new();
        store.insert_band(new_band("BAND-01")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();
        store.add_to_pool(group.id, "BAND-01").await.unwrap();

        store.delete_band("BAND-01").await.unwrap();
        let group = store.group_by_id(group.id).await.unwrap().unwrap();
        assert!(group.pool.is_empty());
    }

    #[tokio::test]
    async fn test_available_bands_refilters_live_state() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();
        store.add_to_pool(group.id, "BAND-01").await.unwrap();

        // Corrupt the pool the way the legacy write path used to: bind the
        // band, then put the serial straight back into the pool set.
        store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();
        {
            let mut inner = store.inner.write().await;
            inner
                .groups
                .get_mut(&group.id)
                .unwrap()
                .pool
                .push("BAND-01".to_string());
        }

        let available = store.available_bands(group.id).await.unwrap();
        assert!(available.is_empty());
    }

    #[tokio::test]
    async fn test_list_bands_filter_and_pagination() {
        let store = MemoryStore::new();
        for i in 1..=5 {
            store.insert_band(new_band(&format!("BAND-0{i}"))).await.unwrap();
        }
        let band = store.band_by_serial("BAND-05").await.unwrap().unwrap();
        store
            .set_band_status("BAND-05", band.assignment_version, BandStatus::Inactive)
            .await
            .unwrap();

        let (page, total) = store
            .list_bands(
                BandFilter {
                    status: Some(BandStatus::Active),
                },
                0,
                2,
            )
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].serial, "BAND-01");

        let (page, _) = store.list_bands(BandFilter::default(), 4, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].serial, "BAND-05");
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::new();
        let band = store.insert_band(new_band("BAND-01")).await.unwrap();
        store.insert_band(new_band("BAND-02")).await.unwrap();
        let pilgrim = store.insert_pilgrim(new_pilgrim("Ahmed Al-Farsi")).await.unwrap();
        let group = store.insert_group(new_group("Mina Camp 12")).await.unwrap();
        store.add_to_pool(group.id, "BAND-02").await.unwrap();
        store
            .bind_band("BAND-01", band.assignment_version, pilgrim.id)
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_bands, 2);
        assert_eq!(stats.assigned_bands, 1);
        assert_eq!(stats.unassigned_bands, 1);
        assert_eq!(stats.pooled_bands, 1);
        assert_eq!(stats.total_pilgrims, 1);
        assert_eq!(stats.total_groups, 1);
    }
}
