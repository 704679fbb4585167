//! PostgreSQL `BandStore` implementation.
//!
//! Multi-record operations (`bind_band`, `release_band`, `add_to_pool`,
//! `set_band_status`, `delete_band`) run inside one transaction so the band
//! row and the pool join table never disagree after a commit. Assignment
//! writes are guarded by `WHERE assignment_version = $n`; a zero-row update
//! is diagnosed into `NotFound` or `Version` instead of being retried
//! blindly. The UNIQUE constraint on `group_pool_members.band_serial` backs
//! invariant G2 at the schema level.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::band::UnknownStatus;
use domain::models::{Band, BandStatus, Group, Pilgrim};
use domain::store::{
    BandFilter, BandStore, FleetStats, NewBand, NewGroup, NewPilgrim, StoreError, TelemetryUpdate,
};

use crate::entities::{BandEntity, GroupEntity, PilgrimEntity};

const BAND_COLUMNS: &str = "serial, imei, battery_percent, status, assigned_pilgrim, \
     last_latitude, last_longitude, last_seen_at, assignment_version, created_at, updated_at";

/// `BandStore` backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PgStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        let entity = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, moderator_ids, member_ids, enforce_pool, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(entity) = entity else {
            return Ok(None);
        };

        let pool = sqlx::query_scalar::<_, String>(
            r#"
            SELECT band_serial FROM group_pool_members
            WHERE group_id = $1
            ORDER BY added_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Some(entity.into_group(pool)))
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn bad_status(err: UnknownStatus) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

#[async_trait]
impl BandStore for PgStore {
    async fn insert_band(&self, new: NewBand) -> Result<Band, StoreError> {
        let now = Utc::now();
        let result = sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            INSERT INTO bands (serial, imei, status, assignment_version, created_at, updated_at)
            VALUES ($1, $2, 'active', 0, $3, $3)
            RETURNING {BAND_COLUMNS}
            "#
        ))
        .bind(&new.serial)
        .bind(&new.imei)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(entity) => entity.try_into().map_err(bad_status),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(format!(
                "band with serial {} already exists",
                new.serial
            ))),
            Err(err) => Err(backend(err)),
        }
    }

    async fn band_by_serial(&self, serial: &str) -> Result<Option<Band>, StoreError> {
        sqlx::query_as::<_, BandEntity>(&format!(
            "SELECT {BAND_COLUMNS} FROM bands WHERE serial = $1"
        ))
        .bind(serial)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(|entity| entity.try_into().map_err(bad_status))
        .transpose()
    }

    async fn band_by_pilgrim(&self, pilgrim_id: Uuid) -> Result<Option<Band>, StoreError> {
        sqlx::query_as::<_, BandEntity>(&format!(
            "SELECT {BAND_COLUMNS} FROM bands WHERE assigned_pilgrim = $1"
        ))
        .bind(pilgrim_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(|entity| entity.try_into().map_err(bad_status))
        .transpose()
    }

    async fn list_bands(
        &self,
        filter: BandFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Band>, i64), StoreError> {
        let status = filter.status.map(|s| s.as_str());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bands WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let entities = sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            SELECT {BAND_COLUMNS} FROM bands
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY serial ASC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(status)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let bands = entities
            .into_iter()
            .map(|entity| entity.try_into().map_err(bad_status))
            .collect::<Result<Vec<Band>, StoreError>>()?;
        Ok((bands, total))
    }

    async fn record_telemetry(
        &self,
        serial: &str,
        update: TelemetryUpdate,
    ) -> Result<Band, StoreError> {
        // Single-row merge; assignment_version is deliberately untouched so
        // telemetry never contends with assignment CAS writes.
        sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            UPDATE bands
            SET last_latitude = $2,
                last_longitude = $3,
                battery_percent = COALESCE($4, battery_percent),
                last_seen_at = $5,
                updated_at = $5
            WHERE serial = $1
            RETURNING {BAND_COLUMNS}
            "#
        ))
        .bind(serial)
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.battery_percent)
        .bind(update.seen_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound("band"))?
        .try_into()
        .map_err(bad_status)
    }

    async fn set_band_status(
        &self,
        serial: &str,
        expected_version: i64,
        status: BandStatus,
    ) -> Result<Band, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let updated = sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            UPDATE bands
            SET status = $2,
                assignment_version = assignment_version + 1,
                updated_at = NOW()
            WHERE serial = $1
              AND assignment_version = $3
              AND (assigned_pilgrim IS NULL OR $2 = 'active')
            RETURNING {BAND_COLUMNS}
            "#
        ))
        .bind(serial)
        .bind(status.as_str())
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(entity) = updated else {
            let row: Option<(i64, Option<Uuid>)> = sqlx::query_as(
                "SELECT assignment_version, assigned_pilgrim FROM bands WHERE serial = $1",
            )
            .bind(serial)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;

            return match row {
                None => Err(StoreError::NotFound("band")),
                Some((version, _)) if version != expected_version => Err(StoreError::Version),
                Some(_) => Err(StoreError::Conflict(format!(
                    "band {serial} is assigned and must stay active"
                ))),
            };
        };

        if status != BandStatus::Active {
            sqlx::query("DELETE FROM group_pool_members WHERE band_serial = $1")
                .bind(serial)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        entity.try_into().map_err(bad_status)
    }

    async fn delete_band(&self, serial: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT assigned_pilgrim FROM bands WHERE serial = $1 FOR UPDATE")
                .bind(serial)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;

        match row {
            None => return Err(StoreError::NotFound("band")),
            Some((Some(_),)) => {
                return Err(StoreError::Conflict(format!(
                    "band {serial} is assigned, release it before deregistering"
                )))
            }
            Some((None,)) => {}
        }

        sqlx::query("DELETE FROM group_pool_members WHERE band_serial = $1")
            .bind(serial)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM bands WHERE serial = $1")
            .bind(serial)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)
    }

    async fn insert_pilgrim(&self, new: NewPilgrim) -> Result<Pilgrim, StoreError> {
        let entity = sqlx::query_as::<_, PilgrimEntity>(
            r#"
            INSERT INTO pilgrims (id, full_name, email, phone_number, national_id, medical_notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, full_name, email, phone_number, national_id, medical_notes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone_number)
        .bind(&new.national_id)
        .bind(&new.medical_notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(entity.into())
    }

    async fn pilgrim_by_id(&self, id: Uuid) -> Result<Option<Pilgrim>, StoreError> {
        let entity = sqlx::query_as::<_, PilgrimEntity>(
            r#"
            SELECT id, full_name, email, phone_number, national_id, medical_notes, created_at
            FROM pilgrims
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(entity.map(Into::into))
    }

    async fn list_pilgrims(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Pilgrim>, i64), StoreError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pilgrims")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        let entities = sqlx::query_as::<_, PilgrimEntity>(
            r#"
            SELECT id, full_name, email, phone_number, national_id, medical_notes, created_at
            FROM pilgrims
            ORDER BY full_name ASC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok((entities.into_iter().map(Into::into).collect(), total))
    }

    async fn delete_pilgrim(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM pilgrims WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("pilgrim"));
        }
        Ok(())
    }

    async fn insert_group(&self, new: NewGroup) -> Result<Group, StoreError> {
        let entity = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO groups (id, name, moderator_ids, member_ids, enforce_pool, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, moderator_ids, member_ids, enforce_pool, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.moderator_ids)
        .bind(&new.member_ids)
        .bind(new.enforce_pool)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(entity.into_group(Vec::new()))
    }

    async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        self.load_group(id).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let entities = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, moderator_ids, member_ids, enforce_pool, created_at
            FROM groups
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut groups = Vec::with_capacity(entities.len());
        for entity in entities {
            let pool = sqlx::query_scalar::<_, String>(
                r#"
                SELECT band_serial FROM group_pool_members
                WHERE group_id = $1
                ORDER BY added_at ASC
                "#,
            )
            .bind(entity.id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
            groups.push(entity.into_group(pool));
        }
        Ok(groups)
    }

    async fn add_to_pool(&self, group_id: Uuid, serial: &str) -> Result<Group, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let group_exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        if group_exists.is_none() {
            return Err(StoreError::NotFound("group"));
        }

        let band: Option<(Option<Uuid>, String)> = sqlx::query_as(
            "SELECT assigned_pilgrim, status FROM bands WHERE serial = $1 FOR UPDATE",
        )
        .bind(serial)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        match band {
            None => return Err(StoreError::NotFound("band")),
            Some((Some(_), _)) => {
                return Err(StoreError::Conflict(format!(
                    "band {serial} is assigned and cannot be pooled"
                )))
            }
            Some((None, status)) if status != "active" => {
                return Err(StoreError::Conflict(format!(
                    "band {serial} is {status} and cannot be pooled"
                )))
            }
            Some((None, _)) => {}
        }

        // The UNIQUE(band_serial) constraint turns re-staging into a move.
        sqlx::query(
            r#"
            INSERT INTO group_pool_members (group_id, band_serial, added_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (band_serial)
            DO UPDATE SET group_id = EXCLUDED.group_id, added_at = EXCLUDED.added_at
            "#,
        )
        .bind(group_id)
        .bind(serial)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        self.load_group(group_id)
            .await?
            .ok_or(StoreError::NotFound("group"))
    }

    async fn remove_from_pool(&self, group_id: Uuid, serial: &str) -> Result<bool, StoreError> {
        let group_exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        if group_exists.is_none() {
            return Err(StoreError::NotFound("group"));
        }

        let result = sqlx::query(
            "DELETE FROM group_pool_members WHERE group_id = $1 AND band_serial = $2",
        )
        .bind(group_id)
        .bind(serial)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn available_bands(&self, group_id: Uuid) -> Result<Vec<Band>, StoreError> {
        let group_exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        if group_exists.is_none() {
            return Err(StoreError::NotFound("group"));
        }

        // Defensive read: join against live assignment state instead of
        // trusting pool membership alone.
        let entities = sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            SELECT {BAND_COLUMNS_PREFIXED} FROM bands b
            JOIN group_pool_members p ON p.band_serial = b.serial
            WHERE p.group_id = $1 AND b.assigned_pilgrim IS NULL
            ORDER BY b.serial ASC
            "#,
            BAND_COLUMNS_PREFIXED = "b.serial, b.imei, b.battery_percent, b.status, \
                 b.assigned_pilgrim, b.last_latitude, b.last_longitude, b.last_seen_at, \
                 b.assignment_version, b.created_at, b.updated_at"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        entities
            .into_iter()
            .map(|entity| entity.try_into().map_err(bad_status))
            .collect()
    }

    async fn bind_band(
        &self,
        serial: &str,
        expected_version: i64,
        pilgrim_id: Uuid,
    ) -> Result<Band, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let updated = sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            UPDATE bands
            SET assigned_pilgrim = $2,
                status = 'active',
                assignment_version = assignment_version + 1,
                updated_at = NOW()
            WHERE serial = $1 AND assignment_version = $3
            RETURNING {BAND_COLUMNS}
            "#
        ))
        .bind(serial)
        .bind(pilgrim_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(entity) = updated else {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT assignment_version FROM bands WHERE serial = $1")
                    .bind(serial)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(backend)?;
            return match exists {
                None => Err(StoreError::NotFound("band")),
                Some(_) => Err(StoreError::Version),
            };
        };

        // Invariant G1: an assigned band sits in no pool.
        sqlx::query("DELETE FROM group_pool_members WHERE band_serial = $1")
            .bind(serial)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        entity.try_into().map_err(bad_status)
    }

    async fn release_band(
        &self,
        serial: &str,
        expected_version: i64,
        return_to_pool: Option<Uuid>,
    ) -> Result<Band, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        if let Some(group_id) = return_to_pool {
            let group_exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM groups WHERE id = $1")
                    .bind(group_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(backend)?;
            if group_exists.is_none() {
                return Err(StoreError::NotFound("group"));
            }
        }

        let updated = sqlx::query_as::<_, BandEntity>(&format!(
            r#"
            UPDATE bands
            SET assigned_pilgrim = NULL,
                assignment_version = assignment_version + 1,
                updated_at = NOW()
            WHERE serial = $1 AND assignment_version = $2
            RETURNING {BAND_COLUMNS}
            "#
        ))
        .bind(serial)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(entity) = updated else {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT assignment_version FROM bands WHERE serial = $1")
                    .bind(serial)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(backend)?;
            return match exists {
                None => Err(StoreError::NotFound("band")),
                Some(_) => Err(StoreError::Version),
            };
        };

        if let Some(group_id) = return_to_pool {
            sqlx::query(
                r#"
                INSERT INTO group_pool_members (group_id, band_serial, added_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (band_serial)
                DO UPDATE SET group_id = EXCLUDED.group_id, added_at = EXCLUDED.added_at
                "#,
            )
            .bind(group_id)
            .bind(serial)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        entity.try_into().map_err(bad_status)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(backend)
    }

    async fn stats(&self) -> Result<FleetStats, StoreError> {
        let (total_bands, active_bands, assigned_bands): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'active'),
                COUNT(*) FILTER (WHERE assigned_pilgrim IS NOT NULL)
            FROM bands
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let (total_pilgrims,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pilgrims")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let (total_groups,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let (pooled_bands,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM group_pool_members")
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;

        Ok(FleetStats {
            total_bands,
            active_bands,
            assigned_bands,
            unassigned_bands: total_bands - assigned_bands,
            total_pilgrims,
            total_groups,
            pooled_bands,
        })
    }
}
