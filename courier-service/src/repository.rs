//! Persistence for the Courier aggregate.

use chrono::Utc;
use foodcore::error::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Courier, CourierStatus};

#[derive(Clone)]
pub struct CourierRepository {
    pool: PgPool,
}

impl CourierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Candidates for assignment: active and currently available. Ranking
    /// by distance happens in memory once coordinates are known (spec
    /// §4.3 point 4), not in SQL.
    pub async fn available_active(&self) -> Result<Vec<Courier>> {
        let couriers = sqlx::query_as::<_, Courier>(
            "SELECT * FROM couriers WHERE status = $1 AND is_active = true",
        )
        .bind(CourierStatus::Available)
        .fetch_all(&self.pool)
        .await?;
        Ok(couriers)
    }

    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        courier_id: Uuid,
    ) -> Result<Option<Courier>> {
        let courier =
            sqlx::query_as::<_, Courier>("SELECT * FROM couriers WHERE courier_id = $1 FOR UPDATE")
                .bind(courier_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(courier)
    }

    /// Set `status`, bumping `version`. The caller is expected to have
    /// re-read the row with `get_for_update` and re-checked `status` and
    /// `version` in the same transaction (optimistic + pessimistic
    /// double-check, spec §4.3 point 5).
    pub async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        courier_id: Uuid,
        expected_version: i32,
        status: CourierStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE couriers
             SET status = $3, version = version + 1, updated_at = $4
             WHERE courier_id = $1 AND version = $2",
        )
        .bind(courier_id)
        .bind(expected_version)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn upsert(&self, courier: &Courier) -> Result<()> {
        sqlx::query(
            "INSERT INTO couriers
             (courier_id, name, status, is_active, latitude, longitude, version, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (courier_id) DO UPDATE SET
                name = EXCLUDED.name,
                status = EXCLUDED.status,
                is_active = EXCLUDED.is_active,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(courier.courier_id)
        .bind(&courier.name)
        .bind(courier.status)
        .bind(courier.is_active)
        .bind(courier.latitude)
        .bind(courier.longitude)
        .bind(courier.version)
        .bind(courier.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, courier_id: Uuid) -> Result<Option<Courier>> {
        let courier = sqlx::query_as::<_, Courier>("SELECT * FROM couriers WHERE courier_id = $1")
            .bind(courier_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(courier)
    }
}
