//! Persistence for the Notification read model.

use chrono::Utc;
use foodcore::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Notification;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        id: Uuid,
        recipient_id: Uuid,
        event_type: &str,
        order_id: Option<Uuid>,
        courier_id: Option<Uuid>,
        store_id: Option<Uuid>,
        payload: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications
             (id, recipient_id, event_type, order_id, courier_id, store_id, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(recipient_id)
        .bind(event_type)
        .bind(order_id)
        .bind(courier_id)
        .bind(store_id)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_delivered(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notifications SET delivered_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn undelivered_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient_id = $1 AND delivered_at IS NULL ORDER BY created_at ASC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
