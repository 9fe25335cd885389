//! Persistence for the Order aggregate and its product-snapshot read model.

use chrono::Utc;
use foodcore::error::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Order, OrderItem, OrderStatus, ProductSnapshot};

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Load the order row with a pessimistic write lock, inside `tx`.
    /// The implicit row lock within the update transaction is what
    /// prevents out-of-order saga replies from corrupting state
    /// (spec §5).
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(order)
    }

    pub async fn items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn items_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(items)
    }

    pub async fn insert_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders
             (id, customer_id, store_id, courier_id, total_price, status,
              shipping_address, pickup_address, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.store_id)
        .bind(order.courier_id)
        .bind(order.total_price)
        .bind(order.status)
        .bind(&order.shipping_address)
        .bind(&order.pickup_address)
        .bind(order.version)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items
                 (id, order_id, product_id, product_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Persist a status transition (and optionally courier/pickup
    /// address), bumping `version`. Every state-changing handler pairs
    /// this with an `outbox::append` call in the same transaction
    /// (spec §4.1).
    pub async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        status: OrderStatus,
        courier_id: Option<Uuid>,
        pickup_address: Option<String>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE orders
             SET status = $2,
                 courier_id = COALESCE($3, courier_id),
                 pickup_address = COALESCE($4, pickup_address),
                 version = version + 1,
                 updated_at = $5
             WHERE id = $1",
        )
        .bind(order_id)
        .bind(status)
        .bind(courier_id)
        .bind(pickup_address)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_product_snapshot(&self, snapshot: &ProductSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO product_snapshots (product_id, store_id, name, price, stock, is_available)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (product_id) DO UPDATE SET
                store_id = EXCLUDED.store_id,
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                is_available = EXCLUDED.is_available",
        )
        .bind(snapshot.product_id)
        .bind(snapshot.store_id)
        .bind(&snapshot.name)
        .bind(snapshot.price)
        .bind(snapshot.stock)
        .bind(snapshot.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_product_snapshot(&self, product_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM product_snapshots WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn product_snapshot(&self, product_id: Uuid) -> Result<Option<ProductSnapshot>> {
        let snapshot =
            sqlx::query_as::<_, ProductSnapshot>("SELECT * FROM product_snapshots WHERE product_id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(snapshot)
    }
}
