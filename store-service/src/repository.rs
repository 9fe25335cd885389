//! Persistence for products and stores.
//!
//! `lock_products_sorted` acquires pessimistic write locks on a set of
//! product rows in a deterministic (sorted by id) order — the mechanism
//! that keeps concurrent multi-item reservations from deadlocking on
//! overlapping product sets (spec §4.2, §5).

use chrono::Utc;
use foodcore::error::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Product, Store};

#[derive(Clone)]
pub struct StoreRepository {
    pool: PgPool,
}

impl StoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn store(&self, store_id: Uuid) -> Result<Option<Store>> {
        let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE store_id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }

    pub async fn upsert_store(&self, store: &Store) -> Result<()> {
        sqlx::query(
            "INSERT INTO stores (store_id, name, pickup_address)
             VALUES ($1, $2, $3)
             ON CONFLICT (store_id) DO UPDATE SET
                name = EXCLUDED.name, pickup_address = EXCLUDED.pickup_address",
        )
        .bind(store.store_id)
        .bind(&store.name)
        .bind(&store.pickup_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products
             (product_id, store_id, name, price, stock, is_available, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (product_id) DO UPDATE SET
                store_id = EXCLUDED.store_id,
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                is_available = EXCLUDED.is_available,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(product.product_id)
        .bind(product.store_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.is_available)
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_product(&self, product_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn product(&self, product_id: Uuid) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Lock every row in `product_ids` for update, in ascending id order,
    /// inside `tx`. Any overlapping reservation touching the same set of
    /// products serialises on this lock acquisition order rather than
    /// deadlocking (spec §4.2, §5).
    pub async fn lock_products_sorted(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_ids: &[Uuid],
    ) -> Result<Vec<Product>> {
        let mut sorted = product_ids.to_vec();
        sorted.sort();

        let mut locked = Vec::with_capacity(sorted.len());
        for product_id in sorted {
            let row = sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE product_id = $1 FOR UPDATE",
            )
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;
            if let Some(row) = row {
                locked.push(row);
            }
        }
        Ok(locked)
    }

    pub async fn decrement_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE products
             SET stock = stock - $2, version = version + 1, updated_at = $3
             WHERE product_id = $1",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn increment_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE products
             SET stock = stock + $2, version = version + 1, updated_at = $3
             WHERE product_id = $1",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
