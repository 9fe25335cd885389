//! Store aggregates: `Product` (stock ledger) and `Store` (pickup address).

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub is_available: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Store {
    pub store_id: Uuid,
    pub name: String,
    pub pickup_address: String,
}
