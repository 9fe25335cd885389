//! Order aggregate types (spec §3, §4.1).

use chrono::{DateTime, Utc};
use foodcore::contracts::OrderStatusDto;
use uuid::Uuid;

/// Order status (spec §4.1 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    ReservingStock,
    Preparing,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl From<OrderStatus> for OrderStatusDto {
    fn from(s: OrderStatus) -> Self {
        match s {
            OrderStatus::Pending => OrderStatusDto::Pending,
            OrderStatus::ReservingStock => OrderStatusDto::ReservingStock,
            OrderStatus::Preparing => OrderStatusDto::Preparing,
            OrderStatus::OnTheWay => OrderStatusDto::OnTheWay,
            OrderStatus::Delivered => OrderStatusDto::Delivered,
            OrderStatus::Cancelled => OrderStatusDto::Cancelled,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::ReservingStock => "RESERVING_STOCK",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::OnTheWay => "ON_THE_WAY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// A line item. Owned by `Order`; never holds a back-reference to it
/// (spec §9 Design Notes: no Order <-> OrderItem cycle in memory).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

/// The Order aggregate (spec §3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub store_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub total_price: i64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub pickup_address: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-model projection of a Store product (spec §3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSnapshot {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub is_available: bool,
}

/// Who is allowed to perform an order operation (spec §4.1 caller checks).
#[derive(Debug, Clone, Copy)]
pub enum Caller {
    Customer(Uuid),
    StoreOwner(Uuid),
    Courier(Uuid),
}
