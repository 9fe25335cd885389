//! Wire contracts for every routing key in spec §6, plus a concrete sum
//! type over them.
//!
//! Every contract is a flat, `camelCase` DTO — the wire format documents
//! bare fields like `orderId`, not an envelope. The routing key a message
//! travels under (the outbox `type` column, or the AMQP routing key) is
//! carried out of band, so `Event` serializes as the contained DTO
//! directly and is parsed back via `Event::from_routing_key` rather than
//! through `Deserialize`.
//!
//! The original Notification fan-out used reflection to pull recipient
//! ids out of arbitrary event payloads (spec §9, Design Notes). We use a
//! closed enum instead: each event contract exposes the ids relevant to
//! routing through plain accessors, and `Event::from_routing_key` is the
//! one place that needs updating when a new routing key is added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// A single line item, carried by order-creation and reservation events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Order status as it appears on the wire (matches spec §3 exactly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusDto {
    Pending,
    ReservingStock,
    Preparing,
    OnTheWay,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReservationRequested {
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<ItemDto>,
    pub shipping_address: String,
    /// Always null at this point — Store fills it in once reserved.
    pub pickup_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReserved {
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub pickup_address: String,
    pub shipping_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReservationFailed {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelled {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub old_status: OrderStatusDto,
    /// Empty unless `old_status` is `Preparing` or `OnTheWay`.
    pub items: Vec<ItemDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPreparing {
    pub order_id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub pickup_address: String,
    pub shipping_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierAssigned {
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierAssignmentFailed {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAssigned {
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub pickup_address: String,
    pub shipping_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOnTheWay {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub courier_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDelivered {
    pub order_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanged {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDeleted {
    pub product_id: Uuid,
    pub store_id: Uuid,
}

/// Every event this system exchanges.
///
/// Serializes as the contained DTO directly — `#[serde(untagged)]` drops
/// the variant tag, so the wire body is the flat, `camelCase` payload
/// spec §6 documents, with no `type`/`payload` envelope. The routing key
/// travels out of band (the outbox `type` column, the AMQP routing key),
/// so there is deliberately no `Deserialize` impl here: use
/// `Event::from_routing_key` to parse a payload once its routing key is
/// known.
///
/// `Event::recipient_user_id` / `Event::aggregate_id` are the accessors
/// that replace reflective field pulling in the Notification fan-out.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Event {
    OrderCreated(OrderCreated),
    OrderPreparing(OrderPreparing),
    StockReservationRequested(StockReservationRequested),
    StockReserved(StockReserved),
    StockReservationFailed(StockReservationFailed),
    OrderAssigned(OrderAssigned),
    OrderOnTheWay(OrderOnTheWay),
    OrderDelivered(OrderDelivered),
    OrderCancelled(OrderCancelled),
    CourierAssigned(CourierAssigned),
    CourierAssignmentFailed(CourierAssignmentFailed),
    ProductCreated(ProductChanged),
    ProductUpdated(ProductChanged),
    ProductDeleted(ProductDeleted),
}

impl Event {
    /// The routing key this event must be published under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            Event::OrderCreated(_) => "order.created",
            Event::OrderPreparing(_) => "order.preparing",
            Event::StockReservationRequested(_) => "order.stock_reservation.requested",
            Event::StockReserved(_) => "order.stock_reserved",
            Event::StockReservationFailed(_) => "order.stock_reservation_failed",
            Event::OrderAssigned(_) => "order.assigned",
            Event::OrderOnTheWay(_) => "order.on_the_way",
            Event::OrderDelivered(_) => "order.delivered",
            Event::OrderCancelled(_) => "order.cancelled",
            Event::CourierAssigned(_) => "courier.assigned",
            Event::CourierAssignmentFailed(_) => "courier.assignment.failed",
            Event::ProductCreated(_) => "product.created",
            Event::ProductUpdated(_) => "product.updated",
            Event::ProductDeleted(_) => "product.deleted",
        }
    }

    /// Parse a payload whose routing key is already known — the inverse
    /// of `routing_key`. The payload is the flat DTO body as stored in
    /// the outbox or received off the wire, not a tagged envelope.
    pub fn from_routing_key(routing_key: &str, payload: &serde_json::Value) -> Result<Event> {
        Ok(match routing_key {
            "order.created" => Event::OrderCreated(serde_json::from_value(payload.clone())?),
            "order.preparing" => Event::OrderPreparing(serde_json::from_value(payload.clone())?),
            "order.stock_reservation.requested" => {
                Event::StockReservationRequested(serde_json::from_value(payload.clone())?)
            }
            "order.stock_reserved" => Event::StockReserved(serde_json::from_value(payload.clone())?),
            "order.stock_reservation_failed" => {
                Event::StockReservationFailed(serde_json::from_value(payload.clone())?)
            }
            "order.assigned" => Event::OrderAssigned(serde_json::from_value(payload.clone())?),
            "order.on_the_way" => Event::OrderOnTheWay(serde_json::from_value(payload.clone())?),
            "order.delivered" => Event::OrderDelivered(serde_json::from_value(payload.clone())?),
            "order.cancelled" => Event::OrderCancelled(serde_json::from_value(payload.clone())?),
            "courier.assigned" => Event::CourierAssigned(serde_json::from_value(payload.clone())?),
            "courier.assignment.failed" => {
                Event::CourierAssignmentFailed(serde_json::from_value(payload.clone())?)
            }
            "product.created" => Event::ProductCreated(serde_json::from_value(payload.clone())?),
            "product.updated" => Event::ProductUpdated(serde_json::from_value(payload.clone())?),
            "product.deleted" => Event::ProductDeleted(serde_json::from_value(payload.clone())?),
            other => return Err(CoreError::ValidationFailure(format!("unknown routing key: {other}"))),
        })
    }

    /// The user that should be notified about this event, if any.
    /// Grounds the Notification fan-out (spec §4.6) without reflection.
    pub fn recipient_user_id(&self) -> Option<Uuid> {
        match self {
            Event::OrderCreated(e) => Some(e.user_id),
            Event::OrderPreparing(e) => Some(e.user_id),
            Event::StockReserved(e) => Some(e.user_id),
            Event::StockReservationFailed(e) => Some(e.user_id),
            Event::OrderAssigned(e) => Some(e.user_id),
            Event::OrderOnTheWay(e) => Some(e.user_id),
            Event::OrderDelivered(e) => Some(e.user_id),
            Event::OrderCancelled(e) => Some(e.user_id),
            Event::CourierAssignmentFailed(e) => Some(e.user_id),
            Event::StockReservationRequested(_)
            | Event::CourierAssigned(_)
            | Event::ProductCreated(_)
            | Event::ProductUpdated(_)
            | Event::ProductDeleted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_matches_spec_literal() {
        let event = Event::OrderCancelled(OrderCancelled {
            order_id: Uuid::nil(),
            user_id: Uuid::nil(),
            store_id: Uuid::nil(),
            old_status: OrderStatusDto::Preparing,
            items: vec![],
        });
        assert_eq!(event.routing_key(), "order.cancelled");
    }

    #[test]
    fn roundtrips_through_json_via_routing_key() {
        let event = Event::StockReserved(StockReserved {
            order_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            pickup_address: "123 Main St".into(),
            shipping_address: "456 Oak Ave".into(),
        });
        let value = serde_json::to_value(&event).unwrap();
        // flat DTO, no envelope: the fields live at the top level.
        assert_eq!(value["orderId"], serde_json::json!(match &event {
            Event::StockReserved(e) => e.order_id,
            _ => unreachable!(),
        }));
        assert!(value.get("type").is_none());
        assert!(value.get("payload").is_none());

        let back = Event::from_routing_key(event.routing_key(), &value).unwrap();
        assert_eq!(event.routing_key(), back.routing_key());
    }

    #[test]
    fn from_routing_key_rejects_unknown_keys() {
        let err = Event::from_routing_key("order.teleported", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailure(_)));
    }

    #[test]
    fn unrouted_events_have_no_recipient() {
        let event = Event::CourierAssigned(CourierAssigned {
            order_id: Uuid::new_v4(),
            courier_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        });
        // courier.assigned fans out to the Order subscriber, not directly
        // to a user notification row.
        assert_eq!(event.recipient_user_id(), None);
    }
}
