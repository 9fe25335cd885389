//! Event bus abstraction.
//!
//! Mirrors the teacher's `bus::amqp` / `bus::direct` split: one real
//! implementation backed by RabbitMQ, one in-process implementation used
//! by tests and single-binary deployments (spec §9, "no process-wide
//! singletons" — the in-memory bus is an explicit fixture, not a
//! static).

pub mod amqp;
pub mod in_memory;

use async_trait::async_trait;

use crate::contracts::Event;
use crate::error::Result;

/// Broker topology (spec §6): exchange names and routing-key prefixes.
pub mod topology {
    pub const ORDER_EXCHANGE: &str = "order_events_exchange";
    pub const STORE_EXCHANGE: &str = "store_events_exchange";
    pub const COURIER_EXCHANGE: &str = "courier_events_exchange";
    pub const DEAD_LETTER_EXCHANGE: &str = "dlx";

    /// Derive the exchange a routing key publishes to, from its prefix
    /// (spec §4.4 point 2).
    pub fn exchange_for_routing_key(routing_key: &str) -> &'static str {
        if routing_key.starts_with("order.") {
            ORDER_EXCHANGE
        } else if routing_key.starts_with("product.") {
            STORE_EXCHANGE
        } else if routing_key.starts_with("courier.") {
            COURIER_EXCHANGE
        } else {
            DEAD_LETTER_EXCHANGE
        }
    }
}

/// A handler invoked for every event delivered to a subscription.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> Result<()>;
}

/// Abstraction over the message broker.
///
/// Implementations MUST preserve the payload bytes verbatim end to end
/// (spec §4.4 point 2) and publish with content-type JSON.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish one event to its derived exchange, with the routing key
    /// equal to the event's `type` (spec §4.4).
    async fn publish(&self, event: &Event) -> Result<()>;

    /// Bind a durable queue to `routing_keys` and register `handler` for
    /// delivered messages.
    async fn subscribe(
        &self,
        queue: &str,
        routing_keys: &[&str],
        handler: std::sync::Arc<dyn EventHandler>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::topology::*;

    #[test]
    fn routing_key_prefix_selects_exchange() {
        assert_eq!(exchange_for_routing_key("order.created"), ORDER_EXCHANGE);
        assert_eq!(exchange_for_routing_key("product.updated"), STORE_EXCHANGE);
        assert_eq!(
            exchange_for_routing_key("courier.assigned"),
            COURIER_EXCHANGE
        );
        assert_eq!(exchange_for_routing_key("unknown.thing"), DEAD_LETTER_EXCHANGE);
    }
}
