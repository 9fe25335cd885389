//! In-process event bus.
//!
//! Used by tests and by the single-binary "all four services, one
//! process" deployment story. No external broker; handlers registered
//! for a routing-key pattern are invoked directly on publish, in
//! registration order. Explicit fixture, not a process-wide singleton
//! (spec §9).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EventBus, EventHandler};
use crate::contracts::Event;
use crate::error::Result;

struct Subscription {
    routing_keys: Vec<String>,
    handler: Arc<dyn EventHandler>,
}

fn matches(pattern: &str, routing_key: &str) -> bool {
    if pattern == "#" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return routing_key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'));
    }
    pattern == routing_key
}

/// In-memory event bus backed by a `Vec` of subscriptions behind a lock.
#[derive(Default)]
pub struct InMemoryEventBus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: &Event) -> Result<()> {
        let routing_key = event.routing_key();
        let subscriptions = self.subscriptions.read().await;
        for sub in subscriptions.iter() {
            if sub
                .routing_keys
                .iter()
                .any(|pattern| matches(pattern, routing_key))
            {
                sub.handler.handle(event.clone()).await?;
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        _queue: &str,
        routing_keys: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.push(Subscription {
            routing_keys: routing_keys.iter().map(|s| s.to_string()).collect(),
            handler,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::OrderCreated;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_to_matching_wildcard_subscription() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            "q",
            &["order.*"],
            Arc::new(CountingHandler(count.clone())),
        )
        .await
        .unwrap();

        let event = Event::OrderCreated(OrderCreated {
            order_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_price: 2000,
            created_at: chrono::Utc::now(),
        });
        bus.publish(&event).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_deliver_to_non_matching_subscription() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            "q",
            &["courier.*"],
            Arc::new(CountingHandler(count.clone())),
        )
        .await
        .unwrap();

        let event = Event::OrderCreated(OrderCreated {
            order_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_price: 2000,
            created_at: chrono::Utc::now(),
        });
        bus.publish(&event).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
