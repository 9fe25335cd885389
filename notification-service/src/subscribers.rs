//! Wires every notification-worthy `order.*`/`courier.*` event to
//! `NotificationService::notify` (spec §4.6).

use async_trait::async_trait;
use foodcore::bus::EventHandler;
use foodcore::contracts::Event;
use foodcore::error::Result;
use uuid::Uuid;

use crate::service::NotificationService;

pub struct NotificationSubscribers {
    service: NotificationService,
}

impl NotificationSubscribers {
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }

    /// (recipient, order_id, courier_id, store_id) for every event worth
    /// surfacing to a user. `None` means this event carries no
    /// notification-worthy recipient and is dropped.
    fn routing(event: &Event) -> Option<(Uuid, Option<Uuid>, Option<Uuid>, Option<Uuid>)> {
        match event {
            Event::OrderCreated(e) => Some((e.user_id, Some(e.order_id), None, Some(e.store_id))),
            Event::OrderPreparing(e) => Some((e.user_id, Some(e.order_id), None, Some(e.store_id))),
            Event::StockReserved(e) => Some((e.user_id, Some(e.order_id), None, Some(e.store_id))),
            Event::StockReservationFailed(e) => Some((e.user_id, Some(e.order_id), None, None)),
            Event::OrderAssigned(e) => {
                Some((e.user_id, Some(e.order_id), Some(e.courier_id), Some(e.store_id)))
            }
            Event::OrderOnTheWay(e) => Some((e.user_id, Some(e.order_id), Some(e.courier_id), None)),
            Event::OrderDelivered(e) => Some((e.user_id, Some(e.order_id), None, None)),
            Event::OrderCancelled(e) => Some((e.user_id, Some(e.order_id), None, Some(e.store_id))),
            // The courier themself is the recipient of their own
            // assignment, not the customer (who already gets
            // order.assigned once Order re-emits it).
            Event::CourierAssigned(e) => {
                Some((e.courier_id, Some(e.order_id), Some(e.courier_id), Some(e.store_id)))
            }
            Event::CourierAssignmentFailed(e) => Some((e.user_id, Some(e.order_id), None, Some(e.store_id))),
            Event::StockReservationRequested(_)
            | Event::ProductCreated(_)
            | Event::ProductUpdated(_)
            | Event::ProductDeleted(_) => None,
        }
    }
}

#[async_trait]
impl EventHandler for NotificationSubscribers {
    async fn handle(&self, event: Event) -> Result<()> {
        let Some((recipient_id, order_id, courier_id, store_id)) = Self::routing(&event) else {
            return Ok(());
        };
        let payload = serde_json::to_value(&event)?;
        self.service
            .notify(recipient_id, event.routing_key(), order_id, courier_id, store_id, payload)
            .await
    }
}
