//! Consumes `order.preparing` to trigger assignment (spec §4.3).

use async_trait::async_trait;
use foodcore::bus::EventHandler;
use foodcore::contracts::Event;
use foodcore::error::Result;
use foodcore::geo::Coordinate;

use crate::service::CourierService;

pub struct CourierSubscribers {
    service: CourierService,
}

impl CourierSubscribers {
    pub fn new(service: CourierService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for CourierSubscribers {
    async fn handle(&self, event: Event) -> Result<()> {
        if let Event::OrderPreparing(e) = event {
            // order.preparing carries a free-form address, not
            // coordinates; a missing pickup just disables distance
            // ranking without filtering anyone out.
            let pickup: Option<Coordinate> = None;
            self.service.assign_courier(e.order_id, e.store_id, e.user_id, pickup).await
        } else {
            Ok(())
        }
    }
}
