//! Saga participant entry point: the subscriber that turns
//! `order.stock_reservation.requested` / `order.cancelled` deliveries
//! into calls against `StoreService` (spec §4.2, §4.5).

use async_trait::async_trait;
use foodcore::bus::EventHandler;
use foodcore::contracts::{Event, OrderStatusDto};
use foodcore::error::Result;

use crate::service::{ReservationItem, StoreService};

pub struct StoreSubscribers {
    service: StoreService,
}

impl StoreSubscribers {
    pub fn new(service: StoreService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for StoreSubscribers {
    async fn handle(&self, event: Event) -> Result<()> {
        match event {
            Event::StockReservationRequested(e) => {
                let items: Vec<ReservationItem> = e
                    .items
                    .iter()
                    .map(|i| ReservationItem { product_id: i.product_id, quantity: i.quantity })
                    .collect();
                self.service
                    .reserve_stock(e.order_id, e.store_id, e.user_id, &items, e.shipping_address)
                    .await
            }
            Event::OrderCancelled(e) => {
                let restores = matches!(e.old_status, OrderStatusDto::Preparing | OrderStatusDto::OnTheWay);
                self.service.restore_stock(e.order_id, restores, &e.items).await
            }
            _ => Ok(()),
        }
    }
}
