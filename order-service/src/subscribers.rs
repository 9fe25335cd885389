//! Saga reply handlers and the product-snapshot projector (spec §4.1, §4.5).
//!
//! Every handler re-checks the order's current state under a
//! transactional read before mutating anything — out-of-order or
//! duplicate deliveries are silently dropped, never raised as errors
//! (spec §7: `InvalidState` is dropped "as already processed" inside
//! subscribers).

use async_trait::async_trait;
use foodcore::bus::EventHandler;
use foodcore::contracts::{Event, OrderAssigned, OrderCancelled, OrderPreparing};
use foodcore::error::Result;
use foodcore::outbox;
use tracing::{info, warn};

use crate::domain::{OrderStatus, ProductSnapshot};
use crate::repository::OrderRepository;

pub struct OrderSubscribers {
    repo: OrderRepository,
}

impl OrderSubscribers {
    pub fn new(repo: OrderRepository) -> Self {
        Self { repo }
    }

    /// On `order.stock_reserved`: RESERVING_STOCK -> PREPARING.
    async fn on_stock_reserved(&self, event: foodcore::contracts::StockReserved) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let Some(order) = self.repo.get_for_update(&mut tx, event.order_id).await? else {
            warn!(order_id = %event.order_id, "stock_reserved for unknown order");
            return Ok(());
        };
        if order.status != OrderStatus::ReservingStock {
            info!(order_id = %event.order_id, status = %order.status, "dropping stale/duplicate stock_reserved");
            return Ok(());
        }

        self.repo
            .update_status(
                &mut tx,
                event.order_id,
                OrderStatus::Preparing,
                None,
                Some(event.pickup_address.clone()),
            )
            .await?;

        outbox::append(
            &mut *tx,
            "ORDER",
            event.order_id,
            &Event::OrderPreparing(OrderPreparing {
                order_id: event.order_id,
                store_id: event.store_id,
                user_id: event.user_id,
                pickup_address: event.pickup_address,
                shipping_address: event.shipping_address,
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// On `order.stock_reservation_failed`: RESERVING_STOCK -> CANCELLED,
    /// no stock was ever deducted so `items` stays empty.
    async fn on_stock_reservation_failed(
        &self,
        event: foodcore::contracts::StockReservationFailed,
    ) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let Some(order) = self.repo.get_for_update(&mut tx, event.order_id).await? else {
            warn!(order_id = %event.order_id, "stock_reservation_failed for unknown order");
            return Ok(());
        };
        if order.status != OrderStatus::ReservingStock {
            info!(order_id = %event.order_id, status = %order.status, "dropping stale/duplicate stock_reservation_failed");
            return Ok(());
        }

        self.repo
            .update_status(&mut tx, event.order_id, OrderStatus::Cancelled, None, None)
            .await?;

        outbox::append(
            &mut *tx,
            "ORDER",
            event.order_id,
            &Event::OrderCancelled(OrderCancelled {
                order_id: event.order_id,
                user_id: event.user_id,
                store_id: order.store_id,
                old_status: OrderStatus::ReservingStock.into(),
                items: Vec::new(),
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// On `courier.assigned`: set `courierId`, emit `order.assigned` for
    /// Notification. A failure to emit it must not roll back the
    /// assignment commit (spec §4.1) — here that just means the outbox
    /// append happens in the same transaction as the status write, so
    /// there's nothing left to fail independently; the *publisher*, not
    /// this handler, absorbs downstream emission failures.
    async fn on_courier_assigned(&self, event: foodcore::contracts::CourierAssigned) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let Some(order) = self.repo.get_for_update(&mut tx, event.order_id).await? else {
            warn!(order_id = %event.order_id, "courier.assigned for unknown order");
            return Ok(());
        };
        if order.status != OrderStatus::Preparing {
            info!(order_id = %event.order_id, status = %order.status, "dropping courier.assigned, order not PREPARING");
            return Ok(());
        }
        match order.courier_id {
            Some(existing) if existing == event.courier_id => {
                info!(order_id = %event.order_id, "duplicate courier.assigned, dropping");
                return Ok(());
            }
            Some(existing) => {
                // Should never happen given Courier's locking; this is a
                // log-only anomaly, not something to raise.
                warn!(
                    order_id = %event.order_id,
                    existing_courier = %existing,
                    new_courier = %event.courier_id,
                    "order already has a different courier assigned, dropping"
                );
                return Ok(());
            }
            None => {}
        }

        let pickup_address = order.pickup_address.clone().unwrap_or_default();
        self.repo
            .update_status(
                &mut tx,
                event.order_id,
                OrderStatus::Preparing,
                Some(event.courier_id),
                None,
            )
            .await?;

        outbox::append(
            &mut *tx,
            "ORDER",
            event.order_id,
            &Event::OrderAssigned(OrderAssigned {
                order_id: event.order_id,
                courier_id: event.courier_id,
                store_id: event.store_id,
                user_id: event.user_id,
                pickup_address,
                shipping_address: order.shipping_address.clone(),
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// On `courier.assignment.failed`: PREPARING -> CANCELLED, with the
    /// full items list (stock must be restored).
    async fn on_courier_assignment_failed(
        &self,
        event: foodcore::contracts::CourierAssignmentFailed,
    ) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let Some(order) = self.repo.get_for_update(&mut tx, event.order_id).await? else {
            warn!(order_id = %event.order_id, "courier.assignment.failed for unknown order");
            return Ok(());
        };
        if order.status != OrderStatus::Preparing {
            info!(order_id = %event.order_id, status = %order.status, "dropping stale/duplicate courier.assignment.failed");
            return Ok(());
        }

        let items = self.repo.items_tx(&mut tx, event.order_id).await?;
        self.repo
            .update_status(&mut tx, event.order_id, OrderStatus::Cancelled, None, None)
            .await?;

        outbox::append(
            &mut *tx,
            "ORDER",
            event.order_id,
            &Event::OrderCancelled(OrderCancelled {
                order_id: event.order_id,
                user_id: event.user_id,
                store_id: order.store_id,
                old_status: OrderStatus::Preparing.into(),
                items: items
                    .iter()
                    .map(|i| foodcore::contracts::ItemDto {
                        product_id: i.product_id,
                        quantity: i.quantity,
                    })
                    .collect(),
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn on_product_changed(&self, product: foodcore::contracts::ProductChanged) -> Result<()> {
        self.repo
            .upsert_product_snapshot(&ProductSnapshot {
                product_id: product.product_id,
                store_id: product.store_id,
                name: product.name,
                price: product.price,
                stock: product.stock,
                is_available: product.is_available,
            })
            .await
    }

    async fn on_product_deleted(&self, event: foodcore::contracts::ProductDeleted) -> Result<()> {
        self.repo.delete_product_snapshot(event.product_id).await
    }
}

#[async_trait]
impl EventHandler for OrderSubscribers {
    async fn handle(&self, event: Event) -> Result<()> {
        match event {
            Event::StockReserved(e) => self.on_stock_reserved(e).await,
            Event::StockReservationFailed(e) => self.on_stock_reservation_failed(e).await,
            Event::CourierAssigned(e) => self.on_courier_assigned(e).await,
            Event::CourierAssignmentFailed(e) => self.on_courier_assignment_failed(e).await,
            Event::ProductCreated(e) | Event::ProductUpdated(e) => self.on_product_changed(e).await,
            Event::ProductDeleted(e) => self.on_product_deleted(e).await,
            _ => Ok(()),
        }
    }
}
