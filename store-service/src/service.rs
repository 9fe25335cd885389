//! Stock reservation saga participant (spec §4.2).
//!
//! `reserve_stock` is deliberately split across two transaction
//! boundaries, mirroring the teacher's separation between an
//! aggregate-mutating transaction and saga-reply publication:
//! `try_reserve` runs the committable-or-rollback business transaction;
//! on failure, `publish_reservation_failed` runs as a second,
//! independent transaction that always commits the failure reply even
//! though the first transaction aborted.

use foodcore::contracts::{Event, ItemDto, StockReservationFailed, StockReserved};
use foodcore::error::Result;
use foodcore::idempotency::{self, Claim};
use foodcore::outbox;
use uuid::Uuid;

use crate::repository::StoreRepository;

/// A single requested line item (spec §4.2's `items[{productId, quantity}]`).
#[derive(Debug, Clone)]
pub struct ReservationItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub struct StoreService {
    repo: StoreRepository,
}

impl StoreService {
    pub fn new(repo: StoreRepository) -> Self {
        Self { repo }
    }

    /// Entry point for `order.stock_reservation.requested` (spec §4.2).
    ///
    /// Returns `Ok(())` in every outcome — success and failure both end
    /// with an outbox event published; callers never need to distinguish
    /// them to decide whether to retry.
    pub async fn reserve_stock(
        &self,
        order_id: Uuid,
        store_id: Uuid,
        user_id: Uuid,
        items: &[ReservationItem],
        shipping_address: String,
    ) -> Result<()> {
        let key = idempotency::event_key("RESERVE_STOCK", order_id);
        if matches!(idempotency::claim(self.repo.pool(), &key).await?, Claim::AlreadyProcessed) {
            return Ok(());
        }

        match self.try_reserve(order_id, store_id, user_id, items, &shipping_address).await {
            Ok(()) => Ok(()),
            Err(reason) => {
                self.publish_reservation_failed(order_id, user_id, &reason).await
            }
        }
    }

    /// The committable-or-rollback half: locks every product row in
    /// sorted order, validates store/availability/stock for all items,
    /// and either commits the decrement + `stock_reserved` reply, or
    /// returns an error describing why (the transaction is dropped,
    /// rolling back any partial state).
    async fn try_reserve(
        &self,
        order_id: Uuid,
        store_id: Uuid,
        user_id: Uuid,
        items: &[ReservationItem],
        shipping_address: &str,
    ) -> std::result::Result<(), String> {
        let store = self
            .repo
            .store(store_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("unknown store {store_id}"))?;

        let mut tx = self.repo.begin().await.map_err(|e| e.to_string())?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let locked = self
            .repo
            .lock_products_sorted(&mut tx, &product_ids)
            .await
            .map_err(|e| e.to_string())?;

        for item in items {
            let product = locked
                .iter()
                .find(|p| p.product_id == item.product_id)
                .ok_or_else(|| format!("unknown product {}", item.product_id))?;
            if product.store_id != store_id {
                return Err(format!("product {} does not belong to store {store_id}", item.product_id));
            }
            if !product.is_available {
                return Err(format!("product {} is not available", item.product_id));
            }
            if product.stock < item.quantity {
                return Err(format!(
                    "insufficient stock for product {}: have {}, need {}",
                    item.product_id, product.stock, item.quantity
                ));
            }
        }

        for item in items {
            self.repo
                .decrement_stock(&mut tx, item.product_id, item.quantity)
                .await
                .map_err(|e| e.to_string())?;
        }

        outbox::append(
            &mut *tx,
            "ORDER",
            order_id,
            &Event::StockReserved(StockReserved {
                order_id,
                store_id,
                user_id,
                pickup_address: store.pickup_address,
                shipping_address: shipping_address.to_string(),
            }),
        )
        .await
        .map_err(|e| e.to_string())?;

        tx.commit().await.map_err(|e| e.to_string())?;
        Ok(())
    }

    /// The always-commits half: a brand-new transaction (independent of
    /// whatever just rolled back in `try_reserve`) that records the
    /// failure reply. This must succeed even though the reservation
    /// itself aborted (spec §4.2 point 4).
    async fn publish_reservation_failed(&self, order_id: Uuid, user_id: Uuid, reason: &str) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        outbox::append(
            &mut *tx,
            "ORDER",
            order_id,
            &Event::StockReservationFailed(StockReservationFailed {
                order_id,
                user_id,
                reason: reason.to_string(),
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Stock-restore subscriber logic (spec §4.2): consumes
    /// `order.cancelled`. Only restores stock when `old_status` implies
    /// stock was actually deducted; otherwise a no-op to avoid "ghost
    /// inventory".
    pub async fn restore_stock(
        &self,
        order_id: Uuid,
        old_status_implies_deducted: bool,
        items: &[ItemDto],
    ) -> Result<()> {
        let key = idempotency::event_key("RESTORE_STOCK", order_id);
        if matches!(idempotency::claim(self.repo.pool(), &key).await?, Claim::AlreadyProcessed) {
            return Ok(());
        }
        if !old_status_implies_deducted || items.is_empty() {
            return Ok(());
        }

        let mut tx = self.repo.begin().await?;
        let mut sorted_items = items.to_vec();
        sorted_items.sort_by_key(|i| i.product_id);
        for item in &sorted_items {
            self.repo
                .increment_stock(&mut tx, item.product_id, item.quantity)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
