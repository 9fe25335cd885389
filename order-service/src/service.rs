//! Order service: the operations exposed to the (out-of-scope) REST
//! boundary, per spec §4.1.

use chrono::Utc;
use foodcore::contracts::{Event, ItemDto, OrderCancelled, OrderCreated, StockReservationRequested};
use foodcore::error::{CoreError, Result};
use foodcore::outbox;
use uuid::Uuid;

use crate::domain::{Caller, Order, OrderItem, OrderStatus};
use crate::repository::OrderRepository;

/// A line item as requested by the customer at order-creation time.
#[derive(Debug, Clone)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub struct OrderService {
    repo: OrderRepository,
}

impl OrderService {
    pub fn new(repo: OrderRepository) -> Self {
        Self { repo }
    }

    /// `createOrder` (spec §4.1).
    ///
    /// Validates every item against the local `ProductSnapshot`, prices
    /// the order from snapshot prices, and persists it `PENDING`.
    pub async fn create_order(
        &self,
        customer_id: Uuid,
        store_id: Uuid,
        items: &[RequestedItem],
        shipping_address: String,
    ) -> Result<Order> {
        if items.is_empty() {
            return Err(CoreError::ValidationFailure(
                "order must contain at least one item".into(),
            ));
        }

        let mut order_items = Vec::with_capacity(items.len());
        let mut total_price: i64 = 0;

        for requested in items {
            let snapshot = self
                .repo
                .product_snapshot(requested.product_id)
                .await?
                .ok_or_else(|| {
                    CoreError::ValidationFailure(format!(
                        "unknown product {}",
                        requested.product_id
                    ))
                })?;

            if snapshot.store_id != store_id {
                return Err(CoreError::ValidationFailure(format!(
                    "product {} belongs to a different store",
                    requested.product_id
                )));
            }
            if !snapshot.is_available {
                return Err(CoreError::InvalidState(format!(
                    "product {} is not available",
                    requested.product_id
                )));
            }

            total_price += snapshot.price * requested.quantity as i64;
            order_items.push(OrderItem {
                id: Uuid::new_v4(),
                order_id: Uuid::nil(), // filled in once the order id is known
                product_id: requested.product_id,
                product_name: snapshot.name,
                quantity: requested.quantity,
                unit_price: snapshot.price,
            });
        }

        let order_id = Uuid::new_v4();
        for item in &mut order_items {
            item.order_id = order_id;
        }

        let now = Utc::now();
        let order = Order {
            id: order_id,
            customer_id,
            store_id,
            courier_id: None,
            total_price,
            status: OrderStatus::Pending,
            shipping_address,
            pickup_address: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.repo.begin().await?;
        self.repo.insert_order(&mut tx, &order, &order_items).await?;
        outbox::append(
            &mut *tx,
            "ORDER",
            order_id,
            &Event::OrderCreated(OrderCreated {
                order_id,
                store_id,
                user_id: customer_id,
                total_price,
                created_at: now,
            }),
        )
        .await?;
        tx.commit().await?;

        Ok(order)
    }

    /// `acceptOrder` (spec §4.1): store owner accepts a `PENDING` order,
    /// kicking off the stock-reservation saga.
    pub async fn accept_order(&self, order_id: Uuid, caller: Caller) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let order = self
            .repo
            .get_for_update(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;

        match caller {
            Caller::StoreOwner(store_id) if store_id == order.store_id => {}
            _ => return Err(CoreError::Forbidden("caller does not own this order's store".into())),
        }
        if order.status != OrderStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "order {order_id} is {} not PENDING",
                order.status
            )));
        }

        let items = self.repo.items_tx(&mut tx, order_id).await?;
        self.repo
            .update_status(&mut tx, order_id, OrderStatus::ReservingStock, None, None)
            .await?;

        outbox::append(
            &mut *tx,
            "ORDER",
            order_id,
            &Event::StockReservationRequested(StockReservationRequested {
                order_id,
                store_id: order.store_id,
                user_id: order.customer_id,
                items: items
                    .iter()
                    .map(|i| ItemDto {
                        product_id: i.product_id,
                        quantity: i.quantity,
                    })
                    .collect(),
                shipping_address: order.shipping_address.clone(),
                pickup_address: None,
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// `cancelOrder` (spec §4.1): per-state authorisation, carries
    /// `oldStatus` so downstream stock-restore can key on it.
    pub async fn cancel_order(&self, order_id: Uuid, caller: Caller) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let order = self
            .repo
            .get_for_update(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;

        let authorised = match (order.status, caller) {
            (OrderStatus::Pending, Caller::Customer(id)) => id == order.customer_id,
            (OrderStatus::Preparing, Caller::StoreOwner(store_id)) => store_id == order.store_id,
            _ => false,
        };
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Preparing) {
            return Err(CoreError::InvalidState(format!(
                "order {order_id} cannot be cancelled from {}",
                order.status
            )));
        }
        if !authorised {
            return Err(CoreError::Forbidden("caller may not cancel this order".into()));
        }

        let old_status = order.status;
        let items = self.repo.items_tx(&mut tx, order_id).await?;
        self.repo
            .update_status(&mut tx, order_id, OrderStatus::Cancelled, None, None)
            .await?;

        outbox::append(
            &mut *tx,
            "ORDER",
            order_id,
            &Event::OrderCancelled(OrderCancelled {
                order_id,
                user_id: order.customer_id,
                store_id: order.store_id,
                old_status: old_status.into(),
                // Only PREPARING/ON_THE_WAY orders ever deducted stock.
                items: if matches!(old_status, OrderStatus::Preparing | OrderStatus::OnTheWay) {
                    items
                        .iter()
                        .map(|i| ItemDto {
                            product_id: i.product_id,
                            quantity: i.quantity,
                        })
                        .collect()
                } else {
                    Vec::new()
                },
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// `pickupOrder` (spec §4.1): gated on caller == courier, PREPARING -> ON_THE_WAY.
    pub async fn pickup_order(&self, order_id: Uuid, caller_courier_id: Uuid) -> Result<()> {
        self.transition_by_courier(
            order_id,
            caller_courier_id,
            OrderStatus::Preparing,
            OrderStatus::OnTheWay,
            |order| {
                Event::OrderOnTheWay(foodcore::contracts::OrderOnTheWay {
                    order_id: order.id,
                    user_id: order.customer_id,
                    courier_id: caller_courier_id,
                })
            },
        )
        .await
    }

    /// `deliverOrder` (spec §4.1): gated on caller == courier, ON_THE_WAY -> DELIVERED.
    pub async fn deliver_order(&self, order_id: Uuid, caller_courier_id: Uuid) -> Result<()> {
        self.transition_by_courier(
            order_id,
            caller_courier_id,
            OrderStatus::OnTheWay,
            OrderStatus::Delivered,
            |order| {
                Event::OrderDelivered(foodcore::contracts::OrderDelivered {
                    order_id: order.id,
                    user_id: order.customer_id,
                })
            },
        )
        .await
    }

    async fn transition_by_courier(
        &self,
        order_id: Uuid,
        caller_courier_id: Uuid,
        required: OrderStatus,
        next: OrderStatus,
        make_event: impl FnOnce(&Order) -> Event,
    ) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        let order = self
            .repo
            .get_for_update(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("order {order_id}")))?;

        if order.courier_id != Some(caller_courier_id) {
            return Err(CoreError::Forbidden("caller is not this order's courier".into()));
        }
        if order.status != required {
            return Err(CoreError::InvalidState(format!(
                "order {order_id} is {} not {required}",
                order.status
            )));
        }

        self.repo.update_status(&mut tx, order_id, next, None, None).await?;
        outbox::append(&mut *tx, "ORDER", order_id, &make_event(&order)).await?;
        tx.commit().await?;
        Ok(())
    }
}
