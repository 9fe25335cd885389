//! Courier proximity assignment engine (spec §4.3).

use foodcore::contracts::{CourierAssigned, CourierAssignmentFailed, Event};
use foodcore::error::Result;
use foodcore::geo::{haversine_km, Coordinate};
use foodcore::idempotency::{self, Claim};
use foodcore::outbox;
use tracing::warn;
use uuid::Uuid;

use crate::domain::CourierStatus;
use crate::repository::CourierRepository;

pub struct CourierService {
    repo: CourierRepository,
}

impl CourierService {
    pub fn new(repo: CourierRepository) -> Self {
        Self { repo }
    }

    /// Entry point for `order.preparing` (spec §4.3).
    pub async fn assign_courier(
        &self,
        order_id: Uuid,
        store_id: Uuid,
        user_id: Uuid,
        pickup: Option<Coordinate>,
    ) -> Result<()> {
        let key = idempotency::event_key("ASSIGN_COURIER", order_id);
        if matches!(idempotency::claim(self.repo.pool(), &key).await?, Claim::AlreadyProcessed) {
            return Ok(());
        }

        let mut candidates = self.repo.available_active().await?;
        if candidates.is_empty() {
            return self
                .publish_assignment_failed(order_id, user_id, store_id, "no couriers exist")
                .await;
        }

        // spec §4.3 point 3: couriers missing either lat or lon are never
        // candidates, regardless of whether the pickup itself is located.
        candidates.retain(|c| c.coordinate().is_some());
        if candidates.is_empty() {
            return self
                .publish_assignment_failed(order_id, user_id, store_id, "no couriers with location")
                .await;
        }

        if let Some(pickup) = pickup {
            candidates.sort_by(|a, b| {
                let da = a.coordinate().map(|c| haversine_km(pickup, c)).unwrap_or(f64::INFINITY);
                let db = b.coordinate().map(|c| haversine_km(pickup, c)).unwrap_or(f64::INFINITY);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        // A missing pickup coordinate disables ranking but every
        // remaining candidate is already known to be located.

        for candidate in &candidates {
            match self
                .atomic_assign(candidate.courier_id, candidate.version, order_id, store_id, user_id)
                .await
            {
                Ok(true) => return Ok(()),
                Ok(false) => continue,
                Err(e) => {
                    warn!(courier_id = %candidate.courier_id, error = %e, "assignment attempt failed, trying next candidate");
                    continue;
                }
            }
        }

        self.publish_assignment_failed(order_id, user_id, store_id, "all candidates were claimed")
            .await
    }

    /// Attempt to claim a single courier: lock the row, re-check
    /// AVAILABLE, flip to BUSY with an optimistic version bump, and write
    /// `courier.assigned` to the outbox — all in the one transaction that
    /// commits the status flip (spec §4.3 point 5c, §3's outbox
    /// invariant: the event must be created in the same local transaction
    /// as the aggregate change it reports). Loses ("returns false") if
    /// another transaction got there first, whether observed as a stale
    /// status or a failed version match (spec §4.3 point 5, §5).
    async fn atomic_assign(
        &self,
        courier_id: Uuid,
        expected_version: i32,
        order_id: Uuid,
        store_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool> {
        let mut tx = self.repo.begin().await?;
        let Some(courier) = self.repo.get_for_update(&mut tx, courier_id).await? else {
            return Ok(false);
        };
        if courier.status != CourierStatus::Available {
            return Ok(false);
        }

        let updated = self
            .repo
            .set_status(&mut tx, courier_id, expected_version, CourierStatus::Busy)
            .await?;
        if !updated {
            return Ok(false);
        }

        outbox::append(
            &mut *tx,
            "COURIER",
            courier_id,
            &Event::CourierAssigned(CourierAssigned {
                order_id,
                courier_id,
                store_id,
                user_id,
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn publish_assignment_failed(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        store_id: Uuid,
        reason: &str,
    ) -> Result<()> {
        let mut tx = self.repo.begin().await?;
        outbox::append(
            &mut *tx,
            "ORDER",
            order_id,
            &Event::CourierAssignmentFailed(CourierAssignmentFailed {
                order_id,
                user_id,
                store_id,
                reason: reason.to_string(),
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
