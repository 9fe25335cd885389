//! Periodic outbox draining and retention cleanup (spec §4.4).
//!
//! Two background loops, grounded on the teacher's `TtlReaper`: one runs
//! every couple of seconds publishing unprocessed rows, the other runs
//! once a day deleting processed rows past the retention horizon.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::contracts::Event;
use crate::outbox::OutboxStore;

/// Tuning knobs for both loops (spec §4.4: batch ≤50, tick ~2s, retention
/// ≥1 day, cleanup batches of 1000).
#[derive(Debug, Clone)]
pub struct OutboxPublisherConfig {
    pub batch_size: i64,
    pub tick: Duration,
    pub retention: chrono::Duration,
    pub cleanup_interval: Duration,
    pub cleanup_batch_size: i64,
}

impl Default for OutboxPublisherConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            tick: Duration::from_secs(2),
            retention: chrono::Duration::days(2),
            cleanup_interval: Duration::from_secs(24 * 3600),
            cleanup_batch_size: 1000,
        }
    }
}

/// Drains the outbox to the event bus on a fixed interval.
pub struct OutboxPublisher {
    store: OutboxStore,
    bus: Arc<dyn EventBus>,
    config: OutboxPublisherConfig,
}

impl OutboxPublisher {
    pub fn new(store: OutboxStore, bus: Arc<dyn EventBus>, config: OutboxPublisherConfig) -> Self {
        Self { store, bus, config }
    }

    /// Spawn the drain loop as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if let Err(e) = self.drain_once().await {
                    error!(error = %e, "outbox publisher batch failed");
                }
            }
        })
    }

    /// Run one drain pass (used directly by tests, and by the scheduled
    /// loop above).
    pub async fn drain_once(&self) -> crate::error::Result<usize> {
        let batch = self
            .store
            .fetch_unprocessed_batch(self.config.batch_size)
            .await?;
        let mut published = 0;

        for row in batch {
            let event: Event = match Event::from_routing_key(&row.event_type, &row.payload) {
                Ok(e) => e,
                Err(e) => {
                    // A row that doesn't even deserialize can never be
                    // published; log loudly but don't let it abort the
                    // batch (spec §4.4 point 3).
                    error!(id = %row.id, error = %e, "outbox row payload is not a valid event, skipping");
                    continue;
                }
            };

            let bus = self.bus.clone();
            let publish_with_retry = || {
                let bus = bus.clone();
                let event = event.clone();
                async move { bus.publish(&event).await }
            };

            match publish_with_retry
                .retry(ExponentialBuilder::default().with_max_times(3))
                .await
            {
                Ok(()) => {
                    if let Err(e) = self.store.mark_processed(row.id).await {
                        warn!(id = %row.id, error = %e, "failed to mark outbox row processed, will retry");
                    } else {
                        published += 1;
                    }
                }
                Err(e) => {
                    // A single row's failure must not abort the batch;
                    // it stays processed=false for the next tick.
                    warn!(id = %row.id, error = %e, "failed to publish outbox row, retrying next tick");
                }
            }
        }

        if published > 0 {
            debug!(published, "outbox publisher batch complete");
        }
        Ok(published)
    }
}

/// Deletes processed outbox rows older than the retention horizon.
pub struct RetentionReaper {
    store: OutboxStore,
    config: OutboxPublisherConfig,
}

impl RetentionReaper {
    pub fn new(store: OutboxStore, config: OutboxPublisherConfig) -> Self {
        Self { store, config }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.cleanup_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match self.run_once().await {
                    Ok(count) if count > 0 => {
                        info!(deleted = count, "outbox retention cleanup ran");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "outbox retention cleanup failed"),
                }
            }
        })
    }

    pub async fn run_once(&self) -> crate::error::Result<u64> {
        let before = chrono::Utc::now() - self.config.retention;
        self.store
            .delete_processed_before(before, self.config.cleanup_batch_size)
            .await
    }
}
