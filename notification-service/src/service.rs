//! Fan-out: persist a Notification row per recipient-bearing event, then
//! attempt an immediate best-effort push (spec §4.6).

use foodcore::error::Result;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::push::PushChannel;
use crate::repository::NotificationRepository;

pub struct NotificationService {
    repo: NotificationRepository,
    push: Arc<dyn PushChannel>,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository, push: Arc<dyn PushChannel>) -> Self {
        Self { repo, push }
    }

    /// Persist then best-effort push. A push failure (recipient not
    /// connected, or the transport itself erroring) is swallowed: the
    /// row is left undelivered and flushed when the recipient next
    /// connects (spec §4.6, §7).
    #[allow(clippy::too_many_arguments)]
    pub async fn notify(
        &self,
        recipient_id: Uuid,
        event_type: &str,
        order_id: Option<Uuid>,
        courier_id: Option<Uuid>,
        store_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let id = Uuid::new_v4();
        self.repo
            .insert(id, recipient_id, event_type, order_id, courier_id, store_id, &payload)
            .await?;

        if self.push.push(recipient_id, &payload).await {
            if let Err(e) = self.repo.mark_delivered(id).await {
                warn!(notification_id = %id, error = %e, "push succeeded but marking delivered failed");
            }
        }
        Ok(())
    }
}
