//! Push delivery port (spec §4.6: "this component is intentionally
//! described at contract level; its push transport is an external
//! collaborator").
//!
//! The authenticated duplex channel itself — WebSocket connection
//! tracking, presence, auth — is out of scope; this trait is the seam a
//! concrete transport plugs into.

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Attempt an immediate push to `recipient_id`. Returns `true` if the
    /// recipient was connected and the push was handed off; `false` if
    /// they were not reachable right now (the notification row stays
    /// undelivered and is flushed on next connect).
    async fn push(&self, recipient_id: Uuid, payload: &serde_json::Value) -> bool;
}

/// A push channel that never finds anyone connected — used when no
/// transport is wired up; every notification is persisted and left for
/// a later flush.
pub struct NoopPushChannel;

#[async_trait]
impl PushChannel for NoopPushChannel {
    async fn push(&self, _recipient_id: Uuid, _payload: &serde_json::Value) -> bool {
        false
    }
}
