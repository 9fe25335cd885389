//! Shared error taxonomy (spec §7), by effect rather than by source type.

use thiserror::Error;
use uuid::Uuid;

/// Result type used throughout the service crates.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the order-lifecycle core.
///
/// Variants map onto spec §7's taxonomy: validation and authorisation
/// failures surface synchronously to REST callers (out of scope here,
/// but the mapper needs these variants to translate); state-machine and
/// saga failures are either dropped (subscribers) or compensated through
/// events, never raised to a synchronous caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Rejected at the boundary; carries field-level detail.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// Missing aggregate. Subscribers should let this propagate so the
    /// broker redelivers later, since the aggregate may not exist *yet*.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller role/ownership mismatch.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// State-machine precondition not met.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Optimistic-version conflict. In assignment this means "candidate
    /// lost, try the next one"; in REST-driven mutations it is a
    /// retriable conflict for the caller.
    #[error("concurrent modification on {aggregate} {id}")]
    ConcurrentModification { aggregate: &'static str, id: Uuid },

    /// Not enough stock to satisfy a reservation.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// No courier could be assigned.
    #[error("no couriers available: {0}")]
    NoCouriersAvailable(String),

    /// Broker publish failure. The outbox row this wraps stays
    /// `processed=false` and is retried on the publisher's next tick.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<lapin::Error> for CoreError {
    fn from(err: lapin::Error) -> Self {
        CoreError::Transport(err.to_string())
    }
}

impl From<deadpool_lapin::PoolError> for CoreError {
    fn from(err: deadpool_lapin::PoolError) -> Self {
        CoreError::Transport(format!("failed to get amqp connection: {err}"))
    }
}
