//! Shared plumbing for the order-lifecycle services: transactional outbox,
//! idempotency store, event bus, config and telemetry.
//!
//! Every stateful service (order, store, courier, notification) depends on
//! this crate for the concerns that are identical across all four — only
//! the domain tables and business logic differ.

pub mod bus;
pub mod config;
pub mod contracts;
pub mod error;
pub mod geo;
pub mod idempotency;
pub mod outbox;
pub mod outbox_publisher;
pub mod telemetry;

pub use error::CoreError;
