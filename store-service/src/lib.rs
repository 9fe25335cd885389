//! Stock engine and reservation saga participant (spec §4.2).
//!
//! Product catalog CRUD (name/price/availability edits) is an external
//! collaborator; this crate only owns the authoritative stock ledger and
//! the reserve/restore saga participant that mutates it.

pub mod domain;
pub mod repository;
pub mod service;
pub mod subscribers;

pub use domain::{Product, Store};
pub use repository::StoreRepository;
pub use service::{ReservationItem, StoreService};
pub use subscribers::StoreSubscribers;
