//! Courier proximity assignment engine (spec §4.3).

pub mod domain;
pub mod repository;
pub mod service;
pub mod subscribers;

pub use domain::{Courier, CourierStatus};
pub use repository::CourierRepository;
pub use service::CourierService;
pub use subscribers::CourierSubscribers;
