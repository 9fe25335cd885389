//! Order/courier event fan-out and best-effort push delivery (spec §4.6).

pub mod domain;
pub mod push;
pub mod repository;
pub mod service;
pub mod subscribers;

pub use domain::Notification;
pub use push::{NoopPushChannel, PushChannel};
pub use repository::NotificationRepository;
pub use service::NotificationService;
pub use subscribers::NotificationSubscribers;
