//! Order aggregate: state machine, saga origination, and saga reply
//! handlers (spec §4.1).

pub mod domain;
pub mod repository;
pub mod service;
pub mod subscribers;

pub use domain::{Caller, Order, OrderItem, OrderStatus, ProductSnapshot};
pub use repository::OrderRepository;
pub use service::{OrderService, RequestedItem};
pub use subscribers::OrderSubscribers;
