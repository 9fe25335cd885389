//! Courier aggregate (spec §3, §4.3).

use chrono::{DateTime, Utc};
use foodcore::geo::Coordinate;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourierStatus {
    Available,
    Busy,
    Offline,
    OnBreak,
}

impl std::fmt::Display for CourierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CourierStatus::Available => "AVAILABLE",
            CourierStatus::Busy => "BUSY",
            CourierStatus::Offline => "OFFLINE",
            CourierStatus::OnBreak => "ON_BREAK",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Courier {
    pub courier_id: Uuid,
    pub name: String,
    pub status: CourierStatus,
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate { latitude, longitude }),
            _ => None,
        }
    }
}
