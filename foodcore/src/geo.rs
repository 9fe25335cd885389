//! Great-circle distance for courier ranking (spec §4.3, §6).
//!
//! Distance is used only to rank candidates and is never persisted.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Haversine great-circle distance between two points, in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = Coordinate { latitude: 40.0, longitude: -73.0 };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn known_distance_nyc_to_la_is_approximately_correct() {
        let nyc = Coordinate { latitude: 40.7128, longitude: -74.0060 };
        let la = Coordinate { latitude: 34.0522, longitude: -118.2437 };
        let km = haversine_km(nyc, la);
        // Accepted real-world great-circle distance is ~3936 km.
        assert!((km - 3936.0).abs() < 20.0, "unexpected distance: {km}");
    }

    #[test]
    fn closer_point_ranks_first() {
        let pickup = Coordinate { latitude: 40.70, longitude: -74.00 };
        let near = Coordinate { latitude: 40.71, longitude: -74.00 };
        let far = Coordinate { latitude: 41.50, longitude: -74.00 };
        assert!(haversine_km(pickup, near) < haversine_km(pickup, far));
    }
}
