//! Great-circle distance and the rounding rules used for stored values.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Haversine distance in kilometres on a spherical Earth.
///
/// Deltas are taken as absolute values so `haversine_km(a, b)` and
/// `haversine_km(b, a)` evaluate the exact same expression.
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).abs().to_radians();
    let d_lon = (to.lon - from.lon).abs().to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Round to one decimal place, the precision stored for all kilometre values.
pub fn round1(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// Metres to kilometres at one-decimal precision.
pub fn meters_to_km(meters: f64) -> f64 {
    (meters / 100.0).round() / 10.0
}

/// Seconds to whole minutes.
pub fn seconds_to_minutes(seconds: f64) -> u32 {
    (seconds / 60.0).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const BRATISLAVA: Coordinates = Coordinates { lat: 48.1486, lon: 17.1077 };
    const KOSICE: Coordinates = Coordinates { lat: 48.7164, lon: 21.2611 };
    const ZVOLEN: Coordinates = Coordinates { lat: 48.5744, lon: 19.1236 };

    #[test]
    fn test_self_distance_is_zero() {
        assert_eq!(haversine_km(ZVOLEN, ZVOLEN), 0.0);
        assert_eq!(haversine_km(KOSICE, KOSICE), 0.0);
    }

    #[test]
    fn test_symmetry() {
        assert_eq!(haversine_km(BRATISLAVA, KOSICE), haversine_km(KOSICE, BRATISLAVA));
        assert_eq!(haversine_km(ZVOLEN, KOSICE), haversine_km(KOSICE, ZVOLEN));
    }

    #[test]
    fn test_bratislava_kosice() {
        // ~312 km as the crow flies
        let d = haversine_km(BRATISLAVA, KOSICE);
        assert_abs_diff_eq!(d, 312.0, epsilon = 5.0);
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(meters_to_km(12_649.0), 12.6);
        assert_eq!(seconds_to_minutes(929.0), 15);
        assert_eq!(seconds_to_minutes(-3.0), 0);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(ZVOLEN.is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
