use std::fmt;

use serde::{Deserialize, Serialize};

/// Meters in one statute mile, as used for delivery distance.
pub const METERS_PER_MILE: f64 = 1609.34;

/// A (longitude, latitude) pair as produced by the geocoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// Converts a routed distance in meters to miles rounded to one decimal place.
pub fn meters_to_miles(meters: f64) -> f64 {
    (meters / METERS_PER_MILE * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_miles_rounds_to_tenths() {
        assert_eq!(meters_to_miles(40_716.302), 25.3);
        assert_eq!(meters_to_miles(1609.34), 1.0);
        assert_eq!(meters_to_miles(0.0), 0.0);
        // 1.04 miles rounds down, 1.06 rounds up
        assert_eq!(meters_to_miles(1609.34 * 1.04), 1.0);
        assert_eq!(meters_to_miles(1609.34 * 1.06), 1.1);
    }

    #[test]
    fn test_coordinate_display_is_lon_lat() {
        let c = Coordinate::new(-120.26, 37.12);
        assert_eq!(c.to_string(), "-120.26,37.12");
    }
}
