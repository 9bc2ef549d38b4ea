// Geographic points used by route geometry and vehicle history
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair treated as planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub latitude: f64,
    pub longitude: f64,
}

impl Spot {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Squared Euclidean distance. Only relative ordering matters to callers,
    /// so the square root is skipped.
    pub fn distance_squared(&self, other: &Spot) -> f64 {
        let d_lat = self.latitude - other.latitude;
        let d_lon = self.longitude - other.longitude;
        d_lat * d_lat + d_lon * d_lon
    }

    pub fn scaled(&self, factor: f64) -> Spot {
        Spot::new(self.latitude * factor, self.longitude * factor)
    }
}

/// Waypoint of an itinerary, tagged with the leg it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSpot {
    pub spot: Spot,
    pub returning: bool,
}

impl RouteSpot {
    pub fn new(latitude: f64, longitude: f64, returning: bool) -> Self {
        Self {
            spot: Spot::new(latitude, longitude),
            returning,
        }
    }
}
