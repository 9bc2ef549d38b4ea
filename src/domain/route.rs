// Route (itinerary) domain model and nearest waypoint matching
use super::error::SenseError;
use super::spot::{RouteSpot, Spot};

pub const SENSE_SEPARATOR: &str = " X ";

/// Coordinates are scaled by this factor before comparing distances so that
/// sub-metre floating noise does not decide ties.
const PRECISION_FACTOR: f64 = 100_000.0;

#[derive(Debug, Clone)]
pub struct Route {
    pub line_id: String,
    pub description: String,
    pub spots: Vec<RouteSpot>,
}

impl Route {
    pub fn new(line_id: String, description: String, spots: Vec<RouteSpot>) -> Self {
        Self {
            line_id,
            description,
            spots,
        }
    }

    /// First waypoint of the itinerary, used as the fixed reference point of
    /// a vehicle's history.
    pub fn start_point(&self) -> Option<Spot> {
        self.spots.first().map(|s| s.spot)
    }

    /// Returns the waypoint closest to `position`. Ties keep the first
    /// waypoint in itinerary order.
    pub fn nearest(&self, position: Spot) -> Result<&RouteSpot, SenseError> {
        let mut spots = self.spots.iter();
        let Some(first) = spots.next() else {
            return Err(SenseError::EmptyRouteGeometry {
                line_id: self.line_id.clone(),
            });
        };

        let target = position.scaled(PRECISION_FACTOR);
        let mut nearest = first;
        let mut nearest_distance = first.spot.scaled(PRECISION_FACTOR).distance_squared(&target);

        for candidate in spots {
            let distance = candidate.spot.scaled(PRECISION_FACTOR).distance_squared(&target);
            if distance < nearest_distance {
                nearest = candidate;
                nearest_distance = distance;
            }
        }

        Ok(nearest)
    }

    /// Description read in the opposite direction ("A X B" becomes "B X A").
    pub fn reversed_description(&self) -> Result<String, SenseError> {
        swap_description(&self.description)
    }
}

pub fn swap_description(description: &str) -> Result<String, SenseError> {
    let parts: Vec<&str> = description.split(SENSE_SEPARATOR).collect();
    match parts.as_slice() {
        [origin, destination] => Ok(format!("{destination}{SENSE_SEPARATOR}{origin}")),
        _ => Err(SenseError::MalformedDescription {
            description: description.to_string(),
        }),
    }
}
