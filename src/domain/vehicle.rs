// Vehicle domain model
use serde::Serialize;

use super::spot::Spot;

/// Sense given when the direction could not be determined.
pub const UNKNOWN_SENSE: &str = "desconhecido";
/// Sense given when the line has no usable itinerary.
pub const UNAVAILABLE_SENSE: &str = "indisponível";
/// Line assigned to vehicles reported without one.
pub const BLANK_LINE: &str = "indefinido";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub line_id: String,
    pub speed: f64,
    pub raw_direction: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    pub sense: String,
}

impl Vehicle {
    pub fn new(
        id: String,
        line_id: String,
        speed: f64,
        raw_direction: f64,
        latitude: f64,
        longitude: f64,
        timestamp: String,
    ) -> Self {
        let (line_id, sense) = if line_id.trim().is_empty() {
            (BLANK_LINE.to_string(), UNKNOWN_SENSE.to_string())
        } else {
            (line_id, String::new())
        };

        Self {
            id,
            line_id,
            speed,
            raw_direction,
            latitude,
            longitude,
            timestamp,
            sense,
        }
    }

    pub fn position(&self) -> Spot {
        Spot::new(self.latitude, self.longitude)
    }

    /// Vehicles reported without a line cannot be matched to an itinerary.
    pub fn has_line(&self) -> bool {
        self.line_id != BLANK_LINE
    }

    pub fn with_sense(mut self, sense: impl Into<String>) -> Self {
        self.sense = sense.into();
        self
    }

    pub fn observation_key(&self) -> ObservationKey {
        ObservationKey {
            id: self.id.clone(),
            line_id: self.line_id.clone(),
            latitude_bits: self.latitude.to_bits(),
            longitude_bits: self.longitude.to_bits(),
            timestamp: self.timestamp.clone(),
            sense: self.sense.clone(),
        }
    }
}

/// Identity of one observed vehicle state in the append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationKey {
    pub id: String,
    pub line_id: String,
    latitude_bits: u64,
    longitude_bits: u64,
    pub timestamp: String,
    pub sense: String,
}
