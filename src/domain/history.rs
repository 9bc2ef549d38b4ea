// Per-vehicle position history
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::spot::Spot;

/// Reference point a vehicle's movement is measured against. Both
/// coordinates are null until the first itinerary start is adopted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StartPoint {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StartPoint {
    pub fn is_unset(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none()
    }

    /// The reference as a spot, only when both coordinates are known.
    pub fn spot(&self) -> Option<Spot> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Spot::new(latitude, longitude)),
            _ => None,
        }
    }
}

impl From<Spot> for StartPoint {
    fn from(spot: Spot) -> Self {
        Self {
            latitude: Some(spot.latitude),
            longitude: Some(spot.longitude),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub start_point: StartPoint,
    pub timeline: VecDeque<Spot>,
}

impl HistoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts `candidate` as the start point unless one is already set.
    pub fn reconcile_start_point(&mut self, candidate: Option<Spot>) {
        if let Some(spot) = candidate
            && self.start_point.is_unset()
        {
            self.start_point = StartPoint::from(spot);
        }
    }

    /// Appends `sample` unless it repeats the latest entry, then drops the
    /// oldest entries beyond `history_size`.
    pub fn append_sample(&mut self, sample: Spot, history_size: usize) {
        if self.timeline.back() != Some(&sample) {
            self.timeline.push_back(sample);
        }
        while self.timeline.len() > history_size {
            self.timeline.pop_front();
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
