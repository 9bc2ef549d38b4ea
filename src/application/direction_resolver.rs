// Direction resolver - Interchangeable strategies that fill in a vehicle's sense
use crate::application::history_cache::HistoryCache;
use crate::domain::direction::{classify_timeline, reduce, resolve_sense};
use crate::domain::route::Route;
use crate::domain::vehicle::{Vehicle, UNAVAILABLE_SENSE, UNKNOWN_SENSE};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Nearest itinerary waypoint decides the leg. Stateless.
    Geometric,
    /// Smoothed movement relative to the itinerary start over recent history.
    Temporal,
}

#[async_trait]
pub trait DirectionResolver: Send + Sync {
    /// Returns `vehicle` with its sense filled in. Missing or unusable route
    /// data results in a sentinel sense, never an error.
    async fn infer(&self, vehicle: Vehicle, route: Option<&Route>) -> Vehicle;
}

/// Shared guard for both strategies: returns the route only when it has
/// geometry to work with.
fn usable_route<'a>(vehicle: &Vehicle, route: Option<&'a Route>) -> Option<&'a Route> {
    let Some(route) = route else {
        tracing::warn!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, "no route data for line");
        return None;
    };
    if route.spots.is_empty() {
        tracing::error!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, "route has no waypoints");
        return None;
    }
    Some(route)
}

#[derive(Debug, Clone, Default)]
pub struct GeometricResolver;

#[async_trait]
impl DirectionResolver for GeometricResolver {
    async fn infer(&self, vehicle: Vehicle, route: Option<&Route>) -> Vehicle {
        let Some(route) = usable_route(&vehicle, route) else {
            return vehicle.with_sense(UNAVAILABLE_SENSE);
        };

        let sense = route.nearest(vehicle.position()).and_then(|nearest| {
            if nearest.returning {
                route.reversed_description()
            } else {
                Ok(route.description.clone())
            }
        });

        match sense {
            Ok(sense) => vehicle.with_sense(sense),
            Err(e) => {
                tracing::error!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, error = %e, "geometric inference failed");
                vehicle.with_sense(UNKNOWN_SENSE)
            }
        }
    }
}

#[derive(Clone)]
pub struct TemporalResolver {
    cache: HistoryCache,
}

impl TemporalResolver {
    pub fn new(cache: HistoryCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl DirectionResolver for TemporalResolver {
    async fn infer(&self, vehicle: Vehicle, route: Option<&Route>) -> Vehicle {
        let Some(route) = usable_route(&vehicle, route) else {
            return vehicle.with_sense(UNAVAILABLE_SENSE);
        };

        let mut history = self.cache.load(&vehicle.id).await;
        history.reconcile_start_point(route.start_point());
        history.append_sample(vehicle.position(), self.cache.history_size());

        let states = classify_timeline(&history.timeline, &history.start_point);
        let signal = reduce(&states, true);
        tracing::debug!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, ?signal, samples = history.timeline.len(), "reduced history");

        let sense = match resolve_sense(&route.description, signal) {
            Ok(sense) => sense,
            Err(e) => {
                tracing::error!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, error = %e, "temporal inference failed");
                return vehicle.with_sense(UNKNOWN_SENSE);
            }
        };

        if let Err(e) = self.cache.save(&vehicle.id, &history).await {
            tracing::warn!(vehicle_id = %vehicle.id, line_id = %vehicle.line_id, error = %e, "history not saved");
        }

        vehicle.with_sense(sense)
    }
}

/// Picks a strategy per line: the deployment default unless the line has an
/// override.
pub struct ConfiguredResolver {
    default_strategy: Strategy,
    overrides: HashMap<String, Strategy>,
    geometric: GeometricResolver,
    temporal: TemporalResolver,
}

impl ConfiguredResolver {
    pub fn new(default_strategy: Strategy, overrides: HashMap<String, Strategy>, cache: HistoryCache) -> Self {
        Self {
            default_strategy,
            overrides,
            geometric: GeometricResolver,
            temporal: TemporalResolver::new(cache),
        }
    }

    pub fn strategy_for(&self, line_id: &str) -> Strategy {
        self.overrides.get(line_id).copied().unwrap_or(self.default_strategy)
    }
}

#[async_trait]
impl DirectionResolver for ConfiguredResolver {
    async fn infer(&self, vehicle: Vehicle, route: Option<&Route>) -> Vehicle {
        match self.strategy_for(&vehicle.line_id) {
            Strategy::Geometric => self.geometric.infer(vehicle, route).await,
            Strategy::Temporal => self.temporal.infer(vehicle, route).await,
        }
    }
}
