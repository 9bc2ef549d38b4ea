// Errors raised by the direction inference core
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SenseError {
    #[error("no route data for line {line_id}")]
    MissingRouteData { line_id: String },

    #[error("route for line {line_id} has no waypoints")]
    EmptyRouteGeometry { line_id: String },

    #[error("route description {description:?} must contain exactly one \" X \" separator")]
    MalformedDescription { description: String },

    #[error("failed to read history for vehicle {vehicle_id}: {source}")]
    CacheRead {
        vehicle_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write history for vehicle {vehicle_id}: {source}")]
    CacheWrite {
        vehicle_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("history store did not answer within {millis}ms for vehicle {vehicle_id}")]
    Timeout { vehicle_id: String, millis: u64 },
}
