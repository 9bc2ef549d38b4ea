// Upstream provider trait for live positions and itineraries
use crate::domain::route::Route;
use crate::domain::vehicle::Vehicle;
use async_trait::async_trait;

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Current snapshot of every reported vehicle. Transport and status
    /// failures are the source's concern and yield an empty snapshot.
    async fn fetch_current_positions(&self) -> Vec<Vehicle>;

    /// Itinerary for a line, or None when the provider has no data for it
    async fn fetch_route(&self, line_id: &str) -> anyhow::Result<Option<Route>>;
}
