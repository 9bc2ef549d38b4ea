// Repository trait for processed vehicle records
use crate::domain::vehicle::Vehicle;
use async_trait::async_trait;

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Replace the current snapshot with `vehicles`, keyed by vehicle id
    async fn upsert_all(&self, vehicles: &[Vehicle]) -> anyhow::Result<()>;

    /// Record `vehicle` in the seen-states history unless it repeats the
    /// state already recorded for it. Returns whether a new entry was created.
    async fn record_history(&self, vehicle: &Vehicle) -> anyhow::Result<bool>;

    async fn list(&self) -> anyhow::Result<Vec<Vehicle>>;

    async fn get(&self, vehicle_id: &str) -> anyhow::Result<Option<Vehicle>>;
}
