// In-memory vehicle repository; remembers the last observed state of each vehicle in the snapshot
use crate::application::vehicle_repository::VehicleRepository;
use crate::domain::vehicle::{ObservationKey, Vehicle};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryVehicleRepository {
    current: RwLock<HashMap<String, Vehicle>>,
    /// Last recorded observation per vehicle, limited to the current snapshot
    history: RwLock<HashMap<String, ObservationKey>>,
}

impl MemoryVehicleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleRepository for MemoryVehicleRepository {
    async fn upsert_all(&self, vehicles: &[Vehicle]) -> anyhow::Result<()> {
        let mut current = self.current.write().await;
        current.clear();
        for vehicle in vehicles {
            current.insert(vehicle.id.clone(), vehicle.clone());
        }
        tracing::info!(count = current.len(), "vehicles saved");

        // vehicles that left the snapshot no longer need de-duplication
        self.history.write().await.retain(|id, _| current.contains_key(id));
        Ok(())
    }

    async fn record_history(&self, vehicle: &Vehicle) -> anyhow::Result<bool> {
        let key = vehicle.observation_key();
        let mut history = self.history.write().await;
        if history.get(&vehicle.id) == Some(&key) {
            return Ok(false);
        }
        history.insert(vehicle.id.clone(), key);
        Ok(true)
    }

    async fn list(&self) -> anyhow::Result<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.current.read().await.values().cloned().collect();
        vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vehicles)
    }

    async fn get(&self, vehicle_id: &str) -> anyhow::Result<Option<Vehicle>> {
        Ok(self.current.read().await.get(vehicle_id).cloned())
    }
}
