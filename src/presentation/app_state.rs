// Application state for HTTP handlers
use crate::application::vehicle_repository::VehicleRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn VehicleRepository>,
}
