// Application layer - Use cases and the ports they depend on
pub mod direction_resolver;
pub mod history_cache;
pub mod history_store;
pub mod telemetry_source;
pub mod tracking_service;
pub mod vehicle_repository;
