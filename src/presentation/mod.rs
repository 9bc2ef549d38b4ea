// Presentation layer - Read-only HTTP API over processed vehicles
pub mod app_state;
pub mod handlers;
