// HTTP request handlers
use crate::domain::vehicle::Vehicle;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:id", get(get_vehicle))
        .route("/lines/:line_id/vehicles", get(list_line_vehicles))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest processed snapshot of the whole fleet
pub async fn list_vehicles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Vehicle>>, StatusCode> {
    state.repository.list().await.map(Json).map_err(|e| {
        tracing::error!(error = %e, "Error listing vehicles");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

pub async fn get_vehicle(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vehicle>, StatusCode> {
    match state.repository.get(&id).await {
        Ok(Some(vehicle)) => Ok(Json(vehicle)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(vehicle_id = %id, error = %e, "Error fetching vehicle");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn list_line_vehicles(
    Path(line_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Vehicle>>, StatusCode> {
    let vehicles = state.repository.list().await.map_err(|e| {
        tracing::error!(line_id = %line_id, error = %e, "Error listing vehicles");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(vehicles.into_iter().filter(|v| v.line_id == line_id).collect()))
}
