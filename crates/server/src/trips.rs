//! Trip and settings API endpoints

use api_types::{Created, trip::TripSwitch};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{TripExport, TripMetadata, TripSettings};
use serde_json::Value;

use crate::{ServerError, server::ServerState};

pub async fn settings(State(state): State<ServerState>) -> Json<Option<TripSettings>> {
    Json(state.engine.settings().await)
}

/// Saves the trip settings; the first save of a session creates and
/// activates the trip.
pub async fn update_settings(
    State(state): State<ServerState>,
    Json(payload): Json<TripSettings>,
) -> Result<StatusCode, ServerError> {
    state.engine.update_settings(&payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list(State(state): State<ServerState>) -> Json<Vec<TripMetadata>> {
    Json(state.engine.trips().await)
}

pub async fn switch(
    State(state): State<ServerState>,
    Json(payload): Json<TripSwitch>,
) -> Result<StatusCode, ServerError> {
    state.engine.switch_trip(&payload.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_trip(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export(State(state): State<ServerState>) -> Result<Json<TripExport>, ServerError> {
    Ok(Json(state.engine.export_trip().await?))
}

pub async fn import(
    State(state): State<ServerState>,
    Json(payload): Json<Value>,
) -> Result<Json<Created>, ServerError> {
    let id = state.engine.import_trip(payload).await?;
    Ok(Json(Created { id }))
}
