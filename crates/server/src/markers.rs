//! Map marker API endpoints

use api_types::{Created, marker::MarkerNew};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{MapMarker, MarkerKind};

use crate::{ServerError, server::ServerState};

pub async fn list(State(state): State<ServerState>) -> Json<Vec<MapMarker>> {
    Json(state.engine.markers().await)
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<MarkerNew>,
) -> Result<Json<Created>, ServerError> {
    let kind = match payload.kind.as_deref() {
        Some("itinerary") => MarkerKind::Itinerary,
        _ => MarkerKind::Search,
    };
    let marker = MapMarker {
        id: String::new(),
        name: payload.name,
        lat: payload.lat,
        lng: payload.lng,
        description: payload.description,
        kind,
        time: payload.time,
        day: payload.day,
        timestamp: chrono::Utc::now().timestamp_millis(),
    };
    let id = state.engine.add_marker(&marker).await?;
    Ok(Json(Created { id }))
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_marker(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(State(state): State<ServerState>) -> Result<StatusCode, ServerError> {
    state.engine.clear_markers().await?;
    Ok(StatusCode::NO_CONTENT)
}
