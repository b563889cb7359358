//! Itinerary API endpoints

use api_types::{
    Created,
    itinerary::{ItineraryItemNew, ItineraryItemUpdate},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::ItineraryItem;

use crate::{ServerError, server::ServerState};

pub async fn list(State(state): State<ServerState>) -> Json<Vec<ItineraryItem>> {
    Json(state.engine.itinerary().await)
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ItineraryItemNew>,
) -> Result<Json<Created>, ServerError> {
    let item = ItineraryItem {
        id: String::new(),
        time: payload.time,
        activity: payload.activity,
        location: payload.location,
        notes: payload.notes,
        day: payload.day,
        lat: payload.lat,
        lng: payload.lng,
        weather: None,
    };
    let id = state.engine.add_itinerary_item(&item).await?;
    Ok(Json(Created { id }))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ItineraryItemUpdate>,
) -> Result<StatusCode, ServerError> {
    let partial = serde_json::to_value(&payload)
        .map_err(|err| ServerError::Generic(err.to_string()))?;
    state.engine.update_itinerary_item(&id, partial).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_itinerary_item(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
