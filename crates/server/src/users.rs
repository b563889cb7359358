//! Participant API endpoints

use api_types::{
    Created,
    user::{UserNew, UserRename},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::User;

use crate::{ServerError, server::ServerState};

pub async fn list(State(state): State<ServerState>) -> Json<Vec<User>> {
    Json(state.engine.users().await)
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<Json<Created>, ServerError> {
    let id = state.engine.add_user(&payload.name).await?;
    Ok(Json(Created { id }))
}

pub async fn rename(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<UserRename>,
) -> Result<StatusCode, ServerError> {
    state.engine.rename_user(&id, &payload.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
