//! Expense and settlement API endpoints

use api_types::{Created, expense::ExpenseNew};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Expense, Settlement};

use crate::{ServerError, server::ServerState};

pub async fn list(State(state): State<ServerState>) -> Json<Vec<Expense>> {
    Json(state.engine.expenses().await)
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<Created>, ServerError> {
    let id = state
        .engine
        .add_expense(
            &payload.payer,
            payload.amount,
            &payload.description,
            payload.date,
            payload.involved,
        )
        .await?;
    Ok(Json(Created { id }))
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Balances and the transfer plan for the active trip.
pub async fn settlement(State(state): State<ServerState>) -> Json<Settlement> {
    Json(state.engine.settlement().await)
}
