use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use store::StoreError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod chat;
mod expenses;
mod itinerary;
mod markers;
mod server;
mod trips;
mod users;

pub mod types {
    pub mod user {
        pub use api_types::user::{UserNew, UserRename};
        pub use engine::User;
    }

    pub mod expense {
        pub use api_types::expense::ExpenseNew;
        pub use engine::{Balance, Debt, Expense, Settlement};
    }

    pub mod itinerary {
        pub use api_types::itinerary::{ItineraryItemNew, ItineraryItemUpdate};
        pub use engine::ItineraryItem;
    }

    pub mod chat {
        pub use api_types::chat::ChatSend;
        pub use engine::{ChatMessage, ChatRole};
    }

    pub mod marker {
        pub use api_types::marker::MarkerNew;
        pub use engine::{MapMarker, MarkerKind};
    }

    pub mod trip {
        pub use api_types::trip::TripSwitch;
        pub use engine::{TripExport, TripMetadata, TripSettings};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InvalidName(_) | EngineError::InvalidImport(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::Store(StoreError::NoActiveTrip | StoreError::InvalidDocument(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        // Backend failures carry connection strings and endpoints; those
        // stay in the logs.
        EngineError::Store(
            store_err @ (StoreError::Database(_)
            | StoreError::Remote(_)
            | StoreError::Serialization(_)),
        ) => {
            tracing::error!("storage error: {store_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<StoreError> for ServerError {
    fn from(value: StoreError) -> Self {
        Self::Engine(EngineError::Store(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidName("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn missing_trip_maps_to_422() {
        let res = ServerError::from(StoreError::NoActiveTrip).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
