use axum::{
    Router,
    routing::{delete, get, post},
};

use std::sync::Arc;

use crate::{chat, expenses, itinerary, markers, trips, users};
use engine::{Engine, assistant::Assistant};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// Optional text-generation collaborator; chat replies are skipped when
    /// none is configured.
    pub assistant: Option<Arc<dyn Assistant>>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            axum::routing::patch(users::rename).delete(users::remove),
        )
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route("/expenses/{id}", delete(expenses::remove))
        .route("/settlement", get(expenses::settlement))
        .route("/itinerary", get(itinerary::list).post(itinerary::create))
        .route(
            "/itinerary/{id}",
            axum::routing::patch(itinerary::update).delete(itinerary::remove),
        )
        .route("/chat", get(chat::list).post(chat::send))
        .route(
            "/markers",
            get(markers::list).post(markers::create).delete(markers::clear),
        )
        .route("/markers/{id}", delete(markers::remove))
        .route("/settings", get(trips::settings).put(trips::update_settings))
        .route("/trips", get(trips::list))
        .route("/trips/switch", post(trips::switch))
        .route("/trips/{id}", delete(trips::remove))
        .route("/trips/export", get(trips::export))
        .route("/trips/import", post(trips::import))
        .with_state(state)
}

pub async fn run(state: ServerState, bind: &str) {
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
