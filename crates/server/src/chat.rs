//! Chat API endpoints
//!
//! Sending a message stores it and, when an assistant is configured,
//! generates and stores the model reply in the same request. An assistant
//! failure never loses the user's message.

use api_types::chat::ChatSend;
use axum::{Json, extract::State};
use engine::{ChatMessage, ChatRole};

use crate::{ServerError, server::ServerState};

pub async fn list(State(state): State<ServerState>) -> Json<Vec<ChatMessage>> {
    Json(state.engine.chat().await)
}

/// Messages persisted by one send: the user's, plus the model reply when
/// an assistant produced one.
pub async fn send(
    State(state): State<ServerState>,
    Json(payload): Json<ChatSend>,
) -> Result<Json<Vec<ChatMessage>>, ServerError> {
    let history = state.engine.chat().await;
    let message = state
        .engine
        .send_chat_message(ChatRole::User, &payload.text)
        .await?;
    let mut stored = vec![message];

    if let Some(assistant) = &state.assistant {
        let destination = state
            .engine
            .settings()
            .await
            .map(|settings| settings.destination);
        match assistant
            .reply(destination.as_deref(), &history, &payload.text)
            .await
        {
            Ok(reply) => {
                let reply = state
                    .engine
                    .send_chat_message(ChatRole::Model, &reply)
                    .await?;
                stored.push(reply);
            }
            Err(err) => tracing::warn!("assistant reply failed: {err}"),
        }
    }

    Ok(Json(stored))
}
