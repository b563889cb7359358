//! Seam for the external text-generation service.
//!
//! The engine only stores and serves chat messages; producing a model reply
//! is an external collaborator's job. Deployments plug a client for their
//! generative-AI provider in here; tests use a canned stub.

use crate::records::ChatMessage;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("assistant error: {0}")]
pub struct AssistantError(pub String);

/// External text-generation collaborator.
#[async_trait::async_trait]
pub trait Assistant: Send + Sync {
    /// Produces the assistant's reply to `prompt`, given the trip
    /// destination (when settings exist) and the prior conversation.
    async fn reply(
        &self,
        destination: Option<&str>,
        history: &[ChatMessage],
        prompt: &str,
    ) -> Result<String, AssistantError>;
}
