//! The module contains the errors the store can throw.

use sea_orm::DbErr;
use thiserror::Error;

/// Store custom errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A mutation was issued while no trip namespace is active.
    #[error("no active trip")]
    NoActiveTrip,
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Remote(#[from] reqwest::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
