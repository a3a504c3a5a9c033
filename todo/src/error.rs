//! Error types for persistence, submission and configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by a [`TodoRepository`](crate::repository::TodoRepository)
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    /// Storage could not be reached or read
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Storage rejected a write
    #[error("Insert failed: {0}")]
    InsertFailed(String),

    /// The observable list ended before emitting a value
    #[error("Todo sequence ended without emitting")]
    SequenceEnded,
}

/// Why a submission ended in the failure callback
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitError {
    /// The draft matched the configured failure sentinel
    #[error("Simulated failure")]
    SimulatedFailure,

    /// The repository rejected the write
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held something that is not a millisecond count
    #[error("{name} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis {
        /// Variable name
        name: &'static str,
        /// Raw value found
        value: String,
    },
}
