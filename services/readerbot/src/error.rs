//! services/readerbot/src/error.rs
//!
//! Defines the primary error type for the whole bot service.

use crate::config::ConfigError;
use readerbot_core::{CoreError, PortError};

/// The primary error type for the `readerbot` service.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error raised by the decision core.
    #[error("Decision core error: {0}")]
    Core(#[from] CoreError),

    /// Represents an error that propagated up from one of the collaborator ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
