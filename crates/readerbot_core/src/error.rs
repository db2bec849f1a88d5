//! crates/readerbot_core/src/error.rs
//!
//! The error taxonomy of the decision core.
//!
//! Declining to post is not an error and never shows up here; see
//! `selector::Decision` for that.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The cadence or draw parameters are inconsistent (e.g. min gap >= mean gap).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The history store holds no posts; it must be seeded first.
    #[error("Posting history is empty; seed it with a placeholder post first")]
    EmptyHistory,

    /// Book rows or aggregate statistics could not be parsed, or are inconsistent.
    #[error("Malformed reading list data: {0}")]
    MalformedData(String),

    /// A post was built with an empty message.
    #[error("Invalid post: {0}")]
    InvalidPost(String),

    /// Every candidate generator came up empty.
    #[error("No candidate post available from the reading list")]
    NoCandidateAvailable,

    /// Any other failure reported by a collaborator.
    #[error("Service Port Error: {0}")]
    Port(PortError),
}

impl From<PortError> for CoreError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::EmptyHistory => CoreError::EmptyHistory,
            PortError::MalformedData(msg) => CoreError::MalformedData(msg),
            other => CoreError::Port(other),
        }
    }
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;
