//! crates/readerbot_core/src/ports.rs
//!
//! Defines the collaborator contracts (traits) the decision core talks to.
//! These traits form the boundary of the hexagonal architecture: the core only
//! ever sees a history of posts and a library snapshot, never a database,
//! a spreadsheet or a social network.

use async_trait::async_trait;

use crate::domain::{LibrarySnapshot, Post};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("No posts recorded yet")]
    EmptyHistory,
    #[error("History store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Reading list source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Malformed reading list data: {0}")]
    MalformedData(String),
    #[error("Publishing failed: {0}")]
    PublishFailed(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Append-only log of published posts.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The post with the greatest timestamp. Fails with `EmptyHistory` on a fresh store.
    async fn most_recent(&self) -> PortResult<Post>;

    /// Records a post. Either the whole post is stored or nothing is.
    async fn append(&self, post: &Post) -> PortResult<()>;
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the reading list and stamps the snapshot with `timestamp`.
    async fn fetch_library_snapshot(&self, timestamp: i64) -> PortResult<LibrarySnapshot>;
}

/// Acknowledgement returned by a platform after a successful post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishAck {
    pub id: Option<String>,
    pub url: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short platform name, used in logs.
    fn name(&self) -> &str;

    async fn publish(&self, text: &str) -> PortResult<PublishAck>;
}
