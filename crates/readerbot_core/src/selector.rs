//! crates/readerbot_core/src/selector.rs
//!
//! Orchestrates one decision cycle: cadence gate, then summarizer, then the
//! duplicate check. Performs no publishing and never writes history; the
//! caller appends to history only after a successful publish.

use rand::Rng;
use tracing::{info, warn};

use crate::cadence::CadencePolicy;
use crate::domain::Post;
use crate::error::CoreResult;
use crate::ports::{HistoryStore, SnapshotSource};
use crate::summarizer::Summarizer;

/// Result of a decision cycle. Declining is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Post(Post),
    Decline { reason: String },
}

impl Decision {
    /// The `(post, reason)` pair; the reason is empty when a post was chosen.
    pub fn into_parts(self) -> (Option<Post>, String) {
        match self {
            Decision::Post(post) => (Some(post), String::new()),
            Decision::Decline { reason } => (None, reason),
        }
    }

    pub fn post(&self) -> Option<&Post> {
        match self {
            Decision::Post(post) => Some(post),
            Decision::Decline { .. } => None,
        }
    }
}

/// Everything the selector needs besides the collaborators.
#[derive(Debug, Clone)]
pub struct SelectorSettings {
    pub cadence: CadencePolicy,
    pub summarizer: Summarizer,
    /// Bypass the cadence gate ("force run").
    pub skip_gap_check: bool,
}

/// Decides whether to post at `now`, and what.
///
/// Store and source failures propagate unchanged; "too soon" and
/// "duplicate" come back as `Decision::Decline`.
pub async fn select_next_post<R: Rng + ?Sized>(
    now: i64,
    history: &dyn HistoryStore,
    source: &dyn SnapshotSource,
    settings: &SelectorSettings,
    rng: &mut R,
) -> CoreResult<Decision> {
    let previous = history.most_recent().await?;

    if !settings.skip_gap_check {
        let check = settings.cadence.check(now, &previous);
        if !check.eligible {
            return Ok(Decision::Decline {
                reason: format!(
                    "too soon, previous={}, nextEligible={}",
                    check.previous_timestamp, check.next_eligible_timestamp
                ),
            });
        }
    }

    let snapshot = source.fetch_library_snapshot(now).await?;
    info!(
        "Fetched reading list: {} books, {} in progress",
        snapshot.books().len(),
        snapshot.in_progress().len()
    );

    let candidate = settings.summarizer.summarize(&snapshot, rng)?;
    if candidate.is_duplicate(&previous) {
        warn!(
            "READERBOT_DUPE candidate ({}, {}) repeats the previous post",
            candidate.subject(),
            candidate.variant()
        );
        return Ok(Decision::Decline {
            reason: "duplicate of previous post".to_string(),
        });
    }

    Ok(Decision::Post(candidate))
}
