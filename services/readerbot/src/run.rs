//! services/readerbot/src/run.rs
//!
//! One scheduled invocation of the bot: decide, publish, then record.
//!
//! History is appended only after the publisher acknowledged the post, so
//! the store never records something that did not go out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use readerbot_core::{
    select_next_post, CadenceCheck, CadencePolicy, Decision, HistoryStore, Post, PublishAck,
    Publisher, SelectorSettings, SnapshotSource, Summarizer,
};
use tracing::{error, info};

use crate::error::BotError;

/// The wired-up collaborators and policy for one run.
#[derive(Clone)]
pub struct Bot {
    pub history: Arc<dyn HistoryStore>,
    pub source: Arc<dyn SnapshotSource>,
    pub publisher: Arc<dyn Publisher>,
    pub cadence: CadencePolicy,
    pub summarizer: Summarizer,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip the cadence gate.
    pub force: bool,
    /// Select and log a post, but neither publish nor record it.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Declined { reason: String },
    DryRun(Post),
    Published { post: Post, ack: PublishAck },
}

/// When the last post went out and when the next one may.
#[derive(Debug, Clone)]
pub struct Timetable {
    pub previous: Post,
    pub check: CadenceCheck,
}

impl std::fmt::Display for Timetable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "previous post at {} ({}); NEXT POST AT {} ({}); eligible now: {}",
            self.check.previous_timestamp,
            rfc3339(self.check.previous_timestamp),
            self.check.next_eligible_timestamp,
            rfc3339(self.check.next_eligible_timestamp),
            self.check.eligible
        )
    }
}

fn rfc3339(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "out of range".to_string())
}

impl Bot {
    pub async fn run_cycle<R: Rng + ?Sized>(
        &self,
        now: i64,
        options: RunOptions,
        rng: &mut R,
    ) -> Result<CycleOutcome, BotError> {
        let settings = SelectorSettings {
            cadence: self.cadence,
            summarizer: self.summarizer.clone(),
            skip_gap_check: options.force,
        };

        let decision = select_next_post(
            now,
            self.history.as_ref(),
            self.source.as_ref(),
            &settings,
            rng,
        )
        .await?;

        let post = match decision {
            Decision::Decline { reason } => {
                info!("READERBOT_DECLINE {}", reason);
                return Ok(CycleOutcome::Declined { reason });
            }
            Decision::Post(post) => post,
        };

        info!(
            "Selected post ({}, {}), {} chars: {}",
            post.subject(),
            post.variant(),
            post.text().chars().count(),
            post.text()
        );
        if options.dry_run {
            info!("Dry run; not posting.");
            return Ok(CycleOutcome::DryRun(post));
        }

        info!("READERBOT_POSTING to {}", self.publisher.name());
        let ack = self.publisher.publish(post.text()).await.map_err(|e| {
            error!("Posting to {} failed: {}", self.publisher.name(), e);
            e
        })?;
        self.history.append(&post).await?;
        info!("Recorded post in history (id: {:?}, url: {:?})", ack.id, ack.url);

        Ok(CycleOutcome::Published { post, ack })
    }

    pub async fn timetable(&self, now: i64) -> Result<Timetable, BotError> {
        let previous = self.history.most_recent().await?;
        let check = self.cadence.check(now, &previous);
        Ok(Timetable { previous, check })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use readerbot_core::{
        Book, DrawThresholds, LibrarySnapshot, LibraryStats, MessageStyle, PortError, PortResult,
        SECONDS_PER_DAY,
    };
    use std::sync::Mutex;

    const T0: i64 = 1_700_000_000;

    #[derive(Default)]
    struct MemoryHistory {
        posts: Mutex<Vec<Post>>,
    }

    #[async_trait]
    impl HistoryStore for MemoryHistory {
        async fn most_recent(&self) -> PortResult<Post> {
            self.posts
                .lock()
                .unwrap()
                .iter()
                .max_by_key(|p| p.timestamp())
                .cloned()
                .ok_or(PortError::EmptyHistory)
        }

        async fn append(&self, post: &Post) -> PortResult<()> {
            self.posts.lock().unwrap().push(post.clone());
            Ok(())
        }
    }

    struct OneBookSource;

    #[async_trait]
    impl SnapshotSource for OneBookSource {
        async fn fetch_library_snapshot(&self, timestamp: i64) -> PortResult<LibrarySnapshot> {
            let stats = LibraryStats {
                pages_total: 880,
                pages_read: 440,
                elapsed_days: 44,
                page_rate: 10.0,
                days_left: 44.0,
                years_left: 0.12,
                finish_date: "Dec 1, 2026".to_string(),
            };
            let books = vec![Book::new("Middlemarch", 880, 440).map_err(|e| {
                PortError::MalformedData(e.to_string())
            })?];
            Ok(LibrarySnapshot::new(books, stats, timestamp))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn name(&self) -> &str {
            "recording"
        }

        async fn publish(&self, text: &str) -> PortResult<PublishAck> {
            if self.fail {
                return Err(PortError::PublishFailed("503 Service Unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(PublishAck {
                id: Some("1".to_string()),
                url: None,
            })
        }
    }

    fn bot(history: Arc<MemoryHistory>, publisher: Arc<RecordingPublisher>) -> Bot {
        Bot {
            history,
            source: Arc::new(OneBookSource),
            publisher,
            cadence: CadencePolicy::new(2.0, 6.0).unwrap(),
            summarizer: Summarizer::new(
                DrawThresholds::new(1.0, 1.0).unwrap(),
                MessageStyle::default(),
                Some(270),
            ),
        }
    }

    fn seeded() -> Arc<MemoryHistory> {
        let history = MemoryHistory::default();
        history
            .posts
            .lock()
            .unwrap()
            .push(Post::new("seed", "seed", "seed", T0).unwrap());
        Arc::new(history)
    }

    #[tokio::test]
    async fn test_publishes_then_records() {
        let history = seeded();
        let publisher = Arc::new(RecordingPublisher::default());
        let bot = bot(history.clone(), publisher.clone());
        let now = T0 + 30 * SECONDS_PER_DAY;

        let outcome = bot
            .run_cycle(now, RunOptions::default(), &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();

        let CycleOutcome::Published { post, ack } = outcome else {
            panic!("expected a published post");
        };
        assert_eq!(post.subject(), "Middlemarch");
        assert_eq!(ack.id.as_deref(), Some("1"));
        assert_eq!(*publisher.sent.lock().unwrap(), vec![post.text().to_string()]);
        assert_eq!(history.most_recent().await.unwrap(), post);
    }

    #[tokio::test]
    async fn test_failed_publish_leaves_history_alone() {
        let history = seeded();
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..Default::default()
        });
        let bot = bot(history.clone(), publisher);

        let result = bot
            .run_cycle(T0 + 30 * SECONDS_PER_DAY, RunOptions::default(), &mut StdRng::seed_from_u64(2))
            .await;

        assert!(matches!(result, Err(BotError::Port(PortError::PublishFailed(_)))));
        assert_eq!(history.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_neither_publishes_nor_records() {
        let history = seeded();
        let publisher = Arc::new(RecordingPublisher::default());
        let bot = bot(history.clone(), publisher.clone());
        let options = RunOptions {
            force: true,
            dry_run: true,
        };

        let outcome = bot
            .run_cycle(T0 + 1, options, &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();

        assert!(matches!(outcome, CycleOutcome::DryRun(_)));
        assert!(publisher.sent.lock().unwrap().is_empty());
        assert_eq!(history.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_too_soon_is_declined() {
        let history = seeded();
        let publisher = Arc::new(RecordingPublisher::default());
        let bot = bot(history, publisher.clone());

        let outcome = bot
            .run_cycle(T0 + SECONDS_PER_DAY, RunOptions::default(), &mut StdRng::seed_from_u64(4))
            .await
            .unwrap();

        assert!(matches!(outcome, CycleOutcome::Declined { ref reason } if reason.starts_with("too soon")));
        assert!(publisher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_declines_duplicate() {
        let history = seeded();
        let publisher = Arc::new(RecordingPublisher::default());
        let bot = bot(history, publisher.clone());
        let force = RunOptions {
            force: true,
            dry_run: false,
        };

        bot.run_cycle(T0 + 1, force, &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();
        let second = bot
            .run_cycle(T0 + 2, force, &mut StdRng::seed_from_u64(6))
            .await
            .unwrap();

        assert_eq!(
            second,
            CycleOutcome::Declined {
                reason: "duplicate of previous post".to_string()
            }
        );
        assert_eq!(publisher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timetable() {
        let bot = bot(seeded(), Arc::new(RecordingPublisher::default()));
        let timetable = bot.timetable(T0).await.unwrap();
        assert_eq!(timetable.previous.subject(), "seed");
        assert!(!timetable.check.eligible);
        assert!(timetable.check.next_eligible_timestamp >= T0 + 2 * SECONDS_PER_DAY);
        assert!(timetable.to_string().contains("NEXT POST AT"));
    }
}
