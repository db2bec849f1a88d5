//! crates/readerbot_core/src/cadence.rs
//!
//! The cadence gate: decides the earliest time the next post may go out.
//!
//! The gap after a post is drawn uniformly from
//! `[min_gap_days, min_gap_days + 2 * (mean_gap_days - min_gap_days)]`, so it
//! never drops below the floor and averages out to `mean_gap_days`. The draw
//! is a SHA-1 of the previous post, not wall-clock entropy: the same history
//! always yields the same schedule.

use sha1::{Digest, Sha1};

use crate::domain::Post;
use crate::error::{CoreError, CoreResult};

pub const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Ten bits of resolution for the pseudorandom fraction.
const DRAW_DENOMINATOR: u32 = 1024;

/// Validated pair of cadence parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadencePolicy {
    min_gap_days: f64,
    mean_gap_days: f64,
}

/// Outcome of checking the gate at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceCheck {
    pub previous_timestamp: i64,
    pub next_eligible_timestamp: i64,
    pub eligible: bool,
}

impl CadencePolicy {
    pub fn new(min_gap_days: f64, mean_gap_days: f64) -> CoreResult<Self> {
        if !min_gap_days.is_finite() || !mean_gap_days.is_finite() || min_gap_days < 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "gap days must be finite and non-negative; got min {} and mean {}",
                min_gap_days, mean_gap_days
            )));
        }
        if mean_gap_days <= min_gap_days {
            return Err(CoreError::InvalidConfig(format!(
                "mean gap must exceed min gap; {} vs. {}",
                mean_gap_days, min_gap_days
            )));
        }
        Ok(Self {
            min_gap_days,
            mean_gap_days,
        })
    }

    pub fn min_gap_days(&self) -> f64 {
        self.min_gap_days
    }

    pub fn mean_gap_days(&self) -> f64 {
        self.mean_gap_days
    }

    /// Days to wait after `previous`.
    pub fn gap_days(&self, previous: &Post) -> f64 {
        let width_days = 2.0 * (self.mean_gap_days - self.min_gap_days);
        self.min_gap_days + draw_fraction(previous) * width_days
    }

    /// Seconds since the epoch at which the next post becomes allowed.
    pub fn next_eligible_timestamp(&self, previous: &Post) -> i64 {
        let gap_sec = self.gap_days(previous) * SECONDS_PER_DAY as f64;
        (previous.timestamp() as f64 + gap_sec) as i64
    }

    pub fn is_eligible(&self, now: i64, previous: &Post) -> bool {
        now >= self.next_eligible_timestamp(previous)
    }

    /// The boolean decision together with the raw schedule, for callers that
    /// want to report the next opportunity without forcing a post.
    pub fn check(&self, now: i64, previous: &Post) -> CadenceCheck {
        let next_eligible_timestamp = self.next_eligible_timestamp(previous);
        CadenceCheck {
            previous_timestamp: previous.timestamp(),
            next_eligible_timestamp,
            eligible: now >= next_eligible_timestamp,
        }
    }
}

/// Free-standing form of the gate for one-off checks.
pub fn is_eligible(
    now: i64,
    previous: &Post,
    min_gap_days: f64,
    mean_gap_days: f64,
) -> CoreResult<bool> {
    Ok(CadencePolicy::new(min_gap_days, mean_gap_days)?.is_eligible(now, previous))
}

/// A fraction in `[0, 1)` fully determined by the post's content.
///
/// SHA-1 over `subject + variant + text + decimal(timestamp)`, read as a
/// big-endian integer, reduced modulo 1024 and divided by 1024. Only the low
/// ten bits of the digest survive the reduction.
pub fn draw_fraction(post: &Post) -> f64 {
    let mut hasher = Sha1::new();
    hasher.update(post.subject().as_bytes());
    hasher.update(post.variant().as_bytes());
    hasher.update(post.text().as_bytes());
    hasher.update(post.timestamp().to_string().as_bytes());
    let digest = hasher.finalize();

    let tail = u32::from(u16::from_be_bytes([digest[18], digest[19]]));
    f64::from(tail % DRAW_DENOMINATOR) / f64::from(DRAW_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUNE_TEXT: &str = "#ReaderBot: Brian is halfway done with Dune and should finish in around 12 days. https://goo.gl/pEH6yP";

    fn dune_post() -> Post {
        Post::new("Dune", "halfway done with", DUNE_TEXT, 1_700_000_000).unwrap()
    }

    #[test]
    fn test_rejects_min_not_below_mean() {
        assert!(matches!(
            CadencePolicy::new(3.0, 3.0),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            CadencePolicy::new(5.0, 2.0),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(CadencePolicy::new(f64::NAN, 2.0).is_err());
        assert!(is_eligible(0, &dune_post(), 6.0, 2.0).is_err());
    }

    #[test]
    fn test_draw_matches_reference_digest() {
        // sha1(...) mod 1024 == 564 for this post; 664 for the second.
        assert_eq!(draw_fraction(&dune_post()), 564.0 / 1024.0);
        let rate = Post::new("page_rate", "page_rate", "hello", 0).unwrap();
        assert_eq!(draw_fraction(&rate), 664.0 / 1024.0);
    }

    #[test]
    fn test_next_eligible_timestamp_reference() {
        let policy = CadencePolicy::new(2.0, 6.0).unwrap();
        assert_eq!(policy.next_eligible_timestamp(&dune_post()), 1_700_553_500);
        let rate = Post::new("page_rate", "page_rate", "hello", 0).unwrap();
        assert_eq!(policy.next_eligible_timestamp(&rate), 621_000);
    }

    #[test]
    fn test_gate_is_deterministic() {
        let policy = CadencePolicy::new(2.5, 4.0).unwrap();
        let first = policy.next_eligible_timestamp(&dune_post());
        let second = policy.next_eligible_timestamp(&dune_post().clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_gap_never_below_floor() {
        for (min, mean) in [(0.0, 1.0), (1.0, 3.0), (2.0, 6.0), (2.5, 4.0), (7.0, 7.5)] {
            let policy = CadencePolicy::new(min, mean).unwrap();
            for i in 0..500i64 {
                let post = Post::new(
                    format!("Book {}", i),
                    "just starting",
                    format!("message {}", i * 7),
                    1_600_000_000 + i * 3_601,
                )
                .unwrap();
                let next = policy.next_eligible_timestamp(&post);
                assert!(next - post.timestamp() >= (min * SECONDS_PER_DAY as f64) as i64);
                let max_gap = min + 2.0 * (mean - min);
                assert!(((next - post.timestamp()) as f64) < max_gap * SECONDS_PER_DAY as f64);
            }
        }
    }

    #[test]
    fn test_mean_gap_converges() {
        let policy = CadencePolicy::new(2.0, 6.0).unwrap();
        let samples = 20_000;
        let total: f64 = (0..samples)
            .map(|i| {
                let post = Post::new(
                    format!("Title {}", i % 37),
                    "halfway done with",
                    format!("text {}", i),
                    1_500_000_000 + i as i64 * 86_400,
                )
                .unwrap();
                policy.gap_days(&post)
            })
            .sum();
        let mean = total / samples as f64;
        assert!((mean - 6.0).abs() < 0.1, "mean gap was {}", mean);
    }

    #[test]
    fn test_check_reports_schedule() {
        let policy = CadencePolicy::new(2.0, 6.0).unwrap();
        let post = dune_post();
        let early = policy.check(post.timestamp() + SECONDS_PER_DAY, &post);
        assert!(!early.eligible);
        assert_eq!(early.previous_timestamp, 1_700_000_000);
        assert_eq!(early.next_eligible_timestamp, 1_700_553_500);

        let on_time = policy.check(1_700_553_500, &post);
        assert!(on_time.eligible);
        assert!(policy.is_eligible(1_700_553_500, &post));
        assert!(!policy.is_eligible(1_700_553_499, &post));
    }
}
