//! crates/readerbot_core/src/summarizer.rs
//!
//! Turns a library snapshot into a candidate post.
//!
//! Three kinds of candidate exist: a progress update on one in-progress book,
//! a reading-rate statistic and a countdown of books left. One uniform draw
//! per cycle picks which kind to try first; unavailable candidates fall
//! through to the next kind.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::domain::{LibrarySnapshot, Post};
use crate::error::{CoreError, CoreResult};

pub const PAGE_RATE_SUBJECT: &str = "page_rate";
pub const NUM_TO_GO_SUBJECT: &str = "num_to_go";

/// The kinds of candidate post, in fall-through order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Progress,
    Rate,
    Countdown,
}

/// Draw thresholds: `draw < progress` tries the progress post first,
/// `draw < rate` the rate post, anything else goes straight to the countdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawThresholds {
    progress: f64,
    rate: f64,
}

impl DrawThresholds {
    pub fn new(progress: f64, rate: f64) -> CoreResult<Self> {
        let in_unit = |t: f64| (0.0..=1.0).contains(&t);
        if !in_unit(progress) || !in_unit(rate) || progress > rate {
            return Err(CoreError::InvalidConfig(format!(
                "draw thresholds must satisfy 0 <= progress <= rate <= 1; got {} and {}",
                progress, rate
            )));
        }
        Ok(Self { progress, rate })
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The kind tried first for a given draw.
    pub fn first_choice(&self, draw: f64) -> CandidateKind {
        if draw < self.progress {
            CandidateKind::Progress
        } else if draw < self.rate {
            CandidateKind::Rate
        } else {
            CandidateKind::Countdown
        }
    }
}

impl Default for DrawThresholds {
    fn default() -> Self {
        Self {
            progress: 0.8,
            rate: 0.9,
        }
    }
}

/// The fixed pieces of every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStyle {
    pub hashtag: String,
    pub reader_name: String,
    pub list_url: String,
    pub tracking_since: String,
}

impl Default for MessageStyle {
    fn default() -> Self {
        Self {
            hashtag: "#ReaderBot".to_string(),
            reader_name: "Brian".to_string(),
            list_url: "https://goo.gl/pEH6yP".to_string(),
            tracking_since: "Nov 12, 2016".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    pub thresholds: DrawThresholds,
    pub style: MessageStyle,
    /// Candidates with more characters than this are treated as unavailable.
    pub max_chars: Option<usize>,
}

impl Summarizer {
    pub fn new(thresholds: DrawThresholds, style: MessageStyle, max_chars: Option<usize>) -> Self {
        Self {
            thresholds,
            style,
            max_chars,
        }
    }

    /// Draws once and returns the chosen candidate.
    pub fn summarize<R: Rng + ?Sized>(
        &self,
        snapshot: &LibrarySnapshot,
        rng: &mut R,
    ) -> CoreResult<Post> {
        let draw: f64 = rng.gen();
        info!("Random draw: {:.3}", draw);
        self.summarize_with_draw(snapshot, draw, rng)
    }

    /// Same as `summarize`, with the draw supplied by the caller. `rng` is only
    /// used to pick among in-progress books.
    pub fn summarize_with_draw<R: Rng + ?Sized>(
        &self,
        snapshot: &LibrarySnapshot,
        draw: f64,
        rng: &mut R,
    ) -> CoreResult<Post> {
        let first = self.thresholds.first_choice(draw);

        if first == CandidateKind::Progress {
            debug!("Attempting 'current read' post");
            match self.progress_post(snapshot, rng)? {
                Some(post) if self.fits(&post) => return Ok(post),
                Some(_) => debug!("Progress post too long"),
                None => debug!("Empty in-progress list"),
            }
        }

        if matches!(first, CandidateKind::Progress | CandidateKind::Rate) {
            debug!("Attempting 'page rate' post");
            let post = self.rate_post(snapshot)?;
            if self.fits(&post) {
                return Ok(post);
            }
            debug!("Rate post too long");
        }

        debug!("Attempting 'num to go' post");
        let post = self.countdown_post(snapshot)?;
        if self.fits(&post) {
            return Ok(post);
        }
        Err(CoreError::NoCandidateAvailable)
    }

    /// Progress on one uniformly chosen in-progress book, or `None` if no book
    /// is in progress or the page rate cannot produce an estimate.
    pub fn progress_post<R: Rng + ?Sized>(
        &self,
        snapshot: &LibrarySnapshot,
        rng: &mut R,
    ) -> CoreResult<Option<Post>> {
        let page_rate = snapshot.stats().page_rate;
        if page_rate <= 0.0 {
            return Ok(None);
        }
        let in_progress = snapshot.in_progress();
        let Some(book) = in_progress.choose(rng) else {
            return Ok(None);
        };

        // A vanishing rate gives an estimate no integer can hold.
        let estimate = (book.pages_to_go() as f64 / page_rate).floor();
        if !estimate.is_finite() || estimate >= u64::MAX as f64 {
            return Ok(None);
        }
        let days_left = (estimate as u64).saturating_add(1);
        let label = book.progress_label();
        let text = format!(
            "{}: {} is {} {} and should finish in around {} days. {}",
            self.style.hashtag,
            self.style.reader_name,
            label,
            book.title(),
            days_left,
            self.style.list_url
        );
        Post::new(book.title(), label.as_str(), text, snapshot.timestamp()).map(Some)
    }

    pub fn rate_post(&self, snapshot: &LibrarySnapshot) -> CoreResult<Post> {
        let stats = snapshot.stats();
        let num_done = snapshot.num_done();
        let books_per_month = if stats.elapsed_days == 0 {
            0.0
        } else {
            (30 * num_done) as f64 / stats.elapsed_days as f64
        };
        let text = format!(
            "{}: {} has read {} pages across {} books since {}. \
             That's {:.0} pages per day ({:.1} books per month). {}",
            self.style.hashtag,
            self.style.reader_name,
            with_thousands(snapshot.pages_read()),
            num_done + snapshot.in_progress().len(),
            self.style.tracking_since,
            stats.page_rate,
            books_per_month,
            self.style.list_url
        );
        Post::new(PAGE_RATE_SUBJECT, PAGE_RATE_SUBJECT, text, snapshot.timestamp())
    }

    pub fn countdown_post(&self, snapshot: &LibrarySnapshot) -> CoreResult<Post> {
        let text = format!(
            "{}: {} has {} books left on his reading list. \
             He should finish them all by {}. {}",
            self.style.hashtag,
            self.style.reader_name,
            snapshot.num_remaining(),
            snapshot.stats().finish_date,
            self.style.list_url
        );
        Post::new(NUM_TO_GO_SUBJECT, NUM_TO_GO_SUBJECT, text, snapshot.timestamp())
    }

    fn fits(&self, post: &Post) -> bool {
        self.max_chars
            .map_or(true, |max| post.text().chars().count() <= max)
    }
}

/// Formats a count with comma thousands separators: `12345` -> `"12,345"`.
fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
