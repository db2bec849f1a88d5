//! crates/readerbot_core/src/domain.rs
//!
//! Defines the pure, core data structures of the bot.
//! These structs are independent of any database, spreadsheet or wire format.

use crate::error::{CoreError, CoreResult};

//=========================================================================================
// Post
//=========================================================================================

/// One published (or candidate) update.
///
/// `subject` says *what* was posted (a book title, or a fixed category such as
/// `page_rate`), `variant` refines it (a progress label). Posts are immutable
/// once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    subject: String,
    variant: String,
    text: String,
    timestamp: i64,
}

impl Post {
    pub fn new(
        subject: impl Into<String>,
        variant: impl Into<String>,
        text: impl Into<String>,
        timestamp: i64,
    ) -> CoreResult<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(CoreError::InvalidPost("message text is empty".to_string()));
        }
        Ok(Self {
            subject: subject.into(),
            variant: variant.into(),
            text,
            timestamp,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Two posts are duplicates when subject and variant match; text and time are ignored.
    pub fn is_duplicate(&self, other: &Post) -> bool {
        self.subject == other.subject && self.variant == other.variant
    }
}

//=========================================================================================
// Book
//=========================================================================================

/// How far into a book the reader is, in seven ordered buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProgressLabel {
    NotYetReading,
    JustStarting,
    AQuarterThrough,
    HalfwayDoneWith,
    ThreeQuartersInto,
    AlmostDoneWith,
    DoneWith,
}

impl ProgressLabel {
    /// Buckets a `pages_read / pages_total` ratio.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.0 {
            ProgressLabel::NotYetReading
        } else if ratio < 0.125 {
            ProgressLabel::JustStarting
        } else if ratio < 0.375 {
            ProgressLabel::AQuarterThrough
        } else if ratio < 0.625 {
            ProgressLabel::HalfwayDoneWith
        } else if ratio < 0.875 {
            ProgressLabel::ThreeQuartersInto
        } else if ratio < 1.0 {
            ProgressLabel::AlmostDoneWith
        } else {
            ProgressLabel::DoneWith
        }
    }

    /// Fills in the blank: "Brian is ____ [book title]."
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressLabel::NotYetReading => "not yet reading",
            ProgressLabel::JustStarting => "just starting",
            ProgressLabel::AQuarterThrough => "a quarter through",
            ProgressLabel::HalfwayDoneWith => "halfway done with",
            ProgressLabel::ThreeQuartersInto => "three-quarters into",
            ProgressLabel::AlmostDoneWith => "almost done with",
            ProgressLabel::DoneWith => "done with",
        }
    }
}

impl std::fmt::Display for ProgressLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One book from the reading list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    title: String,
    pages_total: u64,
    pages_read: u64,
}

impl Book {
    pub fn new(title: impl Into<String>, pages_total: u64, pages_read: u64) -> CoreResult<Self> {
        let title = title.into();
        if pages_read > pages_total {
            return Err(CoreError::MalformedData(format!(
                "Mismatch in read and total pages for '{}': {} vs. {}",
                title, pages_read, pages_total
            )));
        }
        Ok(Self {
            title,
            pages_total,
            pages_read,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages_total(&self) -> u64 {
        self.pages_total
    }

    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    pub fn pages_to_go(&self) -> u64 {
        self.pages_total - self.pages_read
    }

    pub fn done(&self) -> bool {
        self.pages_read == self.pages_total
    }

    /// Started but not finished.
    pub fn in_progress(&self) -> bool {
        self.pages_read > 0 && !self.done()
    }

    pub fn progress_label(&self) -> ProgressLabel {
        // An empty book is trivially finished.
        if self.pages_total == 0 {
            return ProgressLabel::DoneWith;
        }
        ProgressLabel::from_ratio(self.pages_read as f64 / self.pages_total as f64)
    }
}

//=========================================================================================
// Library Snapshot
//=========================================================================================

/// Aggregate statistics computed by the reading-list spreadsheet itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStats {
    pub pages_total: u64,
    pub pages_read: u64,
    pub elapsed_days: u64,
    pub page_rate: f64,
    pub days_left: f64,
    pub years_left: f64,
    pub finish_date: String,
}

/// Point-in-time capture of the reading list. Built fresh for each decision cycle.
#[derive(Debug, Clone)]
pub struct LibrarySnapshot {
    books: Vec<Book>,
    stats: LibraryStats,
    timestamp: i64,
}

/// Rows that precede the book list proper: one header row plus seven rows
/// carrying an aggregate statistic in column E.
const AGGREGATE_ROWS: usize = 8;
const AGGREGATE_COLUMN: usize = 4;

impl LibrarySnapshot {
    pub fn new(books: Vec<Book>, stats: LibraryStats, timestamp: i64) -> Self {
        Self {
            books,
            stats,
            timestamp,
        }
    }

    /// Parses the spreadsheet export, one `Vec<String>` per row.
    ///
    /// Row 0 is a header. Rows 1 through 7 carry, in column E, the total pages,
    /// pages read, elapsed days, page rate, days left, years left and projected
    /// finish date. Every row from 1 on is also a book: title, total pages, read pages.
    pub fn from_rows(rows: &[Vec<String>], timestamp: i64) -> CoreResult<Self> {
        if rows.len() < AGGREGATE_ROWS {
            return Err(CoreError::MalformedData(format!(
                "expected at least {} rows, found {}",
                AGGREGATE_ROWS,
                rows.len()
            )));
        }

        let stats = LibraryStats {
            pages_total: parse_count(aggregate_cell(rows, 1)?)?,
            pages_read: parse_count(aggregate_cell(rows, 2)?)?,
            elapsed_days: parse_count(aggregate_cell(rows, 3)?)?,
            page_rate: parse_decimal(aggregate_cell(rows, 4)?)?,
            days_left: parse_decimal(aggregate_cell(rows, 5)?)?,
            years_left: parse_decimal(aggregate_cell(rows, 6)?)?,
            finish_date: aggregate_cell(rows, 7)?.to_string(),
        };

        let mut books = Vec::with_capacity(rows.len() - 1);
        for (index, row) in rows.iter().enumerate().skip(1) {
            // Trailing blank lines in the export are not books.
            if index >= AGGREGATE_ROWS && row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            books.push(book_from_row(row)?);
        }

        Ok(Self::new(books, stats, timestamp))
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn stats(&self) -> &LibraryStats {
        &self.stats
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn in_progress(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| b.in_progress()).collect()
    }

    pub fn num_done(&self) -> usize {
        self.books.iter().filter(|b| b.done()).count()
    }

    pub fn num_remaining(&self) -> usize {
        self.books.len() - self.num_done()
    }

    /// Pages read summed over the individual books.
    pub fn pages_read(&self) -> u64 {
        self.books.iter().map(Book::pages_read).sum()
    }
}

fn aggregate_cell(rows: &[Vec<String>], row: usize) -> CoreResult<&str> {
    rows[row]
        .get(AGGREGATE_COLUMN)
        .map(|cell| cell.trim())
        .ok_or_else(|| CoreError::MalformedData(format!("row {} has no aggregate column", row)))
}

fn book_from_row(row: &[String]) -> CoreResult<Book> {
    if row.len() < 3 {
        return Err(CoreError::MalformedData(format!("Invalid row: {:?}", row)));
    }
    Book::new(row[0].clone(), parse_count(&row[1])?, parse_count(&row[2])?)
}

/// Parses a non-negative integer that may carry thousands separators ("1,234").
fn parse_count(cell: &str) -> CoreResult<u64> {
    cell.trim()
        .replace(',', "")
        .parse::<u64>()
        .map_err(|_| CoreError::MalformedData(format!("'{}' is not a page or day count", cell)))
}

fn parse_decimal(cell: &str) -> CoreResult<f64> {
    let value = cell
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| CoreError::MalformedData(format!("'{}' is not a number", cell)))?;
    if !value.is_finite() {
        return Err(CoreError::MalformedData(format!("'{}' is not finite", cell)));
    }
    Ok(value)
}
