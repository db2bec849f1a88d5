//! services/readerbot/src/adapters/sheet.rs
//!
//! This module contains the reading list adapter. It downloads the
//! spreadsheet's CSV export and implements the `SnapshotSource` port.

use async_trait::async_trait;
use readerbot_core::{CoreError, LibrarySnapshot, PortError, PortResult, SnapshotSource};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SnapshotSource` port over a CSV export URL.
#[derive(Clone)]
pub struct SheetSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl SheetSnapshotSource {
    /// Creates a new `SheetSnapshotSource`.
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

//=========================================================================================
// `SnapshotSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl SnapshotSource for SheetSnapshotSource {
    async fn fetch_library_snapshot(&self, timestamp: i64) -> PortResult<LibrarySnapshot> {
        debug!("Fetching reading list from {}", self.url);
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PortError::SourceUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| PortError::SourceUnavailable(e.to_string()))?;

        snapshot_from_csv(&body, timestamp)
    }
}

/// Parses a CSV export body into a snapshot.
pub fn snapshot_from_csv(body: &str, timestamp: i64) -> PortResult<LibrarySnapshot> {
    let rows = parse_csv(body);
    LibrarySnapshot::from_rows(&rows, timestamp).map_err(|e| match e {
        CoreError::MalformedData(msg) => PortError::MalformedData(msg),
        other => PortError::MalformedData(other.to_string()),
    })
}

/// Splits a CSV body into records of fields. Handles double-quoted fields
/// (which may contain commas and line breaks), `""` escapes and CRLF endings.
/// A blank line yields a record with no fields, keeping row positions aligned
/// with the sheet.
fn parse_csv(body: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut in_record = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut field)),
            ('\r', false) if chars.peek() == Some(&'\n') => continue,
            ('\n', false) => {
                if in_record {
                    fields.push(std::mem::take(&mut field));
                }
                rows.push(std::mem::take(&mut fields));
                in_record = false;
                continue;
            }
            _ => field.push(c),
        }
        in_record = true;
    }
    if in_record {
        fields.push(field);
        rows.push(fields);
    }
    rows
}
