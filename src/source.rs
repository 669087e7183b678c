//! Depth update source abstraction for replay and testing.
//!
//! This module provides a trait-based abstraction over recorded depth feeds,
//! so the registry can be driven from memory, a file, or any other store
//! without changes.
//!
//! # Design Goals
//!
//! - **Feed Agnostic**: the decoder upstream of this crate owns the wire format
//! - **Iterator-Based**: simple streaming interface
//! - **Metadata Support**: access to source information (feed, date, path)
//!
//! # Example
//!
//! ```
//! use depth_book_reconstructor::source::{JsonLinesSource, UpdateSource};
//! use depth_book_reconstructor::BookRegistry;
//!
//! let data = r#"{"ticker":"NSE:SBIN-EQ","timestampUnits":1,"totalBidQty":10,"totalAskQty":0,"isSnapshot":true,"bidUpdates":[{"slotIndex":0,"price":80005,"quantity":10,"orderCount":1}]}"#;
//!
//! let mut registry = BookRegistry::new();
//! for update in JsonLinesSource::new(data.as_bytes()).updates().unwrap() {
//!     registry.ingest(&update.unwrap());
//! }
//! assert_eq!(registry.len(), 1);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::{BookError, Result};
use crate::types::DepthUpdate;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about an update source.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Feed or session name (e.g., "nse_depth")
    pub feed: Option<String>,

    /// Trading date in YYYY-MM-DD format
    pub date: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Provider name (e.g., "memory", "jsonl")
    pub provider: Option<String>,

    /// Estimated update count (for progress tracking)
    pub estimated_updates: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = Some(feed.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_estimated_updates(mut self, count: u64) -> Self {
        self.estimated_updates = Some(count);
        self
    }

    /// Extract metadata from a file path.
    ///
    /// Parses feed name and date from recording names:
    /// - `nse_depth_2025-07-14.jsonl` → feed="nse_depth", date="2025-07-14"
    /// - `nse_depth.jsonl` → feed="nse_depth"
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }

        if let Some(stem) = path.file_stem().and_then(|n| n.to_str()) {
            // Date suffix: FEED_YYYY-MM-DD
            let dated = stem.rsplit_once('_').filter(|(_, date)| is_date(date));
            match dated {
                Some((feed, date)) => {
                    metadata.feed = Some(feed.to_string());
                    metadata.date = Some(date.to_string());
                }
                None => metadata.feed = Some(stem.to_string()),
            }
        }

        metadata
    }
}

fn is_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

// ============================================================================
// Update Source Trait
// ============================================================================

/// Trait for depth update sources.
///
/// - `updates()` consumes `self` to allow single-pass iteration
/// - Items are `Result` so a bad record can be skipped or stop the replay
/// - Metadata should be populated before calling `updates()`
pub trait UpdateSource {
    /// The iterator type for updates.
    type UpdateIter: Iterator<Item = Result<DepthUpdate>>;

    /// Consume the source and return an iterator over updates.
    fn updates(self) -> Result<Self::UpdateIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// A simple in-memory source.
///
/// # Example
///
/// ```
/// use depth_book_reconstructor::source::{UpdateSource, VecSource, SourceMetadata};
/// use depth_book_reconstructor::DepthUpdate;
///
/// let source = VecSource::new(vec![
///     DepthUpdate::new("AAA", 1),
///     DepthUpdate::new("BBB", 1),
/// ])
/// .with_metadata(SourceMetadata::new().with_feed("test"));
///
/// assert_eq!(source.updates().unwrap().count(), 2);
/// ```
pub struct VecSource {
    updates: Vec<DepthUpdate>,
    metadata: SourceMetadata,
}

impl VecSource {
    pub fn new(updates: Vec<DepthUpdate>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_updates(updates.len() as u64),
            updates,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

type WrapFn = fn(DepthUpdate) -> Result<DepthUpdate>;

impl UpdateSource for VecSource {
    type UpdateIter = std::iter::Map<std::vec::IntoIter<DepthUpdate>, WrapFn>;

    fn updates(self) -> Result<Self::UpdateIter> {
        Ok(self.updates.into_iter().map(Ok as WrapFn))
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// JSON Lines Source
// ============================================================================

/// Source reading one JSON-encoded [`DepthUpdate`] per line.
///
/// Blank lines and lines starting with `#` are skipped. A line that fails to
/// parse yields [`BookError::Decode`] with its 1-based line number; iteration
/// continues after it.
pub struct JsonLinesSource<R> {
    reader: R,
    metadata: SourceMetadata,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            metadata: SourceMetadata::new().with_provider("jsonl"),
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a recording on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BookError::generic(format!("Failed to open {}: {e}", path.display()))
        })?;
        log::info!("Opened depth recording {}", path.display());

        let mut metadata = SourceMetadata::from_path(path);
        metadata.provider = Some("jsonl".to_string());
        Ok(Self::new(BufReader::new(file)).with_metadata(metadata))
    }
}

impl<R: BufRead> UpdateSource for JsonLinesSource<R> {
    type UpdateIter = JsonLinesIter<R>;

    fn updates(self) -> Result<Self::UpdateIter> {
        Ok(JsonLinesIter {
            lines: self.reader.lines(),
            line: 0,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator returned by [`JsonLinesSource::updates`].
pub struct JsonLinesIter<R> {
    lines: Lines<R>,
    line: u64,
}

impl<R: BufRead> Iterator for JsonLinesIter<R> {
    type Item = Result<DepthUpdate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;

            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return Some(
                serde_json::from_str(trimmed).map_err(|e| BookError::Decode {
                    line: self.line,
                    reason: e.to_string(),
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_path() {
        let metadata = SourceMetadata::from_path("/tmp/nse_depth_2025-07-14.jsonl");
        assert_eq!(metadata.feed.as_deref(), Some("nse_depth"));
        assert_eq!(metadata.date.as_deref(), Some("2025-07-14"));

        let metadata = SourceMetadata::from_path("capture.jsonl");
        assert_eq!(metadata.feed.as_deref(), Some("capture"));
        assert_eq!(metadata.date, None);
    }

    #[test]
    fn test_vec_source() {
        let source = VecSource::new(vec![DepthUpdate::new("AAA", 1)]);
        assert_eq!(source.metadata().provider.as_deref(), Some("memory"));
        assert_eq!(source.metadata().estimated_updates, Some(1));

        let updates: Vec<_> = source.updates().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(updates[0].ticker, "AAA");
    }

    #[test]
    fn test_json_lines_skips_blank_and_comments() {
        let data = concat!(
            "# recorded 2025-07-14\n",
            "\n",
            r#"{"ticker":"AAA","timestampUnits":5,"totalBidQty":1,"totalAskQty":2}"#,
            "\n",
        );
        let updates: Vec<_> = JsonLinesSource::new(data.as_bytes())
            .updates()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].timestamp_units, 5);
        assert!(!updates[0].is_snapshot);
        assert!(updates[0].bid_updates.is_empty());
    }

    #[test]
    fn test_json_lines_decode_error_keeps_going() {
        let data = concat!(
            r#"{"ticker":"AAA","timestampUnits":1,"totalBidQty":0,"totalAskQty":0}"#,
            "\nnot json\n",
            r#"{"ticker":"BBB","timestampUnits":2,"totalBidQty":0,"totalAskQty":0}"#,
            "\n",
        );
        let results: Vec<_> = JsonLinesSource::new(data.as_bytes())
            .updates()
            .unwrap()
            .collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(BookError::Decode { line: 2, .. })));
        assert_eq!(results[2].as_ref().unwrap().ticker, "BBB");
    }

    #[test]
    fn test_open_missing_file() {
        assert!(JsonLinesSource::open("/nonexistent/depth.jsonl").is_err());
    }
}
