//! Warning tracking for feed anomalies.
//!
//! The merge core corrects or drops malformed slot updates without failing.
//! This tracker keeps a record of what was corrected so the feed can be
//! audited afterwards: warnings are categorized, deduplicated within a
//! window, capped in memory, and exportable as JSON or CSV.
//!
//! # Example
//!
//! ```
//! use depth_book_reconstructor::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_simple(WarningCategory::SlotOutOfRange, "slot 57 on NSE:SBIN-EQ bid");
//!
//! assert_eq!(tracker.summary().total, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::lob::{AnomalyKind, SlotAnomaly};
use crate::types::Side;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Slot index outside the depth capacity
    SlotOutOfRange,

    /// Price below zero
    NegativePrice,

    /// Zero-price update re-anchored to the slot's remembered price
    GhostQuantityCorrected,

    /// Zero-price update dropped for lack of a remembered price
    GhostQuantityDropped,

    /// Zero-price, zero-quantity update on a priced slot
    PriceRetained,

    /// Feed timestamp earlier than the book's last one
    TimestampRegression,

    /// Book slots were cleared (first update or snapshot policy)
    BookReset,

    /// Instrument removed by the registry's eviction policy
    TickerEvicted,

    /// Other/uncategorized warning
    Other,
}

impl WarningCategory {
    /// Get a stable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::SlotOutOfRange => "SLOT_OUT_OF_RANGE",
            WarningCategory::NegativePrice => "NEGATIVE_PRICE",
            WarningCategory::GhostQuantityCorrected => "GHOST_QUANTITY_CORRECTED",
            WarningCategory::GhostQuantityDropped => "GHOST_QUANTITY_DROPPED",
            WarningCategory::PriceRetained => "PRICE_RETAINED",
            WarningCategory::TimestampRegression => "TIMESTAMP_REGRESSION",
            WarningCategory::BookReset => "BOOK_RESET",
            WarningCategory::TickerEvicted => "TICKER_EVICTED",
            WarningCategory::Other => "OTHER",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::PriceRetained => 1,
            WarningCategory::BookReset => 1,
            WarningCategory::TickerEvicted => 1,
            WarningCategory::Other => 1,
            WarningCategory::GhostQuantityCorrected => 2,
            WarningCategory::TimestampRegression => 2,
            WarningCategory::SlotOutOfRange => 3,
            WarningCategory::NegativePrice => 3,
            WarningCategory::GhostQuantityDropped => 3,
        }
    }

    fn log_level(&self) -> log::Level {
        match self.severity() {
            3 => log::Level::Warn,
            2 => log::Level::Info,
            _ => log::Level::Debug,
        }
    }
}

impl From<AnomalyKind> for WarningCategory {
    fn from(kind: AnomalyKind) -> Self {
        match kind {
            AnomalyKind::SlotOutOfRange => WarningCategory::SlotOutOfRange,
            AnomalyKind::NegativePrice => WarningCategory::NegativePrice,
            AnomalyKind::GhostQuantityCorrected => WarningCategory::GhostQuantityCorrected,
            AnomalyKind::GhostQuantityDropped => WarningCategory::GhostQuantityDropped,
            AnomalyKind::PriceRetained => WarningCategory::PriceRetained,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID (auto-incremented)
    pub id: u64,

    pub category: WarningCategory,

    /// Human-readable message
    pub message: String,

    /// Instrument the warning concerns
    pub ticker: Option<String>,

    pub side: Option<Side>,

    /// Slot index as received (may be out of range)
    pub slot_index: Option<i64>,

    /// Price in ticks carried by the offending update
    pub price: Option<i64>,

    pub quantity: Option<u64>,

    /// Feed timestamp of the update, in feed units
    pub data_timestamp: Option<i64>,

    /// Wall clock time when the warning was recorded (nanoseconds since epoch)
    pub recorded_at: u64,

    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub context: HashMap<String, String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            ticker: None,
            side: None,
            slot_index: None,
            price: None,
            quantity: None,
            data_timestamp: None,
            recorded_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
            context: HashMap::new(),
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn with_slot(mut self, slot_index: i64) -> Self {
        self.slot_index = Some(slot_index);
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_quantity(mut self, quantity: u64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_data_timestamp(mut self, ts: i64) -> Self {
        self.data_timestamp = Some(ts);
        self
    }

    /// Add context key-value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total warnings recorded (deduplicated ones excluded)
    pub total: u64,

    /// Warnings suppressed by deduplication
    pub suppressed: u64,

    pub by_category: HashMap<String, u64>,

    pub by_severity: HashMap<u8, u64>,

    /// Number of distinct tickers involved
    pub unique_tickers: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings to keep in memory
    pub max_warnings: usize,

    /// Whether to emit recorded warnings through the `log` facade
    pub log_warnings: bool,

    /// Minimum severity to log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,

    /// Whether to deduplicate identical messages
    pub deduplicate: bool,

    /// Time window for deduplication (nanoseconds)
    pub dedupe_window_ns: u64,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_warnings: true,
            min_log_severity: 2,
            deduplicate: true,
            dedupe_window_ns: 1_000_000_000,
        }
    }
}

/// Categorized, capped store of feed warnings.
#[derive(Debug)]
pub struct WarningTracker {
    config: WarningTrackerConfig,
    warnings: Vec<Warning>,
    next_id: u64,
    category_counts: HashMap<WarningCategory, u64>,
    suppressed: u64,
    /// category -> (message hash, recorded_at) within the dedupe window
    recent: HashMap<WarningCategory, Vec<(u64, u64)>>,
    unique_tickers: HashSet<String>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: HashMap::new(),
            suppressed: 0,
            recent: HashMap::new(),
            unique_tickers: HashSet::new(),
        }
    }

    /// Allocate the next warning ID.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record a warning.
    ///
    /// Returns the warning ID if recorded, or None if deduplicated.
    pub fn record(&mut self, warning: Warning) -> Option<u64> {
        if self.config.deduplicate && self.is_duplicate(&warning) {
            self.suppressed += 1;
            return None;
        }

        if self.config.log_warnings && warning.category.severity() >= self.config.min_log_severity {
            log::log!(
                warning.category.log_level(),
                "[{}] {}: {}",
                warning.category.name(),
                warning.id,
                warning.message
            );
        }

        if let Some(ticker) = &warning.ticker {
            if !self.unique_tickers.contains(ticker) {
                self.unique_tickers.insert(ticker.clone());
            }
        }

        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        let id = warning.id;
        if self.warnings.len() < self.config.max_warnings {
            self.warnings.push(warning);
        }

        Some(id)
    }

    /// Count a warning without storing it.
    pub fn tally(&mut self, category: WarningCategory) {
        *self.category_counts.entry(category).or_insert(0) += 1;
    }

    /// Drop `ticker` from the unique-ticker set. Stored warnings are kept.
    pub fn forget_ticker(&mut self, ticker: &str) {
        self.unique_tickers.remove(ticker);
    }

    /// Record a warning with just category and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
    ) -> Option<u64> {
        let id = self.next_id();
        self.record(Warning::new(id, category, message))
    }

    /// Record a merge anomaly for `ticker`.
    pub fn record_anomaly(
        &mut self,
        ticker: &str,
        anomaly: &SlotAnomaly,
        data_timestamp: i64,
    ) -> Option<u64> {
        let id = self.next_id();
        let update = &anomaly.update;
        let message = format!(
            "{} {} slot {}: price={} qty={} (previous price {})",
            ticker,
            anomaly.side.name(),
            update.slot_index,
            update.price,
            update.quantity,
            anomaly.previous_price
        );
        let warning = Warning::new(id, anomaly.kind.into(), message)
            .with_ticker(ticker)
            .with_side(anomaly.side)
            .with_slot(update.slot_index)
            .with_price(update.price)
            .with_quantity(update.quantity)
            .with_data_timestamp(data_timestamp);
        self.record(warning)
    }

    /// Number of warnings held in memory.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Total recorded, including those past the retention cap.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Warnings concerning one ticker.
    pub fn warnings_for_ticker(&self, ticker: &str) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.ticker.as_deref() == Some(ticker))
            .collect()
    }

    pub fn summary(&self) -> WarningSummary {
        let mut by_category = HashMap::new();
        let mut by_severity = HashMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            suppressed: self.suppressed,
            by_category,
            by_severity,
            unique_tickers: self.unique_tickers.len() as u64,
        }
    }

    /// Export summary and warnings as one JSON document.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            summary: WarningSummary,
            warnings: &'a [Warning],
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(
            &mut writer,
            &Export {
                summary: self.summary(),
                warnings: &self.warnings,
            },
        )?;
        writer.flush()?;
        Ok(())
    }

    /// Export warnings to a CSV file.
    pub fn export_to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        fn opt<T: ToString>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_default()
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "id,category,severity,message,ticker,side,\
             slot_index,price,quantity,data_timestamp,recorded_at"
        )?;

        for w in &self.warnings {
            writeln!(
                writer,
                "{},{},{},{:?},{:?},{},{},{},{},{},{}",
                w.id,
                w.category.name(),
                w.category.severity(),
                w.message,
                w.ticker.as_deref().unwrap_or_default(),
                w.side.map(Side::name).unwrap_or_default(),
                opt(w.slot_index),
                opt(w.price),
                opt(w.quantity),
                opt(w.data_timestamp),
                w.recorded_at,
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings and counters.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.recent.clear();
        self.unique_tickers.clear();
        self.suppressed = 0;
    }

    fn is_duplicate(&mut self, warning: &Warning) -> bool {
        let hash = ahash::RandomState::with_seeds(1, 2, 3, 4).hash_one(&warning.message);
        let now = warning.recorded_at;
        let window = self.config.dedupe_window_ns;

        let recent = self.recent.entry(warning.category).or_default();
        recent.retain(|(_, ts)| now.saturating_sub(*ts) < window);

        if recent.iter().any(|(h, _)| *h == hash) {
            return true;
        }
        recent.push((hash, now));
        false
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
