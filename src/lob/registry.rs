//! Per-instrument book registry.
//!
//! The registry owns one [`BookState`] per ticker, creates it lazily on the
//! first update, and applies the only full reset an instrument ever gets on
//! that first update. It is an explicit object owned by the host; dropping
//! it (or calling [`BookRegistry::clear`]) is the teardown.
//!
//! Every mutation takes `&mut self`, so updates for a ticker are applied in
//! call order by construction. Hosts sharing a registry across threads wrap
//! it in a mutex; [`BookRegistry::ingest_and_view`] is the merge-then-view
//! pair to run under that lock.
//!
//! # Example
//!
//! ```
//! use depth_book_reconstructor::{BookRegistry, DepthUpdate, SlotUpdate, ViewStatus};
//!
//! let mut registry = BookRegistry::new();
//! assert!(matches!(registry.query("NSE:SBIN-EQ"), ViewStatus::Unseen));
//!
//! let report = registry.ingest(
//!     &DepthUpdate::new("NSE:SBIN-EQ", 1_700_000_000)
//!         .with_totals(100, 0)
//!         .snapshot(true)
//!         .bid(SlotUpdate::from_decimal(0, 800.05, 100, 3)),
//! );
//! assert!(report.first_update);
//! assert!(registry.query("NSE:SBIN-EQ").is_ready());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::book_state::BookState;
use super::reconciler::{merge_batch_with, MergeStats, SlotAnomaly};
use crate::error::{BookError, Result};
use crate::types::{DepthUpdate, Side, SlotUpdate};
use crate::view::{build_view, OrderedBookView};
use crate::warnings::{Warning, WarningCategory, WarningTracker, WarningTrackerConfig};

/// What a snapshot-flagged update does after an instrument is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapshotPolicy {
    /// The flag is informational; only the first update resets (default)
    #[default]
    ResetOnFirstOnly,

    /// Slots the snapshot does not mention are zeroed after the merge
    ClearUnmentioned,
}

/// Unit of the feed's timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimestampUnit {
    /// Epoch seconds (default)
    #[default]
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl TimestampUnit {
    /// Convert a feed timestamp to epoch milliseconds.
    #[inline]
    pub fn to_millis(self, value: i64) -> i64 {
        match self {
            TimestampUnit::Seconds => value.saturating_mul(1_000),
            TimestampUnit::Millis => value,
            TimestampUnit::Micros => value / 1_000,
            TimestampUnit::Nanos => value / 1_000_000,
        }
    }

    /// Parse a unit name (`s`, `ms`, `us`, `ns` or the long forms).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Some(TimestampUnit::Seconds),
            "ms" | "millis" => Some(TimestampUnit::Millis),
            "us" | "micros" => Some(TimestampUnit::Micros),
            "ns" | "nanos" => Some(TimestampUnit::Nanos),
            _ => None,
        }
    }
}

/// Configuration for registry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub snapshot_policy: SnapshotPolicy,

    pub timestamp_unit: TimestampUnit,

    /// Capacity before least-recently-updated eviction; `None` is unbounded
    pub max_instruments: Option<usize>,

    /// Whether to keep a warning tracker of feed anomalies
    pub track_warnings: bool,

    /// Whether to log a line for updates that carried anomalies
    pub log_anomalies: bool,

    pub warnings: WarningTrackerConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            snapshot_policy: SnapshotPolicy::ResetOnFirstOnly,
            timestamp_unit: TimestampUnit::Seconds,
            max_instruments: None,
            track_warnings: true,
            log_anomalies: true,
            // The registry logs per-update summaries; per-warning lines would repeat them
            warnings: WarningTrackerConfig {
                log_warnings: false,
                ..WarningTrackerConfig::default()
            },
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_snapshot_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }

    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }

    /// Bound the registry; the least recently updated ticker is evicted.
    pub fn with_max_instruments(mut self, max: usize) -> Self {
        self.max_instruments = Some(max);
        self
    }

    /// Enable/disable the warning tracker.
    pub fn with_warnings(mut self, track: bool) -> Self {
        self.track_warnings = track;
        self
    }

    /// Enable/disable anomaly log lines.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_anomalies = log;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_instruments == Some(0) {
            return Err(BookError::InvalidConfig(
                "max_instruments must be at least 1".into(),
            ));
        }
        if self.warnings.min_log_severity > 3 {
            return Err(BookError::InvalidConfig(format!(
                "min_log_severity {} exceeds the highest severity (3)",
                self.warnings.min_log_severity
            )));
        }
        Ok(())
    }
}

/// What one ingest did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// The instrument's slots were reset before this merge
    pub first_update: bool,
    pub bids: MergeStats,
    pub asks: MergeStats,
    /// Slots zeroed by `SnapshotPolicy::ClearUnmentioned`
    pub cleared_unmentioned: usize,
    /// Feed timestamp was older than the book's previous one
    pub timestamp_regressed: bool,
    /// Ticker evicted to make room for this one
    pub evicted: Option<String>,
}

impl IngestReport {
    /// Anomalies across both sides.
    pub fn anomalies(&self) -> u64 {
        self.bids.anomalies() + self.asks.anomalies()
    }

    /// Updates dropped across both sides.
    pub fn dropped(&self) -> u64 {
        self.bids.dropped() + self.asks.dropped()
    }
}

/// Registry-wide counters.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Tickers currently tracked
    pub instruments: usize,

    /// Updates ingested
    pub updates: u64,

    /// Updates carrying the snapshot flag
    pub snapshot_updates: u64,

    /// First-update resets performed
    pub first_update_resets: u64,

    /// Slots zeroed by the `ClearUnmentioned` policy
    pub snapshot_clears: u64,

    pub evictions: u64,

    pub timestamp_regressions: u64,

    /// Merge counters summed over both sides of every update
    pub merge: MergeStats,
}

/// Result of looking a ticker up for delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewStatus {
    /// Ticker never seen (or evicted)
    Unseen,
    /// Ticker known, but neither side has a level
    Empty(OrderedBookView),
    Ready(OrderedBookView),
}

impl ViewStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewStatus::Ready(_))
    }

    pub fn is_unseen(&self) -> bool {
        matches!(self, ViewStatus::Unseen)
    }

    /// The view, if the ticker is known.
    pub fn into_view(self) -> Option<OrderedBookView> {
        match self {
            ViewStatus::Unseen => None,
            ViewStatus::Empty(view) | ViewStatus::Ready(view) => Some(view),
        }
    }
}

/// Ticker → book map with lazy creation and first-update reset.
#[derive(Debug)]
pub struct BookRegistry {
    config: RegistryConfig,

    /// Books in recency order when eviction is enabled (oldest first)
    books: IndexMap<String, BookState, ahash::RandomState>,

    stats: RegistryStats,

    warnings: Option<WarningTracker>,
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BookRegistry {
    /// Create a registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration.
    ///
    /// A `max_instruments` of zero behaves as one; use
    /// [`BookRegistry::try_with_config`] to reject it instead.
    pub fn with_config(config: RegistryConfig) -> Self {
        let warnings = config
            .track_warnings
            .then(|| WarningTracker::with_config(config.warnings.clone()));
        Self {
            config,
            books: IndexMap::default(),
            stats: RegistryStats::default(),
            warnings,
        }
    }

    /// Create a registry after validating `config`.
    pub fn try_with_config(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Ingest a decoded depth record.
    #[inline]
    pub fn ingest(&mut self, update: &DepthUpdate) -> IngestReport {
        self.ingest_update(
            &update.ticker,
            &update.bid_updates,
            &update.ask_updates,
            update.total_bid_qty,
            update.total_ask_qty,
            update.timestamp_units,
            update.is_snapshot,
        )
    }

    /// Merge one instrument's side batches and metadata.
    ///
    /// 1. Unseen ticker: a zeroed, uninitialized book is created.
    /// 2. First update: both sides are cleared before merging.
    /// 3. Both batches are merged. After initialization the snapshot flag
    ///    only matters under [`SnapshotPolicy::ClearUnmentioned`].
    /// 4. Totals and timestamp are stored and the book is marked initialized.
    ///
    /// Malformed slot updates are corrected or dropped; this never fails.
    #[allow(clippy::too_many_arguments)]
    pub fn ingest_update(
        &mut self,
        ticker: &str,
        bid_updates: &[SlotUpdate],
        ask_updates: &[SlotUpdate],
        total_bid_qty: u64,
        total_ask_qty: u64,
        timestamp: i64,
        is_snapshot: bool,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        if !self.books.contains_key(ticker) {
            report.evicted = self.make_room();
            self.books.insert(ticker.to_string(), BookState::new(ticker));
            self.stats.instruments = self.books.len();
            log::debug!("Tracking new instrument {ticker}");
        } else if self.config.max_instruments.is_some() {
            self.touch(ticker);
        }

        let Some(book) = self.books.get_mut(ticker) else {
            return report;
        };

        let warnings = &mut self.warnings;
        let stats = &mut self.stats;
        let config = &self.config;

        report.first_update = !book.initialized;
        if report.first_update {
            book.reset_levels();
            stats.first_update_resets += 1;
            match warnings.as_mut() {
                // Bounded registries only count resets
                Some(tracker) if config.max_instruments.is_some() => {
                    tracker.tally(WarningCategory::BookReset);
                }
                Some(tracker) => {
                    let id = tracker.next_id();
                    let message = format!("first update for {ticker}");
                    tracker.record(
                        Warning::new(id, WarningCategory::BookReset, message)
                            .with_ticker(ticker)
                            .with_data_timestamp(timestamp)
                            .with_context("snapshot", is_snapshot.to_string()),
                    );
                }
                None => {}
            }
        }

        if let Some(previous) = book.last_timestamp {
            if timestamp < previous {
                report.timestamp_regressed = true;
                stats.timestamp_regressions += 1;
                log::warn!("{ticker}: timestamp went backwards ({previous} -> {timestamp})");
                if let Some(tracker) = warnings.as_mut() {
                    let id = tracker.next_id();
                    tracker.record(
                        Warning::new(
                            id,
                            WarningCategory::TimestampRegression,
                            format!("{ticker}: {previous} -> {timestamp}"),
                        )
                        .with_ticker(ticker)
                        .with_data_timestamp(timestamp),
                    );
                }
            }
        }

        let mut sink = |anomaly: SlotAnomaly| {
            if let Some(tracker) = warnings.as_mut() {
                tracker.record_anomaly(ticker, &anomaly, timestamp);
            }
        };
        report.bids = merge_batch_with(book.side_mut(Side::Bid), bid_updates, &mut sink);
        report.asks = merge_batch_with(book.side_mut(Side::Ask), ask_updates, &mut sink);

        if is_snapshot
            && !report.first_update
            && config.snapshot_policy == SnapshotPolicy::ClearUnmentioned
        {
            report.cleared_unmentioned = book.bids.clear_unmentioned(report.bids.touched)
                + book.asks.clear_unmentioned(report.asks.touched);
            stats.snapshot_clears += report.cleared_unmentioned as u64;
            if report.cleared_unmentioned > 0 {
                log::debug!(
                    "{ticker}: snapshot cleared {} unmentioned slots",
                    report.cleared_unmentioned
                );
            }
        }

        book.total_bid_qty = total_bid_qty;
        book.total_ask_qty = total_ask_qty;
        book.last_timestamp = Some(timestamp);
        book.last_timestamp_millis = Some(config.timestamp_unit.to_millis(timestamp));
        book.initialized = true;
        book.updates_applied += 1;

        stats.updates += 1;
        if is_snapshot {
            stats.snapshot_updates += 1;
        }
        stats.merge.absorb(&report.bids);
        stats.merge.absorb(&report.asks);

        if config.log_anomalies && report.anomalies() > 0 {
            if report.dropped() > 0 {
                log::warn!(
                    "{ticker}: dropped {} malformed slot updates, corrected {}",
                    report.dropped(),
                    report.anomalies() - report.dropped()
                );
            } else {
                log::debug!("{ticker}: corrected {} slot updates", report.anomalies());
            }
        }

        report
    }

    /// Ingest, then build the view without releasing the borrow in between.
    pub fn ingest_and_view(&mut self, update: &DepthUpdate) -> (IngestReport, OrderedBookView) {
        let report = self.ingest(update);
        // `ingest` always leaves the ticker in the map
        let view = self
            .get_view(&update.ticker)
            .unwrap_or_else(|| build_view(&BookState::new(update.ticker.as_str())));
        (report, view)
    }

    /// Ordered view of `ticker`, or `None` if it is unseen.
    pub fn get_view(&self, ticker: &str) -> Option<OrderedBookView> {
        self.books.get(ticker).map(build_view)
    }

    /// Look a ticker up, distinguishing unseen, empty and ready books.
    pub fn query(&self, ticker: &str) -> ViewStatus {
        match self.get_view(ticker) {
            None => ViewStatus::Unseen,
            Some(view) if view.is_empty() => ViewStatus::Empty(view),
            Some(view) => ViewStatus::Ready(view),
        }
    }

    /// Book for `ticker`.
    pub fn book(&self, ticker: &str) -> Option<&BookState> {
        self.books.get(ticker)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.books.contains_key(ticker)
    }

    /// Tracked tickers; least recently updated first when eviction is enabled.
    pub fn tickers(&self) -> Vec<&str> {
        self.books.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Stop tracking `ticker`, returning its final state.
    pub fn remove(&mut self, ticker: &str) -> Result<BookState> {
        let book = self
            .books
            .shift_remove(ticker)
            .ok_or_else(|| BookError::TickerNotFound(ticker.to_string()))?;
        self.stats.instruments = self.books.len();
        Ok(book)
    }

    /// Drop books whose last update is older than `cutoff_millis`.
    ///
    /// Returns the evicted tickers.
    pub fn evict_idle(&mut self, cutoff_millis: i64) -> Vec<String> {
        let idle: Vec<String> = self
            .books
            .iter()
            .filter(|(_, book)| book.last_timestamp_millis.is_some_and(|ts| ts < cutoff_millis))
            .map(|(ticker, _)| ticker.clone())
            .collect();

        for ticker in &idle {
            self.books.shift_remove(ticker.as_str());
            self.note_eviction(ticker);
        }
        self.stats.instruments = self.books.len();
        idle
    }

    /// Drop every book. Counters are kept.
    pub fn clear(&mut self) {
        self.books.clear();
        self.stats.instruments = 0;
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Warning tracker, if enabled.
    pub fn warnings(&self) -> Option<&WarningTracker> {
        self.warnings.as_ref()
    }

    /// Move `ticker` to the most-recent end.
    fn touch(&mut self, ticker: &str) {
        if let Some(index) = self.books.get_index_of(ticker) {
            let last = self.books.len() - 1;
            if index != last {
                self.books.move_index(index, last);
            }
        }
    }

    /// Evict the least recently updated book if at capacity.
    fn make_room(&mut self) -> Option<String> {
        let max = self.config.max_instruments?.max(1);
        if self.books.len() < max {
            return None;
        }
        let (ticker, _) = self.books.shift_remove_index(0)?;
        self.note_eviction(&ticker);
        Some(ticker)
    }

    fn note_eviction(&mut self, ticker: &str) {
        self.stats.evictions += 1;
        log::debug!("Evicted instrument {ticker}");
        if let Some(tracker) = self.warnings.as_mut() {
            tracker.tally(WarningCategory::TickerEvicted);
            tracker.forget_ticker(ticker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_SLOTS;

    fn quiet() -> RegistryConfig {
        RegistryConfig::default().with_logging(false)
    }

    fn upd(slot: i64, price: i64, quantity: u64, orders: u32) -> SlotUpdate {
        SlotUpdate::new(slot, price, quantity, orders)
    }

    #[test]
    fn test_new_registry() {
        let registry = BookRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get_view("X").is_none());
        assert!(registry.query("X").is_unseen());
    }

    #[test]
    fn test_lazy_creation_and_initialization() {
        let mut registry = BookRegistry::with_config(quiet());
        let report = registry.ingest_update("AAA", &[upd(0, 10_000, 5, 1)], &[], 5, 0, 10, false);

        assert!(report.first_update);
        let book = registry.book("AAA").unwrap();
        assert!(book.is_initialized());
        assert_eq!(book.updates_applied(), 1);
        assert_eq!(book.total_bid_qty(), 5);
        assert_eq!(book.last_timestamp(), Some(10));
        assert_eq!(book.last_timestamp_millis(), Some(10_000));
    }

    #[test]
    fn test_snapshot_after_init_does_not_reset() {
        let mut registry = BookRegistry::with_config(quiet());
        let bids = [upd(0, 10_000, 5, 1), upd(1, 9_990, 7, 1)];
        registry.ingest_update("AAA", &bids, &[], 12, 0, 1, true);

        let report = registry.ingest_update("AAA", &[upd(0, 10_005, 3, 1)], &[], 10, 0, 2, true);

        assert!(!report.first_update);
        assert_eq!(report.cleared_unmentioned, 0);
        let view = registry.get_view("AAA").unwrap();
        assert_eq!(view.bids.len(), 2);
        assert_eq!(view.bids[1].price_ticks, 9_990);
    }

    #[test]
    fn test_clear_unmentioned_policy() {
        let config = quiet().with_snapshot_policy(SnapshotPolicy::ClearUnmentioned);
        let mut registry = BookRegistry::with_config(config);
        registry.ingest_update(
            "AAA",
            &[upd(0, 10_000, 5, 1), upd(1, 9_990, 7, 1)],
            &[upd(0, 10_010, 4, 1)],
            12,
            4,
            1,
            true,
        );

        // Incremental update leaves unmentioned slots alone
        registry.ingest_update("AAA", &[upd(0, 10_001, 5, 1)], &[], 12, 4, 2, false);
        assert_eq!(registry.get_view("AAA").unwrap().bids.len(), 2);

        // Snapshot clears everything it does not mention
        let report = registry.ingest_update("AAA", &[upd(1, 9_995, 9, 2)], &[], 9, 0, 3, true);
        assert_eq!(report.cleared_unmentioned, 2);

        let view = registry.get_view("AAA").unwrap();
        assert_eq!(view.bids.len(), 1);
        assert_eq!(view.bids[0].price_ticks, 9_995);
        assert!(view.asks.is_empty());
        assert_eq!(registry.stats().snapshot_clears, 2);
    }

    #[test]
    fn test_query_empty_book() {
        let mut registry = BookRegistry::with_config(quiet());
        registry.ingest_update("THIN", &[upd(1, 0, 0, 0)], &[upd(60, 10, 1, 1)], 0, 0, 1, true);

        match registry.query("THIN") {
            ViewStatus::Empty(view) => assert_eq!(view.ticker, "THIN"),
            other => panic!("expected empty book, got {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_regression_is_applied_and_reported() {
        let mut registry = BookRegistry::with_config(quiet());
        registry.ingest_update("AAA", &[upd(0, 10_000, 5, 1)], &[], 5, 0, 100, false);
        let report = registry.ingest_update("AAA", &[upd(0, 10_000, 6, 1)], &[], 6, 0, 90, false);

        assert!(report.timestamp_regressed);
        assert_eq!(registry.book("AAA").unwrap().last_timestamp(), Some(90));
        assert_eq!(registry.stats().timestamp_regressions, 1);
        let tracker = registry.warnings().unwrap();
        assert_eq!(tracker.count_by_category(WarningCategory::TimestampRegression), 1);
    }

    #[test]
    fn test_anomalies_reach_tracker() {
        let mut registry = BookRegistry::with_config(quiet());
        registry.ingest_update("AAA", &[upd(0, 10_000, 5, 1)], &[], 5, 0, 1, false);
        let report = registry.ingest_update(
            "AAA",
            &[upd(0, 0, 3, 1), upd(MAX_SLOTS as i64, 10_000, 1, 1)],
            &[upd(2, 0, 9, 1)],
            3,
            0,
            2,
            false,
        );

        assert_eq!(report.anomalies(), 3);
        assert_eq!(report.dropped(), 2);

        let tracker = registry.warnings().unwrap();
        assert_eq!(tracker.count_by_category(WarningCategory::GhostQuantityCorrected), 1);
        assert_eq!(tracker.count_by_category(WarningCategory::SlotOutOfRange), 1);
        assert_eq!(tracker.count_by_category(WarningCategory::GhostQuantityDropped), 1);
        assert_eq!(tracker.count_by_category(WarningCategory::BookReset), 1);
        assert_eq!(registry.stats().merge.anomalies(), 3);
    }

    #[test]
    fn test_warnings_disabled() {
        let mut registry = BookRegistry::with_config(quiet().with_warnings(false));
        registry.ingest_update("AAA", &[upd(70, 10_000, 5, 1)], &[], 5, 0, 1, false);
        assert!(registry.warnings().is_none());
        assert_eq!(registry.stats().merge.out_of_range, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut registry = BookRegistry::with_config(quiet().with_max_instruments(2));
        registry.ingest_update("AAA", &[upd(0, 100, 1, 1)], &[], 1, 0, 1, true);
        registry.ingest_update("BBB", &[upd(0, 200, 1, 1)], &[], 1, 0, 2, true);
        // Touch AAA so BBB becomes least recently updated
        registry.ingest_update("AAA", &[upd(0, 101, 1, 1)], &[], 1, 0, 3, false);

        let report = registry.ingest_update("CCC", &[upd(0, 300, 1, 1)], &[], 1, 0, 4, true);

        assert_eq!(report.evicted.as_deref(), Some("BBB"));
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains("BBB"));
        assert_eq!(registry.tickers(), vec!["AAA", "CCC"]);
        assert_eq!(registry.stats().evictions, 1);
    }

    #[test]
    fn test_evicted_ticker_starts_a_new_lifetime() {
        let mut registry = BookRegistry::with_config(quiet().with_max_instruments(1));
        registry.ingest_update("AAA", &[upd(0, 100, 1, 1), upd(1, 99, 1, 1)], &[], 2, 0, 1, true);
        registry.ingest_update("BBB", &[upd(0, 200, 1, 1)], &[], 1, 0, 2, true);

        let report = registry.ingest_update("AAA", &[upd(0, 100, 1, 1)], &[], 1, 0, 3, false);

        assert!(report.first_update);
        assert_eq!(registry.get_view("AAA").unwrap().bids.len(), 1);
    }

    #[test]
    fn test_bounded_registry_keeps_tracker_bounded() {
        let mut config = quiet().with_max_instruments(1);
        config.warnings.max_warnings = 100;
        let mut registry = BookRegistry::with_config(config);

        // Every ticker is new and carries one out-of-range slot
        let bids = [upd(0, 100, 1, 1), upd(99, 100, 1, 1)];
        for i in 0..5_000i64 {
            registry.ingest_update(&format!("SYM{i}"), &bids, &[], 1, 0, i, true);
        }

        let tracker = registry.warnings().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(tracker.len(), 100);
        assert_eq!(tracker.summary().unique_tickers, 1);
        assert_eq!(tracker.count_by_category(WarningCategory::BookReset), 5_000);
        assert_eq!(tracker.count_by_category(WarningCategory::TickerEvicted), 4_999);
        assert_eq!(tracker.count_by_category(WarningCategory::SlotOutOfRange), 5_000);
        assert!(tracker
            .warnings()
            .iter()
            .all(|w| w.category == WarningCategory::SlotOutOfRange));
    }

    #[test]
    fn test_evict_idle() {
        let config = quiet().with_timestamp_unit(TimestampUnit::Millis);
        let mut registry = BookRegistry::with_config(config);
        registry.ingest_update("OLD", &[upd(0, 100, 1, 1)], &[], 1, 0, 1_000, false);
        registry.ingest_update("NEW", &[upd(0, 100, 1, 1)], &[], 1, 0, 5_000, false);

        let evicted = registry.evict_idle(2_000);

        assert_eq!(evicted, vec!["OLD".to_string()]);
        assert_eq!(registry.tickers(), vec!["NEW"]);
        assert_eq!(registry.stats().instruments, 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = BookRegistry::with_config(quiet());
        registry.ingest_update("AAA", &[upd(0, 100, 1, 1)], &[], 1, 0, 1, false);
        registry.ingest_update("BBB", &[upd(0, 100, 1, 1)], &[], 1, 0, 1, false);

        let book = registry.remove("AAA").unwrap();
        assert_eq!(book.ticker(), "AAA");
        assert!(matches!(registry.remove("AAA"), Err(BookError::TickerNotFound(_))));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stats().updates, 2);
    }

    #[test]
    fn test_ingest_and_view() {
        let mut registry = BookRegistry::with_config(quiet());
        let update = DepthUpdate::new("AAA", 7)
            .with_totals(5, 4)
            .bid(upd(0, 10_000, 5, 1))
            .ask(upd(0, 10_010, 4, 1));

        let (report, view) = registry.ingest_and_view(&update);

        assert!(report.first_update);
        assert_eq!(view.timestamp_millis, Some(7_000));
        assert_eq!(view.total_ask_qty, 4);
        assert_eq!(Some(view), registry.get_view("AAA"));
    }

    #[test]
    fn test_stats_counts() {
        let mut registry = BookRegistry::with_config(quiet());
        registry.ingest(&DepthUpdate::new("AAA", 1).snapshot(true));
        registry.ingest(&DepthUpdate::new("AAA", 2));
        registry.ingest(&DepthUpdate::new("BBB", 2).snapshot(true));

        let stats = registry.stats();
        assert_eq!(stats.instruments, 2);
        assert_eq!(stats.updates, 3);
        assert_eq!(stats.snapshot_updates, 2);
        assert_eq!(stats.first_update_resets, 2);
    }

    #[test]
    fn test_timestamp_units() {
        assert_eq!(TimestampUnit::Seconds.to_millis(2), 2_000);
        assert_eq!(TimestampUnit::Micros.to_millis(2_500_000), 2_500);
        assert_eq!(TimestampUnit::Nanos.to_millis(3_000_000), 3);
        assert_eq!(TimestampUnit::parse("MS"), Some(TimestampUnit::Millis));
        assert_eq!(TimestampUnit::parse("fortnights"), None);
    }

    #[test]
    fn test_config_builder_and_validation() {
        let config = RegistryConfig::new()
            .with_snapshot_policy(SnapshotPolicy::ClearUnmentioned)
            .with_max_instruments(10)
            .with_warnings(false)
            .with_logging(false);

        assert_eq!(config.snapshot_policy, SnapshotPolicy::ClearUnmentioned);
        assert_eq!(config.max_instruments, Some(10));
        assert!(config.validate().is_ok());

        let bad = RegistryConfig::new().with_max_instruments(0);
        assert!(matches!(bad.validate(), Err(BookError::InvalidConfig(_))));
        assert!(BookRegistry::try_with_config(bad).is_err());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "snapshot_policy": "ClearUnmentioned",
            "timestamp_unit": "Millis",
            "max_instruments": 500
        }"#;
        let config = RegistryConfig::from_json(json).unwrap();

        assert_eq!(config.snapshot_policy, SnapshotPolicy::ClearUnmentioned);
        assert_eq!(config.timestamp_unit, TimestampUnit::Millis);
        assert_eq!(config.max_instruments, Some(500));
        assert!(config.track_warnings);

        assert!(RegistryConfig::from_json(r#"{"max_instruments": 0}"#).is_err());
    }
}
