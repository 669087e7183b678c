//! Per-instrument book state.

use super::level_store::LevelStore;
use crate::types::Side;

/// One instrument's slots and metadata.
///
/// Mutated only through the registry; readers get shared references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookState {
    ticker: String,
    pub(crate) bids: LevelStore,
    pub(crate) asks: LevelStore,
    pub(crate) total_bid_qty: u64,
    pub(crate) total_ask_qty: u64,
    /// Last feed timestamp, in feed units
    pub(crate) last_timestamp: Option<i64>,
    /// Last feed timestamp converted to epoch milliseconds
    pub(crate) last_timestamp_millis: Option<i64>,
    pub(crate) initialized: bool,
    pub(crate) updates_applied: u64,
}

impl BookState {
    /// Create an uninitialized book with every slot zeroed.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bids: LevelStore::new(Side::Bid),
            asks: LevelStore::new(Side::Ask),
            total_bid_qty: 0,
            total_ask_qty: 0,
            last_timestamp: None,
            last_timestamp_millis: None,
            initialized: false,
            updates_applied: 0,
        }
    }

    #[inline]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[inline]
    pub fn bids(&self) -> &LevelStore {
        &self.bids
    }

    #[inline]
    pub fn asks(&self) -> &LevelStore {
        &self.asks
    }

    /// Store for `side`.
    #[inline]
    pub fn side(&self, side: Side) -> &LevelStore {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline]
    pub(crate) fn side_mut(&mut self, side: Side) -> &mut LevelStore {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Aggregate bid quantity as last reported by the feed.
    #[inline]
    pub fn total_bid_qty(&self) -> u64 {
        self.total_bid_qty
    }

    /// Aggregate ask quantity as last reported by the feed.
    #[inline]
    pub fn total_ask_qty(&self) -> u64 {
        self.total_ask_qty
    }

    #[inline]
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    #[inline]
    pub fn last_timestamp_millis(&self) -> Option<i64> {
        self.last_timestamp_millis
    }

    /// True once the first update has been applied.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of updates merged into this book.
    #[inline]
    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }

    /// True if neither side has a priced slot.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Zero both sides. Only the registry's first-update path calls this.
    pub(crate) fn reset_levels(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lob::reconciler::merge_batch;
    use crate::types::SlotUpdate;

    #[test]
    fn test_new_book_state() {
        let book = BookState::new("NSE:SBIN-EQ");
        assert_eq!(book.ticker(), "NSE:SBIN-EQ");
        assert!(!book.is_initialized());
        assert!(book.is_empty());
        assert_eq!(book.last_timestamp(), None);
        assert_eq!(book.side(Side::Ask).side(), Side::Ask);
    }

    #[test]
    fn test_reset_levels() {
        let mut book = BookState::new("NSE:SBIN-EQ");
        merge_batch(book.side_mut(Side::Bid), &[SlotUpdate::new(0, 80_000, 10, 1)]);
        assert!(!book.is_empty());

        book.reset_levels();
        assert!(book.is_empty());
    }
}
