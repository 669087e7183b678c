//! Price-ordered views over a book's slots.
//!
//! A view is derived on demand and never stored. Building one reads the
//! book's slots, keeps those with a price, sorts them (bids descending, asks
//! ascending, ties by slot index), and ranks them from 0. The result carries
//! both a record list per side and parallel columnar arrays.
//!
//! # Example
//!
//! ```
//! use depth_book_reconstructor::{BookRegistry, DepthUpdate, SlotUpdate};
//!
//! let mut registry = BookRegistry::new();
//! registry.ingest(
//!     &DepthUpdate::new("NSE:SBIN-EQ", 1_700_000_000)
//!         .with_totals(100, 80)
//!         .bid(SlotUpdate::from_decimal(0, 100.50, 100, 2))
//!         .ask(SlotUpdate::from_decimal(0, 100.60, 80, 1)),
//! );
//!
//! let view = registry.get_view("NSE:SBIN-EQ").unwrap();
//! assert_eq!(view.bids[0].display_rank, 0);
//! assert!((view.spread().unwrap() - 0.10).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lob::{BookState, LevelStore};
use crate::types::{ticks_to_price, BookConsistency, Side, MAX_SLOTS};

/// One ranked level of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewLevel {
    /// Position after price sorting, starting at 0 for the best level
    pub display_rank: usize,
    pub price: f64,
    pub quantity: u64,
    pub order_count: u32,
    /// Exact price in ticks
    pub price_ticks: i64,
    /// Slot the level was read from
    pub slot_index: usize,
}

/// A bid/ask pair of columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidePair<T> {
    pub bids: T,
    pub asks: T,
}

/// Derived snapshot handed to the delivery layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedBookView {
    pub ticker: String,
    pub timestamp_millis: Option<i64>,
    pub total_bid_qty: u64,
    pub total_ask_qty: u64,
    /// Best (highest) bid first
    pub bids: Vec<ViewLevel>,
    /// Best (lowest) ask first
    pub asks: Vec<ViewLevel>,
    pub price_arrays: SidePair<Vec<f64>>,
    pub quantity_arrays: SidePair<Vec<u64>>,
    pub order_count_arrays: SidePair<Vec<u32>>,
}

/// Build a view of `book`. Pure: the book is only read.
pub fn build_view(book: &BookState) -> OrderedBookView {
    let bids = rank_side(book.bids());
    let asks = rank_side(book.asks());

    OrderedBookView {
        ticker: book.ticker().to_string(),
        timestamp_millis: book.last_timestamp_millis(),
        total_bid_qty: book.total_bid_qty(),
        total_ask_qty: book.total_ask_qty(),
        price_arrays: SidePair {
            bids: bids.iter().map(|l| l.price).collect(),
            asks: asks.iter().map(|l| l.price).collect(),
        },
        quantity_arrays: SidePair {
            bids: bids.iter().map(|l| l.quantity).collect(),
            asks: asks.iter().map(|l| l.quantity).collect(),
        },
        order_count_arrays: SidePair {
            bids: bids.iter().map(|l| l.order_count).collect(),
            asks: asks.iter().map(|l| l.order_count).collect(),
        },
        bids,
        asks,
    }
}

/// Rank the priced slots of one side.
fn rank_side(store: &LevelStore) -> Vec<ViewLevel> {
    let mut active: Vec<_> = store.active().copied().collect();

    // Explicit slot-index tie break; does not rely on sort stability
    match store.side() {
        Side::Bid => active.sort_unstable_by_key(|s| (std::cmp::Reverse(s.price), s.slot_index)),
        Side::Ask => active.sort_unstable_by_key(|s| (s.price, s.slot_index)),
    }
    active.truncate(MAX_SLOTS);

    active
        .into_iter()
        .enumerate()
        .map(|(rank, slot)| ViewLevel {
            display_rank: rank,
            price: ticks_to_price(slot.price),
            quantity: slot.quantity,
            order_count: slot.order_count,
            price_ticks: slot.price,
            slot_index: slot.slot_index,
        })
        .collect()
}

impl OrderedBookView {
    /// Levels for `side`, best first.
    pub fn levels(&self, side: Side) -> &[ViewLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// True when neither side has a level (thin or withdrawn liquidity).
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    #[inline]
    pub fn best_bid(&self) -> Option<&ViewLevel> {
        self.bids.first()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<&ViewLevel> {
        self.asks.first()
    }

    /// Crossed/locked classification of the top of book.
    pub fn consistency(&self) -> BookConsistency {
        BookConsistency::classify(
            self.best_bid().map(|l| l.price_ticks),
            self.best_ask().map(|l| l.price_ticks),
        )
    }

    /// Average of best bid and best ask.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ticks_to_price(bid.price_ticks + ask.price_ticks) / 2.0),
            _ => None,
        }
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ticks_to_price(ask.price_ticks - bid.price_ticks)),
            _ => None,
        }
    }

    /// Spread in basis points of the mid price.
    pub fn spread_bps(&self) -> Option<f64> {
        match (self.mid_price(), self.spread()) {
            (Some(mid), Some(spread)) if mid > 0.0 => Some((spread / mid) * 10_000.0),
            _ => None,
        }
    }

    /// True if the spread is wider than `threshold_bps`.
    pub fn spread_exceeds(&self, threshold_bps: f64) -> bool {
        self.spread_bps().is_some_and(|bps| bps > threshold_bps)
    }

    /// Normalized difference of the feed's aggregate totals, in [-1, 1].
    pub fn depth_imbalance(&self) -> Option<f64> {
        let bid = self.total_bid_qty as f64;
        let ask = self.total_ask_qty as f64;
        let total = bid + ask;
        if total > 0.0 {
            Some((bid - ask) / total)
        } else {
            None
        }
    }

    /// Level with the largest quantity on `side`; the better-ranked one wins ties.
    pub fn largest_level(&self, side: Side) -> Option<&ViewLevel> {
        self.levels(side).iter().rev().max_by_key(|l| l.quantity)
    }

    /// Serialize as the delivery payload.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
