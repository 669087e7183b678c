//! Core data types for depth updates and slot storage.
//!
//! Prices are integer ticks of one hundredth. The feed publishes prices as
//! integers scaled by 100; keeping them as `i64` ticks gives exact
//! two-decimal arithmetic and a total order for sorting.

use serde::{Deserialize, Serialize};

/// Number of depth slots per side. Slot indices live in `[0, MAX_SLOTS)`.
pub const MAX_SLOTS: usize = 50;

/// Ticks per currency unit (two-decimal precision).
pub const PRICE_SCALE: i64 = 100;

/// Convert integer ticks to a decimal price.
#[inline]
pub fn ticks_to_price(ticks: i64) -> f64 {
    ticks as f64 / PRICE_SCALE as f64
}

/// Convert a decimal price to ticks, rounding to the nearest hundredth.
#[inline]
pub fn price_to_ticks(price: f64) -> i64 {
    (price * PRICE_SCALE as f64).round() as i64
}

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side
    Bid,
    /// Sell side
    Ask,
}

impl Side {
    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

/// One entry of a decoded side batch.
///
/// `slot_index` is signed so that out-of-range indices coming off the wire
/// (including negative ones) survive decoding and are discarded by the merge
/// rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdate {
    /// Exchange-assigned depth slot
    pub slot_index: i64,

    /// Price in ticks (hundredths)
    pub price: i64,

    /// Resting quantity at the level
    pub quantity: u64,

    /// Number of orders at the level
    pub order_count: u32,
}

impl SlotUpdate {
    /// Create a new slot update from tick-denominated fields.
    pub fn new(slot_index: i64, price: i64, quantity: u64, order_count: u32) -> Self {
        Self {
            slot_index,
            price,
            quantity,
            order_count,
        }
    }

    /// Create from a decimal price, rounding to two decimals.
    pub fn from_decimal(slot_index: i64, price: f64, quantity: u64, order_count: u32) -> Self {
        Self::new(slot_index, price_to_ticks(price), quantity, order_count)
    }

    /// Get price as a decimal.
    #[inline]
    pub fn price_as_f64(&self) -> f64 {
        ticks_to_price(self.price)
    }

    /// Slot index as an array position, if it is in range.
    #[inline]
    pub fn slot(&self) -> Option<usize> {
        usize::try_from(self.slot_index)
            .ok()
            .filter(|&idx| idx < MAX_SLOTS)
    }
}

/// A decoded depth message for one instrument.
///
/// This is the record the upstream decoder hands to the registry. Field
/// names serialize in camelCase to match the decoder's JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthUpdate {
    /// Instrument identifier (e.g. "NSE:NIFTY25JULFUT")
    pub ticker: String,

    /// Feed timestamp, in the unit configured on the registry
    pub timestamp_units: i64,

    /// Aggregate bid quantity reported by the feed
    pub total_bid_qty: u64,

    /// Aggregate ask quantity reported by the feed
    pub total_ask_qty: u64,

    /// Feed's snapshot flag
    #[serde(default)]
    pub is_snapshot: bool,

    #[serde(default)]
    pub bid_updates: Vec<SlotUpdate>,

    #[serde(default)]
    pub ask_updates: Vec<SlotUpdate>,
}

impl DepthUpdate {
    /// Create an update with empty side batches.
    pub fn new(ticker: impl Into<String>, timestamp_units: i64) -> Self {
        Self {
            ticker: ticker.into(),
            timestamp_units,
            total_bid_qty: 0,
            total_ask_qty: 0,
            is_snapshot: false,
            bid_updates: Vec::new(),
            ask_updates: Vec::new(),
        }
    }

    /// Set the aggregate totals.
    pub fn with_totals(mut self, total_bid_qty: u64, total_ask_qty: u64) -> Self {
        self.total_bid_qty = total_bid_qty;
        self.total_ask_qty = total_ask_qty;
        self
    }

    /// Set the snapshot flag.
    pub fn snapshot(mut self, is_snapshot: bool) -> Self {
        self.is_snapshot = is_snapshot;
        self
    }

    /// Append a bid slot update.
    pub fn bid(mut self, update: SlotUpdate) -> Self {
        self.bid_updates.push(update);
        self
    }

    /// Append an ask slot update.
    pub fn ask(mut self, update: SlotUpdate) -> Self {
        self.ask_updates.push(update);
        self
    }

    /// Side batch for `side`.
    pub fn updates(&self, side: Side) -> &[SlotUpdate] {
        match side {
            Side::Bid => &self.bid_updates,
            Side::Ask => &self.ask_updates,
        }
    }
}

/// A stored depth slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slot {
    /// Price in ticks; zero marks the slot empty for views
    pub price: i64,
    pub quantity: u64,
    pub order_count: u32,
    /// Position of this slot in its store (always `< MAX_SLOTS`)
    pub slot_index: usize,
}

impl Slot {
    /// A zeroed slot at `slot_index`.
    #[inline]
    pub const fn empty(slot_index: usize) -> Self {
        Self {
            price: 0,
            quantity: 0,
            order_count: 0,
            slot_index,
        }
    }

    /// True when the slot carries a price and is therefore visible.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.price > 0
    }

    /// True when every field except the index is zero.
    #[inline]
    pub fn is_cleared(&self) -> bool {
        self.price == 0 && self.quantity == 0 && self.order_count == 0
    }

    #[inline]
    pub fn price_as_f64(&self) -> f64 {
        ticks_to_price(self.price)
    }
}

/// Book consistency status derived from the best prices of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookConsistency {
    /// best_bid < best_ask
    Valid,
    /// No quotes on one or both sides
    Empty,
    /// best_bid == best_ask
    Locked,
    /// best_bid > best_ask
    Crossed,
}

impl BookConsistency {
    /// Classify a pair of best prices.
    #[inline]
    pub fn classify(best_bid: Option<i64>, best_ask: Option<i64>) -> Self {
        match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => {
                if bid < ask {
                    BookConsistency::Valid
                } else if bid == ask {
                    BookConsistency::Locked
                } else {
                    BookConsistency::Crossed
                }
            }
            _ => BookConsistency::Empty,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, BookConsistency::Valid)
    }

    #[inline]
    pub fn is_crossed(&self) -> bool {
        matches!(self, BookConsistency::Crossed)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(self, BookConsistency::Locked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, BookConsistency::Empty)
    }
}
