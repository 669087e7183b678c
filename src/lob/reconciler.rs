//! Slot-batch reconciliation with anomaly correction.
//!
//! Feed deliveries are differential and carry transient zero-price
//! placeholders. The rules below keep a slot's last known price so that a
//! quantity revision never reads as an empty level:
//!
//! | update price | update qty | old price | result                               |
//! |--------------|------------|-----------|--------------------------------------|
//! | 0            | > 0        | > 0       | old price, new qty/orders (ghost)    |
//! | 0            | > 0        | 0         | dropped                              |
//! | 0            | 0          | > 0       | old price, qty 0, new orders         |
//! | 0            | 0          | 0         | slot cleared                         |
//! | > 0          | any        | any       | adopted verbatim                     |
//!
//! Indices outside `[0, MAX_SLOTS)` and negative prices are dropped.
//! Applying the same batch twice leaves the store as applying it once.

use super::level_store::LevelStore;
use crate::types::{Side, Slot, SlotUpdate};

/// What kind of malformed input a slot update carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// Slot index outside `[0, MAX_SLOTS)`
    SlotOutOfRange,
    /// Price below zero
    NegativePrice,
    /// Zero price with quantity, re-anchored to the remembered price
    GhostQuantityCorrected,
    /// Zero price with quantity and no remembered price to anchor to
    GhostQuantityDropped,
    /// Zero price and zero quantity on a priced slot; price kept
    PriceRetained,
}

impl AnomalyKind {
    /// True if the update was discarded rather than corrected.
    pub fn is_drop(self) -> bool {
        matches!(
            self,
            AnomalyKind::SlotOutOfRange
                | AnomalyKind::NegativePrice
                | AnomalyKind::GhostQuantityDropped
        )
    }
}

/// An anomaly observed while merging, reported to the caller's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAnomaly {
    pub kind: AnomalyKind,
    pub side: Side,
    pub update: SlotUpdate,
    /// Price held by the slot before the update (0 if out of range)
    pub previous_price: i64,
}

/// Outcome of reconciling one in-range update against its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    /// Normal overwrite
    Adopt(Slot),
    /// Written after correction
    Correct(Slot, AnomalyKind),
    /// Slot zeroed
    Clear,
    /// Update discarded, slot unchanged
    Drop(AnomalyKind),
}

/// Counters for one merge (or an accumulation of merges).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Updates received
    pub received: u64,
    /// Updates adopted verbatim
    pub adopted: u64,
    pub ghost_corrected: u64,
    pub ghost_dropped: u64,
    pub price_retained: u64,
    /// Slots zeroed by an all-zero update
    pub cleared: u64,
    pub out_of_range: u64,
    pub negative_price: u64,
    /// Bitmask of in-range slots the batch mentioned
    pub touched: u64,
}

impl MergeStats {
    /// Updates discarded without touching state.
    pub fn dropped(&self) -> u64 {
        self.out_of_range + self.negative_price + self.ghost_dropped
    }

    /// Updates written after correction.
    pub fn corrected(&self) -> u64 {
        self.ghost_corrected + self.price_retained
    }

    /// Total anomalies (corrected or dropped).
    pub fn anomalies(&self) -> u64 {
        self.dropped() + self.corrected()
    }

    /// Add another merge's counters into this one.
    pub fn absorb(&mut self, other: &MergeStats) {
        self.received += other.received;
        self.adopted += other.adopted;
        self.ghost_corrected += other.ghost_corrected;
        self.ghost_dropped += other.ghost_dropped;
        self.price_retained += other.price_retained;
        self.cleared += other.cleared;
        self.out_of_range += other.out_of_range;
        self.negative_price += other.negative_price;
        self.touched |= other.touched;
    }

    fn count(&mut self, kind: AnomalyKind) {
        match kind {
            AnomalyKind::SlotOutOfRange => self.out_of_range += 1,
            AnomalyKind::NegativePrice => self.negative_price += 1,
            AnomalyKind::GhostQuantityCorrected => self.ghost_corrected += 1,
            AnomalyKind::GhostQuantityDropped => self.ghost_dropped += 1,
            AnomalyKind::PriceRetained => self.price_retained += 1,
        }
    }
}

/// Decide what an in-range update does to `old`.
#[inline]
pub fn reconcile_slot(old: &Slot, update: &SlotUpdate) -> SlotResolution {
    if update.price < 0 {
        return SlotResolution::Drop(AnomalyKind::NegativePrice);
    }

    if update.price > 0 {
        return SlotResolution::Adopt(Slot {
            price: update.price,
            quantity: update.quantity,
            order_count: update.order_count,
            slot_index: old.slot_index,
        });
    }

    // update.price == 0 from here on
    if old.price > 0 {
        let kind = if update.quantity > 0 {
            AnomalyKind::GhostQuantityCorrected
        } else {
            AnomalyKind::PriceRetained
        };
        SlotResolution::Correct(
            Slot {
                price: old.price,
                quantity: update.quantity,
                order_count: update.order_count,
                slot_index: old.slot_index,
            },
            kind,
        )
    } else if update.quantity > 0 {
        SlotResolution::Drop(AnomalyKind::GhostQuantityDropped)
    } else {
        SlotResolution::Clear
    }
}

/// Merge a batch into `store`, returning counters.
#[inline]
pub fn merge_batch(store: &mut LevelStore, updates: &[SlotUpdate]) -> MergeStats {
    merge_batch_with(store, updates, |_| {})
}

/// Merge a batch into `store`, reporting each anomaly to `on_anomaly`.
///
/// Never fails: every update is adopted, corrected, or dropped.
pub fn merge_batch_with<F>(
    store: &mut LevelStore,
    updates: &[SlotUpdate],
    mut on_anomaly: F,
) -> MergeStats
where
    F: FnMut(SlotAnomaly),
{
    let side = store.side();
    let mut stats = MergeStats {
        received: updates.len() as u64,
        ..MergeStats::default()
    };

    for update in updates {
        let Some(idx) = update.slot() else {
            stats.count(AnomalyKind::SlotOutOfRange);
            on_anomaly(SlotAnomaly {
                kind: AnomalyKind::SlotOutOfRange,
                side,
                update: *update,
                previous_price: 0,
            });
            continue;
        };

        stats.touched |= 1u64 << idx;
        let old = store.slots()[idx];

        match reconcile_slot(&old, update) {
            SlotResolution::Adopt(slot) => {
                store.write(idx, slot);
                stats.adopted += 1;
            }
            SlotResolution::Clear => {
                store.write(idx, Slot::empty(idx));
                stats.cleared += 1;
            }
            SlotResolution::Correct(slot, kind) => {
                store.write(idx, slot);
                stats.count(kind);
                on_anomaly(SlotAnomaly {
                    kind,
                    side,
                    update: *update,
                    previous_price: old.price,
                });
            }
            SlotResolution::Drop(kind) => {
                stats.count(kind);
                on_anomaly(SlotAnomaly {
                    kind,
                    side,
                    update: *update,
                    previous_price: old.price,
                });
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_SLOTS;

    fn upd(slot: i64, price: i64, quantity: u64, orders: u32) -> SlotUpdate {
        SlotUpdate::new(slot, price, quantity, orders)
    }

    fn seeded(side: Side, slot: i64, price: i64, quantity: u64, orders: u32) -> LevelStore {
        let mut store = LevelStore::new(side);
        merge_batch(&mut store, &[upd(slot, price, quantity, orders)]);
        store
    }

    #[test]
    fn test_normal_overwrite() {
        let mut store = seeded(Side::Bid, 4, 10_000, 50, 3);
        let stats = merge_batch(&mut store, &[upd(4, 10_005, 70, 4)]);

        let slot = store.get(4).unwrap();
        assert_eq!((slot.price, slot.quantity, slot.order_count), (10_005, 70, 4));
        assert_eq!(stats.adopted, 1);
        assert_eq!(stats.anomalies(), 0);
    }

    #[test]
    fn test_ghost_quantity_corrected() {
        let mut store = seeded(Side::Bid, 0, 10_000, 50, 2);
        let stats = merge_batch(&mut store, &[upd(0, 0, 30, 1)]);

        let slot = store.get(0).unwrap();
        assert_eq!(slot.price, 10_000);
        assert_eq!(slot.quantity, 30);
        assert_eq!(slot.order_count, 1);
        assert_eq!(stats.ghost_corrected, 1);
    }

    #[test]
    fn test_ghost_quantity_dropped_without_anchor() {
        let mut store = LevelStore::new(Side::Ask);
        let stats = merge_batch(&mut store, &[upd(2, 0, 30, 1)]);

        assert!(store.get(2).unwrap().is_cleared());
        assert_eq!(stats.ghost_dropped, 1);
        assert_eq!(stats.dropped(), 1);
    }

    #[test]
    fn test_zero_quantity_zero_price_retains_price() {
        let mut store = seeded(Side::Ask, 1, 10_060, 80, 1);
        let stats = merge_batch(&mut store, &[upd(1, 0, 0, 0)]);

        let slot = store.get(1).unwrap();
        assert_eq!(slot.price, 10_060);
        assert_eq!(slot.quantity, 0);
        assert_eq!(slot.order_count, 0);
        assert_eq!(stats.price_retained, 1);
    }

    #[test]
    fn test_zero_quantity_new_price_adopted() {
        let mut store = seeded(Side::Ask, 1, 10_060, 80, 1);
        merge_batch(&mut store, &[upd(1, 10_070, 0, 0)]);

        let slot = store.get(1).unwrap();
        assert_eq!(slot.price, 10_070);
        assert_eq!(slot.quantity, 0);
        assert!(slot.is_active());
    }

    #[test]
    fn test_full_zero_on_untouched_slot() {
        let mut store = LevelStore::new(Side::Bid);
        let stats = merge_batch(&mut store, &[upd(1, 0, 0, 0)]);

        assert!(store.get(1).unwrap().is_cleared());
        assert_eq!(stats.cleared, 1);
        assert_eq!(stats.touched, 1 << 1);
    }

    #[test]
    fn test_out_of_range_and_negative_dropped() {
        let mut store = LevelStore::new(Side::Bid);
        let before = store.clone();
        let stats = merge_batch(
            &mut store,
            &[
                upd(MAX_SLOTS as i64, 10_000, 1, 1),
                upd(-1, 10_000, 1, 1),
                upd(3, -500, 1, 1),
            ],
        );

        assert_eq!(store, before);
        assert_eq!(stats.out_of_range, 2);
        assert_eq!(stats.negative_price, 1);
        assert_eq!(stats.touched, 1 << 3);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = [
            upd(0, 10_050, 100, 2),
            upd(1, 0, 40, 1),
            upd(2, 10_030, 0, 0),
            upd(3, 0, 0, 0),
            upd(60, 10_000, 5, 1),
        ];
        let mut once = seeded(Side::Bid, 1, 10_040, 10, 1);
        let mut twice = once.clone();

        merge_batch(&mut once, &batch);
        merge_batch(&mut twice, &batch);
        merge_batch(&mut twice, &batch);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_anomaly_sink_receives_context() {
        let mut store = seeded(Side::Ask, 5, 20_000, 10, 1);
        let mut seen = Vec::new();
        merge_batch_with(&mut store, &[upd(5, 0, 3, 1), upd(70, 1, 1, 1)], |a| {
            seen.push(a)
        });

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind, AnomalyKind::GhostQuantityCorrected);
        assert_eq!(seen[0].previous_price, 20_000);
        assert_eq!(seen[0].side, Side::Ask);
        assert_eq!(seen[1].kind, AnomalyKind::SlotOutOfRange);
        assert!(seen[1].kind.is_drop());
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = MergeStats::default();
        let a = MergeStats {
            received: 2,
            adopted: 1,
            ghost_dropped: 1,
            touched: 0b01,
            ..Default::default()
        };
        let b = MergeStats {
            received: 1,
            ghost_corrected: 1,
            touched: 0b10,
            ..Default::default()
        };
        total.absorb(&a);
        total.absorb(&b);

        assert_eq!(total.received, 3);
        assert_eq!(total.anomalies(), 2);
        assert_eq!(total.touched, 0b11);
    }
}
