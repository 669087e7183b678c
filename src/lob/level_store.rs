//! Fixed-capacity slot array for one side of one instrument.
//!
//! Slots are addressed directly by their exchange-assigned index; the store
//! never sorts. Ordering is the view builder's job.
//!
//! # Invariant
//!
//! `slots[i].slot_index == i` for every `i`. Writes go through
//! [`LevelStore::write`], which re-stamps the index.

use crate::types::{Side, Slot, MAX_SLOTS};

/// One side's depth slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStore {
    side: Side,
    slots: [Slot; MAX_SLOTS],
}

impl LevelStore {
    /// Create a store with every slot zeroed.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            slots: std::array::from_fn(Slot::empty),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Get a slot by index, `None` if out of range.
    #[inline]
    pub fn get(&self, slot_index: usize) -> Option<&Slot> {
        self.slots.get(slot_index)
    }

    /// All slots in index order.
    #[inline]
    pub fn slots(&self) -> &[Slot; MAX_SLOTS] {
        &self.slots
    }

    /// Slots carrying a price, in index order.
    pub fn active(&self) -> impl Iterator<Item = &Slot> + '_ {
        self.slots.iter().filter(|s| s.is_active())
    }

    /// Number of slots carrying a price.
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Sum of quantity over active slots.
    pub fn active_quantity(&self) -> u64 {
        self.active().map(|s| s.quantity).sum()
    }

    /// True if no slot carries a price.
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Overwrite one slot. Returns false (and writes nothing) if out of range.
    #[inline]
    pub(crate) fn write(&mut self, slot_index: usize, slot: Slot) -> bool {
        match self.slots.get_mut(slot_index) {
            Some(target) => {
                *target = Slot { slot_index, ..slot };
                true
            }
            None => false,
        }
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            *slot = Slot::empty(i);
        }
    }

    /// Zero every slot whose bit is not set in `keep_mask`.
    ///
    /// Returns the number of slots that held data and were cleared.
    pub fn clear_unmentioned(&mut self, keep_mask: u64) -> usize {
        let mut cleared = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if keep_mask & (1u64 << i) == 0 && !slot.is_cleared() {
                *slot = Slot::empty(i);
                cleared += 1;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(price: i64, quantity: u64) -> Slot {
        Slot {
            price,
            quantity,
            order_count: 1,
            slot_index: 0,
        }
    }

    #[test]
    fn test_new_store_is_zeroed() {
        let store = LevelStore::new(Side::Bid);
        assert_eq!(store.side(), Side::Bid);
        assert!(store.is_empty());
        for (i, slot) in store.slots().iter().enumerate() {
            assert!(slot.is_cleared());
            assert_eq!(slot.slot_index, i);
        }
    }

    #[test]
    fn test_write_stamps_index() {
        let mut store = LevelStore::new(Side::Ask);
        assert!(store.write(12, priced(10_000, 5)));

        let slot = store.get(12).unwrap();
        assert_eq!(slot.slot_index, 12);
        assert_eq!(slot.price, 10_000);
        assert_eq!(store.active_count(), 1);
        assert_eq!(store.active_quantity(), 5);
    }

    #[test]
    fn test_write_out_of_range() {
        let mut store = LevelStore::new(Side::Ask);
        assert!(!store.write(MAX_SLOTS, priced(10_000, 5)));
        assert!(store.get(MAX_SLOTS).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut store = LevelStore::new(Side::Bid);
        store.write(0, priced(10_000, 5));
        store.write(49, priced(9_900, 7));
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store, LevelStore::new(Side::Bid));
    }

    #[test]
    fn test_clear_unmentioned() {
        let mut store = LevelStore::new(Side::Bid);
        store.write(0, priced(10_000, 5));
        store.write(3, priced(9_990, 5));
        store.write(40, priced(9_900, 5));

        let cleared = store.clear_unmentioned(1 << 3);

        assert_eq!(cleared, 2);
        assert!(store.get(0).unwrap().is_cleared());
        assert!(store.get(3).unwrap().is_active());
        assert!(store.get(40).unwrap().is_cleared());
    }
}
