//! Depth book reconstruction module.
//!
//! Slot storage, the reconciliation rules that merge feed batches into it,
//! and the per-instrument registry that owns the books.

mod book_state;
mod level_store;
pub mod reconciler;
pub mod registry;

pub use book_state::BookState;
pub use level_store::LevelStore;
pub use reconciler::{
    merge_batch, merge_batch_with, reconcile_slot, AnomalyKind, MergeStats, SlotAnomaly,
    SlotResolution,
};
pub use registry::{
    BookRegistry, IngestReport, RegistryConfig, RegistryStats, SnapshotPolicy, TimestampUnit,
    ViewStatus,
};
