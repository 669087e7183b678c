//! # Depth-Book-Reconstructor
//!
//! Reconstructs per-instrument depth books from a level-slot market depth feed.
//!
//! The feed reports each side of an instrument's book as up to
//! [`MAX_SLOTS`] positional slots. Updates are partial and occasionally
//! malformed: a slot may arrive with a zero price but a live quantity
//! ("ghost" quantity). This library keeps the authoritative per-slot state,
//! merges each update under a small set of reconciliation rules, and
//! produces price-ordered views for delivery to subscribers.
//!
//! ## Features
//!
//! - **Slot Reconciliation**: ghost quantity corrected against the slot's
//!   previous price, out-of-range and negative-price updates dropped
//! - **Reset Once**: a book is cleared only on its first update; later
//!   snapshot flags are informational unless [`SnapshotPolicy::ClearUnmentioned`]
//!   is configured
//! - **Ordered Views**: best-first levels plus columnar price/quantity/order arrays
//! - **Bounded Registries**: optional least-recently-updated eviction
//! - **Warning Tracking**: every corrected or dropped slot update is recorded
//!
//! ## Quick Start
//!
//! ```rust
//! use depth_book_reconstructor::{BookRegistry, DepthUpdate, SlotUpdate};
//!
//! let mut registry = BookRegistry::new();
//!
//! registry.ingest(
//!     &DepthUpdate::new("NSE:SBIN-EQ", 1_700_000_000)
//!         .with_totals(300, 250)
//!         .snapshot(true)
//!         .bid(SlotUpdate::from_decimal(0, 800.05, 100, 3))
//!         .bid(SlotUpdate::from_decimal(1, 800.00, 200, 5))
//!         .ask(SlotUpdate::from_decimal(0, 800.10, 250, 4)),
//! );
//!
//! // A later update with the price missing keeps the slot's old price
//! registry.ingest(
//!     &DepthUpdate::new("NSE:SBIN-EQ", 1_700_000_001)
//!         .with_totals(350, 250)
//!         .bid(SlotUpdate::new(0, 0, 150, 4)),
//! );
//!
//! let view = registry.get_view("NSE:SBIN-EQ").unwrap();
//! assert_eq!(view.bids[0].price, 800.05);
//! assert_eq!(view.bids[0].quantity, 150);
//! assert_eq!(view.price_arrays.bids, vec![800.05, 800.00]);
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Feed types: `SlotUpdate`, `DepthUpdate`, `Slot`, `Side`, `MAX_SLOTS` |
//! | [`lob`] | Reconstruction: `LevelStore`, reconciler, `BookState`, `BookRegistry` |
//! | [`view`] | Ordered views: `OrderedBookView`, `ViewLevel`, `build_view` |
//! | [`source`] | Feed sources: `UpdateSource`, `VecSource`, `JsonLinesSource` |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |

pub mod error;
pub mod lob;
pub mod source;
pub mod types;
pub mod view;
pub mod warnings;

// Re-exports - Core types
pub use error::{BookError, Result};
pub use types::{
    price_to_ticks, ticks_to_price, BookConsistency, DepthUpdate, Side, Slot, SlotUpdate,
    MAX_SLOTS, PRICE_SCALE,
};

// Re-exports - Reconstruction
pub use lob::{
    merge_batch, merge_batch_with, reconcile_slot, AnomalyKind, BookRegistry, BookState,
    IngestReport, LevelStore, MergeStats, RegistryConfig, RegistryStats, SlotAnomaly,
    SlotResolution, SnapshotPolicy, TimestampUnit, ViewStatus,
};

// Re-exports - Views
pub use view::{build_view, OrderedBookView, SidePair, ViewLevel};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};

// Re-exports - Source abstraction
pub use source::{JsonLinesSource, SourceMetadata, UpdateSource, VecSource};
