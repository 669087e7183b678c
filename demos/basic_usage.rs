//! Basic usage example for depth book reconstruction.
//!
//! Feeds a few depth updates for one instrument, including a ghost quantity
//! and an out-of-range slot, and prints the ordered views.
//!
//! Run with: cargo run --example basic_usage

use depth_book_reconstructor::{BookRegistry, DepthUpdate, OrderedBookView, SlotUpdate};

fn print_view(view: &OrderedBookView) {
    println!("  {:>6} {:>10} {:>8}  |  {:>10} {:>8}", "rank", "bid", "qty", "ask", "qty");
    let depth = view.bids.len().max(view.asks.len());
    for rank in 0..depth {
        let bid = view.bids.get(rank);
        let ask = view.asks.get(rank);
        println!(
            "  {:>6} {:>10} {:>8}  |  {:>10} {:>8}",
            rank,
            bid.map(|l| format!("{:.2}", l.price)).unwrap_or_default(),
            bid.map(|l| l.quantity.to_string()).unwrap_or_default(),
            ask.map(|l| format!("{:.2}", l.price)).unwrap_or_default(),
            ask.map(|l| l.quantity.to_string()).unwrap_or_default(),
        );
    }
    if let Some(spread_bps) = view.spread_bps() {
        println!("  Spread: {spread_bps:.2} bps ({:?})", view.consistency());
    }
    println!();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    println!("=================================================================");
    println!("Depth Book Reconstructor - Basic Usage");
    println!("=================================================================\n");

    let mut registry = BookRegistry::new();
    let ticker = "NSE:SBIN-EQ";

    // First update: the book is reset, then populated
    println!("1. Initial snapshot");
    registry.ingest(
        &DepthUpdate::new(ticker, 1_752_470_000)
            .with_totals(600, 420)
            .snapshot(true)
            .bid(SlotUpdate::from_decimal(0, 812.35, 100, 3))
            .bid(SlotUpdate::from_decimal(1, 812.30, 250, 6))
            .bid(SlotUpdate::from_decimal(2, 812.25, 250, 2))
            .ask(SlotUpdate::from_decimal(0, 812.40, 120, 2))
            .ask(SlotUpdate::from_decimal(1, 812.45, 300, 5)),
    );
    print_view(&registry.get_view(ticker).unwrap());

    // Slot 0 arrives with no price: the old price is kept
    println!("2. Ghost quantity on bid slot 0, bad slot index on the ask side");
    let report = registry.ingest(
        &DepthUpdate::new(ticker, 1_752_470_001)
            .with_totals(680, 420)
            .bid(SlotUpdate::new(0, 0, 180, 4))
            .ask(SlotUpdate::new(75, 81_250, 10, 1)),
    );
    println!(
        "  corrected: {}, dropped: {}",
        report.bids.corrected() + report.asks.corrected(),
        report.dropped()
    );
    print_view(&registry.get_view(ticker).unwrap());

    // Snapshot flag after initialization does not clear slot 2
    println!("3. Later snapshot touching only slot 0");
    registry.ingest(
        &DepthUpdate::new(ticker, 1_752_470_002)
            .with_totals(680, 420)
            .snapshot(true)
            .bid(SlotUpdate::from_decimal(0, 812.40, 50, 1)),
    );
    let view = registry.get_view(ticker).unwrap();
    print_view(&view);

    println!("Columnar form:");
    println!("  bid prices: {:?}", view.price_arrays.bids);
    println!("  bid sizes:  {:?}", view.quantity_arrays.bids);

    if let Some(tracker) = registry.warnings() {
        println!("\nWarnings recorded: {}", tracker.len());
        for warning in tracker.warnings() {
            println!("  [{}] {}", warning.category.name(), warning.message);
        }
    }

    println!("\n✓ Basic usage example complete!");
}
