//! Multi-instrument example.
//!
//! Demonstrates one registry tracking several instruments, with a capacity
//! bound and the `ClearUnmentioned` snapshot policy.
//!
//! Run with: cargo run --example multi_symbol

use depth_book_reconstructor::{
    BookRegistry, DepthUpdate, RegistryConfig, SlotUpdate, SnapshotPolicy, ViewStatus,
};

fn snapshot(ticker: &str, ts: i64, bid: f64, ask: f64) -> DepthUpdate {
    let mut update = DepthUpdate::new(ticker, ts).with_totals(500, 500).snapshot(true);
    for slot in 0..5 {
        let step = slot as f64 * 0.05;
        update = update
            .bid(SlotUpdate::from_decimal(slot, bid - step, 100, 2))
            .ask(SlotUpdate::from_decimal(slot, ask + step, 100, 2));
    }
    update
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================================================");
    println!("Depth Book Reconstructor - Multi-Instrument Example");
    println!("=================================================================\n");

    let config = RegistryConfig::new()
        .with_snapshot_policy(SnapshotPolicy::ClearUnmentioned)
        .with_max_instruments(3);
    let mut registry = BookRegistry::with_config(config);
    println!("✓ Created registry (capacity 3, snapshots clear unmentioned slots)\n");

    println!("Ingesting snapshots...");
    registry.ingest(&snapshot("NSE:SBIN-EQ", 1, 812.35, 812.40));
    registry.ingest(&snapshot("NSE:INFY-EQ", 1, 1_602.10, 1_602.20));
    registry.ingest(&snapshot("NSE:NIFTY25JULFUT", 1, 25_210.00, 25_210.50));
    println!("  ✓ Tracking: {:?}\n", registry.tickers());

    // A two-level snapshot for SBIN clears its other three slots
    let report = registry.ingest(
        &DepthUpdate::new("NSE:SBIN-EQ", 2)
            .with_totals(150, 0)
            .snapshot(true)
            .bid(SlotUpdate::from_decimal(0, 812.40, 75, 1))
            .bid(SlotUpdate::from_decimal(1, 812.35, 75, 1)),
    );
    println!("SBIN partial snapshot cleared {} slots\n", report.cleared_unmentioned);

    // A fourth instrument evicts the least recently updated one
    let report = registry.ingest(&snapshot("NSE:TCS-EQ", 3, 3_410.00, 3_410.25));
    if let Some(evicted) = &report.evicted {
        println!("Adding NSE:TCS-EQ evicted {evicted}\n");
    }

    println!("=================================================================");
    println!("Current Books");
    println!("=================================================================\n");

    for ticker in ["NSE:SBIN-EQ", "NSE:INFY-EQ", "NSE:NIFTY25JULFUT", "NSE:TCS-EQ"] {
        match registry.query(ticker) {
            ViewStatus::Unseen => println!("{ticker}: not tracked\n"),
            ViewStatus::Empty(_) => println!("{ticker}: empty book\n"),
            ViewStatus::Ready(view) => {
                println!("{ticker}:");
                println!("  Levels: {} bids, {} asks", view.bids.len(), view.asks.len());
                if let Some(mid) = view.mid_price() {
                    println!("  Mid-price: {mid:.4}");
                }
                if let Some(spread_bps) = view.spread_bps() {
                    println!("  Spread (bps): {spread_bps:.2}");
                }
                println!();
            }
        }
    }

    println!("=================================================================");
    println!("Registry Statistics");
    println!("=================================================================\n");

    let stats = registry.stats();
    println!("Instruments: {}", stats.instruments);
    println!("Updates: {} ({} snapshots)", stats.updates, stats.snapshot_updates);
    println!("First-update resets: {}", stats.first_update_resets);
    println!("Slots cleared by snapshots: {}", stats.snapshot_clears);
    println!("Evictions: {}", stats.evictions);

    println!("\n✓ Multi-instrument example complete!");
}
