//! CLI tool for replaying a recorded depth feed through a book registry.
//!
//! Reads one JSON-encoded depth update per line, merges each into a
//! `BookRegistry`, and writes the resulting ordered views to stdout as
//! JSON lines.
//!
//! # Usage
//!
//! ```bash
//! # Replay a recording, printing every view
//! cargo run --release --bin replay_depth -- --input data/nse_depth_2025-07-14.jsonl
//!
//! # Only one instrument, every 100th update, from stdin
//! cat data/nse_depth.jsonl | cargo run --release --bin replay_depth -- \
//!     --ticker NSE:SBIN-EQ --every 100
//!
//! # Bounded registry, snapshot clearing, warnings exported at the end
//! cargo run --release --bin replay_depth -- \
//!     --input data/nse_depth.jsonl \
//!     --max-instruments 500 \
//!     --clear-unmentioned \
//!     --warnings-out warnings.json
//! ```

use std::env;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use depth_book_reconstructor::source::{JsonLinesSource, SourceMetadata, UpdateSource};
use depth_book_reconstructor::{
    BookError, BookRegistry, RegistryConfig, Result, SnapshotPolicy, TimestampUnit,
};

/// Command-line arguments
struct Args {
    /// Recording to replay; stdin when absent or "-"
    input: Option<PathBuf>,
    /// Only print views for this ticker
    ticker: Option<String>,
    /// Print every Nth view
    every: u64,
    max_instruments: Option<usize>,
    clear_unmentioned: bool,
    timestamp_unit: TimestampUnit,
    /// Where to export tracked warnings (.json or .csv)
    warnings_out: Option<PathBuf>,
    /// Skip printing views, only report the summary
    quiet: bool,
}

fn parse_args() -> std::result::Result<Args, String> {
    let args: Vec<String> = env::args().collect();

    let mut parsed = Args {
        input: None,
        ticker: None,
        every: 1,
        max_instruments: None,
        clear_unmentioned: false,
        timestamp_unit: TimestampUnit::Seconds,
        warnings_out: None,
        quiet: false,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };

        match flag {
            "--input" | "-i" => {
                let path = value()?;
                if path != "-" {
                    parsed.input = Some(PathBuf::from(path));
                }
            }
            "--ticker" | "-t" => parsed.ticker = Some(value()?),
            "--every" | "-e" => {
                let raw = value()?;
                parsed.every = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("--every expects a positive integer, got {raw}"))?;
            }
            "--max-instruments" => {
                let raw = value()?;
                parsed.max_instruments = Some(
                    raw.parse()
                        .map_err(|_| format!("--max-instruments expects an integer, got {raw}"))?,
                );
            }
            "--clear-unmentioned" => parsed.clear_unmentioned = true,
            "--timestamp-unit" => {
                let raw = value()?;
                parsed.timestamp_unit = TimestampUnit::parse(&raw)
                    .ok_or_else(|| format!("Unknown timestamp unit: {raw} (use s, ms, us or ns)"))?;
            }
            "--warnings-out" => parsed.warnings_out = Some(PathBuf::from(value()?)),
            "--quiet" | "-q" => parsed.quiet = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg => {
                if parsed.input.is_none() && !arg.starts_with('-') {
                    parsed.input = Some(PathBuf::from(arg));
                } else {
                    return Err(format!("Unknown argument: {arg}"));
                }
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn print_help() {
    eprintln!(
        r#"
Replay a Depth Feed Recording

Merges JSON-lines depth updates into per-instrument books and prints the
ordered view after each update.

USAGE:
    replay_depth [OPTIONS] [INPUT]

OPTIONS:
    -i, --input <PATH>           Recording to replay (default: stdin)
    -t, --ticker <TICKER>        Only print views for this ticker
    -e, --every <N>              Print every Nth view (default: 1)
        --max-instruments <N>    Evict the least recently updated book past N
        --clear-unmentioned      Snapshots clear slots they do not mention
        --timestamp-unit <UNIT>  Feed timestamp unit: s, ms, us, ns (default: s)
        --warnings-out <PATH>    Export feed warnings (.json or .csv)
    -q, --quiet                  Only print the summary
    -h, --help                   Print this help message

NOTES:
    - Views go to stdout, the summary and logs to stderr
    - Undecodable lines are logged and skipped
"#
    );
}

fn open_source(input: Option<&PathBuf>) -> Result<JsonLinesSource<Box<dyn BufRead>>> {
    match input {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(|e| {
                BookError::generic(format!("Failed to open {}: {e}", path.display()))
            })?;
            let reader: Box<dyn BufRead> = Box::new(BufReader::new(file));
            Ok(JsonLinesSource::new(reader).with_metadata(SourceMetadata::from_path(path)))
        }
        None => {
            let reader: Box<dyn BufRead> = Box::new(BufReader::new(io::stdin()));
            Ok(JsonLinesSource::new(reader)
                .with_metadata(SourceMetadata::new().with_provider("stdin")))
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = RegistryConfig::new().with_timestamp_unit(args.timestamp_unit);
    if args.clear_unmentioned {
        config = config.with_snapshot_policy(SnapshotPolicy::ClearUnmentioned);
    }
    if let Some(max) = args.max_instruments {
        config = config.with_max_instruments(max);
    }
    let mut registry = BookRegistry::try_with_config(config)?;

    let source = open_source(args.input.as_ref())?;
    if let Some(feed) = &source.metadata().feed {
        log::info!("Replaying feed {feed}");
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let start = Instant::now();
    let mut decode_errors = 0u64;
    let mut emitted = 0u64;
    let mut matched = 0u64;

    for result in source.updates()? {
        let update = match result {
            Ok(update) => update,
            Err(e) => {
                log::warn!("{e}");
                decode_errors += 1;
                continue;
            }
        };

        if args.quiet || args.ticker.as_deref().is_some_and(|t| t != update.ticker) {
            registry.ingest(&update);
            continue;
        }

        let (_, view) = registry.ingest_and_view(&update);
        matched += 1;
        if matched % args.every == 0 {
            writeln!(out, "{}", view.to_json()?)?;
            emitted += 1;
        }
    }
    out.flush()?;

    let stats = registry.stats();
    let elapsed = start.elapsed().as_secs_f64();
    log::info!(
        "Replayed {} updates for {} instruments in {:.2}s ({} views printed, {} undecodable lines)",
        stats.updates,
        stats.instruments,
        elapsed,
        emitted,
        decode_errors
    );
    log::info!(
        "Slot updates: {} received, {} corrected, {} dropped; \
         {} evictions, {} timestamp regressions",
        stats.merge.received,
        stats.merge.corrected(),
        stats.merge.dropped(),
        stats.evictions,
        stats.timestamp_regressions
    );

    if let (Some(path), Some(tracker)) = (&args.warnings_out, registry.warnings()) {
        let is_csv = path.extension().is_some_and(|e| e == "csv");
        if is_csv {
            tracker.export_to_csv(path)?;
        } else {
            tracker.export_to_file(path)?;
        }
        log::info!("Exported {} warnings to {}", tracker.len(), path.display());
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
