//! Metro Fare Engine CLI
//!
//! Command-line interface for replaying metro card events from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- events.csv > cards.csv
//! cargo run -- --stations 32 events.csv > cards.csv
//! cargo run -- --role admin events.csv > cards.csv
//! ```
//!
//! The program seeds a station registry, reads card events from the input CSV
//! file, replays them through the fare settlement engine (events for different
//! cards run concurrently), and writes the final card states to stdout.
//!
//! Malformed or rejected events are logged and skipped; they never abort the
//! replay. Log verbosity is controlled with `RUST_LOG`.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, output failure, etc.)

use std::process;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use metro_fare_engine::cli;
use metro_fare_engine::io::{write_cards_csv, Event, EventReader};
use metro_fare_engine::replay::ReplayProcessor;
use metro_fare_engine::store::{
    InMemoryCardStore, InMemoryHistoryStore, InMemoryStationRegistry, StationRegistry,
};
use metro_fare_engine::types::{FareError, Station};
use metro_fare_engine::FareEngine;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), FareError> {
    let cards = Arc::new(InMemoryCardStore::new());
    let stations = Arc::new(InMemoryStationRegistry::new());
    let history = Arc::new(InMemoryHistoryStore::new());

    for id in 1..=args.stations {
        stations.insert(Station::new(id, format!("station-{id}"), "0.0.0.0"));
    }

    let engine = FareEngine::new(cards, stations, history);
    let processor = ReplayProcessor::new(engine.clone(), args.role);

    // Malformed rows are logged and skipped; valid events replay in file order
    // per card
    let events: Vec<Event> = EventReader::new(&args.events_file)?
        .filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(error) => {
                warn!(%error, "skipping malformed event row");
                None
            }
        })
        .collect();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(processor.replay(events));

    let mut output = std::io::stdout();
    write_cards_csv(&engine.all_cards(), &mut output)?;

    Ok(())
}
