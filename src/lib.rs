//! Metro Fare Engine Library
//! # Overview
//!
//! This library implements the settlement core of a metro fare-collection
//! backend: prepaid cards check in and out of stations, fares are deducted
//! atomically, and every balance mutation leaves an immutable audit trail.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Card, Station, settlement records, errors)
//! - [`store`] - Storage seams and thread-safe in-memory implementations
//! - [`engine`] - The fare settlement engine (check-in, check-out, top-up,
//!   refund) with optimistic per-card concurrency
//! - [`io`] - CSV event parsing and card-state output
//! - [`replay`] - Concurrent event replay partitioned by card
//! - [`cli`] - CLI argument parsing
//!
//! # Settlement Rules
//!
//! - A card must hold at least the check-in minimum to pass the entry gate;
//!   check-in deducts nothing
//! - Check-out deducts a flat fare and commits the deduction together with
//!   its settlement record and pay ledger entry, or not at all
//! - Balances never go below zero; blocked cards are rejected everywhere
//! - Audit records are append-only and never mutated

// Module declarations
pub mod cli;
pub mod engine;
pub mod io;
pub mod replay;
pub mod store;
pub mod types;

pub use engine::{FareEngine, CHECK_IN_MIN, FLAT_FARE, MAX_CAS_RETRIES};
pub use io::{write_cards_csv, Event, EventKind, EventReader};
pub use replay::{EventOutcome, ReplayProcessor};
pub use store::{CardStore, HistoryStore, StationRegistry};
pub use types::{
    Card, CardClass, CardStatus, FareError, LedgerEntry, Role, SettlementRecord, Station,
    StationId, UserId,
};
