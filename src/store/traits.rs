//! Storage traits for cards, stations, and audit history
//!
//! This module defines the trait seams between the settlement engine and its
//! storage. The engine only ever talks to these traits; the in-memory
//! implementations live in `memory` and tests substitute their own (e.g. a
//! history store that fails on command).

use rust_decimal::Decimal;

use crate::types::{Card, FareError, LedgerEntry, SettlementRecord, Station, StationId};

/// A card together with the version its balance was read at
///
/// The version is the optimistic-concurrency token: it increases with every
/// committed balance write, and a conditional write only succeeds if the
/// stored version still matches the one snapshotted here.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSnapshot {
    /// The card state at snapshot time
    pub card: Card,

    /// Balance version at snapshot time
    pub version: u64,
}

/// Trait for storing and updating cards
///
/// Balance writes go through `compare_and_swap_balance` exclusively; there is
/// no unconditional balance setter. Implementations must be safe to share
/// across threads.
pub trait CardStore: Send + Sync {
    /// Insert a newly issued card
    ///
    /// If a card with the same ID already exists it is left untouched and
    /// `false` is returned.
    fn insert(&self, card: Card) -> bool;

    /// Snapshot a card and its current balance version
    fn get(&self, card_id: &str) -> Option<CardSnapshot>;

    /// Conditionally write a new balance
    ///
    /// Succeeds only if the card's version still equals `expected_version`;
    /// on success the version is incremented and the new balance committed.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The write committed
    /// * `Ok(false)` - Another writer got there first; snapshot again and retry
    /// * `Err(FareError::CardNotFound)` - The card does not exist
    fn compare_and_swap_balance(
        &self,
        card_id: &str,
        expected_version: u64,
        new_balance: Decimal,
    ) -> Result<bool, FareError>;

    /// Snapshot all cards for final output
    fn all_cards(&self) -> Vec<Card>;
}

/// Trait for looking up stations
///
/// Stations are read-only to the engine; the registry is seeded before
/// settlement starts.
pub trait StationRegistry: Send + Sync {
    /// Register a station
    fn insert(&self, station: Station);

    /// Look up a station by ID
    fn get(&self, station_id: StationId) -> Option<Station>;
}

/// Trait for the append-only audit history
///
/// Settlement records and ledger entries are never updated or deleted once
/// appended. Appends may fail (a storage fault); the engine treats any such
/// failure as `PersistenceFailure` and rolls back the balance write it pairs
/// with.
pub trait HistoryStore: Send + Sync {
    /// Append one settlement record
    fn append_settlement(&self, record: SettlementRecord) -> Result<(), FareError>;

    /// Append one ledger entry
    fn append_ledger(&self, entry: LedgerEntry) -> Result<(), FareError>;

    /// Append a settlement record and its ledger entry as one commit
    ///
    /// Used by check-out, where the audit row and the pay entry must land
    /// together or not at all.
    fn append_paired(
        &self,
        record: SettlementRecord,
        entry: LedgerEntry,
    ) -> Result<(), FareError>;

    /// Snapshot all settlement records, in append order
    fn settlements(&self) -> Vec<SettlementRecord>;

    /// Snapshot all ledger entries, in append order
    fn ledger(&self) -> Vec<LedgerEntry>;
}
