//! Thread-safe in-memory storage implementations
//!
//! This module provides the default storage backends for the fare engine:
//! a `DashMap`-backed card store with per-card balance versions, a `DashMap`
//! station registry, and a mutex-guarded append-only history log.
//!
//! # Thread Safety
//!
//! All three stores are safe to share across threads. The card store uses
//! DashMap's fine-grained locking so that operations on different cards never
//! contend; the history log serialises appends under a single mutex so that a
//! paired append commits both rows or neither.

use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Mutex;

use crate::types::{Card, FareError, LedgerEntry, SettlementRecord, Station, StationId};

use super::traits::{CardSnapshot, CardStore, HistoryStore, StationRegistry};

/// Card state together with its balance version
#[derive(Debug, Clone)]
struct VersionedCard {
    card: Card,
    version: u64,
}

/// Thread-safe in-memory card store
///
/// Each card carries a version counter that increments on every committed
/// balance write. `compare_and_swap_balance` holds the card's DashMap entry
/// lock for the duration of the check-and-write, so the version comparison
/// and the balance update are atomic with respect to other writers.
#[derive(Debug, Default)]
pub struct InMemoryCardStore {
    cards: DashMap<String, VersionedCard>,
}

impl InMemoryCardStore {
    /// Create an empty card store
    pub fn new() -> Self {
        Self {
            cards: DashMap::new(),
        }
    }
}

impl CardStore for InMemoryCardStore {
    fn insert(&self, card: Card) -> bool {
        let mut inserted = false;
        self.cards
            .entry(card.card_id.clone())
            .or_insert_with(|| {
                inserted = true;
                VersionedCard { card, version: 0 }
            });
        inserted
    }

    fn get(&self, card_id: &str) -> Option<CardSnapshot> {
        self.cards.get(card_id).map(|entry| CardSnapshot {
            card: entry.card.clone(),
            version: entry.version,
        })
    }

    fn compare_and_swap_balance(
        &self,
        card_id: &str,
        expected_version: u64,
        new_balance: Decimal,
    ) -> Result<bool, FareError> {
        let mut entry = self
            .cards
            .get_mut(card_id)
            .ok_or_else(|| FareError::card_not_found(card_id))?;

        if entry.version != expected_version {
            return Ok(false);
        }

        entry.card.balance = new_balance;
        entry.version += 1;
        Ok(true)
    }

    fn all_cards(&self) -> Vec<Card> {
        self.cards
            .iter()
            .map(|entry| entry.card.clone())
            .collect()
    }
}

/// Thread-safe in-memory station registry
#[derive(Debug, Default)]
pub struct InMemoryStationRegistry {
    stations: DashMap<StationId, Station>,
}

impl InMemoryStationRegistry {
    /// Create an empty station registry
    pub fn new() -> Self {
        Self {
            stations: DashMap::new(),
        }
    }
}

impl StationRegistry for InMemoryStationRegistry {
    fn insert(&self, station: Station) {
        self.stations.insert(station.id, station);
    }

    fn get(&self, station_id: StationId) -> Option<Station> {
        self.stations.get(&station_id).map(|entry| entry.value().clone())
    }
}

/// Both append-only logs behind one lock
#[derive(Debug, Default)]
struct HistoryLog {
    settlements: Vec<SettlementRecord>,
    ledger: Vec<LedgerEntry>,
}

/// Thread-safe in-memory audit history
///
/// A single mutex guards both logs, so `append_paired` pushes the settlement
/// record and the ledger entry under one critical section and no reader can
/// observe one without the other.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    log: Mutex<HistoryLog>,
}

impl InMemoryHistoryStore {
    /// Create an empty history store
    pub fn new() -> Self {
        Self {
            log: Mutex::new(HistoryLog::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryLog> {
        // A poisoned lock only means another thread panicked mid-append;
        // the Vec contents are still structurally valid.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn append_settlement(&self, record: SettlementRecord) -> Result<(), FareError> {
        self.lock().settlements.push(record);
        Ok(())
    }

    fn append_ledger(&self, entry: LedgerEntry) -> Result<(), FareError> {
        self.lock().ledger.push(entry);
        Ok(())
    }

    fn append_paired(
        &self,
        record: SettlementRecord,
        entry: LedgerEntry,
    ) -> Result<(), FareError> {
        let mut log = self.lock();
        log.settlements.push(record);
        log.ledger.push(entry);
        Ok(())
    }

    fn settlements(&self) -> Vec<SettlementRecord> {
        self.lock().settlements.clone()
    }

    fn ledger(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CardClass;

    #[test]
    fn test_insert_new_card() {
        let store = InMemoryCardStore::new();

        let inserted = store.insert(Card::issue("GM0000000001", Some(1), CardClass::Normal));

        assert!(inserted);
        let snapshot = store.get("GM0000000001").unwrap();
        assert_eq!(snapshot.card.balance, CardClass::Normal.opening_balance());
        assert_eq!(snapshot.version, 0);
    }

    #[test]
    fn test_insert_duplicate_card_leaves_existing_untouched() {
        let store = InMemoryCardStore::new();
        store.insert(Card::issue("GM0000000001", Some(1), CardClass::Vip));

        let inserted = store.insert(Card::issue("GM0000000001", Some(2), CardClass::Normal));

        assert!(!inserted);
        let snapshot = store.get("GM0000000001").unwrap();
        assert_eq!(snapshot.card.user_id, Some(1));
        assert_eq!(snapshot.card.class, CardClass::Vip);
    }

    #[test]
    fn test_cas_commits_on_matching_version() {
        let store = InMemoryCardStore::new();
        store.insert(Card::issue("GM0000000001", Some(1), CardClass::Normal));

        let snapshot = store.get("GM0000000001").unwrap();
        let committed = store
            .compare_and_swap_balance("GM0000000001", snapshot.version, Decimal::new(7000, 0))
            .unwrap();

        assert!(committed);
        let after = store.get("GM0000000001").unwrap();
        assert_eq!(after.card.balance, Decimal::new(7000, 0));
        assert_eq!(after.version, snapshot.version + 1);
    }

    #[test]
    fn test_cas_rejects_stale_version() {
        let store = InMemoryCardStore::new();
        store.insert(Card::issue("GM0000000001", Some(1), CardClass::Normal));

        let snapshot = store.get("GM0000000001").unwrap();
        store
            .compare_and_swap_balance("GM0000000001", snapshot.version, Decimal::new(7000, 0))
            .unwrap();

        // The original snapshot version is now stale
        let committed = store
            .compare_and_swap_balance("GM0000000001", snapshot.version, Decimal::new(1, 0))
            .unwrap();

        assert!(!committed);
        let after = store.get("GM0000000001").unwrap();
        assert_eq!(after.card.balance, Decimal::new(7000, 0));
    }

    #[test]
    fn test_cas_unknown_card_is_an_error() {
        let store = InMemoryCardStore::new();

        let result = store.compare_and_swap_balance("GM0000000009", 0, Decimal::ZERO);

        assert_eq!(result, Err(FareError::card_not_found("GM0000000009")));
    }

    #[test]
    fn test_concurrent_cas_on_same_card_commits_exactly_once_per_version() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryCardStore::new());
        store.insert(Card::issue("GM0000000001", Some(1), CardClass::Normal));
        let base = store.get("GM0000000001").unwrap();

        let mut handles = vec![];
        for i in 0..8i64 {
            let store_clone = Arc::clone(&store);
            let version = base.version;
            handles.push(thread::spawn(move || {
                store_clone
                    .compare_and_swap_balance(
                        "GM0000000001",
                        version,
                        Decimal::new(1000 + i, 0),
                    )
                    .unwrap()
            }));
        }

        let commits = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|committed| *committed)
            .count();

        // All eight threads raced on the same snapshot version
        assert_eq!(commits, 1);
        assert_eq!(store.get("GM0000000001").unwrap().version, base.version + 1);
    }

    #[test]
    fn test_station_registry_lookup() {
        let registry = InMemoryStationRegistry::new();
        registry.insert(Station::new(3, "station-3", "10.0.0.3"));

        assert_eq!(
            registry.get(3).map(|station| station.name),
            Some("station-3".to_string())
        );
        assert_eq!(registry.get(4), None);
    }

    #[test]
    fn test_paired_append_lands_both_rows() {
        let history = InMemoryHistoryStore::new();

        history
            .append_paired(
                SettlementRecord::check_out("GM0000000001", 2, Decimal::new(5000, 0)),
                LedgerEntry::payment("GM0000000001", Some(1), Decimal::new(5000, 0)),
            )
            .unwrap();

        assert_eq!(history.settlements().len(), 1);
        assert_eq!(history.ledger().len(), 1);
    }

    #[test]
    fn test_appends_preserve_order() {
        let history = InMemoryHistoryStore::new();

        history
            .append_settlement(SettlementRecord::check_in("GM0000000001", 1))
            .unwrap();
        history
            .append_settlement(SettlementRecord::check_out(
                "GM0000000001",
                2,
                Decimal::new(5000, 0),
            ))
            .unwrap();

        let settlements = history.settlements();
        assert_eq!(settlements[0].station_id, 1);
        assert_eq!(settlements[1].station_id, 2);
    }
}
