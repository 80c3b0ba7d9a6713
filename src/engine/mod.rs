//! Fare settlement engine
//!
//! This module provides the `FareEngine` that settles gate and balance events
//! against the card store and the audit history.
//!
//! The engine enforces the business rules:
//! - Blocked cards are rejected by every operation
//! - Card balance never goes below zero; all arithmetic is checked
//! - Every accepted check-in/check-out appends exactly one settlement record
//! - Check-out commits its balance decrement, settlement record, and pay
//!   ledger entry as one unit; a failed append rolls the decrement back
//!
//! # Concurrency
//!
//! Balance writes are optimistic: the engine snapshots a card together with a
//! version counter, computes the new balance, and commits it with a
//! compare-and-swap that only succeeds if the version is unchanged. Lost races
//! are retried up to [`MAX_CAS_RETRIES`] times before giving up with
//! `ConcurrencyConflict`. Operations on different cards never contend.
//!
//! The engine holds its stores behind `Arc` and is itself cheap to clone, so
//! one engine can be shared across tokio tasks.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{CardSnapshot, CardStore, HistoryStore, StationRegistry};
use crate::types::{
    BalanceReceipt, Card, CardAction, CardStatus, CheckInReceipt, CheckOutReceipt, FareError,
    LedgerEntry, SettlementRecord, StationId,
};

/// Flat fare deducted at every check-out
pub const FLAT_FARE: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Minimum balance required to pass the entry gate
pub const CHECK_IN_MIN: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// How many lost compare-and-swap races an operation tolerates before
/// reporting `ConcurrencyConflict`
pub const MAX_CAS_RETRIES: usize = 5;

/// Fare settlement engine
///
/// Stateless between calls; all state lives in the injected stores. Construct
/// one engine per network and clone it freely across tasks.
pub struct FareEngine<C, S, H> {
    cards: Arc<C>,
    stations: Arc<S>,
    history: Arc<H>,
}

impl<C, S, H> Clone for FareEngine<C, S, H> {
    fn clone(&self) -> Self {
        FareEngine {
            cards: Arc::clone(&self.cards),
            stations: Arc::clone(&self.stations),
            history: Arc::clone(&self.history),
        }
    }
}

impl<C, S, H> FareEngine<C, S, H>
where
    C: CardStore,
    S: StationRegistry,
    H: HistoryStore,
{
    /// Create a new engine over the given stores
    pub fn new(cards: Arc<C>, stations: Arc<S>, history: Arc<H>) -> Self {
        FareEngine {
            cards,
            stations,
            history,
        }
    }

    /// The card store behind this engine
    pub fn cards(&self) -> &C {
        &self.cards
    }

    /// The audit history behind this engine
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Settle a check-in at the entry gate
    ///
    /// The card must exist, must not be blocked, and must hold at least
    /// [`CHECK_IN_MIN`]. No balance is deducted; one settlement record with
    /// amount zero is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The station does not exist
    /// - The card does not exist or is blocked
    /// - The balance is below the check-in minimum
    /// - The settlement record could not be appended
    pub fn check_in(
        &self,
        station_id: StationId,
        card_id: &str,
    ) -> Result<CheckInReceipt, FareError> {
        self.require_station(station_id)?;
        let snapshot = self.usable_card(card_id)?;

        if snapshot.card.balance < CHECK_IN_MIN {
            return Err(FareError::insufficient_balance(
                card_id,
                snapshot.card.balance,
                CHECK_IN_MIN,
                "check-in",
            ));
        }

        let record = SettlementRecord::check_in(card_id, station_id);
        let time = record.time;
        if let Err(append_error) = self.history.append_settlement(record) {
            warn!(card_id, station_id, error = %append_error, "check-in append failed");
            return Err(FareError::persistence_failure("check-in"));
        }

        info!(card_id, station_id, balance = %snapshot.card.balance, "check-in settled");

        Ok(CheckInReceipt {
            card_id: card_id.to_string(),
            station_id,
            balance: snapshot.card.balance,
            time,
        })
    }

    /// Settle a check-out at the exit gate
    ///
    /// Deducts [`FLAT_FARE`] from the card and appends the settlement record
    /// and the pay ledger entry as one commit. If the paired append fails the
    /// deduction is rolled back before the error is returned, so a retry sees
    /// the pre-attempt balance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The station does not exist
    /// - The card does not exist or is blocked
    /// - The balance is below the fare
    /// - The balance write lost the race [`MAX_CAS_RETRIES`] times
    /// - The paired append failed (the deduction has been rolled back)
    pub fn check_out(
        &self,
        station_id: StationId,
        card_id: &str,
    ) -> Result<CheckOutReceipt, FareError> {
        self.require_station(station_id)?;

        for _ in 0..MAX_CAS_RETRIES {
            let snapshot = self.usable_card(card_id)?;
            let old_balance = snapshot.card.balance;

            if old_balance < FLAT_FARE {
                return Err(FareError::insufficient_balance(
                    card_id,
                    old_balance,
                    FLAT_FARE,
                    "check-out",
                ));
            }

            let new_balance = old_balance
                .checked_sub(FLAT_FARE)
                .ok_or_else(|| FareError::arithmetic_underflow("check-out", card_id))?;

            if !self
                .cards
                .compare_and_swap_balance(card_id, snapshot.version, new_balance)?
            {
                continue;
            }

            let record = SettlementRecord::check_out(card_id, station_id, FLAT_FARE);
            let time = record.time;
            let entry = LedgerEntry::payment(card_id, snapshot.card.user_id, new_balance);

            if let Err(append_error) = self.history.append_paired(record, entry) {
                warn!(card_id, station_id, error = %append_error, "check-out append failed, rolling back deduction");
                self.roll_back_balance(card_id, FLAT_FARE, CardAction::Pay);
                return Err(FareError::persistence_failure("check-out"));
            }

            info!(card_id, station_id, fare = %FLAT_FARE, new_balance = %new_balance, "check-out settled");

            return Ok(CheckOutReceipt {
                card_id: card_id.to_string(),
                station_id,
                fare: FLAT_FARE,
                old_balance,
                new_balance,
                time,
            });
        }

        warn!(card_id, station_id, "check-out gave up after repeated balance conflicts");
        Err(FareError::concurrency_conflict(card_id, "check-out"))
    }

    /// Add money to a card
    ///
    /// The amount must be strictly positive. Appends a top-up ledger entry;
    /// if the append fails the credit is rolled back.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not strictly positive
    /// - The card does not exist or is blocked
    /// - The balance would overflow
    /// - The balance write lost the race [`MAX_CAS_RETRIES`] times
    /// - The ledger append failed (the credit has been rolled back)
    pub fn top_up(&self, card_id: &str, amount: Decimal) -> Result<BalanceReceipt, FareError> {
        self.credit(card_id, amount, CardAction::TopUp)
    }

    /// Return money to a card
    ///
    /// Same contract as [`top_up`](Self::top_up), recorded with card action
    /// `refund`. Authorization is the caller's concern.
    pub fn refund(&self, card_id: &str, amount: Decimal) -> Result<BalanceReceipt, FareError> {
        self.credit(card_id, amount, CardAction::Refund)
    }

    fn credit(
        &self,
        card_id: &str,
        amount: Decimal,
        action: CardAction,
    ) -> Result<BalanceReceipt, FareError> {
        let operation = action.as_str();

        if amount <= Decimal::ZERO {
            return Err(FareError::invalid_amount(
                &amount.to_string(),
                card_id,
                operation,
            ));
        }

        for _ in 0..MAX_CAS_RETRIES {
            let snapshot = self.usable_card(card_id)?;
            let old_balance = snapshot.card.balance;

            let new_balance = old_balance
                .checked_add(amount)
                .ok_or_else(|| FareError::arithmetic_overflow(operation, card_id))?;

            if !self
                .cards
                .compare_and_swap_balance(card_id, snapshot.version, new_balance)?
            {
                continue;
            }

            let entry = match action {
                CardAction::TopUp => {
                    LedgerEntry::top_up(card_id, snapshot.card.user_id, new_balance)
                }
                CardAction::Refund => {
                    LedgerEntry::refund(card_id, snapshot.card.user_id, new_balance)
                }
                CardAction::Pay => {
                    LedgerEntry::payment(card_id, snapshot.card.user_id, new_balance)
                }
            };
            let time = entry.time;

            if let Err(append_error) = self.history.append_ledger(entry) {
                warn!(card_id, operation, error = %append_error, "ledger append failed, rolling back credit");
                self.roll_back_balance(card_id, -amount, action);
                return Err(FareError::persistence_failure(operation));
            }

            info!(card_id, operation, amount = %amount, new_balance = %new_balance, "balance credited");

            return Ok(BalanceReceipt {
                card_id: card_id.to_string(),
                old_balance,
                new_balance,
                time,
            });
        }

        warn!(card_id, operation, "credit gave up after repeated balance conflicts");
        Err(FareError::concurrency_conflict(card_id, operation))
    }

    /// Look up a card and reject it unless it is usable at the gates
    fn usable_card(&self, card_id: &str) -> Result<CardSnapshot, FareError> {
        let snapshot = self
            .cards
            .get(card_id)
            .ok_or_else(|| FareError::card_not_found(card_id))?;

        if snapshot.card.status == CardStatus::Blocked {
            return Err(FareError::card_blocked(card_id));
        }

        Ok(snapshot)
    }

    fn require_station(&self, station_id: StationId) -> Result<(), FareError> {
        if self.stations.get(station_id).is_none() {
            return Err(FareError::station_not_found(station_id));
        }
        Ok(())
    }

    /// Undo a committed balance write after its audit append failed
    ///
    /// `adjustment` is the signed amount to apply: positive to re-credit a
    /// rolled-back deduction, negative to take back a credit whose ledger
    /// entry never landed. Retried until the write lands or the card
    /// disappears.
    ///
    /// Never commits a negative balance: a concurrent check-out may have
    /// spent the credited money before this rollback runs, in which case the
    /// rollback stops and leaves the balance where the spend put it.
    fn roll_back_balance(&self, card_id: &str, adjustment: Decimal, action: CardAction) {
        loop {
            let Some(snapshot) = self.cards.get(card_id) else {
                warn!(card_id, "card vanished during rollback");
                return;
            };

            let Some(restored) = snapshot.card.balance.checked_add(adjustment) else {
                warn!(card_id, "rollback would overflow, leaving balance as-is");
                return;
            };

            if restored < Decimal::ZERO {
                warn!(
                    card_id,
                    operation = action.as_str(),
                    balance = %snapshot.card.balance,
                    "credited money already spent, leaving balance as-is"
                );
                return;
            }

            match self
                .cards
                .compare_and_swap_balance(card_id, snapshot.version, restored)
            {
                Ok(true) => {
                    warn!(card_id, operation = action.as_str(), restored = %restored, "balance rolled back");
                    return;
                }
                Ok(false) => continue,
                Err(_) => return,
            }
        }
    }

    /// Snapshot all cards for final output
    pub fn all_cards(&self) -> Vec<Card> {
        self.cards.all_cards()
    }
}
