//! Settlement and ledger record types for the Metro Fare Engine
//!
//! This module defines the immutable audit rows produced by the settlement
//! engine (station history and the generic reconciliation ledger) and the
//! receipts returned to callers of the engine's operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::card::UserId;
use super::station::StationId;

/// Gate action recorded in a settlement record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementAction {
    /// Entry at a station; deducts nothing
    CheckIn,

    /// Exit at a station; deducts the fare
    CheckOut,
}

impl SettlementAction {
    /// Stable lowercase name used in log fields and filters
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementAction::CheckIn => "checkin",
            SettlementAction::CheckOut => "checkout",
        }
    }
}

/// Balance-affecting card action recorded in a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardAction {
    /// Money added to the card by its owner
    TopUp,

    /// Fare deducted at check-out
    Pay,

    /// Money returned to the card
    Refund,
}

impl CardAction {
    /// Stable lowercase name used in log fields and filters
    pub fn as_str(&self) -> &'static str {
        match self {
            CardAction::TopUp => "topup",
            CardAction::Pay => "pay",
            CardAction::Refund => "refund",
        }
    }
}

/// Immutable audit row for one check-in/check-out event at a station
///
/// Created exactly once per accepted gate action and never mutated or
/// deleted. `amount` is zero for check-ins and equals the deducted fare for
/// check-outs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// The gate action
    pub action: SettlementAction,

    /// When the action was accepted
    pub time: DateTime<Utc>,

    /// Physical card identifier
    pub card_id: String,

    /// Station where the action happened
    pub station_id: StationId,

    /// Amount deducted from the card (zero for check-in)
    pub amount: Decimal,
}

impl SettlementRecord {
    /// Record an accepted check-in (deducts nothing)
    pub fn check_in(card_id: impl Into<String>, station_id: StationId) -> Self {
        SettlementRecord {
            action: SettlementAction::CheckIn,
            time: Utc::now(),
            card_id: card_id.into(),
            station_id,
            amount: Decimal::ZERO,
        }
    }

    /// Record an accepted check-out with the fare that was deducted
    pub fn check_out(card_id: impl Into<String>, station_id: StationId, fare: Decimal) -> Self {
        SettlementRecord {
            action: SettlementAction::CheckOut,
            time: Utc::now(),
            card_id: card_id.into(),
            station_id,
            amount: fare,
        }
    }
}

/// Immutable reconciliation row pairing a user action with a card action
///
/// One entry is appended per balance-affecting operation (top-up, payment,
/// refund) carrying the balance snapshot after the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Physical card identifier
    pub card_id: String,

    /// Owning user at the time of the action, if any
    pub user_id: Option<UserId>,

    /// What the passenger was doing
    pub user_action: SettlementAction,

    /// What happened to the card balance
    pub card_action: CardAction,

    /// Balance on the card after the action
    pub balance: Decimal,

    /// When the action was accepted
    pub time: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry for a top-up, carrying the post-top-up balance
    pub fn top_up(card_id: impl Into<String>, user_id: Option<UserId>, balance: Decimal) -> Self {
        Self::new(card_id, user_id, SettlementAction::CheckIn, CardAction::TopUp, balance)
    }

    /// Entry for a fare payment at check-out, carrying the post-payment balance
    pub fn payment(card_id: impl Into<String>, user_id: Option<UserId>, balance: Decimal) -> Self {
        Self::new(card_id, user_id, SettlementAction::CheckOut, CardAction::Pay, balance)
    }

    /// Entry for a refund, carrying the post-refund balance
    pub fn refund(card_id: impl Into<String>, user_id: Option<UserId>, balance: Decimal) -> Self {
        Self::new(card_id, user_id, SettlementAction::CheckIn, CardAction::Refund, balance)
    }

    fn new(
        card_id: impl Into<String>,
        user_id: Option<UserId>,
        user_action: SettlementAction,
        card_action: CardAction,
        balance: Decimal,
    ) -> Self {
        LedgerEntry {
            card_id: card_id.into(),
            user_id,
            user_action,
            card_action,
            balance,
            time: Utc::now(),
        }
    }
}

/// Success payload of a check-in
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInReceipt {
    /// Physical card identifier
    pub card_id: String,

    /// Station where the check-in happened
    pub station_id: StationId,

    /// Card balance at check-in (unchanged by the operation)
    pub balance: Decimal,

    /// When the check-in was accepted
    pub time: DateTime<Utc>,
}

/// Success payload of a check-out
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutReceipt {
    /// Physical card identifier
    pub card_id: String,

    /// Station where the check-out happened
    pub station_id: StationId,

    /// Fare deducted
    pub fare: Decimal,

    /// Balance before the deduction
    pub old_balance: Decimal,

    /// Balance after the deduction
    pub new_balance: Decimal,

    /// When the check-out was accepted
    pub time: DateTime<Utc>,
}

/// Success payload of a top-up or refund
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReceipt {
    /// Physical card identifier
    pub card_id: String,

    /// Balance before the credit
    pub old_balance: Decimal,

    /// Balance after the credit
    pub new_balance: Decimal,

    /// When the operation was accepted
    pub time: DateTime<Utc>,
}
