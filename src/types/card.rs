//! Card-related types for the Metro Fare Engine
//!
//! This module defines the prepaid transit card, its lifecycle status, and the
//! card classes with their fixed nominal prices and opening balances.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Surrogate key of the user owning a card
///
/// Cards reference their owner by this key only. Supports user IDs
/// from 0 to 4,294,967,295.
pub type UserId = u32;

/// Lifecycle status of a card
///
/// Only the settlement engine's rejection of `Blocked` cards depends on this;
/// `Inactive` cards (issued without an owner) are still usable at the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Card is issued to an owner and fully usable
    Active,

    /// Card exists but has no registered owner yet
    Inactive,

    /// Card is barred from every engine operation
    Blocked,
}

impl CardStatus {
    /// Stable lowercase name used in CSV output and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Inactive => "inactive",
            CardStatus::Blocked => "blocked",
        }
    }
}

/// Card class with fixed nominal price and default opening balance
///
/// The price is what the card itself is sold for; the opening balance is
/// preloaded onto the card at issue time. Both are fixed per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardClass {
    Student,
    Normal,
    Vip,
}

impl CardClass {
    /// Nominal sale price of a card of this class
    pub fn nominal_price(&self) -> Decimal {
        match self {
            CardClass::Student => Decimal::new(15_000, 0),
            CardClass::Normal => Decimal::new(25_000, 0),
            CardClass::Vip => Decimal::new(50_000, 0),
        }
    }

    /// Balance preloaded onto a freshly issued card of this class
    pub fn opening_balance(&self) -> Decimal {
        match self {
            CardClass::Student => Decimal::new(20_000, 0),
            CardClass::Normal => Decimal::new(10_000, 0),
            CardClass::Vip => Decimal::new(50_000, 0),
        }
    }

    /// Stable lowercase name used in CSV output and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            CardClass::Student => "student",
            CardClass::Normal => "normal",
            CardClass::Vip => "vip",
        }
    }

    /// Parse a class name as it appears in issue events
    pub fn parse(s: &str) -> Option<CardClass> {
        match s.to_lowercase().as_str() {
            "student" => Some(CardClass::Student),
            "normal" => Some(CardClass::Normal),
            "vip" => Some(CardClass::Vip),
            _ => None,
        }
    }
}

/// Prepaid transit card
///
/// The card is identified by its physical RFID string (`card_id`) and owns a
/// reference to its user by surrogate key only. The balance is mutated
/// exclusively through the settlement engine (check-out, top-up, refund);
/// it never goes below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Physical RFID identifier, unique across the network (`GM` + 10 digits)
    pub card_id: String,

    /// Owning user, if any, referenced by surrogate key
    pub user_id: Option<UserId>,

    /// Current monetary balance; invariant: always >= 0
    pub balance: Decimal,

    /// Lifecycle status
    pub status: CardStatus,

    /// Card class, fixing nominal price and opening balance
    pub class: CardClass,
}

impl Card {
    /// Issue a new card of the given class
    ///
    /// The card starts with the class's opening balance. A card issued with
    /// an owner is `Active`; without one it is `Inactive` until registered.
    pub fn issue(card_id: impl Into<String>, user_id: Option<UserId>, class: CardClass) -> Self {
        Card {
            card_id: card_id.into(),
            status: if user_id.is_some() {
                CardStatus::Active
            } else {
                CardStatus::Inactive
            },
            user_id,
            balance: class.opening_balance(),
            class,
        }
    }
}
