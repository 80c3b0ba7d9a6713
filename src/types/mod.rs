//! Core types for the Metro Fare Engine
//!
//! This module contains the fundamental domain types used throughout the
//! fare settlement system.

pub mod card;
pub mod error;
pub mod role;
pub mod settlement;
pub mod station;

pub use card::{Card, CardClass, CardStatus, UserId};
pub use error::FareError;
pub use role::{Capability, Role};
pub use settlement::{
    BalanceReceipt, CardAction, CheckInReceipt, CheckOutReceipt, LedgerEntry, SettlementAction,
    SettlementRecord,
};
pub use station::{Station, StationId};
