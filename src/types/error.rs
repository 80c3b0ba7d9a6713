//! Error types for the Metro Fare Engine
//!
//! This module defines all error types that can occur during fare settlement.
//! Errors are designed to be descriptive and stable enough to surface as
//! user-visible reason strings at the request boundary.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: station or card absent
//! - **Business-Rule Errors**: insufficient balance, blocked card, bad amount
//! - **Concurrency Errors**: optimistic balance update lost the race
//! - **Persistence Errors**: storage fault during balance save or log append
//! - **Input Errors**: file I/O and CSV parsing in the replay layer

use rust_decimal::Decimal;
use thiserror::Error;

use super::station::StationId;

/// Main error type for the fare engine
///
/// Every variant is recoverable at the request boundary: the engine never
/// leaves partial state behind and never requires a process-level exit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FareError {
    /// The station named in a request does not exist
    #[error("Station {station_id} not found")]
    StationNotFound {
        /// The station ID that was not found
        station_id: StationId,
    },

    /// The card named in a request does not exist
    #[error("Card {card_id} not found")]
    CardNotFound {
        /// The card ID that was not found
        card_id: String,
    },

    /// A card with this ID has already been issued
    #[error("Card {card_id} already exists")]
    CardAlreadyExists {
        /// The duplicate card's ID
        card_id: String,
    },

    /// The card is blocked and rejects every operation
    #[error("Card {card_id} is blocked")]
    CardBlocked {
        /// The blocked card's ID
        card_id: String,
    },

    /// Card balance is below the fare or the check-in threshold
    ///
    /// This is a business-rule rejection, not a system fault; the card
    /// state is unchanged.
    #[error("Insufficient balance on card {card_id} for {operation}: balance {balance}, required {required}")]
    InsufficientBalance {
        /// The card's ID
        card_id: String,
        /// Current balance
        balance: Decimal,
        /// Amount the operation required
        required: Decimal,
        /// Operation that was rejected
        operation: String,
    },

    /// Non-positive or malformed amount
    #[error("Invalid amount '{amount}' for {operation} on card {card_id}")]
    InvalidAmount {
        /// The offending amount, as given
        amount: String,
        /// The card's ID
        card_id: String,
        /// Operation that was rejected
        operation: String,
    },

    /// Optimistic balance update lost the race too many times
    ///
    /// Safe to retry from the caller; the card state is consistent.
    #[error("Concurrent update conflict on card {card_id} during {operation}")]
    ConcurrencyConflict {
        /// The contended card's ID
        card_id: String,
        /// Operation that gave up
        operation: String,
    },

    /// Storage fault during balance save or log append
    ///
    /// Any partial balance mutation has been rolled back before this
    /// surfaces. The message stays generic; storage internals are not leaked.
    #[error("Persistence failure during {operation}")]
    PersistenceFailure {
        /// Operation whose commit failed
        operation: String,
    },

    /// Checked arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for card {card_id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// The card's ID
        card_id: String,
    },

    /// Checked arithmetic would underflow
    #[error("Arithmetic underflow in {operation} for card {card_id}")]
    ArithmeticUnderflow {
        /// Operation that would underflow
        operation: String,
        /// The card's ID
        card_id: String,
    },

    /// The acting role does not hold the required capability
    #[error("Role '{role}' is not permitted to {capability}")]
    Unauthorized {
        /// Name of the acting role
        role: String,
        /// Name of the missing capability
        capability: String,
    },

    /// I/O error in the replay layer
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error in the replay layer
    ///
    /// Recoverable: the malformed event is skipped and replay continues.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for FareError {
    fn from(error: std::io::Error) -> Self {
        FareError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for FareError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        FareError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl FareError {
    /// Create a StationNotFound error
    pub fn station_not_found(station_id: StationId) -> Self {
        FareError::StationNotFound { station_id }
    }

    /// Create a CardNotFound error
    pub fn card_not_found(card_id: &str) -> Self {
        FareError::CardNotFound {
            card_id: card_id.to_string(),
        }
    }

    /// Create a CardAlreadyExists error
    pub fn card_already_exists(card_id: &str) -> Self {
        FareError::CardAlreadyExists {
            card_id: card_id.to_string(),
        }
    }

    /// Create a CardBlocked error
    pub fn card_blocked(card_id: &str) -> Self {
        FareError::CardBlocked {
            card_id: card_id.to_string(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(
        card_id: &str,
        balance: Decimal,
        required: Decimal,
        operation: &str,
    ) -> Self {
        FareError::InsufficientBalance {
            card_id: card_id.to_string(),
            balance,
            required,
            operation: operation.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: &str, card_id: &str, operation: &str) -> Self {
        FareError::InvalidAmount {
            amount: amount.to_string(),
            card_id: card_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create a ConcurrencyConflict error
    pub fn concurrency_conflict(card_id: &str, operation: &str) -> Self {
        FareError::ConcurrencyConflict {
            card_id: card_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create a PersistenceFailure error
    pub fn persistence_failure(operation: &str) -> Self {
        FareError::PersistenceFailure {
            operation: operation.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, card_id: &str) -> Self {
        FareError::ArithmeticOverflow {
            operation: operation.to_string(),
            card_id: card_id.to_string(),
        }
    }

    /// Create an ArithmeticUnderflow error
    pub fn arithmetic_underflow(operation: &str, card_id: &str) -> Self {
        FareError::ArithmeticUnderflow {
            operation: operation.to_string(),
            card_id: card_id.to_string(),
        }
    }

    /// Create an Unauthorized error
    pub fn unauthorized(role: &str, capability: &str) -> Self {
        FareError::Unauthorized {
            role: role.to_string(),
            capability: capability.to_string(),
        }
    }
}
