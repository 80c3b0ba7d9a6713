//! CSV format handling for card events and card-state output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvEventRecord structure for deserialization
//! - Conversion from CSV records to domain events
//! - Final card-state serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Card, CardClass, FareError, StationId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// What a card event asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Issue a new card of a given class
    Issue,

    /// Add money to a card
    TopUp,

    /// Return money to a card
    Refund,

    /// Entry gate tap
    CheckIn,

    /// Exit gate tap
    CheckOut,
}

impl EventKind {
    /// Stable lowercase name used in output and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Issue => "issue",
            EventKind::TopUp => "topup",
            EventKind::Refund => "refund",
            EventKind::CheckIn => "checkin",
            EventKind::CheckOut => "checkout",
        }
    }
}

/// A validated card event ready for replay
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What to do
    pub kind: EventKind,

    /// The card the event targets
    pub card_id: String,

    /// Station, for gate events
    pub station_id: Option<StationId>,

    /// Amount, for top-up and refund
    pub amount: Option<Decimal>,

    /// Card class, for issue events
    pub class: Option<CardClass>,
}

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: event, card, station, amount,
/// class. Station, amount, and class are optional because each event kind
/// uses a different subset of them.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvEventRecord {
    pub event: String,
    pub card: String,
    pub station: Option<String>,
    pub amount: Option<String>,
    pub class: Option<String>,
}

/// Whether a string is a well-formed physical card ID (`GM` + 10 digits)
pub fn is_valid_card_id(card_id: &str) -> bool {
    card_id.len() == 12
        && card_id.starts_with("GM")
        && card_id[2..].bytes().all(|b| b.is_ascii_digit())
}

/// Convert a CsvEventRecord into a validated Event
///
/// Validates the card ID format, parses the event kind, and checks that the
/// fields the kind requires are present and well-formed: issue needs a class,
/// top-up and refund need an amount, gate events need a station.
///
/// # Errors
///
/// Returns `FareError::ParseError` describing the first problem found, with
/// the given line number attached.
pub fn convert_event_record(record: CsvEventRecord, line: u64) -> Result<Event, FareError> {
    let parse_error = |message: String| FareError::ParseError {
        line: Some(line),
        message,
    };

    if !is_valid_card_id(&record.card) {
        return Err(parse_error(format!("Invalid card ID '{}'", record.card)));
    }

    let kind = match record.event.to_lowercase().as_str() {
        "issue" => EventKind::Issue,
        "topup" => EventKind::TopUp,
        "refund" => EventKind::Refund,
        "checkin" => EventKind::CheckIn,
        "checkout" => EventKind::CheckOut,
        other => return Err(parse_error(format!("Invalid event type '{}'", other))),
    };

    let station_id = match record.station.as_deref().map(str::trim) {
        Some(station) if !station.is_empty() => Some(
            station
                .parse::<StationId>()
                .map_err(|_| parse_error(format!("Invalid station '{}'", station)))?,
        ),
        _ => None,
    };

    let amount = match record.amount.as_deref().map(str::trim) {
        Some(amount) if !amount.is_empty() => Some(
            Decimal::from_str(amount)
                .map_err(|_| parse_error(format!("Invalid amount '{}'", amount)))?,
        ),
        _ => None,
    };

    let class = match record.class.as_deref().map(str::trim) {
        Some(class) if !class.is_empty() => Some(
            CardClass::parse(class)
                .ok_or_else(|| parse_error(format!("Invalid card class '{}'", class)))?,
        ),
        _ => None,
    };

    // Per-kind required fields
    match kind {
        EventKind::Issue => {
            if class.is_none() {
                return Err(parse_error(format!(
                    "Issue event for card {} requires a class",
                    record.card
                )));
            }
        }
        EventKind::TopUp | EventKind::Refund => {
            if amount.is_none() {
                return Err(parse_error(format!(
                    "{} event for card {} requires an amount",
                    kind.as_str(),
                    record.card
                )));
            }
        }
        EventKind::CheckIn | EventKind::CheckOut => {
            if station_id.is_none() {
                return Err(parse_error(format!(
                    "{} event for card {} requires a station",
                    kind.as_str(),
                    record.card
                )));
            }
        }
    }

    Ok(Event {
        kind,
        card_id: record.card,
        station_id,
        amount,
        class,
    })
}

/// Write final card states to CSV format
///
/// Writes cards with columns: card, balance, status, class. Cards are sorted
/// by card ID for deterministic output.
pub fn write_cards_csv(cards: &[Card], output: &mut dyn Write) -> Result<(), FareError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer.write_record(["card", "balance", "status", "class"])?;

    let mut sorted_cards = cards.to_vec();
    sorted_cards.sort_by(|a, b| a.card_id.cmp(&b.card_id));

    for card in sorted_cards {
        writer.write_record(&[
            card.card_id.clone(),
            card.balance.to_string(),
            card.status.as_str().to_string(),
            card.class.as_str().to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
