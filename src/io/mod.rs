//! Input/output module for CSV event processing
//!
//! This module contains:
//! - `csv_format` - CSV event parsing, validation, and card-state output
//! - `event_reader` - Streaming iterator over a card-event CSV file

pub mod csv_format;
pub mod event_reader;

pub use csv_format::{
    convert_event_record, is_valid_card_id, write_cards_csv, CsvEventRecord, Event, EventKind,
};
pub use event_reader::EventReader;
