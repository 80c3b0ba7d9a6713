//! Streaming CSV reader for card events
//!
//! Provides an iterator over card events from a CSV file, delegating format
//! concerns to the `csv_format` module.
//!
//! # Design
//!
//! The reader deserializes rows one at a time, so memory use is independent
//! of file size. Fatal errors (file not found) surface from `new()`;
//! per-row problems are yielded as `Err` items so a caller can skip bad rows
//! and keep replaying.

use crate::io::csv_format::{convert_event_record, CsvEventRecord, Event};
use crate::types::FareError;
use csv::{DeserializeRecordsIntoIter, ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming reader over a card-event CSV file
///
/// Implements `Iterator`, yielding `Result<Event, FareError>` per row.
pub struct EventReader {
    records: DeserializeRecordsIntoIter<File, CsvEventRecord>,
    line: u64,
}

impl EventReader {
    /// Open a card-event CSV file for streaming iteration
    ///
    /// The reader trims whitespace from every field and tolerates rows that
    /// omit trailing optional columns.
    ///
    /// # Errors
    ///
    /// Returns `FareError::IoError` if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, FareError> {
        let file = File::open(path).map_err(|e| FareError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            records: reader.into_deserialize(),
            // Line 1 is the header
            line: 1,
        })
    }
}

impl Iterator for EventReader {
    type Item = Result<Event, FareError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;
        self.line += 1;

        Some(match result {
            Ok(record) => convert_event_record(record, self.line),
            Err(error) => Err(FareError::ParseError {
                line: Some(self.line),
                message: error.to_string(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_format::EventKind;
    use rust_decimal::Decimal;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn events_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_events_in_order() {
        let file = events_file(
            "event,card,station,amount,class\n\
             issue,GM0000000001,,,normal\n\
             topup, GM0000000001 ,,2500,\n\
             checkin,GM0000000001,3,,\n\
             checkout,GM0000000001,5,,\n",
        );

        let events: Vec<Event> = EventReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].kind, EventKind::Issue);
        assert_eq!(events[1].kind, EventKind::TopUp);
        assert_eq!(events[1].amount, Some(Decimal::new(2500, 0)));
        assert_eq!(events[2].station_id, Some(3));
        assert_eq!(events[3].kind, EventKind::CheckOut);
    }

    #[test]
    fn test_bad_rows_are_yielded_as_errors_not_fatal() {
        let file = events_file(
            "event,card,station,amount,class\n\
             issue,GM0000000001,,,normal\n\
             teleport,GM0000000001,3,,\n\
             checkin,GM0000000001,3,,\n",
        );

        let results: Vec<_> = EventReader::new(file.path()).unwrap().collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(FareError::ParseError { line: Some(3), .. })
        ));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_missing_file_is_an_open_error() {
        let result = EventReader::new(Path::new("/nonexistent/events.csv"));

        assert!(matches!(result, Err(FareError::IoError { .. })));
    }

    #[test]
    fn test_rows_may_omit_trailing_columns() {
        let file = events_file(
            "event,card,station,amount,class\n\
             checkin,GM0000000001,3\n",
        );

        let events: Vec<Event> = EventReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].station_id, Some(3));
    }
}
