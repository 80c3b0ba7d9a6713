//! Station types for the Metro Fare Engine
//!
//! Stations are read-only from the settlement engine's point of view; the
//! engine only ever checks that the station named in a request exists.

use serde::{Deserialize, Serialize};

/// Station identifier
///
/// Supports station IDs from 0 to 4,294,967,295.
pub type StationId = u32;

/// A metro station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier
    pub id: StationId,

    /// Display name of the station
    pub name: String,

    /// Network address of the station's gate controller
    pub ip_address: String,
}

impl Station {
    /// Create a new station record
    pub fn new(id: StationId, name: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Station {
            id,
            name: name.into(),
            ip_address: ip_address.into(),
        }
    }
}
