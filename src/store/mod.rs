//! Storage layer for the Metro Fare Engine
//!
//! This module contains the storage seams and their default implementations:
//! - `traits` - Trait abstractions the engine is built against
//! - `memory` - Thread-safe in-memory implementations

pub mod memory;
pub mod traits;

pub use memory::{InMemoryCardStore, InMemoryHistoryStore, InMemoryStationRegistry};
pub use traits::{CardSnapshot, CardStore, HistoryStore, StationRegistry};
