//! State store abstraction.
//!
//! This module defines the [`StateStore`] port. The toggle and assist state
//! machines only ever talk to this trait, so they can run against the session
//! file in production and against [`MemoryStore`](crate::storage::MemoryStore)
//! in tests.
//!
//! A store holds at most one record. "No record" is a meaningful state: for
//! the assist marker it means assist mode is inactive.

use crate::domain::error::Result;
use crate::domain::{AssistMarker, SessionState};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record that can be written to a state store.
///
/// Records are serialized as JSON. `decode_legacy` lets a record type accept
/// an older plain-text encoding when JSON parsing fails.
pub trait Persisted: Serialize + DeserializeOwned {
    /// Decodes a non-JSON representation, if the type has one.
    fn decode_legacy(_raw: &str) -> Option<Self> {
        None
    }
}

impl Persisted for SessionState {
    fn decode_legacy(raw: &str) -> Option<Self> {
        Self::from_legacy_line(raw)
    }
}

impl Persisted for AssistMarker {
    /// A marker written as bare text holds the saved query verbatim.
    fn decode_legacy(raw: &str) -> Option<Self> {
        Some(Self {
            saved: raw.to_string(),
        })
    }
}

/// Single-record persistence port.
///
/// # Implementations
///
/// - [`FileStore`](crate::storage::FileStore): JSON file with atomic writes
/// - [`MemoryStore`](crate::storage::MemoryStore): in-process, for tests
pub trait StateStore<T> {
    /// Reads the stored record, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or decoded.
    fn load(&self) -> Result<Option<T>>;

    /// Replaces the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    fn save(&mut self, value: &T) -> Result<()>;

    /// Removes the stored record. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be removed.
    fn clear(&mut self) -> Result<()>;
}
