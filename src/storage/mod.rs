//! Storage layer for the per-session state records.
//!
//! The toggle state and the assist marker both persist through the
//! [`StateStore`] port. Recursive self-invocations share state only through
//! these records, located by path in environment variables.
//!
//! # Modules
//!
//! - `backend`: the [`StateStore`] trait and the [`Persisted`] record bound
//! - `file`: JSON file store with atomic replace
//! - `memory`: in-process store

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{Persisted, StateStore};
pub use file::FileStore;
pub use memory::MemoryStore;
