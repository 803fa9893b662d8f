//! In-memory state store.

use crate::domain::error::Result;
use crate::storage::backend::StateStore;

/// State store that keeps its record in memory.
///
/// Used by tests and by callers that drive the state machines without a
/// session file.
///
/// ```
/// use fzfui::domain::SessionState;
/// use fzfui::storage::{MemoryStore, StateStore};
///
/// let mut store = MemoryStore::with(SessionState::initial("ls"));
/// assert_eq!(store.load()?.unwrap().command, "ls");
/// store.clear()?;
/// assert!(store.load()?.is_none());
/// # Ok::<(), fzfui::FzfuiError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore<T> {
    value: Option<T>,
}

impl<T> MemoryStore<T> {
    /// An empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// A store already holding `value`.
    pub const fn with(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Borrow the stored record.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

impl<T: Clone> StateStore<T> for MemoryStore<T> {
    fn load(&self) -> Result<Option<T>> {
        Ok(self.value.clone())
    }

    fn save(&mut self, value: &T) -> Result<()> {
        self.value = Some(value.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.value = None;
        Ok(())
    }
}
