//! File-backed state store.
//!
//! One JSON document per file. Writes go to a sibling temporary file first and
//! are renamed into place, so a concurrently running hidden sub-command never
//! reads a half-written record. There is no locking: two writers racing on
//! read-modify-write still last-write-win.

use crate::domain::error::{FzfuiError, Result};
use crate::storage::backend::{Persisted, StateStore};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// JSON file state store.
///
/// # Examples
///
/// ```no_run
/// use fzfui::domain::SessionState;
/// use fzfui::storage::{FileStore, StateStore};
///
/// let mut store = FileStore::<SessionState>::new("/tmp/fzfui-state");
/// store.save(&SessionState::initial("ps aux"))?;
/// assert!(store.load()?.is_some());
/// # Ok::<(), fzfui::FzfuiError>(())
/// ```
#[derive(Debug)]
pub struct FileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> FileStore<T> {
    /// Creates a store over `path`. Nothing is read or created yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the backing file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl<T: Persisted> StateStore<T> for FileStore<T> {
    fn load(&self) -> Result<Option<T>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = ?self.path, "no stored record");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(json_err) => T::decode_legacy(&raw).map(Some).ok_or_else(|| {
                FzfuiError::Storage(format!(
                    "failed to parse {}: {json_err}",
                    self.path.display()
                ))
            }),
        }
    }

    fn save(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| FzfuiError::Storage(format!("failed to serialize record: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        tracing::trace!(tmp_path = ?tmp_path, "writing to temporary file");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = ?self.path, "record saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
