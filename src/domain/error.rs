//! Error types for fzfui.
//!
//! This module defines the centralized error type [`FzfuiError`] and a type alias
//! [`Result`] used across the framework and the bundled tools. All variants are
//! implemented with `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fzfui operations.
///
/// Hidden sub-commands surface these on stderr with a nonzero exit; the finder
/// then treats the binding as failed. Nothing in the framework retries.
///
/// # Examples
///
/// ```
/// use fzfui::FzfuiError;
///
/// fn pick_finder(found: bool) -> Result<(), FzfuiError> {
///     if found {
///         Ok(())
///     } else {
///         Err(FzfuiError::ToolNotFound("fzf".to_string()))
///     }
/// }
///
/// assert!(pick_finder(false).is_err());
/// ```
#[derive(Debug, Error)]
pub enum FzfuiError {
    /// Filesystem or process I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted state record could not be encoded or decoded.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A hidden sub-command needed session state that does not exist.
    ///
    /// Raised when the state file was never created or has already been
    /// removed. Hidden sub-commands fail closed instead of resetting.
    #[error("session state not found at {}", .0.display())]
    StateMissing(PathBuf),

    /// A required external program is not installed or not on `PATH`.
    #[error("{0} not found; is it installed and on PATH?")]
    ToolNotFound(String),

    /// Copying to the system clipboard failed.
    #[error("{0}")]
    Clipboard(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A filter name was requested that was never registered.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// The command line could not be parsed or a value cannot be passed on.
    #[error("{0}")]
    Usage(String),
}

impl FzfuiError {
    /// Process exit code used by the binaries for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Config(_) => 2,
            _ => 1,
        }
    }
}

/// A specialized `Result` type for fzfui operations.
pub type Result<T> = std::result::Result<T, FzfuiError>;
