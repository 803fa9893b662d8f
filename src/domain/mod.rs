//! Domain layer for fzfui.
//!
//! Core types independent of processes, files, and the finder's syntax.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`mode`]: The query/command toggle state and the assist state
//!
//! # Examples
//!
//! ```
//! use fzfui::domain::{Result, SessionState};
//!
//! fn start(command: &str) -> Result<SessionState> {
//!     Ok(SessionState::initial(command))
//! }
//! # assert!(start("ls").is_ok());
//! ```

pub mod error;
pub mod mode;

pub use error::{FzfuiError, Result};
pub use mode::{AssistMarker, AssistState, SessionState, ToggleMode};
