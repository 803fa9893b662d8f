//! File-based logging.
//!
//! ```text
//! tracing macros → EnvFilter → fmt layer → FileWriter → <data dir>/fzfui.log
//! ```
//!
//! Each process (the session launcher and every hidden sub-command the finder
//! spawns) appends to the same log, so a whole session can be followed with
//! `tail -f`. Set `FZFUI_LOG=debug` to see state transitions and dispatches.
//!
//! # Modules
//!
//! - [`init`]: subscriber setup
//! - [`file_writer`]: size-rotating append-only writer

pub mod file_writer;
mod init;

pub use init::{init_tracing, LOG_FILE_NAME};
