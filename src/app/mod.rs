//! Application layer: the [`App`] builder and hidden sub-command routing.
//!
//! # Architecture
//!
//! ```text
//! launch:   argv → cli → LaunchMode → compile → Orchestrator → finder
//!                                                                 │
//!                                      key press: <self> _action … │
//!                                                                 ▼
//! hidden:   argv → cli → HiddenCommand → handle_command → Response → stdout
//! ```
//!
//! # Modules
//!
//! - [`cli`]: clap command tree built from the app's registrations
//! - [`handler`]: hidden sub-command handling and the stdout response
//! - [`modes`]: launch mode selection
//! - `state`: the [`App`] itself

pub mod cli;
pub mod handler;
pub mod modes;
mod state;

pub use cli::Invocation;
pub use handler::{handle_command, HiddenCommand, Response};
pub use modes::LaunchMode;
pub use state::{App, CliOption, CommandFn, CustomCommand};
