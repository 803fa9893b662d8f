//! Infrastructure layer for filesystem, environment, and process interactions.
//!
//! - [`paths`]: log directory resolution, tilde handling, `PATH` lookup
//! - [`process`]: spawning external tools with consistent error mapping
//! - [`signals`]: holding terminating signals while the finder runs

pub mod paths;
pub mod process;
#[cfg(unix)]
pub mod signals;

pub use paths::{expand_tilde, find_in_path, get_data_dir};
pub use process::{capture_script, exit_code, run_script, spawn_tool, wait_with_timeout};
#[cfg(unix)]
pub use signals::SignalGuard;
