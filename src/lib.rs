//! fzfui: interactive terminal pickers on top of fzf.
//!
//! A picker is one executable playing two roles. Launched normally, it pipes a
//! producer command into fzf with key bindings that re-invoke the same
//! executable. Each re-invocation runs a hidden sub-command (toggle, action,
//! preview, reload, ...) that prints a control directive or preview text for
//! fzf and exits.
//!
//! The framework provides:
//! - A query/command toggle: `ctrl-\` swaps between filtering the items and
//!   editing the producer command itself, backed by a per-session state file
//! - Keyed actions with reload/silent/exit flags and field selection
//! - Selection and query previews
//! - Named filters switchable from bindings or selected by command-line flags
//! - An assist-mode state machine for free-text-to-expression helpers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Binaries: fzfui (TOML picker), psi, jqi            │  ← Entry points
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │
//! │  - clap command tree                                │
//! │  - Launch mode selection                            │
//! │  - Hidden sub-command routing                       │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Compiler      │   │ Session       │   │ Runtime       │
//! │ (compiler)    │   │ (session/)    │   │ (runtime)     │
//! │ - fzf argv    │   │ - Toggle FSM  │   │ - Producer    │
//! │ - Bindings    │   │ - Assist FSM  │   │ - Finder      │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Registry, Directive, Storage, Domain               │
//! │  - Actions and filters (registry/)                  │
//! │  - Directive mini-language (directive)              │
//! │  - StateStore port, JSON file store (storage/)      │
//! │  - Modes, state records, errors (domain/)           │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Config, Infrastructure, Observability              │
//! │  - Environment snapshot, TOML pickers (config/)     │
//! │  - Paths and child processes (infrastructure/)      │
//! │  - File logging (observability/)                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: [`App`] builder, command line, hidden sub-commands
//! - [`compiler`]: fzf argument vectors for filter and preview mode
//! - [`session`]: query/command toggle and assist-mode transitions
//! - [`runtime`]: process orchestrator
//! - [`registry`]: actions, previews and named filters
//! - [`directive`]: fzf control-directive rendering
//! - [`storage`]: state persistence port and its file/memory adapters
//! - [`domain`]: core types and [`FzfuiError`]
//! - [`config`]: [`Config`] and [`PickerFile`](config::PickerFile)
//! - [`clipboard`]: system clipboard helper detection
//! - [`infrastructure`]: paths and child-process helpers
//! - [`observability`]: tracing to a rotating log file
//!
//! # Session flow
//!
//! 1. **Launch**: the app compiles its fzf arguments, writes the initial
//!    session state (`query` mode, empty query, the producer command) to a
//!    temp file and exports its path as `FZFUI_STATE`
//! 2. **Run**: the producer's stdout is piped into fzf; the launcher blocks
//!    until fzf exits and returns fzf's exit code
//! 3. **Keys**: fzf runs `<self> _toggle`, `<self> _action kill {1}`, ...;
//!    each invocation reads the state if it needs to, answers, and exits
//! 4. **Cleanup**: the state file is removed on every exit path
//!
//! # Examples
//!
//! ```no_run
//! use fzfui::compiler::FinderOptions;
//! use fzfui::registry::Action;
//! use fzfui::App;
//!
//! let mut app = App::new("gitlog")?;
//! app.main(FinderOptions::new("git log --oneline").with_nth("2.."))
//!     .action(
//!         "show",
//!         Action::<App>::new("enter", |app, sha| {
//!             let code = fzfui::infrastructure::run_script(
//!                 &app.config().shell,
//!                 "git show \"$1\"",
//!                 sha,
//!             )?;
//!             tracing::debug!(code, "git show finished");
//!             Ok(())
//!         })
//!         .field(1)
//!         .description("Show commit"),
//!     )
//!     .preview(|app, sha| Ok(format!("{}\n{sha}", app.help_text(&[]))));
//!
//! std::process::exit(app.run());
//! # Ok::<(), fzfui::FzfuiError>(())
//! ```
//!
//! # Logging
//!
//! stdout belongs to fzf, so logs go to `$XDG_STATE_HOME/fzfui/fzfui.log`.
//! Set `FZFUI_LOG=debug` to trace toggles and dispatches.

#![allow(clippy::multiple_crate_versions)]

pub mod app;
pub mod clipboard;
pub mod compiler;
pub mod config;
pub mod directive;
pub mod domain;
pub mod infrastructure;
pub mod observability;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod storage;

pub use app::App;
pub use config::Config;
pub use domain::{FzfuiError, Result};
