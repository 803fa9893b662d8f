//! Hidden sub-command routing.
//!
//! The finder re-invokes the program for every bound key. Each invocation is
//! parsed into a [`HiddenCommand`], handled once by [`handle_command`], and
//! answered through stdout:
//!
//! | Command | Reads | Prints |
//! |---|---|---|
//! | `_toggle` | session state, `FZF_QUERY` | toggle directive |
//! | `_on-change` | session state, `FZF_QUERY` | reload directive or nothing |
//! | `_action NAME SEL` | | nothing (preview handlers: their text) |
//! | `_preview SEL` | | selection preview |
//! | `_query-preview Q` | | query preview |
//! | `_reload` | session state | producer output |
//! | `_filter NAME` | session state | filter directive |
//!
//! Tool-defined commands print whatever their handler returns.

use super::App;
use crate::compiler::{PREVIEW_ACTION, QUERY_PREVIEW_ACTION};
use crate::domain::error::Result;
use crate::domain::{SessionState, ToggleMode};
use crate::session;
use crate::storage::StateStore;
use std::io::Write;

/// A parsed hidden sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HiddenCommand {
    /// Flip query/command mode. `typed` overrides `FZF_QUERY`.
    Toggle {
        /// Input line text passed explicitly.
        typed: Option<String>,
    },
    /// The input line changed.
    OnChange {
        /// Input line text passed explicitly.
        typed: Option<String>,
    },
    /// Run a registered action.
    Action {
        /// Registry name.
        name: String,
        /// Selection or query text.
        selection: String,
    },
    /// Render the selection preview.
    Preview {
        /// Selected line or field.
        selection: String,
    },
    /// Render the query preview.
    QueryPreview {
        /// Input line text.
        query: String,
    },
    /// Re-run the live producer command.
    Reload,
    /// Switch to a named filter.
    Filter {
        /// Filter name.
        name: String,
    },
    /// A tool-defined command.
    Custom {
        /// Command name.
        name: String,
        /// Remaining arguments.
        args: Vec<String>,
    },
}

/// What a hidden sub-command hands back to the finder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A directive or preview text for stdout.
    Output(String),
    /// Nothing to print.
    Silent,
    /// A passthrough process already wrote its output; this is its exit code.
    Status(i32),
}

impl Response {
    fn from_text(text: Option<String>) -> Self {
        text.map_or(Self::Silent, Self::Output)
    }

    /// Writes the response to stdout and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Stdout write failures.
    pub fn emit(self) -> Result<i32> {
        match self {
            Self::Output(text) => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
                Ok(0)
            }
            Self::Silent => Ok(0),
            Self::Status(code) => Ok(code),
        }
    }
}

/// Handles one hidden sub-command.
///
/// # Errors
///
/// Missing or malformed session state for the state-reading commands, and
/// whatever a dispatched handler returns.
pub fn handle_command(app: &App, command: &HiddenCommand) -> Result<Response> {
    tracing::debug!(command = ?command, "handling hidden command");

    match command {
        HiddenCommand::Toggle { typed } => {
            let typed = typed.as_deref().unwrap_or(&app.config.query);
            let (mut store, path) = app.session_store()?;
            let directive = session::apply_toggle(&mut store, &path, typed)?;
            Ok(Response::Output(directive.render()?))
        }
        HiddenCommand::OnChange { typed } => {
            let typed = typed.as_deref().unwrap_or(&app.config.query);
            let (store, path) = app.session_store()?;
            let state = session::load_session(&store, &path)?;
            let directive = session::on_change(&state, typed)?;
            if directive.is_empty() {
                Ok(Response::Silent)
            } else {
                Ok(Response::Output(directive.render()?))
            }
        }
        HiddenCommand::Action { name, selection } => {
            let output = app.actions.dispatch(app, name, selection)?;
            Ok(Response::from_text(output))
        }
        HiddenCommand::Preview { selection } => {
            let output = app.actions.dispatch(app, PREVIEW_ACTION, selection)?;
            Ok(Response::from_text(output))
        }
        HiddenCommand::QueryPreview { query } => {
            let output = app.actions.dispatch(app, QUERY_PREVIEW_ACTION, query)?;
            Ok(Response::from_text(output))
        }
        HiddenCommand::Reload => {
            let command = reload_command(app);
            tracing::debug!(command = %command, "reloading");
            Ok(Response::Status(app.orchestrator().run_direct(&command)?))
        }
        HiddenCommand::Filter { name } => Ok(Response::Output(app.select_filter(name)?)),
        HiddenCommand::Custom { name, args } => {
            let Some(custom) = app.commands.iter().find(|c| c.name == *name) else {
                tracing::debug!(command = %name, "no such command, ignoring");
                return Ok(Response::Silent);
            };
            let output = (custom.handler)(app, args)?;
            Ok(Response::from_text(output))
        }
    }
}

/// Command a reload re-runs.
///
/// Inside a session in query mode the persisted command is the live one
/// (it changes on every toggle back and on filter switches). Otherwise the
/// declared reload command is used.
fn reload_command(app: &App) -> String {
    let declared = app.options.effective_reload_command();
    let declared = if declared.trim().is_empty() {
        app.initial_command()
    } else {
        declared.to_string()
    };

    let live = app
        .session_store()
        .ok()
        .and_then(|(store, _)| store.load().ok().flatten())
        .filter(|state: &SessionState| state.mode == ToggleMode::Query)
        .map(|state| state.command)
        .filter(|command| !command.trim().is_empty());

    match live {
        Some(command) if command != app.options.command => command,
        _ => declared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::FinderOptions;
    use crate::registry::{Action, Filter};
    use crate::storage::FileStore;
    use crate::Config;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    fn app_in_session(path: &Path, query: &str) -> App {
        let config = Config {
            state_path: Some(path.to_path_buf()),
            query: query.to_string(),
            shell: "sh".to_string(),
            ..Config::default()
        };
        let mut app = App::with_script("t", "/bin/t", config);
        app.main(FinderOptions::new("ls -la"));
        app
    }

    fn write_state(path: &Path, state: &SessionState) {
        FileStore::<SessionState>::new(path).save(state).unwrap();
    }

    #[test]
    fn toggle_reads_query_from_environment_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        write_state(&path, &SessionState::new(ToggleMode::Query, "hello", "ls -la"));

        let app = app_in_session(&path, "world");
        let response = handle_command(&app, &HiddenCommand::Toggle { typed: None }).unwrap();
        assert_eq!(
            response,
            Response::Output(
                "disable-search+change-query(ls -la)+change-footer(world)+change-prompt(> )"
                    .to_string()
            )
        );

        let saved = FileStore::<SessionState>::new(&path).load().unwrap();
        assert_eq!(saved, Some(SessionState::new(ToggleMode::Command, "hello", "world")));
    }

    #[test]
    fn toggle_without_state_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in_session(&dir.path().join("gone"), "x");
        assert!(handle_command(&app, &HiddenCommand::Toggle { typed: None }).is_err());
    }

    #[test]
    fn on_change_is_silent_in_query_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        write_state(&path, &SessionState::initial("ls"));

        let app = app_in_session(&path, "abc");
        let response = handle_command(&app, &HiddenCommand::OnChange { typed: None }).unwrap();
        assert_eq!(response, Response::Silent);

        write_state(&path, &SessionState::new(ToggleMode::Command, "", "ls"));
        let response = handle_command(&app, &HiddenCommand::OnChange { typed: None }).unwrap();
        assert_eq!(response, Response::Output("reload(eval abc 2>/dev/null)".to_string()));
    }

    #[test]
    fn unknown_action_prints_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in_session(&dir.path().join("state"), "");
        let response = handle_command(
            &app,
            &HiddenCommand::Action {
                name: "missing".to_string(),
                selection: "x".to_string(),
            },
        )
        .unwrap();
        assert_eq!(response, Response::Silent);
        assert_eq!(response.emit().unwrap(), 0);
    }

    #[test]
    fn action_receives_selection() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Rc::new(RefCell::new(String::new()));
        let mut app = app_in_session(&dir.path().join("state"), "");
        let sink = Rc::clone(&seen);
        app.action(
            "pick",
            Action::new("enter", move |_, selection| {
                sink.borrow_mut().push_str(selection);
                Ok(())
            }),
        );

        let command = HiddenCommand::Action {
            name: "pick".to_string(),
            selection: "1234 bash".to_string(),
        };
        assert_eq!(handle_command(&app, &command).unwrap(), Response::Silent);
        assert_eq!(*seen.borrow(), "1234 bash");
    }

    #[test]
    fn preview_output_is_printed() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in_session(&dir.path().join("state"), "");
        app.preview(|_, line| Ok(format!("details for {line}")));
        let response = handle_command(
            &app,
            &HiddenCommand::Preview {
                selection: "42".to_string(),
            },
        )
        .unwrap();
        assert_eq!(response, Response::Output("details for 42".to_string()));
    }

    #[test]
    fn filter_command_persists_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        write_state(&path, &SessionState::initial("ps aux"));

        let mut app = app_in_session(&path, "");
        app.filter(Filter::new("all", "ps aux").default())
            .filter(Filter::new("listening", "lsof -i").footer("lsof [listening]"));

        let response = handle_command(
            &app,
            &HiddenCommand::Filter {
                name: "listening".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            response,
            Response::Output(
                "reload(eval 'lsof -i' 2>/dev/null)+change-footer(lsof [listening])".to_string()
            )
        );
        assert_eq!(app.current_filter().as_deref(), Some("listening"));
        assert_eq!(reload_command(&app), "lsof -i");
    }

    #[test]
    fn reload_prefers_live_command_in_query_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        let app = app_in_session(&path, "");

        assert_eq!(reload_command(&app), "ls -la");

        write_state(&path, &SessionState::new(ToggleMode::Query, "ls -la", "ls -1"));
        assert_eq!(reload_command(&app), "ls -1");

        write_state(&path, &SessionState::new(ToggleMode::Command, "", "half typed"));
        assert_eq!(reload_command(&app), "ls -la");
    }

    #[test]
    fn reload_runs_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in_session(&dir.path().join("state"), "");
        app.main(FinderOptions::new("true").reload_command("exit 4"));
        assert_eq!(
            handle_command(&app, &HiddenCommand::Reload).unwrap(),
            Response::Status(4)
        );
    }

    #[test]
    fn custom_command_gets_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in_session(&dir.path().join("state"), "");
        app.command("_echo", |_, args| Ok(Some(args.join(","))));
        let response = handle_command(
            &app,
            &HiddenCommand::Custom {
                name: "_echo".to_string(),
                args: vec!["a".to_string(), "b c".to_string()],
            },
        )
        .unwrap();
        assert_eq!(response, Response::Output("a,b c".to_string()));
    }

    #[test]
    fn legacy_state_line_toggles_into_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        std::fs::write(&path, "query|hello|ls -la").unwrap();

        let app = app_in_session(&path, "world");
        handle_command(&app, &HiddenCommand::Toggle { typed: None }).unwrap();

        let saved = FileStore::<SessionState>::new(&path).load().unwrap();
        assert_eq!(saved, Some(SessionState::new(ToggleMode::Command, "hello", "world")));
        assert!(std::fs::read_to_string(&path).unwrap().starts_with('{'));
    }
}

