//! Process orchestrator.
//!
//! Launches the finder in one of two mutually exclusive modes:
//!
//! - **Filter mode**: the producer command runs under the shell and its stdout
//!   becomes the finder's stdin. A session state file is created first, its
//!   path exported as [`STATE_ENV`] so hidden sub-commands can find it, and it
//!   is removed when the session ends on every exit path.
//! - **Preview mode**: only the finder runs, fed a single empty line; the query
//!   drives a preview instead of selecting rows. No state file is created.
//!
//! The parent blocks until the finder exits and reports the finder's exit
//! code. A failing producer is not an error: the finder simply gets no items.

use crate::domain::error::Result;
use crate::domain::SessionState;
use crate::infrastructure::process::{exit_code, spawn_tool};
use crate::storage::{FileStore, StateStore};
use std::io::Write;
use std::process::{Command, Stdio};

/// Environment variable naming the session state file.
pub const STATE_ENV: &str = "FZFUI_STATE";

/// Environment variable fzf sets to the current input line.
pub const QUERY_ENV: &str = "FZF_QUERY";

/// Prefix of environment variables carrying named arguments.
pub const ARG_ENV_PREFIX: &str = "FZFUI_ARG_";

/// Programs used to run a session.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    finder: String,
    shell: String,
    env: Vec<(String, String)>,
}

impl Orchestrator {
    /// Runs `finder`, with producer commands evaluated by `shell -c`.
    pub fn new(finder: impl Into<String>, shell: impl Into<String>) -> Self {
        Self {
            finder: finder.into(),
            shell: shell.into(),
            env: Vec::new(),
        }
    }

    /// Adds a variable to the finder's environment (and so to every hidden
    /// sub-command it spawns).
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Runs a filter-mode session.
    ///
    /// SIGINT, SIGTERM and SIGHUP are held while the finder runs, so the state
    /// file is still removed when Ctrl-C reaches the launcher.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the shell or the finder is missing; I/O errors while
    /// creating the state file or waiting.
    pub fn run_filter(&self, command: &str, args: &[String]) -> Result<i32> {
        let state_file = tempfile::Builder::new().prefix("fzfui-").tempfile()?;
        let mut store = FileStore::<SessionState>::new(state_file.path());
        store.save(&SessionState::initial(command))?;

        let _span = tracing::debug_span!("filter_session",
            state = ?state_file.path(),
            command = %command
        )
        .entered();

        // Held before the finder starts so a signal sent from inside the
        // session cannot arrive first.
        #[cfg(unix)]
        let signals = crate::infrastructure::SignalGuard::hold()?;

        let mut producer = Command::new(&self.shell);
        producer
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        let mut producer = spawn_tool(&mut producer, &self.shell)?;
        let items = producer.stdout.take().map_or_else(Stdio::null, Stdio::from);

        let mut finder = Command::new(&self.finder);
        finder
            .args(args)
            .stdin(items)
            .env(STATE_ENV, state_file.path())
            .envs(self.env.iter().map(|(k, v)| (k, v)));

        let status = match spawn_tool(&mut finder, &self.finder) {
            Ok(mut child) => child.wait(),
            Err(e) => {
                let _ = producer.kill();
                let _ = producer.wait();
                return Err(e);
            }
        };

        // The producer may still be writing into a pipe nobody reads.
        let _ = producer.kill();
        let _ = producer.wait();
        #[cfg(unix)]
        drop(signals);

        let code = exit_code(status?);
        tracing::debug!(exit_code = code, "finder exited");
        Ok(code)
    }

    /// Runs a preview-mode session.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the finder is missing; I/O errors while waiting.
    pub fn run_preview(&self, args: &[String]) -> Result<i32> {
        let _span = tracing::debug_span!("preview_session").entered();

        let mut finder = Command::new(&self.finder);
        finder
            .args(args)
            .stdin(Stdio::piped())
            .env_remove(STATE_ENV)
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        let mut child = spawn_tool(&mut finder, &self.finder)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A finder that exits early closes the pipe; that is not an error.
            let _ = stdin.write_all(b"\n");
        }

        let code = exit_code(child.wait()?);
        tracing::debug!(exit_code = code, "finder exited");
        Ok(code)
    }

    /// Runs `command` without a finder, passing its output through.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the shell is missing.
    pub fn run_direct(&self, command: &str) -> Result<i32> {
        let mut child = Command::new(&self.shell);
        child
            .arg("-c")
            .arg(command)
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        let code = exit_code(spawn_tool(&mut child, &self.shell)?.wait()?);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FzfuiError;

    fn script_finder(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn filter_session_pipes_items_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().display();
        let finder = script_finder(&format!(
            "echo \"$FZFUI_STATE\" > {out}/path; cat \"$FZFUI_STATE\" > {out}/state; \
             cat > {out}/items; exit 3"
        ));

        let code = Orchestrator::new("sh", "sh")
            .run_filter("printf 'a\\nb\\n'", &finder)
            .unwrap();
        assert_eq!(code, 3);

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("items"), "a\nb\n");
        assert!(read("state").contains("printf"));
        assert!(!std::path::Path::new(read("path").trim()).exists());
    }

    #[test]
    fn interrupted_launcher_still_removes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().display();
        let finder = script_finder(&format!(
            "echo \"$FZFUI_STATE\" > {out}/path; kill -INT $PPID; sleep 1; exit 130"
        ));

        let code = Orchestrator::new("sh", "sh")
            .run_filter("true", &finder)
            .unwrap();
        assert_eq!(code, 130);

        let path = std::fs::read_to_string(dir.path().join("path")).unwrap();
        assert!(!std::path::Path::new(path.trim()).exists());
    }

    #[test]
    fn failing_producer_gives_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let finder = script_finder(&format!("cat > {}/items", dir.path().display()));
        let code = Orchestrator::new("sh", "sh")
            .run_filter("exit 1", &finder)
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("items")).unwrap(), "");
    }

    #[test]
    fn preview_session_feeds_one_empty_line_and_exports_env() {
        let finder = script_finder(
            "read line; test -z \"$line\" || exit 9; test -z \"$FZFUI_STATE\" || exit 8; \
             exit \"$FZFUI_ARG_code\"",
        );
        let code = Orchestrator::new("sh", "sh")
            .env("FZFUI_ARG_code", "4")
            .run_preview(&finder)
            .unwrap();
        assert_eq!(code, 4);
    }

    #[test]
    fn direct_run_reports_command_status() {
        let orchestrator = Orchestrator::new("fzf", "sh");
        assert_eq!(orchestrator.run_direct("exit 6").unwrap(), 6);
    }

    #[test]
    fn missing_finder_is_reported() {
        let err = Orchestrator::new("fzfui-no-such-finder", "sh")
            .run_filter("true", &[])
            .unwrap_err();
        assert!(matches!(err, FzfuiError::ToolNotFound(name) if name == "fzfui-no-such-finder"));
    }
}
