//! Assist-mode state machine.
//!
//! A tool that offers free-text assist (describe what you want, get an
//! expression back) runs a second two-state machine next to the finder:
//!
//! ```text
//!               toggle(q): save q, clear input
//!   Inactive ─────────────────────────────────────▶ Active{saved}
//!      ▲                                                │
//!      │  toggle:        restore saved                  │
//!      └──────────────── submit(request): transform ◀───┘
//!                        (saved, request), fall back to saved
//! ```
//!
//! Presence of the marker record encodes `Active`. Transitions happen only on
//! the assist toggle key and on enter while active.

use crate::directive::{Directive, FinderAction};
use crate::domain::error::{FzfuiError, Result};
use crate::domain::{AssistMarker, AssistState};
use crate::infrastructure::process::{spawn_tool, wait_with_timeout};
use crate::storage::StateStore;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Default time an external assistant may run.
pub const ASSIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prompts shown in and out of assist mode.
#[derive(Debug, Clone, Copy)]
pub struct AssistPrompts<'a> {
    /// Prompt for normal editing.
    pub normal: &'a str,
    /// Prompt while a free-text request is typed.
    pub assist: &'a str,
}

/// Reads the current assist state from `store`.
///
/// # Errors
///
/// Propagates store failures.
pub fn assist_state<S>(store: &S) -> Result<AssistState>
where
    S: StateStore<AssistMarker>,
{
    Ok(AssistState::from(store.load()?))
}

/// Handles the assist toggle key.
///
/// Entering stashes `query` and clears the input line. Leaving restores the
/// stash untouched.
///
/// # Errors
///
/// Propagates store failures.
pub fn toggle_assist<S>(store: &mut S, query: &str, prompts: AssistPrompts<'_>) -> Result<Directive>
where
    S: StateStore<AssistMarker>,
{
    match assist_state(store)? {
        AssistState::Active { saved } => {
            store.clear()?;
            tracing::debug!("assist mode left without request");
            Ok(Directive::new()
                .then(FinderAction::ChangePrompt(prompts.normal.to_string()))
                .then(FinderAction::ChangeQuery(saved)))
        }
        AssistState::Inactive => {
            store.save(&AssistMarker {
                saved: query.to_string(),
            })?;
            tracing::debug!("assist mode entered");
            Ok(Directive::new()
                .then(FinderAction::ChangePrompt(prompts.assist.to_string()))
                .then(FinderAction::ChangeQuery(String::new())))
        }
    }
}

/// Handles enter while assist mode may be active.
///
/// Returns `None` when assist mode is inactive so the caller can run its
/// regular enter behavior. Otherwise the marker is removed and `transform`
/// is given the stashed expression and the typed request; its result replaces
/// the input line. A failed or empty transform restores the stash.
///
/// # Errors
///
/// Propagates store failures only. Transform failures never escape.
pub fn submit_assist<S, F>(
    store: &mut S,
    request: &str,
    prompts: AssistPrompts<'_>,
    transform: F,
) -> Result<Option<Directive>>
where
    S: StateStore<AssistMarker>,
    F: FnOnce(&str, &str) -> Result<String>,
{
    let AssistState::Active { saved } = assist_state(store)? else {
        return Ok(None);
    };
    store.clear()?;

    let expression = match transform(&saved, request) {
        Ok(result) if !result.trim().is_empty() => result,
        Ok(_) => {
            tracing::debug!("assistant returned nothing, restoring expression");
            saved
        }
        Err(e) => {
            tracing::debug!(error = %e, "assistant failed, restoring expression");
            saved
        }
    };

    Ok(Some(
        Directive::new()
            .then(FinderAction::ChangePrompt(prompts.normal.to_string()))
            .then(FinderAction::ChangeQuery(expression))
            .then(FinderAction::RefreshPreview),
    ))
}

/// An opaque text-to-text function.
pub trait Assistant {
    /// Produces a response for `prompt`.
    ///
    /// # Errors
    ///
    /// Any failure; callers fall back to their pre-assist text.
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Assistant backed by an external shell command.
///
/// The prompt is appended to the command as one shell-quoted argument, and the
/// command's stdout is the response. A nonzero exit or a timeout is an error.
#[derive(Debug, Clone)]
pub struct ExternalAssistant {
    shell: String,
    command: String,
    timeout: Duration,
}

impl ExternalAssistant {
    /// Creates an assistant running `command` through `shell -c`.
    pub fn new(shell: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command: command.into(),
            timeout: ASSIST_TIMEOUT,
        }
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Assistant for ExternalAssistant {
    fn complete(&self, prompt: &str) -> Result<String> {
        let line = format!("{} {}", self.command, crate::directive::shell_quote(prompt)?);
        let _span = tracing::debug_span!("assist", command = %self.command).entered();

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        let child = spawn_tool(&mut command, &self.shell)?;

        let output = wait_with_timeout(child, self.timeout)?;
        if !output.status.success() {
            return Err(FzfuiError::Usage(format!(
                "assistant exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
