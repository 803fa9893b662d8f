//! TOML picker definitions.
//!
//! A picker file declares everything the [`App`] builder would otherwise be
//! given in code: the producer command, finder options, shell-command actions,
//! a preview and named filters.
//!
//! # Format
//!
//! ```toml
//! command = "ps -U $USER -o pid,command"
//! header_lines = 1
//! preview = "ps -p \"$1\" -o pid,ppid,user,%cpu,%mem,command"
//! fzf_options = ["--height", "60%"]
//!
//! [[bindings]]
//! key = "ctrl-y"
//! action = "execute-silent(echo {} | pbcopy)"
//!
//! [[actions]]
//! name = "kill"
//! key = "ctrl-k"
//! run = "kill \"$1\""
//! description = "Terminate process"
//! field = 1
//! reload = true
//! silent = true
//!
//! [[filters]]
//! name = "mine"
//! command = "ps -U $USER -o pid,command"
//! default = true
//! ```
//!
//! Scripts in `run` and `preview` receive the selection (or the query in
//! preview mode) as `$1`.

use crate::app::App;
use crate::compiler::{FinderOptions, PREVIEW_ACTION, QUERY_PREVIEW_ACTION};
use crate::domain::error::{FzfuiError, Result};
use crate::infrastructure::process::{capture_script, run_script};
use crate::registry::{Action, Filter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Longest a preview script may run.
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(10);

/// A whole picker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PickerFile {
    /// Producer command. May be empty when filters are declared.
    pub command: String,
    /// Sticky header lines.
    pub header_lines: usize,
    /// Displayed fields.
    pub with_nth: Option<String>,
    /// Command run by reload bindings.
    pub reload_command: Option<String>,
    /// Preview mode.
    pub disabled: bool,
    /// Initial input line.
    pub initial_query: String,
    /// Prompt in preview mode.
    pub prompt: Option<String>,
    /// Preview window layout.
    pub preview_window: Option<String>,
    /// Preview script; gets the selection (or query) as `$1`.
    pub preview: Option<String>,
    /// Extra finder bindings, in order.
    pub bindings: Vec<BindingSpec>,
    /// Raw finder flags.
    pub fzf_options: Vec<String>,
    /// Shell-command actions.
    pub actions: Vec<ActionSpec>,
    /// Named filters.
    pub filters: Vec<FilterSpec>,
}

/// A verbatim `key:action` finder binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    /// Key chord.
    pub key: String,
    /// Finder action expression.
    pub action: String,
}

/// An action running a shell script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpec {
    /// Registry name.
    pub name: String,
    /// Key chord.
    pub key: String,
    /// Script; gets the selection as `$1`.
    pub run: String,
    /// Help text.
    #[serde(default)]
    pub description: String,
    /// Reload the item list afterwards.
    #[serde(default)]
    pub reload: bool,
    /// Run without suspending the finder.
    #[serde(default)]
    pub silent: bool,
    /// Exit the finder afterwards.
    #[serde(default)]
    pub exit: bool,
    /// 1-based column passed as `$1`.
    #[serde(default)]
    pub field: usize,
}

/// A named filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    /// Unique name.
    pub name: String,
    /// Producer command.
    pub command: String,
    /// Footer text; the command when absent.
    #[serde(default)]
    pub footer: Option<String>,
    /// Active when nothing else was selected.
    #[serde(default)]
    pub default: bool,
    /// Flags that run the filter without the finder (`-l`, `--listening`).
    #[serde(default)]
    pub cli: Vec<String>,
}

impl PickerFile {
    /// Reads and validates a picker file.
    ///
    /// # Errors
    ///
    /// [`FzfuiError::Config`] if the file cannot be read, parsed, or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            FzfuiError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Parses and validates picker TOML.
    ///
    /// # Errors
    ///
    /// [`FzfuiError::Config`] on invalid TOML or an incomplete definition.
    ///
    /// # Example
    ///
    /// ```
    /// use fzfui::config::PickerFile;
    ///
    /// let picker = PickerFile::parse(r#"
    ///     command = "ls -1"
    ///     [[actions]]
    ///     name = "open"
    ///     key = "enter"
    ///     run = "xdg-open \"$1\""
    ///     exit = true
    /// "#)?;
    /// assert_eq!(picker.actions[0].name, "open");
    /// # Ok::<(), fzfui::FzfuiError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let picker: Self = toml::from_str(text)
            .map_err(|e| FzfuiError::Config(format!("failed to parse picker TOML: {e}")))?;
        picker.validate()?;
        Ok(picker)
    }

    /// Checks the definition is runnable.
    ///
    /// # Errors
    ///
    /// [`FzfuiError::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !self.disabled && self.command.trim().is_empty() && self.filters.is_empty() {
            return Err(FzfuiError::Config(
                "a filter-mode picker needs `command` or at least one filter".to_string(),
            ));
        }
        for action in &self.actions {
            if action.name.is_empty() || action.name.contains(char::is_whitespace) {
                return Err(FzfuiError::Config(format!(
                    "invalid action name {:?}",
                    action.name
                )));
            }
            if action.name == PREVIEW_ACTION || action.name == QUERY_PREVIEW_ACTION {
                return Err(FzfuiError::Config(format!(
                    "action name {:?} is reserved",
                    action.name
                )));
            }
        }
        for filter in &self.filters {
            if filter.name.is_empty() {
                return Err(FzfuiError::Config("filter without a name".to_string()));
            }
        }
        Ok(())
    }

    fn initial_command(&self) -> String {
        if !self.command.trim().is_empty() {
            return self.command.clone();
        }
        self.filters
            .iter()
            .find(|f| f.default)
            .or_else(|| self.filters.first())
            .map(|f| f.command.clone())
            .unwrap_or_default()
    }

    /// Finder options described by this file.
    #[must_use]
    pub fn finder_options(&self) -> FinderOptions {
        let base = if self.disabled {
            FinderOptions::preview_mode()
        } else {
            FinderOptions::new(self.initial_command())
        };
        let mut options = FinderOptions {
            header_lines: self.header_lines,
            with_nth: self.with_nth.clone(),
            reload_command: self.reload_command.clone(),
            initial_query: self.initial_query.clone(),
            prompt: self.prompt.clone(),
            preview_window: self.preview_window.clone(),
            fzf_options: self.fzf_options.clone(),
            ..base
        };
        options.bindings = self
            .bindings
            .iter()
            .map(|b| (b.key.clone(), b.action.clone()))
            .collect();
        options
    }

    /// Registers this picker's options, actions, preview and filters on `app`.
    pub fn configure(&self, app: &mut App) {
        app.main(self.finder_options());

        for filter in &self.filters {
            let mut registered = Filter::new(&filter.name, &filter.command).cli(filter.cli.clone());
            if let Some(footer) = &filter.footer {
                registered = registered.footer(footer);
            }
            if filter.default {
                registered = registered.default();
            }
            app.filter(registered);
        }

        for spec in &self.actions {
            let script = spec.run.clone();
            let name = spec.name.clone();
            let mut action = Action::new(&spec.key, move |app: &App, selection: &str| {
                let code = run_script(&app.config().shell, &script, selection)?;
                if code == 0 {
                    Ok(())
                } else {
                    Err(FzfuiError::Usage(format!(
                        "action `{name}` exited with status {code}"
                    )))
                }
            })
            .description(&spec.description)
            .field(spec.field);
            if spec.reload {
                action = action.reload();
            }
            if spec.silent {
                action = action.silent();
            }
            if spec.exit {
                action = action.exit();
            }
            app.action(&spec.name, action);
        }

        if let Some(script) = self.preview.clone() {
            let render = move |app: &App, text: &str| {
                capture_script(&app.config().shell, &script, text, PREVIEW_TIMEOUT)
            };
            if self.disabled {
                app.query_preview(render);
            } else {
                app.preview(render);
            }
        }

        tracing::debug!(
            actions = self.actions.len(),
            filters = self.filters.len(),
            disabled = self.disabled,
            "picker configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_keys() {
        let err = PickerFile::parse("command = \"ls\"\ncolour = \"red\"").unwrap_err();
        assert!(matches!(err, FzfuiError::Config(_)));
    }

    #[test]
    fn filter_mode_needs_a_command() {
        assert!(PickerFile::parse("header_lines = 1").is_err());
        assert!(PickerFile::parse("disabled = true").is_ok());
    }

    #[test]
    fn reserved_action_names_are_rejected() {
        let text = r#"
            command = "ls"
            [[actions]]
            name = "preview"
            key = "ctrl-p"
            run = "true"
        "#;
        assert!(PickerFile::parse(text).is_err());
    }

    #[test]
    fn default_filter_supplies_the_command() {
        let text = r#"
            [[filters]]
            name = "all"
            command = "ps aux"

            [[filters]]
            name = "mine"
            command = "ps -U me"
            default = true
            cli = ["-m", "--mine"]
        "#;
        let picker = PickerFile::parse(text).unwrap();
        assert_eq!(picker.finder_options().command, "ps -U me");
        assert_eq!(picker.filters[1].cli, vec!["-m", "--mine"]);
    }

    #[test]
    fn bindings_keep_file_order() {
        let text = r#"
            command = "ls"
            fzf_options = ["--height", "40%"]
            [[bindings]]
            key = "ctrl-z"
            action = "abort"
            [[bindings]]
            key = "ctrl-a"
            action = "select-all"
        "#;
        let options = PickerFile::parse(text).unwrap().finder_options();
        assert_eq!(
            options.bindings,
            vec![
                ("ctrl-z".to_string(), "abort".to_string()),
                ("ctrl-a".to_string(), "select-all".to_string()),
            ]
        );
        assert_eq!(options.fzf_options, vec!["--height", "40%"]);
        assert!(!options.disabled);
    }

    #[test]
    fn preview_mode_options() {
        let text = r#"
            disabled = true
            initial_query = "."
            prompt = "q> "
            preview = "echo \"$1\""
        "#;
        let options = PickerFile::parse(text).unwrap().finder_options();
        assert!(options.disabled);
        assert_eq!(options.initial_query, ".");
        assert_eq!(options.prompt.as_deref(), Some("q> "));
    }
}
