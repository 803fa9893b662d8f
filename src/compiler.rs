//! Binding compiler.
//!
//! Turns a declarative [`FinderOptions`] plus the registered actions into the
//! argument vector passed to the finder. The output is pure data; nothing is
//! spawned here.
//!
//! # Ordering
//!
//! Generated flags come first, action bindings follow in registration order,
//! then custom key bindings, and raw pass-through options always come last so
//! they override anything generated (the finder applies flags left to right).
//!
//! # Example
//!
//! ```
//! use fzfui::compiler::{BindingCompiler, FinderOptions};
//! use fzfui::registry::{Action, ActionRegistry};
//!
//! let options = FinderOptions::new("ps aux").fzf_option("--height=50%");
//! let mut actions = ActionRegistry::<()>::new();
//! actions.register("kill", Action::new("ctrl-k", |_, _| Ok(())).reload().silent());
//!
//! let args = BindingCompiler::new("/bin/psi", "bash", &options, &actions).filter_mode()?;
//! assert!(args.contains(
//!     &"ctrl-k:execute-silent(/bin/psi _action kill {})+reload(/bin/psi _reload)".to_string()
//! ));
//! assert_eq!(args.last().map(String::as_str), Some("--height=50%"));
//! # Ok::<(), fzfui::FzfuiError>(())
//! ```

use crate::directive::wrap;
use crate::domain::error::Result;
use crate::registry::{Action, ActionRegistry};
use crate::session::QUERY_PROMPT;

/// Hidden sub-command: flip query/command mode.
pub const TOGGLE_COMMAND: &str = "_toggle";
/// Hidden sub-command: input line changed.
pub const ON_CHANGE_COMMAND: &str = "_on-change";
/// Hidden sub-command: run a registered action.
pub const ACTION_COMMAND: &str = "_action";
/// Hidden sub-command: selection preview.
pub const PREVIEW_COMMAND: &str = "_preview";
/// Hidden sub-command: query preview.
pub const QUERY_PREVIEW_COMMAND: &str = "_query-preview";
/// Hidden sub-command: re-run the producer command.
pub const RELOAD_COMMAND: &str = "_reload";
/// Hidden sub-command: switch named filter.
pub const FILTER_COMMAND: &str = "_filter";

/// Registry name of the selection preview handler.
pub const PREVIEW_ACTION: &str = "preview";
/// Registry name of the query preview handler.
pub const QUERY_PREVIEW_ACTION: &str = "query-preview";

/// Key that flips query/command mode.
pub const TOGGLE_KEY: &str = "ctrl-\\";
/// Key that shows or hides the selection preview.
pub const PREVIEW_KEY: &str = "ctrl-h";

const FILTER_PREVIEW_WINDOW: &str = "up,30%,hidden,wrap";
const QUERY_PREVIEW_WINDOW: &str = "up,80%,wrap";
const PREVIEW_MODE_PROMPT: &str = "> ";

/// Declarative description of a picker's finder session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinderOptions {
    /// Shell command producing the items. Unused in preview mode.
    pub command: String,
    /// Leading lines of the producer output kept as a sticky header.
    pub header_lines: usize,
    /// Finder field expression selecting the displayed columns (`"2.."`).
    pub with_nth: Option<String>,
    /// Command run by reload bindings; defaults to `command`.
    pub reload_command: Option<String>,
    /// Preview mode: the query drives a preview instead of filtering items.
    pub disabled: bool,
    /// Text placed in the input line at start.
    pub initial_query: String,
    /// Prompt for preview mode.
    pub prompt: Option<String>,
    /// Preview window layout; each mode has its own default.
    pub preview_window: Option<String>,
    /// Extra `key:action` bindings passed through verbatim.
    pub bindings: Vec<(String, String)>,
    /// Raw finder flags appended last.
    pub fzf_options: Vec<String>,
}

impl FinderOptions {
    /// Filter-mode options producing items with `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Preview-mode options (no producer command).
    #[must_use]
    pub fn preview_mode() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Sets the number of header lines.
    #[must_use]
    pub const fn header_lines(mut self, lines: usize) -> Self {
        self.header_lines = lines;
        self
    }

    /// Sets the displayed field expression.
    #[must_use]
    pub fn with_nth(mut self, fields: impl Into<String>) -> Self {
        self.with_nth = Some(fields.into());
        self
    }

    /// Sets the reload command.
    #[must_use]
    pub fn reload_command(mut self, command: impl Into<String>) -> Self {
        self.reload_command = Some(command.into());
        self
    }

    /// Sets the initial query.
    #[must_use]
    pub fn initial_query(mut self, query: impl Into<String>) -> Self {
        self.initial_query = query.into();
        self
    }

    /// Sets the preview-mode prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets the preview window layout.
    #[must_use]
    pub fn preview_window(mut self, layout: impl Into<String>) -> Self {
        self.preview_window = Some(layout.into());
        self
    }

    /// Adds a verbatim `key:action` binding.
    #[must_use]
    pub fn bind(mut self, key: impl Into<String>, action: impl Into<String>) -> Self {
        self.bindings.push((key.into(), action.into()));
        self
    }

    /// Appends one raw finder flag or flag value.
    #[must_use]
    pub fn fzf_option(mut self, option: impl Into<String>) -> Self {
        self.fzf_options.push(option.into());
        self
    }

    /// The command reload bindings run.
    #[must_use]
    pub fn effective_reload_command(&self) -> &str {
        self.reload_command
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.command)
    }
}

/// Builds finder argument vectors.
#[derive(Debug)]
pub struct BindingCompiler<'a, C> {
    self_command: &'a str,
    shell: &'a str,
    options: &'a FinderOptions,
    actions: &'a ActionRegistry<C>,
}

impl<'a, C> BindingCompiler<'a, C> {
    /// `self_command` is the shell-ready path of the running program; hidden
    /// sub-commands are appended to it.
    pub const fn new(
        self_command: &'a str,
        shell: &'a str,
        options: &'a FinderOptions,
        actions: &'a ActionRegistry<C>,
    ) -> Self {
        Self {
            self_command,
            shell,
            options,
            actions,
        }
    }

    fn invoke(&self, sub: &str) -> String {
        format!("{} {sub}", self.self_command)
    }

    fn bind(args: &mut Vec<String>, key: &str, action: &str) {
        args.push("--bind".to_string());
        args.push(format!("{key}:{action}"));
    }

    /// Placeholder for the selected line in filter mode.
    fn selection_placeholder(&self) -> &'static str {
        if self.options.with_nth.is_some() {
            "{1}"
        } else {
            "{}"
        }
    }

    fn action_binding(&self, name: &str, action: &Action<C>, placeholder: &str, reload: &str) -> Result<String> {
        let verb = if action.silent {
            "execute-silent"
        } else {
            "execute"
        };
        let mut binding = wrap(verb, &self.invoke(&format!("{ACTION_COMMAND} {name} {placeholder}")))?;
        if action.reload {
            binding.push('+');
            binding.push_str(reload);
        }
        if action.exit {
            binding.push_str("+abort");
        }
        Ok(binding)
    }

    fn push_passthrough(&self, args: &mut Vec<String>) {
        for (key, action) in &self.options.bindings {
            Self::bind(args, key, action);
        }
        args.extend(self.options.fzf_options.iter().cloned());
    }

    /// Arguments for filter mode: producer output is piped in as items.
    ///
    /// # Errors
    ///
    /// `Usage` if a generated binding cannot be delimited (see [`wrap`]).
    pub fn filter_mode(&self) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "--ansi".into(),
            "--border".into(),
            "none".into(),
            "--no-separator".into(),
            "--footer".into(),
            self.options.command.clone(),
            "--prompt".into(),
            QUERY_PROMPT.into(),
            "--with-shell".into(),
            format!("{} -c", self.shell),
        ];
        Self::bind(&mut args, TOGGLE_KEY, &wrap("transform", &self.invoke(TOGGLE_COMMAND))?);
        Self::bind(&mut args, "change", &wrap("transform", &self.invoke(ON_CHANGE_COMMAND))?);

        if !self.options.initial_query.is_empty() {
            args.push("--query".into());
            args.push(self.options.initial_query.clone());
        }
        if self.options.header_lines > 0 {
            args.push("--header-lines".into());
            args.push(self.options.header_lines.to_string());
        }
        if let Some(fields) = &self.options.with_nth {
            args.push("--with-nth".into());
            args.push(fields.clone());
        }

        let placeholder = self.selection_placeholder();
        let reload = wrap("reload", &self.invoke(RELOAD_COMMAND))?;
        for (name, action) in self.actions.bound_actions() {
            let field = if action.field > 0 {
                format!("{{{}}}", action.field)
            } else {
                placeholder.to_string()
            };
            if let Some(key) = &action.key {
                let binding = self.action_binding(name, action, &field, &reload)?;
                Self::bind(&mut args, key, &binding);
            }
        }

        if self.actions.get(PREVIEW_ACTION).is_some() {
            args.push("--preview".into());
            args.push(self.invoke(&format!("{PREVIEW_COMMAND} {placeholder}")));
            args.push("--preview-window".into());
            args.push(
                self.options
                    .preview_window
                    .clone()
                    .unwrap_or_else(|| FILTER_PREVIEW_WINDOW.to_string()),
            );
            Self::bind(&mut args, PREVIEW_KEY, "toggle-preview");
        }

        self.push_passthrough(&mut args);
        tracing::debug!(arg_count = args.len(), "compiled filter-mode arguments");
        Ok(args)
    }

    /// Arguments for preview mode: the query drives a preview, no items.
    ///
    /// Actions receive the query. `reload` has no item list to refresh here,
    /// so it refreshes the preview instead.
    ///
    /// # Errors
    ///
    /// See [`BindingCompiler::filter_mode`].
    pub fn preview_mode(&self) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "--ansi".into(),
            "--disabled".into(),
            "--layout".into(),
            "reverse".into(),
            "--prompt".into(),
            self.options
                .prompt
                .clone()
                .unwrap_or_else(|| PREVIEW_MODE_PROMPT.to_string()),
            "--with-shell".into(),
            format!("{} -c", self.shell),
        ];

        if !self.options.initial_query.is_empty() {
            args.push("--query".into());
            args.push(self.options.initial_query.clone());
        }

        if self.actions.get(QUERY_PREVIEW_ACTION).is_some() {
            args.push("--preview".into());
            args.push(self.invoke(&format!("{QUERY_PREVIEW_COMMAND} {{q}}")));
            args.push("--preview-window".into());
            args.push(
                self.options
                    .preview_window
                    .clone()
                    .unwrap_or_else(|| QUERY_PREVIEW_WINDOW.to_string()),
            );
        }

        for (name, action) in self.actions.bound_actions() {
            if let Some(key) = &action.key {
                let binding = self.action_binding(name, action, "{q}", "refresh-preview")?;
                Self::bind(&mut args, key, &binding);
            }
        }

        self.push_passthrough(&mut args);
        tracing::debug!(arg_count = args.len(), "compiled preview-mode arguments");
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Action<()> {
        Action::new("x", |_, _| Ok(()))
    }

    fn bindings(args: &[String]) -> Vec<&str> {
        args.windows(2)
            .filter(|w| w[0] == "--bind")
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn filter_mode_emits_toggle_and_change_hooks() {
        let options = FinderOptions::new("ls");
        let actions = ActionRegistry::<()>::new();
        let args = BindingCompiler::new("/bin/app", "bash", &options, &actions).filter_mode().unwrap();
        assert_eq!(
            bindings(&args),
            vec![
                "ctrl-\\:transform(/bin/app _toggle)",
                "change:transform(/bin/app _on-change)",
            ]
        );
        assert!(args.windows(2).any(|w| w[0] == "--footer" && w[1] == "ls"));
        assert!(args.windows(2).any(|w| w[0] == "--with-shell" && w[1] == "bash -c"));
    }

    #[test]
    fn action_flags_shape_the_binding() {
        let options = FinderOptions::new("ps").with_nth("2..").header_lines(1);
        let mut actions = ActionRegistry::<()>::new();
        actions.register("detail", Action::new("enter", |_, _| Ok(())).field(1));
        actions.register("quit", Action::new("ctrl-q", |_, _| Ok(())).exit());
        actions.register("reload", Action::new("ctrl-r", |_, _| Ok(())).reload().silent());

        let args = BindingCompiler::new("/p", "bash", &options, &actions).filter_mode().unwrap();
        let binds = bindings(&args);
        assert_eq!(
            &binds[2..],
            &[
                "enter:execute(/p _action detail {1})",
                "ctrl-q:execute(/p _action quit {1})+abort",
                "ctrl-r:execute-silent(/p _action reload {1})+reload(/p _reload)",
            ]
        );
        assert!(args.windows(2).any(|w| w[0] == "--header-lines" && w[1] == "1"));
    }

    #[test]
    fn passthrough_options_come_last() {
        let options = FinderOptions::new("ls")
            .bind("ctrl-k", "kill-line")
            .fzf_option("--footer")
            .fzf_option("custom");
        let mut actions = ActionRegistry::<()>::new();
        actions.register("a", noop());
        actions.register("preview", Action::preview(|_, _| Ok(String::new())));

        let args = BindingCompiler::new("/p", "bash", &options, &actions).filter_mode().unwrap();
        let n = args.len();
        assert_eq!(&args[n - 2..], &["--footer".to_string(), "custom".to_string()]);
        assert_eq!(&args[n - 4..n - 2], &["--bind".to_string(), "ctrl-k:kill-line".to_string()]);
        assert!(args.windows(2).any(|w| w[0] == "--preview" && w[1] == "/p _preview {}"));
    }

    #[test]
    fn preview_mode_uses_query_placeholder() {
        let options = FinderOptions::preview_mode()
            .initial_query(".")
            .prompt("jq> ")
            .bind("enter", "transform(/p _enter {q})");
        let mut actions = ActionRegistry::<()>::new();
        actions.register("output", Action::new("enter", |_, _| Ok(())).exit());
        actions.register("query-preview", Action::preview(|_, _| Ok(String::new())));

        let args = BindingCompiler::new("/p", "bash", &options, &actions).preview_mode().unwrap();
        assert!(args.contains(&"--disabled".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--prompt" && w[1] == "jq> "));
        assert!(args.windows(2).any(|w| w[0] == "--query" && w[1] == "."));
        assert!(args.windows(2).any(|w| w[0] == "--preview" && w[1] == "/p _query-preview {q}"));
        assert!(args.windows(2).any(|w| w[0] == "--preview-window" && w[1] == "up,80%,wrap"));
        assert_eq!(
            bindings(&args),
            vec!["enter:execute(/p _action output {q})+abort", "enter:transform(/p _enter {q})"]
        );
    }

    #[test]
    fn reload_command_defaults_to_command() {
        assert_eq!(FinderOptions::new("ls").effective_reload_command(), "ls");
        assert_eq!(
            FinderOptions::new("ls").reload_command("ls -a").effective_reload_command(),
            "ls -a"
        );
    }
}
