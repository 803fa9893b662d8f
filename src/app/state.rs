//! The application object tools build and run.

use super::cli::{self, Invocation};
use super::handler::handle_command;
use super::modes::LaunchMode;
use crate::compiler::{
    BindingCompiler, FinderOptions, PREVIEW_ACTION, PREVIEW_KEY, QUERY_PREVIEW_ACTION, TOGGLE_KEY,
};
use crate::config::Config;
use crate::directive::shell_quote;
use crate::domain::error::{FzfuiError, Result};
use crate::domain::SessionState;
use crate::observability::init_tracing;
use crate::registry::{Action, ActionRegistry, Filter, FilterSet};
use crate::runtime::{Orchestrator, ARG_ENV_PREFIX};
use crate::session;
use crate::storage::{FileStore, StateStore};
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Handler of a tool-defined hidden command. Receives the command's
/// arguments; returned text is printed to stdout.
pub type CommandFn = Box<dyn Fn(&App, &[String]) -> Result<Option<String>>>;

/// A tool-defined hidden command.
pub struct CustomCommand {
    /// Sub-command name, conventionally starting with `_`.
    pub name: String,
    /// The handler.
    pub handler: CommandFn,
}

impl std::fmt::Debug for CustomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A `--name VALUE` flag whose value becomes a named argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOption {
    /// Flag and argument name.
    pub name: String,
    /// Help text.
    pub help: String,
}

/// A picker: finder options, actions, previews, filters and hidden commands.
///
/// The same binary plays two roles. Run without a sub-command it launches
/// the finder; the finder then re-runs it with a hidden sub-command on every
/// bound key, and that invocation prints a directive or preview and exits.
/// Registrations must therefore be identical in every invocation, which is
/// why tools build their `App` unconditionally at the top of `main`.
///
/// # Example
///
/// ```no_run
/// use fzfui::compiler::FinderOptions;
/// use fzfui::registry::Action;
/// use fzfui::App;
///
/// let mut app = App::new("lsi")?;
/// app.main(FinderOptions::new("ls -la").header_lines(1))
///     .action(
///         "show",
///         Action::new("enter", |_, line| {
///             println!("{line}");
///             Ok(())
///         })
///         .exit(),
///     );
/// std::process::exit(app.run());
/// # Ok::<(), fzfui::FzfuiError>(())
/// ```
#[derive(Debug)]
pub struct App {
    pub(crate) name: String,
    pub(crate) about: String,
    pub(crate) script: PathBuf,
    pub(crate) config: Config,
    pub(crate) options: FinderOptions,
    pub(crate) actions: ActionRegistry<App>,
    pub(crate) filters: FilterSet,
    pub(crate) commands: Vec<CustomCommand>,
    pub(crate) cli_options: Vec<CliOption>,
}

impl App {
    /// An app named `name` re-invoking the running executable, configured
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if the path of the running executable cannot be determined.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let script = std::env::current_exe()?;
        Ok(Self::with_script(name, script, Config::from_process_env()))
    }

    /// An app re-invoking `script` with an explicit config.
    pub fn with_script(name: impl Into<String>, script: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            name: name.into(),
            about: String::new(),
            script: script.into(),
            config,
            options: FinderOptions::default(),
            actions: ActionRegistry::new(),
            filters: FilterSet::new(),
            commands: Vec::new(),
            cli_options: Vec::new(),
        }
    }

    /// Sets the `--help` description.
    pub fn about(&mut self, text: impl Into<String>) -> &mut Self {
        self.about = text.into();
        self
    }

    /// Sets the finder session description.
    pub fn main(&mut self, options: FinderOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Registers an action under `name`.
    pub fn action(&mut self, name: impl Into<String>, action: Action<Self>) -> &mut Self {
        self.actions.register(name, action);
        self
    }

    /// Registers the selection preview (filter mode).
    pub fn preview<F>(&mut self, render: F) -> &mut Self
    where
        F: Fn(&Self, &str) -> Result<String> + 'static,
    {
        self.actions.register(PREVIEW_ACTION, Action::preview(render));
        self
    }

    /// Registers the query preview (preview mode).
    pub fn query_preview<F>(&mut self, render: F) -> &mut Self
    where
        F: Fn(&Self, &str) -> Result<String> + 'static,
    {
        self.actions.register(QUERY_PREVIEW_ACTION, Action::preview(render));
        self
    }

    /// Registers a hidden sub-command.
    pub fn command<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Self, &[String]) -> Result<Option<String>> + 'static,
    {
        let name = name.into();
        self.commands.retain(|c| c.name != name);
        self.commands.push(CustomCommand {
            name,
            handler: Box::new(handler),
        });
        self
    }

    /// Registers a named filter.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.register(filter);
        self
    }

    /// Declares a `--name VALUE` flag stored as the named argument `name`.
    pub fn option(&mut self, name: impl Into<String>, help: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.cli_options.retain(|o| o.name != name);
        self.cli_options.push(CliOption {
            name,
            help: help.into(),
        });
        self
    }

    /// The app's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The executable that hidden sub-commands re-invoke.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Runtime settings.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The finder session description.
    #[must_use]
    pub const fn options(&self) -> &FinderOptions {
        &self.options
    }

    /// Registered actions.
    #[must_use]
    pub const fn actions(&self) -> &ActionRegistry<Self> {
        &self.actions
    }

    /// Registered filters.
    #[must_use]
    pub const fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// A named argument from `--name VALUE` or `FZFUI_ARG_<name>`.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.config.arg(name)
    }

    /// Sets a named argument; it is exported to every hidden sub-command.
    pub fn set_arg(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.config.args.insert(name.into(), value.into());
        self
    }

    /// The executable path quoted for the finder's shell.
    ///
    /// # Errors
    ///
    /// Fails if the path is not valid UTF-8 or contains a NUL byte.
    pub fn self_command(&self) -> Result<String> {
        let path = self.script.to_str().ok_or_else(|| {
            FzfuiError::Usage(format!("non UTF-8 executable path: {}", self.script.display()))
        })?;
        shell_quote(path)
    }

    /// A shell command line re-invoking this program with hidden `sub`,
    /// for use inside custom bindings (`transform(<this>)`).
    ///
    /// ```
    /// use fzfui::{App, Config};
    ///
    /// let app = App::with_script("jqi", "/usr/bin/jqi", Config::default());
    /// assert_eq!(app.hidden_invocation("_enter", "{q}")?, "/usr/bin/jqi _enter {q}");
    /// # Ok::<(), fzfui::FzfuiError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// See [`App::self_command`].
    pub fn hidden_invocation(&self, sub: &str, placeholder: &str) -> Result<String> {
        let mut line = format!("{} {sub}", self.self_command()?);
        if !placeholder.is_empty() {
            line.push(' ');
            line.push_str(placeholder);
        }
        Ok(line)
    }

    fn state_path(&self) -> Result<&Path> {
        self.config.state_path.as_deref().ok_or_else(|| {
            FzfuiError::Usage("no session state: FZFUI_STATE is not set".to_string())
        })
    }

    pub(crate) fn session_store(&self) -> Result<(FileStore<SessionState>, PathBuf)> {
        let path = self.state_path()?.to_path_buf();
        Ok((FileStore::new(&path), path))
    }

    /// Name of the active filter.
    ///
    /// Inside a session this is the persisted selection, falling back to the
    /// default filter; outside a session it is the default filter.
    #[must_use]
    pub fn current_filter(&self) -> Option<String> {
        let state = self
            .session_store()
            .ok()
            .and_then(|(store, _)| store.load().ok().flatten())
            .unwrap_or_default();
        session::current_filter(&state, &self.filters).map(String::from)
    }

    /// Makes `name` the active filter and returns the directive to print.
    ///
    /// # Errors
    ///
    /// `UnknownFilter`, or a missing or unreadable session state.
    pub fn select_filter(&self, name: &str) -> Result<String> {
        let (mut store, path) = self.session_store()?;
        let directive = session::apply_filter(&mut store, &path, &self.filters, name)?;
        directive.render()
    }

    /// Switches between two filters and returns the directive to print.
    ///
    /// # Errors
    ///
    /// See [`App::select_filter`].
    pub fn toggle_filter(&self, first: &str, second: &str) -> Result<String> {
        let (mut store, path) = self.session_store()?;
        let state = session::load_session(&store, &path)?;
        let (next, directive) = session::toggle_filter(&state, &self.filters, first, second)?;
        store.save(&next)?;
        directive.render()
    }

    /// Key reference for a help preview.
    ///
    /// Lists the built-in keys, every keyed action that has a description,
    /// then `extra` rows for bindings the tool wires up itself.
    #[must_use]
    pub fn help_text(&self, extra: &[(&str, &str)]) -> String {
        let mut rows: Vec<(&str, &str)> = Vec::new();
        if !self.options.disabled {
            rows.push((TOGGLE_KEY, "Toggle query/command mode"));
            if self.actions.get(PREVIEW_ACTION).is_some() {
                rows.push((PREVIEW_KEY, "Toggle this help"));
            }
        }
        for (_, action) in self.actions.bound_actions() {
            if let Some(key) = action.key.as_deref().filter(|_| !action.description.is_empty()) {
                rows.push((key, action.description.as_str()));
            }
        }
        rows.extend_from_slice(extra);

        let mut text = String::from("Keys:\n");
        for (key, description) in rows {
            let _ = writeln!(text, "  {key:<12} {description}");
        }
        text
    }

    /// Producer command the session starts with: the declared command, else
    /// the default (or first) filter's.
    pub(crate) fn initial_command(&self) -> String {
        if !self.options.command.trim().is_empty() {
            return self.options.command.clone();
        }
        self.filters
            .default_filter()
            .or_else(|| self.filters.iter().next())
            .map(|f| f.command.clone())
            .unwrap_or_default()
    }

    /// The finder argument vector for this app's mode.
    ///
    /// # Errors
    ///
    /// See [`App::self_command`] and [`BindingCompiler::filter_mode`].
    pub fn compile(&self) -> Result<Vec<String>> {
        let self_command = self.self_command()?;
        let mut options = self.options.clone();
        options.command = self.initial_command();
        let compiler = BindingCompiler::new(&self_command, &self.config.shell, &options, &self.actions);
        if options.disabled {
            compiler.preview_mode()
        } else {
            compiler.filter_mode()
        }
    }

    pub(crate) fn orchestrator(&self) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(&self.config.finder, &self.config.shell)
            .env("FZFUI_SHELL", &self.config.shell)
            .env("FZFUI_FINDER", &self.config.finder);
        for (name, value) in &self.config.args {
            orchestrator = orchestrator.env(format!("{ARG_ENV_PREFIX}{name}"), value);
        }
        orchestrator
    }

    fn launch(&self, mode: LaunchMode) -> Result<i32> {
        let orchestrator = self.orchestrator();
        tracing::debug!(app = %self.name, mode = ?mode, "launching");
        match mode {
            LaunchMode::Direct { command } => orchestrator.run_direct(&command),
            LaunchMode::Preview => orchestrator.run_preview(&self.compile()?),
            LaunchMode::Filter { command } => orchestrator.run_filter(&command, &self.compile()?),
        }
    }

    /// Parses `args` (program name first) and runs the launch or hidden
    /// sub-command they select. Returns the process exit code.
    ///
    /// `--help` and command-line errors are printed by clap and reported
    /// through the returned code.
    ///
    /// # Errors
    ///
    /// Anything the selected operation fails with.
    pub fn run_from<I, T>(&mut self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match cli::build_command(self).try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(e) => {
                let _ = e.print();
                return Ok(e.exit_code());
            }
        };

        match cli::invocation(self, &matches) {
            Invocation::Hidden(command) => {
                let _span = tracing::debug_span!("hidden_command", app = %self.name).entered();
                handle_command(self, &command)?.emit()
            }
            Invocation::Launch { args, filter } => {
                for (name, value) in args {
                    self.set_arg(name, value);
                }
                let mode = LaunchMode::select(self, filter.as_deref())?;
                self.launch(mode)
            }
        }
    }

    /// Runs with the process arguments, initializing logging first. Errors
    /// are reported on stderr as `[name] message`.
    pub fn run(&mut self) -> i32 {
        init_tracing(&self.config);
        match self.run_from(std::env::args_os()) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(app = %self.name, error = %e, "command failed");
                eprintln!("[{}] {e}", self.name);
                e.exit_code()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::with_script("t", "/opt/my tools/t", Config::default())
    }

    #[test]
    fn self_command_is_shell_quoted() {
        assert_eq!(app().self_command().unwrap(), "'/opt/my tools/t'");
    }

    #[test]
    fn help_text_lists_described_actions() {
        let mut app = app();
        app.main(FinderOptions::new("ls"))
            .action("kill", Action::new("ctrl-k", |_, _| Ok(())).description("Kill it"))
            .action("quiet", Action::new("ctrl-q", |_, _| Ok(())))
            .preview(|app, _| Ok(app.help_text(&[("ctrl-l", "Listening only")])));

        let help = app.help_text(&[("ctrl-l", "Listening only")]);
        assert_eq!(
            help,
            "Keys:\n  ctrl-\\       Toggle query/command mode\n  ctrl-h       Toggle this help\n  ctrl-k       Kill it\n  ctrl-l       Listening only\n"
        );
    }

    #[test]
    fn initial_command_falls_back_to_default_filter() {
        let mut app = app();
        app.filter(Filter::new("all", "ps aux"))
            .filter(Filter::new("mine", "ps -U me").default());
        assert_eq!(app.initial_command(), "ps -U me");

        app.main(FinderOptions::new("top -l1"));
        assert_eq!(app.initial_command(), "top -l1");
    }

    #[test]
    fn current_filter_outside_session_is_default() {
        let mut app = app();
        app.filter(Filter::new("all", "ps aux").default());
        assert_eq!(app.current_filter().as_deref(), Some("all"));
    }

    #[test]
    fn filter_switching_needs_a_session() {
        let mut app = app();
        app.filter(Filter::new("all", "ps aux"));
        assert!(matches!(app.select_filter("all"), Err(FzfuiError::Usage(_))));
    }

    #[test]
    fn compile_uses_filter_command_for_footer() {
        let mut app = app();
        app.filter(Filter::new("all", "ps aux").default());
        let args = app.compile().unwrap();
        assert!(args.windows(2).any(|w| w[0] == "--footer" && w[1] == "ps aux"));
    }

    fn shell_app() -> App {
        let config = Config {
            shell: "sh".to_string(),
            ..Config::default()
        };
        App::with_script("t", "/bin/t", config)
    }

    #[test]
    fn run_from_routes_hidden_reload() {
        let mut app = shell_app();
        app.main(FinderOptions::new("exit 5"));
        assert_eq!(app.run_from(["t", "_reload"]).unwrap(), 5);
    }

    #[test]
    fn run_from_runs_aliased_filter_without_finder() {
        let mut app = shell_app();
        app.main(FinderOptions::new("true"))
            .filter(Filter::new("listening", "exit 7").cli(["-l"]));
        assert_eq!(app.run_from(["t", "-l"]).unwrap(), 7);
    }

    #[test]
    fn run_from_reports_bad_flags_as_exit_code() {
        let mut app = shell_app();
        app.main(FinderOptions::new("true"));
        assert_eq!(app.run_from(["t", "--no-such-flag"]).unwrap(), 2);
    }

    #[test]
    fn run_from_stores_options_as_arguments() {
        let mut app = shell_app();
        app.option("columns", "Extra columns")
            .filter(Filter::new("listening", "true").cli(["-l"]));
        assert_eq!(app.run_from(["t", "--columns", "cpu", "-l"]).unwrap(), 0);
        assert_eq!(app.arg("columns"), Some("cpu"));
    }
}

