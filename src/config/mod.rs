//! Runtime configuration.
//!
//! [`Config`] is a snapshot of the environment taken once per process. Every
//! hidden sub-command is a fresh process spawned by the finder, so the
//! environment is also how settings and named arguments reach them.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `FZFUI_FINDER` | finder binary | `fzf` |
//! | `FZFUI_SHELL` | shell for producer commands | `bash` |
//! | `FZFUI_LOG` | log level or filter directive | `RUST_LOG`, then `warn` |
//! | `FZFUI_DATA_DIR` | log directory | XDG state dir |
//! | `FZFUI_STATE` | session state file (set by the launcher) | |
//! | `FZF_QUERY` | input line text (set by fzf) | |
//! | `FZFUI_ARG_<name>` | named argument | |
//! | `LLM` | assistant command used by assist mode | |
//!
//! [`PickerFile`] describes a whole picker in TOML for the `fzfui` binary.

pub mod picker;

pub use picker::{ActionSpec, BindingSpec, FilterSpec, PickerFile};

use crate::infrastructure::paths::get_data_dir;
use crate::runtime::{ARG_ENV_PREFIX, QUERY_ENV, STATE_ENV};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default finder binary.
pub const DEFAULT_FINDER: &str = "fzf";

/// Default shell for producer and action commands.
pub const DEFAULT_SHELL: &str = "bash";

/// Settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Finder binary. Default: `fzf`
    pub finder: String,

    /// Shell running producer commands as `<shell> -c <command>`. Default: `bash`
    pub shell: String,

    /// Log level or `EnvFilter` directive (`debug`, `fzfui=trace`, ...).
    pub log_level: Option<String>,

    /// Log directory override.
    pub data_dir: Option<String>,

    /// Session state file, present inside a filter-mode session.
    pub state_path: Option<PathBuf>,

    /// Input line text at the moment fzf spawned this process.
    pub query: String,

    /// Named arguments, keyed without the `FZFUI_ARG_` prefix.
    pub args: BTreeMap<String, String>,

    /// Assistant command for assist mode.
    pub assistant: Option<String>,

    /// `$HOME`.
    pub home: Option<String>,

    /// `$XDG_STATE_HOME`.
    pub xdg_state_home: Option<String>,

    /// `$PATH`.
    pub search_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            finder: DEFAULT_FINDER.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            log_level: None,
            data_dir: None,
            state_path: None,
            query: String::new(),
            args: BTreeMap::new(),
            assistant: None,
            home: None,
            xdg_state_home: None,
            search_path: None,
        }
    }
}

impl Config {
    /// Builds a config from a map of environment variables.
    ///
    /// Empty values count as unset.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use fzfui::Config;
    ///
    /// let mut env = BTreeMap::new();
    /// env.insert("FZFUI_SHELL".to_string(), "zsh".to_string());
    /// env.insert("FZFUI_ARG_file".to_string(), "/tmp/data.json".to_string());
    /// env.insert("FZF_QUERY".to_string(), ".items".to_string());
    ///
    /// let config = Config::from_env(&env);
    /// assert_eq!(config.finder, "fzf");
    /// assert_eq!(config.shell, "zsh");
    /// assert_eq!(config.arg("file"), Some("/tmp/data.json"));
    /// assert_eq!(config.query, ".items");
    /// ```
    #[must_use]
    pub fn from_env(env: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

        let args = env
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ARG_ENV_PREFIX)
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect();

        Self {
            finder: get("FZFUI_FINDER").unwrap_or_else(|| DEFAULT_FINDER.to_string()),
            shell: get("FZFUI_SHELL").unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            log_level: get("FZFUI_LOG").or_else(|| get("RUST_LOG")),
            data_dir: get("FZFUI_DATA_DIR"),
            state_path: get(STATE_ENV).map(PathBuf::from),
            query: env.get(QUERY_ENV).cloned().unwrap_or_default(),
            args,
            assistant: get("LLM"),
            home: get("HOME"),
            xdg_state_home: get("XDG_STATE_HOME"),
            search_path: get("PATH"),
        }
    }

    /// Snapshot of the current process environment. Non-UTF-8 entries are
    /// skipped.
    #[must_use]
    pub fn from_process_env() -> Self {
        let env: BTreeMap<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::from_env(&env)
    }

    /// Directory holding the log file.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        get_data_dir(
            self.data_dir.as_deref(),
            self.xdg_state_home.as_deref(),
            self.home.as_deref(),
        )
    }

    /// A named argument.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}
