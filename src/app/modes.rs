//! How a launch (an invocation without a hidden sub-command) runs.
//!
//! - **Filter**: the producer feeds the finder; the toggle protocol is live.
//! - **Preview**: the finder runs alone and the query drives a preview.
//! - **Direct**: a filter was selected by its command-line alias, so its
//!   command runs without the finder and its output passes through.

use super::App;
use crate::domain::error::{FzfuiError, Result};

/// Launch mode chosen from the app's options and command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Interactive item selection fed by `command`.
    Filter {
        /// Initial producer command.
        command: String,
    },
    /// Query-driven preview with no items.
    Preview,
    /// Non-interactive run of a filter's command.
    Direct {
        /// Command to run.
        command: String,
    },
}

impl LaunchMode {
    /// Picks the mode for `app`. `filter` names a filter selected by its
    /// command-line alias.
    ///
    /// # Errors
    ///
    /// [`FzfuiError::UnknownFilter`] for an unregistered filter, and
    /// [`FzfuiError::Config`] when a filter-mode app has nothing to run.
    pub fn select(app: &App, filter: Option<&str>) -> Result<Self> {
        if let Some(name) = filter {
            let filter = app
                .filters()
                .get(name)
                .ok_or_else(|| FzfuiError::UnknownFilter(name.to_string()))?;
            return Ok(Self::Direct {
                command: filter.command.clone(),
            });
        }

        if app.options().disabled {
            return Ok(Self::Preview);
        }

        let command = app.initial_command();
        if command.trim().is_empty() {
            return Err(FzfuiError::Config(format!(
                "{} has no producer command",
                app.name()
            )));
        }
        Ok(Self::Filter { command })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::FinderOptions;
    use crate::registry::Filter;
    use crate::Config;

    fn app() -> App {
        App::with_script("t", "/bin/t", Config::default())
    }

    #[test]
    fn alias_runs_filter_directly() {
        let mut app = app();
        app.main(FinderOptions::new("ps aux"))
            .filter(Filter::new("listening", "lsof -i").cli(["-l"]));
        assert_eq!(
            LaunchMode::select(&app, Some("listening")).unwrap(),
            LaunchMode::Direct {
                command: "lsof -i".to_string()
            }
        );
    }

    #[test]
    fn disabled_selects_preview() {
        let mut app = app();
        app.main(FinderOptions::preview_mode());
        assert_eq!(LaunchMode::select(&app, None).unwrap(), LaunchMode::Preview);
    }

    #[test]
    fn filter_mode_without_command_is_a_config_error() {
        assert!(matches!(
            LaunchMode::select(&app(), None),
            Err(FzfuiError::Config(_))
        ));
    }
}
