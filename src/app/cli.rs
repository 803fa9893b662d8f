//! Command-line surface built with clap's builder API.
//!
//! Hidden sub-commands and tool options are only known at run time, so the
//! command tree is assembled from the [`App`]'s registrations on every run.

use super::handler::HiddenCommand;
use super::App;
use crate::compiler::{
    ACTION_COMMAND, FILTER_COMMAND, ON_CHANGE_COMMAND, PREVIEW_COMMAND, QUERY_PREVIEW_COMMAND,
    RELOAD_COMMAND, TOGGLE_COMMAND,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeMap;

const TEXT_ARG: &str = "text";
const NAME_ARG: &str = "name";
const FILTER_ID_PREFIX: &str = "filter:";

/// What the parsed command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Start a session.
    Launch {
        /// Named arguments given as `--name VALUE`.
        args: BTreeMap<String, String>,
        /// Filter selected by a command-line alias.
        filter: Option<String>,
    },
    /// Answer the finder.
    Hidden(HiddenCommand),
}

/// Free text that may start with `-` and contain spaces.
fn text_arg() -> Arg {
    Arg::new(TEXT_ARG)
        .num_args(0..)
        .trailing_var_arg(true)
        .allow_hyphen_values(true)
}

/// Hidden sub-commands take raw selections, so `-h` is text, not a flag.
fn hidden(name: impl Into<String>) -> Command {
    Command::new(name.into()).hide(true).disable_help_flag(true)
}

fn alias_arg(filter: &str, aliases: &[String]) -> Option<Arg> {
    let mut arg = Arg::new(format!("{FILTER_ID_PREFIX}{filter}"))
        .action(ArgAction::SetTrue)
        .help(format!("Print the {filter} list without the finder"));
    let mut named = false;

    for alias in aliases {
        if let Some(long) = alias.strip_prefix("--") {
            arg = if arg.get_long().is_some() {
                arg.visible_alias(long.to_string())
            } else {
                arg.long(long.to_string())
            };
            named = true;
        } else if let Some(short) = alias.strip_prefix('-') {
            let mut chars = short.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                arg = if arg.get_short().is_some() {
                    arg.visible_short_alias(c)
                } else {
                    arg.short(c)
                };
                named = true;
            }
        }
    }

    named.then_some(arg)
}

/// Builds the clap command for `app`.
#[must_use]
pub fn build_command(app: &App) -> Command {
    let mut command = Command::new(app.name.clone())
        .disable_help_subcommand(true)
        .subcommand(hidden(TOGGLE_COMMAND).arg(text_arg()))
        .subcommand(hidden(ON_CHANGE_COMMAND).arg(text_arg()))
        .subcommand(
            hidden(ACTION_COMMAND)
                .arg(Arg::new(NAME_ARG).required(true))
                .arg(text_arg()),
        )
        .subcommand(hidden(PREVIEW_COMMAND).arg(text_arg()))
        .subcommand(hidden(QUERY_PREVIEW_COMMAND).arg(text_arg()))
        .subcommand(hidden(RELOAD_COMMAND))
        .subcommand(hidden(FILTER_COMMAND).arg(Arg::new(NAME_ARG).required(true)));

    if !app.about.is_empty() {
        command = command.about(app.about.clone());
    }

    for custom in &app.commands {
        command = command.subcommand(hidden(custom.name.clone()).arg(text_arg()));
    }

    for option in &app.cli_options {
        command = command.arg(
            Arg::new(option.name.clone())
                .long(option.name.clone())
                .value_name("VALUE")
                .help(option.help.clone()),
        );
    }

    for filter in app.filters.iter() {
        if let Some(arg) = alias_arg(&filter.name, &filter.cli_aliases) {
            command = command.arg(arg);
        }
    }

    command
}

fn text(matches: &ArgMatches) -> Option<String> {
    matches
        .get_many::<String>(TEXT_ARG)
        .map(|words| words.map(String::as_str).collect::<Vec<_>>().join(" "))
}

fn words(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>(TEXT_ARG)
        .map(|words| words.cloned().collect())
        .unwrap_or_default()
}

fn name(matches: &ArgMatches) -> String {
    matches.get_one::<String>(NAME_ARG).cloned().unwrap_or_default()
}

/// Interprets parsed matches against `app`'s registrations.
#[must_use]
pub fn invocation(app: &App, matches: &ArgMatches) -> Invocation {
    if let Some((sub, sub_matches)) = matches.subcommand() {
        let command = match sub {
            TOGGLE_COMMAND => HiddenCommand::Toggle {
                typed: text(sub_matches),
            },
            ON_CHANGE_COMMAND => HiddenCommand::OnChange {
                typed: text(sub_matches),
            },
            ACTION_COMMAND => HiddenCommand::Action {
                name: name(sub_matches),
                selection: text(sub_matches).unwrap_or_default(),
            },
            PREVIEW_COMMAND => HiddenCommand::Preview {
                selection: text(sub_matches).unwrap_or_default(),
            },
            QUERY_PREVIEW_COMMAND => HiddenCommand::QueryPreview {
                query: text(sub_matches).unwrap_or_default(),
            },
            RELOAD_COMMAND => HiddenCommand::Reload,
            FILTER_COMMAND => HiddenCommand::Filter {
                name: name(sub_matches),
            },
            other => HiddenCommand::Custom {
                name: other.to_string(),
                args: words(sub_matches),
            },
        };
        return Invocation::Hidden(command);
    }

    let args = app
        .cli_options
        .iter()
        .filter_map(|option| {
            matches
                .get_one::<String>(&option.name)
                .map(|value| (option.name.clone(), value.clone()))
        })
        .collect();

    let filter = app
        .filters
        .iter()
        .find(|filter| {
            !filter.cli_aliases.is_empty()
                && matches
                    .try_get_one::<bool>(&format!("{FILTER_ID_PREFIX}{}", filter.name))
                    .ok()
                    .flatten()
                    .copied()
                    .unwrap_or(false)
        })
        .map(|filter| filter.name.clone());

    Invocation::Launch { args, filter }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Filter;
    use crate::Config;

    fn app() -> App {
        let mut app = App::with_script("psi", "/bin/psi", Config::default());
        app.option("columns", "Extra columns")
            .filter(Filter::new("all", "ps aux").default())
            .filter(Filter::new("listening", "lsof -i").cli(["-l", "--listening"]))
            .command("_toggle-columns", |_, _| Ok(None));
        app
    }

    fn parse(app: &App, args: &[&str]) -> Invocation {
        let matches = build_command(app).try_get_matches_from(args).unwrap();
        invocation(app, &matches)
    }

    #[test]
    fn bare_invocation_launches() {
        let app = app();
        assert_eq!(
            parse(&app, &["psi"]),
            Invocation::Launch {
                args: BTreeMap::new(),
                filter: None
            }
        );
    }

    #[test]
    fn options_and_aliases() {
        let app = app();
        let Invocation::Launch { args, filter } = parse(&app, &["psi", "--columns", "cpu,mem", "-l"])
        else {
            panic!("expected launch");
        };
        assert_eq!(args.get("columns").map(String::as_str), Some("cpu,mem"));
        assert_eq!(filter.as_deref(), Some("listening"));

        let Invocation::Launch { filter, .. } = parse(&app, &["psi", "--listening"]) else {
            panic!("expected launch");
        };
        assert_eq!(filter.as_deref(), Some("listening"));
    }

    #[test]
    fn action_selection_may_look_like_a_flag() {
        let app = app();
        assert_eq!(
            parse(&app, &["psi", "_action", "kill", "-1"]),
            Invocation::Hidden(HiddenCommand::Action {
                name: "kill".to_string(),
                selection: "-1".to_string()
            })
        );
        assert_eq!(
            parse(&app, &["psi", "_action", "detail"]),
            Invocation::Hidden(HiddenCommand::Action {
                name: "detail".to_string(),
                selection: String::new()
            })
        );
    }

    #[test]
    fn help_flags_reach_hidden_handlers_as_text() {
        let app = app();
        assert_eq!(
            parse(&app, &["psi", "_action", "open", "--help"]),
            Invocation::Hidden(HiddenCommand::Action {
                name: "open".to_string(),
                selection: "--help".to_string()
            })
        );
        assert_eq!(
            parse(&app, &["psi", "_query-preview", "-h"]),
            Invocation::Hidden(HiddenCommand::QueryPreview {
                query: "-h".to_string()
            })
        );
        assert_eq!(
            parse(&app, &["psi", "_preview", "--help"]),
            Invocation::Hidden(HiddenCommand::Preview {
                selection: "--help".to_string()
            })
        );
    }

    #[test]
    fn toggle_without_text_reads_environment() {
        let app = app();
        assert_eq!(
            parse(&app, &["psi", "_toggle"]),
            Invocation::Hidden(HiddenCommand::Toggle { typed: None })
        );
    }

    #[test]
    fn custom_commands_are_routed() {
        let app = app();
        assert_eq!(
            parse(&app, &["psi", "_toggle-columns"]),
            Invocation::Hidden(HiddenCommand::Custom {
                name: "_toggle-columns".to_string(),
                args: Vec::new()
            })
        );
    }

    #[test]
    fn hidden_commands_stay_out_of_help() {
        let help = build_command(&app()).render_help().to_string();
        assert!(!help.contains("_toggle"));
        assert!(help.contains("--listening"));
        assert!(help.contains("--columns"));
    }
}
