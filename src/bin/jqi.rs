//! `jqi`: interactive jq expression explorer.
//!
//! ```sh
//! cat data.json | jqi
//! ```
//!
//! The input line is a jq expression; the preview shows its result on the
//! piped JSON as you type.

use fzfui::compiler::{FinderOptions, ACTION_COMMAND};
use fzfui::directive::{wrap, Directive, FinderAction};
use fzfui::domain::{AssistMarker, AssistState};
use fzfui::infrastructure::{expand_tilde, spawn_tool, wait_with_timeout};
use fzfui::registry::Action;
use fzfui::session::{
    assist_state, submit_assist, toggle_assist, Assistant, AssistPrompts, ExternalAssistant,
};
use fzfui::storage::FileStore;
use fzfui::{App, FzfuiError, Result};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::NamedTempFile;

const USAGE: &str = "\
jqi - Interactive jq expression explorer

Usage: cat data.json | jqi

Type jq expressions and see results in real-time.
Start with \".\" (identity) to see the full JSON.

Keys:
    enter       Output jq result and exit
    ctrl-c      Print jq command (to stderr) and exit
    ctrl-\\      Assist: describe what you want in plain words ($LLM)
    alt-up/down Navigate history
    ctrl-k      Kill to end of line
    esc         Exit without output";

const PROMPTS: AssistPrompts<'static> = AssistPrompts {
    normal: "jq> ",
    assist: "llm> ",
};

const FILE_ARG: &str = "file";
const ASSIST_ARG: &str = "assist";
const ENTER_COMMAND: &str = "_enter";
const ASSIST_TOGGLE_COMMAND: &str = "_llm-toggle";
const HISTORY_FILE: &str = "~/.jqi_history";
const JQ_TIMEOUT: Duration = Duration::from_secs(5);
const SAMPLE_BYTES: u64 = 4000;

/// Files that live exactly as long as the launching process.
struct Session {
    _input: Option<NamedTempFile>,
    marker: PathBuf,
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.marker);
    }
}

fn is_hidden(args: &[OsString]) -> bool {
    args.get(1)
        .is_some_and(|arg| arg.to_string_lossy().starts_with('_'))
}

fn wants_help(args: &[OsString]) -> bool {
    args.iter().skip(1).any(|arg| arg == "-h" || arg == "--help")
}

/// Copies piped stdin to a temp file and picks the assist marker path.
///
/// Returns `None` when there is nothing to explore.
fn prepare(app: &mut App) -> Result<Option<Session>> {
    let mut input = None;
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        let mut file = tempfile::Builder::new()
            .prefix("jqi-")
            .suffix(".json")
            .tempfile()?;
        std::io::copy(&mut stdin.lock(), &mut file)?;
        file.flush()?;
        app.set_arg(FILE_ARG, file.path().to_string_lossy());
        input = Some(file);
    } else if app.arg(FILE_ARG).is_none() {
        return Ok(None);
    }

    let marker = app.arg(ASSIST_ARG).map_or_else(
        || std::env::temp_dir().join(format!("jqi-llm-{}.state", std::process::id())),
        PathBuf::from,
    );
    // A new session always starts outside assist mode.
    let _ = std::fs::remove_file(&marker);
    app.set_arg(ASSIST_ARG, marker.to_string_lossy());

    Ok(Some(Session {
        _input: input,
        marker,
    }))
}

fn marker_store(app: &App) -> Result<FileStore<AssistMarker>> {
    app.arg(ASSIST_ARG)
        .map(FileStore::new)
        .ok_or_else(|| FzfuiError::Usage("no assist marker path: FZFUI_ARG_assist is not set".into()))
}

fn history_path(app: &App) -> PathBuf {
    PathBuf::from(expand_tilde(HISTORY_FILE, app.config().home.as_deref()))
}

/// Appends `query` unless it is empty or repeats the last entry.
fn save_history(path: &Path, query: &str) -> Result<()> {
    if query.is_empty() {
        return Ok(());
    }
    let last = std::fs::read_to_string(path)
        .ok()
        .and_then(|text| text.lines().last().map(String::from));
    if last.as_deref() == Some(query) {
        return Ok(());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{query}")?;
    Ok(())
}

/// Leading bytes of the input, cut back to a line boundary when truncated.
fn json_sample(path: &Path) -> Option<String> {
    let mut buf = Vec::new();
    std::fs::File::open(path)
        .ok()?
        .take(SAMPLE_BYTES)
        .read_to_end(&mut buf)
        .ok()?;
    let content = String::from_utf8_lossy(&buf).into_owned();
    if buf.len() as u64 == SAMPLE_BYTES {
        let kept = content.rsplit_once('\n').map_or(content.as_str(), |(head, _)| head);
        Some(format!("{kept}\n... (truncated)"))
    } else {
        Some(content)
    }
}

fn build_assist_prompt(current: &str, request: &str, file: Option<&Path>) -> String {
    let sample = file
        .and_then(json_sample)
        .map(|content| format!("\nJSON data sample:\n```json\n{content}\n```\n"))
        .unwrap_or_default();

    format!(
        "Convert this natural language request into a valid jq expression.\n\
         {sample}\n\
         Current jq expression: {current}\n\
         Request: {request}\n\n\
         Respond with ONLY the jq expression, no explanation or markdown."
    )
}

/// Strips code fences and surrounding quotes from an assistant reply.
fn clean_response(response: &str) -> String {
    let mut text = response.trim().to_string();
    if text.starts_with("```") {
        let lines: Vec<&str> = text.split('\n').collect();
        let end = (1..lines.len())
            .rev()
            .find(|&i| lines[i].trim() == "```")
            .unwrap_or(lines.len());
        text = lines[1..end].join("\n");
    }
    let mut text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = &text[1..text.len() - 1];
        }
    }
    text.trim().to_string()
}

fn jq(query: &str, file: &str, color: bool) -> Command {
    let mut command = Command::new("jq");
    if color {
        command.arg("-C");
    }
    command
        .arg(query)
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

fn preview(app: &App, query: &str) -> Result<String> {
    let saved = marker_store(app)
        .and_then(|store| assist_state(&store))
        .ok()
        .and_then(|state| match state {
            AssistState::Active { saved } => Some(saved),
            AssistState::Inactive => None,
        });
    let query = saved.as_deref().unwrap_or(query);

    let Some(file) = app.arg(FILE_ARG) else {
        return Ok("Pipe JSON to stdin: cat data.json | jqi".to_string());
    };
    if !Path::new(file).exists() {
        return Ok(format!("File not found: {file}"));
    }

    let child = match spawn_tool(&mut jq(query, file, true), "jq") {
        Ok(child) => child,
        Err(FzfuiError::ToolNotFound(_)) => return Ok("jq not found; install jq".to_string()),
        Err(e) => return Err(e),
    };
    match wait_with_timeout(child, JQ_TIMEOUT) {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        Ok(output) => Ok(format!("jq error:\n{}", String::from_utf8_lossy(&output.stderr))),
        Err(FzfuiError::Usage(_)) => Ok("Query timed out".to_string()),
        Err(e) => Err(e),
    }
}

fn output_result(app: &App, query: &str) -> Result<()> {
    save_history(&history_path(app), query)?;
    let Some(file) = app.arg(FILE_ARG) else {
        return Ok(());
    };
    let output = spawn_tool(&mut jq(query, file, false), "jq")?.wait_with_output()?;
    if output.status.success() {
        std::io::stdout().write_all(&output.stdout)?;
    }
    Ok(())
}

fn copy_command(app: &App, query: &str) -> Result<()> {
    save_history(&history_path(app), query)?;
    if let Err(e) = fzfui::clipboard::copy_to_clipboard(query) {
        tracing::warn!(error = %e, "clipboard copy failed");
    }
    eprintln!("jq '{query}'");
    Ok(())
}

fn enter(app: &App, query: &str) -> Result<String> {
    let mut store = marker_store(app)?;
    let submitted = submit_assist(&mut store, query, PROMPTS, |saved, request| {
        let command = app
            .config()
            .assistant
            .as_deref()
            .ok_or_else(|| FzfuiError::Config("LLM is not set".into()))?;
        let prompt = build_assist_prompt(saved, request, app.arg(FILE_ARG).map(Path::new));
        let reply = ExternalAssistant::new(&app.config().shell, command).complete(&prompt)?;
        Ok(clean_response(&reply))
    })?;

    match submitted {
        Some(directive) => directive.render(),
        None => {
            let output = app.hidden_invocation(ACTION_COMMAND, "output {q}")?;
            Directive::new()
                .then(FinderAction::Execute(output))
                .then(FinderAction::Abort)
                .render()
        }
    }
}

fn configure(app: &mut App) -> Result<()> {
    let enter_binding = wrap("transform", &app.hidden_invocation(ENTER_COMMAND, "{q}")?)?;
    let assist_binding = wrap("transform", &app.hidden_invocation(ASSIST_TOGGLE_COMMAND, "{q}")?)?;
    let history = history_path(app);

    app.about("Interactive jq expression explorer")
        .main(
            FinderOptions::preview_mode()
                .initial_query(".")
                .prompt(PROMPTS.normal)
                .bind("ctrl-k", "kill-line")
                .bind("alt-up", "prev-history")
                .bind("alt-down", "next-history")
                .bind("ctrl-\\", assist_binding)
                .bind("enter", enter_binding)
                .fzf_option("--history")
                .fzf_option(history.to_string_lossy()),
        )
        .command(ENTER_COMMAND, |app, args| enter(app, &args.join(" ")).map(Some))
        .command(ASSIST_TOGGLE_COMMAND, |app, args| {
            let mut store = marker_store(app)?;
            let directive = toggle_assist(&mut store, &args.join(" "), PROMPTS)?;
            directive.render().map(Some)
        })
        .query_preview(preview)
        .action(
            "output",
            Action::new("enter", output_result)
                .description("Output jq result and exit")
                .exit(),
        )
        .action(
            "copy",
            Action::new("ctrl-c", copy_command)
                .description("Print jq command and copy the expression")
                .exit(),
        );
    Ok(())
}

fn run(args: &[OsString]) -> Result<i32> {
    let mut app = App::new("jqi")?;

    let session = if is_hidden(args) || wants_help(args) {
        None
    } else {
        match prepare(&mut app)? {
            Some(session) => Some(session),
            None => {
                eprintln!("{USAGE}");
                return Ok(1);
            }
        }
    };

    configure(&mut app)?;
    let code = app.run();
    drop(session);
    Ok(code)
}

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let code = run(&args).unwrap_or_else(|e| {
        eprintln!("[jqi] {e}");
        e.exit_code()
    });
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fzfui::storage::StateStore;
    use fzfui::Config;

    fn app(dir: &Path) -> App {
        let mut config = Config {
            shell: "sh".to_string(),
            home: Some(dir.to_string_lossy().into_owned()),
            ..Config::default()
        };
        config.args.insert(
            ASSIST_ARG.to_string(),
            dir.join("marker").to_string_lossy().into_owned(),
        );
        let mut app = App::with_script("jqi", "/usr/bin/jqi", config);
        configure(&mut app).unwrap();
        app
    }

    #[test]
    fn hidden_invocations_are_detected() {
        let args: Vec<OsString> = ["jqi", "_enter", ".a"].iter().map(OsString::from).collect();
        assert!(is_hidden(&args));
        assert!(!is_hidden(&[OsString::from("jqi")]));
        assert!(wants_help(&[OsString::from("jqi"), OsString::from("--help")]));
    }

    #[test]
    fn history_skips_empty_and_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        save_history(&path, ".a").unwrap();
        save_history(&path, ".a").unwrap();
        save_history(&path, "").unwrap();
        save_history(&path, ".b").unwrap();
        save_history(&path, ".a").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ".a\n.b\n.a\n");
    }

    #[test]
    fn responses_lose_fences_and_quotes() {
        assert_eq!(clean_response("```jq\n.items[] | .name\n```"), ".items[] | .name");
        assert_eq!(clean_response("\".foo\""), ".foo");
        assert_eq!(clean_response("  '.bar'  "), ".bar");
        assert_eq!(clean_response(".plain"), ".plain");
    }

    #[test]
    fn prompt_includes_truncated_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        let line = format!("{}\n", "x".repeat(99));
        std::fs::write(&path, line.repeat(50)).unwrap();

        let prompt = build_assist_prompt(".", "names", Some(&path));
        assert!(prompt.contains("```json\n"));
        assert!(prompt.contains("\n... (truncated)\n```"));
        assert!(prompt.contains("Current jq expression: .\nRequest: names\n"));

        let bare = build_assist_prompt(".a", "b", None);
        assert!(!bare.contains("JSON data sample"));
    }

    #[test]
    fn small_sample_is_kept_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.json");
        std::fs::write(&path, "{\"a\": 1}").unwrap();
        assert_eq!(json_sample(&path).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn enter_outside_assist_outputs_and_exits() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        assert_eq!(
            enter(&app, ".a").unwrap(),
            "execute(/usr/bin/jqi _action output {q})+abort"
        );
    }

    #[test]
    fn assist_without_assistant_restores_expression() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let mut store = marker_store(&app).unwrap();

        let on = toggle_assist(&mut store, ".items", PROMPTS).unwrap();
        assert_eq!(on.render().unwrap(), "change-prompt(llm> )+change-query()");

        assert_eq!(
            enter(&app, "only names").unwrap(),
            "change-prompt(jq> )+change-query(.items)+refresh-preview"
        );
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn preview_without_input_explains_usage() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        assert_eq!(
            preview(&app, ".").unwrap(),
            "Pipe JSON to stdin: cat data.json | jqi"
        );
    }

    #[test]
    fn preview_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.set_arg(FILE_ARG, "/nonexistent/input.json");
        assert_eq!(
            preview(&app, ".").unwrap(),
            "File not found: /nonexistent/input.json"
        );
    }

    #[test]
    fn compiled_bindings_override_enter() {
        let dir = tempfile::tempdir().unwrap();
        let args = app(dir.path()).compile().unwrap();
        let binds: Vec<&str> = args
            .windows(2)
            .filter(|w| w[0] == "--bind")
            .map(|w| w[1].as_str())
            .collect();
        let enter_at = binds
            .iter()
            .rposition(|b| b.starts_with("enter:"))
            .unwrap();
        assert_eq!(binds[enter_at], "enter:transform(/usr/bin/jqi _enter {q})");
        assert!(binds.contains(&"ctrl-\\:transform(/usr/bin/jqi _llm-toggle {q})"));
        assert!(args.windows(2).any(|w| w[0] == "--query" && w[1] == "."));
    }
}
