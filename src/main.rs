//! `fzfui`: run a picker described by a TOML file.
//!
//! ```sh
//! fzfui --config ~/.config/fzfui/procs.toml
//! ```
//!
//! The picker path is exported as the named argument `config`, so the hidden
//! sub-commands fzf spawns rebuild the same picker without any flags.

use fzfui::config::PickerFile;
use fzfui::observability::init_tracing;
use fzfui::{App, FzfuiError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const CONFIG_ARG: &str = "config";

/// Finds `--config PATH` or `--config=PATH`, rewriting the value to an
/// absolute path in place.
fn take_config_path(args: &mut [OsString], cwd: &Path) -> Option<PathBuf> {
    let flag = format!("--{CONFIG_ARG}");
    let prefix = format!("--{CONFIG_ARG}=");

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].to_string_lossy().into_owned();
        if arg == flag {
            let path = cwd.join(args.get(i + 1)?);
            args[i + 1] = path.clone().into_os_string();
            return Some(path);
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            let path = cwd.join(value);
            let mut rewritten = OsString::from(&prefix);
            rewritten.push(&path);
            args[i] = rewritten;
            return Some(path);
        }
        i += 1;
    }
    None
}

fn build(args: &mut [OsString]) -> Result<App> {
    let mut app = App::new("fzfui")?;
    app.about("Run an fzf picker described by a TOML file")
        .option(CONFIG_ARG, "Picker definition (TOML)");

    let cwd = std::env::current_dir()?;
    let path = take_config_path(args, &cwd).or_else(|| app.arg(CONFIG_ARG).map(PathBuf::from));

    match path {
        Some(path) => {
            let picker = PickerFile::from_file(&path)?;
            picker.configure(&mut app);
            tracing::debug!(path = %path.display(), "picker loaded");
        }
        // Let clap handle --help and friends.
        None if args.len() > 1 => {}
        None => {
            return Err(FzfuiError::Usage(
                "no picker given; run with --config FILE".to_string(),
            ))
        }
    }
    Ok(app)
}

fn main() {
    let mut args: Vec<OsString> = std::env::args_os().collect();

    let mut app = match build(&mut args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("[fzfui] {e}");
            std::process::exit(e.exit_code());
        }
    };

    init_tracing(app.config());
    let code = match app.run_from(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("[fzfui] {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}
