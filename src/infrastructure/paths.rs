//! Path utilities.
//!
//! Locations for fzfui's own files and lookups on `PATH`. Everything here
//! takes the relevant environment values as arguments so callers can resolve
//! paths from a [`Config`](crate::Config) snapshot instead of the live process
//! environment.

use std::path::{Path, PathBuf};

/// Returns the directory for fzfui's log files.
///
/// Resolution order: `override_dir`, then `$XDG_STATE_HOME/fzfui`, then
/// `$HOME/.local/state/fzfui`, then the system temp directory.
///
/// # Examples
///
/// ```
/// use fzfui::infrastructure::get_data_dir;
/// use std::path::PathBuf;
///
/// let dir = get_data_dir(None, None, Some("/home/me"));
/// assert_eq!(dir, PathBuf::from("/home/me/.local/state/fzfui"));
/// ```
#[must_use]
pub fn get_data_dir(
    override_dir: Option<&str>,
    xdg_state_home: Option<&str>,
    home: Option<&str>,
) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(state) = xdg_state_home.filter(|d| !d.is_empty()) {
        return PathBuf::from(state).join("fzfui");
    }
    home.filter(|h| !h.is_empty()).map_or_else(
        || std::env::temp_dir().join("fzfui"),
        |h| PathBuf::from(h).join(".local").join("state").join("fzfui"),
    )
}

/// Expands a leading `~` against `home`.
///
/// # Examples
///
/// ```
/// use fzfui::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("~/.jqi_history", Some("/home/me")), "/home/me/.jqi_history");
/// assert_eq!(expand_tilde("~", Some("/home/me")), "/home/me");
/// assert_eq!(expand_tilde("/absolute/path", Some("/home/me")), "/absolute/path");
/// assert_eq!(expand_tilde("~/x", None), "~/x");
/// ```
#[must_use]
pub fn expand_tilde(path: &str, home: Option<&str>) -> String {
    let Some(home) = home else {
        return path.to_string();
    };
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{rest}", home.trim_end_matches('/'))
    } else if path == "~" {
        home.to_string()
    } else {
        path.to_string()
    }
}

/// Finds an executable named `program` in the colon-separated `search_path`.
///
/// Names containing a `/` are checked as given.
#[must_use]
pub fn find_in_path(program: &str, search_path: Option<&str>) -> Option<PathBuf> {
    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }
    search_path?
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_xdg() {
        let dir = get_data_dir(Some("/tmp/logs"), Some("/state"), Some("/home/me"));
        assert_eq!(dir, PathBuf::from("/tmp/logs"));
        let dir = get_data_dir(None, Some("/state"), Some("/home/me"));
        assert_eq!(dir, PathBuf::from("/state/fzfui"));
    }

    #[test]
    fn tilde_expands_only_at_the_start() {
        assert_eq!(expand_tilde("~/.jqi_history", Some("/home/me/")), "/home/me/.jqi_history");
        assert_eq!(expand_tilde("~", Some("/home/me")), "/home/me");
        assert_eq!(expand_tilde("/a/~/b", Some("/home/me")), "/a/~/b");
        assert_eq!(expand_tilde("~/x", None), "~/x");
    }

    #[test]
    #[cfg(unix)]
    fn finds_sh_on_a_standard_path() {
        let found = find_in_path("sh", Some("/nonexistent:/bin:/usr/bin"));
        assert!(found.is_some());
        assert!(find_in_path("definitely-not-a-tool-xyz", Some("/bin:/usr/bin")).is_none());
        assert!(find_in_path("sh", None).is_none());
    }
}
