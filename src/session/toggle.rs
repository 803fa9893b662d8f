//! Query/command mode toggle protocol.
//!
//! Pure transitions over [`SessionState`], plus thin `apply_*` helpers that
//! run a transition against a [`StateStore`].
//!
//! # Transitions
//!
//! ```text
//!            toggle(t)                          toggle(t)
//! Query(q, c) ───────▶ Command(q, t)   Command(q, c) ───────▶ Query(c, t)
//!   input line := c                      input line := q
//!   footer     := t                      footer     := t, reload t
//!   search off, prompt "> "              search on, prompt "/ "
//! ```
//!
//! `t` is the text in the finder's input line when the toggle key is pressed.
//! The on-change hook never writes state.

use crate::directive::{eval_command, Directive, FinderAction};
use crate::domain::error::{FzfuiError, Result};
use crate::domain::{SessionState, ToggleMode};
use crate::registry::FilterSet;
use crate::storage::StateStore;
use std::path::Path;

/// Prompt shown while the input line filters items.
pub const QUERY_PROMPT: &str = "/ ";

/// Prompt shown while the input line edits the producer command.
pub const COMMAND_PROMPT: &str = "> ";

/// Computes the next state and the directive for one toggle key press.
///
/// # Errors
///
/// Fails only if the new command cannot be shell-quoted.
///
/// # Example
///
/// ```
/// use fzfui::domain::{SessionState, ToggleMode};
/// use fzfui::session::toggle;
///
/// let (next, directive) = toggle(&SessionState::initial("ps aux"), "foo")?;
/// assert_eq!(next, SessionState::new(ToggleMode::Command, "", "foo"));
/// assert!(directive.render()?.starts_with("disable-search+change-query(ps aux)"));
/// # Ok::<(), fzfui::FzfuiError>(())
/// ```
pub fn toggle(state: &SessionState, typed: &str) -> Result<(SessionState, Directive)> {
    let mut next = state.clone();
    next.mode = state.mode.flipped();

    let directive = match state.mode {
        ToggleMode::Query => {
            next.command = typed.to_string();
            Directive::new()
                .then(FinderAction::DisableSearch)
                .then(FinderAction::ChangeQuery(state.command.clone()))
                .then(FinderAction::ChangeFooter(typed.to_string()))
                .then(FinderAction::ChangePrompt(COMMAND_PROMPT.to_string()))
        }
        ToggleMode::Command => {
            next.query.clone_from(&state.command);
            next.command = typed.to_string();
            Directive::new()
                .then(FinderAction::EnableSearch)
                .then(FinderAction::Reload(eval_command(typed)?))
                .then(FinderAction::ChangeQuery(state.query.clone()))
                .then(FinderAction::ChangeFooter(typed.to_string()))
                .then(FinderAction::ChangePrompt(QUERY_PROMPT.to_string()))
        }
    };

    tracing::debug!(from = state.mode.as_str(), to = next.mode.as_str(), "mode toggled");
    Ok((next, directive))
}

/// Directive for a change of the input line.
///
/// In command mode the edited text is re-run live as the producer command; in
/// query mode the finder filters by itself and the directive is empty.
///
/// # Errors
///
/// Fails only if the typed text cannot be shell-quoted.
pub fn on_change(state: &SessionState, typed: &str) -> Result<Directive> {
    match state.mode {
        ToggleMode::Query => Ok(Directive::new()),
        ToggleMode::Command => {
            Ok(Directive::new().then(FinderAction::Reload(eval_command(typed)?)))
        }
    }
}

/// Makes `name` the active filter.
///
/// The filter's command becomes the live producer command, and the directive
/// reloads it and shows the filter's footer.
///
/// # Errors
///
/// Returns [`FzfuiError::UnknownFilter`] for an unregistered name.
pub fn select_filter(
    state: &SessionState,
    filters: &FilterSet,
    name: &str,
) -> Result<(SessionState, Directive)> {
    let filter = filters
        .get(name)
        .ok_or_else(|| FzfuiError::UnknownFilter(name.to_string()))?;

    let mut next = state.clone();
    next.command.clone_from(&filter.command);
    next.filter = Some(filter.name.clone());

    let directive = Directive::new()
        .then(FinderAction::Reload(eval_command(&filter.command)?))
        .then(FinderAction::ChangeFooter(filter.footer_text().to_string()));

    tracing::debug!(filter = %filter.name, "filter selected");
    Ok((next, directive))
}

/// Name of the active filter: the persisted one, else the set's default.
#[must_use]
pub fn current_filter<'a>(state: &'a SessionState, filters: &'a FilterSet) -> Option<&'a str> {
    state
        .filter
        .as_deref()
        .or_else(|| filters.default_filter().map(|f| f.name.as_str()))
}

/// Switches to `second` when `first` is active, otherwise to `first`.
///
/// # Errors
///
/// See [`select_filter`].
pub fn toggle_filter(
    state: &SessionState,
    filters: &FilterSet,
    first: &str,
    second: &str,
) -> Result<(SessionState, Directive)> {
    let target = if current_filter(state, filters) == Some(first) {
        second
    } else {
        first
    };
    select_filter(state, filters, target)
}

/// Loads the session record, failing closed when it is absent.
///
/// # Errors
///
/// [`FzfuiError::StateMissing`] if the store is empty, or the store's error.
pub fn load_session<S>(store: &S, path: &Path) -> Result<SessionState>
where
    S: StateStore<SessionState>,
{
    store.load()?.ok_or_else(|| {
        tracing::error!(path = ?path, "session state missing");
        FzfuiError::StateMissing(path.to_path_buf())
    })
}

/// Runs [`toggle`] against a store, persisting the next state.
///
/// # Errors
///
/// Fails if the state is missing or the store cannot be read or written.
pub fn apply_toggle<S>(store: &mut S, path: &Path, typed: &str) -> Result<Directive>
where
    S: StateStore<SessionState>,
{
    let state = load_session(store, path)?;
    let (next, directive) = toggle(&state, typed)?;
    store.save(&next)?;
    Ok(directive)
}

/// Runs [`select_filter`] against a store, persisting the next state.
///
/// # Errors
///
/// Fails if the state is missing, the filter is unknown, or storage fails.
pub fn apply_filter<S>(
    store: &mut S,
    path: &Path,
    filters: &FilterSet,
    name: &str,
) -> Result<Directive>
where
    S: StateStore<SessionState>,
{
    let state = load_session(store, path)?;
    let (next, directive) = select_filter(&state, filters, name)?;
    store.save(&next)?;
    Ok(directive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Filter;
    use crate::storage::MemoryStore;

    fn filters() -> FilterSet {
        let mut set = FilterSet::new();
        set.register(Filter::new("all", "ps aux").default());
        set.register(Filter::new("listening", "lsof -i").footer("lsof [listening]"));
        set
    }

    #[test]
    fn query_to_command_keeps_query_slot() {
        let state = SessionState::new(ToggleMode::Query, "hello", "ls -la");
        let (next, directive) = toggle(&state, "world").unwrap();
        assert_eq!(next, SessionState::new(ToggleMode::Command, "hello", "world"));
        assert_eq!(
            directive.render().unwrap(),
            "disable-search+change-query(ls -la)+change-footer(world)+change-prompt(> )"
        );
        assert!(!directive.render().unwrap().contains("change-query(hello)"));
    }

    #[test]
    fn command_to_query_reloads_and_restores_query() {
        let state = SessionState::new(ToggleMode::Command, "", "ps aux");
        let (next, directive) = toggle(&state, "ps -ef").unwrap();
        assert_eq!(next, SessionState::new(ToggleMode::Query, "ps aux", "ps -ef"));
        assert_eq!(
            directive.render().unwrap(),
            "enable-search+reload(eval 'ps -ef' 2>/dev/null)+change-query()\
             +change-footer(ps -ef)+change-prompt(/ )"
        );
    }

    #[test]
    fn toggling_twice_restores_mode() {
        for mode in [ToggleMode::Query, ToggleMode::Command] {
            let start = SessionState::new(mode, "q", "c");
            let (once, _) = toggle(&start, "t1").unwrap();
            let (twice, _) = toggle(&once, "t2").unwrap();
            assert_eq!(twice.mode, mode);
            assert_eq!(twice.command, "t2");
        }
    }

    #[test]
    fn on_change_only_reloads_in_command_mode() {
        let query = SessionState::initial("ls");
        assert!(on_change(&query, "abc").unwrap().is_empty());

        let command = SessionState::new(ToggleMode::Command, "", "ls");
        assert_eq!(
            on_change(&command, "ls -a").unwrap().render().unwrap(),
            "reload(eval 'ls -a' 2>/dev/null)"
        );
    }

    #[test]
    fn toggle_filter_alternates() {
        let set = filters();
        let state = SessionState::initial("ps aux");
        let (next, directive) = toggle_filter(&state, &set, "all", "listening").unwrap();
        assert_eq!(next.filter.as_deref(), Some("listening"));
        assert_eq!(next.command, "lsof -i");
        assert!(directive.render().unwrap().ends_with("change-footer(lsof [listening])"));

        let (back, _) = toggle_filter(&next, &set, "all", "listening").unwrap();
        assert_eq!(back.filter.as_deref(), Some("all"));
        assert_eq!(back.command, "ps aux");
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let state = SessionState::initial("ls");
        let err = select_filter(&state, &filters(), "nope").unwrap_err();
        assert!(matches!(err, FzfuiError::UnknownFilter(name) if name == "nope"));
    }

    #[test]
    fn apply_toggle_fails_closed_without_state() {
        let mut store = MemoryStore::<SessionState>::new();
        let err = apply_toggle(&mut store, Path::new("/tmp/none"), "x").unwrap_err();
        assert!(matches!(err, FzfuiError::StateMissing(_)));
        assert!(store.get().is_none());
    }

    #[test]
    fn apply_toggle_persists() {
        let mut store = MemoryStore::with(SessionState::initial("ps aux"));
        apply_toggle(&mut store, Path::new("/tmp/s"), "foo").unwrap();
        assert_eq!(
            store.get(),
            Some(&SessionState::new(ToggleMode::Command, "", "foo"))
        );
    }
}
