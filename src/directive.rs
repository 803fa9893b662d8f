//! The finder's control-directive mini-language.
//!
//! Hidden sub-commands talk back to the finder by printing one line such as
//!
//! ```text
//! enable-search+reload(eval 'ps -ef' 2>/dev/null)+change-query()+change-prompt(/ )
//! ```
//!
//! which fzf's `transform` binding executes. This module renders such lines
//! from typed [`FinderAction`] values and builds binding strings for the
//! compiler.
//!
//! Arguments are wrapped in the first delimiter pair whose closing character
//! does not occur in the argument, so a query containing `)` cannot end the
//! action early. An argument containing every closing character cannot be
//! expressed and is rejected.

use crate::domain::error::{FzfuiError, Result};

/// Delimiter pairs fzf accepts around an action argument, in preference order.
const DELIMITERS: &[(char, char)] = &[
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('<', '>'),
    ('~', '~'),
    ('!', '!'),
    ('@', '@'),
    ('#', '#'),
    ('$', '$'),
    ('%', '%'),
    ('^', '^'),
    ('&', '&'),
    ('*', '*'),
    (';', ';'),
    ('/', '/'),
    ('|', '|'),
];

/// Wraps `arg` as `name(arg)` using a delimiter the argument cannot close.
///
/// ```
/// use fzfui::directive::wrap;
///
/// assert_eq!(wrap("change-query", "foo")?, "change-query(foo)");
/// assert_eq!(wrap("change-query", "map(.a)")?, "change-query[map(.a)]");
/// # Ok::<(), fzfui::FzfuiError>(())
/// ```
///
/// # Errors
///
/// Returns [`FzfuiError::Usage`] if `arg` contains every closing delimiter.
pub fn wrap(name: &str, arg: &str) -> Result<String> {
    DELIMITERS
        .iter()
        .find(|&&(_, close)| !arg.contains(close))
        .map(|&(open, close)| format!("{name}{open}{arg}{close}"))
        .ok_or_else(|| {
            FzfuiError::Usage(format!("no delimiter can enclose the {name} argument {arg:?}"))
        })
}

/// Quotes `text` for safe evaluation by a POSIX shell.
///
/// # Errors
///
/// Returns [`FzfuiError::Usage`] if `text` contains a NUL byte, which no shell
/// word can carry.
pub fn shell_quote(text: &str) -> Result<String> {
    shlex::try_quote(text)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| FzfuiError::Usage(format!("cannot pass {text:?} to the shell")))
}

/// Builds the reload body that evaluates `command`, hiding its stderr.
///
/// # Errors
///
/// See [`shell_quote`].
pub fn eval_command(command: &str) -> Result<String> {
    Ok(format!("eval {} 2>/dev/null", shell_quote(command)?))
}

/// One finder action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinderAction {
    /// Turn fuzzy filtering on.
    EnableSearch,
    /// Turn fuzzy filtering off; the input line becomes plain text.
    DisableSearch,
    /// Replace the input line.
    ChangeQuery(String),
    /// Replace the footer (status) line.
    ChangeFooter(String),
    /// Replace the prompt glyph.
    ChangePrompt(String),
    /// Replace the item list with the output of a shell command.
    Reload(String),
    /// Re-run the preview command.
    RefreshPreview,
    /// Run a shell command with the finder suspended.
    Execute(String),
    /// Run a shell command while the finder keeps the screen.
    ExecuteSilent(String),
    /// Run a shell command and execute its output as directives.
    Transform(String),
    /// Exit the finder.
    Abort,
}

impl FinderAction {
    /// fzf's name for this action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EnableSearch => "enable-search",
            Self::DisableSearch => "disable-search",
            Self::ChangeQuery(_) => "change-query",
            Self::ChangeFooter(_) => "change-footer",
            Self::ChangePrompt(_) => "change-prompt",
            Self::Reload(_) => "reload",
            Self::RefreshPreview => "refresh-preview",
            Self::Execute(_) => "execute",
            Self::ExecuteSilent(_) => "execute-silent",
            Self::Transform(_) => "transform",
            Self::Abort => "abort",
        }
    }

    const fn argument(&self) -> Option<&String> {
        match self {
            Self::ChangeQuery(arg)
            | Self::ChangeFooter(arg)
            | Self::ChangePrompt(arg)
            | Self::Reload(arg)
            | Self::Execute(arg)
            | Self::ExecuteSilent(arg)
            | Self::Transform(arg) => Some(arg),
            Self::EnableSearch | Self::DisableSearch | Self::RefreshPreview | Self::Abort => None,
        }
    }
}

impl FinderAction {
    /// Renders the action as fzf reads it.
    ///
    /// # Errors
    ///
    /// See [`wrap`].
    pub fn render(&self) -> Result<String> {
        match self.argument() {
            Some(arg) => wrap(self.name(), arg),
            None => Ok(self.name().to_string()),
        }
    }
}

/// A `+`-joined chain of finder actions.
///
/// ```
/// use fzfui::directive::{Directive, FinderAction};
///
/// let directive = Directive::new()
///     .then(FinderAction::ChangePrompt("> ".into()))
///     .then(FinderAction::Abort);
/// assert_eq!(directive.render()?, "change-prompt(> )+abort");
/// # Ok::<(), fzfui::FzfuiError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directive {
    actions: Vec<FinderAction>,
}

impl Directive {
    /// An empty directive; renders as an empty line, which fzf ignores.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Appends an action.
    #[must_use]
    pub fn then(mut self, action: FinderAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[FinderAction] {
        &self.actions
    }

    /// Returns `true` if the directive has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Directive {
    /// Renders the `+`-joined line printed back to the finder.
    ///
    /// # Errors
    ///
    /// See [`wrap`].
    pub fn render(&self) -> Result<String> {
        let actions = self
            .actions
            .iter()
            .map(FinderAction::render)
            .collect::<Result<Vec<_>>>()?;
        Ok(actions.join("+"))
    }
}
