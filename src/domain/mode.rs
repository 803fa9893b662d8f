//! Session and assist state types.
//!
//! Two independent finite-state types live here:
//!
//! - [`SessionState`] with its [`ToggleMode`]: the query/command toggle that
//!   decides whether the finder's input line filters the item list or edits the
//!   producer command.
//! - [`AssistState`]: whether free-text assist input is currently being
//!   collected. Persisted as a marker record whose presence means `Active`.
//!
//! Neither type knows about the filesystem. Transitions live in
//! [`crate::session`], persistence in [`crate::storage`].

use serde::{Deserialize, Serialize};

/// Which text the finder's input line is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleMode {
    /// The input line fuzzy-filters the already produced item list.
    #[default]
    Query,

    /// The input line edits the producer command itself.
    Command,
}

impl ToggleMode {
    /// The opposite mode.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Query => Self::Command,
            Self::Command => Self::Query,
        }
    }

    /// Lowercase name, as written in legacy state lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Command => "command",
        }
    }
}

/// Per-session toggle state.
///
/// Exactly one of `query` and `command` is live at a time, chosen by `mode`;
/// the other is kept verbatim so the next toggle can restore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current toggle mode.
    pub mode: ToggleMode,

    /// Filter text stashed for restoration into the query box.
    #[serde(default)]
    pub query: String,

    /// Producer command text.
    #[serde(default)]
    pub command: String,

    /// Name of the active named filter, if the tool registered any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl SessionState {
    /// State at session start: query mode, empty query, the initial command.
    ///
    /// ```
    /// use fzfui::domain::{SessionState, ToggleMode};
    ///
    /// let state = SessionState::initial("ps aux");
    /// assert_eq!(state.mode, ToggleMode::Query);
    /// assert_eq!(state.query, "");
    /// assert_eq!(state.command, "ps aux");
    /// ```
    pub fn initial(command: impl Into<String>) -> Self {
        Self {
            mode: ToggleMode::Query,
            query: String::new(),
            command: command.into(),
            filter: None,
        }
    }

    /// Builds a state in an explicit mode.
    pub fn new(mode: ToggleMode, query: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            mode,
            query: query.into(),
            command: command.into(),
            filter: None,
        }
    }

    /// Parses the legacy single-line `mode|query|command` format.
    ///
    /// Splits on the first two `|` only, so the command may itself contain `|`.
    /// Returns `None` for an unknown mode word or fewer than three fields.
    ///
    /// ```
    /// use fzfui::domain::{SessionState, ToggleMode};
    ///
    /// let state = SessionState::from_legacy_line("query|hello|ps aux | grep x").unwrap();
    /// assert_eq!(state.mode, ToggleMode::Query);
    /// assert_eq!(state.command, "ps aux | grep x");
    /// assert!(SessionState::from_legacy_line("bogus").is_none());
    /// ```
    #[must_use]
    pub fn from_legacy_line(line: &str) -> Option<Self> {
        let mut parts = line.trim_end_matches(['\n', '\r']).splitn(3, '|');
        let mode = match parts.next()? {
            "query" => ToggleMode::Query,
            "command" => ToggleMode::Command,
            _ => return None,
        };
        let query = parts.next()?;
        let command = parts.next()?;
        Some(Self::new(mode, query, command))
    }
}

/// Contents of the assist marker.
///
/// The marker only exists while assist input is being collected; it carries
/// the expression that was in the query box when assist mode was entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistMarker {
    /// Query text to restore when assist mode ends.
    pub saved: String,
}

/// Whether assist input is being collected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssistState {
    /// Normal editing; enter behaves as the tool's regular enter.
    #[default]
    Inactive,

    /// The input line holds a free-text request; `saved` is the stashed query.
    Active {
        /// Query text stashed on entry.
        saved: String,
    },
}

impl From<Option<AssistMarker>> for AssistState {
    fn from(marker: Option<AssistMarker>) -> Self {
        marker.map_or(Self::Inactive, |m| Self::Active { saved: m.saved })
    }
}

impl AssistState {
    /// Returns `true` while assist input is being collected.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}
