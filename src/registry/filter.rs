//! Named producer commands.
//!
//! Tools that offer several item lists (all processes, listening only, ...)
//! register each as a [`Filter`]. The active filter's name is persisted in the
//! session state so a later toggle or reload knows which one is live.

/// A named producer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Unique name.
    pub name: String,
    /// Shell command producing the items.
    pub command: String,
    /// Footer shown while active; the command when empty.
    pub footer: String,
    /// Selected when no filter has been persisted yet.
    pub is_default: bool,
    /// Flags (`-l`, `--listening`) that run this filter non-interactively.
    pub cli_aliases: Vec<String>,
}

impl Filter {
    /// A filter called `name` producing items with `command`.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            footer: String::new(),
            is_default: false,
            cli_aliases: Vec::new(),
        }
    }

    /// Sets the footer text.
    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    /// Marks this filter as the default.
    #[must_use]
    pub const fn default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Adds command-line aliases.
    #[must_use]
    pub fn cli<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cli_aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Footer to display, falling back to the command text.
    #[must_use]
    pub fn footer_text(&self) -> &str {
        if self.footer.is_empty() {
            &self.command
        } else {
            &self.footer
        }
    }
}

/// Registered filters in registration order.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter, replacing any filter with the same name.
    pub fn register(&mut self, filter: Filter) {
        if let Some(slot) = self.filters.iter_mut().find(|f| f.name == filter.name) {
            *slot = filter;
        } else {
            self.filters.push(filter);
        }
    }

    /// Looks up a filter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// The first filter marked default.
    #[must_use]
    pub fn default_filter(&self) -> Option<&Filter> {
        self.filters.iter().find(|f| f.is_default)
    }

    /// All filters.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    /// Returns `true` if no filters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_falls_back_to_command() {
        let filter = Filter::new("all", "ps aux");
        assert_eq!(filter.footer_text(), "ps aux");
        assert_eq!(filter.footer("ps [all]").footer_text(), "ps [all]");
    }

    #[test]
    fn register_replaces_by_name() {
        let mut set = FilterSet::new();
        set.register(Filter::new("all", "ps").default());
        set.register(Filter::new("all", "ps aux"));
        assert_eq!(set.iter().count(), 1);
        assert_eq!(set.get("all").unwrap().command, "ps aux");
        assert!(set.default_filter().is_none());
    }
}
