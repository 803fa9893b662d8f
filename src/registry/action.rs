//! Key actions and their dispatch.
//!
//! An [`ActionRegistry`] maps action names to handlers. Each handler is tagged:
//! [`Handler::Action`] runs for its side effects and produces no output,
//! [`Handler::Preview`] returns text that the finder shows in its preview
//! pane. The registry is generic over a context type `C` passed to every
//! handler, which is the [`App`](crate::App) in practice and `()` in tests.

use crate::domain::error::Result;

/// Handler run for its side effects.
pub type ActionFn<C> = Box<dyn Fn(&C, &str) -> Result<()>>;

/// Handler whose return value is shown as preview text.
pub type PreviewFn<C> = Box<dyn Fn(&C, &str) -> Result<String>>;

/// A registered handler.
pub enum Handler<C> {
    /// Side-effect action; output discarded.
    Action(ActionFn<C>),
    /// Preview producer; output surfaced.
    Preview(PreviewFn<C>),
}

impl<C> std::fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(_) => f.write_str("Handler::Action"),
            Self::Preview(_) => f.write_str("Handler::Preview"),
        }
    }
}

/// A handler bound to a key, with its behavior flags.
///
/// # Example
///
/// ```
/// use fzfui::registry::Action;
///
/// let kill = Action::<()>::new("ctrl-k", |_, pid| {
///     println!("killing {pid}");
///     Ok(())
/// })
/// .description("Kill process")
/// .reload()
/// .silent()
/// .field(1);
/// assert!(kill.reload && kill.silent && !kill.exit);
/// ```
#[derive(Debug)]
pub struct Action<C> {
    /// Key chord that triggers the action; `None` for previews bound elsewhere.
    pub key: Option<String>,
    /// One-line help text.
    pub description: String,
    /// Regenerate the item list after the handler runs.
    pub reload: bool,
    /// Run without suspending the finder UI.
    pub silent: bool,
    /// Exit the finder after the handler runs.
    pub exit: bool,
    /// 1-based column of the selected line passed to the handler; 0 means the
    /// whole line or the first displayed field.
    pub field: usize,
    /// The handler.
    pub handler: Handler<C>,
}

impl<C> Action<C> {
    /// An action on `key` running `handler` for its side effects.
    pub fn new<F>(key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&C, &str) -> Result<()> + 'static,
    {
        Self {
            key: Some(key.into()),
            description: String::new(),
            reload: false,
            silent: false,
            exit: false,
            field: 0,
            handler: Handler::Action(Box::new(handler)),
        }
    }

    /// A preview producer with no key of its own.
    pub fn preview<F>(handler: F) -> Self
    where
        F: Fn(&C, &str) -> Result<String> + 'static,
    {
        Self {
            key: None,
            description: String::new(),
            reload: false,
            silent: false,
            exit: false,
            field: 0,
            handler: Handler::Preview(Box::new(handler)),
        }
    }

    /// Sets the help text.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Reload the item list afterwards.
    #[must_use]
    pub const fn reload(mut self) -> Self {
        self.reload = true;
        self
    }

    /// Keep the finder on screen while the handler runs.
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Exit the finder afterwards.
    #[must_use]
    pub const fn exit(mut self) -> Self {
        self.exit = true;
        self
    }

    /// Pass only column `field` (1-based) of the selected line.
    #[must_use]
    pub const fn field(mut self, field: usize) -> Self {
        self.field = field;
        self
    }

    /// Returns `true` for side-effect actions.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self.handler, Handler::Action(_))
    }
}

/// Named actions in registration order.
///
/// Registering a name twice replaces the earlier entry in place. Keys are not
/// checked for uniqueness; the finder applies the last binding for a key.
pub struct ActionRegistry<C> {
    entries: Vec<(String, Action<C>)>,
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> std::fmt::Debug for ActionRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

impl<C> ActionRegistry<C> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the action called `name`.
    pub fn register(&mut self, name: impl Into<String>, action: Action<C>) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            tracing::debug!(action = %name, "replacing action");
            slot.1 = action;
        } else {
            self.entries.push((name, action));
        }
    }

    /// Looks up an action by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Action<C>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, action)| action)
    }

    /// Side-effect actions with a key, in registration order.
    pub fn bound_actions(&self) -> impl Iterator<Item = (&str, &Action<C>)> {
        self.entries
            .iter()
            .filter(|(_, action)| action.is_action() && action.key.is_some())
            .map(|(name, action)| (name.as_str(), action))
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes the handler called `name` with `text`.
    ///
    /// Returns the preview text for preview handlers and `None` for actions.
    /// An unknown name is a no-op.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns; it is not caught here.
    pub fn dispatch(&self, context: &C, name: &str, text: &str) -> Result<Option<String>> {
        let Some(action) = self.get(name) else {
            tracing::debug!(action = %name, "no such action, ignoring");
            return Ok(None);
        };

        let _span = tracing::debug_span!("dispatch", action = %name).entered();
        match &action.handler {
            Handler::Action(run) => {
                run(context, text)?;
                Ok(None)
            }
            Handler::Preview(render) => render(context, text).map(Some),
        }
    }
}
