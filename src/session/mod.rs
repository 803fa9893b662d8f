//! Session state machines.
//!
//! Both machines are pure functions over domain types plus `apply_*`/`*_assist`
//! helpers that persist through a [`StateStore`](crate::storage::StateStore).
//!
//! - [`toggle`](mod@toggle): query/command mode toggle and named filters
//! - [`assist`]: free-text assist marker

pub mod assist;
pub mod toggle;

pub use assist::{
    assist_state, submit_assist, toggle_assist, Assistant, AssistPrompts, ExternalAssistant,
};
pub use toggle::{
    apply_filter, apply_toggle, current_filter, load_session, on_change, select_filter, toggle,
    toggle_filter, COMMAND_PROMPT, QUERY_PROMPT,
};
