//! Registrations owned by an application definition.
//!
//! - [`action`]: key actions, previews, and dispatch
//! - [`filter`]: named producer commands

pub mod action;
pub mod filter;

pub use action::{Action, ActionFn, ActionRegistry, Handler, PreviewFn};
pub use filter::{Filter, FilterSet};
