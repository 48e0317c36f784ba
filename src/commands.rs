//! One module per `bit` subcommand. Each adds a `cmd_*` method to [`App`].
//!
//! Commands that change repository state record an [`Action`] after the
//! change succeeded, so `bit undo` can reverse it.
//!
//! [`App`]: crate::App
//! [`Action`]: crate::history::Action

pub mod cleanup;
pub mod config;
pub mod delete;
pub mod graph;
pub mod history;
pub mod init;
pub mod list;
pub mod merge;
pub mod pr;
pub mod pull;
pub mod push;
pub mod save;
pub mod stash;
pub mod status;
pub mod switch;
pub mod sync;
pub mod undo;
pub mod workon;

pub use list::ListKind;
