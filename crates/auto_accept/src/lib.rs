//! Automatically accepts room invites sent to local users, optionally only for
//! direct messages, and records accepted direct-message rooms in `m.direct`.

mod accepter;
pub mod config;
pub mod direct;
pub mod error;
pub mod join;
pub mod module_api;

pub use accepter::InviteAutoAccepter;
pub use config::AutoAcceptConfig;
pub use error::{AutoAcceptError, ConfigError};
pub use module_api::{AccountData, DetachedTask, EventHandler, ModuleApi};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
