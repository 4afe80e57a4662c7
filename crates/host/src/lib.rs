//! In-process host for the invite auto-accepter: an in-memory server and the
//! settings used to run the module against recorded events.

pub mod config;
pub mod memory;

pub use config::{load_settings, Settings};
pub use memory::{HostReport, MemoryHost};
