use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

/// Settings for the invite auto-accepter. Built once at startup and shared
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutoAcceptConfig {
    /// Only accept invites flagged `is_direct`.
    pub accept_invites_only_for_direct_messages: bool,
    /// Only accept invites sent by users on this server.
    pub accept_invites_only_from_local_users: bool,
    /// Name of the worker that reacts to invites. `None` is the main process.
    pub worker_to_run_on: Option<String>,
}

impl AutoAcceptConfig {
    /// Parses the module's config block. A missing block yields the defaults;
    /// unknown keys are ignored.
    pub fn parse_config(raw: &Value) -> Result<Self, ConfigError> {
        match raw {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => Ok(serde_json::from_value(raw.clone())?),
            Value::Bool(_) => Err(ConfigError::NotAMapping("a boolean")),
            Value::Number(_) => Err(ConfigError::NotAMapping("a number")),
            Value::String(_) => Err(ConfigError::NotAMapping("a string")),
            Value::Array(_) => Err(ConfigError::NotAMapping("a list")),
        }
    }

    /// Whether a process named `worker_name` is the designated one.
    pub fn runs_on(&self, worker_name: Option<&str>) -> bool {
        self.worker_to_run_on.as_deref() == worker_name
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
