use std::{fs, io, path::Path};

use anyhow::Context;
use auto_accept::AutoAcceptConfig;

/// Table holding the module's options in the host settings file.
pub const MODULE_SECTION: &str = "auto_accept_invite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_name: String,
    pub worker_name: Option<String>,
    pub module: AutoAcceptConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_name: "localhost".into(),
            worker_name: None,
            module: AutoAcceptConfig::default(),
        }
    }
}

/// Defaults, then `path` if it exists, then `APP__*` environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => settings_from_toml(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

/// Applies `APP__*` overrides read through `lookup`. Unparseable booleans are
/// ignored.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__SERVER_NAME") {
        settings.server_name = v;
    }
    if let Some(v) = lookup("APP__WORKER_NAME") {
        settings.worker_name = Some(v);
    }
    if let Some(v) = lookup("APP__WORKER_TO_RUN_ON") {
        settings.module.worker_to_run_on = Some(v);
    }
    if let Some(v) = lookup("APP__ACCEPT_INVITES_ONLY_FOR_DIRECT_MESSAGES") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.module.accept_invites_only_for_direct_messages = parsed;
        }
    }
    if let Some(v) = lookup("APP__ACCEPT_INVITES_ONLY_FROM_LOCAL_USERS") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.module.accept_invites_only_from_local_users = parsed;
        }
    }
}

pub fn settings_from_toml(raw: &str) -> anyhow::Result<Settings> {
    let table: toml::Table = toml::from_str(raw)?;
    let mut settings = Settings::default();

    if let Some(v) = table.get("server_name").and_then(toml::Value::as_str) {
        settings.server_name = v.to_string();
    }
    if let Some(v) = table.get("worker_name").and_then(toml::Value::as_str) {
        settings.worker_name = Some(v.to_string());
    }
    if let Some(section) = table.get(MODULE_SECTION) {
        let section = serde_json::to_value(section)?;
        settings.module = AutoAcceptConfig::parse_config(&section)
            .with_context(|| format!("invalid [{MODULE_SECTION}] section"))?;
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
