use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn empty_file_yields_defaults() {
    assert_eq!(settings_from_toml("").expect("settings"), Settings::default());
}

#[test]
fn reads_host_and_module_sections() {
    let settings = settings_from_toml(
        r#"
server_name = "test"
worker_name = "account_data1"

[auto_accept_invite]
accept_invites_only_for_direct_messages = true
worker_to_run_on = "account_data1"
"#,
    )
    .expect("settings");

    assert_eq!(settings.server_name, "test");
    assert_eq!(settings.worker_name.as_deref(), Some("account_data1"));
    assert!(settings.module.accept_invites_only_for_direct_messages);
    assert_eq!(settings.module.worker_to_run_on.as_deref(), Some("account_data1"));
    assert!(settings.module.runs_on(settings.worker_name.as_deref()));
}

#[test]
fn rejects_badly_typed_module_option() {
    let err = settings_from_toml(
        r#"
[auto_accept_invite]
accept_invites_only_for_direct_messages = "sometimes"
"#,
    )
    .expect_err("should fail");
    assert!(format!("{err:#}").contains("invalid [auto_accept_invite] section"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("auto_accept_missing_{suffix}.toml"));

    let settings = load_settings(&path).expect("settings");
    assert_eq!(settings.module, AutoAcceptConfig::default());
}

#[test]
fn loads_settings_file_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("auto_accept_host_{suffix}.toml"));
    fs::write(
        &path,
        "server_name = \"example.org\"\n[auto_accept_invite]\naccept_invites_only_from_local_users = true\n",
    )
    .expect("write settings");

    let settings = load_settings(&path).expect("settings");
    assert!(settings.module.accept_invites_only_from_local_users);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn env_overrides_module_options() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("APP__SERVER_NAME", "example.org"),
        ("APP__WORKER_TO_RUN_ON", "account_data1"),
        ("APP__ACCEPT_INVITES_ONLY_FOR_DIRECT_MESSAGES", "true"),
        ("APP__ACCEPT_INVITES_ONLY_FROM_LOCAL_USERS", "true"),
    ]);
    let mut settings = Settings::default();

    apply_env_overrides(&mut settings, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.server_name, "example.org");
    assert_eq!(settings.module.worker_to_run_on.as_deref(), Some("account_data1"));
    assert!(settings.module.accept_invites_only_for_direct_messages);
    assert!(settings.module.accept_invites_only_from_local_users);
}

#[test]
fn env_override_ignores_unparseable_bool() {
    let mut settings = Settings::default();

    apply_env_overrides(&mut settings, |key| {
        (key == "APP__ACCEPT_INVITES_ONLY_FROM_LOCAL_USERS").then(|| "sometimes".to_string())
    });

    assert!(!settings.module.accept_invites_only_from_local_users);
}
