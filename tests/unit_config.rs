use std::env;
use std::sync::Mutex;

use sill_catalog::domain::sort::SortMode;
use sill_catalog::storage::config::RuntimeConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn missing_file_yields_defaults() {
    let _guard = ENV_LOCK.lock().expect("lock env");
    let dir = tempfile::tempdir().expect("create tempdir");

    let previous = snapshot_env();
    clear_tracked_env();
    let config = RuntimeConfig::load_from_path(&dir.path().join("absent.toml"))
        .expect("load default config");
    restore_env(&previous);

    assert_eq!(config, RuntimeConfig::default());
    assert_eq!(config.defaults.sort, SortMode::ReferentCount);
}

#[test]
fn load_config_file_applies_values() {
    let _guard = ENV_LOCK.lock().expect("lock env");
    let dir = tempfile::tempdir().expect("create tempdir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
            [provider]
            url = "https://sill.example/api/getSoftwares"
            timeout_ms = 2500

            [defaults]
            sort = "added_time"
        "#,
    )
    .expect("write config");

    let previous = snapshot_env();
    clear_tracked_env();
    let config = RuntimeConfig::load_from_path(&config_path).expect("load config from path");
    restore_env(&previous);

    assert_eq!(config.provider.url, "https://sill.example/api/getSoftwares");
    assert_eq!(config.provider.timeout_ms, 2500);
    assert_eq!(config.defaults.sort, SortMode::AddedTime);
}

#[test]
fn env_vars_override_file_values() {
    let _guard = ENV_LOCK.lock().expect("lock env");
    let dir = tempfile::tempdir().expect("create tempdir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
            [provider]
            url = "https://file.example/api"
            timeout_ms = 1000

            [defaults]
            sort = "user_count"
        "#,
    )
    .expect("write config");

    let previous = snapshot_env();
    env::set_var("SILL_CATALOG_PROVIDER_URL", "https://env.example/api");
    env::set_var("SILL_CATALOG_PROVIDER_TIMEOUT_MS", "9000");
    env::set_var("SILL_CATALOG_DEFAULT_SORT", "update_time");

    let config = RuntimeConfig::load_from_path(&config_path);
    restore_env(&previous);
    let config = config.expect("load config from path");

    assert_eq!(config.provider.url, "https://env.example/api");
    assert_eq!(config.provider.timeout_ms, 9000);
    assert_eq!(config.defaults.sort, SortMode::UpdateTime);
}

#[test]
fn best_match_is_not_a_valid_default() {
    let _guard = ENV_LOCK.lock().expect("lock env");
    let dir = tempfile::tempdir().expect("create tempdir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[defaults]\nsort = \"best_match\"\n").expect("write config");

    let previous = snapshot_env();
    clear_tracked_env();
    let result = RuntimeConfig::load_from_path(&config_path);
    restore_env(&previous);

    let err = result.expect_err("best_match default should fail");
    assert!(err.to_string().contains("best_match"));
}

fn snapshot_env() -> Vec<(&'static str, Option<String>)> {
    tracked_env_keys()
        .into_iter()
        .map(|key| (key, env::var(key).ok()))
        .collect()
}

fn clear_tracked_env() {
    for key in tracked_env_keys() {
        env::remove_var(key);
    }
}

fn restore_env(previous: &[(&str, Option<String>)]) {
    for (key, value) in previous {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

fn tracked_env_keys() -> [&'static str; 3] {
    [
        "SILL_CATALOG_PROVIDER_URL",
        "SILL_CATALOG_PROVIDER_TIMEOUT_MS",
        "SILL_CATALOG_DEFAULT_SORT",
    ]
}
