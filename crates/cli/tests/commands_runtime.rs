use std::env;
use std::sync::{Mutex, OnceLock};

use greenlight_cli::commands::{migrate, seed};
use serde_json::Value;

#[test]
fn migrate_succeeds_against_an_in_memory_database() {
    with_env(&[("GREENLIGHT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_failure_for_a_bad_database_url() {
    with_env(&[("GREENLIGHT_DATABASE_URL", "postgres://nope/greenlight")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_reports_connectivity_failure_for_an_unreachable_file() {
    with_env(
        &[("GREENLIGHT_DATABASE_URL", "sqlite:///no-such-directory/greenlight.db")],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 4, "expected db connectivity failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "db_connectivity");
        },
    );
}

#[test]
fn seed_loads_demo_requests() {
    // One pooled connection: an in-memory sqlite database exists per
    // connection, so migrations and inserts must share one.
    with_env(
        &[
            ("GREENLIGHT_DATABASE_URL", "sqlite::memory:"),
            ("GREENLIGHT_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected successful seed run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("demo requests"), "unexpected message: {message}");
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "GREENLIGHT_DATABASE_URL",
        "GREENLIGHT_DATABASE_MAX_CONNECTIONS",
        "GREENLIGHT_DATABASE_TIMEOUT_SECS",
        "GREENLIGHT_LOGGING_LEVEL",
        "GREENLIGHT_LOGGING_FORMAT",
        "GREENLIGHT_LOG_LEVEL",
        "GREENLIGHT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
