pub mod doctor;
pub mod inbox;
pub mod migrate;
pub mod request;
pub mod seed;
pub mod show;

use serde::Serialize;

use greenlight_core::config::{AppConfig, LoadOptions};
use greenlight_core::domain::actor::{Actor, Role};
use greenlight_db::{connect_with_settings, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Shared bootstrap for commands that touch the database: load config,
/// build a current-thread runtime, connect, then hand the pool to the
/// command body.
pub(crate) fn run_with_pool<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig, DbPool) -> Fut,
    Fut: std::future::Future<Output = CommandResult>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(
                    command,
                    "db_connectivity",
                    format!("database connection failed: {error}"),
                    4,
                );
            }
        };

        let result = body(config, pool.clone()).await;
        pool.close().await;
        result
    })
}

pub(crate) fn parse_actor(
    command: &str,
    actor_id: &str,
    roles_csv: &str,
) -> Result<Actor, CommandResult> {
    let actor_id = actor_id.trim();
    if actor_id.is_empty() {
        return Err(CommandResult::failure(command, "bad_actor", "actor id must not be empty", 2));
    }

    let mut roles = Vec::new();
    for raw in roles_csv.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match Role::parse(raw) {
            Some(role) => roles.push(role),
            None => {
                return Err(CommandResult::failure(
                    command,
                    "bad_actor",
                    format!("unknown role `{raw}` (expected requester|reviewer|admin)"),
                    2,
                ));
            }
        }
    }

    if roles.is_empty() {
        roles.push(Role::Requester);
    }

    Ok(Actor::new(actor_id, roles))
}
