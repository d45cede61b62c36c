use greenlight_db::migrations;

use crate::commands::{run_with_pool, CommandResult};

pub fn run() -> CommandResult {
    run_with_pool("migrate", |_config, pool| async move {
        match migrations::run_pending(&pool).await {
            Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
            Err(error) => CommandResult::failure("migrate", "migration", error.to_string(), 5),
        }
    })
}
