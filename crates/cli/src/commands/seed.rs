use greenlight_db::{fixtures, migrations};

use crate::commands::{run_with_pool, CommandResult};

pub fn run() -> CommandResult {
    run_with_pool("seed", |_config, pool| async move {
        if let Err(error) = migrations::run_pending(&pool).await {
            return CommandResult::failure("seed", "migration", error.to_string(), 5);
        }

        match fixtures::seed_demo_data(&pool).await {
            Ok(summary) => CommandResult::success(
                "seed",
                format!("loaded {} demo requests", summary.requests),
            ),
            Err(error) => CommandResult::failure("seed", "fixtures", error.to_string(), 6),
        }
    })
}
