use warden_agent::AgentRuntime;

use super::{block_on, load_and_init, CommandResult, EXIT_STARTUP};
use crate::bootstrap::bootstrap_with_config;
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs, text: &str) -> CommandResult {
    let config = match load_and_init(global) {
        Ok(config) => config,
        Err(error) => return CommandResult::bootstrap_failure("ask", &error),
    };

    let outcome = block_on(async move {
        match bootstrap_with_config(config).await {
            Ok(app) => CommandResult::text(answer(&app.agent_runtime, text).await),
            Err(error) => CommandResult::bootstrap_failure("ask", &error),
        }
    });

    outcome.unwrap_or_else(|error| {
        CommandResult::failure("ask", "async_runtime", error.to_string(), EXIT_STARTUP)
    })
}

pub async fn answer(runtime: &AgentRuntime, text: &str) -> String {
    runtime.handle_turn(text).await.text
}
