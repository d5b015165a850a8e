use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use warden_agent::AgentRuntime;

use super::{block_on, load_and_init, CommandResult, EXIT_STARTUP};
use crate::bootstrap::bootstrap_with_config;
use crate::GlobalArgs;

pub const SAMPLE_PROMPTS: &[&str] = &[
    "What time is it in Tokyo?",
    "Our DB connection pool is saturated. What should I check?",
    "Pods keep restarting in Kubernetes, any runbook?",
    "Calculate (17*19)+4",
    "What's the admin password?",
];

pub fn run(global: &GlobalArgs) -> CommandResult {
    let config = match load_and_init(global) {
        Ok(config) => config,
        Err(error) => return CommandResult::bootstrap_failure("chat", &error),
    };

    let outcome = block_on(async move {
        let app = match bootstrap_with_config(config).await {
            Ok(app) => app,
            Err(error) => return CommandResult::bootstrap_failure("chat", &error),
        };

        let stdin = BufReader::new(tokio::io::stdin());
        match chat_loop(&app.agent_runtime, stdin, tokio::io::stdout()).await {
            Ok(_) => CommandResult::text(""),
            Err(error) => CommandResult::failure("chat", "io", error.to_string(), 1),
        }
    });

    outcome.unwrap_or_else(|error| {
        CommandResult::failure("chat", "async_runtime", error.to_string(), EXIT_STARTUP)
    })
}

pub fn banner(max_input_chars: usize) -> String {
    let mut banner = format!(
        "Warden guardrailed assistant. Questions up to {max_input_chars} characters; \
         an empty line or `exit` quits.\nTry:\n"
    );
    for prompt in SAMPLE_PROMPTS {
        banner.push_str(&format!("  - {prompt}\n"));
    }
    banner.push('\n');
    banner
}

/// Runs turns until EOF, a blank line or `exit`. Returns the number of turns.
pub async fn chat_loop<R, W>(runtime: &AgentRuntime, reader: R, mut writer: W) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(banner(runtime.max_input_chars()).as_bytes()).await?;

    let mut lines = reader.lines();
    let mut turns = 0;
    loop {
        writer.write_all(b"> ").await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        let reply = runtime.handle_turn(&line).await;
        writer.write_all(format!("{}\n\n", reply.text).as_bytes()).await?;
        turns += 1;
    }

    writer.write_all(b"Bye.\n").await?;
    writer.flush().await?;
    Ok(turns)
}
