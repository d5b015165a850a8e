pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use warden_core::config::{ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "warden",
    about = "Guardrailed assistant over a local Ollama model",
    long_about = "Ask questions through a deterministic guardrail pipeline: input validation, \
                  local refusals and arithmetic, a JSON-constrained planner, allowlisted tools \
                  and answers grounded in tool output.",
    after_help = "Examples:\n  warden chat\n  warden ask \"What time is it in Tokyo?\"\n  warden doctor --json\n  warden config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Flags accepted by every subcommand. They take precedence over env and file.
#[derive(Clone, Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (default: warden.toml)")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "URL", help = "Ollama base URL")]
    pub base_url: Option<String>,
    #[arg(long, global = true, value_name = "MODEL", help = "Chat model name")]
    pub chat_model: Option<String>,
    #[arg(long, global = true, value_name = "MODEL", help = "Embedding model name")]
    pub embedding_model: Option<String>,
    #[arg(long, global = true, value_name = "LEVEL", help = "trace|debug|info|warn|error")]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                llm_base_url: self.base_url.clone(),
                llm_chat_model: self.chat_model.clone(),
                llm_embedding_model: self.embedding_model.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Interactive question loop; an empty line or `exit` quits")]
    Chat,
    #[command(about = "Answer a single question and exit")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "Question text")]
        text: Vec<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Ollama reachability and the knowledge corpus")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat => commands::chat::run(&cli.global),
        Command::Ask { text } => commands::ask::run(&cli.global, &text.join(" ")),
        Command::Config => commands::config::run(&cli.global),
        Command::Doctor { json } => commands::doctor::run(&cli.global, json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
