pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;

use std::future::Future;

use serde::Serialize;
use warden_core::config::AppConfig;

use crate::bootstrap::BootstrapError;
use crate::GlobalArgs;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_STARTUP: u8 = 3;

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
}

impl CommandResult {
    /// Unstructured output, e.g. an answer.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
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
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn bootstrap_failure(command: &str, error: &BootstrapError) -> Self {
        let exit_code =
            if matches!(error, BootstrapError::Config(_)) { EXIT_CONFIG } else { EXIT_STARTUP };
        Self::failure(command, error.error_class(), error.to_string(), exit_code)
    }
}

/// Loads config for a command that talks to the model, installing logging
/// from it before anything else runs.
pub(crate) fn load_and_init(global: &GlobalArgs) -> Result<AppConfig, BootstrapError> {
    let config = AppConfig::load(global.load_options())?;
    crate::logging::init_logging(&config.logging);
    Ok(config)
}

pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, std::io::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
