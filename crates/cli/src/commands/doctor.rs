use serde::Serialize;
use warden_agent::OllamaClient;
use warden_core::config::AppConfig;
use warden_core::knowledge::load_corpus;

use super::{block_on, CommandResult};
use crate::GlobalArgs;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(global: &GlobalArgs, json_output: bool) -> CommandResult {
    let report = build_report(global);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(global: &GlobalArgs) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(global.load_options()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_knowledge_corpus(&config));
            checks.extend(check_model_server(&config));
        }
        Err(error) => {
            let reason = "configuration did not load";
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped("knowledge_corpus", reason));
            checks.push(DoctorCheck::skipped("model_server", reason));
            checks.push(DoctorCheck::skipped("model_availability", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_knowledge_corpus(config: &AppConfig) -> DoctorCheck {
    let source = config
        .knowledge
        .path
        .as_ref()
        .map(|path| format!("`{}`", path.display()))
        .unwrap_or_else(|| "built-in runbooks".to_string());

    match load_corpus(config.knowledge.path.as_deref()).map(|documents| documents.len()) {
        Ok(count) => DoctorCheck::pass("knowledge_corpus", format!("{count} documents from {source}")),
        Err(error) => DoctorCheck::fail("knowledge_corpus", error.to_string()),
    }
}

/// Reachability and, when reachable, whether both configured models are pulled.
fn check_model_server(config: &AppConfig) -> Vec<DoctorCheck> {
    let client = match OllamaClient::new(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return vec![
                DoctorCheck::fail("model_server", error.to_string()),
                DoctorCheck::skipped("model_availability", "the model client could not be built"),
            ];
        }
    };

    let models = match block_on(client.list_models()) {
        Ok(Ok(models)) => models,
        Ok(Err(error)) => {
            return vec![
                DoctorCheck::fail(
                    "model_server",
                    format!("`{}` unreachable: {error}", client.base_url()),
                ),
                DoctorCheck::skipped("model_availability", "the model server is unreachable"),
            ];
        }
        Err(error) => {
            return vec![
                DoctorCheck::fail("model_server", format!("failed to initialize async runtime: {error}")),
                DoctorCheck::skipped("model_availability", "the model server was not contacted"),
            ];
        }
    };

    let reachable = DoctorCheck::pass(
        "model_server",
        format!("reached `{}` ({} models installed)", client.base_url(), models.len()),
    );

    let missing = [&config.llm.chat_model, &config.llm.embedding_model]
        .into_iter()
        .filter(|wanted| !model_installed(&models, wanted))
        .map(|wanted| format!("`{wanted}`"))
        .collect::<Vec<_>>();
    let availability = if missing.is_empty() {
        DoctorCheck::pass("model_availability", "chat and embedding models are installed")
    } else {
        DoctorCheck::fail(
            "model_availability",
            format!("not installed: {} (run `ollama pull <model>`)", missing.join(", ")),
        )
    };

    vec![reachable, availability]
}

/// Ollama reports untagged models with an implicit `:latest`.
fn model_installed(installed: &[String], wanted: &str) -> bool {
    installed
        .iter()
        .any(|name| name == wanted || name.strip_suffix(":latest") == Some(wanted))
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
