use std::env;
use std::fs;
use std::path::Path;

use toml::Value;
use warden_core::config::{resolve_config_path, AppConfig, ConfigError};

use super::{CommandResult, EXIT_CONFIG};
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs) -> CommandResult {
    match render(global) {
        Ok(output) => CommandResult::text(output),
        Err(error) => CommandResult::failure(
            "config",
            "config_validation",
            format!("config validation failed: {error}"),
            EXIT_CONFIG,
        ),
    }
}

pub fn render(global: &GlobalArgs) -> Result<String, ConfigError> {
    let config = AppConfig::load(global.load_options())?;
    let config_file_path = resolve_config_path(global.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for (key_path, value) in effective_values(&config) {
        let source =
            field_source(key_path, global, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    Ok(lines.join("\n"))
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let knowledge_path = config
        .knowledge
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in runbooks>".to_string());

    vec![
        ("llm.base_url", config.llm.base_url.clone()),
        ("llm.chat_model", config.llm.chat_model.clone()),
        ("llm.embedding_model", config.llm.embedding_model.clone()),
        ("llm.api_key", api_key.to_string()),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string()),
        ("guardrails.max_input_chars", config.guardrails.max_input_chars.to_string()),
        ("guardrails.tool_timeout_secs", config.guardrails.tool_timeout_secs.to_string()),
        ("guardrails.search_top_k", config.guardrails.search_top_k.to_string()),
        ("knowledge.path", knowledge_path),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format).to_lowercase()),
    ]
}

fn env_keys(key_path: &str) -> &'static [&'static str] {
    match key_path {
        "llm.base_url" => &["WARDEN_LLM_BASE_URL", "OLLAMA_URL"],
        "llm.chat_model" => &["WARDEN_LLM_CHAT_MODEL", "CHAT_MODEL"],
        "llm.embedding_model" => &["WARDEN_LLM_EMBEDDING_MODEL", "EMBED_MODEL"],
        "llm.api_key" => &["WARDEN_LLM_API_KEY"],
        "llm.timeout_secs" => &["WARDEN_LLM_TIMEOUT_SECS"],
        "guardrails.max_input_chars" => &["WARDEN_GUARDRAILS_MAX_INPUT_CHARS"],
        "guardrails.tool_timeout_secs" => &["WARDEN_GUARDRAILS_TOOL_TIMEOUT_SECS"],
        "guardrails.search_top_k" => &["WARDEN_GUARDRAILS_SEARCH_TOP_K"],
        "knowledge.path" => &["WARDEN_KNOWLEDGE_PATH"],
        "logging.level" => &["WARDEN_LOGGING_LEVEL", "WARDEN_LOG_LEVEL"],
        "logging.format" => &["WARDEN_LOGGING_FORMAT", "WARDEN_LOG_FORMAT"],
        _ => &[],
    }
}

fn flag_name(key_path: &str, global: &GlobalArgs) -> Option<&'static str> {
    let (flag, value) = match key_path {
        "llm.base_url" => ("--base-url", &global.base_url),
        "llm.chat_model" => ("--chat-model", &global.chat_model),
        "llm.embedding_model" => ("--embedding-model", &global.embedding_model),
        "logging.level" => ("--log-level", &global.log_level),
        _ => return None,
    };
    value.as_ref().map(|_| flag)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    global: &GlobalArgs,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = flag_name(key_path, global) {
        return format!("flag ({flag})");
    }

    let set_env = env_keys(key_path)
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = set_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, flag_name, render_line};
    use crate::GlobalArgs;

    #[test]
    fn nested_keys_are_found_in_toml() {
        let doc = "[llm]\nchat_model = \"qwen2.5:7b\"\n".parse::<toml::Value>().expect("toml");
        assert!(contains_path(&doc, "llm.chat_model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert!(!contains_path(&doc, "guardrails.search_top_k"));
    }

    #[test]
    fn flags_only_attribute_when_set() {
        let global =
            GlobalArgs { chat_model: Some("qwen2.5:7b".to_string()), ..GlobalArgs::default() };
        assert_eq!(flag_name("llm.chat_model", &global), Some("--chat-model"));
        assert_eq!(flag_name("llm.base_url", &global), None);
        assert_eq!(flag_name("guardrails.search_top_k", &global), None);
    }

    #[test]
    fn line_format() {
        assert_eq!(
            render_line("llm.api_key", "<redacted>", "env (WARDEN_LLM_API_KEY)".to_string()),
            "- llm.api_key = <redacted> (source: env (WARDEN_LLM_API_KEY))"
        );
    }
}
