use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub guardrails: GuardrailConfig,
    pub knowledge: KnowledgeConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailConfig {
    pub max_input_chars: usize,
    pub tool_timeout_secs: u64,
    pub search_top_k: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnowledgeConfig {
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_base_url: Option<String>,
    pub llm_chat_model: Option<String>,
    pub llm_embedding_model: Option<String>,
    pub max_input_chars: Option<usize>,
    pub tool_timeout_secs: Option<u64>,
    pub knowledge_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["warden.toml", "config/warden.toml"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                chat_model: "llama3.2:3b".to_string(),
                embedding_model: "nomic-embed-text:latest".to_string(),
                api_key: None,
                timeout_secs: 60,
            },
            guardrails: GuardrailConfig {
                max_input_chars: 1000,
                tool_timeout_secs: 10,
                search_top_k: 3,
            },
            knowledge: KnowledgeConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl GuardrailConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(chat_model) = llm.chat_model {
                self.llm.chat_model = chat_model;
            }
            if let Some(embedding_model) = llm.embedding_model {
                self.llm.embedding_model = embedding_model;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(guardrails) = patch.guardrails {
            if let Some(max_input_chars) = guardrails.max_input_chars {
                self.guardrails.max_input_chars = max_input_chars;
            }
            if let Some(tool_timeout_secs) = guardrails.tool_timeout_secs {
                self.guardrails.tool_timeout_secs = tool_timeout_secs;
            }
            if let Some(search_top_k) = guardrails.search_top_k {
                self.guardrails.search_top_k = search_top_k;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(path) = knowledge.path {
                self.knowledge.path = Some(path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let base_url = read_env("WARDEN_LLM_BASE_URL").or_else(|| read_env("OLLAMA_URL"));
        if let Some(value) = base_url {
            self.llm.base_url = value;
        }
        let chat_model = read_env("WARDEN_LLM_CHAT_MODEL").or_else(|| read_env("CHAT_MODEL"));
        if let Some(value) = chat_model {
            self.llm.chat_model = value;
        }
        let embedding_model =
            read_env("WARDEN_LLM_EMBEDDING_MODEL").or_else(|| read_env("EMBED_MODEL"));
        if let Some(value) = embedding_model {
            self.llm.embedding_model = value;
        }
        if let Some(value) = read_env("WARDEN_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("WARDEN_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("WARDEN_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WARDEN_GUARDRAILS_MAX_INPUT_CHARS") {
            self.guardrails.max_input_chars =
                parse_usize("WARDEN_GUARDRAILS_MAX_INPUT_CHARS", &value)?;
        }
        if let Some(value) = read_env("WARDEN_GUARDRAILS_TOOL_TIMEOUT_SECS") {
            self.guardrails.tool_timeout_secs =
                parse_u64("WARDEN_GUARDRAILS_TOOL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("WARDEN_GUARDRAILS_SEARCH_TOP_K") {
            self.guardrails.search_top_k = parse_usize("WARDEN_GUARDRAILS_SEARCH_TOP_K", &value)?;
        }

        if let Some(value) = read_env("WARDEN_KNOWLEDGE_PATH") {
            self.knowledge.path = Some(PathBuf::from(value));
        }

        let log_level = read_env("WARDEN_LOGGING_LEVEL").or_else(|| read_env("WARDEN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WARDEN_LOGGING_FORMAT").or_else(|| read_env("WARDEN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = base_url;
        }
        if let Some(chat_model) = overrides.llm_chat_model {
            self.llm.chat_model = chat_model;
        }
        if let Some(embedding_model) = overrides.llm_embedding_model {
            self.llm.embedding_model = embedding_model;
        }
        if let Some(max_input_chars) = overrides.max_input_chars {
            self.guardrails.max_input_chars = max_input_chars;
        }
        if let Some(tool_timeout_secs) = overrides.tool_timeout_secs {
            self.guardrails.tool_timeout_secs = tool_timeout_secs;
        }
        if let Some(path) = overrides.knowledge_path {
            self.knowledge.path = Some(path);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_guardrails(&self.guardrails)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First existing config file: the explicit path, else the default locations.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https:// (e.g. http://localhost:11434)"
                .to_string(),
        ));
    }

    if llm.chat_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.chat_model is required (e.g. `llama3.2:3b`)".to_string(),
        ));
    }
    if llm.embedding_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.embedding_model is required (e.g. `nomic-embed-text:latest`)".to_string(),
        ));
    }

    let blank_key =
        llm.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_key {
        return Err(ConfigError::Validation(
            "llm.api_key is set but empty; remove it or provide a value".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_guardrails(guardrails: &GuardrailConfig) -> Result<(), ConfigError> {
    if guardrails.max_input_chars == 0 || guardrails.max_input_chars > 100_000 {
        return Err(ConfigError::Validation(
            "guardrails.max_input_chars must be in range 1..=100000".to_string(),
        ));
    }

    if guardrails.tool_timeout_secs == 0 || guardrails.tool_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "guardrails.tool_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if guardrails.search_top_k == 0 || guardrails.search_top_k > 20 {
        return Err(ConfigError::Validation(
            "guardrails.search_top_k must be in range 1..=20".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    guardrails: Option<GuardrailPatch>,
    knowledge: Option<KnowledgePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    chat_model: Option<String>,
    embedding_model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GuardrailPatch {
    max_input_chars: Option<usize>,
    tool_timeout_secs: Option<u64>,
    search_top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ALL_VARS: &[&str] = &[
        "WARDEN_LLM_BASE_URL",
        "OLLAMA_URL",
        "WARDEN_LLM_CHAT_MODEL",
        "CHAT_MODEL",
        "WARDEN_LLM_EMBEDDING_MODEL",
        "EMBED_MODEL",
        "WARDEN_LLM_API_KEY",
        "WARDEN_LLM_TIMEOUT_SECS",
        "WARDEN_GUARDRAILS_MAX_INPUT_CHARS",
        "WARDEN_GUARDRAILS_TOOL_TIMEOUT_SECS",
        "WARDEN_GUARDRAILS_SEARCH_TOP_K",
        "WARDEN_KNOWLEDGE_PATH",
        "WARDEN_LOGGING_LEVEL",
        "WARDEN_LOG_LEVEL",
        "WARDEN_LOGGING_FORMAT",
        "WARDEN_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_the_documented_values() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("definitely-missing-warden.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.base_url == "http://localhost:11434", "default base url")?;
        ensure(config.llm.chat_model == "llama3.2:3b", "default chat model")?;
        ensure(config.llm.embedding_model == "nomic-embed-text:latest", "default embed model")?;
        ensure(config.guardrails.max_input_chars == 1000, "default max input chars")?;
        ensure(config.guardrails.tool_timeout_secs == 10, "default tool timeout")?;
        ensure(config.guardrails.search_top_k == 3, "default top k")?;
        ensure(config.knowledge.path.is_none(), "built-in corpus by default")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logging")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("TEST_WARDEN_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("warden.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_WARDEN_API_KEY}"
chat_model = "mistral:7b"

[guardrails]
tool_timeout_secs = 5
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be loaded from environment",
            )?;
            ensure(config.llm.chat_model == "mistral:7b", "chat model should come from file")?;
            ensure(config.guardrails.tool_timeout_secs == 5, "tool timeout should come from file")
        })();

        clear_vars(&["TEST_WARDEN_API_KEY"]);
        result
    }

    #[test]
    fn short_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("OLLAMA_URL", "http://gpu-box:11434");
        env::set_var("CHAT_MODEL", "qwen2.5:7b");
        env::set_var("EMBED_MODEL", "mxbai-embed-large");
        env::set_var("WARDEN_LOG_LEVEL", "warn");
        env::set_var("WARDEN_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.base_url == "http://gpu-box:11434", "OLLAMA_URL alias")?;
            ensure(config.llm.chat_model == "qwen2.5:7b", "CHAT_MODEL alias")?;
            ensure(config.llm.embedding_model == "mxbai-embed-large", "EMBED_MODEL alias")?;
            ensure(config.logging.level == "warn", "log level alias")?;
            ensure(matches!(config.logging.format, LogFormat::Pretty), "log format alias")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("WARDEN_LLM_CHAT_MODEL", "from-env");
        env::set_var("WARDEN_GUARDRAILS_MAX_INPUT_CHARS", "500");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("warden.toml");
            fs::write(
                &path,
                r#"
[llm]
chat_model = "from-file"
embedding_model = "embed-from-file"

[guardrails]
max_input_chars = 200

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    max_input_chars: Some(50),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.chat_model == "from-env", "env chat model should win over file")?;
            ensure(config.llm.embedding_model == "embed-from-file", "file value should apply")?;
            ensure(config.guardrails.max_input_chars == 50, "override should win over env")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("WARDEN_GUARDRAILS_TOOL_TIMEOUT_SECS", "ten");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "WARDEN_GUARDRAILS_TOOL_TIMEOUT_SECS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid env override".to_string()),
        };

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("WARDEN_LLM_BASE_URL", "localhost:11434");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.base_url")
            );
            ensure(has_message, "validation failure should mention llm.base_url")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn zero_tool_timeout_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { tool_timeout_secs: Some(0), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        });

        let has_message = matches!(
            result,
            Err(ConfigError::Validation(ref message))
                if message.contains("guardrails.tool_timeout_secs")
        );
        ensure(has_message, "validation failure should mention guardrails.tool_timeout_secs")
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("missing/warden.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("WARDEN_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars(ALL_VARS);
        result
    }
}
