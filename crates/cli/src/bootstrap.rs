use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use warden_agent::tools::SystemClock;
use warden_agent::{AgentRuntime, OllamaClient};
use warden_core::config::{AppConfig, ConfigError, LoadOptions};
use warden_core::knowledge::{load_corpus, KnowledgeError};
use warden_core::{ModelError, RetrievalError, SemanticIndex};

pub struct Application {
    pub config: AppConfig,
    pub agent_runtime: AgentRuntime,
    pub indexed_documents: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model client setup failed: {0}")]
    ModelClient(#[source] ModelError),
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error("semantic index build failed: {0}")]
    Index(#[from] RetrievalError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::ModelClient(_) => "model_client",
            Self::Knowledge(_) => "knowledge_corpus",
            Self::Index(_) => "semantic_index",
        }
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Embeds the corpus once; the index is read-only afterwards.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        base_url = %config.llm.base_url,
        chat_model = %config.llm.chat_model,
        embedding_model = %config.llm.embedding_model,
        "starting application bootstrap"
    );

    let client = Arc::new(OllamaClient::new(&config.llm).map_err(BootstrapError::ModelClient)?);
    let documents = load_corpus(config.knowledge.path.as_deref())?;
    let index = SemanticIndex::build(documents, client.as_ref()).await?;
    let indexed_documents = index.len();
    info!(
        event_name = "system.bootstrap.index_ready",
        correlation_id = "bootstrap",
        documents = indexed_documents,
        dimensions = index.dimensions(),
        "knowledge corpus indexed"
    );

    let agent_runtime = AgentRuntime::from_config(
        &config.guardrails,
        client.clone(),
        client,
        Arc::new(index),
        Arc::new(SystemClock),
    );

    Ok(Application { config, agent_runtime, indexed_documents })
}
