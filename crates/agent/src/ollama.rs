//! HTTP client for an Ollama server: `/api/chat`, `/api/embeddings` and
//! `/api/tags`. A single attempt per call, bounded by the configured timeout.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_core::config::LlmConfig;
use warden_core::{Embedder, ModelError};

use crate::llm::{ChatMessage, ChatRequest, LlmClient, ResponseFormat};

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Clone, Debug)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    api_key: Option<SecretString>,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ModelError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| ModelError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the server has pulled.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let request = self.authorized(self.http.get(self.endpoint("/api/tags")));
        let bytes = send(request).await?;
        let tags = decode::<TagsResponse>(&bytes)?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<String, ModelError> {
        let body = OllamaChatRequest {
            model: &self.chat_model,
            messages: &request.messages,
            stream: false,
            format: match request.format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
        };
        debug!(
            event_name = "llm.chat.request",
            model = %self.chat_model,
            messages = request.messages.len(),
            "sending chat request"
        );

        let bytes =
            send(self.authorized(self.http.post(self.endpoint("/api/chat")).json(&body))).await?;
        decode_chat_response(&bytes)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let body = OllamaEmbeddingRequest { model: &self.embedding_model, prompt: text };
        let bytes = send(
            self.authorized(self.http.post(self.endpoint("/api/embeddings")).json(&body)),
        )
        .await?;
        decode_embedding_response(&bytes)
    }
}

async fn send(request: RequestBuilder) -> Result<Vec<u8>, ModelError> {
    let response = request.send().await.map_err(|error| ModelError::Transport(error.to_string()))?;
    read_success_body(response).await
}

async fn read_success_body(response: Response) -> Result<Vec<u8>, ModelError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ModelError::Status {
            status: status.as_u16(),
            body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|error| ModelError::Transport(error.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ModelError> {
    serde_json::from_slice(bytes).map_err(|error| ModelError::MalformedResponse(error.to_string()))
}

fn decode_chat_response(bytes: &[u8]) -> Result<String, ModelError> {
    decode::<OllamaChatResponse>(bytes).map(|response| response.message.content)
}

fn decode_embedding_response(bytes: &[u8]) -> Result<Vec<f32>, ModelError> {
    let response = decode::<OllamaEmbeddingResponse>(bytes)?;
    if response.embedding.is_empty() {
        return Err(ModelError::EmptyEmbedding);
    }
    Ok(response.embedding)
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}
