use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub body: String,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { id: DocumentId(id.into()), title: title.into(), body: body.into() }
    }
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("could not read knowledge file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse knowledge file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("knowledge corpus is empty")]
    Empty,
    #[error("document id must not be blank (entry {index})")]
    BlankId { index: usize },
    #[error("document `{0}` has an empty body")]
    BlankBody(String),
    #[error("document id `{0}` appears more than once")]
    DuplicateId(String),
}

/// Incident and runbook corpus shipped with the binary.
pub fn default_runbooks() -> Vec<Document> {
    vec![
        Document::new(
            "INC-101",
            "Redis Outage - Cache Saturation",
            "Redis became unavailable due to memory exhaustion. Eviction was disabled. \
             Resolution: increase memory limits and enable LRU eviction.",
        ),
        Document::new(
            "RUN-201",
            "DB Connection Pool Runbook",
            "If the app slows down, check DB connection pool. Saturated pool blocks requests. \
             Resolution: increase pool size, investigate connection leaks.",
        ),
        Document::new(
            "INC-305",
            "High CPU Usage on API Nodes",
            "Sustained high CPU was caused by inefficient JSON serialization. \
             Resolution: optimize serialization and cache responses.",
        ),
        Document::new(
            "RUN-404",
            "Kubernetes Pod Restart Troubleshooting",
            "Repeated pod restarts are often failing health checks or insufficient memory limits. \
             Resolution: inspect logs, adjust resource requests/limits.",
        ),
    ]
}

/// Loads `[[documents]]` entries from a TOML file, or the built-in corpus
/// when no path is configured.
pub fn load_corpus(path: Option<&Path>) -> Result<Vec<Document>, KnowledgeError> {
    let documents = match path {
        Some(path) => read_corpus_file(path)?,
        None => default_runbooks(),
    };
    check_corpus(&documents)?;
    Ok(documents)
}

pub fn check_corpus(documents: &[Document]) -> Result<(), KnowledgeError> {
    if documents.is_empty() {
        return Err(KnowledgeError::Empty);
    }

    let mut seen = BTreeSet::new();
    for (index, document) in documents.iter().enumerate() {
        let id = document.id.0.trim();
        if id.is_empty() {
            return Err(KnowledgeError::BlankId { index });
        }
        if document.body.trim().is_empty() {
            return Err(KnowledgeError::BlankBody(id.to_string()));
        }
        if !seen.insert(id) {
            return Err(KnowledgeError::DuplicateId(id.to_string()));
        }
    }

    Ok(())
}

fn read_corpus_file(path: &Path) -> Result<Vec<Document>, KnowledgeError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| KnowledgeError::ReadFile { path: path.to_path_buf(), source })?;
    let file = toml::from_str::<CorpusFile>(&raw)
        .map_err(|source| KnowledgeError::ParseFile { path: path.to_path_buf(), source })?;

    Ok(file
        .documents
        .into_iter()
        .map(|entry| Document::new(entry.id, entry.title, entry.body))
        .collect())
}

#[derive(Debug, Default, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    documents: Vec<CorpusEntry>,
}

#[derive(Debug, Deserialize)]
struct CorpusEntry {
    id: String,
    #[serde(default)]
    title: String,
    body: String,
}
