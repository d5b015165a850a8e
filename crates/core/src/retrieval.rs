use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::{ModelError, RetrievalError};
use crate::knowledge::Document;

/// Turns text into a fixed-length vector. Every call within one process must
/// return the same dimensionality.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
    document: Document,
    vector: Vec<f32>,
}

impl IndexEntry {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit<'a> {
    pub document: &'a Document,
    pub score: f32,
}

/// Read-only after [`SemanticIndex::build`]; share it behind an `Arc` and
/// search from any number of turns at once.
#[derive(Clone, Debug)]
pub struct SemanticIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

impl SemanticIndex {
    /// Embeds every document body in order. The first failure aborts the
    /// build so that no document silently drops out of the corpus.
    pub async fn build(
        documents: Vec<Document>,
        embedder: &dyn Embedder,
    ) -> Result<Self, RetrievalError> {
        let mut entries = Vec::with_capacity(documents.len());
        let mut dimensions = 0;

        for document in documents {
            let vector = embedder.embed(&document.body).await.map_err(|source| {
                RetrievalError::EmbedDocument { document_id: document.id.0.clone(), source }
            })?;

            if entries.is_empty() {
                dimensions = vector.len();
            } else if vector.len() != dimensions {
                return Err(RetrievalError::DimensionMismatch {
                    document_id: document.id.0.clone(),
                    expected: dimensions,
                    actual: vector.len(),
                });
            }

            debug!(
                event_name = "retrieval.index.document_embedded",
                document_id = %document.id.0,
                dimensions = vector.len(),
                "document embedded"
            );
            entries.push(IndexEntry { document, vector });
        }

        info!(
            event_name = "retrieval.index.built",
            documents = entries.len(),
            dimensions,
            "semantic index built"
        );
        Ok(Self { entries, dimensions })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<SearchHit<'_>>, RetrievalError> {
        let query_vector = embedder.embed(query).await.map_err(RetrievalError::EmbedQuery)?;
        Ok(self.rank(&query_vector, top_k))
    }

    /// Scores every entry against `query_vector`, highest first. Equal scores
    /// keep corpus order.
    pub fn rank(&self, query_vector: &[f32], top_k: usize) -> Vec<SearchHit<'_>> {
        let mut hits = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                document: &entry.document,
                score: cosine_similarity(&entry.vector, query_vector),
            })
            .collect::<Vec<_>>();

        // `sort_by` is stable, which is what keeps ties in corpus order.
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        hits
    }
}

/// Cosine of the angle between `left` and `right`. Mismatched lengths and
/// zero-norm vectors score 0.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_left = 0.0f64;
    let mut norm_right = 0.0f64;
    for (&a, &b) in left.iter().zip(right.iter()) {
        let (a, b) = (f64::from(a), f64::from(b));
        dot += a * b;
        norm_left += a * a;
        norm_right += b * b;
    }

    let denominator = norm_left.sqrt() * norm_right.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (dot / denominator) as f32
}
