use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use warden_core::{Embedder, SearchHit, SemanticIndex, ToolError};

use super::{single_string_argument, Tool, ToolDescriptor, ValidatedArguments, RUNBOOK_SEARCH};

const EXCERPT_CHARS: usize = 180;
const NO_RESULTS: &str = "No relevant runbook documents found.";

/// `Runbooks.Search`: semantic search over the runbook corpus.
pub struct RunbookSearchTool {
    index: Arc<SemanticIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl RunbookSearchTool {
    pub fn new(index: Arc<SemanticIndex>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { index, embedder, top_k }
    }
}

#[async_trait]
impl Tool for RunbookSearchTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &RUNBOOK_SEARCH
    }

    fn validate(&self, arguments: Option<&Value>) -> Result<ValidatedArguments, ToolError> {
        single_string_argument(&RUNBOOK_SEARCH, arguments)
    }

    async fn run(&self, arguments: ValidatedArguments) -> Result<String, ToolError> {
        let query = arguments.get(RUNBOOK_SEARCH.argument).unwrap_or_default();
        let hits = self
            .index
            .search(query, self.top_k, self.embedder.as_ref())
            .await
            .map_err(|error| ToolError::ExecutionFailed(error.to_string()))?;
        Ok(render_hits(&hits))
    }
}

fn render_hits(hits: &[SearchHit<'_>]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut rendered = String::from("Relevant documents:\n");
    for hit in hits {
        rendered.push_str(&format!(
            "- {}: {} (score: {:.3})\n",
            hit.document.id.0, hit.document.title, hit.score
        ));
        rendered.push_str(&format!("  Excerpt: {}\n", excerpt(&hit.document.body)));
    }
    rendered
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= EXCERPT_CHARS {
        return body.to_string();
    }
    let mut cut = body.chars().take(EXCERPT_CHARS).collect::<String>();
    cut.push_str("...");
    cut
}
