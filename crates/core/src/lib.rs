//! Deterministic building blocks of the warden guardrail pipeline.
//!
//! Nothing in this crate talks to a model directly. Embeddings come in
//! through the [`retrieval::Embedder`] seam so the index can be built and
//! searched against any backend.

pub mod config;
pub mod errors;
pub mod knowledge;
pub mod policy;
pub mod retrieval;
pub mod validator;

pub use errors::{
    ArithmeticError, GuardrailError, InputRejection, ModelError, PlanViolation, RetrievalError,
    ToolError,
};
pub use knowledge::{Document, DocumentId};
pub use policy::{DeterministicPolicy, PolicyDecision};
pub use retrieval::{cosine_similarity, Embedder, SearchHit, SemanticIndex};
pub use validator::InputValidator;
