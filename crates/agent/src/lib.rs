//! Model-facing half of warden: the guarded turn loop.
//!
//! Each turn runs a fixed chain:
//! 1. **Guardrails** (`guardrails`): input validation, then deterministic
//!    refusals and arithmetic. These settle a turn without touching the model.
//! 2. **Planning** (`planner`): the model must answer with a JSON plan, which
//!    is parsed into an [`Intent`]. Anything off-contract becomes
//!    `Answer("I don't know.")`.
//! 3. **Tools** (`tools`): allowlisted, argument-checked and time-bounded.
//! 4. **Grounding** (`grounding`): the final answer is drawn from tool output
//!    only.
//!
//! The model is a translator. It never runs anything on its own authority.

pub mod grounding;
pub mod guardrails;
pub mod intent;
pub mod llm;
pub mod ollama;
pub mod planner;
pub mod runtime;
pub mod tools;

pub use intent::Intent;
pub use llm::LlmClient;
pub use ollama::OllamaClient;
pub use runtime::{AgentRuntime, TurnReply, TurnRoute};
