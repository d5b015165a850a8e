use serde_json::Value;

pub const FALLBACK_ANSWER: &str = "I don't know.";

/// What the planner decided to do with a turn. Only the `Tool` case carries
/// a tool name, so a name can never leak into an answer or refusal.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Tool { name: String, arguments: Option<Value> },
    Answer { text: String },
    Refuse,
}

impl Intent {
    pub fn fallback() -> Self {
        Self::Answer { text: FALLBACK_ANSWER.to_string() }
    }

    /// An answer intent; blank text collapses to the fallback answer.
    pub fn answer(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::fallback()
        } else {
            Self::Answer { text }
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Tool { .. } => "tool",
            Self::Answer { .. } => "answer",
            Self::Refuse => "refuse",
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::Tool { name, .. } => Some(name),
            Self::Answer { .. } | Self::Refuse => None,
        }
    }
}
