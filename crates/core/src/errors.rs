use thiserror::Error;

/// Why the validator refused to let an input into the pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputRejection {
    #[error("input is empty")]
    EmptyInput,
    #[error("input has {actual} characters, limit is {max}")]
    TooLong { max: usize, actual: usize },
    #[error("input contains blocked marker `{marker}`")]
    BlockedPattern { marker: &'static str },
}

impl InputRejection {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Please enter a question.".to_string(),
            Self::TooLong { max, .. } => {
                format!("Input too long. Max allowed is {max} characters.")
            }
            Self::BlockedPattern { .. } => "I can't process that request.".to_string(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("malformed expression at offset {offset}: {detail}")]
    Malformed { offset: usize, detail: &'static str },
}

impl ArithmeticError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DivisionByZero => "I can't divide by zero.",
            Self::Overflow | Self::Malformed { .. } => {
                "I couldn't evaluate that expression safely."
            }
        }
    }
}

/// Failure of a chat or embedding call to the model server.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model transport failure: {0}")]
    Transport(String),
    #[error("model server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be decoded: {0}")]
    MalformedResponse(String),
    #[error("model returned an empty embedding")]
    EmptyEmbedding,
}

/// Ways a raw model plan can break the plan contract. Always degraded to the
/// fallback intent by the planner.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanViolation {
    #[error("plan is not a JSON object: {0}")]
    MalformedJson(String),
    #[error("plan has no `action` field")]
    MissingAction,
    #[error("plan action `{0}` is not one of tool|answer|refuse")]
    InvalidAction(String),
    #[error("plan selects a tool without a `toolName`")]
    MissingToolName,
    #[error(transparent)]
    Transport(#[from] ModelError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("dispatcher invoked with a non-tool intent")]
    Misuse,
    #[error("tool intent has no name")]
    MissingName,
    #[error("tool `{0}` is not allowlisted")]
    NotAllowed(String),
    #[error("invalid tool argument: {0}")]
    InvalidArgument(String),
    #[error("tool timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Caller-safe sentence. `InvalidArgument` carries text written by the
    /// argument validators, never by the model or a failing capability.
    pub fn safe_message(&self) -> String {
        match self {
            Self::Misuse => "Tool execution requested incorrectly.".to_string(),
            Self::MissingName => "Missing tool name.".to_string(),
            Self::NotAllowed(_) => "Tool not allowed.".to_string(),
            Self::InvalidArgument(message) => message.clone(),
            Self::TimedOut { .. } => "Tool timed out. Try again with a simpler request.".to_string(),
            Self::ExecutionFailed(_) => "Tool failed safely. Try again.".to_string(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("could not embed document `{document_id}`: {source}")]
    EmbedDocument { document_id: String, source: ModelError },
    #[error("could not embed query: {0}")]
    EmbedQuery(#[source] ModelError),
    #[error("embedding for `{document_id}` has {actual} dimensions, expected {expected}")]
    DimensionMismatch { document_id: String, expected: usize, actual: usize },
}

/// Every failure a single turn can end in, with its stable reason code.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GuardrailError {
    #[error(transparent)]
    InputRejected(#[from] InputRejection),
    #[error("request matched a deterministic refusal rule")]
    DeterministicRefusal,
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    PlanContractViolation(#[from] PlanViolation),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    ModelTransport(#[from] ModelError),
}

impl GuardrailError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InputRejected(InputRejection::EmptyInput) => "input_empty",
            Self::InputRejected(InputRejection::TooLong { .. }) => "input_too_long",
            Self::InputRejected(InputRejection::BlockedPattern { .. }) => "input_blocked_pattern",
            Self::DeterministicRefusal => "deterministic_refusal",
            Self::Arithmetic(ArithmeticError::DivisionByZero) => "arithmetic_division_by_zero",
            Self::Arithmetic(_) => "arithmetic_unevaluable",
            Self::PlanContractViolation(_) => "plan_contract_violation",
            Self::Tool(ToolError::Misuse) | Self::Tool(ToolError::MissingName) => "tool_misuse",
            Self::Tool(ToolError::NotAllowed(_)) => "tool_not_allowed",
            Self::Tool(ToolError::InvalidArgument(_)) => "tool_argument_invalid",
            Self::Tool(ToolError::TimedOut { .. }) => "tool_timed_out",
            Self::Tool(ToolError::ExecutionFailed(_)) => "tool_execution_failed",
            Self::ModelTransport(_) => "model_transport_failure",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InputRejected(rejection) => rejection.user_message(),
            Self::DeterministicRefusal => {
                "I can't help with credential, secret, or hacking-related requests.".to_string()
            }
            Self::Arithmetic(error) => error.user_message().to_string(),
            Self::PlanContractViolation(_) | Self::ModelTransport(_) => {
                "I don't know.".to_string()
            }
            Self::Tool(error) => error.safe_message(),
        }
    }
}
