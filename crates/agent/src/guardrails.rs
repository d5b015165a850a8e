use rust_decimal::Decimal;
use warden_core::policy::DEFAULT_SECRET_TERMS;
use warden_core::validator::DEFAULT_BLOCKED_MARKERS;
use warden_core::{DeterministicPolicy, GuardrailError, InputValidator, PolicyDecision};

/// Outcome of the deterministic stage that runs before any model call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision<'a> {
    /// Hand the trimmed input to the planner.
    Allow { input: &'a str },
    /// Arithmetic answered locally.
    Resolved { value: Decimal },
    Deny { reason_code: &'static str, user_message: String, error: GuardrailError },
}

impl GuardrailDecision<'_> {
    fn deny(error: GuardrailError) -> Self {
        Self::Deny { reason_code: error.reason_code(), user_message: error.user_message(), error }
    }

    /// The reply for decisions that end the turn here.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Allow { .. } => None,
            Self::Resolved { value } => Some(format!("Result: {value}")),
            Self::Deny { user_message, .. } => Some(user_message.clone()),
        }
    }
}

/// Validator followed by the deterministic policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    validator: InputValidator,
    policy: DeterministicPolicy,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl GuardrailPolicy {
    pub fn new(max_input_chars: usize) -> Self {
        Self::with_rules(max_input_chars, DEFAULT_BLOCKED_MARKERS, DEFAULT_SECRET_TERMS)
    }

    pub fn with_rules(
        max_input_chars: usize,
        blocked_markers: &'static [&'static str],
        secret_terms: &'static [&'static str],
    ) -> Self {
        Self {
            validator: InputValidator::with_markers(max_input_chars, blocked_markers),
            policy: DeterministicPolicy::with_secret_terms(secret_terms),
        }
    }

    pub fn max_input_chars(&self) -> usize {
        self.validator.max_chars()
    }

    pub fn evaluate<'a>(&self, raw_input: &'a str) -> GuardrailDecision<'a> {
        let input = match self.validator.validate(raw_input) {
            Ok(input) => input,
            Err(rejection) => return GuardrailDecision::deny(rejection.into()),
        };

        match self.policy.classify(input) {
            PolicyDecision::PassThrough => GuardrailDecision::Allow { input },
            PolicyDecision::Arithmetic(Ok(value)) => GuardrailDecision::Resolved { value },
            PolicyDecision::Arithmetic(Err(error)) => GuardrailDecision::deny(error.into()),
            PolicyDecision::SecretRefusal { .. } => {
                GuardrailDecision::deny(GuardrailError::DeterministicRefusal)
            }
        }
    }
}
