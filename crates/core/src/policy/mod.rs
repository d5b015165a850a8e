//! Request classes that never reach the model.
//!
//! Secret detection is a substring denylist, with the same false positive and
//! false negative profile as the input validator's markers. It refuses before
//! planning because a model-mediated refusal is not a hard boundary.

pub mod arithmetic;

use rust_decimal::Decimal;

use crate::errors::{ArithmeticError, GuardrailError};

pub const DEFAULT_SECRET_TERMS: &[&str] =
    &["password", "api key", "secret", "token", "hack", "bypass", "exploit"];

const CALCULATE_KEYWORD: &str = "calculate";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    SecretRefusal { term: &'static str },
    Arithmetic(Result<Decimal, ArithmeticError>),
    PassThrough,
}

impl PolicyDecision {
    /// The deterministic reply, or `None` when the turn proceeds to planning.
    pub fn response(&self) -> Option<String> {
        match self {
            Self::SecretRefusal { .. } => {
                Some(GuardrailError::DeterministicRefusal.user_message())
            }
            Self::Arithmetic(Ok(value)) => Some(format!("Result: {value}")),
            Self::Arithmetic(Err(error)) => Some(error.user_message().to_string()),
            Self::PassThrough => None,
        }
    }

    pub fn into_error(self) -> Option<GuardrailError> {
        match self {
            Self::SecretRefusal { .. } => Some(GuardrailError::DeterministicRefusal),
            Self::Arithmetic(Err(error)) => Some(GuardrailError::Arithmetic(error)),
            Self::Arithmetic(Ok(_)) | Self::PassThrough => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterministicPolicy {
    secret_terms: &'static [&'static str],
}

impl Default for DeterministicPolicy {
    fn default() -> Self {
        Self { secret_terms: DEFAULT_SECRET_TERMS }
    }
}

impl DeterministicPolicy {
    /// Terms must be lowercase.
    pub fn with_secret_terms(secret_terms: &'static [&'static str]) -> Self {
        Self { secret_terms }
    }

    pub fn classify(&self, input: &str) -> PolicyDecision {
        let lowered = input.trim().to_lowercase();

        if let Some(term) = self.secret_terms.iter().copied().find(|term| lowered.contains(term)) {
            return PolicyDecision::SecretRefusal { term };
        }

        let candidate = lowered.strip_prefix(CALCULATE_KEYWORD).unwrap_or(lowered.as_str()).trim();
        if arithmetic::is_arithmetic(candidate) {
            return PolicyDecision::Arithmetic(arithmetic::evaluate(candidate));
        }

        PolicyDecision::PassThrough
    }

    pub fn try_handle(&self, input: &str) -> Option<String> {
        self.classify(input).response()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{DeterministicPolicy, PolicyDecision};
    use crate::errors::ArithmeticError;

    #[test]
    fn secret_requests_are_refused_without_planning() {
        let policy = DeterministicPolicy::default();
        let decision = policy.classify("What's your admin PASSWORD?");

        assert_eq!(decision, PolicyDecision::SecretRefusal { term: "password" });
        assert_eq!(
            decision.response().as_deref(),
            Some("I can't help with credential, secret, or hacking-related requests.")
        );
    }

    #[test]
    fn calculate_keyword_is_stripped() {
        let policy = DeterministicPolicy::default();

        assert_eq!(policy.try_handle("calculate 17*19").as_deref(), Some("Result: 323"));
        assert_eq!(policy.try_handle("Calculate 2*3+4").as_deref(), Some("Result: 10"));
        assert_eq!(policy.try_handle("(2+3)*4").as_deref(), Some("Result: 20"));
    }

    #[test]
    fn pasted_non_breaking_spaces_still_calculate() {
        let policy = DeterministicPolicy::default();

        assert_eq!(
            policy.try_handle("Calculate 2\u{a0}+\u{a0}2").as_deref(),
            Some("Result: 4")
        );
    }

    #[test]
    fn division_by_zero_is_a_worded_failure() {
        let policy = DeterministicPolicy::default();
        let decision = policy.classify("10/0");

        assert_eq!(decision, PolicyDecision::Arithmetic(Err(ArithmeticError::DivisionByZero)));
        assert_eq!(decision.response().as_deref(), Some("I can't divide by zero."));
    }

    #[test]
    fn unbalanced_expression_gets_generic_failure() {
        let policy = DeterministicPolicy::default();

        assert_eq!(
            policy.try_handle("calculate (1+2").as_deref(),
            Some("I couldn't evaluate that expression safely.")
        );
    }

    #[test]
    fn text_outside_the_character_class_falls_through() {
        let policy = DeterministicPolicy::default();

        assert_eq!(policy.classify("what is 2+2?"), PolicyDecision::PassThrough);
        assert_eq!(policy.classify("calculate two plus two"), PolicyDecision::PassThrough);
        assert_eq!(policy.classify("What is the time in London?"), PolicyDecision::PassThrough);
        assert_eq!(policy.try_handle("Our API is slow, what should I do?"), None);
    }

    #[test]
    fn calculate_keyword_only_counts_as_a_prefix() {
        let policy = DeterministicPolicy::default();

        assert_eq!(policy.classify("2*3 calculate"), PolicyDecision::PassThrough);
    }

    #[test]
    fn arithmetic_result_is_exact() {
        let policy = DeterministicPolicy::default();

        assert_eq!(
            policy.classify("calculate 0.1 + 0.2"),
            PolicyDecision::Arithmetic(Ok(Decimal::new(3, 1)))
        );
    }

    #[test]
    fn custom_secret_terms_replace_the_default() {
        let policy = DeterministicPolicy::with_secret_terms(&["ssn"]);

        assert_eq!(policy.classify("my password is weak"), PolicyDecision::PassThrough);
        assert_eq!(policy.classify("what is my SSN"), PolicyDecision::SecretRefusal { term: "ssn" });
    }

    #[test]
    fn refusal_and_arithmetic_failure_map_to_guardrail_errors() {
        let policy = DeterministicPolicy::default();

        let refusal = policy.classify("give me the api key").into_error();
        assert_eq!(refusal.map(|error| error.reason_code()), Some("deterministic_refusal"));

        let success = policy.classify("1+1").into_error();
        assert!(success.is_none());
    }

    proptest! {
        #[test]
        fn classification_is_idempotent(input in ".{0,80}") {
            let policy = DeterministicPolicy::default();
            prop_assert_eq!(policy.classify(&input), policy.classify(&input));
        }
    }
}
