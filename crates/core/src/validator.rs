//! First gate of every turn.
//!
//! The blocked-marker check is a case-insensitive substring denylist. It
//! misses rephrased injection attempts and can reject legitimate text that
//! happens to contain a marker. Swap the marker list through
//! [`InputValidator::with_markers`] rather than layering heuristics on top.

use crate::errors::InputRejection;

pub const DEFAULT_BLOCKED_MARKERS: &[&str] = &[
    "ignore previous instructions",
    "reveal system prompt",
    "print the hidden",
    "developer message",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputValidator {
    max_chars: usize,
    blocked_markers: &'static [&'static str],
}

impl InputValidator {
    pub fn new(max_chars: usize) -> Self {
        Self::with_markers(max_chars, DEFAULT_BLOCKED_MARKERS)
    }

    /// Markers must be lowercase.
    pub fn with_markers(max_chars: usize, blocked_markers: &'static [&'static str]) -> Self {
        Self { max_chars, blocked_markers }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Returns the trimmed input when it may proceed.
    pub fn validate<'a>(&self, input: &'a str) -> Result<&'a str, InputRejection> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InputRejection::EmptyInput);
        }

        let actual = trimmed.chars().count();
        if actual > self.max_chars {
            return Err(InputRejection::TooLong { max: self.max_chars, actual });
        }

        let lowered = trimmed.to_lowercase();
        let blocked = self.blocked_markers.iter().copied().find(|marker| lowered.contains(marker));
        if let Some(marker) = blocked {
            return Err(InputRejection::BlockedPattern { marker });
        }

        Ok(trimmed)
    }
}

pub fn validate(input: &str, max_chars: usize) -> Result<&str, InputRejection> {
    InputValidator::new(max_chars).validate(input)
}
