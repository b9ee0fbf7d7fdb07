//! Thinking-gate validation.
//!
//! Before any code is accepted, the learner states which pattern they intend
//! to apply and the invariant their solution will maintain. The gate checks,
//! in order: pattern match (hard), invariant length (hard), and invariant
//! vocabulary (soft). Hard failures block the transition to coding; soft
//! warnings are surfaced to the learner but do not block.

use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;

/// Minimum length of an acceptable invariant statement.
pub const MIN_INVARIANT_LEN: usize = 10;

/// Structured outcome of a thinking-gate submission.
///
/// The gate passes iff `errors` is empty. This is data, not an `Err`: a
/// failed gate is a normal coaching event the learner resubmits through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    /// Hard failures; any entry blocks the transition to coding.
    pub errors: Vec<String>,
    /// Soft findings surfaced to the learner without blocking.
    pub warnings: Vec<String>,
}

impl GateOutcome {
    /// Returns `true` if the gate passed (no hard errors).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a thinking-gate submission against the problem's expected
/// pattern.
///
/// Checks run in order and all accumulate; a pattern mismatch does not hide
/// a too-short invariant.
#[must_use]
pub fn validate(expected: Pattern, chosen: Pattern, invariant: &str) -> GateOutcome {
    let mut outcome = GateOutcome::default();
    let invariant = invariant.trim();

    if chosen != expected {
        outcome.errors.push(format!(
            "selected pattern '{chosen}' does not match the problem's pattern '{expected}'"
        ));
    }

    if invariant.chars().count() < MIN_INVARIANT_LEN {
        outcome.errors.push(format!(
            "invariant statement must be at least {MIN_INVARIANT_LEN} characters"
        ));
    }

    let lowered = invariant.to_lowercase();
    let keywords = expected.invariant_keywords();
    if !keywords.iter().any(|kw| lowered.contains(kw)) {
        outcome.warnings.push(format!(
            "invariant does not mention any {} vocabulary (expected one of: {})",
            expected.label(),
            keywords.join(", ")
        ));
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_submission_passes_cleanly() {
        let outcome = validate(
            Pattern::SlidingWindow,
            Pattern::SlidingWindow,
            "the window between left and right always contains at most k distinct values",
        );
        assert!(outcome.passed());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_pattern_mismatch_is_a_hard_error() {
        let outcome = validate(
            Pattern::SlidingWindow,
            Pattern::TwoPointers,
            "the window stays valid as it expands",
        );
        assert!(!outcome.passed());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("two_pointers"));
        assert!(outcome.errors[0].contains("sliding_window"));
    }

    #[test]
    fn test_short_invariant_is_a_hard_error() {
        let outcome = validate(Pattern::BinarySearch, Pattern::BinarySearch, "mid ok");
        assert!(!outcome.passed());
        assert!(outcome.errors[0].contains("10 characters"));
    }

    #[test]
    fn test_whitespace_does_not_count_toward_length() {
        let outcome = validate(Pattern::BinarySearch, Pattern::BinarySearch, "   mid   ");
        assert!(!outcome.passed());
    }

    #[test]
    fn test_missing_keywords_is_a_soft_warning() {
        let outcome = validate(
            Pattern::GridDfs,
            Pattern::GridDfs,
            "I will walk over the matrix and count islands carefully",
        );
        assert!(outcome.passed());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Grid DFS"));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let outcome = validate(
            Pattern::SlidingWindow,
            Pattern::SlidingWindow,
            "The WINDOW never shrinks below zero elements",
        );
        assert!(outcome.passed());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_errors_accumulate() {
        let outcome = validate(Pattern::SlidingWindow, Pattern::BinarySearch, "short");
        assert_eq!(outcome.errors.len(), 2);
    }
}
