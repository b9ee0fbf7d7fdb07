//! Boundary contracts for the external collaborators.
//!
//! The engine never talks to the sandboxed code executor or the LLM evidence
//! provider; the use-case layer does, through the traits here, and hands the
//! materialized results in. Implementations may block internally: real
//! deployments wrap their transport of choice behind these traits, and the
//! bundled stub/null implementations keep the server and tests runnable
//! without either service.

use std::collections::VecDeque;
use std::sync::Mutex;

use ascent_engine::{HeuristicFinding, LlmEvidence, Pattern};

use crate::catalog::TestCase;
use crate::error::{CoachError, Result};

// ============================================================================
// Code executor
// ============================================================================

/// Result of running a submission against a problem's test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// Test cases that passed.
    pub passed: u32,
    /// Total test cases run.
    pub total: u32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Sandbox-level error (compile failure, timeout), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Returns `true` if every test case passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

/// The sandboxed code-execution service, seen from the use-case layer.
pub trait CodeExecutor: Send + Sync {
    /// Runs a submission against the problem's test cases.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::ExecutionFailed` on infrastructure failure;
    /// user-code failures are reported inside the outcome, not as errors.
    fn execute(&self, code: &str, language: &str, tests: &[TestCase]) -> Result<ExecutionOutcome>;
}

/// Placeholder executor used until a sandbox service is attached.
///
/// Reports every test as passing for non-empty submissions and everything
/// failing for empty ones. Good enough to drive the flow end to end; not a
/// judgment of the code.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubExecutor;

impl CodeExecutor for StubExecutor {
    fn execute(&self, code: &str, _language: &str, tests: &[TestCase]) -> Result<ExecutionOutcome> {
        let total = u32::try_from(tests.len()).unwrap_or(u32::MAX);
        let passed = if code.trim().is_empty() { 0 } else { total };
        Ok(ExecutionOutcome {
            passed,
            total,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
        })
    }
}

/// Test executor that replays a scripted sequence of outcomes.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<ExecutionOutcome>>,
}

impl ScriptedExecutor {
    /// Creates an executor that replays `outcomes` in order.
    #[must_use]
    pub fn new(outcomes: impl IntoIterator<Item = ExecutionOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    /// An outcome with `passed` of `total` tests green.
    #[must_use]
    pub fn outcome(passed: u32, total: u32) -> ExecutionOutcome {
        ExecutionOutcome {
            passed,
            total,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
        }
    }
}

impl CodeExecutor for ScriptedExecutor {
    fn execute(&self, _code: &str, _language: &str, tests: &[TestCase]) -> Result<ExecutionOutcome> {
        let mut outcomes = self
            .outcomes
            .lock()
            .map_err(|_| CoachError::storage("scripted executor lock poisoned"))?;
        outcomes.pop_front().map_or_else(
            || {
                Ok(ExecutionOutcome {
                    passed: 0,
                    total: u32::try_from(tests.len()).unwrap_or(u32::MAX),
                    stdout: String::new(),
                    stderr: String::new(),
                    error: None,
                })
            },
            Ok,
        )
    }
}

// ============================================================================
// Evidence provider
// ============================================================================

/// The optional LLM evidence provider, seen from the use-case layer.
///
/// Absence (or failure) of a provider degrades grading to heuristic-only
/// evidence; it is never fatal.
pub trait EvidenceProvider: Send + Sync {
    /// Reviews a submission, returning evidence when the provider has any.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::EvidenceUnavailable` on provider failure; the
    /// caller logs and proceeds without evidence.
    fn review(
        &self,
        code: &str,
        language: &str,
        pattern: Pattern,
        heuristic_findings: &[HeuristicFinding],
    ) -> Result<Option<LlmEvidence>>;
}

/// The default provider: never produces evidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvidenceProvider;

impl EvidenceProvider for NullEvidenceProvider {
    fn review(
        &self,
        _code: &str,
        _language: &str,
        _pattern: Pattern,
        _heuristic_findings: &[HeuristicFinding],
    ) -> Result<Option<LlmEvidence>> {
        Ok(None)
    }
}

/// Test provider that always returns the same evidence.
#[derive(Debug, Clone)]
pub struct StaticEvidenceProvider {
    evidence: LlmEvidence,
}

impl StaticEvidenceProvider {
    /// Creates a provider that always returns `evidence`.
    #[must_use]
    pub const fn new(evidence: LlmEvidence) -> Self {
        Self { evidence }
    }
}

impl EvidenceProvider for StaticEvidenceProvider {
    fn review(
        &self,
        _code: &str,
        _language: &str,
        _pattern: Pattern,
        _heuristic_findings: &[HeuristicFinding],
    ) -> Result<Option<LlmEvidence>> {
        Ok(Some(self.evidence.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ascent_engine::RubricGrade;

    fn tests_of(n: usize) -> Vec<TestCase> {
        (0..n)
            .map(|i| TestCase::new(format!("in{i}"), format!("out{i}")))
            .collect()
    }

    #[test]
    fn test_all_passed() {
        assert!(ScriptedExecutor::outcome(3, 3).all_passed());
        assert!(!ScriptedExecutor::outcome(2, 3).all_passed());
        assert!(!ScriptedExecutor::outcome(0, 0).all_passed());
    }

    #[test]
    fn test_stub_executor_passes_non_empty_code() {
        let outcome = StubExecutor
            .execute("return 42", "python", &tests_of(3))
            .unwrap();
        assert_eq!(outcome.passed, 3);
        assert!(outcome.all_passed());
    }

    #[test]
    fn test_stub_executor_fails_empty_code() {
        let outcome = StubExecutor.execute("   ", "python", &tests_of(3)).unwrap();
        assert_eq!(outcome.passed, 0);
    }

    #[test]
    fn test_scripted_executor_replays_in_order() {
        let executor = ScriptedExecutor::new([
            ScriptedExecutor::outcome(1, 3),
            ScriptedExecutor::outcome(3, 3),
        ]);
        let first = executor.execute("x", "python", &tests_of(3)).unwrap();
        assert_eq!(first.passed, 1);
        let second = executor.execute("x", "python", &tests_of(3)).unwrap();
        assert_eq!(second.passed, 3);
        // Script exhausted: everything fails.
        let third = executor.execute("x", "python", &tests_of(3)).unwrap();
        assert_eq!(third.passed, 0);
    }

    #[test]
    fn test_null_provider_returns_no_evidence() {
        let evidence = NullEvidenceProvider
            .review("code", "python", Pattern::SlidingWindow, &[])
            .unwrap();
        assert!(evidence.is_none());
    }

    #[test]
    fn test_static_provider_returns_its_evidence() {
        let provider = StaticEvidenceProvider::new(LlmEvidence {
            grade: RubricGrade::Fail,
            confidence: 0.9,
            errors: Vec::new(),
            feedback: None,
        });
        let evidence = provider
            .review("code", "python", Pattern::SlidingWindow, &[])
            .unwrap()
            .unwrap();
        assert_eq!(evidence.grade, RubricGrade::Fail);
    }
}
