//! Error types for the Ascent orchestrator.
//!
//! This module defines the error hierarchy for the use-case layer:
//! configuration loading, attempt lookup and persistence, concurrency
//! conflicts, and the external collaborator boundaries. Engine decisions are
//! values, never errors; only genuine failures end up here.

use std::path::PathBuf;

use ascent_engine::{InvalidTransition, Pattern};

/// A specialized `Result` type for orchestrator operations.
pub type Result<T> = std::result::Result<T, CoachError>;

/// Errors that can occur while orchestrating an Ascent session.
///
/// Error variants are organized by subsystem and include actionable
/// suggestions where possible.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your ascent.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No attempt exists with the given id.
    #[error("Attempt not found: '{attempt_id}'")]
    AttemptNotFound {
        /// The id that failed to resolve.
        attempt_id: String,
    },

    /// No problem exists with the given id.
    #[error("Problem not found: '{problem_id}'\n\nSuggestion: Check the catalog or the problemId in the request")]
    ProblemNotFound {
        /// The id that failed to resolve.
        problem_id: String,
    },

    /// The learner has not unlocked the problem's rung yet.
    #[error("Rung {rung} of {pattern} is locked: reach a mastery score of 70 on rung {} first", .rung - 1)]
    RungLocked {
        /// Pattern of the requested problem.
        pattern: Pattern,
        /// Rung that is still locked.
        rung: u8,
    },

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Illegal (state, step type) combination. Surfaced to the caller,
    /// never retried automatically.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    // ========================================================================
    // Concurrency Errors
    // ========================================================================
    /// Optimistic update lost the race; re-read and retry the cycle.
    #[error("Attempt '{attempt_id}' was modified concurrently\n\nSuggestion: Re-read the attempt and retry the submission")]
    VersionConflict {
        /// The attempt whose version check failed.
        attempt_id: String,
    },

    /// The skill store's compare-and-set failed concurrently. The caller
    /// must retry the read-decide-write cycle, not reapply blindly.
    #[error("Concurrent mastery update for attempt '{attempt_id}'\n\nSuggestion: Retry the read-decide-write cycle")]
    IdempotencyConflict {
        /// The attempt whose mastery apply lost the race.
        attempt_id: String,
    },

    // ========================================================================
    // Collaborator Boundary Errors
    // ========================================================================
    /// The sandboxed code executor failed (infrastructure, not user code).
    #[error("Code execution failed: {message}\n\nSuggestion: Check the execution service and retry")]
    ExecutionFailed {
        /// Description of the executor failure.
        message: String,
    },

    /// The optional LLM evidence provider errored or timed out. Not fatal:
    /// grading degrades to heuristic-only evidence.
    #[error("Evidence provider unavailable: {message}")]
    EvidenceUnavailable {
        /// Description of the provider failure.
        message: String,
    },

    // ========================================================================
    // Storage and I/O Errors
    // ========================================================================
    /// The backing store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoachError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `AttemptNotFound` error.
    #[must_use]
    pub fn attempt_not_found(attempt_id: impl Into<String>) -> Self {
        Self::AttemptNotFound {
            attempt_id: attempt_id.into(),
        }
    }

    /// Creates a new `ProblemNotFound` error.
    #[must_use]
    pub fn problem_not_found(problem_id: impl Into<String>) -> Self {
        Self::ProblemNotFound {
            problem_id: problem_id.into(),
        }
    }

    /// Creates a new `VersionConflict` error.
    #[must_use]
    pub fn version_conflict(attempt_id: impl Into<String>) -> Self {
        Self::VersionConflict {
            attempt_id: attempt_id.into(),
        }
    }

    /// Creates a new `IdempotencyConflict` error.
    #[must_use]
    pub fn idempotency_conflict(attempt_id: impl Into<String>) -> Self {
        Self::IdempotencyConflict {
            attempt_id: attempt_id.into(),
        }
    }

    /// Creates a new `ExecutionFailed` error.
    #[must_use]
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Creates a new `EvidenceUnavailable` error.
    #[must_use]
    pub fn evidence_unavailable(message: impl Into<String>) -> Self {
        Self::EvidenceUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is transient and the operation may be
    /// retried as-is.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. }
                | Self::IdempotencyConflict { .. }
                | Self::ExecutionFailed { .. }
                | Self::EvidenceUnavailable { .. }
        )
    }

    /// Returns `true` if this error is fatal and requires operator action.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. }
        )
    }
}
