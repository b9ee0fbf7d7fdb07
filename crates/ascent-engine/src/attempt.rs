//! Attempt and step records for a single problem session.
//!
//! An [`Attempt`] tracks one learner working one problem: its state-machine
//! position, the ordered [`Step`] history, hint spend, and the final score.
//! State changes go through [`Attempt::apply_state`] so the
//! `completed_at`-iff-`Completed` invariant holds in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gating::RubricGrade;
use crate::hints::HintLevel;
use crate::pattern::Pattern;

// ============================================================================
// AttemptState
// ============================================================================

/// Position of an attempt in the coaching flow.
///
/// Transitions between states are legal only through the transition table in
/// the state machine module; see [`crate::state_machine::transition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Learner must state a pattern and invariant before coding.
    #[default]
    ThinkingGate,
    /// Learner is writing and submitting code.
    Coding,
    /// Learner is reading a granted hint.
    Hint,
    /// Learner must submit a reflection before resuming.
    Reflection,
    /// Attempt finished successfully.
    Completed,
    /// Attempt given up before completion.
    Abandoned,
}

impl AttemptState {
    /// Returns `true` if this state is terminal.
    ///
    /// Terminal states are `Completed` and `Abandoned`; no step is accepted
    /// once an attempt reaches one of them.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Returns the stable wire identifier for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ThinkingGate => "thinking_gate",
            Self::Coding => "coding",
            Self::Hint => "hint",
            Self::Reflection => "reflection",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for AttemptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Step
// ============================================================================

/// Kind of step a learner submits against an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Pattern choice plus invariant statement.
    ThinkingGate,
    /// A code submission (or a resume after a hint).
    Coding,
    /// A hint request.
    Hint,
    /// A reflection write-up.
    Reflection,
}

impl StepType {
    /// Returns the stable wire identifier for this step type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ThinkingGate => "thinking_gate",
            Self::Coding => "coding",
            Self::Hint => "hint",
            Self::Reflection => "reflection",
        }
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    /// The step achieved its goal (gate passed, tests green, ...).
    Passed,
    /// The step fell short (gate errors, tests red, reflection required).
    Failed,
    /// The submission was rejected outright (forbidden concept).
    Blocked,
    /// A hint was granted.
    Granted,
    /// The step was recorded without a pass/fail verdict.
    Recorded,
}

/// One entry in an attempt's append-only step history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// What kind of step this was.
    pub step_type: StepType,

    /// Outcome of the step.
    pub result: StepResult,

    /// Free-form step payload (submitted invariant, gating verdict,
    /// granted hint level, ...). Shape varies by step type.
    #[serde(default)]
    pub data: serde_json::Value,

    /// When the step began processing.
    pub started_at: DateTime<Utc>,

    /// When the step finished processing.
    pub completed_at: DateTime<Utc>,
}

impl Step {
    /// Creates a step stamped with a single instant.
    #[must_use]
    pub fn new(
        step_type: StepType,
        result: StepResult,
        data: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            step_type,
            result,
            data,
            started_at: at,
            completed_at: at,
        }
    }
}

// ============================================================================
// Score
// ============================================================================

/// Per-point penalty applied for every hint consumed during an attempt.
pub const HINT_SCORE_PENALTY: f64 = 5.0;

/// Structured rubric breakdown for a finished code submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Test cases that passed.
    pub tests_passed: u32,
    /// Total test cases run.
    pub tests_total: u32,
    /// Points deducted for hint usage.
    pub hint_penalty: f64,
    /// Final score in [0, 100].
    pub total: f64,
}

impl Score {
    /// Computes the score for a submission.
    ///
    /// `total = pass_ratio * 100 − 5 × hints_used`, clamped to [0, 100].
    /// A run with zero test cases scores 0.
    #[must_use]
    pub fn compute(tests_passed: u32, tests_total: u32, hints_used: u32) -> Self {
        let ratio = if tests_total == 0 {
            0.0
        } else {
            f64::from(tests_passed) / f64::from(tests_total)
        };
        let hint_penalty = HINT_SCORE_PENALTY * f64::from(hints_used);
        let total = (ratio * 100.0 - hint_penalty).clamp(0.0, 100.0);
        Self {
            tests_passed,
            tests_total,
            hint_penalty,
            total,
        }
    }

    /// Maps test results to a rubric grade: all green is `Pass`, some green
    /// is `Partial`, none green is `Fail`.
    #[must_use]
    pub const fn grade(&self) -> RubricGrade {
        if self.tests_total > 0 && self.tests_passed == self.tests_total {
            RubricGrade::Pass
        } else if self.tests_passed > 0 {
            RubricGrade::Partial
        } else {
            RubricGrade::Fail
        }
    }
}

// ============================================================================
// Attempt
// ============================================================================

/// One learner working one problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// Attempt identifier.
    pub id: String,

    /// Tenant the learner belongs to.
    pub tenant: String,

    /// Learner identifier.
    pub user: String,

    /// Problem being attempted.
    pub problem_id: String,

    /// Pattern the problem is classified under.
    pub pattern: Pattern,

    /// Difficulty-ladder rung of the problem.
    pub rung: u8,

    /// Current state-machine position.
    pub state: AttemptState,

    /// Append-only step history, in submission order.
    pub steps: Vec<Step>,

    /// Hint levels consumed, in grant order.
    pub hints_used: Vec<HintLevel>,

    /// Number of code submissions made.
    pub code_submissions: u32,

    /// Rubric breakdown, present once the attempt completes.
    pub score: Option<Score>,

    /// When the attempt was created.
    pub started_at: DateTime<Utc>,

    /// Set iff `state == Completed`.
    pub completed_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency version, bumped by the repository on update.
    #[serde(default)]
    pub version: u64,
}

impl Attempt {
    /// Creates a fresh attempt in the `ThinkingGate` state.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        tenant: impl Into<String>,
        user: impl Into<String>,
        problem_id: impl Into<String>,
        pattern: Pattern,
        rung: u8,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant: tenant.into(),
            user: user.into(),
            problem_id: problem_id.into(),
            pattern,
            rung,
            state: AttemptState::ThinkingGate,
            steps: Vec::new(),
            hints_used: Vec::new(),
            code_submissions: 0,
            score: None,
            started_at: now,
            completed_at: None,
            version: 0,
        }
    }

    /// Moves the attempt to `new_state`, maintaining the
    /// `completed_at`-iff-`Completed` invariant.
    pub fn apply_state(&mut self, new_state: AttemptState, now: DateTime<Utc>) {
        self.state = new_state;
        self.completed_at = if new_state == AttemptState::Completed {
            Some(now)
        } else {
            None
        };
    }

    /// Appends a step to the history.
    pub fn record_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Number of hints consumed so far.
    #[must_use]
    pub fn hint_count(&self) -> u32 {
        u32::try_from(self.hints_used.len()).unwrap_or(u32::MAX)
    }

    /// Returns the most recent step of the given type, if any.
    #[must_use]
    pub fn last_step_of(&self, step_type: StepType) -> Option<&Step> {
        self.steps.iter().rev().find(|s| s.step_type == step_type)
    }

    /// Returns `true` if the attempt can accept no further steps.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
