//! Attempt state machine.
//!
//! A pure transition function over the attempt flow: thinking gate, coding,
//! hints, reflection, completion. The machine owns no I/O; callers evaluate
//! the gate/gating/budget evidence first and pass the verdicts in.
//!
//! Legal transitions:
//!
//! | From          | To         | Trigger                                  |
//! |---------------|------------|------------------------------------------|
//! | ThinkingGate  | Coding     | Thinking-gate validation passes          |
//! | Coding        | Hint       | Hint requested and affordable            |
//! | Coding        | Reflection | Gating decision requires reflection      |
//! | Coding        | Completed  | All tests pass and gating proceeds       |
//! | Hint          | Coding     | Learner resumes coding                   |
//! | Hint          | Reflection | Gating decision requires reflection      |
//! | Hint          | Completed  | All tests pass and gating proceeds       |
//! | Reflection    | Coding     | Reflection submitted                     |
//!
//! Any other (state, step type) pair is rejected with [`InvalidTransition`].

use crate::attempt::{AttemptState, StepType};
use crate::gating::GatingAction;

// ============================================================================
// Errors
// ============================================================================

/// An illegal (state, step type) combination.
///
/// Always surfaced to the caller; never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition: cannot apply a {step_type} step in state {from}")]
pub struct InvalidTransition {
    /// The attempt's current state.
    pub from: AttemptState,
    /// The rejected step type.
    pub step_type: StepType,
}

/// Result alias for transition evaluation.
pub type TransitionResult = Result<AttemptState, InvalidTransition>;

// ============================================================================
// Evidence
// ============================================================================

/// Pre-evaluated evidence accompanying a step.
///
/// The machine never computes verdicts itself; the use-case layer runs the
/// thinking gate, gating engine, and hint budget, then hands the outcomes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvidence {
    /// A thinking-gate submission; `passed` iff the gate had no errors.
    ThinkingGate {
        /// Whether validation produced zero hard errors.
        passed: bool,
    },
    /// A code submission judged by the gating engine.
    Submission {
        /// The gating verdict for this submission.
        action: GatingAction,
        /// Whether every test case passed.
        all_tests_passed: bool,
    },
    /// A hint request checked against the budget.
    HintRequested {
        /// Whether the requested level fits the remaining budget.
        affordable: bool,
    },
    /// The learner resumes coding after reading a hint.
    Resume,
    /// A reflection write-up was submitted.
    ReflectionSubmitted,
}

// ============================================================================
// Transition function
// ============================================================================

/// Evaluates one step against the transition table.
///
/// Returns the new state, which may equal `current`: a failed thinking gate,
/// an unaffordable hint, or a blocked submission leaves the attempt where it
/// is without being an error.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the (state, step type) pair is not in
/// the table, or when the evidence variant does not belong to the step type.
pub fn transition(
    current: AttemptState,
    step_type: StepType,
    evidence: StepEvidence,
) -> TransitionResult {
    let rejected = || InvalidTransition {
        from: current,
        step_type,
    };

    match (current, step_type) {
        (AttemptState::ThinkingGate, StepType::ThinkingGate) => match evidence {
            StepEvidence::ThinkingGate { passed: true } => Ok(AttemptState::Coding),
            StepEvidence::ThinkingGate { passed: false } => Ok(AttemptState::ThinkingGate),
            _ => Err(rejected()),
        },
        (AttemptState::Coding, StepType::Hint) => match evidence {
            StepEvidence::HintRequested { affordable: true } => Ok(AttemptState::Hint),
            // Budget exhaustion degrades gracefully: the learner stays in
            // Coding rather than receiving an error.
            StepEvidence::HintRequested { affordable: false } => Ok(AttemptState::Coding),
            _ => Err(rejected()),
        },
        (AttemptState::Coding | AttemptState::Hint, StepType::Coding) => match evidence {
            StepEvidence::Submission {
                action,
                all_tests_passed,
            } => Ok(submission_target(action, all_tests_passed)),
            StepEvidence::Resume if current == AttemptState::Hint => Ok(AttemptState::Coding),
            _ => Err(rejected()),
        },
        (AttemptState::Reflection, StepType::Reflection) => match evidence {
            StepEvidence::ReflectionSubmitted => Ok(AttemptState::Coding),
            _ => Err(rejected()),
        },
        _ => Err(rejected()),
    }
}

/// Target state for a judged code submission.
const fn submission_target(action: GatingAction, all_tests_passed: bool) -> AttemptState {
    match action {
        GatingAction::RequireReflection => AttemptState::Reflection,
        GatingAction::Proceed if all_tests_passed => AttemptState::Completed,
        // Blocked submissions, micro-lessons, and green-light verdicts with
        // failing tests all keep the learner coding.
        GatingAction::Proceed | GatingAction::BlockSubmission | GatingAction::ShowMicroLesson => {
            AttemptState::Coding
        }
    }
}

/// Retires an attempt from any non-terminal state.
///
/// Abandonment is not a step; it is a separate operation available until the
/// attempt reaches a terminal state.
///
/// # Errors
///
/// Returns [`InvalidTransition`] (with the state's own step-type slot filled
/// by [`StepType::Coding`]) when the attempt is already terminal.
pub fn abandon(current: AttemptState) -> TransitionResult {
    if current.is_terminal() {
        return Err(InvalidTransition {
            from: current,
            step_type: StepType::Coding,
        });
    }
    Ok(AttemptState::Abandoned)
}
