//! Ascent Attempt Progression & Gating Engine
//!
//! The pure core of the Ascent coach: legal attempt-state transitions,
//! thinking-gate validation, static heuristics and forbidden-concept scans,
//! the gating decision that fuses their evidence, hint budgeting, idempotent
//! mastery tracking, and next-problem progression.
//!
//! Every component here is a synchronous, side-effect-free function over
//! immutable inputs. The engine performs no I/O: the orchestration layer
//! gathers external evidence (test runs, optional LLM review), calls in with
//! the results materialized, and persists whatever comes back.

pub mod attempt;
pub mod forbidden;
pub mod gating;
pub mod heuristics;
pub mod hints;
pub mod mastery;
pub mod pattern;
pub mod progression;
pub mod state_machine;
pub mod thinking_gate;

pub use attempt::{Attempt, AttemptState, Score, Step, StepResult, StepType, HINT_SCORE_PENALTY};
pub use forbidden::{scan as scan_forbidden, ForbiddenConcept, ForbiddenMatch, Severity};
pub use gating::{
    decide as decide_gating, GatingAction, GatingContext, GatingDecision, LlmEvidence,
    ReflectionType, RubricGrade, LLM_CONFIDENCE_FLOOR, MAX_UNPENALIZED_HINTS,
};
pub use heuristics::{
    analyze as analyze_heuristics, heuristics_for, ErrorCategory, Heuristic, HeuristicFinding,
};
pub use hints::{hint_text, HintBudget, HintLevel, HINT_BUDGET_TOTAL};
pub use mastery::{
    apply_mastery, is_rung_unlocked, MasteryUpdate, SkillKey, SkillState, MAX_ALPHA,
    RUNG_UNLOCK_THRESHOLD,
};
pub use pattern::Pattern;
pub use progression::{
    decide_progression, select_sibling, AttemptOutcome, ProgressionAction, ProgressionDecision,
    CONSECUTIVE_FAILURE_LIMIT, LOW_SCORE_THRESHOLD, MASTERY_WINDOW, MIN_ATTEMPTS_FOR_PROMOTION,
    PROMOTION_AVERAGE,
};
pub use state_machine::{
    abandon, transition, InvalidTransition, StepEvidence, TransitionResult,
};
pub use thinking_gate::{validate as validate_thinking_gate, GateOutcome, MIN_INVARIANT_LEN};
