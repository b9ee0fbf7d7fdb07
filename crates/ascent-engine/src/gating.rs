//! Gating decision engine.
//!
//! After every code submission, the evidence gathered by the use-case layer
//! (forbidden-concept matches, heuristic findings, test-derived rubric grade,
//! optional LLM review) is fused into exactly one [`GatingDecision`]. Rules
//! evaluate in strict priority order and the first match wins; probabilistic
//! evidence can sharpen the grade but never overrides the safety rules.

use serde::{Deserialize, Serialize};

use crate::forbidden::{ForbiddenMatch, Severity};
use crate::heuristics::{ErrorCategory, HeuristicFinding};
use crate::pattern::Pattern;

// ============================================================================
// Grades and evidence
// ============================================================================

/// Rubric grade for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricGrade {
    /// Every test case passed.
    Pass,
    /// Some test cases passed.
    Partial,
    /// No test case passed.
    Fail,
}

/// Review produced by the optional LLM evidence provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmEvidence {
    /// The provider's grade for the submission.
    pub grade: RubricGrade,
    /// The provider's confidence in [0, 1].
    pub confidence: f64,
    /// Mistakes the provider called out.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Free-form feedback for the learner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Minimum LLM confidence before its grade supersedes the heuristic grade.
pub const LLM_CONFIDENCE_FLOOR: f64 = 0.8;

/// Hints a learner may spend and still proceed on a partial grade.
pub const MAX_UNPENALIZED_HINTS: u32 = 2;

// ============================================================================
// Decision types
// ============================================================================

/// Reflection exercise assigned when a mistake recurs or the grade fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionType {
    /// Walk through the time/space complexity of the approach.
    ComplexityAnalysis,
    /// Re-state and check the solution's invariant.
    InvariantReview,
    /// Trace the solution through boundary inputs.
    EdgeCaseWalkthrough,
    /// Justify the chosen approach from first principles.
    ApproachJustification,
    /// Explain the solution without leaning on the granted hints.
    HintReliance,
}

/// The gating verdict for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingAction {
    /// Reject the submission outright (forbidden concept).
    BlockSubmission,
    /// Interrupt with a targeted micro-lesson.
    ShowMicroLesson,
    /// Require a reflection before coding continues.
    RequireReflection,
    /// Let the attempt proceed.
    Proceed,
}

/// Everything the engine needs to judge one submission.
#[derive(Debug, Clone)]
pub struct GatingContext {
    /// Pattern of the attempted problem.
    pub pattern: Pattern,
    /// Rung of the attempted problem.
    pub rung: u8,
    /// Test-derived rubric grade.
    pub grade: RubricGrade,
    /// Heuristic findings for this submission.
    pub heuristic_findings: Vec<HeuristicFinding>,
    /// Forbidden-concept matches for this submission.
    pub forbidden_matches: Vec<ForbiddenMatch>,
    /// Error categories detected on the previous submission of this attempt.
    pub prior_error_categories: Vec<ErrorCategory>,
    /// Hints consumed so far on this attempt.
    pub hints_used: u32,
    /// Code submissions made so far, including this one.
    pub code_submissions: u32,
    /// Optional LLM review; absence degrades to heuristic-only grading.
    pub llm: Option<LlmEvidence>,
}

/// One decision per submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingDecision {
    /// What happens next.
    pub action: GatingAction,
    /// Human-readable justification.
    pub reason: String,
    /// Micro-lesson to show, set iff `action == ShowMicroLesson`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micro_lesson_id: Option<String>,
    /// Reflection to require, set iff `action == RequireReflection`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_type: Option<ReflectionType>,
}

impl GatingDecision {
    fn proceed(reason: impl Into<String>) -> Self {
        Self {
            action: GatingAction::Proceed,
            reason: reason.into(),
            micro_lesson_id: None,
            reflection_type: None,
        }
    }

    fn block(reason: impl Into<String>) -> Self {
        Self {
            action: GatingAction::BlockSubmission,
            reason: reason.into(),
            micro_lesson_id: None,
            reflection_type: None,
        }
    }

    fn micro_lesson(reason: impl Into<String>, lesson_id: String) -> Self {
        Self {
            action: GatingAction::ShowMicroLesson,
            reason: reason.into(),
            micro_lesson_id: Some(lesson_id),
            reflection_type: None,
        }
    }

    fn reflection(reason: impl Into<String>, reflection_type: ReflectionType) -> Self {
        Self {
            action: GatingAction::RequireReflection,
            reason: reason.into(),
            micro_lesson_id: None,
            reflection_type: Some(reflection_type),
        }
    }
}

// ============================================================================
// Decision function
// ============================================================================

/// Fuses the submission evidence into a single decision.
///
/// Priority order, first match wins:
///
/// 1. Any error-severity forbidden-concept match blocks the submission.
/// 2. Any core-error heuristic finding shows the matching micro-lesson.
/// 3. A category repeated from the previous submission, or a failing grade,
///    requires a reflection.
/// 4. A passing grade, or a partial grade with at most two hints, proceeds.
/// 5. Fallback (partial grade with heavy hint use) requires a reflection.
///
/// A high-confidence LLM grade that disagrees with the heuristic grade
/// supersedes it before rules 3–5; it never affects rules 1–2.
#[must_use]
pub fn decide(ctx: &GatingContext) -> GatingDecision {
    // Rule 1: forbidden concepts are absolute.
    if let Some(blocked) = ctx
        .forbidden_matches
        .iter()
        .find(|m| m.severity == Severity::Error)
    {
        return GatingDecision::block(format!(
            "forbidden concept '{}': {}",
            blocked.concept_id, blocked.reason
        ));
    }

    // Rule 2: pattern-specific core errors get a micro-lesson.
    if let Some(core) = ctx.heuristic_findings.iter().find(|f| f.core_error) {
        return GatingDecision::micro_lesson(
            format!("core pattern error: {}", core.evidence),
            core.category.micro_lesson_id(ctx.pattern),
        );
    }

    let grade = effective_grade(ctx);

    // Rule 3: a repeated mistake, or a failing grade, forces reflection.
    if let Some(repeated) = ctx
        .heuristic_findings
        .iter()
        .find(|f| ctx.prior_error_categories.contains(&f.category))
    {
        return GatingDecision::reflection(
            format!(
                "'{}' detected on two consecutive submissions",
                repeated.category
            ),
            repeated.category.reflection_type(),
        );
    }
    if grade == RubricGrade::Fail {
        let reflection_type = ctx
            .heuristic_findings
            .first()
            .map_or(ReflectionType::ApproachJustification, |f| {
                f.category.reflection_type()
            });
        return GatingDecision::reflection("submission failed the rubric", reflection_type);
    }

    // Rule 4: clean enough to proceed.
    if grade == RubricGrade::Pass {
        return GatingDecision::proceed("rubric passed");
    }
    if ctx.hints_used <= MAX_UNPENALIZED_HINTS {
        return GatingDecision::proceed("partial rubric with light hint use");
    }

    // Rule 5: partial grade leaning on hints.
    GatingDecision::reflection(
        format!(
            "partial rubric after {} hints; explain the approach in your own words",
            ctx.hints_used
        ),
        ReflectionType::HintReliance,
    )
}

/// The grade rules 3–5 operate on.
///
/// The LLM grade supersedes the heuristic grade only when the provider is
/// confident and actually disagrees.
fn effective_grade(ctx: &GatingContext) -> RubricGrade {
    match &ctx.llm {
        Some(llm) if llm.confidence >= LLM_CONFIDENCE_FLOOR && llm.grade != ctx.grade => llm.grade,
        _ => ctx.grade,
    }
}
