//! Progression decisions and deterministic sibling selection.
//!
//! After an attempt wraps up, the progression engine looks at the learner's
//! recent history on the (pattern, rung) pair and decides what to serve
//! next: a remedial micro-lesson, the same problem again, a sibling problem,
//! or a promotion up the ladder. Sibling choice is a pure hash so the same
//! learner state always maps to the same problem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mastery::SkillState;
use crate::pattern::Pattern;

/// How many recent attempts feed the mastery window.
pub const MASTERY_WINDOW: usize = 5;

/// Attempts required on a rung before promotion is considered.
pub const MIN_ATTEMPTS_FOR_PROMOTION: u32 = 3;

/// Consecutive failures that trigger a remedial micro-lesson.
pub const CONSECUTIVE_FAILURE_LIMIT: usize = 2;

/// Scores below this count as failures and trigger a retry.
pub const LOW_SCORE_THRESHOLD: f64 = 50.0;

/// Mastery-window average required for promotion.
pub const PROMOTION_AVERAGE: f64 = 70.0;

// ============================================================================
// History
// ============================================================================

/// A finished attempt as seen by the progression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    /// The attempt's identifier.
    pub attempt_id: String,
    /// The attempt's final score in [0, 100].
    pub score: f64,
    /// When the attempt completed.
    pub completed_at: DateTime<Utc>,
}

impl AttemptOutcome {
    /// Whether this outcome counts as a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.score < LOW_SCORE_THRESHOLD
    }
}

// ============================================================================
// Decision types
// ============================================================================

/// What to serve the learner next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionAction {
    /// Serve an alternate problem on the same pattern and rung.
    ServeSibling,
    /// Serve the same problem again.
    RetrySame,
    /// Gate further problems behind a remedial micro-lesson.
    MicroLessonGate,
    /// Promote to the next rung of the pattern.
    PromoteRung,
    /// The pattern's final rung is mastered.
    CompleteRung,
}

/// Decision on the next problem to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionDecision {
    /// What happens next.
    pub action: ProgressionAction,
    /// Human-readable justification.
    pub reason: String,
    /// Sibling index to serve, set iff `action == ServeSibling`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_problem_index: Option<usize>,
    /// Target rung, set iff `action == PromoteRung`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_rung: Option<u8>,
    /// Micro-lesson topic, set iff `action == MicroLessonGate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micro_lesson_topic: Option<String>,
}

// ============================================================================
// Decision function
// ============================================================================

/// Decides the next-problem action for a learner on a (pattern, rung) pair.
///
/// `history` is the learner's completed attempts for the pair in completion
/// order, most recent last; only the last [`MASTERY_WINDOW`] entries are
/// considered. Rules in order:
///
/// 1. Two consecutive failures gate progress behind a micro-lesson.
/// 2. Enough attempts with a strong window average promote the learner (or
///    complete the ladder on the final rung).
/// 3. A weak most-recent score retries the same problem.
/// 4. Otherwise a sibling problem is served, chosen deterministically.
#[must_use]
pub fn decide_progression(
    history: &[AttemptOutcome],
    skill: &SkillState,
    user: &str,
    pattern: Pattern,
    rung: u8,
    sibling_count: usize,
) -> ProgressionDecision {
    let window_start = history.len().saturating_sub(MASTERY_WINDOW);
    let window = &history[window_start..];

    // Rule 1: consecutive failures.
    if window.len() >= CONSECUTIVE_FAILURE_LIMIT
        && window
            .iter()
            .rev()
            .take(CONSECUTIVE_FAILURE_LIMIT)
            .all(AttemptOutcome::is_failure)
    {
        return ProgressionDecision {
            action: ProgressionAction::MicroLessonGate,
            reason: format!(
                "{CONSECUTIVE_FAILURE_LIMIT} consecutive failing attempts on {pattern} rung {rung}"
            ),
            next_problem_index: None,
            next_rung: None,
            micro_lesson_topic: Some(format!("{}-fundamentals", pattern.as_str())),
        };
    }

    // Rule 2: promotion on a strong window.
    if skill.attempts_count >= MIN_ATTEMPTS_FOR_PROMOTION && !window.is_empty() {
        let window_len = u32::try_from(window.len()).unwrap_or(u32::MAX);
        let average = window.iter().map(|o| o.score).sum::<f64>() / f64::from(window_len);
        if average >= PROMOTION_AVERAGE {
            if rung >= pattern.final_rung() {
                return ProgressionDecision {
                    action: ProgressionAction::CompleteRung,
                    reason: format!("final rung of {pattern} mastered"),
                    next_problem_index: None,
                    next_rung: None,
                    micro_lesson_topic: None,
                };
            }
            return ProgressionDecision {
                action: ProgressionAction::PromoteRung,
                reason: format!("window average {average:.1} over {} attempts", window.len()),
                next_problem_index: None,
                next_rung: Some(rung + 1),
                micro_lesson_topic: None,
            };
        }
    }

    // Rule 3: weak latest attempt.
    if window.last().is_some_and(AttemptOutcome::is_failure) {
        return ProgressionDecision {
            action: ProgressionAction::RetrySame,
            reason: "most recent score is below the retry threshold".to_string(),
            next_problem_index: None,
            next_rung: None,
            micro_lesson_topic: None,
        };
    }

    // Rule 4: keep practicing on a sibling.
    let index = select_sibling(user, pattern, rung, skill.attempts_count, sibling_count);
    ProgressionDecision {
        action: ProgressionAction::ServeSibling,
        reason: "continue practicing on an alternate problem".to_string(),
        next_problem_index: Some(index),
        next_rung: None,
        micro_lesson_topic: None,
    }
}

// ============================================================================
// Sibling selection
// ============================================================================

/// Picks a sibling problem index deterministically.
///
/// Hashes (user, pattern, rung, attempts count) with FNV-1a and takes the
/// result modulo `sibling_count`. The hash is written out here rather than
/// borrowed from `std` so the mapping is stable across Rust releases: the
/// same learner state must always map to the same problem. Returns 0 when
/// the sibling list is empty.
#[must_use]
pub fn select_sibling(
    user: &str,
    pattern: Pattern,
    rung: u8,
    attempts_count: u32,
    sibling_count: usize,
) -> usize {
    if sibling_count == 0 {
        return 0;
    }

    let mut hash = fnv1a64(user.as_bytes(), FNV_OFFSET_BASIS);
    hash = fnv1a64(pattern.as_str().as_bytes(), hash);
    hash = fnv1a64(&[rung], hash);
    hash = fnv1a64(&attempts_count.to_le_bytes(), hash);

    usize::try_from(hash % sibling_count as u64).unwrap_or(0)
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over `bytes`, continuing from `state`.
const fn fnv1a64(bytes: &[u8], state: u64) -> u64 {
    let mut hash = state;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + chrono::Duration::minutes(i64::from(minute))
    }

    fn outcome(id: &str, score: f64, minute: u32) -> AttemptOutcome {
        AttemptOutcome {
            attempt_id: id.to_string(),
            score,
            completed_at: at(minute),
        }
    }

    fn skill(score: f64, attempts_count: u32) -> SkillState {
        SkillState {
            score,
            attempts_count,
            last_attempt_at: None,
            unlocked_at: Some(at(0)),
            last_applied_attempt_id: None,
        }
    }

    #[test]
    fn test_two_consecutive_failures_gate_on_micro_lesson() {
        let history = vec![outcome("a1", 30.0, 1), outcome("a2", 35.0, 2)];
        let decision = decide_progression(
            &history,
            &skill(32.0, 2),
            "u1",
            Pattern::SlidingWindow,
            1,
            3,
        );
        assert_eq!(decision.action, ProgressionAction::MicroLessonGate);
        assert_eq!(
            decision.micro_lesson_topic.as_deref(),
            Some("sliding_window-fundamentals")
        );
    }

    #[test]
    fn test_failure_streak_fires_regardless_of_attempt_count() {
        let mut history: Vec<AttemptOutcome> = (0..6)
            .map(|i| outcome(&format!("a{i}"), 80.0, i))
            .collect();
        history.push(outcome("a6", 30.0, 7));
        history.push(outcome("a7", 35.0, 8));

        let decision = decide_progression(
            &history,
            &skill(60.0, 8),
            "u1",
            Pattern::TwoPointers,
            2,
            4,
        );
        assert_eq!(decision.action, ProgressionAction::MicroLessonGate);
    }

    #[test]
    fn test_promotion_on_strong_window() {
        let history = vec![
            outcome("a1", 75.0, 1),
            outcome("a2", 80.0, 2),
            outcome("a3", 85.0, 3),
        ];
        let decision = decide_progression(
            &history,
            &skill(78.0, 3),
            "u1",
            Pattern::SlidingWindow,
            2,
            3,
        );
        assert_eq!(decision.action, ProgressionAction::PromoteRung);
        assert_eq!(decision.next_rung, Some(3));
    }

    #[test]
    fn test_no_promotion_before_minimum_attempts() {
        let history = vec![outcome("a1", 90.0, 1), outcome("a2", 95.0, 2)];
        let decision = decide_progression(
            &history,
            &skill(92.0, 2),
            "u1",
            Pattern::SlidingWindow,
            2,
            3,
        );
        assert_eq!(decision.action, ProgressionAction::ServeSibling);
    }

    #[test]
    fn test_final_rung_completes_instead_of_promoting() {
        let history = vec![
            outcome("a1", 80.0, 1),
            outcome("a2", 85.0, 2),
            outcome("a3", 90.0, 3),
        ];
        let decision = decide_progression(
            &history,
            &skill(85.0, 3),
            "u1",
            Pattern::GridDfs,
            Pattern::GridDfs.final_rung(),
            3,
        );
        assert_eq!(decision.action, ProgressionAction::CompleteRung);
    }

    #[test]
    fn test_window_only_considers_recent_attempts() {
        // Five old failures followed by five strong attempts: the window
        // average must ignore everything outside the last five.
        let mut history: Vec<AttemptOutcome> = (0..5)
            .map(|i| outcome(&format!("old{i}"), 10.0, i))
            .collect();
        history.extend((5..10).map(|i| outcome(&format!("new{i}"), 90.0, i)));

        let decision = decide_progression(
            &history,
            &skill(70.0, 10),
            "u1",
            Pattern::BinarySearch,
            1,
            3,
        );
        assert_eq!(decision.action, ProgressionAction::PromoteRung);
    }

    #[test]
    fn test_low_recent_score_retries_same_problem() {
        let history = vec![outcome("a1", 80.0, 1), outcome("a2", 40.0, 2)];
        let decision = decide_progression(
            &history,
            &skill(60.0, 2),
            "u1",
            Pattern::SlidingWindow,
            1,
            3,
        );
        assert_eq!(decision.action, ProgressionAction::RetrySame);
    }

    #[test]
    fn test_default_serves_a_sibling() {
        let history = vec![outcome("a1", 60.0, 1)];
        let decision = decide_progression(
            &history,
            &skill(60.0, 1),
            "u1",
            Pattern::SlidingWindow,
            1,
            4,
        );
        assert_eq!(decision.action, ProgressionAction::ServeSibling);
        let index = decision.next_problem_index.unwrap();
        assert!(index < 4);
    }

    #[test]
    fn test_sibling_selection_is_deterministic() {
        let first = select_sibling("u1", Pattern::SlidingWindow, 1, 3, 5);
        for _ in 0..10 {
            assert_eq!(select_sibling("u1", Pattern::SlidingWindow, 1, 3, 5), first);
        }
    }

    #[test]
    fn test_sibling_selection_varies_with_inputs() {
        let indices: Vec<usize> = (0..8)
            .map(|attempts| select_sibling("u1", Pattern::SlidingWindow, 1, attempts, 5))
            .collect();
        let distinct: std::collections::HashSet<usize> = indices.iter().copied().collect();
        assert!(distinct.len() > 1, "expected variation, got {indices:?}");
    }

    #[test]
    fn test_sibling_selection_in_bounds() {
        for n in 1..6 {
            for attempts in 0..10 {
                assert!(select_sibling("u2", Pattern::GridDfs, 2, attempts, n) < n);
            }
        }
    }

    #[test]
    fn test_empty_sibling_list_selects_zero() {
        assert_eq!(select_sibling("u1", Pattern::SlidingWindow, 1, 0, 0), 0);
    }
}
