//! Skill mastery tracking and rung unlocking.
//!
//! Mastery is an exponential moving average per (tenant, user, pattern,
//! rung). The apply operation is idempotent: a given attempt id may move the
//! score at most once, ever, guarded by `last_applied_attempt_id`. Backing
//! stores must honor that guard with a compare-and-set, not a read-then-write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;

/// Score a rung must reach before the next rung unlocks.
pub const RUNG_UNLOCK_THRESHOLD: f64 = 70.0;

/// Ceiling on the EMA smoothing factor.
pub const MAX_ALPHA: f64 = 0.3;

// ============================================================================
// Keys and state
// ============================================================================

/// Unique key of a skill record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillKey {
    /// Tenant the learner belongs to.
    pub tenant: String,
    /// Learner identifier.
    pub user: String,
    /// Pattern being practiced.
    pub pattern: Pattern,
    /// Rung on the pattern's ladder.
    pub rung: u8,
}

impl SkillKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        tenant: impl Into<String>,
        user: impl Into<String>,
        pattern: Pattern,
        rung: u8,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            user: user.into(),
            pattern,
            rung,
        }
    }
}

/// Mastery state for one (tenant, user, pattern, rung) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillState {
    /// EMA mastery score in [0, 100].
    pub score: f64,
    /// Attempts applied into the score.
    pub attempts_count: u32,
    /// When the last applied attempt landed.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// When this (pattern, rung) was first practiced.
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Idempotency guard: the last attempt id applied into the score.
    pub last_applied_attempt_id: Option<String>,
}

impl SkillState {
    /// A zeroed skill record for a key first practiced at `now`.
    #[must_use]
    pub const fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            score: 0.0,
            attempts_count: 0,
            last_attempt_at: None,
            unlocked_at: Some(now),
            last_applied_attempt_id: None,
        }
    }
}

impl Default for SkillState {
    fn default() -> Self {
        Self {
            score: 0.0,
            attempts_count: 0,
            last_attempt_at: None,
            unlocked_at: None,
            last_applied_attempt_id: None,
        }
    }
}

// ============================================================================
// Idempotent apply
// ============================================================================

/// Result of an idempotent mastery apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryUpdate {
    /// The (possibly unchanged) skill state.
    pub skill: SkillState,
    /// `false` when the attempt id had already been applied.
    pub was_applied: bool,
}

/// Folds an attempt score into the skill state, at most once per attempt id.
///
/// The smoothing factor is `alpha = min(0.3, 1 / (attempts_count + 1))`, so
/// early attempts move the score quickly and later attempts settle it. When
/// `attempt_id` equals the state's `last_applied_attempt_id` the state is
/// returned unchanged with `was_applied = false`; retried requests and racing
/// handlers cannot double-count an attempt.
#[must_use]
pub fn apply_mastery(
    state: &SkillState,
    attempt_id: &str,
    attempt_score: f64,
    now: DateTime<Utc>,
) -> MasteryUpdate {
    if state.last_applied_attempt_id.as_deref() == Some(attempt_id) {
        return MasteryUpdate {
            skill: state.clone(),
            was_applied: false,
        };
    }

    let alpha = MAX_ALPHA.min(1.0 / f64::from(state.attempts_count + 1));
    let new_score = state.score.mul_add(1.0 - alpha, attempt_score * alpha);

    let skill = SkillState {
        score: new_score,
        attempts_count: state.attempts_count + 1,
        last_attempt_at: Some(now),
        unlocked_at: state.unlocked_at.or(Some(now)),
        last_applied_attempt_id: Some(attempt_id.to_string()),
    };

    MasteryUpdate {
        skill,
        was_applied: true,
    }
}

// ============================================================================
// Rung unlock policy
// ============================================================================

/// Whether `rung` is unlocked given the score held on the rung below.
///
/// Rung 1 is always unlocked. Rung N (N > 1) requires a score of at least
/// [`RUNG_UNLOCK_THRESHOLD`] on rung N − 1 of the same pattern. Pure read;
/// performs no writes.
#[must_use]
pub fn is_rung_unlocked(rung: u8, previous_rung_score: Option<f64>) -> bool {
    if rung <= 1 {
        return true;
    }
    previous_rung_score.is_some_and(|score| score >= RUNG_UNLOCK_THRESHOLD)
}
