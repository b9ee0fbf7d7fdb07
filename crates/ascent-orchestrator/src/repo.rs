//! Repository contracts and in-memory implementations.
//!
//! The engine requires two stores: attempts with optimistic concurrency, and
//! skill states with an atomic "apply unless already applied" operation. The
//! in-memory implementations back tests and the demo server; a real
//! deployment implements the same traits over its database, keeping the
//! compare-and-set semantics (not a naive read-then-write) so the mastery
//! idempotency guarantee survives concurrent retries.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use ascent_engine::{
    apply_mastery, Attempt, AttemptState, MasteryUpdate, Pattern, SkillKey, SkillState,
};

use crate::error::{CoachError, Result};

// ============================================================================
// Traits
// ============================================================================

/// Store of attempts.
pub trait AttemptRepo: Send + Sync {
    /// Looks up an attempt by id.
    fn find_by_id(&self, attempt_id: &str) -> Result<Option<Attempt>>;

    /// Inserts a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::Storage` if the id already exists.
    fn save(&self, attempt: &Attempt) -> Result<()>;

    /// Persists a modified attempt, checking its optimistic version.
    ///
    /// The stored version must equal `attempt.version`; on success the
    /// attempt is stored with the version bumped, and `attempt.version` is
    /// updated in place to match.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::VersionConflict` when the version check fails.
    fn update(&self, attempt: &mut Attempt) -> Result<()>;

    /// All attempts of one learner, in creation order.
    fn list_for_user(&self, tenant: &str, user: &str) -> Result<Vec<Attempt>>;

    /// Completed attempts of one learner on a (pattern, rung) pair, in
    /// completion order.
    fn completed_history(
        &self,
        tenant: &str,
        user: &str,
        pattern: Pattern,
        rung: u8,
    ) -> Result<Vec<Attempt>>;

    /// Distinct user ids with at least one attempt in the tenant.
    fn user_ids(&self, tenant: &str) -> Result<Vec<String>>;
}

/// Store of per-(tenant, user, pattern, rung) skill states.
pub trait SkillRepo: Send + Sync {
    /// Looks up the skill state for a key.
    fn find(&self, key: &SkillKey) -> Result<Option<SkillState>>;

    /// Applies an attempt score into the skill state unless the attempt id
    /// was already applied.
    ///
    /// Must be atomic: check `last_applied_attempt_id` and persist in one
    /// compare-and-set. Creates a fresh skill state on first apply for a
    /// key.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::IdempotencyConflict` when the store loses a
    /// concurrent compare-and-set and the caller should retry the
    /// read-decide-write cycle.
    fn update_if_not_applied(
        &self,
        key: &SkillKey,
        attempt_id: &str,
        attempt_score: f64,
        now: DateTime<Utc>,
    ) -> Result<MasteryUpdate>;

    /// All skill states of one learner.
    fn list_for_user(&self, tenant: &str, user: &str) -> Result<Vec<(SkillKey, SkillState)>>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// In-memory attempt store.
#[derive(Debug, Default)]
pub struct InMemoryAttemptRepo {
    // Insertion order is preserved separately so listings are stable.
    inner: Mutex<AttemptMap>,
}

#[derive(Debug, Default)]
struct AttemptMap {
    by_id: HashMap<String, Attempt>,
    order: Vec<String>,
}

impl InMemoryAttemptRepo {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttemptRepo for InMemoryAttemptRepo {
    fn find_by_id(&self, attempt_id: &str) -> Result<Option<Attempt>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("attempt store lock poisoned"))?;
        Ok(inner.by_id.get(attempt_id).cloned())
    }

    fn save(&self, attempt: &Attempt) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("attempt store lock poisoned"))?;
        if inner.by_id.contains_key(&attempt.id) {
            return Err(CoachError::storage(format!(
                "attempt '{}' already exists",
                attempt.id
            )));
        }
        inner.order.push(attempt.id.clone());
        inner.by_id.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    fn update(&self, attempt: &mut Attempt) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("attempt store lock poisoned"))?;
        let Some(stored) = inner.by_id.get_mut(&attempt.id) else {
            return Err(CoachError::attempt_not_found(&attempt.id));
        };
        if stored.version != attempt.version {
            return Err(CoachError::version_conflict(&attempt.id));
        }
        attempt.version += 1;
        *stored = attempt.clone();
        Ok(())
    }

    fn list_for_user(&self, tenant: &str, user: &str) -> Result<Vec<Attempt>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("attempt store lock poisoned"))?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|a| a.tenant == tenant && a.user == user)
            .cloned()
            .collect())
    }

    fn completed_history(
        &self,
        tenant: &str,
        user: &str,
        pattern: Pattern,
        rung: u8,
    ) -> Result<Vec<Attempt>> {
        let mut completed: Vec<Attempt> = self
            .list_for_user(tenant, user)?
            .into_iter()
            .filter(|a| {
                a.state == AttemptState::Completed && a.pattern == pattern && a.rung == rung
            })
            .collect();
        completed.sort_by_key(|a| a.completed_at);
        Ok(completed)
    }

    fn user_ids(&self, tenant: &str) -> Result<Vec<String>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("attempt store lock poisoned"))?;
        let mut users = Vec::new();
        for id in &inner.order {
            if let Some(attempt) = inner.by_id.get(id) {
                if attempt.tenant == tenant && !users.contains(&attempt.user) {
                    users.push(attempt.user.clone());
                }
            }
        }
        Ok(users)
    }
}

/// In-memory skill store.
///
/// The map mutex makes `update_if_not_applied` a genuine compare-and-set:
/// the idempotency check and the write happen under one critical section.
#[derive(Debug, Default)]
pub struct InMemorySkillRepo {
    inner: Mutex<HashMap<SkillKey, SkillState>>,
}

impl InMemorySkillRepo {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SkillRepo for InMemorySkillRepo {
    fn find(&self, key: &SkillKey) -> Result<Option<SkillState>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("skill store lock poisoned"))?;
        Ok(inner.get(key).cloned())
    }

    fn update_if_not_applied(
        &self,
        key: &SkillKey,
        attempt_id: &str,
        attempt_score: f64,
        now: DateTime<Utc>,
    ) -> Result<MasteryUpdate> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("skill store lock poisoned"))?;
        let current = inner
            .get(key)
            .cloned()
            .unwrap_or_else(|| SkillState::fresh(now));
        let update = apply_mastery(&current, attempt_id, attempt_score, now);
        inner.insert(key.clone(), update.skill.clone());
        Ok(update)
    }

    fn list_for_user(&self, tenant: &str, user: &str) -> Result<Vec<(SkillKey, SkillState)>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoachError::storage("skill store lock poisoned"))?;
        let mut entries: Vec<(SkillKey, SkillState)> = inner
            .iter()
            .filter(|(key, _)| key.tenant == tenant && key.user == user)
            .map(|(key, state)| (key.clone(), state.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.pattern
                .as_str()
                .cmp(b.pattern.as_str())
                .then(a.rung.cmp(&b.rung))
        });
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn attempt(id: &str, user: &str) -> Attempt {
        Attempt::new(id, "t1", user, "sw-1-max-sum-window", Pattern::SlidingWindow, 1, now())
    }

    #[test]
    fn test_save_and_find() {
        let repo = InMemoryAttemptRepo::new();
        repo.save(&attempt("a1", "u1")).unwrap();
        let found = repo.find_by_id("a1").unwrap().unwrap();
        assert_eq!(found.user, "u1");
        assert!(repo.find_by_id("a2").unwrap().is_none());
    }

    #[test]
    fn test_save_rejects_duplicate_id() {
        let repo = InMemoryAttemptRepo::new();
        repo.save(&attempt("a1", "u1")).unwrap();
        assert!(repo.save(&attempt("a1", "u1")).is_err());
    }

    #[test]
    fn test_update_bumps_version() {
        let repo = InMemoryAttemptRepo::new();
        let mut a = attempt("a1", "u1");
        repo.save(&a).unwrap();

        a.code_submissions = 1;
        repo.update(&mut a).unwrap();
        assert_eq!(a.version, 1);

        let stored = repo.find_by_id("a1").unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.code_submissions, 1);
    }

    #[test]
    fn test_update_detects_version_conflict() {
        let repo = InMemoryAttemptRepo::new();
        let a = attempt("a1", "u1");
        repo.save(&a).unwrap();

        // Two readers load version 0; the first update wins.
        let mut first = repo.find_by_id("a1").unwrap().unwrap();
        let mut second = repo.find_by_id("a1").unwrap().unwrap();
        repo.update(&mut first).unwrap();

        let err = repo.update(&mut second).unwrap_err();
        assert!(matches!(err, CoachError::VersionConflict { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_list_for_user_preserves_insertion_order() {
        let repo = InMemoryAttemptRepo::new();
        repo.save(&attempt("a1", "u1")).unwrap();
        repo.save(&attempt("a2", "u2")).unwrap();
        repo.save(&attempt("a3", "u1")).unwrap();

        let listed = repo.list_for_user("t1", "u1").unwrap();
        let ids: Vec<&str> = listed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a3"]);
    }

    #[test]
    fn test_completed_history_filters_and_sorts() {
        let repo = InMemoryAttemptRepo::new();
        let mut a1 = attempt("a1", "u1");
        repo.save(&a1).unwrap();
        a1.apply_state(AttemptState::Completed, now() + chrono::Duration::minutes(5));
        repo.update(&mut a1).unwrap();

        let mut a2 = attempt("a2", "u1");
        repo.save(&a2).unwrap();
        a2.apply_state(AttemptState::Completed, now() + chrono::Duration::minutes(1));
        repo.update(&mut a2).unwrap();

        // Still in progress; excluded.
        repo.save(&attempt("a3", "u1")).unwrap();

        let history = repo
            .completed_history("t1", "u1", Pattern::SlidingWindow, 1)
            .unwrap();
        let ids: Vec<&str> = history.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[test]
    fn test_user_ids_dedupes() {
        let repo = InMemoryAttemptRepo::new();
        repo.save(&attempt("a1", "u1")).unwrap();
        repo.save(&attempt("a2", "u1")).unwrap();
        repo.save(&attempt("a3", "u2")).unwrap();
        assert_eq!(repo.user_ids("t1").unwrap(), vec!["u1", "u2"]);
        assert!(repo.user_ids("other").unwrap().is_empty());
    }

    #[test]
    fn test_skill_repo_creates_on_first_apply() {
        let repo = InMemorySkillRepo::new();
        let key = SkillKey::new("t1", "u1", Pattern::SlidingWindow, 1);
        assert!(repo.find(&key).unwrap().is_none());

        let update = repo.update_if_not_applied(&key, "a1", 80.0, now()).unwrap();
        assert!(update.was_applied);
        assert_eq!(update.skill.attempts_count, 1);

        let stored = repo.find(&key).unwrap().unwrap();
        assert_eq!(stored.score, update.skill.score);
    }

    #[test]
    fn test_skill_repo_apply_is_idempotent() {
        let repo = InMemorySkillRepo::new();
        let key = SkillKey::new("t1", "u1", Pattern::SlidingWindow, 1);

        let first = repo.update_if_not_applied(&key, "a1", 90.0, now()).unwrap();
        assert!(first.was_applied);

        let second = repo.update_if_not_applied(&key, "a1", 90.0, now()).unwrap();
        assert!(!second.was_applied);
        assert_eq!(second.skill.score, first.skill.score);
        assert_eq!(second.skill.attempts_count, 1);
    }

    #[test]
    fn test_skill_repo_lists_per_user() {
        let repo = InMemorySkillRepo::new();
        repo.update_if_not_applied(
            &SkillKey::new("t1", "u1", Pattern::TwoPointers, 1),
            "a1",
            70.0,
            now(),
        )
        .unwrap();
        repo.update_if_not_applied(
            &SkillKey::new("t1", "u1", Pattern::BinarySearch, 1),
            "a2",
            60.0,
            now(),
        )
        .unwrap();
        repo.update_if_not_applied(
            &SkillKey::new("t1", "u2", Pattern::BinarySearch, 1),
            "a3",
            50.0,
            now(),
        )
        .unwrap();

        let entries = repo.list_for_user("t1", "u1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.pattern, Pattern::BinarySearch);
        assert_eq!(entries[1].0.pattern, Pattern::TwoPointers);
    }
}
