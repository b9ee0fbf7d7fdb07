//! Request-scoped use cases over the engine.
//!
//! [`CoachService`] is the only place where external evidence (test runs,
//! optional LLM review) meets the pure engine. Submissions for one attempt
//! are serialized through a per-attempt lock because the state machine is
//! not commutative; the attempt update and mastery apply lean on the
//! repository contracts (optimistic version check, idempotent
//! compare-and-set) so retries and races cannot double-count anything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ascent_engine::{
    abandon, analyze_heuristics, decide_gating, decide_progression, is_rung_unlocked,
    scan_forbidden, transition, validate_thinking_gate, Attempt, AttemptOutcome, AttemptState,
    ErrorCategory, GateOutcome, GatingContext, GatingDecision, HintBudget, HintLevel,
    InvalidTransition, MasteryUpdate, ProgressionDecision, Score, SkillKey, SkillState, Step,
    StepEvidence, StepResult, StepType,
};

use crate::catalog::{Catalog, Problem};
use crate::config::Config;
use crate::error::{CoachError, Result};
use crate::evidence::{CodeExecutor, EvidenceProvider, ExecutionOutcome, NullEvidenceProvider, StubExecutor};
use crate::repo::{AttemptRepo, InMemoryAttemptRepo, InMemorySkillRepo, SkillRepo};
use crate::websocket::{EventBroadcaster, SessionEvent};

// ============================================================================
// Review types
// ============================================================================

/// Outcome of a thinking-gate submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingReview {
    /// The attempt after the gate check.
    pub attempt: Attempt,
    /// The gate's structured verdict.
    pub gate: GateOutcome,
}

/// Outcome of a code submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReview {
    /// The attempt after the submission.
    pub attempt: Attempt,
    /// Raw test-run results.
    pub execution: ExecutionOutcome,
    /// The gating verdict.
    pub decision: GatingDecision,
    /// Rubric breakdown, present when the attempt completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    /// Mastery update, present when the attempt completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery: Option<MasteryUpdate>,
    /// Next-problem decision, present when the attempt completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressionDecision>,
}

/// Outcome of a hint request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HintGrant {
    /// A hint was granted and charged.
    Granted {
        /// The attempt after the grant.
        attempt: Attempt,
        /// The granted level.
        level: HintLevel,
        /// Points the level cost.
        cost: u8,
        /// The hint text.
        text: String,
        /// Budget points remaining.
        remaining: u8,
    },
    /// Nothing affordable remains. Not an error: hint availability degrades.
    Exhausted {
        /// Budget points remaining.
        remaining: u8,
    },
}

/// A learner's skills and attempts, for progress views and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// The learner.
    pub user: String,
    /// Every attempt of the learner, in creation order.
    pub attempts: Vec<Attempt>,
    /// Every skill state of the learner.
    pub skills: Vec<SkillEntry>,
}

/// One skill row in a progress view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    /// The skill's key.
    pub key: SkillKey,
    /// The skill's state.
    pub state: SkillState,
}

// ============================================================================
// Service
// ============================================================================

/// The use-case layer: everything the API and CLI drive.
pub struct CoachService {
    config: Config,
    attempts: Arc<dyn AttemptRepo>,
    skills: Arc<dyn SkillRepo>,
    executor: Arc<dyn CodeExecutor>,
    evidence: Arc<dyn EvidenceProvider>,
    catalog: Arc<Catalog>,
    broadcaster: EventBroadcaster,
    // Per-attempt serialization: submissions within one attempt must apply
    // in order because the state machine is not commutative.
    locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    next_attempt_id: AtomicU64,
}

impl CoachService {
    /// Creates a service over explicit collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        attempts: Arc<dyn AttemptRepo>,
        skills: Arc<dyn SkillRepo>,
        executor: Arc<dyn CodeExecutor>,
        evidence: Arc<dyn EvidenceProvider>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            config,
            attempts,
            skills,
            executor,
            evidence,
            catalog,
            broadcaster: EventBroadcaster::default(),
            locks: tokio::sync::Mutex::new(HashMap::new()),
            next_attempt_id: AtomicU64::new(1),
        }
    }

    /// Creates a service with in-memory stores, the stub executor, no LLM
    /// evidence, and the built-in catalog.
    #[must_use]
    pub fn with_defaults(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryAttemptRepo::new()),
            Arc::new(InMemorySkillRepo::new()),
            Arc::new(StubExecutor),
            Arc::new(NullEvidenceProvider),
            Arc::new(Catalog::builtin().clone()),
        )
    }

    /// The service's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The problem catalog the service serves.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The event broadcaster feeding WebSocket clients.
    #[must_use]
    pub const fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    // ------------------------------------------------------------------------
    // Use cases
    // ------------------------------------------------------------------------

    /// Opens a new attempt for a learner on a problem.
    ///
    /// # Errors
    ///
    /// Returns `ProblemNotFound` for an unknown problem and `RungLocked`
    /// when the learner has not earned the problem's rung yet.
    pub async fn start_attempt(&self, user: &str, problem_id: &str) -> Result<Attempt> {
        let problem = self.problem(problem_id)?;
        self.ensure_rung_unlocked(user, problem)?;

        let id = format!(
            "att-{}",
            self.next_attempt_id.fetch_add(1, Ordering::Relaxed)
        );
        let attempt = Attempt::new(
            id,
            &self.config.tenant,
            user,
            &problem.id,
            problem.pattern,
            problem.rung,
            Utc::now(),
        );
        self.attempts.save(&attempt)?;

        info!(attempt_id = %attempt.id, user, problem_id, "Attempt started");
        self.broadcaster.send(SessionEvent::attempt_started(&attempt));
        Ok(attempt)
    }

    /// Validates the learner's stated pattern and invariant.
    ///
    /// A failed gate is not an error: the attempt stays at the thinking gate
    /// and the structured errors/warnings are returned for display.
    pub async fn submit_thinking(
        &self,
        attempt_id: &str,
        chosen: ascent_engine::Pattern,
        invariant: &str,
    ) -> Result<ThinkingReview> {
        let lock = self.attempt_lock(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load(attempt_id)?;
        let gate = validate_thinking_gate(attempt.pattern, chosen, invariant);

        let new_state = transition(
            attempt.state,
            StepType::ThinkingGate,
            StepEvidence::ThinkingGate {
                passed: gate.passed(),
            },
        )?;

        let now = Utc::now();
        let result = if gate.passed() {
            StepResult::Passed
        } else {
            StepResult::Failed
        };
        attempt.record_step(Step::new(
            StepType::ThinkingGate,
            result,
            serde_json::json!({
                "chosenPattern": chosen,
                "invariant": invariant,
                "errors": gate.errors,
                "warnings": gate.warnings,
            }),
            now,
        ));
        attempt.apply_state(new_state, now);
        self.attempts.update(&mut attempt)?;

        self.broadcaster.send(SessionEvent::gate_checked(
            attempt_id,
            gate.passed(),
            gate.warnings.len(),
        ));
        Ok(ThinkingReview { attempt, gate })
    }

    /// Judges a code submission: heuristics, forbidden concepts, test run,
    /// optional LLM review, gating, transition, and, on completion, the
    /// mastery apply and progression decision.
    pub async fn submit_code(
        &self,
        attempt_id: &str,
        code: &str,
        language: Option<&str>,
    ) -> Result<SubmissionReview> {
        let lock = self.attempt_lock(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load(attempt_id)?;
        if !matches!(attempt.state, AttemptState::Coding | AttemptState::Hint) {
            return Err(InvalidTransition {
                from: attempt.state,
                step_type: StepType::Coding,
            }
            .into());
        }
        let problem = self.problem(&attempt.problem_id)?;
        let language = language.unwrap_or(&self.config.default_language);

        // Static evidence.
        let findings = analyze_heuristics(attempt.pattern, code);
        let forbidden = scan_forbidden(code, &problem.forbidden);

        // External evidence: the test run is required, the LLM review is
        // best-effort and degrades to heuristic-only grading.
        let execution = self
            .executor
            .execute(code, language, &problem.test_cases)
            .map_err(|e| CoachError::execution_failed(e.to_string()))?;
        let llm = if self.config.evidence_enabled {
            match self
                .evidence
                .review(code, language, attempt.pattern, &findings)
            {
                Ok(evidence) => evidence,
                Err(e) => {
                    warn!(error = %e, "Evidence provider failed; grading on heuristics only");
                    None
                }
            }
        } else {
            None
        };

        let score = Score::compute(execution.passed, execution.total, attempt.hint_count());
        let context = GatingContext {
            pattern: attempt.pattern,
            rung: attempt.rung,
            grade: score.grade(),
            heuristic_findings: findings.clone(),
            forbidden_matches: forbidden,
            prior_error_categories: prior_error_categories(&attempt),
            hints_used: attempt.hint_count(),
            code_submissions: attempt.code_submissions + 1,
            llm,
        };
        let decision = decide_gating(&context);

        let new_state = transition(
            attempt.state,
            StepType::Coding,
            StepEvidence::Submission {
                action: decision.action,
                all_tests_passed: execution.all_passed(),
            },
        )?;

        let now = Utc::now();
        let categories: Vec<ErrorCategory> = findings.iter().map(|f| f.category).collect();
        attempt.code_submissions += 1;
        attempt.record_step(Step::new(
            StepType::Coding,
            step_result_for(new_state, &decision),
            serde_json::json!({
                "errorCategories": categories,
                "decision": decision,
                "testsPassed": execution.passed,
                "testsTotal": execution.total,
            }),
            now,
        ));
        attempt.apply_state(new_state, now);

        let completed = new_state == AttemptState::Completed;
        if completed {
            attempt.score = Some(score);
        }
        self.attempts.update(&mut attempt)?;

        self.broadcaster.send(SessionEvent::gating_decided(
            attempt_id,
            decision.action,
            decision.reason.clone(),
        ));

        let (mastery, progression) = if completed {
            self.broadcaster
                .send(SessionEvent::attempt_finished(attempt_id, attempt.state));
            let (mastery, progression) = self.finalize_completion(&attempt, score.total)?;
            (Some(mastery), Some(progression))
        } else {
            (None, None)
        };

        Ok(SubmissionReview {
            attempt,
            execution,
            decision,
            score: completed.then_some(score),
            mastery,
            progression,
        })
    }

    /// Grants the requested (or cheapest affordable) hint level.
    pub async fn request_hint(
        &self,
        attempt_id: &str,
        requested: Option<HintLevel>,
    ) -> Result<HintGrant> {
        let lock = self.attempt_lock(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load(attempt_id)?;
        let budget = HintBudget::from_used(&attempt.hints_used);
        let level = requested.or_else(|| budget.next_affordable_level());

        let affordable = level.is_some_and(|l| budget.can_afford(l));
        let new_state = transition(
            attempt.state,
            StepType::Hint,
            StepEvidence::HintRequested { affordable },
        )?;

        let (Some(level), true) = (level, affordable) else {
            return Ok(HintGrant::Exhausted {
                remaining: budget.remaining(),
            });
        };

        let now = Utc::now();
        attempt.hints_used.push(level);
        attempt.record_step(Step::new(
            StepType::Hint,
            StepResult::Granted,
            serde_json::json!({ "level": level, "cost": level.cost() }),
            now,
        ));
        attempt.apply_state(new_state, now);
        self.attempts.update(&mut attempt)?;

        let remaining = HintBudget::from_used(&attempt.hints_used).remaining();
        self.broadcaster
            .send(SessionEvent::hint_granted(attempt_id, level, remaining));
        Ok(HintGrant::Granted {
            level,
            cost: level.cost(),
            text: ascent_engine::hint_text(attempt.pattern, level).to_string(),
            remaining,
            attempt,
        })
    }

    /// Returns the learner from a hint back to coding.
    pub async fn resume_coding(&self, attempt_id: &str) -> Result<Attempt> {
        let lock = self.attempt_lock(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load(attempt_id)?;
        let new_state = transition(attempt.state, StepType::Coding, StepEvidence::Resume)?;

        let now = Utc::now();
        attempt.record_step(Step::new(
            StepType::Coding,
            StepResult::Recorded,
            serde_json::json!({ "resumed": true }),
            now,
        ));
        attempt.apply_state(new_state, now);
        self.attempts.update(&mut attempt)?;
        Ok(attempt)
    }

    /// Records a reflection and returns the learner to coding.
    pub async fn submit_reflection(&self, attempt_id: &str, text: &str) -> Result<Attempt> {
        let lock = self.attempt_lock(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load(attempt_id)?;
        let new_state = transition(
            attempt.state,
            StepType::Reflection,
            StepEvidence::ReflectionSubmitted,
        )?;

        let now = Utc::now();
        attempt.record_step(Step::new(
            StepType::Reflection,
            StepResult::Recorded,
            serde_json::json!({ "text": text }),
            now,
        ));
        attempt.apply_state(new_state, now);
        self.attempts.update(&mut attempt)?;
        Ok(attempt)
    }

    /// Retires an attempt without completing it.
    pub async fn abandon_attempt(&self, attempt_id: &str) -> Result<Attempt> {
        let lock = self.attempt_lock(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load(attempt_id)?;
        let new_state = abandon(attempt.state)?;

        attempt.apply_state(new_state, Utc::now());
        self.attempts.update(&mut attempt)?;

        self.broadcaster
            .send(SessionEvent::attempt_finished(attempt_id, attempt.state));
        Ok(attempt)
    }

    /// Re-drives the mastery apply and progression decision for a completed
    /// attempt.
    ///
    /// Safe to call repeatedly: the apply is idempotent per attempt id. This
    /// is the recovery path when a request died between the attempt commit
    /// and the mastery commit.
    pub async fn apply_mastery_for(
        &self,
        attempt_id: &str,
    ) -> Result<(MasteryUpdate, ProgressionDecision)> {
        let attempt = self.load(attempt_id)?;
        if attempt.state != AttemptState::Completed {
            return Err(InvalidTransition {
                from: attempt.state,
                step_type: StepType::Coding,
            }
            .into());
        }
        let score = attempt.score.map_or(0.0, |s| s.total);
        self.finalize_completion(&attempt, score)
    }

    /// Everything known about a learner, for progress views and reports.
    pub fn progress_of(&self, user: &str) -> Result<UserProgress> {
        let attempts = self.attempts.list_for_user(&self.config.tenant, user)?;
        let skills = self
            .skills
            .list_for_user(&self.config.tenant, user)?
            .into_iter()
            .map(|(key, state)| SkillEntry { key, state })
            .collect();
        Ok(UserProgress {
            user: user.to_string(),
            attempts,
            skills,
        })
    }

    /// Every user with at least one attempt.
    pub fn user_ids(&self) -> Result<Vec<String>> {
        self.attempts.user_ids(&self.config.tenant)
    }

    /// Looks up an attempt by id.
    pub fn attempt(&self, attempt_id: &str) -> Result<Attempt> {
        self.load(attempt_id)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn load(&self, attempt_id: &str) -> Result<Attempt> {
        self.attempts
            .find_by_id(attempt_id)?
            .ok_or_else(|| CoachError::attempt_not_found(attempt_id))
    }

    fn problem(&self, problem_id: &str) -> Result<&Problem> {
        self.catalog
            .find(problem_id)
            .ok_or_else(|| CoachError::problem_not_found(problem_id))
    }

    fn ensure_rung_unlocked(&self, user: &str, problem: &Problem) -> Result<()> {
        if problem.rung <= 1 {
            return Ok(());
        }
        let previous = self.skills.find(&SkillKey::new(
            &self.config.tenant,
            user,
            problem.pattern,
            problem.rung - 1,
        ))?;
        if is_rung_unlocked(problem.rung, previous.map(|s| s.score)) {
            Ok(())
        } else {
            Err(CoachError::RungLocked {
                pattern: problem.pattern,
                rung: problem.rung,
            })
        }
    }

    /// Folds the attempt score into the skill state and decides what to
    /// serve next.
    ///
    /// The attempt commit happens before this; the apply is idempotent per
    /// attempt id, so a retry after a partial failure cannot double-count.
    fn finalize_completion(
        &self,
        attempt: &Attempt,
        score_total: f64,
    ) -> Result<(MasteryUpdate, ProgressionDecision)> {
        let now = Utc::now();
        let key = SkillKey::new(
            &attempt.tenant,
            &attempt.user,
            attempt.pattern,
            attempt.rung,
        );
        let mastery = self
            .skills
            .update_if_not_applied(&key, &attempt.id, score_total, now)?;

        self.broadcaster.send(SessionEvent::mastery_applied(
            &attempt.user,
            attempt.pattern,
            attempt.rung,
            mastery.skill.score,
            mastery.was_applied,
        ));

        let history = self.attempts.completed_history(
            &attempt.tenant,
            &attempt.user,
            attempt.pattern,
            attempt.rung,
        )?;
        let outcomes: Vec<AttemptOutcome> = history
            .iter()
            .map(|a| AttemptOutcome {
                attempt_id: a.id.clone(),
                score: a.score.map_or(0.0, |s| s.total),
                completed_at: a.completed_at.unwrap_or(a.started_at),
            })
            .collect();

        let progression = decide_progression(
            &outcomes,
            &mastery.skill,
            &attempt.user,
            attempt.pattern,
            attempt.rung,
            self.catalog.sibling_count(attempt.pattern, attempt.rung),
        );

        self.broadcaster.send(SessionEvent::progression_decided(
            &attempt.user,
            attempt.pattern,
            attempt.rung,
            progression.action,
        ));
        info!(
            attempt_id = %attempt.id,
            action = ?progression.action,
            score = score_total,
            "Attempt finalized"
        );

        Ok((mastery, progression))
    }

    async fn attempt_lock(&self, attempt_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(attempt_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

/// Error categories recorded on the previous code submission, if any.
///
/// Resume steps are coding steps too, but carry no `errorCategories` key;
/// they are skipped so "consecutive" means consecutive submissions.
fn prior_error_categories(attempt: &Attempt) -> Vec<ErrorCategory> {
    attempt
        .steps
        .iter()
        .rev()
        .filter(|s| s.step_type == StepType::Coding)
        .find_map(|s| s.data.get("errorCategories").cloned())
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Step result recorded for a judged submission.
fn step_result_for(new_state: AttemptState, decision: &GatingDecision) -> StepResult {
    use ascent_engine::GatingAction;
    if new_state == AttemptState::Completed {
        StepResult::Passed
    } else if decision.action == GatingAction::BlockSubmission {
        StepResult::Blocked
    } else {
        StepResult::Failed
    }
}
