//! End-to-end integration tests for the Ascent coach.
//!
//! These tests drive the full attempt flow through the use-case layer:
//! thinking gate, gated code submissions, metered hints, reflection, mastery
//! tracking, progression, and report generation.

use std::sync::Arc;

use ascent_engine::{select_sibling, AttemptState, GatingAction, HintLevel, Pattern, ProgressionAction};
use ascent_orchestrator::{
    Catalog, CoachService, Config, HintGrant, InMemoryAttemptRepo, InMemorySkillRepo,
    NullEvidenceProvider, ScriptedExecutor,
};
use ascent_report::{
    AttemptInput, MarkdownGenerator, ReportGenerator, ReportInput, SkillInput,
};

/// A correct single-pass sliding window with a while-loop shrink.
const CLEAN_WINDOW: &str = "\
left = 0
for right in range(n):
    total += nums[right]
    while total > limit:
        total -= nums[left]
        left += 1
";

/// A window rescanned with a nested for-loop.
const NESTED_WINDOW: &str = "\
for right in range(n):
    for left in range(right):
        total += nums[left]
";

fn service() -> CoachService {
    CoachService::with_defaults(Config::default())
}

async fn pass_gate(service: &CoachService, user: &str, problem_id: &str) -> String {
    let attempt = service.start_attempt(user, problem_id).await.expect("start");
    let pattern = attempt.pattern;
    let review = service
        .submit_thinking(
            &attempt.id,
            pattern,
            "the window between left and right stays valid as it expands and shrinks",
        )
        .await
        .expect("thinking gate");
    assert_eq!(review.attempt.state, AttemptState::Coding);
    review.attempt.id
}

#[tokio::test]
async fn test_learner_journey_micro_lesson_then_completion() {
    let service = service();
    let attempt_id = pass_gate(&service, "u1", "sw-1-max-sum-window").await;

    // First submission rescans with a nested loop: interrupted by the
    // pattern's micro-lesson, attempt stays in coding.
    let review = service
        .submit_code(&attempt_id, NESTED_WINDOW, None)
        .await
        .expect("first submission");
    assert_eq!(review.decision.action, GatingAction::ShowMicroLesson);
    assert_eq!(
        review.decision.micro_lesson_id.as_deref(),
        Some("ml-sliding_window-nested-iteration")
    );
    assert_eq!(review.attempt.state, AttemptState::Coding);

    // A hint, a resume, and a clean submission complete the attempt.
    let grant = service
        .request_hint(&attempt_id, None)
        .await
        .expect("hint request");
    let HintGrant::Granted { level, text, .. } = grant else {
        unreachable!("fresh budget must grant");
    };
    assert_eq!(level, HintLevel::DirectionalQuestion);
    assert!(!text.is_empty());

    service.resume_coding(&attempt_id).await.expect("resume");

    let review = service
        .submit_code(&attempt_id, CLEAN_WINDOW, None)
        .await
        .expect("final submission");
    assert_eq!(review.attempt.state, AttemptState::Completed);

    // One hint costs five points off the score.
    let score = review.score.expect("score");
    assert!((score.total - 95.0).abs() < f64::EPSILON);

    let mastery = review.mastery.expect("mastery");
    assert!(mastery.was_applied);
    assert_eq!(mastery.skill.attempts_count, 1);
}

#[tokio::test]
async fn test_three_completions_promote_the_rung() {
    let service = service();
    let mut progression = None;

    for problem in [
        "sw-1-max-sum-window",
        "sw-1-longest-uniform",
        "sw-1-max-sum-window",
    ] {
        let attempt_id = pass_gate(&service, "u1", problem).await;
        let review = service
            .submit_code(&attempt_id, CLEAN_WINDOW, None)
            .await
            .expect("submission");
        progression = review.progression;
    }

    let progression = progression.expect("progression after completion");
    assert_eq!(progression.action, ProgressionAction::PromoteRung);
    assert_eq!(progression.next_rung, Some(2));
}

#[tokio::test]
async fn test_failing_submissions_route_through_reflection() {
    // Every run fails all tests: grade Fail forces reflection immediately.
    let executor = ScriptedExecutor::new([ScriptedExecutor::outcome(0, 3)]);
    let service = CoachService::new(
        Config::default(),
        Arc::new(InMemoryAttemptRepo::new()),
        Arc::new(InMemorySkillRepo::new()),
        Arc::new(executor),
        Arc::new(NullEvidenceProvider),
        Arc::new(Catalog::builtin().clone()),
    );

    let attempt_id = pass_gate(&service, "u1", "sw-1-max-sum-window").await;
    let review = service
        .submit_code(&attempt_id, CLEAN_WINDOW, None)
        .await
        .expect("submission");
    assert_eq!(review.decision.action, GatingAction::RequireReflection);
    assert_eq!(review.attempt.state, AttemptState::Reflection);

    let attempt = service
        .submit_reflection(&attempt_id, "my invariant never held for the empty window")
        .await
        .expect("reflection");
    assert_eq!(attempt.state, AttemptState::Coding);
}

#[tokio::test]
async fn test_mastery_apply_survives_duplicate_finalization() {
    let service = service();
    let attempt_id = pass_gate(&service, "u1", "sw-1-max-sum-window").await;
    service
        .submit_code(&attempt_id, CLEAN_WINDOW, None)
        .await
        .expect("submission");

    // A retried finalization cannot double-count the attempt.
    let (first, _) = service.apply_mastery_for(&attempt_id).await.expect("retry");
    assert!(!first.was_applied);
    let (second, _) = service.apply_mastery_for(&attempt_id).await.expect("retry");
    assert!(!second.was_applied);
    assert_eq!(second.skill.attempts_count, 1);
}

#[tokio::test]
async fn test_sibling_selection_is_reproducible_across_services() {
    let expected = select_sibling("u1", Pattern::SlidingWindow, 1, 3, 5);
    for _ in 0..3 {
        assert_eq!(select_sibling("u1", Pattern::SlidingWindow, 1, 3, 5), expected);
    }
}

#[tokio::test]
async fn test_report_generation_from_live_progress() {
    let service = service();
    let attempt_id = pass_gate(&service, "u1", "sw-1-max-sum-window").await;
    service
        .submit_code(&attempt_id, CLEAN_WINDOW, None)
        .await
        .expect("submission");

    let progress = service.progress_of("u1").expect("progress");
    let input = ReportInput {
        user: progress.user.clone(),
        tenant: "default".to_string(),
        generated_at: chrono::Utc::now(),
        attempts: progress
            .attempts
            .iter()
            .map(|a| AttemptInput {
                attempt_id: a.id.clone(),
                problem_id: a.problem_id.clone(),
                pattern: a.pattern,
                rung: a.rung,
                state: a.state,
                score: a.score.map(|s| s.total),
                hints_used: a.hints_used.clone(),
                started_at: a.started_at,
                completed_at: a.completed_at,
            })
            .collect(),
        skills: progress
            .skills
            .iter()
            .map(|s| SkillInput {
                pattern: s.key.pattern,
                rung: s.key.rung,
                score: s.state.score,
                attempts_count: s.state.attempts_count,
            })
            .collect(),
    };

    let report = ReportGenerator::new(input).generate();
    assert_eq!(report.summary.attempts_total, 1);
    assert_eq!(report.summary.completed, 1);
    assert_eq!(report.mastery.len(), 1);

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("# Ascent Progress Report: u1"));
    assert!(markdown.contains("Sliding Window"));
}

#[tokio::test]
async fn test_rung_two_requires_earned_mastery() {
    let service = service();
    let err = service
        .start_attempt("fresh-user", "sw-2-min-window-substring")
        .await
        .expect_err("locked rung must reject");
    assert!(err.to_string().contains("locked"));
}
