//! Ascent Progress Report Generation
//!
//! This crate turns a learner's attempts and skill states into a progress
//! report: a summary, a per-(pattern, rung) mastery table, a session
//! timeline, hint spend, and prioritized practice recommendations. Reports
//! serialize to JSON for programmatic access or render to Markdown for
//! human consumption.
//!
//! # Types
//!
//! - [`ProgressReport`] - The complete report structure
//! - [`ProgressSummary`] - High-level summary of the learner's sessions
//! - [`MasteryRow`] - One (pattern, rung) mastery entry
//! - [`TimelineEntry`] - A timestamped attempt event
//! - [`HintUsage`] - Aggregated hint spend
//! - [`Recommendation`] - A prioritized practice suggestion
//!
//! # Generators
//!
//! - [`ReportGenerator`] - Derive a report from raw attempt/skill inputs
//! - [`json::JsonGenerator`] - Serialize to compact or pretty JSON
//! - [`MarkdownGenerator`] - Render human-readable Markdown

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ascent_engine::{AttemptState, HintLevel, Pattern, RUNG_UNLOCK_THRESHOLD};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Inputs
// ============================================================================

/// One attempt as fed into the report generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptInput {
    /// The attempt's id.
    pub attempt_id: String,
    /// The attempted problem.
    pub problem_id: String,
    /// The problem's pattern.
    pub pattern: Pattern,
    /// The problem's rung.
    pub rung: u8,
    /// The attempt's final (or current) state.
    pub state: AttemptState,
    /// The attempt's score, when completed.
    pub score: Option<f64>,
    /// Hint levels consumed.
    pub hints_used: Vec<HintLevel>,
    /// When the attempt was opened.
    pub started_at: DateTime<Utc>,
    /// When the attempt completed, if it did.
    pub completed_at: Option<DateTime<Utc>>,
}

/// One skill state as fed into the report generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInput {
    /// The practiced pattern.
    pub pattern: Pattern,
    /// The practiced rung.
    pub rung: u8,
    /// The EMA mastery score.
    pub score: f64,
    /// Attempts applied into the score.
    pub attempts_count: u32,
}

/// Raw data the generator derives a report from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    /// The learner the report covers.
    pub user: String,
    /// The learner's tenant.
    pub tenant: String,
    /// When the report is generated.
    pub generated_at: DateTime<Utc>,
    /// Every attempt of the learner, in creation order.
    pub attempts: Vec<AttemptInput>,
    /// Every skill state of the learner.
    pub skills: Vec<SkillInput>,
}

// ============================================================================
// Report
// ============================================================================

/// Complete learner progress report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// The learner the report covers.
    pub user: String,
    /// High-level summary of the learner's sessions.
    pub summary: ProgressSummary,
    /// Per-(pattern, rung) mastery entries.
    pub mastery: Vec<MasteryRow>,
    /// Chronological attempt events.
    pub timeline: Vec<TimelineEntry>,
    /// Aggregated hint spend.
    pub hint_usage: HintUsage,
    /// Prioritized practice suggestions.
    pub recommendations: Vec<Recommendation>,
}

impl ProgressReport {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder() -> ProgressReportBuilder {
        ProgressReportBuilder::default()
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    /// Returns `true` if any mastery row has unlocked its next rung.
    #[must_use]
    pub fn has_unlocked_rungs(&self) -> bool {
        self.mastery.iter().any(|row| row.next_rung_unlocked)
    }
}

/// High-level summary of the learner's sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// Total attempts opened.
    pub attempts_total: usize,
    /// Attempts completed.
    pub completed: usize,
    /// Attempts abandoned.
    pub abandoned: usize,
    /// Attempts still in progress.
    pub in_progress: usize,
    /// Average score over completed attempts, if any completed.
    pub average_score: Option<f64>,
}

/// One (pattern, rung) mastery entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRow {
    /// The practiced pattern.
    pub pattern: Pattern,
    /// The practiced rung.
    pub rung: u8,
    /// The EMA mastery score.
    pub score: f64,
    /// Attempts applied into the score.
    pub attempts_count: u32,
    /// Whether this score clears the next rung's unlock bar.
    pub next_rung_unlocked: bool,
}

/// A timestamped event in the learner's session timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The attempt the event belongs to.
    pub attempt_id: String,
    /// Short description of the event.
    pub event: String,
    /// Optional additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Count of hints consumed at one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCount {
    /// The hint level.
    pub level: HintLevel,
    /// How many times it was granted.
    pub count: usize,
}

/// Aggregated hint spend across all attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintUsage {
    /// Total hints granted.
    pub total_hints: usize,
    /// Total budget points spent.
    pub total_points: u32,
    /// Grants grouped by level, in ascending cost order.
    pub by_level: Vec<LevelCount>,
}

/// A prioritized practice suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Priority of this recommendation (1 = highest priority).
    pub priority: u32,
    /// Category of the recommendation (e.g., "mastery", "hints").
    pub category: String,
    /// Detailed description of the suggested practice.
    pub description: String,
}

impl Recommendation {
    /// Creates a new recommendation.
    #[must_use]
    pub fn new(priority: u32, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            category: category.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for constructing [`ProgressReport`] instances directly.
#[derive(Debug, Clone, Default)]
pub struct ProgressReportBuilder {
    user: Option<String>,
    summary: Option<ProgressSummary>,
    mastery: Vec<MasteryRow>,
    timeline: Vec<TimelineEntry>,
    hint_usage: Option<HintUsage>,
    recommendations: Vec<Recommendation>,
}

impl ProgressReportBuilder {
    /// Sets the learner the report covers.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the report summary.
    #[must_use]
    pub fn summary(mut self, summary: ProgressSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Adds a mastery row.
    #[must_use]
    pub fn mastery_row(mut self, row: MasteryRow) -> Self {
        self.mastery.push(row);
        self
    }

    /// Adds a timeline entry.
    #[must_use]
    pub fn timeline_entry(mut self, entry: TimelineEntry) -> Self {
        self.timeline.push(entry);
        self
    }

    /// Sets the hint usage aggregate.
    #[must_use]
    pub fn hint_usage(mut self, usage: HintUsage) -> Self {
        self.hint_usage = Some(usage);
        self
    }

    /// Adds a recommendation.
    #[must_use]
    pub fn recommendation(mut self, rec: Recommendation) -> Self {
        self.recommendations.push(rec);
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if required fields are missing.
    pub fn build(self) -> Result<ProgressReport> {
        let user = self
            .user
            .ok_or_else(|| ReportError::InvalidData("user is required".to_string()))?;
        let summary = self
            .summary
            .ok_or_else(|| ReportError::InvalidData("summary is required".to_string()))?;

        Ok(ProgressReport {
            user,
            summary,
            mastery: self.mastery,
            timeline: self.timeline,
            hint_usage: self.hint_usage.unwrap_or_default(),
            recommendations: self.recommendations,
        })
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Hints-per-completion ratio above which hint reliance is flagged.
const HINT_RELIANCE_RATIO: f64 = 2.0;

/// Derives a [`ProgressReport`] from raw attempt and skill inputs.
pub struct ReportGenerator {
    input: ReportInput,
}

impl ReportGenerator {
    /// Creates a generator over the given input.
    #[must_use]
    pub const fn new(input: ReportInput) -> Self {
        Self { input }
    }

    /// Generates the report.
    #[must_use]
    pub fn generate(&self) -> ProgressReport {
        ProgressReport {
            user: self.input.user.clone(),
            summary: self.summary(),
            mastery: self.mastery_rows(),
            timeline: self.timeline(),
            hint_usage: self.hint_usage(),
            recommendations: self.recommendations(),
        }
    }

    fn summary(&self) -> ProgressSummary {
        let attempts = &self.input.attempts;
        let completed: Vec<&AttemptInput> = attempts
            .iter()
            .filter(|a| a.state == AttemptState::Completed)
            .collect();
        let abandoned = attempts
            .iter()
            .filter(|a| a.state == AttemptState::Abandoned)
            .count();

        #[allow(clippy::cast_precision_loss)]
        let average_score = if completed.is_empty() {
            None
        } else {
            let total: f64 = completed.iter().filter_map(|a| a.score).sum();
            Some(total / completed.len() as f64)
        };

        ProgressSummary {
            attempts_total: attempts.len(),
            completed: completed.len(),
            abandoned,
            in_progress: attempts.len() - completed.len() - abandoned,
            average_score,
        }
    }

    fn mastery_rows(&self) -> Vec<MasteryRow> {
        self.input
            .skills
            .iter()
            .map(|s| MasteryRow {
                pattern: s.pattern,
                rung: s.rung,
                score: s.score,
                attempts_count: s.attempts_count,
                next_rung_unlocked: s.score >= RUNG_UNLOCK_THRESHOLD,
            })
            .collect()
    }

    fn timeline(&self) -> Vec<TimelineEntry> {
        let mut entries = Vec::new();
        for attempt in &self.input.attempts {
            entries.push(TimelineEntry {
                timestamp: attempt.started_at,
                attempt_id: attempt.attempt_id.clone(),
                event: format!(
                    "started {} ({} rung {})",
                    attempt.problem_id,
                    attempt.pattern.label(),
                    attempt.rung
                ),
                details: None,
            });
            if let Some(completed_at) = attempt.completed_at {
                entries.push(TimelineEntry {
                    timestamp: completed_at,
                    attempt_id: attempt.attempt_id.clone(),
                    event: format!("completed {}", attempt.problem_id),
                    details: attempt.score.map(|s| format!("score {s:.1}")),
                });
            }
        }
        entries.sort_by_key(|e| e.timestamp);
        entries
    }

    fn hint_usage(&self) -> HintUsage {
        let mut by_level: Vec<LevelCount> = Vec::new();
        let mut total_hints = 0usize;
        let mut total_points = 0u32;

        for level in HintLevel::ALL {
            let count = self
                .input
                .attempts
                .iter()
                .flat_map(|a| a.hints_used.iter())
                .filter(|l| **l == level)
                .count();
            if count > 0 {
                total_hints += count;
                total_points += u32::from(level.cost()) * u32::try_from(count).unwrap_or(u32::MAX);
                by_level.push(LevelCount { level, count });
            }
        }

        HintUsage {
            total_hints,
            total_points,
            by_level,
        }
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        for skill in &self.input.skills {
            if skill.score < 50.0 && skill.attempts_count > 0 {
                recs.push(Recommendation::new(
                    1,
                    "mastery",
                    format!(
                        "{} rung {} is at {:.0}; revisit the fundamentals before moving on",
                        skill.pattern.label(),
                        skill.rung,
                        skill.score
                    ),
                ));
            } else if skill.score >= RUNG_UNLOCK_THRESHOLD {
                recs.push(Recommendation::new(
                    3,
                    "progression",
                    format!(
                        "{} rung {} is unlocked; try a rung-{} problem next",
                        skill.pattern.label(),
                        skill.rung + 1,
                        skill.rung + 1
                    ),
                ));
            }
        }

        let completed = self
            .input
            .attempts
            .iter()
            .filter(|a| a.state == AttemptState::Completed)
            .count();
        let hints: usize = self
            .input
            .attempts
            .iter()
            .map(|a| a.hints_used.len())
            .sum();
        #[allow(clippy::cast_precision_loss)]
        if completed > 0 && hints as f64 / completed as f64 > HINT_RELIANCE_RATIO {
            recs.push(Recommendation::new(
                2,
                "hints",
                "hint spend is heavy; try the next problem without hints and reflect on where \
                 you get stuck",
            ));
        }

        if self.input.attempts.is_empty() {
            recs.push(Recommendation::new(
                1,
                "getting-started",
                "no attempts yet; open a rung-1 problem for any pattern to begin",
            ));
        }

        recs.sort_by_key(|r| r.priority);
        recs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + chrono::Duration::minutes(i64::from(minute))
    }

    fn completed_attempt(id: &str, score: f64, minute: u32) -> AttemptInput {
        AttemptInput {
            attempt_id: id.to_string(),
            problem_id: "sw-1-max-sum-window".to_string(),
            pattern: Pattern::SlidingWindow,
            rung: 1,
            state: AttemptState::Completed,
            score: Some(score),
            hints_used: vec![HintLevel::DirectionalQuestion],
            started_at: at(minute),
            completed_at: Some(at(minute + 10)),
        }
    }

    fn input() -> ReportInput {
        ReportInput {
            user: "u1".to_string(),
            tenant: "default".to_string(),
            generated_at: at(60),
            attempts: vec![
                completed_attempt("a1", 80.0, 0),
                completed_attempt("a2", 90.0, 20),
                AttemptInput {
                    attempt_id: "a3".to_string(),
                    problem_id: "bs-1-first-true".to_string(),
                    pattern: Pattern::BinarySearch,
                    rung: 1,
                    state: AttemptState::Coding,
                    score: None,
                    hints_used: Vec::new(),
                    started_at: at(40),
                    completed_at: None,
                },
            ],
            skills: vec![
                SkillInput {
                    pattern: Pattern::SlidingWindow,
                    rung: 1,
                    score: 75.0,
                    attempts_count: 2,
                },
                SkillInput {
                    pattern: Pattern::BinarySearch,
                    rung: 1,
                    score: 40.0,
                    attempts_count: 1,
                },
            ],
        }
    }

    #[test]
    fn test_summary_counts() {
        let report = ReportGenerator::new(input()).generate();
        assert_eq!(report.summary.attempts_total, 3);
        assert_eq!(report.summary.completed, 2);
        assert_eq!(report.summary.abandoned, 0);
        assert_eq!(report.summary.in_progress, 1);
        assert_eq!(report.summary.average_score, Some(85.0));
    }

    #[test]
    fn test_mastery_rows_carry_unlock_state() {
        let report = ReportGenerator::new(input()).generate();
        assert_eq!(report.mastery.len(), 2);
        assert!(report.mastery[0].next_rung_unlocked);
        assert!(!report.mastery[1].next_rung_unlocked);
        assert!(report.has_unlocked_rungs());
    }

    #[test]
    fn test_timeline_is_chronological() {
        let report = ReportGenerator::new(input()).generate();
        let timestamps: Vec<DateTime<Utc>> = report.timeline.iter().map(|e| e.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
        // Two completions + three starts.
        assert_eq!(report.timeline.len(), 5);
    }

    #[test]
    fn test_hint_usage_aggregation() {
        let report = ReportGenerator::new(input()).generate();
        assert_eq!(report.hint_usage.total_hints, 2);
        assert_eq!(report.hint_usage.total_points, 2);
        assert_eq!(report.hint_usage.by_level.len(), 1);
        assert_eq!(
            report.hint_usage.by_level[0].level,
            HintLevel::DirectionalQuestion
        );
    }

    #[test]
    fn test_recommendations_flag_weak_and_unlocked_skills() {
        let report = ReportGenerator::new(input()).generate();
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.category == "mastery" && r.description.contains("Binary Search")));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.category == "progression" && r.description.contains("rung 2")));
        // Sorted by priority.
        let priorities: Vec<u32> = report.recommendations.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_empty_input_recommends_getting_started() {
        let empty = ReportInput {
            user: "u2".to_string(),
            tenant: "default".to_string(),
            generated_at: at(0),
            attempts: Vec::new(),
            skills: Vec::new(),
        };
        let report = ReportGenerator::new(empty).generate();
        assert_eq!(report.summary.attempts_total, 0);
        assert!(report.summary.average_score.is_none());
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.category == "getting-started"));
    }

    #[test]
    fn test_builder_requires_user_and_summary() {
        let result = ProgressReport::builder().build();
        assert!(result.is_err());

        let report = ProgressReport::builder()
            .user("u1")
            .summary(ProgressSummary::default())
            .recommendation(Recommendation::new(1, "mastery", "practice"))
            .build()
            .unwrap();
        assert_eq!(report.user, "u1");
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_report_serialization_round_trip() {
        let report = ReportGenerator::new(input()).generate();
        let json = report.to_json().unwrap();
        assert!(json.contains("mastery"));
        assert!(json.contains("hintUsage"));

        let back: ProgressReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user, report.user);
        assert_eq!(back.mastery.len(), report.mastery.len());
    }
}
