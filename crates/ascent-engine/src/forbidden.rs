//! Forbidden-concept detection.
//!
//! Problems can prohibit specific techniques: a two-sum variant that forbids
//! hash maps because the point is the pointer sweep, a binary-search drill
//! that forbids the standard library's search. Each problem carries its own
//! rule list; matchers are regexes over the submitted source.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pattern::Pattern;

/// How strongly a forbidden-concept match gates the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The submission is rejected outright.
    Error,
    /// The match is surfaced to the learner but does not block.
    Warning,
}

/// A prohibited technique attached to a problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForbiddenConcept {
    /// Stable rule identifier.
    pub id: String,
    /// Pattern the rule belongs to.
    pub pattern: Pattern,
    /// Regex applied to the submitted source.
    pub matcher: String,
    /// Why the technique is prohibited here.
    pub reason: String,
    /// Whether a match blocks or only warns.
    pub severity: Severity,
}

impl ForbiddenConcept {
    /// Creates a blocking rule.
    #[must_use]
    pub fn error(
        id: impl Into<String>,
        pattern: Pattern,
        matcher: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern,
            matcher: matcher.into(),
            reason: reason.into(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-only rule.
    #[must_use]
    pub fn warning(
        id: impl Into<String>,
        pattern: Pattern,
        matcher: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern,
            matcher: matcher.into(),
            reason: reason.into(),
            severity: Severity::Warning,
        }
    }
}

/// One forbidden-concept rule that fired on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForbiddenMatch {
    /// Identifier of the rule that matched.
    pub concept_id: String,
    /// Why the technique is prohibited.
    pub reason: String,
    /// Whether the match blocks or warns.
    pub severity: Severity,
    /// The matched source fragment.
    pub evidence: String,
}

/// Scans a submission against a problem's forbidden-concept rules.
///
/// All rules run; matches accumulate independently of every other component.
/// A rule with an invalid matcher is skipped (and logged) rather than
/// failing the scan.
#[must_use]
pub fn scan(source: &str, concepts: &[ForbiddenConcept]) -> Vec<ForbiddenMatch> {
    let mut matches = Vec::new();
    for concept in concepts {
        let Ok(re) = Regex::new(&concept.matcher) else {
            warn!(concept_id = %concept.id, matcher = %concept.matcher, "skipping invalid forbidden-concept matcher");
            continue;
        };
        if let Some(found) = re.find(source) {
            matches.push(ForbiddenMatch {
                concept_id: concept.id.clone(),
                reason: concept.reason.clone(),
                severity: concept.severity,
                evidence: found.as_str().to_string(),
            });
        }
    }
    matches
}
