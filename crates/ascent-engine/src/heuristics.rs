//! Pattern-keyed static heuristics over submitted source text.
//!
//! Heuristics never execute code: they are textual scans for the classic
//! ways a pattern gets misapplied (a nested loop where a single pass was the
//! point, a binary search that can stop making progress). Each pattern maps
//! to an ordered rule table; all rules for a pattern run independently and
//! their findings accumulate without short-circuiting.
//!
//! Rules are data, not branching logic: adding a heuristic means adding a
//! table entry.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::gating::ReflectionType;
use crate::pattern::Pattern;

// ============================================================================
// Error categories
// ============================================================================

/// Category of mistake a heuristic detects.
///
/// Categories drive two downstream decisions: which micro-lesson to show for
/// a core error, and which reflection type to require when the same category
/// recurs across consecutive submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A loop nested inside another loop where a single pass is expected.
    NestedIteration,
    /// Window shrink guarded by `if` where a `while` is required.
    WeakShrink,
    /// Grid traversal with no visited tracking.
    MissingVisited,
    /// `left = mid` without `+ 1`; the search can stop converging.
    MidpointStagnation,
    /// Two pointers declared but never advanced.
    StalledPointers,
}

impl ErrorCategory {
    /// Stable slug used in micro-lesson identifiers and step payloads.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::NestedIteration => "nested-iteration",
            Self::WeakShrink => "weak-shrink",
            Self::MissingVisited => "missing-visited",
            Self::MidpointStagnation => "midpoint-stagnation",
            Self::StalledPointers => "stalled-pointers",
        }
    }

    /// The reflection exercise that targets this category of mistake.
    #[must_use]
    pub const fn reflection_type(&self) -> ReflectionType {
        match self {
            Self::NestedIteration => ReflectionType::ComplexityAnalysis,
            Self::WeakShrink | Self::MissingVisited | Self::StalledPointers => {
                ReflectionType::InvariantReview
            }
            Self::MidpointStagnation => ReflectionType::EdgeCaseWalkthrough,
        }
    }

    /// Micro-lesson identifier for this category under the given pattern.
    #[must_use]
    pub fn micro_lesson_id(&self, pattern: Pattern) -> String {
        format!("ml-{}-{}", pattern.as_str(), self.slug())
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

// ============================================================================
// Findings and rules
// ============================================================================

/// One heuristic's verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicFinding {
    /// Identifier of the rule that fired.
    pub heuristic_id: String,
    /// Category of the detected mistake.
    pub category: ErrorCategory,
    /// Whether this is a pattern-specific core error (drives micro-lessons).
    pub core_error: bool,
    /// What the scan saw, with a line reference where available.
    pub evidence: String,
    /// Coaching suggestion surfaced to the learner.
    pub suggestion: String,
}

/// A single static-analysis rule.
pub struct Heuristic {
    /// Stable rule identifier.
    pub id: &'static str,
    /// Category assigned to findings from this rule.
    pub category: ErrorCategory,
    /// Whether a finding from this rule is a pattern-specific core error.
    pub core_error: bool,
    /// Coaching suggestion attached to findings.
    pub suggestion: &'static str,
    /// The scan; returns evidence when the rule fires.
    pub check: fn(&str) -> Option<String>,
}

impl Heuristic {
    /// Runs this rule against the source, producing a finding if it fires.
    #[must_use]
    pub fn run(&self, source: &str) -> Option<HeuristicFinding> {
        (self.check)(source).map(|evidence| HeuristicFinding {
            heuristic_id: self.id.to_string(),
            category: self.category,
            core_error: self.core_error,
            evidence,
            suggestion: self.suggestion.to_string(),
        })
    }
}

impl std::fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heuristic")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("core_error", &self.core_error)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

static SLIDING_WINDOW_RULES: &[Heuristic] = &[
    Heuristic {
        id: "sw-nested-loop",
        category: ErrorCategory::NestedIteration,
        core_error: true,
        suggestion: "A sliding window is a single pass: move the right edge forward and shrink \
                     from the left inside the same sweep instead of restarting an inner loop.",
        check: check_nested_loop,
    },
    Heuristic {
        id: "sw-if-only-shrink",
        category: ErrorCategory::WeakShrink,
        core_error: false,
        suggestion: "Shrink with a while-loop: a single if only removes one element even when \
                     the window is invalid by more than one.",
        check: check_if_only_shrink,
    },
];

static TWO_POINTERS_RULES: &[Heuristic] = &[Heuristic {
    id: "tp-stalled-pointers",
    category: ErrorCategory::StalledPointers,
    core_error: false,
    suggestion: "Every iteration must advance at least one pointer, or the loop never ends.",
    check: check_stalled_pointers,
}];

static BINARY_SEARCH_RULES: &[Heuristic] = &[Heuristic {
    id: "bs-left-mid-no-progress",
    category: ErrorCategory::MidpointStagnation,
    core_error: false,
    suggestion: "Assigning `left = mid` can loop forever once the range is two elements \
                 wide; use `left = mid + 1` (or bias the midpoint) so the range always \
                 narrows.",
    check: check_left_mid_no_progress,
}];

static GRID_DFS_RULES: &[Heuristic] = &[Heuristic {
    id: "gd-missing-visited",
    category: ErrorCategory::MissingVisited,
    core_error: true,
    suggestion: "Track visited cells (a set, or mark the grid in place) before recursing, or \
                 the traversal revisits cells and may never terminate.",
    check: check_missing_visited,
}];

static DYNAMIC_PROGRAMMING_RULES: &[Heuristic] = &[];

/// Returns the ordered rule table for a pattern.
#[must_use]
pub fn heuristics_for(pattern: Pattern) -> &'static [Heuristic] {
    match pattern {
        Pattern::SlidingWindow => SLIDING_WINDOW_RULES,
        Pattern::TwoPointers => TWO_POINTERS_RULES,
        Pattern::BinarySearch => BINARY_SEARCH_RULES,
        Pattern::GridDfs => GRID_DFS_RULES,
        Pattern::DynamicProgramming => DYNAMIC_PROGRAMMING_RULES,
    }
}

/// Runs every heuristic registered for the pattern.
///
/// All rules run; findings accumulate without short-circuiting.
#[must_use]
pub fn analyze(pattern: Pattern, source: &str) -> Vec<HeuristicFinding> {
    heuristics_for(pattern)
        .iter()
        .filter_map(|h| h.run(source))
        .collect()
}

// ============================================================================
// Scans
// ============================================================================

/// Width of a line's leading whitespace, counting tabs as four columns.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Detects a `for` header indented inside another loop's body.
///
/// Indentation-based so it reads both brace and offside-rule languages. An
/// inner `while` is deliberately not flagged: the amortized while-shrink
/// inside the sweep is the correct sliding-window shape; an inner `for`
/// restarts iteration and breaks the single pass.
fn check_nested_loop(source: &str) -> Option<String> {
    let Ok(header) = Regex::new(r"^(for|while)\b") else {
        return None;
    };

    let mut open_loops: Vec<usize> = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indent_width(raw);
        while open_loops.last().is_some_and(|&i| indent <= i) {
            open_loops.pop();
        }
        if header.is_match(trimmed) {
            if trimmed.starts_with("for") && !open_loops.is_empty() {
                return Some(format!(
                    "for-loop at line {} is nested inside another loop",
                    idx + 1
                ));
            }
            open_loops.push(indent);
        }
    }
    None
}

/// Detects a left-edge advance in source that contains no `while` at all.
fn check_if_only_shrink(source: &str) -> Option<String> {
    let Ok(shrink) = Regex::new(r"\bleft\s*(\+=|\+\+|=\s*left\s*\+)") else {
        return None;
    };

    let has_while = source
        .lines()
        .any(|line| line.trim_start().starts_with("while"));
    if has_while {
        return None;
    }

    source
        .lines()
        .enumerate()
        .find(|(_, line)| shrink.is_match(line))
        .map(|(idx, _)| {
            format!(
                "window shrinks at line {} but no while-loop shrink exists",
                idx + 1
            )
        })
}

/// Detects `left`/`right` pointers that are never advanced.
fn check_stalled_pointers(source: &str) -> Option<String> {
    let Ok(ident) = Regex::new(r"\b(left|right)\b") else {
        return None;
    };
    let Ok(movement) =
        Regex::new(r"\b(left|right)\s*(\+=|-=|\+\+|--|=\s*(left|right)\s*[+-])")
    else {
        return None;
    };

    let mentions_left = source.contains("left");
    let mentions_right = source.contains("right");
    if mentions_left && mentions_right && ident.is_match(source) && !movement.is_match(source) {
        return Some("left and right are declared but never advanced".to_string());
    }
    None
}

/// Detects `left = mid` with no `+ 1` on the right-hand side.
fn check_left_mid_no_progress(source: &str) -> Option<String> {
    let Ok(assignment) = Regex::new(r"\bleft\s*=\s*mid\b([^\n;]*)") else {
        return None;
    };

    for (idx, line) in source.lines().enumerate() {
        for caps in assignment.captures_iter(line) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            if !rest.contains('+') {
                return Some(format!(
                    "`left = mid` at line {} never excludes mid from the range",
                    idx + 1
                ));
            }
        }
    }
    None
}

/// Detects grid traversal source with no visited tracking.
fn check_missing_visited(source: &str) -> Option<String> {
    let lowered = source.to_lowercase();
    if lowered.contains("visited") || lowered.contains("seen") || lowered.contains(".add(") {
        return None;
    }

    // In-place marking: an assignment into a 2D index.
    let Ok(mark) = Regex::new(r"\w+\[[^\]]+\]\[[^\]]+\]\s*=[^=]") else {
        return None;
    };
    if mark.is_match(source) {
        return None;
    }

    Some("no visited set or in-place cell marking found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NESTED_WINDOW: &str = "\
for right in range(n):
    for left in range(right):
        total += nums[left]
";

    const SINGLE_PASS_WINDOW: &str = "\
left = 0
for right in range(n):
    total += nums[right]
    while total > limit:
        total -= nums[left]
        left += 1
";

    #[test]
    fn test_nested_loop_detected() {
        let findings = analyze(Pattern::SlidingWindow, NESTED_WINDOW);
        assert!(findings
            .iter()
            .any(|f| f.heuristic_id == "sw-nested-loop" && f.core_error));
    }

    #[test]
    fn test_single_pass_window_is_clean() {
        let findings = analyze(Pattern::SlidingWindow, SINGLE_PASS_WINDOW);
        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
    }

    #[test]
    fn test_sequential_loops_are_not_nested() {
        let source = "\
for right in range(n):
    total += nums[right]
for left in range(n):
    total -= nums[left]
";
        assert!(check_nested_loop(source).is_none());
    }

    #[test]
    fn test_if_only_shrink_detected() {
        let source = "\
left = 0
for right in range(n):
    total += nums[right]
    if total > limit:
        total -= nums[left]
        left += 1
";
        let findings = analyze(Pattern::SlidingWindow, source);
        assert!(findings
            .iter()
            .any(|f| f.category == ErrorCategory::WeakShrink));
    }

    #[test]
    fn test_stalled_pointers_detected() {
        let source = "\
left = 0
right = n - 1
while left < right:
    total = nums[left] + nums[right]
";
        let findings = analyze(Pattern::TwoPointers, source);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, ErrorCategory::StalledPointers);
    }

    #[test]
    fn test_moving_pointers_are_clean() {
        let source = "\
left = 0
right = n - 1
while left < right:
    if nums[left] + nums[right] < target:
        left += 1
    else:
        right -= 1
";
        assert!(analyze(Pattern::TwoPointers, source).is_empty());
    }

    #[test]
    fn test_left_mid_without_progress_detected() {
        let source = "\
while left < right:
    mid = (left + right) // 2
    if nums[mid] < target:
        left = mid
    else:
        right = mid
";
        let findings = analyze(Pattern::BinarySearch, source);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, ErrorCategory::MidpointStagnation);
        assert!(findings[0].evidence.contains("line 4"));
    }

    #[test]
    fn test_left_mid_plus_one_is_clean() {
        let source = "\
while left <= right:
    mid = (left + right) // 2
    if nums[mid] < target:
        left = mid + 1
    else:
        right = mid - 1
";
        assert!(analyze(Pattern::BinarySearch, source).is_empty());
    }

    #[test]
    fn test_missing_visited_detected() {
        let source = "\
def dfs(grid, r, c):
    if r < 0 or c < 0:
        return
    dfs(grid, r + 1, c)
    dfs(grid, r, c + 1)
";
        let findings = analyze(Pattern::GridDfs, source);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].core_error);
    }

    #[test]
    fn test_visited_set_is_clean() {
        let source = "\
def dfs(grid, r, c, visited):
    if (r, c) in visited:
        return
    visited.add((r, c))
    dfs(grid, r + 1, c, visited)
";
        assert!(analyze(Pattern::GridDfs, source).is_empty());
    }

    #[test]
    fn test_in_place_marking_is_clean() {
        let source = "\
def dfs(grid, r, c):
    grid[r][c] = 0
    dfs(grid, r + 1, c)
";
        assert!(analyze(Pattern::GridDfs, source).is_empty());
    }

    #[test]
    fn test_dynamic_programming_has_no_rules_yet() {
        assert!(heuristics_for(Pattern::DynamicProgramming).is_empty());
    }

    #[test]
    fn test_micro_lesson_id_format() {
        assert_eq!(
            ErrorCategory::NestedIteration.micro_lesson_id(Pattern::SlidingWindow),
            "ml-sliding_window-nested-iteration"
        );
    }

    #[test]
    fn test_findings_serialize_round_trip() {
        let finding = HeuristicFinding {
            heuristic_id: "sw-nested-loop".to_string(),
            category: ErrorCategory::NestedIteration,
            core_error: true,
            evidence: "loop at line 2 is nested inside another loop".to_string(),
            suggestion: "single pass".to_string(),
        };
        let json = serde_json::to_string(&finding).unwrap();
        let back: HeuristicFinding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, finding);
    }
}
