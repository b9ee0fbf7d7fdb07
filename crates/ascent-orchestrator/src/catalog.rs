//! Problem catalog.
//!
//! Problems are grouped by (pattern, rung); problems sharing both are
//! siblings served for repeated practice. The built-in catalog makes the
//! server usable out of the box; deployments point `catalogFile` at their
//! own JSON to replace it.

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use ascent_engine::{ForbiddenConcept, Pattern};

use crate::error::{CoachError, Result};

// ============================================================================
// Types
// ============================================================================

/// One test case for a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Input handed to the submission.
    pub input: String,
    /// Expected output.
    pub expected: String,
}

impl TestCase {
    /// Creates a test case.
    #[must_use]
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

/// A problem on the ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    /// Stable problem identifier.
    pub id: String,
    /// Short title shown to the learner.
    pub title: String,
    /// Pattern the problem drills.
    pub pattern: Pattern,
    /// Rung on the pattern's ladder.
    pub rung: u8,
    /// Problem statement.
    pub prompt: String,
    /// Test cases run against submissions.
    pub test_cases: Vec<TestCase>,
    /// Techniques this problem prohibits.
    #[serde(default)]
    pub forbidden: Vec<ForbiddenConcept>,
}

/// The set of problems a deployment serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// All problems, any order.
    pub problems: Vec<Problem>,
}

impl Catalog {
    /// Looks up a problem by id.
    #[must_use]
    pub fn find(&self, problem_id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == problem_id)
    }

    /// All problems sharing a (pattern, rung) pair, in catalog order.
    #[must_use]
    pub fn siblings(&self, pattern: Pattern, rung: u8) -> Vec<&Problem> {
        self.problems
            .iter()
            .filter(|p| p.pattern == pattern && p.rung == rung)
            .collect()
    }

    /// Number of siblings on a (pattern, rung) pair.
    #[must_use]
    pub fn sibling_count(&self, pattern: Pattern, rung: u8) -> usize {
        self.siblings(pattern, rung).len()
    }

    /// Loads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::ConfigParseError` when the file is missing or
    /// malformed, and `CoachError::ConfigValidationError` when it contains
    /// no problems or duplicate ids.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CoachError::config_parse(path, format!("failed to read file: {e}")))?;
        let catalog: Self = serde_json::from_str(&contents)
            .map_err(|e| CoachError::config_parse(path, e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validates catalog invariants.
    ///
    /// # Errors
    ///
    /// Returns `CoachError::ConfigValidationError` on an empty catalog or
    /// duplicate problem ids.
    pub fn validate(&self) -> Result<()> {
        if self.problems.is_empty() {
            return Err(CoachError::config_validation(
                "catalog contains no problems",
                "Add at least one problem to the catalog file",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for problem in &self.problems {
            if !seen.insert(problem.id.as_str()) {
                return Err(CoachError::config_validation(
                    format!("duplicate problem id '{}'", problem.id),
                    "Problem ids must be unique within the catalog",
                ));
            }
        }
        Ok(())
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }
}

// ============================================================================
// Built-in problems
// ============================================================================

static BUILTIN: Lazy<Catalog> = Lazy::new(|| Catalog {
    problems: vec![
        Problem {
            id: "sw-1-max-sum-window".to_string(),
            title: "Maximum Sum of a Window of Size K".to_string(),
            pattern: Pattern::SlidingWindow,
            rung: 1,
            prompt: "Given an integer array and k, return the maximum sum of any contiguous \
                     window of exactly k elements."
                .to_string(),
            test_cases: vec![
                TestCase::new("[2,1,5,1,3,2] k=3", "9"),
                TestCase::new("[1,9,-1,-2,7,3] k=4", "13"),
                TestCase::new("[4] k=1", "4"),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "sw-1-longest-uniform".to_string(),
            title: "Longest Substring of One Repeated Character".to_string(),
            pattern: Pattern::SlidingWindow,
            rung: 1,
            prompt: "Return the length of the longest substring consisting of a single repeated \
                     character, given you may replace at most one character."
                .to_string(),
            test_cases: vec![
                TestCase::new("\"aabccbb\"", "3"),
                TestCase::new("\"abbcb\"", "4"),
                TestCase::new("\"aaaa\"", "4"),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "sw-2-min-window-substring".to_string(),
            title: "Minimum Window Containing All Required Characters".to_string(),
            pattern: Pattern::SlidingWindow,
            rung: 2,
            prompt: "Given strings s and t, return the smallest window of s containing every \
                     character of t with multiplicity."
                .to_string(),
            test_cases: vec![
                TestCase::new("s=\"ADOBECODEBANC\" t=\"ABC\"", "\"BANC\""),
                TestCase::new("s=\"a\" t=\"a\"", "\"a\""),
                TestCase::new("s=\"a\" t=\"aa\"", "\"\""),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "tp-1-pair-sum-sorted".to_string(),
            title: "Pair Sum in a Sorted Array".to_string(),
            pattern: Pattern::TwoPointers,
            rung: 1,
            prompt: "Given a sorted integer array and a target, return the indices of the pair \
                     summing to the target using O(1) extra space."
                .to_string(),
            test_cases: vec![
                TestCase::new("[1,3,5,8] target=9", "[0,3]"),
                TestCase::new("[2,7,11,15] target=9", "[0,1]"),
                TestCase::new("[1,2,3] target=100", "[]"),
            ],
            forbidden: vec![ForbiddenConcept::error(
                "fc-no-lookup-table",
                Pattern::TwoPointers,
                r"\b(dict\(|HashMap|defaultdict|Counter\()",
                "the point of this drill is the O(1)-space pointer sweep, not a lookup table",
            )],
        },
        Problem {
            id: "tp-1-reverse-vowels".to_string(),
            title: "Reverse the Vowels In Place".to_string(),
            pattern: Pattern::TwoPointers,
            rung: 1,
            prompt: "Reverse only the vowels of a string in place with two pointers.".to_string(),
            test_cases: vec![
                TestCase::new("\"hello\"", "\"holle\""),
                TestCase::new("\"ascent\"", "\"escant\""),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "bs-1-first-true".to_string(),
            title: "First Index Where the Predicate Turns True".to_string(),
            pattern: Pattern::BinarySearch,
            rung: 1,
            prompt: "Given a sorted array and a target, return the index of the first element \
                     greater than or equal to the target."
                .to_string(),
            test_cases: vec![
                TestCase::new("[1,3,5,7] target=5", "2"),
                TestCase::new("[1,3,5,7] target=4", "2"),
                TestCase::new("[1,3,5,7] target=9", "4"),
            ],
            forbidden: vec![ForbiddenConcept::warning(
                "fc-no-builtin-search",
                Pattern::BinarySearch,
                r"\b(bisect|binary_search|searchsorted)\b",
                "implement the search by hand instead of calling the library",
            )],
        },
        Problem {
            id: "bs-1-rotated-minimum".to_string(),
            title: "Minimum of a Rotated Sorted Array".to_string(),
            pattern: Pattern::BinarySearch,
            rung: 1,
            prompt: "Return the minimum element of a rotated, duplicate-free sorted array in \
                     O(log n)."
                .to_string(),
            test_cases: vec![
                TestCase::new("[4,5,6,1,2,3]", "1"),
                TestCase::new("[2,3,4,5,1]", "1"),
                TestCase::new("[1,2,3]", "1"),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "gd-1-count-islands".to_string(),
            title: "Count the Islands".to_string(),
            pattern: Pattern::GridDfs,
            rung: 1,
            prompt: "Given a grid of land (1) and water (0) cells, count the \
                     four-directionally connected islands."
                .to_string(),
            test_cases: vec![
                TestCase::new("[[1,1,0],[0,1,0],[0,0,1]]", "2"),
                TestCase::new("[[0]]", "0"),
                TestCase::new("[[1,0,1]]", "2"),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "gd-1-flood-fill".to_string(),
            title: "Flood Fill".to_string(),
            pattern: Pattern::GridDfs,
            rung: 1,
            prompt: "Starting from a cell, repaint every reachable cell of the same color."
                .to_string(),
            test_cases: vec![
                TestCase::new("[[1,1],[1,0]] start=(0,0) color=2", "[[2,2],[2,0]]"),
                TestCase::new("[[0]] start=(0,0) color=0", "[[0]]"),
            ],
            forbidden: Vec::new(),
        },
        Problem {
            id: "dp-1-climbing-stairs".to_string(),
            title: "Distinct Ways Up the Stairs".to_string(),
            pattern: Pattern::DynamicProgramming,
            rung: 1,
            prompt: "You can climb one or two steps at a time; count the distinct ways to \
                     reach step n."
                .to_string(),
            test_cases: vec![
                TestCase::new("n=2", "2"),
                TestCase::new("n=3", "3"),
                TestCase::new("n=10", "89"),
            ],
            forbidden: Vec::new(),
        },
    ],
});
