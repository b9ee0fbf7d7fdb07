//! Hint levels and the per-attempt hint budget.
//!
//! Every attempt gets a fixed budget of 10 points. Hint levels cost more as
//! they reveal more; running out of budget is not an error, it just narrows
//! what the learner can still ask for.

use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;

/// Fixed hint budget per attempt, in points.
pub const HINT_BUDGET_TOTAL: u8 = 10;

// ============================================================================
// Hint levels
// ============================================================================

/// Escalating hint levels, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintLevel {
    /// A question nudging the learner toward the right observation.
    DirectionalQuestion,
    /// The governing heuristic, stated outright.
    HeuristicHint,
    /// The underlying concept, explained.
    ConceptInjection,
    /// A worked micro-example on a tiny input.
    MicroExample,
    /// A concrete patch for the learner's likely mistake.
    PatchSnippet,
}

impl HintLevel {
    /// All levels in ascending cost order.
    pub const ALL: [Self; 5] = [
        Self::DirectionalQuestion,
        Self::HeuristicHint,
        Self::ConceptInjection,
        Self::MicroExample,
        Self::PatchSnippet,
    ];

    /// Budget points this level costs.
    #[must_use]
    pub const fn cost(&self) -> u8 {
        match self {
            Self::DirectionalQuestion => 1,
            Self::HeuristicHint | Self::ConceptInjection => 2,
            Self::MicroExample => 3,
            Self::PatchSnippet => 4,
        }
    }

    /// Returns the stable wire identifier for this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DirectionalQuestion => "directional_question",
            Self::HeuristicHint => "heuristic_hint",
            Self::ConceptInjection => "concept_injection",
            Self::MicroExample => "micro_example",
            Self::PatchSnippet => "patch_snippet",
        }
    }
}

impl std::fmt::Display for HintLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Budget
// ============================================================================

/// Derived view of an attempt's hint spend.
///
/// Not persisted on its own: rebuild it from the attempt's `hints_used` list
/// with [`HintBudget::from_used`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintBudget {
    used: Vec<HintLevel>,
}

impl HintBudget {
    /// A fresh, unspent budget.
    #[must_use]
    pub const fn new() -> Self {
        Self { used: Vec::new() }
    }

    /// Rebuilds the budget from an attempt's used-hint history.
    #[must_use]
    pub fn from_used(used: &[HintLevel]) -> Self {
        Self {
            used: used.to_vec(),
        }
    }

    /// The fixed total budget.
    #[must_use]
    pub const fn total(&self) -> u8 {
        HINT_BUDGET_TOTAL
    }

    /// Points spent so far.
    #[must_use]
    pub fn spent(&self) -> u8 {
        self.used
            .iter()
            .map(|level| level.cost())
            .fold(0u8, u8::saturating_add)
    }

    /// Points remaining.
    #[must_use]
    pub fn remaining(&self) -> u8 {
        HINT_BUDGET_TOTAL.saturating_sub(self.spent())
    }

    /// Whether the budget covers the given level.
    #[must_use]
    pub fn can_afford(&self, level: HintLevel) -> bool {
        level.cost() <= self.remaining()
    }

    /// The cheapest level not yet used this attempt that the budget still
    /// covers, or `None` when nothing affordable remains.
    #[must_use]
    pub fn next_affordable_level(&self) -> Option<HintLevel> {
        HintLevel::ALL
            .into_iter()
            .find(|level| !self.used.contains(level) && self.can_afford(*level))
    }

    /// Levels consumed so far, in grant order.
    #[must_use]
    pub fn used(&self) -> &[HintLevel] {
        &self.used
    }

    /// Charges a level against the budget, returning the updated budget.
    ///
    /// Returns `None` when the level is unaffordable; exhaustion degrades
    /// hint availability, it is not an error.
    #[must_use]
    pub fn charge(&self, level: HintLevel) -> Option<Self> {
        if !self.can_afford(level) {
            return None;
        }
        let mut next = self.clone();
        next.used.push(level);
        Some(next)
    }
}

// ============================================================================
// Hint content
// ============================================================================

/// Static hint text for a (pattern, level) pair.
#[must_use]
pub const fn hint_text(pattern: Pattern, level: HintLevel) -> &'static str {
    match (pattern, level) {
        (Pattern::SlidingWindow, HintLevel::DirectionalQuestion) => {
            "What changes about the window when the element at `right` enters it?"
        }
        (Pattern::SlidingWindow, HintLevel::HeuristicHint) => {
            "Expand with the right edge every step; shrink from the left only while the window is invalid."
        }
        (Pattern::SlidingWindow, HintLevel::ConceptInjection) => {
            "Each index enters and leaves the window at most once, so the whole sweep is O(n) even with the inner shrink."
        }
        (Pattern::SlidingWindow, HintLevel::MicroExample) => {
            "For nums=[2,1,2] and limit 3: right=0 window [2]; right=1 window [2,1]; right=2 exceeds, shrink twice to [2]."
        }
        (Pattern::SlidingWindow, HintLevel::PatchSnippet) => {
            "while window_sum > limit: window_sum -= nums[left]; left += 1"
        }
        (Pattern::TwoPointers, HintLevel::DirectionalQuestion) => {
            "If the current pair's sum is too small, which pointer can you safely move?"
        }
        (Pattern::TwoPointers, HintLevel::HeuristicHint) => {
            "Sorted order means moving `left` only grows the sum and moving `right` only shrinks it."
        }
        (Pattern::TwoPointers, HintLevel::ConceptInjection) => {
            "Each step discards every pair involving the abandoned index, so n-1 steps cover all pairs."
        }
        (Pattern::TwoPointers, HintLevel::MicroExample) => {
            "For [1,3,5,8] and target 9: 1+8=9 found immediately; for target 10, 1+8<10 moves left."
        }
        (Pattern::TwoPointers, HintLevel::PatchSnippet) => {
            "if nums[left] + nums[right] < target: left += 1 else: right -= 1"
        }
        (Pattern::BinarySearch, HintLevel::DirectionalQuestion) => {
            "After comparing at `mid`, which half can you prove the answer is not in?"
        }
        (Pattern::BinarySearch, HintLevel::HeuristicHint) => {
            "Keep an invariant for what lives outside [left, right] and make every branch shrink the range."
        }
        (Pattern::BinarySearch, HintLevel::ConceptInjection) => {
            "The predicate is monotonic: false...false true...true. You are searching for the boundary."
        }
        (Pattern::BinarySearch, HintLevel::MicroExample) => {
            "In [1,3,5,7] searching 5: mid=1 (3<5) so left=2; mid=2 hits 5."
        }
        (Pattern::BinarySearch, HintLevel::PatchSnippet) => {
            "if nums[mid] < target: left = mid + 1 else: right = mid"
        }
        (Pattern::GridDfs, HintLevel::DirectionalQuestion) => {
            "What stops the recursion from walking back onto the cell it just came from?"
        }
        (Pattern::GridDfs, HintLevel::HeuristicHint) => {
            "Mark a cell visited before recursing into its neighbors, not after."
        }
        (Pattern::GridDfs, HintLevel::ConceptInjection) => {
            "DFS on a grid is graph traversal; without a visited set the graph has cycles and the walk never ends."
        }
        (Pattern::GridDfs, HintLevel::MicroExample) => {
            "On [[1,1],[0,1]]: start (0,0), mark it, visit (0,1), mark, visit (1,1); (1,0) is water and is skipped."
        }
        (Pattern::GridDfs, HintLevel::PatchSnippet) => {
            "if (r, c) in visited or grid[r][c] == 0: return\nvisited.add((r, c))"
        }
        (Pattern::DynamicProgramming, HintLevel::DirectionalQuestion) => {
            "What is the smallest input whose answer you can write down without any computation?"
        }
        (Pattern::DynamicProgramming, HintLevel::HeuristicHint) => {
            "Define the state first; the transition is a function of strictly smaller states."
        }
        (Pattern::DynamicProgramming, HintLevel::ConceptInjection) => {
            "Overlapping subproblems mean the naive recursion recomputes; memoize on the state tuple."
        }
        (Pattern::DynamicProgramming, HintLevel::MicroExample) => {
            "climb(3) = climb(2) + climb(1) = 2 + 1 = 3; each value is computed once with a table."
        }
        (Pattern::DynamicProgramming, HintLevel::PatchSnippet) => {
            "dp[i] = dp[i - 1] + dp[i - 2]  # with dp[0], dp[1] seeded"
        }
    }
}
