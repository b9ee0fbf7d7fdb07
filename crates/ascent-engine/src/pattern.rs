//! Algorithmic pattern taxonomy for the Ascent difficulty ladder.
//!
//! Every problem is classified under one [`Pattern`]. Patterns carry the
//! static knowledge the engine needs: the keyword vocabulary an invariant
//! statement is expected to draw from, and the height of the pattern's
//! rung ladder.

use serde::{Deserialize, Serialize};

/// A named algorithmic technique a problem is classified under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Variable- or fixed-size window sweep over a sequence.
    SlidingWindow,
    /// Two indices converging or running in tandem over a sequence.
    TwoPointers,
    /// Halving search over a sorted or monotonic space.
    BinarySearch,
    /// Depth-first traversal over a 2D grid.
    GridDfs,
    /// Overlapping-subproblem tabulation or memoization.
    DynamicProgramming,
}

impl Pattern {
    /// All patterns, in ladder order.
    pub const ALL: [Self; 5] = [
        Self::SlidingWindow,
        Self::TwoPointers,
        Self::BinarySearch,
        Self::GridDfs,
        Self::DynamicProgramming,
    ];

    /// Returns the stable wire identifier for this pattern.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SlidingWindow => "sliding_window",
            Self::TwoPointers => "two_pointers",
            Self::BinarySearch => "binary_search",
            Self::GridDfs => "grid_dfs",
            Self::DynamicProgramming => "dynamic_programming",
        }
    }

    /// Returns a human-readable label for this pattern.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SlidingWindow => "Sliding Window",
            Self::TwoPointers => "Two Pointers",
            Self::BinarySearch => "Binary Search",
            Self::GridDfs => "Grid DFS",
            Self::DynamicProgramming => "Dynamic Programming",
        }
    }

    /// Keywords an invariant statement for this pattern is expected to
    /// mention. Used by the thinking-gate validator; absence is a soft
    /// warning, not a hard failure.
    #[must_use]
    pub const fn invariant_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::SlidingWindow => &["window", "left", "right", "shrink", "expand", "valid"],
            Self::TwoPointers => &["left", "right", "pointer", "converge", "move", "sorted"],
            Self::BinarySearch => &["mid", "half", "monotonic", "sorted", "bound", "narrow"],
            Self::GridDfs => &["visited", "neighbor", "recurse", "mark", "boundary", "cell"],
            Self::DynamicProgramming => {
                &["subproblem", "state", "transition", "memo", "table", "base"]
            }
        }
    }

    /// The highest rung on this pattern's ladder.
    #[must_use]
    pub const fn final_rung(&self) -> u8 {
        match self {
            Self::SlidingWindow | Self::BinarySearch => 5,
            Self::TwoPointers | Self::GridDfs => 4,
            Self::DynamicProgramming => 6,
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_serialization() {
        assert_eq!(
            serde_json::to_string(&Pattern::SlidingWindow).unwrap(),
            r#""sliding_window""#
        );
        assert_eq!(
            serde_json::to_string(&Pattern::GridDfs).unwrap(),
            r#""grid_dfs""#
        );
    }

    #[test]
    fn test_pattern_deserialization() {
        let pattern: Pattern = serde_json::from_str(r#""two_pointers""#).unwrap();
        assert_eq!(pattern, Pattern::TwoPointers);
    }

    #[test]
    fn test_pattern_display_matches_wire_id() {
        for pattern in Pattern::ALL {
            assert_eq!(pattern.to_string(), pattern.as_str());
        }
    }

    #[test]
    fn test_every_pattern_has_keywords() {
        for pattern in Pattern::ALL {
            assert!(!pattern.invariant_keywords().is_empty());
        }
    }

    #[test]
    fn test_final_rung_is_at_least_one() {
        for pattern in Pattern::ALL {
            assert!(pattern.final_rung() >= 1);
        }
    }
}
