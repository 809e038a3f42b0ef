//! Task priority tiers and their skip budgets.

use serde::{Deserialize, Serialize};

/// Priority tier of a recurring or one-shot task.
///
/// Declaration order is execution order: `Critical` runs first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Runs every accepted frame regardless of budget.
    Critical,
    /// Never blocked by the budget thresholds.
    High,
    /// Default tier for ordinary animation work.
    #[default]
    Normal,
    /// Cosmetic work that tolerates a few skipped frames.
    Low,
    /// Background work that only runs when there is room.
    Idle,
}

/// Default `max_skip_frames` per tier, indexed by [`Priority::weight`].
const DEFAULT_MAX_SKIP_FRAMES: [u32; 5] = [0, 1, 2, 5, 10];

impl Priority {
    /// All tiers in execution order.
    pub const ALL: [Self; 5] = [
        Self::Critical,
        Self::High,
        Self::Normal,
        Self::Low,
        Self::Idle,
    ];

    /// Sort weight; lower runs first.
    pub const fn weight(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
            Self::Idle => 4,
        }
    }

    /// Consecutive frames a task of this tier may be skipped before it is
    /// forced to run.
    pub const fn default_max_skip_frames(self) -> u32 {
        DEFAULT_MAX_SKIP_FRAMES[self.weight() as usize]
    }

    /// Whether budget thresholds can hold this tier back.
    pub const fn is_budget_exempt(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}
