//! Per-frame timing snapshot handed to every callback.

use serde::{Deserialize, Serialize};

/// Which part of the frame a callback runs in.
///
/// Only [`Animation`](Self::Animation) exists today; the field is carried so
/// consumers can match on it once more phases are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePhase {
    /// Recurring and one-shot animation callbacks.
    Animation,
}

/// Immutable snapshot of one accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Strictly increasing within one run of the loop; starts at 1.
    pub frame_number: u64,
    /// Milliseconds since the previous accepted frame.
    pub delta_time_ms: f64,
    /// Clock reading when the frame was accepted.
    pub timestamp_ms: f64,
    /// Phase of the frame.
    pub phase: FramePhase,
    /// Time allowance for this frame.
    pub budget_ms: f64,
    /// Budget left when the snapshot was taken. Every frame currently
    /// starts with a fresh budget, so this equals `budget_ms`; reserved for
    /// phases that run after earlier work in the same frame.
    pub budget_remaining_ms: f64,
    /// `delta_time_ms` exceeded 1.5× the budget.
    pub is_dropped_frame: bool,
}

/// Callback signature for recurring tasks: `(delta_ms, frame)`.
pub type TaskCallback = Box<dyn FnMut(f64, &FrameInfo) -> crate::error::TaskResult>;

/// Callback signature for one-shot tasks.
pub type OneShotCallback = Box<dyn FnOnce(&FrameInfo) -> crate::error::TaskResult>;
