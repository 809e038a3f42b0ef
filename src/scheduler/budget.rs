//! Per-frame budget accounting.

/// Utilization at which non-urgent one-shot tasks are deferred.
pub const DEFER_THRESHOLD: f64 = 0.8;

/// Utilization at which non-urgent recurring tasks stop being admitted.
pub const ADMISSION_THRESHOLD: f64 = 0.9;

/// Tracks the time allowance of the current frame and how much of it the
/// callbacks have used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BudgetAccountant {
    budget_ms: f64,
    used_ms: f64,
}

impl Default for BudgetAccountant {
    fn default() -> Self {
        Self {
            budget_ms: frame_interval_ms(60.0),
            used_ms: 0.0,
        }
    }
}

impl BudgetAccountant {
    /// Starts a new frame with `budget_ms` available.
    pub(crate) fn reset(&mut self, budget_ms: f64) {
        self.budget_ms = budget_ms;
        self.used_ms = 0.0;
    }

    /// Adds the measured cost of one callback.
    pub(crate) fn charge(&mut self, elapsed_ms: f64) {
        if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
            self.used_ms += elapsed_ms;
        }
    }

    pub(crate) fn used_ms(&self) -> f64 {
        self.used_ms
    }

    pub(crate) fn remaining_ms(&self) -> f64 {
        (self.budget_ms - self.used_ms).max(0.0)
    }

    /// `used / budget`; may exceed 1.0 on an overrun.
    pub(crate) fn utilization(&self) -> f64 {
        if self.budget_ms > 0.0 {
            self.used_ms / self.budget_ms
        } else {
            0.0
        }
    }

    /// Non-urgent one-shot work should wait for the next frame.
    pub(crate) fn should_defer(&self) -> bool {
        self.utilization() >= DEFER_THRESHOLD
    }

    /// Non-urgent recurring work still fits this frame.
    pub(crate) fn admits_optional(&self) -> bool {
        self.utilization() < ADMISSION_THRESHOLD
    }
}

/// Time between frames at `fps`, in milliseconds.
pub(crate) fn frame_interval_ms(fps: f64) -> f64 {
    1000.0 / fps
}
