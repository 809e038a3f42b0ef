//! Cumulative counters, rolling histories, and read-only snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of samples kept in each rolling history.
pub const HISTORY_LEN: usize = 60;

/// Fixed-capacity rolling window; the oldest sample is evicted first.
#[derive(Debug, Clone, Default)]
pub(crate) struct History {
    samples: VecDeque<f64>,
}

impl History {
    pub(crate) fn push(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        if self.samples.len() >= HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    pub(crate) fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub(crate) fn min(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub(crate) fn max(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }
}

/// Mutable counters owned by the scheduler.
#[derive(Debug, Clone, Default)]
pub(crate) struct MetricsRecorder {
    pub(crate) total_frames: u64,
    pub(crate) dropped_frames: u64,
    pub(crate) task_executions: u64,
    pub(crate) deferred_tasks: u64,
    pub(crate) expired_one_shots: u64,
    pub(crate) task_failures: u64,
    pub(crate) skipped_ticks: u64,
    pub(crate) fps_history: History,
    pub(crate) budget_history: History,
}

impl MetricsRecorder {
    /// Records the outcome of one accepted frame.
    pub(crate) fn record_frame(&mut self, fps: f64, utilization: f64) {
        self.fps_history.push(fps);
        self.budget_history.push(utilization);
    }

    pub(crate) fn snapshot(&self) -> Metrics {
        Metrics {
            total_frames: self.total_frames,
            dropped_frames: self.dropped_frames,
            task_executions: self.task_executions,
            deferred_tasks: self.deferred_tasks,
            expired_one_shots: self.expired_one_shots,
            task_failures: self.task_failures,
            skipped_ticks: self.skipped_ticks,
            average_fps: self.fps_history.average(),
            min_fps: self.fps_history.min(),
            max_fps: self.fps_history.max(),
            average_budget_usage: self.budget_history.average(),
            fps_samples: self.fps_history.len(),
            budget_samples: self.budget_history.len(),
        }
    }
}

/// Cumulative scheduler metrics. Survive `stop()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Accepted frames.
    pub total_frames: u64,
    /// Accepted frames whose delta exceeded 1.5× the budget.
    pub dropped_frames: u64,
    /// Callback invocations (recurring and one-shot).
    pub task_executions: u64,
    /// One-shot deferrals to a later frame.
    pub deferred_tasks: u64,
    /// One-shot tasks dropped after exhausting their deferrals.
    pub expired_one_shots: u64,
    /// Callback invocations that failed or panicked.
    pub task_failures: u64,
    /// Ticks rejected because they arrived too soon.
    pub skipped_ticks: u64,
    /// Mean of the FPS history; 0 when empty.
    pub average_fps: f64,
    /// Lowest FPS in the history; 0 when empty.
    pub min_fps: f64,
    /// Highest FPS in the history; 0 when empty.
    pub max_fps: f64,
    /// Mean budget utilization; 0 when empty.
    pub average_budget_usage: f64,
    /// Samples currently in the FPS history.
    pub fps_samples: usize,
    /// Samples currently in the budget history.
    pub budget_samples: usize,
}

/// Snapshot of the frame loop's live state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// The loop is started and not paused.
    pub is_running: bool,
    /// The loop is paused.
    pub is_paused: bool,
    /// Instantaneous FPS of the last accepted frame.
    pub current_fps: f64,
    /// Effective target after adaptive and throttle clamps.
    pub target_fps: f64,
    /// Dropped frames since the loop last started.
    pub dropped_frames: u64,
    /// Registered recurring tasks.
    pub active_task_count: usize,
    /// Queued one-shot tasks.
    pub pending_task_count: usize,
    /// Utilization of the last accepted frame.
    pub budget_utilization: f64,
}
