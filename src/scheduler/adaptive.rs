//! Adaptive frame-rate control.
//!
//! A coarse hysteresis controller: every `adaptive_interval_frames` accepted
//! frames it looks at the average budget utilization in the rolling history
//! and moves its frame-rate level by one `adaptive_step_fps` step.
//!
//! | Average utilization | Action |
//! |---------------------|--------|
//! | > 0.9 | step down, floored at `min_fps` |
//! | < 0.6 | step up, capped at `target_fps` |
//! | otherwise | hold |

use crate::config::PacerConfig;
use crate::scheduler::metrics::History;

/// Average utilization above which the controller steps down.
pub const OVERLOAD_THRESHOLD: f64 = 0.9;

/// Average utilization below which the controller steps up.
pub const UNDERLOAD_THRESHOLD: f64 = 0.6;

/// A level change produced by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RateChange {
    pub(crate) from_fps: f64,
    pub(crate) to_fps: f64,
    pub(crate) average_utilization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AdaptiveRateController {
    level_fps: f64,
    frames_since_eval: u32,
}

impl AdaptiveRateController {
    pub(crate) fn new(config: &PacerConfig) -> Self {
        Self {
            level_fps: config.target_fps,
            frames_since_eval: 0,
        }
    }

    /// Current adaptive level.
    pub(crate) fn level_fps(&self) -> f64 {
        self.level_fps
    }

    /// Returns to the configured target and restarts the evaluation window.
    pub(crate) fn reset(&mut self, config: &PacerConfig) {
        self.level_fps = config.target_fps;
        self.frames_since_eval = 0;
    }

    /// Re-applies bounds after a config change.
    pub(crate) fn clamp_to(&mut self, config: &PacerConfig) {
        self.level_fps = self.level_fps.clamp(config.min_fps, config.target_fps);
    }

    /// Feeds one accepted frame. Returns the change when the level moved.
    pub(crate) fn observe(&mut self, config: &PacerConfig, utilization: &History) -> Option<RateChange> {
        self.frames_since_eval = self.frames_since_eval.saturating_add(1);
        let interval = config.adaptive_interval_frames.max(1);
        if self.frames_since_eval < interval || utilization.len() < interval as usize {
            return None;
        }
        self.frames_since_eval = 0;

        let average = utilization.average();
        let from = self.level_fps;
        let to = if average > OVERLOAD_THRESHOLD {
            (from - config.adaptive_step_fps).max(config.min_fps)
        } else if average < UNDERLOAD_THRESHOLD {
            (from + config.adaptive_step_fps).min(config.target_fps)
        } else {
            from
        };
        self.level_fps = to.clamp(config.min_fps, config.target_fps);

        if (self.level_fps - from).abs() > f64::EPSILON {
            Some(RateChange {
                from_fps: from,
                to_fps: self.level_fps,
                average_utilization: average,
            })
        } else {
            None
        }
    }
}
