//! Configuration types for the frame pacer.
//!
//! [`PacerConfig`] is an immutable-per-update value: the scheduler never
//! mutates it in place, it replaces it with the normalized result of
//! [`PacerConfig::apply`]. Out-of-range values are clamped rather than
//! rejected.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scheduler::HISTORY_LEN;

/// Hard upper bound for any target frame rate.
pub const MAX_FPS: f64 = 120.0;

/// Lowest frame rate the pacer will ever be configured for.
const FLOOR_FPS: f64 = 1.0;

/// Top-level configuration for the frame scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    /// Desired frame rate when unthrottled.
    pub target_fps: f64,
    /// Floor for every throttle and the adaptive controller.
    pub min_fps: f64,
    /// Fixed per-frame budget in ms. `None` derives it from the effective
    /// frame rate (`1000 / fps`).
    pub frame_budget_ms: Option<f64>,
    /// Let the scheduler lower/raise its own frame rate based on load.
    pub adaptive_frame_rate: bool,
    /// Clamp the frame rate while discharging below
    /// [`low_battery_threshold`](Self::low_battery_threshold).
    pub battery_saver: bool,
    /// Frame rate used while the battery saver is engaged.
    pub battery_saver_fps: f64,
    /// Battery level (0.0–1.0) below which the saver engages.
    pub low_battery_threshold: f64,
    /// Clamp the frame rate while the host reports a hot device.
    pub thermal_throttling: bool,
    /// Frame rate used while thermally throttled.
    pub thermal_throttle_fps: f64,
    /// Run every eligible one-shot task in the same frame. When disabled at
    /// most one non-urgent one-shot task runs per frame.
    pub task_coalescing: bool,
    /// How many frames a one-shot task may be deferred before it is dropped.
    pub max_deferred_frames: u32,
    /// Frame-rate step applied by the adaptive controller per evaluation.
    pub adaptive_step_fps: f64,
    /// Accepted frames between adaptive evaluations. Capped at
    /// [`HISTORY_LEN`], the size of the utilization window it averages.
    pub adaptive_interval_frames: u32,
    /// Master switch. A disabled scheduler never starts.
    pub enabled: bool,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            min_fps: 24.0,
            frame_budget_ms: None,
            adaptive_frame_rate: true,
            battery_saver: false,
            battery_saver_fps: 30.0,
            low_battery_threshold: 0.2,
            thermal_throttling: false,
            thermal_throttle_fps: 30.0,
            task_coalescing: true,
            max_deferred_frames: 3,
            adaptive_step_fps: 5.0,
            adaptive_interval_frames: 30,
            enabled: true,
        }
    }
}

/// A partial update to [`PacerConfig`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    /// New [`PacerConfig::target_fps`].
    pub target_fps: Option<f64>,
    /// New [`PacerConfig::min_fps`].
    pub min_fps: Option<f64>,
    /// `Some(None)` clears an overridden budget.
    pub frame_budget_ms: Option<Option<f64>>,
    /// Turn adaptive frame-rate control on or off.
    pub adaptive_frame_rate: Option<bool>,
    /// Turn the battery saver on or off.
    pub battery_saver: Option<bool>,
    /// New [`PacerConfig::battery_saver_fps`].
    pub battery_saver_fps: Option<f64>,
    /// New [`PacerConfig::low_battery_threshold`].
    pub low_battery_threshold: Option<f64>,
    /// Turn thermal throttling on or off.
    pub thermal_throttling: Option<bool>,
    /// New [`PacerConfig::thermal_throttle_fps`].
    pub thermal_throttle_fps: Option<f64>,
    /// Turn one-shot coalescing on or off.
    pub task_coalescing: Option<bool>,
    /// New [`PacerConfig::max_deferred_frames`].
    pub max_deferred_frames: Option<u32>,
    /// New [`PacerConfig::adaptive_step_fps`].
    pub adaptive_step_fps: Option<f64>,
    /// New [`PacerConfig::adaptive_interval_frames`].
    pub adaptive_interval_frames: Option<u32>,
    /// Enable or disable the scheduler. Disabling stops a running loop.
    pub enabled: Option<bool>,
}

impl PacerConfig {
    /// Returns a new config with `patch` applied and every value normalized.
    #[must_use]
    pub fn apply(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.target_fps {
            next.target_fps = v;
        }
        if let Some(v) = patch.min_fps {
            next.min_fps = v;
        }
        if let Some(v) = patch.frame_budget_ms {
            next.frame_budget_ms = v;
        }
        if let Some(v) = patch.adaptive_frame_rate {
            next.adaptive_frame_rate = v;
        }
        if let Some(v) = patch.battery_saver {
            next.battery_saver = v;
        }
        if let Some(v) = patch.battery_saver_fps {
            next.battery_saver_fps = v;
        }
        if let Some(v) = patch.low_battery_threshold {
            next.low_battery_threshold = v;
        }
        if let Some(v) = patch.thermal_throttling {
            next.thermal_throttling = v;
        }
        if let Some(v) = patch.thermal_throttle_fps {
            next.thermal_throttle_fps = v;
        }
        if let Some(v) = patch.task_coalescing {
            next.task_coalescing = v;
        }
        if let Some(v) = patch.max_deferred_frames {
            next.max_deferred_frames = v;
        }
        if let Some(v) = patch.adaptive_step_fps {
            next.adaptive_step_fps = v;
        }
        if let Some(v) = patch.adaptive_interval_frames {
            next.adaptive_interval_frames = v;
        }
        if let Some(v) = patch.enabled {
            next.enabled = v;
        }
        next.normalized()
    }

    /// Clamps every field into its valid range.
    ///
    /// `min_fps` wins over `target_fps`: a target below the floor is raised
    /// to the floor.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        self.min_fps = finite_or(self.min_fps, defaults.min_fps).clamp(FLOOR_FPS, MAX_FPS);
        self.target_fps = finite_or(self.target_fps, defaults.target_fps).clamp(self.min_fps, MAX_FPS);
        self.battery_saver_fps =
            finite_or(self.battery_saver_fps, defaults.battery_saver_fps).clamp(self.min_fps, MAX_FPS);
        self.thermal_throttle_fps = finite_or(self.thermal_throttle_fps, defaults.thermal_throttle_fps)
            .clamp(self.min_fps, MAX_FPS);
        self.low_battery_threshold =
            finite_or(self.low_battery_threshold, defaults.low_battery_threshold).clamp(0.0, 1.0);
        self.adaptive_step_fps =
            finite_or(self.adaptive_step_fps, defaults.adaptive_step_fps).clamp(FLOOR_FPS, MAX_FPS);
        let max_interval = u32::try_from(HISTORY_LEN).unwrap_or(u32::MAX);
        self.adaptive_interval_frames = self.adaptive_interval_frames.clamp(1, max_interval);
        self.frame_budget_ms = self
            .frame_budget_ms
            .filter(|ms| ms.is_finite() && *ms > 0.0);
        self
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::PacerError::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PacerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/frame-pacer/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("frame-pacer").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("frame-pacer")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/frame-pacer-config/config.toml")
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
