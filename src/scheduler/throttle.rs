//! Battery and thermal throttle inputs.
//!
//! Both throttles only ever pull the effective frame rate *down*. They
//! compose with the adaptive controller by taking the minimum, and the
//! result is always floored at `min_fps`:
//!
//! ```text
//! effective = clamp(min(target, adaptive?, battery_saver_fps?, thermal_throttle_fps?),
//!                   min_fps, target)
//! ```
//!
//! The battery capability is optional. A host without one, or one whose
//! monitor fails, simply never engages the battery saver.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::PacerConfig;
use crate::error::{PacerError, Result};
use crate::scheduler::control::SchedulerHandle;

/// A battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level, 0.0–1.0.
    pub level: f64,
    /// Whether the device is on external power.
    pub charging: bool,
}

impl BatteryStatus {
    /// Discharging below `threshold`.
    pub fn is_low(&self, threshold: f64) -> bool {
        !self.charging && self.level < threshold
    }
}

/// Optional host battery capability.
///
/// Implementations forward change notifications through the
/// [`SchedulerHandle`] passed to [`subscribe`](Self::subscribe); they must
/// not hold on to it after [`unsubscribe`](Self::unsubscribe).
pub trait BatteryMonitor {
    /// Current reading.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Capability`] when the host cannot report one.
    fn status(&self) -> Result<BatteryStatus>;

    /// Starts forwarding level/charging changes to `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Capability`] when subscriptions are unsupported.
    fn subscribe(&mut self, handle: SchedulerHandle) -> Result<()>;

    /// Stops forwarding changes.
    fn unsubscribe(&mut self);
}

/// Latest throttle signals, as seen on the scheduler's thread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ThrottleState {
    pub(crate) battery: Option<BatteryStatus>,
    pub(crate) thermal_hot: bool,
}

impl ThrottleState {
    pub(crate) fn battery_engaged(&self, config: &PacerConfig) -> bool {
        config.battery_saver
            && self
                .battery
                .is_some_and(|b| b.is_low(config.low_battery_threshold))
    }

    pub(crate) fn thermal_engaged(&self, config: &PacerConfig) -> bool {
        config.thermal_throttling && self.thermal_hot
    }
}

/// Composes the configured target, adaptive level, and throttles.
pub(crate) fn effective_fps(config: &PacerConfig, adaptive_level: f64, throttle: &ThrottleState) -> f64 {
    let mut fps = config.target_fps;
    if config.adaptive_frame_rate {
        fps = fps.min(adaptive_level);
    }
    if throttle.battery_engaged(config) {
        fps = fps.min(config.battery_saver_fps);
    }
    if throttle.thermal_engaged(config) {
        fps = fps.min(config.thermal_throttle_fps);
    }
    fps.max(config.min_fps).min(config.target_fps)
}

// ---------------------------------------------------------------------------
// Simulated battery
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SimulatedInner {
    status: Option<BatteryStatus>,
    subscriber: Option<SchedulerHandle>,
}

/// In-process [`BatteryMonitor`] for simulations and tests.
///
/// Clones share state; call [`set`](Self::set) on one clone after handing
/// another to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBattery {
    inner: Rc<RefCell<SimulatedInner>>,
}

impl SimulatedBattery {
    /// Creates a monitor reporting `status`.
    pub fn new(status: BatteryStatus) -> Self {
        let battery = Self::default();
        battery.inner.borrow_mut().status = Some(status);
        battery
    }

    /// Changes the reading and notifies the subscriber, if any.
    pub fn set(&self, status: BatteryStatus) {
        let mut inner = self.inner.borrow_mut();
        inner.status = Some(status);
        if let Some(handle) = &inner.subscriber {
            // The scheduler being gone just means nobody is listening.
            let _ = handle.report_battery(status);
        }
    }

    /// Whether a scheduler is currently subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.inner.borrow().subscriber.is_some()
    }
}

impl BatteryMonitor for SimulatedBattery {
    fn status(&self) -> Result<BatteryStatus> {
        self.inner
            .borrow()
            .status
            .ok_or_else(|| PacerError::Capability("no battery reading yet".to_owned()))
    }

    fn subscribe(&mut self, handle: SchedulerHandle) -> Result<()> {
        self.inner.borrow_mut().subscriber = Some(handle);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.inner.borrow_mut().subscriber = None;
    }
}
