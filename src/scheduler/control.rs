//! Cross-context control channel.
//!
//! Task callbacks cannot borrow the scheduler that is running them, and
//! battery/thermal listeners may fire on another thread. Both talk to the
//! scheduler through a [`SchedulerHandle`]; the scheduler drains the queued
//! [`ControlMessage`]s on its own thread at the start of every tick.

use tokio::sync::mpsc;

use crate::error::{PacerError, Result};
use crate::scheduler::throttle::BatteryStatus;

/// A request marshalled onto the scheduler's thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Remove a recurring task.
    Unschedule(String),
    /// Enable a recurring task.
    Enable(String),
    /// Disable a recurring task.
    Disable(String),
    /// New battery reading from the host.
    Battery(BatteryStatus),
    /// Host thermal state changed; `true` means hot.
    Thermal(bool),
}

/// Cloneable, `Send` sender for [`ControlMessage`]s.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl SchedulerHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<ControlMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a raw control message.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Channel`] when the scheduler has been dropped.
    pub fn send(&self, message: ControlMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|e| PacerError::Channel(format!("scheduler is gone: {e}")))
    }

    /// Queues removal of a recurring task.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Channel`] when the scheduler has been dropped.
    pub fn unschedule(&self, id: impl Into<String>) -> Result<()> {
        self.send(ControlMessage::Unschedule(id.into()))
    }

    /// Queues enabling a recurring task.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Channel`] when the scheduler has been dropped.
    pub fn enable(&self, id: impl Into<String>) -> Result<()> {
        self.send(ControlMessage::Enable(id.into()))
    }

    /// Queues disabling a recurring task.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Channel`] when the scheduler has been dropped.
    pub fn disable(&self, id: impl Into<String>) -> Result<()> {
        self.send(ControlMessage::Disable(id.into()))
    }

    /// Forwards a battery reading.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Channel`] when the scheduler has been dropped.
    pub fn report_battery(&self, status: BatteryStatus) -> Result<()> {
        self.send(ControlMessage::Battery(status))
    }

    /// Forwards the host's thermal state.
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::Channel`] when the scheduler has been dropped.
    pub fn report_thermal(&self, hot: bool) -> Result<()> {
        self.send(ControlMessage::Thermal(hot))
    }
}
