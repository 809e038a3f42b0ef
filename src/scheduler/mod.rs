//! Adaptive priority frame scheduler.
//!
//! Recurring tasks are registered with a [`Priority`] and run once per
//! accepted frame, subject to a per-frame time budget. One-shot tasks run on
//! an upcoming frame. The effective frame rate adapts to sustained load and
//! to battery/thermal throttle signals.

mod adaptive;
mod admission;
mod budget;
mod control;
mod driver;
mod execute;
mod frame;
mod interval;
mod metrics;
mod oneshot;
mod priority;
mod registry;
mod throttle;

pub use adaptive::{OVERLOAD_THRESHOLD, UNDERLOAD_THRESHOLD};
pub use budget::{ADMISSION_THRESHOLD, DEFER_THRESHOLD};
pub use control::{ControlMessage, SchedulerHandle};
pub use driver::{DROPPED_FRAME_RATIO, EARLY_TICK_RATIO, FrameScheduler, LoopState};
pub use frame::{FrameInfo, FramePhase, OneShotCallback, TaskCallback};
pub use interval::run_interval_loop;
pub use metrics::{HISTORY_LEN, Metrics, RuntimeState};
pub use priority::Priority;
pub use registry::TaskInfo;
pub use throttle::{BatteryMonitor, BatteryStatus, SimulatedBattery};
