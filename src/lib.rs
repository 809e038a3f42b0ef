//! frame-pacer: adaptive priority frame scheduler.
//!
//! Hosts register per-frame callbacks under a priority tier. Each frame the
//! scheduler measures how much of its time budget the callbacks consume and
//! sheds low-priority work before it would cause a dropped frame.
//!
//! # Architecture
//!
//! - **Clock**: a [`TickSource`] supplies time and next-frame notifications
//! - **Registry**: recurring tasks keyed by id, with skip budgets
//! - **Budget**: per-frame accounting with 80% / 90% thresholds
//! - **Admission**: priority-ordered execution with starvation protection
//! - **One-shots**: run-once tasks, deferred under pressure
//! - **Adaptive rate**: steps the frame rate down under sustained load
//! - **Throttles**: battery and thermal clamps on the effective rate
//! - **Driver**: the `Stopped` / `Running` / `Paused` frame loop
//!
//! ```ignore
//! let clock = ManualTickSource::new(0.0);
//! let mut scheduler = FrameScheduler::new(PacerConfig::default(), clock.clone());
//! scheduler.schedule_task("blink", Box::new(|_, _| Ok(())), Priority::Normal, None);
//! scheduler.start();
//! clock.advance(16.7);
//! scheduler.tick();
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod scheduler;

pub use clock::{IntervalTickSource, ManualTickSource, TickHandle, TickSource};
pub use config::{ConfigPatch, PacerConfig};
pub use error::{PacerError, Result, TaskError, TaskResult};
pub use scheduler::{
    BatteryMonitor, BatteryStatus, FrameInfo, FrameScheduler, LoopState, Metrics, Priority,
    RuntimeState, SchedulerHandle, TaskInfo,
};
