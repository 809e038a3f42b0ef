//! Shared helpers for integration tests.

use std::cell::Cell;
use std::rc::Rc;

use frame_pacer::scheduler::TaskCallback;
use frame_pacer::{FrameInfo, FrameScheduler, ManualTickSource, PacerConfig};

/// One frame at the default 60 fps target.
pub(crate) const FRAME_MS: f64 = 1000.0 / 60.0;

/// Build a stopped scheduler on a manual clock. Returns `(scheduler, clock)`.
pub(crate) fn manual_scheduler(config: PacerConfig) -> (FrameScheduler, ManualTickSource) {
    let clock = ManualTickSource::new(0.0);
    (FrameScheduler::new(config, clock.clone()), clock)
}

/// A recurring task that bumps `count` every time it runs.
pub(crate) fn counting_task(count: &Rc<Cell<u32>>) -> TaskCallback {
    let count = Rc::clone(count);
    Box::new(move |_, _| {
        count.set(count.get() + 1);
        Ok(())
    })
}

/// A recurring task that costs `ms` on the manual clock.
pub(crate) fn costly_task(clock: &ManualTickSource, ms: f64) -> TaskCallback {
    let clock = clock.clone();
    Box::new(move |_, _| {
        clock.advance(ms);
        Ok(())
    })
}

/// Advance the clock by `ms` and deliver one tick.
pub(crate) fn advance_and_tick(
    scheduler: &mut FrameScheduler,
    clock: &ManualTickSource,
    ms: f64,
) -> Option<FrameInfo> {
    clock.advance(ms);
    scheduler.tick()
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
