//! Clock and tick sources.
//!
//! The scheduler never touches a global clock or display-link API. It talks
//! to a [`TickSource`], which provides a monotonic millisecond clock and a
//! "notify me before the next frame" request that can be cancelled.
//!
//! Two sources ship with the crate:
//!
//! - [`ManualTickSource`]: time only moves when the owner says so. Used by
//!   tests and the simulation harness; task callbacks may hold a clone and
//!   advance the clock to model their own execution cost.
//! - [`IntervalTickSource`]: fixed-interval pacing on top of
//!   `tokio::time`, for native hosts without a display link. Drive it with
//!   [`run_interval_loop`](crate::scheduler::run_interval_loop).

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;

/// Identifies one outstanding tick request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// Host clock plus next-frame notification primitive.
pub trait TickSource {
    /// Monotonic time in milliseconds.
    fn now_ms(&self) -> f64;

    /// Asks the host to deliver one tick before the next frame.
    fn request_tick(&mut self) -> TickHandle;

    /// Withdraws a previously requested tick. Unknown handles are ignored.
    fn cancel_tick(&mut self, handle: TickHandle);
}

// ---------------------------------------------------------------------------
// Manual source
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ManualInner {
    now_ms: Cell<f64>,
    next_handle: Cell<u64>,
    pending: Cell<Option<TickHandle>>,
    requests: Cell<u64>,
}

/// Deterministic tick source whose time only moves on [`advance`](Self::advance).
///
/// Clones share the same clock.
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    inner: Rc<ManualInner>,
}

impl ManualTickSource {
    /// Creates a source whose clock starts at `start_ms`.
    pub fn new(start_ms: f64) -> Self {
        let source = Self::default();
        source.inner.now_ms.set(start_ms);
        source
    }

    /// Moves the clock forward by `ms`. Negative values are ignored.
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.inner.now_ms.set(self.inner.now_ms.get() + ms);
        }
    }

    /// The outstanding tick request, if any.
    pub fn pending(&self) -> Option<TickHandle> {
        self.inner.pending.get()
    }

    /// Total number of tick requests made so far.
    pub fn request_count(&self) -> u64 {
        self.inner.requests.get()
    }
}

impl TickSource for ManualTickSource {
    fn now_ms(&self) -> f64 {
        self.inner.now_ms.get()
    }

    fn request_tick(&mut self) -> TickHandle {
        let id = self.inner.next_handle.get() + 1;
        self.inner.next_handle.set(id);
        self.inner.requests.set(self.inner.requests.get() + 1);
        let handle = TickHandle(id);
        self.inner.pending.set(Some(handle));
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.inner.pending.get() == Some(handle) {
            self.inner.pending.set(None);
        }
    }
}

// ---------------------------------------------------------------------------
// Interval source
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct IntervalInner {
    origin: Instant,
    interval: Cell<Duration>,
    deadline: Cell<Option<Instant>>,
    next_handle: Cell<u64>,
    pending: Cell<Option<TickHandle>>,
}

/// Fixed-interval tick source backed by `tokio::time`.
///
/// Deadlines sit on a fixed grid: each request lands one interval after the
/// previous deadline, not after the time of the request. A cancelled
/// request restarts the grid from the current time.
///
/// Clones share state: hand one clone to the scheduler and keep one for the
/// loop that waits on [`pending_deadline`](Self::pending_deadline).
#[derive(Debug, Clone)]
pub struct IntervalTickSource {
    inner: Rc<IntervalInner>,
}

impl IntervalTickSource {
    /// Creates a source ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Rc::new(IntervalInner {
                origin: Instant::now(),
                interval: Cell::new(interval),
                deadline: Cell::new(None),
                next_handle: Cell::new(0),
                pending: Cell::new(None),
            }),
        }
    }

    /// Creates a source pacing at `fps` frames per second.
    pub fn from_fps(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self::new(Duration::from_secs_f64(1.0 / fps))
    }

    /// Changes the pacing interval for subsequent requests.
    pub fn set_interval(&self, interval: Duration) {
        self.inner.interval.set(interval);
    }

    /// When the outstanding request fires, if one is pending.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.inner.pending.get().and(self.inner.deadline.get())
    }
}

impl TickSource for IntervalTickSource {
    fn now_ms(&self) -> f64 {
        self.inner.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn request_tick(&mut self) -> TickHandle {
        let id = self.inner.next_handle.get() + 1;
        self.inner.next_handle.set(id);
        let interval = self.inner.interval.get();
        let now = Instant::now();
        let deadline = match self.inner.deadline.get() {
            Some(previous) => next_slot(previous, interval, now),
            None => now + interval,
        };
        self.inner.deadline.set(Some(deadline));
        let handle = TickHandle(id);
        self.inner.pending.set(Some(handle));
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.inner.pending.get() == Some(handle) {
            self.inner.pending.set(None);
            self.inner.deadline.set(None);
        }
    }
}

/// First slot on the `previous + k * interval` grid that lies after `now`.
///
/// Keeps the cadence fixed while callbacks run; slots missed by an overrun
/// are skipped, like `MissedTickBehavior::Skip`.
fn next_slot(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let step = interval.as_nanos();
    if step == 0 {
        return now;
    }
    let missed = now.saturating_duration_since(previous).as_nanos() / step;
    let offset = u64::try_from(step * (missed + 1)).unwrap_or(u64::MAX);
    previous + Duration::from_nanos(offset)
}
