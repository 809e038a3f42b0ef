//! Frame loop driver.
//!
//! [`FrameScheduler`] owns every piece of per-frame state and sequences it
//! through one host notification at a time:
//!
//! ```text
//! tick ─► drain control messages ─► too soon? ─yes─► skip, re-request
//!                                       │no
//!                                       ▼
//!        reset budget ─► build FrameInfo ─► one-shots ─► recurring tasks
//!                                       │
//!                                       ▼
//!        record fps/utilization ─► adaptive controller ─► re-request
//! ```
//!
//! The loop moves between three states. `start` and `resume` request a tick;
//! `pause` and `stop` cancel the outstanding one.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::clock::{TickHandle, TickSource};
use crate::config::{ConfigPatch, PacerConfig};
use crate::scheduler::adaptive::AdaptiveRateController;
use crate::scheduler::admission::run_recurring;
use crate::scheduler::budget::{BudgetAccountant, frame_interval_ms};
use crate::scheduler::control::{ControlMessage, SchedulerHandle};
use crate::scheduler::frame::{FrameInfo, FramePhase, OneShotCallback, TaskCallback};
use crate::scheduler::metrics::{Metrics, MetricsRecorder, RuntimeState};
use crate::scheduler::oneshot::OneShotQueue;
use crate::scheduler::priority::Priority;
use crate::scheduler::registry::{TaskInfo, TaskRegistry};
use crate::scheduler::throttle::{BatteryMonitor, ThrottleState, effective_fps};

/// A tick arriving sooner than this fraction of the frame interval is skipped.
pub const EARLY_TICK_RATIO: f64 = 0.9;

/// A frame whose delta exceeds this multiple of the budget counts as dropped.
pub const DROPPED_FRAME_RATIO: f64 = 1.5;

/// Lifecycle state of the frame loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Not started, or stopped. Loop-scoped state is reset.
    #[default]
    Stopped,
    /// Requesting and processing ticks.
    Running,
    /// Started but not ticking; tasks and counters are kept.
    Paused,
}

/// Adaptive, priority-aware frame scheduler.
///
/// All mutation goes through `&mut self` on a single thread. Code that
/// cannot borrow the scheduler (task callbacks, host listeners) talks to it
/// through [`handle`](Self::handle).
pub struct FrameScheduler {
    config: PacerConfig,
    clock: Box<dyn TickSource>,
    registry: TaskRegistry,
    budget: BudgetAccountant,
    one_shots: OneShotQueue,
    adaptive: AdaptiveRateController,
    throttle: ThrottleState,
    metrics: MetricsRecorder,
    loop_state: LoopState,
    pending_tick: Option<TickHandle>,
    last_frame_ms: Option<f64>,
    frame_number: u64,
    loop_dropped_frames: u64,
    current_fps: f64,
    last_utilization: f64,
    frame_info: Option<FrameInfo>,
    handle: SchedulerHandle,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    battery: Option<Box<dyn BatteryMonitor>>,
    battery_subscribed: bool,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("config", &self.config)
            .field("loop_state", &self.loop_state)
            .field("frame_number", &self.frame_number)
            .field("tasks", &self.registry.len())
            .field("one_shots", &self.one_shots.len())
            .field("battery_subscribed", &self.battery_subscribed)
            .finish_non_exhaustive()
    }
}

impl FrameScheduler {
    /// Create a stopped scheduler driven by `clock`.
    ///
    /// `config` is normalized before use.
    pub fn new(config: PacerConfig, clock: impl TickSource + 'static) -> Self {
        let config = config.normalized();
        let (handle, control_rx) = SchedulerHandle::channel();
        let mut budget = BudgetAccountant::default();
        budget.reset(config.frame_budget_ms.unwrap_or(frame_interval_ms(config.target_fps)));

        Self {
            adaptive: AdaptiveRateController::new(&config),
            config,
            clock: Box::new(clock),
            registry: TaskRegistry::default(),
            budget,
            one_shots: OneShotQueue::default(),
            throttle: ThrottleState::default(),
            metrics: MetricsRecorder::default(),
            loop_state: LoopState::Stopped,
            pending_tick: None,
            last_frame_ms: None,
            frame_number: 0,
            loop_dropped_frames: 0,
            current_fps: 0.0,
            last_utilization: 0.0,
            frame_info: None,
            handle,
            control_rx,
            battery: None,
            battery_subscribed: false,
        }
    }

    /// Attach a host battery capability used while `battery_saver` is on.
    #[must_use]
    pub fn with_battery_monitor(mut self, monitor: Box<dyn BatteryMonitor>) -> Self {
        self.battery = Some(monitor);
        self
    }

    /// A cloneable sender for cross-context control messages.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    // -- tasks --------------------------------------------------------------

    /// Register a recurring task, replacing any task with the same id.
    ///
    /// `max_skip_frames` defaults to the priority's table value.
    pub fn schedule_task(
        &mut self,
        id: impl Into<String>,
        callback: TaskCallback,
        priority: Priority,
        max_skip_frames: Option<u32>,
    ) {
        let id = id.into();
        let replaced = self
            .registry
            .insert(id.clone(), callback, priority, max_skip_frames);
        debug!(task_id = %id, %priority, replaced, "task scheduled");
    }

    /// Remove a recurring task. Unknown ids are ignored.
    pub fn unschedule_task(&mut self, id: &str) {
        if self.registry.remove(id) {
            debug!(task_id = %id, "task unscheduled");
        }
    }

    /// Enable a recurring task. Unknown ids are ignored.
    pub fn enable_task(&mut self, id: &str) {
        self.registry.set_enabled(id, true);
    }

    /// Disable a recurring task. Unknown ids are ignored.
    pub fn disable_task(&mut self, id: &str) {
        self.registry.set_enabled(id, false);
    }

    /// Bookkeeping for one task.
    pub fn task_info(&self, id: &str) -> Option<TaskInfo> {
        self.registry.info(id)
    }

    /// Bookkeeping for every task, in registration order.
    pub fn task_infos(&self) -> Vec<TaskInfo> {
        self.registry.infos()
    }

    /// Queue a callback to run once on an upcoming frame.
    pub fn run_once(&mut self, callback: OneShotCallback, priority: Priority) {
        self.one_shots.push(callback, priority);
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start the loop. No-op when running or when the config is disabled;
    /// resumes when paused.
    pub fn start(&mut self) {
        match self.loop_state {
            LoopState::Running => return,
            LoopState::Paused => {
                self.resume();
                return;
            }
            LoopState::Stopped => {}
        }
        if !self.config.enabled {
            debug!("frame scheduler disabled; start ignored");
            return;
        }

        self.loop_state = LoopState::Running;
        self.last_frame_ms = Some(self.clock.now_ms());
        self.subscribe_battery();
        self.request_tick();
        info!(
            target_fps = self.effective_fps(),
            tasks = self.registry.len(),
            "frame scheduler started"
        );
    }

    /// Stop the loop and reset loop-scoped state. Cumulative metrics survive.
    pub fn stop(&mut self) {
        if self.loop_state == LoopState::Stopped {
            return;
        }
        self.cancel_pending_tick();
        self.unsubscribe_battery();

        self.loop_state = LoopState::Stopped;
        self.last_frame_ms = None;
        self.frame_number = 0;
        self.loop_dropped_frames = 0;
        self.current_fps = 0.0;
        self.last_utilization = 0.0;
        self.frame_info = None;
        self.adaptive.reset(&self.config);
        info!(total_frames = self.metrics.total_frames, "frame scheduler stopped");
    }

    /// Suspend ticking. Tasks, counters and subscriptions are kept.
    pub fn pause(&mut self) {
        if self.loop_state != LoopState::Running {
            return;
        }
        self.cancel_pending_tick();
        self.loop_state = LoopState::Paused;
        info!(frame = self.frame_number, "frame scheduler paused");
    }

    /// Continue after [`pause`](Self::pause).
    ///
    /// The last-frame reference is moved to now so the paused interval is
    /// not measured as one long frame.
    pub fn resume(&mut self) {
        if self.loop_state != LoopState::Paused {
            return;
        }
        self.loop_state = LoopState::Running;
        self.last_frame_ms = Some(self.clock.now_ms());
        self.request_tick();
        info!(frame = self.frame_number, "frame scheduler resumed");
    }

    /// Handle one host tick notification.
    ///
    /// Returns the frame's [`FrameInfo`] when the tick was accepted, `None`
    /// when it was ignored or skipped as too early.
    pub fn tick(&mut self) -> Option<FrameInfo> {
        if self.loop_state != LoopState::Running || self.pending_tick.take().is_none() {
            return None;
        }
        self.process_control_messages();

        let fps = self.effective_fps();
        let interval_ms = frame_interval_ms(fps);
        let now = self.clock.now_ms();
        let delta_ms = (now - self.last_frame_ms.unwrap_or(now)).max(0.0);

        if delta_ms < EARLY_TICK_RATIO * interval_ms {
            self.metrics.skipped_ticks += 1;
            trace!(delta_ms, interval_ms, "tick arrived early; skipped");
            self.request_tick();
            return None;
        }

        self.last_frame_ms = Some(now);
        self.frame_number += 1;
        self.metrics.total_frames += 1;

        let budget_ms = self.config.frame_budget_ms.unwrap_or(interval_ms);
        let is_dropped_frame = delta_ms > DROPPED_FRAME_RATIO * budget_ms;
        if is_dropped_frame {
            self.metrics.dropped_frames += 1;
            self.loop_dropped_frames += 1;
            debug!(frame = self.frame_number, delta_ms, budget_ms, "dropped frame");
        }
        self.budget.reset(budget_ms);

        let frame = FrameInfo {
            frame_number: self.frame_number,
            delta_time_ms: delta_ms,
            timestamp_ms: now,
            phase: FramePhase::Animation,
            budget_ms,
            budget_remaining_ms: self.budget.remaining_ms(),
            is_dropped_frame,
        };
        self.frame_info = Some(frame);

        let one_shots =
            self.one_shots
                .drain(self.clock.as_ref(), &mut self.budget, &frame, &self.config);
        let recurring = run_recurring(&mut self.registry, self.clock.as_ref(), &mut self.budget, &frame);

        self.metrics.task_executions += one_shots.executed + recurring.executed;
        self.metrics.task_failures += one_shots.failed + recurring.failed;
        self.metrics.deferred_tasks += one_shots.deferred + one_shots.expired;
        self.metrics.expired_one_shots += one_shots.expired;

        let utilization = self.budget.utilization();
        self.last_utilization = utilization;
        self.current_fps = 1000.0 / delta_ms;
        self.metrics.record_frame(self.current_fps, utilization);

        if self.config.adaptive_frame_rate
            && let Some(change) = self
                .adaptive
                .observe(&self.config, &self.metrics.budget_history)
        {
            info!(
                from_fps = change.from_fps,
                to_fps = change.to_fps,
                average_utilization = change.average_utilization,
                "adaptive frame rate changed"
            );
        }

        trace!(
            frame = frame.frame_number,
            delta_ms,
            used_ms = self.budget.used_ms(),
            remaining_ms = self.budget.remaining_ms(),
            skipped = recurring.skipped,
            "frame complete"
        );
        self.request_tick();
        Some(frame)
    }

    // -- configuration ------------------------------------------------------

    /// Set the configured target rate, clamped to `[min_fps, MAX_FPS]`.
    pub fn set_target_fps(&mut self, fps: f64) {
        self.update_config(ConfigPatch {
            target_fps: Some(fps),
            ..ConfigPatch::default()
        });
    }

    /// Merge `patch` into the config and re-derive dependent state.
    pub fn update_config(&mut self, patch: ConfigPatch) {
        let before = self.effective_fps();
        let saver_was_on = self.config.battery_saver;
        self.config = self.config.apply(&patch);

        if self.config.battery_saver && !saver_was_on {
            // Readings queued while the saver was off are stale.
            self.process_control_messages();
            self.throttle.battery = None;
        }

        if self.config.adaptive_frame_rate {
            self.adaptive.clamp_to(&self.config);
        } else {
            self.adaptive.reset(&self.config);
        }

        if self.loop_state != LoopState::Stopped {
            if !self.config.enabled {
                info!("frame scheduler disabled by config update");
                self.stop();
            } else if self.config.battery_saver {
                self.subscribe_battery();
            } else {
                self.unsubscribe_battery();
            }
        }
        self.log_fps_change(before, "config update");
    }

    /// Report the host's thermal state; `true` means hot.
    pub fn set_thermal_state(&mut self, hot: bool) {
        let before = self.effective_fps();
        self.throttle.thermal_hot = hot;
        self.log_fps_change(before, "thermal state");
    }

    /// Apply every queued [`ControlMessage`]. Also runs at the start of each
    /// tick.
    pub fn process_control_messages(&mut self) {
        let before = self.effective_fps();
        while let Ok(message) = self.control_rx.try_recv() {
            match message {
                ControlMessage::Unschedule(id) => self.unschedule_task(&id),
                ControlMessage::Enable(id) => self.enable_task(&id),
                ControlMessage::Disable(id) => self.disable_task(&id),
                ControlMessage::Battery(status) => self.throttle.battery = Some(status),
                ControlMessage::Thermal(hot) => self.throttle.thermal_hot = hot,
            }
        }
        self.log_fps_change(before, "throttle signal");
    }

    // -- snapshots ----------------------------------------------------------

    /// The current normalized configuration.
    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Target rate after adaptive and throttle clamps.
    pub fn effective_fps(&self) -> f64 {
        effective_fps(&self.config, self.adaptive.level_fps(), &self.throttle)
    }

    /// The loop's lifecycle state.
    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// The last accepted frame, if the loop has produced one since starting.
    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.frame_info
    }

    /// Snapshot of the loop's live state.
    pub fn state(&self) -> RuntimeState {
        RuntimeState {
            is_running: self.loop_state == LoopState::Running,
            is_paused: self.loop_state == LoopState::Paused,
            current_fps: self.current_fps,
            target_fps: self.effective_fps(),
            dropped_frames: self.loop_dropped_frames,
            active_task_count: self.registry.len(),
            pending_task_count: self.one_shots.len(),
            budget_utilization: self.last_utilization,
        }
    }

    /// Snapshot of the cumulative metrics.
    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    // -- internals ----------------------------------------------------------

    fn request_tick(&mut self) {
        self.cancel_pending_tick();
        self.pending_tick = Some(self.clock.request_tick());
    }

    fn cancel_pending_tick(&mut self) {
        if let Some(handle) = self.pending_tick.take() {
            self.clock.cancel_tick(handle);
        }
    }

    fn subscribe_battery(&mut self) {
        if !self.config.battery_saver || self.battery_subscribed {
            return;
        }
        let Some(monitor) = self.battery.as_mut() else {
            debug!("battery saver enabled without a battery monitor");
            return;
        };

        match monitor.status() {
            Ok(status) => self.throttle.battery = Some(status),
            Err(e) => warn!("battery status unavailable: {e}"),
        }
        match monitor.subscribe(self.handle.clone()) {
            Ok(()) => {
                self.battery_subscribed = true;
                debug!("subscribed to battery updates");
            }
            Err(e) => warn!("battery subscription failed: {e}"),
        }
    }

    fn unsubscribe_battery(&mut self) {
        if !self.battery_subscribed {
            return;
        }
        if let Some(monitor) = self.battery.as_mut() {
            monitor.unsubscribe();
        }
        self.battery_subscribed = false;
        self.throttle.battery = None;
        debug!("unsubscribed from battery updates");
    }

    fn log_fps_change(&self, before: f64, reason: &str) {
        let after = self.effective_fps();
        if (after - before).abs() > f64::EPSILON {
            info!(from_fps = before, to_fps = after, reason, "effective frame rate changed");
        }
    }
}
