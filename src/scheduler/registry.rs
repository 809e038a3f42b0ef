//! Task registry: id → recurring task record.
//!
//! Records are kept in registration order so that the admission pass can use
//! a stable sort and tasks of equal priority run in the order they were
//! first scheduled. Replacing a task keeps its original position.

use serde::{Deserialize, Serialize};

use crate::scheduler::frame::TaskCallback;
use crate::scheduler::priority::Priority;

/// Smoothing factor for the run-time moving average.
const RUN_TIME_EMA_ALPHA: f64 = 0.2;

/// Exponential moving average tracker.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Ema {
    value: f64,
    initialized: bool,
}

impl Ema {
    pub(crate) fn update(&mut self, sample: f64, alpha: f64) {
        if self.initialized {
            self.value = alpha * sample + (1.0 - alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
    }

    pub(crate) const fn get(&self) -> f64 {
        self.value
    }
}

/// A recurring task owned by the registry.
pub(crate) struct TaskRecord {
    pub(crate) id: String,
    pub(crate) priority: Priority,
    pub(crate) max_skip_frames: u32,
    pub(crate) enabled: bool,
    pub(crate) frames_since_run: u32,
    pub(crate) run_time: Ema,
    pub(crate) run_count: u64,
    pub(crate) failure_count: u64,
    pub(crate) last_error: Option<String>,
    pub(crate) last_run_frame: Option<u64>,
    pub(crate) callback: TaskCallback,
}

impl std::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("max_skip_frames", &self.max_skip_frames)
            .field("enabled", &self.enabled)
            .field("frames_since_run", &self.frames_since_run)
            .field("run_count", &self.run_count)
            .finish_non_exhaustive()
    }
}

impl TaskRecord {
    fn new(
        id: String,
        callback: TaskCallback,
        priority: Priority,
        max_skip_frames: Option<u32>,
    ) -> Self {
        Self {
            id,
            priority,
            max_skip_frames: max_skip_frames.unwrap_or(priority.default_max_skip_frames()),
            enabled: true,
            frames_since_run: 0,
            run_time: Ema::default(),
            run_count: 0,
            failure_count: 0,
            last_error: None,
            last_run_frame: None,
            callback,
        }
    }

    /// Whether the skip budget is exhausted and the task must run now.
    pub(crate) fn is_forced(&self) -> bool {
        self.frames_since_run >= self.max_skip_frames
    }

    /// Records a run, successful or not.
    pub(crate) fn mark_run(&mut self, frame_number: u64, elapsed_ms: f64, error: Option<String>) {
        self.frames_since_run = 0;
        self.run_time.update(elapsed_ms, RUN_TIME_EMA_ALPHA);
        self.run_count += 1;
        self.last_run_frame = Some(frame_number);
        if let Some(err) = error {
            self.failure_count += 1;
            self.last_error = Some(err);
        }
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.frames_since_run = self.frames_since_run.saturating_add(1);
    }

    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id.clone(),
            priority: self.priority,
            max_skip_frames: self.max_skip_frames,
            enabled: self.enabled,
            frames_since_run: self.frames_since_run,
            average_run_time_ms: self.run_time.get(),
            run_count: self.run_count,
            failure_count: self.failure_count,
            last_error: self.last_error.clone(),
            last_run_frame: self.last_run_frame,
        }
    }
}

/// Read-only copy of a task's bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Caller-supplied identifier.
    pub id: String,
    /// Priority tier.
    pub priority: Priority,
    /// Consecutive frames the task may be skipped.
    pub max_skip_frames: u32,
    /// Whether the task takes part in admission.
    pub enabled: bool,
    /// Accepted frames since the task last ran.
    pub frames_since_run: u32,
    /// Moving average of the measured run time.
    pub average_run_time_ms: f64,
    /// Number of times the callback has been invoked.
    pub run_count: u64,
    /// Number of invocations that returned an error or panicked.
    pub failure_count: u64,
    /// Most recent failure message.
    pub last_error: Option<String>,
    /// Frame number of the most recent run.
    pub last_run_frame: Option<u64>,
}

/// Ordered collection of recurring tasks.
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: Vec<TaskRecord>,
}

impl TaskRegistry {
    /// Inserts a task, replacing any task with the same id in place.
    ///
    /// Returns `true` when an existing task was replaced.
    pub(crate) fn insert(
        &mut self,
        id: String,
        callback: TaskCallback,
        priority: Priority,
        max_skip_frames: Option<u32>,
    ) -> bool {
        let record = TaskRecord::new(id, callback, priority, max_skip_frames);
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == record.id) {
            *existing = record;
            true
        } else {
            self.tasks.push(record);
            false
        }
    }

    /// Removes a task. Returns `true` when found.
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Enables or disables a task by ID. Returns `true` when found.
    pub(crate) fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.enabled = enabled;
            return true;
        }
        false
    }

    pub(crate) fn info(&self, id: &str) -> Option<TaskInfo> {
        self.tasks.iter().find(|t| t.id == id).map(TaskRecord::info)
    }

    pub(crate) fn infos(&self) -> Vec<TaskInfo> {
        self.tasks.iter().map(TaskRecord::info).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Indices of enabled tasks in admission order: by priority weight,
    /// then registration order.
    pub(crate) fn admission_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.enabled)
            .map(|(i, _)| i)
            .collect();
        order.sort_by_key(|&i| self.tasks[i].priority.weight());
        order
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TaskRecord> {
        self.tasks.get_mut(index)
    }
}
