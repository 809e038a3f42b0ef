//! FIFO queue of run-once tasks.
//!
//! The queue is drained at the start of every accepted frame, before the
//! recurring tasks. Critical and High tasks always run. Anything lower runs
//! only while the frame is under the 80% deferral threshold; otherwise it is
//! pushed to the next frame, and dropped once it has been deferred more than
//! `max_deferred_frames` times.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::clock::TickSource;
use crate::config::PacerConfig;
use crate::scheduler::budget::BudgetAccountant;
use crate::scheduler::execute::execute;
use crate::scheduler::frame::{FrameInfo, OneShotCallback};
use crate::scheduler::priority::Priority;

struct OneShotTask {
    callback: OneShotCallback,
    priority: Priority,
    deferrals: u32,
}

/// What one drain of the queue did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct OneShotReport {
    pub(crate) executed: u64,
    pub(crate) failed: u64,
    pub(crate) deferred: u64,
    pub(crate) expired: u64,
}

#[derive(Default)]
pub(crate) struct OneShotQueue {
    queue: VecDeque<OneShotTask>,
}

impl std::fmt::Debug for OneShotQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneShotQueue")
            .field("len", &self.queue.len())
            .finish()
    }
}

impl OneShotQueue {
    pub(crate) fn push(&mut self, callback: OneShotCallback, priority: Priority) {
        self.queue.push_back(OneShotTask {
            callback,
            priority,
            deferrals: 0,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Runs or defers every queued task for this frame.
    pub(crate) fn drain(
        &mut self,
        clock: &dyn TickSource,
        budget: &mut BudgetAccountant,
        frame: &FrameInfo,
        config: &PacerConfig,
    ) -> OneShotReport {
        let mut report = OneShotReport::default();
        let mut carry = VecDeque::new();
        let mut optional_ran = 0_usize;

        for mut task in std::mem::take(&mut self.queue) {
            if !task.priority.is_budget_exempt() {
                if budget.should_defer() {
                    task.deferrals += 1;
                    if task.deferrals > config.max_deferred_frames {
                        debug!(
                            priority = %task.priority,
                            deferrals = task.deferrals,
                            "dropping one-shot task after repeated deferral"
                        );
                        report.expired += 1;
                    } else {
                        report.deferred += 1;
                        carry.push_back(task);
                    }
                    continue;
                }
                if !config.task_coalescing && optional_ran > 0 {
                    carry.push_back(task);
                    continue;
                }
                optional_ran += 1;
            }

            let OneShotTask {
                callback, priority, ..
            } = task;
            let run = execute(clock, || callback(frame));
            budget.charge(run.elapsed_ms);
            report.executed += 1;
            if let Err(e) = run.result {
                warn!(%priority, frame = frame.frame_number, "one-shot task failed: {e}");
                report.failed += 1;
            }
        }

        self.queue = carry;
        report
    }
}
