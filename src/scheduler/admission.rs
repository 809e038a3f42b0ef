//! Per-frame admission of recurring tasks.
//!
//! Enabled tasks are visited by priority weight, stable by registration
//! order. A task runs when any of these hold:
//!
//! - its tier is Critical or High;
//! - it has been skipped `max_skip_frames` times in a row;
//! - the frame is still below the 90% admission threshold.
//!
//! Skipped tasks accumulate `frames_since_run`; that counter is what forces
//! low tiers through once their skip budget is spent, so nothing starves.

use tracing::{trace, warn};

use crate::clock::TickSource;
use crate::scheduler::budget::BudgetAccountant;
use crate::scheduler::execute::execute;
use crate::scheduler::frame::FrameInfo;
use crate::scheduler::registry::TaskRegistry;

/// What one admission pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AdmissionReport {
    pub(crate) executed: u64,
    pub(crate) failed: u64,
    pub(crate) skipped: u64,
}

/// Runs this frame's recurring tasks.
pub(crate) fn run_recurring(
    registry: &mut TaskRegistry,
    clock: &dyn TickSource,
    budget: &mut BudgetAccountant,
    frame: &FrameInfo,
) -> AdmissionReport {
    let mut report = AdmissionReport::default();

    for index in registry.admission_order() {
        let Some(task) = registry.get_mut(index) else {
            continue;
        };

        let admitted =
            task.priority.is_budget_exempt() || task.is_forced() || budget.admits_optional();
        if !admitted {
            task.mark_skipped();
            report.skipped += 1;
            trace!(
                task_id = %task.id,
                frames_since_run = task.frames_since_run,
                "task skipped under budget pressure"
            );
            continue;
        }

        let callback = &mut task.callback;
        let run = execute(clock, || callback(frame.delta_time_ms, frame));
        budget.charge(run.elapsed_ms);
        report.executed += 1;

        let error = match run.result {
            Ok(()) => None,
            Err(e) => {
                warn!(task_id = %task.id, frame = frame.frame_number, "scheduled task failed: {e}");
                report.failed += 1;
                Some(e.to_string())
            }
        };
        task.mark_run(frame.frame_number, run.elapsed_ms, error);
    }

    report
}
