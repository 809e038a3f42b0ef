//! Measured, failure-isolated callback invocation.
//!
//! Every callback (recurring or one-shot) goes through [`execute`], which
//! turns both returned errors and panics into a typed [`TaskResult`] and
//! measures the cost on the scheduler's own clock.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::clock::TickSource;
use crate::error::{TaskError, TaskResult};

/// Result and measured cost of one callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Execution {
    pub(crate) result: TaskResult,
    pub(crate) elapsed_ms: f64,
}

/// Runs `f`, catching panics, and measures its cost on `clock`.
pub(crate) fn execute(clock: &dyn TickSource, f: impl FnOnce() -> TaskResult) -> Execution {
    let started = clock.now_ms();
    let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    };
    let elapsed_ms = (clock.now_ms() - started).max(0.0);
    Execution { result, elapsed_ms }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
