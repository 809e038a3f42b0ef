//! Error types for the frame pacer.

/// Top-level error type for the frame pacer.
#[derive(Debug, thiserror::Error)]
pub enum PacerError {
    /// Configuration load, parse, or serialization error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An optional host capability (battery, thermal) is unavailable.
    #[error("capability unavailable: {0}")]
    Capability(String),

    /// Control channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PacerError>;

/// Failure reported by a task callback.
///
/// Callbacks return this through [`TaskResult`]; a panicking callback is
/// converted into [`TaskError::Panicked`] by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The callback reported a failure.
    #[error("task failed: {0}")]
    Failed(String),

    /// The callback panicked; the payload message is captured when possible.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Shorthand for [`TaskError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Outcome of one task callback invocation.
pub type TaskResult = std::result::Result<(), TaskError>;
