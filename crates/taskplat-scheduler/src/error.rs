use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler has been shut down; the submitted task was dropped unrun.
    #[error("Scheduler is shut down")]
    ShutDown,

    /// The background worker stopped after a task panicked (terminate policy).
    #[error("Background worker terminated: {message}")]
    WorkerTerminated { message: String },

    /// A foreground delay was negative, NaN or infinite.
    #[error("Invalid delay: {delay} seconds")]
    InvalidDelay { delay: f64 },

    /// The OS refused to spawn the worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// `shutdown()` was called from the worker thread, which would self-join.
    #[error("Shutdown requested from the worker thread")]
    ShutdownFromWorker,

    /// A background task panicked and took the worker down with it.
    #[error("Background task panicked: {message}")]
    TaskPanicked { message: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
