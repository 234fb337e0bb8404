use serde::{Deserialize, Serialize};
use std::fmt;

/// Enqueue sequence number of a submitted task.
///
/// Assigned under the queue lock, so within one queue it is strictly
/// increasing in the order tasks were actually enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point-in-time counters for a scheduler instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Background tasks accepted.
    pub submitted: u64,
    /// Background tasks that ran to completion.
    pub executed: u64,
    /// Background tasks that panicked.
    pub failed: u64,
    /// Tasks (background and foreground) dropped without running.
    pub discarded: u64,
    /// Background submissions hinted as long-running.
    pub long_running: u64,
    /// Background tasks currently waiting in the queue.
    pub queued_background: usize,
    /// Foreground tasks currently waiting across all contexts.
    pub queued_foreground: usize,
}

/// Outcome of a completed shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub executed: u64,
    pub failed: u64,
    /// Background tasks dropped unrun by this shutdown.
    pub discarded_background: usize,
    /// Foreground tasks dropped unrun by this shutdown.
    pub discarded_foreground: usize,
}
