//! Pending Queue: FIFO of owned background tasks shared between producers and
//! the single worker.
//!
//! The queue contents, the running flag and the id counter live behind one
//! mutex. The condition variable only saves the worker from spinning; every
//! read and write of the shared state happens under the lock.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::{
    error::{Result, SchedulerError},
    task::BoxedTask,
    types::TaskId,
};

struct QueueState {
    tasks: VecDeque<(TaskId, BoxedTask)>,
    running: bool,
    next_id: u64,
    /// Set when the worker died on a panicking task.
    failure: Option<String>,
}

pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                running: true,
                next_id: 0,
                failure: None,
            }),
            available: Condvar::new(),
        }
    }

    // The lock is never held across task execution or task drops, so a
    // poisoned guard still protects consistent state.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `task` to the tail and wake the worker.
    ///
    /// On rejection the task is dropped unrun, after the lock is released.
    pub(crate) fn push(&self, task: BoxedTask) -> Result<TaskId> {
        let mut state = self.lock();
        if !state.running {
            let err = match &state.failure {
                Some(message) => SchedulerError::WorkerTerminated {
                    message: message.clone(),
                },
                None => SchedulerError::ShutDown,
            };
            drop(state);
            drop(task);
            return Err(err);
        }

        let id = TaskId(state.next_id);
        state.next_id += 1;
        state.tasks.push_back((id, task));
        drop(state);

        self.available.notify_one();
        Ok(id)
    }

    /// Block until a task is available or the queue is stopped.
    ///
    /// Returns `None` once stopped, even if tasks remain; those are left for
    /// [`TaskQueue::drain`]. The head is removed before the lock is released.
    pub(crate) fn pop_blocking(&self) -> Option<(TaskId, BoxedTask)> {
        let mut state = self.lock();
        loop {
            if !state.running {
                return None;
            }
            if let Some(item) = state.tasks.pop_front() {
                return Some(item);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Clear the running flag and wake the worker. Returns whether it was running.
    ///
    /// Also clears any recorded worker failure: once stopped, later
    /// submissions are plain `ShutDown` rejections.
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.lock();
        let was_running = state.running;
        state.running = false;
        state.failure = None;
        drop(state);

        self.available.notify_all();
        was_running
    }

    /// Stop accepting work because the worker is going away after a panic.
    pub(crate) fn terminate(&self, message: String) {
        let mut state = self.lock();
        state.running = false;
        state.failure = Some(message);
        drop(state);

        self.available.notify_all();
    }

    /// Take every queued task out. The caller drops them outside the lock.
    pub(crate) fn drain(&self) -> Vec<BoxedTask> {
        let mut state = self.lock();
        state.tasks.drain(..).map(|(_, task)| task).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lock().running
    }
}
