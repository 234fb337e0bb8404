//! The background worker: one OS thread consuming the Pending Queue.
//!
//! Idle → Executing when the queue yields a task, Executing → Idle once the
//! task returned (and was consumed), Idle → Stopped when the running flag is
//! observed false. A task is always allowed to finish; whatever is still
//! queued at stop time is dropped without running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};

use taskplat_core::{PanicPolicy, SchedulerConfig};
use tracing::{debug, error, info, warn};

use crate::{
    error::{Result, SchedulerError},
    queue::TaskQueue,
    task::{panic_message, BoxedTask, Task},
};

/// Lifetime counters shared by the facade and the worker.
#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) submitted: AtomicU64,
    pub(crate) executed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) discarded: AtomicU64,
    pub(crate) long_running: AtomicU64,
}

impl Counters {
    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop `tasks` unrun, counting them as discarded. Returns how many.
    pub(crate) fn discard(&self, tasks: Vec<BoxedTask>) -> usize {
        let n = tasks.len();
        drop(tasks);
        self.discarded.fetch_add(n as u64, Ordering::Relaxed);
        n
    }
}

/// What the worker thread hands back to whoever joins it.
#[derive(Debug, Default)]
pub(crate) struct WorkerExit {
    /// Tasks dropped unrun when the worker stopped.
    pub(crate) drained: usize,
    /// Message of the panic that terminated the worker, if any.
    pub(crate) panic: Option<String>,
}

pub(crate) fn spawn(
    config: &SchedulerConfig,
    queue: Arc<TaskQueue>,
    counters: Arc<Counters>,
) -> Result<JoinHandle<WorkerExit>> {
    let mut builder = thread::Builder::new().name(config.worker_name.clone());
    if let Some(size) = config.stack_size {
        builder = builder.stack_size(size);
    }
    let policy = config.on_task_panic;
    builder
        .spawn(move || run(&queue, &counters, policy))
        .map_err(SchedulerError::WorkerSpawn)
}

fn run(queue: &TaskQueue, counters: &Counters, policy: PanicPolicy) -> WorkerExit {
    info!(?policy, "background worker started");

    while let Some((id, task)) = queue.pop_blocking() {
        debug!(task_id = %id, "executing background task");
        match panic::catch_unwind(AssertUnwindSafe(move || task.run())) {
            Ok(()) => Counters::bump(&counters.executed),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Counters::bump(&counters.failed);
                error!(task_id = %id, %message, "background task panicked");

                if policy == PanicPolicy::Terminate {
                    queue.terminate(message.clone());
                    let drained = counters.discard(queue.drain());
                    warn!(drained, "background worker terminated by task panic");
                    return WorkerExit {
                        drained,
                        panic: Some(message),
                    };
                }
            }
        }
    }

    let drained = counters.discard(queue.drain());
    if drained > 0 {
        warn!(drained, "pending background tasks dropped without running");
    }
    info!("background worker stopped");
    WorkerExit {
        drained,
        panic: None,
    }
}
