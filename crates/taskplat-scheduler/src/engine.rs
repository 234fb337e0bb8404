use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use taskplat_core::{ContextRef, ExpectedRuntime, SchedulerConfig};
use tracing::{debug, error, info, warn};

use crate::{
    clock,
    error::{Result, SchedulerError},
    foreground::ForegroundQueues,
    queue::TaskQueue,
    task::{panic_message, BoxedTask, Task},
    types::{SchedulerStats, ShutdownReport, TaskId},
    worker::{self, Counters, WorkerExit},
};

/// Task execution and timing service for an embedded script runtime.
///
/// Background work runs on a single dedicated worker thread in enqueue order.
/// Foreground work is queued per [`ContextRef`] and executed by that context's
/// own thread through [`Scheduler::pump_foreground`] and friends.
///
/// Every task handed to a submission method is owned by the scheduler from
/// then on: it runs exactly once, or is dropped unrun when the scheduler shuts
/// down (or rejects the submission).
pub struct Scheduler {
    queue: Arc<TaskQueue>,
    foreground: ForegroundQueues,
    counters: Arc<Counters>,
    /// `None` once shut down. Held across the join so concurrent `shutdown`
    /// callers all return after the worker is gone.
    worker: Mutex<Option<JoinHandle<WorkerExit>>>,
    worker_thread: thread::ThreadId,
}

impl Scheduler {
    /// Start a scheduler and its background worker thread.
    pub fn start(config: &SchedulerConfig) -> Result<Self> {
        let queue = Arc::new(TaskQueue::new());
        let counters = Arc::new(Counters::default());
        let handle = worker::spawn(config, Arc::clone(&queue), Arc::clone(&counters))?;
        let worker_thread = handle.thread().id();

        info!(worker = %config.worker_name, "scheduler started");
        Ok(Self {
            queue,
            foreground: ForegroundQueues::default(),
            counters,
            worker: Mutex::new(Some(handle)),
            worker_thread,
        })
    }

    fn worker_slot(&self) -> MutexGuard<'_, Option<JoinHandle<WorkerExit>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Background submission
    // -----------------------------------------------------------------------

    /// Queue `task` for the background worker. Returns its enqueue id.
    ///
    /// `hint` is advisory and never affects ordering.
    ///
    /// # Errors
    ///
    /// - `ShutDown`: the scheduler was shut down.
    /// - `WorkerTerminated`: the worker died on a panicking task.
    ///
    /// A rejected task is dropped without running.
    pub fn submit_background(&self, task: BoxedTask, hint: ExpectedRuntime) -> Result<TaskId> {
        let id = self.queue.push(task)?;
        Counters::bump(&self.counters.submitted);
        if hint == ExpectedRuntime::Long {
            Counters::bump(&self.counters.long_running);
        }
        debug!(task_id = %id, %hint, "background task queued");
        Ok(id)
    }

    /// Queue a short-running closure for the background worker.
    pub fn spawn<F>(&self, f: F) -> Result<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_background(Box::new(f), ExpectedRuntime::Short)
    }

    // -----------------------------------------------------------------------
    // Foreground submission and pumping
    // -----------------------------------------------------------------------

    /// Queue `task` for `ctx`, eligible immediately.
    pub fn submit_foreground(&self, ctx: &ContextRef, task: BoxedTask) -> Result<TaskId> {
        let id = self.foreground.push(ctx, task, Duration::ZERO)?;
        debug!(task_id = %id, context = %ctx, "foreground task queued");
        Ok(id)
    }

    /// Queue `task` for `ctx`, eligible once `delay_secs` have elapsed on the
    /// monotonic clock.
    ///
    /// Within one context, tasks run in order of eligibility; equal
    /// eligibility keeps submission order.
    ///
    /// # Errors
    ///
    /// - `InvalidDelay`: `delay_secs` is negative, NaN or infinite.
    /// - `ShutDown`: the scheduler was shut down.
    pub fn submit_delayed_foreground(
        &self,
        ctx: &ContextRef,
        task: BoxedTask,
        delay_secs: f64,
    ) -> Result<TaskId> {
        let delay = clock::delay_from_secs(delay_secs)?;
        let id = self.foreground.push(ctx, task, delay)?;
        debug!(task_id = %id, context = %ctx, delay_secs, "delayed foreground task queued");
        Ok(id)
    }

    /// Run at most one eligible foreground task of `ctx` on the calling thread.
    ///
    /// Returns `false` when nothing was eligible. A panicking task unwinds
    /// into the caller.
    pub fn run_next_foreground(&self, ctx: &ContextRef) -> bool {
        match self.foreground.pop_eligible(ctx) {
            Some((id, task)) => {
                debug!(task_id = %id, context = %ctx, "running foreground task");
                task.run();
                true
            }
            None => false,
        }
    }

    /// Run eligible foreground tasks of `ctx` until none is left. Returns the count.
    ///
    /// Tasks queued for `ctx` by the tasks themselves are picked up in the
    /// same pass if they are already eligible.
    pub fn pump_foreground(&self, ctx: &ContextRef) -> usize {
        let mut ran = 0;
        while self.run_next_foreground(ctx) {
            ran += 1;
        }
        ran
    }

    /// Block until `ctx` has an eligible task or `timeout` elapses.
    ///
    /// Returns `false` on timeout or when the scheduler shuts down meanwhile.
    pub fn wait_for_foreground(&self, ctx: &ContextRef, timeout: Duration) -> bool {
        self.foreground.wait(ctx, timeout)
    }

    /// Time until the earliest pending task of `ctx` is eligible; zero if one
    /// already is, `None` if the context has nothing pending.
    pub fn next_foreground_delay(&self, ctx: &ContextRef) -> Option<Duration> {
        self.foreground.next_delay(ctx)
    }

    pub fn pending_foreground(&self, ctx: &ContextRef) -> usize {
        self.foreground.len(ctx)
    }

    /// Drop every pending task of `ctx` without running it. Returns the count.
    pub fn dispose_context(&self, ctx: &ContextRef) -> usize {
        let dropped = self.counters.discard(self.foreground.dispose(ctx));
        if dropped > 0 {
            info!(context = %ctx, dropped, "context disposed with pending tasks");
        }
        dropped
    }

    // -----------------------------------------------------------------------
    // Clock and introspection
    // -----------------------------------------------------------------------

    /// Monotonic reading in fractional milliseconds; see [`clock::monotonic_time_ms`].
    pub fn monotonic_time(&self) -> f64 {
        clock::monotonic_time_ms()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: Counters::get(&self.counters.submitted),
            executed: Counters::get(&self.counters.executed),
            failed: Counters::get(&self.counters.failed),
            discarded: Counters::get(&self.counters.discarded),
            long_running: Counters::get(&self.counters.long_running),
            queued_background: self.queue.len(),
            queued_foreground: self.foreground.total_len(),
        }
    }

    /// `true` while the worker accepts background work.
    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    /// Number of threads consuming background work: 1 while running, else 0.
    pub fn background_thread_count(&self) -> usize {
        usize::from(self.is_running())
    }

    /// `true` when called from this scheduler's worker thread.
    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_thread
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Stop the worker and tear everything down. Blocks until the worker exits.
    ///
    /// The task currently executing finishes; queued background tasks and all
    /// pending foreground tasks are dropped unrun. Calling it again is a no-op
    /// returning an empty report.
    ///
    /// # Errors
    ///
    /// - `ShutdownFromWorker`: called from the worker thread itself.
    /// - `TaskPanicked`: the worker had died on a panicking task
    ///   (terminate policy). Teardown is complete regardless.
    pub fn shutdown(&self) -> Result<ShutdownReport> {
        if self.is_worker_thread() {
            return Err(SchedulerError::ShutdownFromWorker);
        }

        let mut slot = self.worker_slot();
        let Some(handle) = slot.take() else {
            return Ok(ShutdownReport::default());
        };

        info!("scheduler shutting down");
        self.queue.stop();
        let discarded_foreground = self.counters.discard(self.foreground.close());

        let exit = handle.join().unwrap_or_else(|payload| WorkerExit {
            drained: 0,
            panic: Some(panic_message(payload.as_ref())),
        });
        drop(slot);

        let report = ShutdownReport {
            executed: Counters::get(&self.counters.executed),
            failed: Counters::get(&self.counters.failed),
            discarded_background: exit.drained,
            discarded_foreground,
        };
        info!(
            executed = report.executed,
            failed = report.failed,
            discarded_background = report.discarded_background,
            discarded_foreground = report.discarded_foreground,
            "scheduler stopped"
        );

        match exit.panic {
            Some(message) => Err(SchedulerError::TaskPanicked { message }),
            None => Ok(report),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let live = self
            .worker
            .get_mut()
            .map(|slot| slot.is_some())
            .unwrap_or(true);
        if !live {
            return;
        }
        if self.is_worker_thread() {
            // Last handle released by a task on the worker itself; the worker
            // notices the stop flag after this task and exits on its own.
            warn!("scheduler dropped on its worker thread; detaching worker");
            self.queue.stop();
            let dropped = self.counters.discard(self.foreground.close());
            debug!(dropped, "foreground tasks dropped on detach");
            return;
        }
        if let Err(e) = self.shutdown() {
            error!("scheduler shutdown on drop failed: {e}");
        }
    }
}
