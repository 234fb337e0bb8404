//! `Platform`: the driver-owned lifecycle cell around at most one live
//! [`Scheduler`].
//!
//! The process driver constructs one `Platform` at startup and passes it (or
//! the `Arc<Scheduler>` it hands out) to whatever needs to submit work.
//! `create` and `shutdown` are idempotent and safe to race from any thread.
//!
//! The cell lock is never held while the worker is joined. During a teardown
//! the cell reads as not running, so tasks still finishing on the old worker
//! may query it freely.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
};

use taskplat_core::SchedulerConfig;
use tracing::{debug, info};

use crate::{
    engine::Scheduler,
    error::{Result, SchedulerError},
    types::ShutdownReport,
};

enum Instance {
    Idle,
    Live(Arc<Scheduler>),
    /// Being torn down; the worker may still be finishing its current task.
    Stopping(Arc<Scheduler>),
}

pub struct Platform {
    config: SchedulerConfig,
    instance: Mutex<Instance>,
    /// Signalled when a teardown leaves `Stopping`.
    settled: Condvar,
    started: AtomicUsize,
}

impl Platform {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            instance: Mutex::new(Instance::Idle),
            settled: Condvar::new(),
            started: AtomicUsize::new(0),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Instance> {
        self.instance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until no teardown is in flight.
    fn settle<'a>(&self, mut slot: MutexGuard<'a, Instance>) -> MutexGuard<'a, Instance> {
        while matches!(*slot, Instance::Stopping(_)) {
            slot = self
                .settled
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        slot
    }

    /// Start the scheduler if none is live; otherwise return the live one.
    ///
    /// A call racing a teardown waits until the old worker has exited and then
    /// starts a fresh instance.
    ///
    /// # Errors
    ///
    /// - `ShutDown`: called from the worker of an instance being torn down,
    ///   which would otherwise wait on itself.
    /// - `WorkerSpawn`: the worker thread could not be started.
    pub fn create(&self) -> Result<Arc<Scheduler>> {
        let mut slot = self.slot();
        if let Instance::Stopping(old) = &*slot {
            if old.is_worker_thread() {
                return Err(SchedulerError::ShutDown);
            }
            debug!("create waiting for teardown");
            slot = self.settle(slot);
        }
        if let Instance::Live(existing) = &*slot {
            debug!("platform already created");
            return Ok(Arc::clone(existing));
        }

        let scheduler = Arc::new(Scheduler::start(&self.config)?);
        self.started.fetch_add(1, Ordering::SeqCst);
        *slot = Instance::Live(Arc::clone(&scheduler));
        info!("platform created");
        Ok(scheduler)
    }

    /// Shut the live scheduler down and forget it. `Ok(None)` if there was none.
    ///
    /// Blocks until the worker thread has exited; a call racing another
    /// teardown waits for that one and returns `Ok(None)`. Handles previously
    /// returned by [`Platform::create`] stay valid but reject further
    /// submissions.
    ///
    /// # Errors
    ///
    /// - `ShutdownFromWorker`: called from the scheduler's own worker; a live
    ///   instance stays live.
    /// - `TaskPanicked`: propagated from [`Scheduler::shutdown`]; the
    ///   instance is torn down and forgotten regardless.
    pub fn shutdown(&self) -> Result<Option<ShutdownReport>> {
        let mut slot = self.slot();
        let scheduler = match &*slot {
            Instance::Idle => return Ok(None),
            Instance::Live(s) | Instance::Stopping(s) if s.is_worker_thread() => {
                return Err(SchedulerError::ShutdownFromWorker)
            }
            Instance::Stopping(_) => {
                drop(self.settle(slot));
                return Ok(None);
            }
            Instance::Live(s) => Arc::clone(s),
        };
        *slot = Instance::Stopping(Arc::clone(&scheduler));
        drop(slot);

        let outcome = scheduler.shutdown();

        *self.slot() = Instance::Idle;
        self.settled.notify_all();
        info!("platform shut down");
        outcome.map(Some)
    }

    /// The live scheduler, if any. `None` while a teardown is in flight.
    pub fn handle(&self) -> Option<Arc<Scheduler>> {
        match &*self.slot() {
            Instance::Live(s) => Some(Arc::clone(s)),
            Instance::Idle | Instance::Stopping(_) => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.slot(), Instance::Live(_))
    }

    /// How many scheduler instances this platform has started over its life.
    pub fn instances_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
