//! Per-context foreground queues.
//!
//! Each [`ContextRef`] owns an ordering domain: a min-heap keyed by
//! (eligibility instant, enqueue sequence). Tasks never run here; the
//! context's own thread pulls eligible tasks out and runs them itself.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use taskplat_core::ContextRef;

use crate::{
    error::{Result, SchedulerError},
    task::BoxedTask,
    types::TaskId,
};

struct Entry {
    eligible_at: Instant,
    id: TaskId,
    task: BoxedTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and the earliest entry must surface first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .eligible_at
            .cmp(&self.eligible_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Default)]
struct ForegroundState {
    closed: bool,
    next_id: u64,
    contexts: HashMap<ContextRef, BinaryHeap<Entry>>,
}

impl ForegroundState {
    fn next_eligible_at(&self, ctx: &ContextRef) -> Option<Instant> {
        self.contexts
            .get(ctx)
            .and_then(|heap| heap.peek())
            .map(|entry| entry.eligible_at)
    }
}

#[derive(Default)]
pub(crate) struct ForegroundQueues {
    state: Mutex<ForegroundState>,
    ready: Condvar,
}

impl ForegroundQueues {
    fn lock(&self) -> MutexGuard<'_, ForegroundState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `task` for `ctx`, eligible `delay` from now.
    ///
    /// The eligibility instant is taken under the lock, so for equal delays it
    /// never runs backwards relative to the enqueue sequence.
    pub(crate) fn push(&self, ctx: &ContextRef, task: BoxedTask, delay: Duration) -> Result<TaskId> {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            drop(task);
            return Err(SchedulerError::ShutDown);
        }
        let Some(eligible_at) = Instant::now().checked_add(delay) else {
            drop(state);
            drop(task);
            return Err(SchedulerError::InvalidDelay {
                delay: delay.as_secs_f64(),
            });
        };

        let id = TaskId(state.next_id);
        state.next_id += 1;
        state.contexts.entry(*ctx).or_default().push(Entry {
            eligible_at,
            id,
            task,
        });
        drop(state);

        self.ready.notify_all();
        Ok(id)
    }

    /// Remove the earliest task of `ctx` if it is eligible now.
    pub(crate) fn pop_eligible(&self, ctx: &ContextRef) -> Option<(TaskId, BoxedTask)> {
        let mut state = self.lock();
        let now = Instant::now();
        let heap = state.contexts.get_mut(ctx)?;
        if heap.peek()?.eligible_at > now {
            return None;
        }
        let entry = heap.pop()?;
        if heap.is_empty() {
            state.contexts.remove(ctx);
        }
        Some((entry.id, entry.task))
    }

    /// Time until the earliest pending task of `ctx` becomes eligible.
    pub(crate) fn next_delay(&self, ctx: &ContextRef) -> Option<Duration> {
        let state = self.lock();
        state
            .next_eligible_at(ctx)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Block until `ctx` has an eligible task, the timeout passes or the
    /// queues are closed. Returns `true` only in the first case.
    pub(crate) fn wait(&self, ctx: &ContextRef, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if state.closed {
                return false;
            }
            let now = Instant::now();
            let next = state.next_eligible_at(ctx);
            if next.is_some_and(|at| at <= now) {
                return true;
            }
            if deadline.is_some_and(|d| d <= now) {
                return false;
            }

            let wake = match (deadline, next) {
                (Some(d), Some(at)) => Some(d.min(at)),
                (d, at) => d.or(at),
            };
            state = match wake {
                Some(at) => {
                    self.ready
                        .wait_timeout(state, at.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    pub(crate) fn len(&self, ctx: &ContextRef) -> usize {
        self.lock().contexts.get(ctx).map_or(0, BinaryHeap::len)
    }

    pub(crate) fn total_len(&self) -> usize {
        self.lock().contexts.values().map(BinaryHeap::len).sum()
    }

    /// Take every pending task of `ctx` out; the caller drops them.
    pub(crate) fn dispose(&self, ctx: &ContextRef) -> Vec<BoxedTask> {
        let mut state = self.lock();
        state
            .contexts
            .remove(ctx)
            .map(|heap| heap.into_iter().map(|entry| entry.task).collect())
            .unwrap_or_default()
    }

    /// Refuse further submissions and hand back everything still pending.
    pub(crate) fn close(&self) -> Vec<BoxedTask> {
        let mut state = self.lock();
        state.closed = true;
        let tasks = state
            .contexts
            .drain()
            .flat_map(|(_, heap)| heap.into_iter().map(|entry| entry.task))
            .collect();
        drop(state);

        self.ready.notify_all();
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;

    fn tagged(log: &Arc<StdMutex<Vec<&'static str>>>, tag: &'static str) -> BoxedTask {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(tag))
    }

    fn drain_eligible(queues: &ForegroundQueues, ctx: &ContextRef) {
        while let Some((_, task)) = queues.pop_eligible(ctx) {
            task.run();
        }
    }

    #[test]
    fn immediate_tasks_keep_submission_order() {
        let queues = ForegroundQueues::default();
        let ctx = ContextRef::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        for tag in ["a", "b", "c", "d"] {
            queues.push(&ctx, tagged(&log, tag), Duration::ZERO).unwrap();
        }
        drain_eligible(&queues, &ctx);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(queues.len(&ctx), 0);
    }

    #[test]
    fn delayed_task_waits_for_its_instant() {
        let queues = ForegroundQueues::default();
        let ctx = ContextRef::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        queues
            .push(&ctx, tagged(&log, "late"), Duration::from_millis(50))
            .unwrap();
        queues.push(&ctx, tagged(&log, "now"), Duration::ZERO).unwrap();

        drain_eligible(&queues, &ctx);
        assert_eq!(*log.lock().unwrap(), vec!["now"]);
        assert!(queues.next_delay(&ctx).unwrap() <= Duration::from_millis(50));

        thread::sleep(Duration::from_millis(60));
        drain_eligible(&queues, &ctx);
        assert_eq!(*log.lock().unwrap(), vec!["now", "late"]);
        assert_eq!(queues.next_delay(&ctx), None);
    }

    #[test]
    fn contexts_are_independent() {
        let queues = ForegroundQueues::default();
        let (a, b) = (ContextRef::new(), ContextRef::new());
        let log = Arc::new(StdMutex::new(Vec::new()));

        queues.push(&a, tagged(&log, "a1"), Duration::ZERO).unwrap();
        queues.push(&b, tagged(&log, "b1"), Duration::ZERO).unwrap();
        queues.push(&a, tagged(&log, "a2"), Duration::ZERO).unwrap();

        drain_eligible(&queues, &b);
        assert_eq!(*log.lock().unwrap(), vec!["b1"]);
        assert_eq!(queues.len(&a), 2);
        assert_eq!(queues.total_len(), 2);
    }

    #[test]
    fn wait_returns_when_another_thread_submits() {
        let queues = Arc::new(ForegroundQueues::default());
        let ctx = ContextRef::new();

        let producer = {
            let queues = Arc::clone(&queues);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queues.push(&ctx, Box::new(|| {}), Duration::ZERO).unwrap();
            })
        };

        assert!(queues.wait(&ctx, Duration::from_secs(5)));
        producer.join().unwrap();
    }

    #[test]
    fn wait_times_out_on_empty_context() {
        let queues = ForegroundQueues::default();
        assert!(!queues.wait(&ContextRef::new(), Duration::from_millis(10)));
    }

    #[test]
    fn close_rejects_and_returns_pending() {
        let queues = ForegroundQueues::default();
        let ctx = ContextRef::new();
        queues.push(&ctx, Box::new(|| {}), Duration::ZERO).unwrap();
        queues
            .push(&ctx, Box::new(|| {}), Duration::from_secs(60))
            .unwrap();

        assert_eq!(queues.close().len(), 2);
        assert!(matches!(
            queues.push(&ctx, Box::new(|| {}), Duration::ZERO),
            Err(SchedulerError::ShutDown)
        ));
        assert!(!queues.wait(&ctx, Duration::from_secs(5)));
    }
}
