//! Demonstration workload: background jobs that hand their result over to a
//! foreground context, and the pump loop standing in for that context's thread.

use std::sync::Arc;
use std::time::Duration;

use taskplat_core::{ContextRef, ExpectedRuntime};
use taskplat_scheduler::{Scheduler, SchedulerError};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// How long the pump blocks before re-checking the stop signal.
const PUMP_POLL: Duration = Duration::from_millis(50);

/// Queue `tasks` background jobs plus the foreground follow-ups.
///
/// The returned receiver fires once the last background job's delayed
/// foreground continuation has run on `context`.
pub fn submit(
    scheduler: &Arc<Scheduler>,
    context: ContextRef,
    tasks: usize,
    delay: Duration,
) -> Result<oneshot::Receiver<()>, SchedulerError> {
    let (done_tx, done_rx) = oneshot::channel();

    scheduler.submit_foreground(
        &context,
        Box::new(move || info!(%context, "foreground context started")),
    )?;

    for i in 0..tasks {
        // every fourth job pretends to be a long compile
        let hint = if i % 4 == 3 {
            ExpectedRuntime::Long
        } else {
            ExpectedRuntime::Short
        };
        scheduler.submit_background(
            Box::new(move || {
                std::thread::sleep(Duration::from_millis(2));
                debug!(job = i, "background job finished");
            }),
            hint,
        )?;
    }

    let handoff = Arc::clone(scheduler);
    scheduler.spawn(move || {
        let continuation = Box::new(move || {
            info!("delayed continuation ran");
            let _ = done_tx.send(());
        });
        if let Err(e) =
            handoff.submit_delayed_foreground(&context, continuation, delay.as_secs_f64())
        {
            warn!("could not queue continuation: {e}");
        }
    })?;

    Ok(done_rx)
}

/// Pump `context` until `stop` flips to `true`. Returns the number of tasks run.
pub fn pump_context(
    scheduler: &Scheduler,
    context: ContextRef,
    stop: watch::Receiver<bool>,
) -> usize {
    let mut ran = 0;
    while !*stop.borrow() {
        if scheduler.wait_for_foreground(&context, PUMP_POLL) {
            ran += scheduler.pump_foreground(&context);
        }
    }
    ran
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskplat_core::SchedulerConfig;

    #[test]
    fn workload_completes_through_foreground_handoff() {
        let scheduler = Arc::new(Scheduler::start(&SchedulerConfig::default()).unwrap());
        let context = ContextRef::new();
        let (stop_tx, stop_rx) = watch::channel(false);

        let pump = {
            let scheduler = Arc::clone(&scheduler);
            std::thread::spawn(move || pump_context(&scheduler, context, stop_rx))
        };

        let done = submit(&scheduler, context, 8, Duration::from_millis(10)).unwrap();
        done.blocking_recv().unwrap();

        stop_tx.send(true).unwrap();
        // started message + delayed continuation
        assert_eq!(pump.join().unwrap(), 2);

        let stats = scheduler.stats();
        assert_eq!(stats.submitted, 9);
        assert_eq!(stats.long_running, 2);

        let report = scheduler.shutdown().unwrap();
        assert_eq!(report.executed, 9);
        assert_eq!(report.discarded_foreground, 0);
    }
}
