//! `taskplat-scheduler`: background worker, foreground queues and monotonic
//! clock for an embedded script runtime.
//!
//! # Overview
//!
//! A [`Platform`] owns at most one live [`Scheduler`]. The scheduler runs
//! background tasks on one dedicated worker thread in enqueue order, keeps a
//! delay-aware FIFO per foreground [`ContextRef`] for the context's own thread
//! to pump, and exposes a monotonic millisecond clock.
//!
//! # Operations
//!
//! | Operation                     | Guarantee                                        |
//! |-------------------------------|--------------------------------------------------|
//! | `Platform::create`            | exactly one live instance; idempotent            |
//! | `Platform::shutdown`          | blocking teardown, queued work dropped unrun     |
//! | `submit_background`           | FIFO on the worker; ownership transferred        |
//! | `submit_foreground`           | per-context order; ownership transferred         |
//! | `submit_delayed_foreground`   | eligible after delay; per-context order kept     |
//! | `monotonic_time`              | non-decreasing fractional milliseconds           |
//!
//! # Panics in tasks
//!
//! Governed by [`PanicPolicy`]: `Terminate` (default) stops the worker and
//! reports the panic from `shutdown`; `Isolate` logs, counts and moves on.

pub mod clock;
pub mod engine;
pub mod error;
pub mod platform;
pub mod task;
pub mod types;

mod foreground;
mod queue;
mod worker;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use platform::Platform;
pub use task::{BoxedTask, Task};
pub use taskplat_core::{ContextRef, ExpectedRuntime, PanicPolicy, SchedulerConfig};
pub use types::{SchedulerStats, ShutdownReport, TaskId};
