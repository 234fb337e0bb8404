use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use taskplat_core::{ContextRef, PlatformConfig};
use taskplat_scheduler::{Platform, SchedulerStats, ShutdownReport};
use tracing::{debug, info, warn};

mod workload;

/// Drive a taskplat scheduler through a demonstration workload.
#[derive(Debug, Parser)]
#[command(name = "taskplat-runner", version)]
struct Args {
    /// Config file (defaults to $TASKPLAT_CONFIG, then ~/.taskplat/taskplat.toml).
    #[arg(long)]
    config: Option<String>,

    /// Number of background tasks to submit.
    #[arg(long, default_value_t = 16)]
    tasks: usize,

    /// Delay of the final foreground task, in milliseconds.
    #[arg(long, default_value_t = 250)]
    delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    stats: SchedulerStats,
    shutdown: ShutdownReport,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskplat_runner=info,taskplat_scheduler=info".into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > TASKPLAT_CONFIG env > ~/.taskplat/taskplat.toml
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("TASKPLAT_CONFIG").ok());
    let config = PlatformConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        PlatformConfig::default()
    });

    // the driver owns the platform; everything else gets the scheduler handle
    let platform = Arc::new(Platform::new(config.scheduler));
    let scheduler = platform.create()?;
    let context = ContextRef::new();
    info!(%context, tasks = args.tasks, "platform up");

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let pump = tokio::task::spawn_blocking({
        let scheduler = Arc::clone(&scheduler);
        move || workload::pump_context(&scheduler, context, stop_rx)
    });

    let delay = Duration::from_millis(args.delay_ms);
    let done = workload::submit(&scheduler, context, args.tasks, delay)?;

    tokio::select! {
        result = done => {
            if result.is_err() {
                warn!("workload completion signal dropped before firing");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; shutting down with work still pending");
        }
    }

    if stop_tx.send(true).is_err() {
        debug!("foreground pump already gone");
    }
    let pumped = pump.await?;
    let stats = scheduler.stats();
    info!(pumped, "foreground pump stopped");

    // shutdown joins the worker thread, keep it off the async executor
    let report = tokio::task::spawn_blocking({
        let platform = Arc::clone(&platform);
        move || platform.shutdown()
    })
    .await??
    .unwrap_or_default();

    let summary = RunSummary {
        stats,
        shutdown: report,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
