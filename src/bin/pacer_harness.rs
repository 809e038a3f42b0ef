//! Workload harness for the frame pacer.
//!
//! `simulate` drives a scheduler from a manual clock with synthetic task
//! costs, so runs are reproducible. `realtime` paces frames with tokio
//! timers. Both print a JSON report to stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use frame_pacer::scheduler::{SimulatedBattery, run_interval_loop};
use frame_pacer::{
    BatteryStatus, ConfigPatch, FrameScheduler, IntervalTickSource, ManualTickSource, Metrics,
    PacerConfig, Priority, RuntimeState, TaskInfo,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Frame pacer workload harness.
#[derive(Parser)]
#[command(name = "frame-pacer-harness", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run a deterministic simulation on a manual clock.
    Simulate(SimulateArgs),

    /// Pace frames in real time until the frame count or Ctrl+C.
    Realtime {
        /// Accepted frames to run before stopping.
        #[arg(long, default_value_t = 300)]
        frames: u32,
    },

    /// Write the default configuration file and print its path.
    InitConfig,
}

#[derive(Args)]
struct SimulateArgs {
    /// Display ticks to deliver.
    #[arg(long, default_value_t = 1200)]
    ticks: u64,

    /// Host display refresh rate.
    #[arg(long, default_value_t = 120.0)]
    display_hz: f64,

    /// Cost of the Critical render task, in ms.
    #[arg(long, default_value_t = 6.0)]
    render_ms: f64,

    /// Number of Low/Idle background tasks.
    #[arg(long, default_value_t = 4)]
    background_tasks: u32,

    /// Cost of each background task, in ms.
    #[arg(long, default_value_t = 3.0)]
    background_ms: f64,

    /// Queue a one-shot load spike every N ticks.
    #[arg(long)]
    spike_every: Option<u64>,

    /// Cost of each load spike, in ms.
    #[arg(long, default_value_t = 30.0)]
    spike_ms: f64,

    /// Report a low, discharging battery from this tick on.
    #[arg(long)]
    low_battery_at: Option<u64>,

    /// Report a hot device from this tick on.
    #[arg(long)]
    hot_at: Option<u64>,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            ticks: 1200,
            display_hz: 120.0,
            render_ms: 6.0,
            background_tasks: 4,
            background_ms: 3.0,
            spike_every: None,
            spike_ms: 30.0,
            low_battery_at: None,
            hot_at: None,
        }
    }
}

/// JSON report printed at the end of a run.
#[derive(Serialize)]
struct Report {
    config: PacerConfig,
    state: RuntimeState,
    metrics: Metrics,
    tasks: Vec<TaskInfo>,
}

impl Report {
    fn capture(scheduler: &FrameScheduler) -> Self {
        Self {
            config: scheduler.config().clone(),
            state: scheduler.state(),
            metrics: scheduler.metrics(),
            tasks: scheduler.task_infos(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON report; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frame_pacer=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        PacerConfig::from_file(path)?
    } else {
        PacerConfig::default()
    };

    let command = cli
        .command
        .unwrap_or_else(|| Command::Simulate(SimulateArgs::default()));
    let report = match command {
        Command::Simulate(args) => simulate(config, &args),
        Command::Realtime { frames } => realtime(config, frames).await,
        Command::InitConfig => {
            let path = cli.config.unwrap_or_else(PacerConfig::default_config_path);
            config.save_to_file(&path)?;
            println!("{}", path.display());
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn simulate(config: PacerConfig, args: &SimulateArgs) -> Report {
    let clock = ManualTickSource::new(0.0);
    let battery = SimulatedBattery::new(BatteryStatus {
        level: 1.0,
        charging: true,
    });
    let mut scheduler =
        FrameScheduler::new(config, clock.clone()).with_battery_monitor(Box::new(battery.clone()));

    scheduler.schedule_task("render", costed(&clock, args.render_ms), Priority::Critical, None);
    scheduler.schedule_task("lip_sync", costed(&clock, 1.0), Priority::High, None);
    for i in 0..args.background_tasks {
        let priority = if i % 2 == 0 { Priority::Low } else { Priority::Idle };
        scheduler.schedule_task(
            format!("background_{i}"),
            costed(&clock, args.background_ms),
            priority,
            None,
        );
    }

    if args.low_battery_at.is_some() {
        scheduler.update_config(ConfigPatch {
            battery_saver: Some(true),
            ..ConfigPatch::default()
        });
    }
    if args.hot_at.is_some() {
        scheduler.update_config(ConfigPatch {
            thermal_throttling: Some(true),
            ..ConfigPatch::default()
        });
    }

    let display_ms = 1000.0 / args.display_hz.max(1.0);
    let handle = scheduler.handle();
    scheduler.start();

    for tick in 0..args.ticks {
        if args.low_battery_at == Some(tick) {
            battery.set(BatteryStatus {
                level: 0.1,
                charging: false,
            });
        }
        if args.hot_at == Some(tick) {
            // Delivered on the next tick, like a host listener would.
            let _ = handle.report_thermal(true);
        }
        if let Some(every) = args.spike_every
            && every > 0
            && tick % every == 0
            && tick > 0
        {
            let spike = clock.clone();
            let spike_ms = args.spike_ms;
            scheduler.run_once(
                Box::new(move |_| {
                    spike.advance(spike_ms);
                    Ok(())
                }),
                Priority::High,
            );
        }

        clock.advance(display_ms);
        scheduler.tick();
    }

    let report = Report::capture(&scheduler);
    scheduler.stop();
    info!(
        total_frames = report.metrics.total_frames,
        dropped_frames = report.metrics.dropped_frames,
        "simulation finished"
    );
    report
}

async fn realtime(config: PacerConfig, frames: u32) -> Report {
    let ticker = IntervalTickSource::from_fps(config.target_fps);
    let mut scheduler = FrameScheduler::new(config, ticker.clone());
    let cancel = CancellationToken::new();

    let stop_after = cancel.clone();
    let mut seen = 0_u32;
    scheduler.schedule_task(
        "frame_counter",
        Box::new(move |_, _| {
            seen += 1;
            if seen >= frames {
                stop_after.cancel();
            }
            Ok(())
        }),
        Priority::Critical,
        None,
    );

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            on_signal.cancel();
        }
    });

    run_interval_loop(&mut scheduler, ticker, cancel).await;
    Report::capture(&scheduler)
}

/// A recurring task that advances the simulated clock by `ms`.
fn costed(clock: &ManualTickSource, ms: f64) -> frame_pacer::scheduler::TaskCallback {
    let clock = clock.clone();
    Box::new(move |_, _| {
        clock.advance(ms);
        Ok(())
    })
}
