/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use avionics_rt::config::{ExperimentConfig, Overrides, Scenario};
use avionics_rt::error::HarnessError;
use avionics_rt::monitor::ResponseBasis;
use avionics_rt::policy::{LinuxScheduler, NoopScheduler, SchedulerOps};
use avionics_rt::runner::run_experiment;
use avionics_rt::task::TaskTimings;
use avionics_rt::telemetry::ChannelKind;
use avionics_rt::workload::CostKind;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Periodic real-time jitter harness (RM / EDF).
///
/// Example:
///   sudo avionics-rt --scenario edf-bus 10 10 20 20
///   avionics-rt --simulate --cost zero 100 100 100 100
#[derive(Debug, Parser)]
#[command(
    name = "avionics-rt",
    about = "Producer / consumer jitter harness under SCHED_FIFO or SCHED_DEADLINE",
    long_about = None,
)]
struct Cli {
    /// Producer period, in milliseconds.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    producer_period_ms: u64,

    /// Producer relative deadline, in milliseconds.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    producer_deadline_ms: u64,

    /// Consumer period, in milliseconds.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    consumer_period_ms: u64,

    /// Consumer relative deadline, in milliseconds.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    consumer_deadline_ms: u64,

    /// Reference experiment to start from.
    #[arg(short = 's', long, value_enum)]
    scenario: Option<Scenario>,

    /// YAML experiment configuration, applied on top of the scenario.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Channel between producer and consumer.
    #[arg(long, value_enum)]
    channel: Option<ChannelKind>,

    /// Jitter above this many milliseconds counts as a violation.
    #[arg(long)]
    jitter_threshold_ms: Option<f64>,

    /// Run each task for this many milliseconds (iterations = duration / period).
    #[arg(long, conflicts_with = "iterations", value_parser = clap::value_parser!(u64).range(1..))]
    duration_ms: Option<u64>,

    /// Run each task for a fixed number of iterations.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    iterations: Option<u64>,

    /// Fraction of the deadline reserved as SCHED_DEADLINE runtime, in (0, 1].
    #[arg(long)]
    runtime_factor: Option<f64>,

    /// Producer and consumer CPU cores, e.g. `0,2`.
    #[arg(long, value_delimiter = ',')]
    cores: Option<Vec<u32>>,

    /// How workload cost is consumed.
    #[arg(long, value_enum)]
    cost: Option<CostKind>,

    /// Multiplier for `--cost scaled`.
    #[arg(long)]
    cost_scale: Option<f64>,

    /// Response time measured from the actual start or from the nominal release.
    #[arg(long, value_enum)]
    response_basis: Option<ResponseBasis>,

    /// Use virtual clocks and skip every scheduler call (no privilege needed).
    #[arg(long, default_value_t = false)]
    simulate: bool,
}

impl Cli {
    fn timings(&self) -> TaskTimings {
        TaskTimings {
            producer_period_ms: self.producer_period_ms,
            producer_deadline_ms: self.producer_deadline_ms,
            consumer_period_ms: self.consumer_period_ms,
            consumer_deadline_ms: self.consumer_deadline_ms,
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            channel: self.channel,
            jitter_threshold_ms: self.jitter_threshold_ms,
            test_duration_ms: self.duration_ms,
            iterations: self.iterations,
            runtime_factor: self.runtime_factor,
            cores: self.cores.clone(),
            cost: self.cost,
            cost_scale: self.cost_scale,
            response_basis: self.response_basis,
            simulate: self.simulate,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug prints
    // one line per iteration).  Logs go to stderr, the report to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // clap exits with 2 on usage errors; this harness reports them as 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = run(&cli) {
        error!("{e}");
        if e.is_abort() {
            process::abort();
        }
        process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), HarnessError> {
    let config = ExperimentConfig::resolve(cli.scenario, cli.config.as_deref(), &cli.overrides())
        .map_err(HarnessError::Config)?;

    let sched: Arc<dyn SchedulerOps> = if config.simulate {
        warn!("simulation mode: scheduler calls are skipped and time is virtual");
        Arc::new(NoopScheduler)
    } else {
        Arc::new(LinuxScheduler)
    };

    info!("avionics-rt starting {} run...", config.title());
    let report = run_experiment(cli.timings(), &config, sched)?;
    print!("{report}");

    if !report.all_completed() {
        warn!("at least one task did not run its loop; see the report");
    }
    Ok(())
}
