/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Spawns the two task threads, runs their periodic loops and collects the
//! results.
//!
//! ```text
//! main ─► run()
//!          ├─ feasibility warnings          (log only)
//!          ├─ probe_fixed_priority()        (fatal: no thread created)
//!          ├─ open telemetry channel
//!          ├─ spawn task1-pub ─► bind ─► ActivationEngine loop ─► TaskResult
//!          ├─ spawn task2-sub ─► bind ─► ActivationEngine loop ─► TaskResult
//!          └─ join both (blocking, no timeout) ─► [TaskReport; 2]
//! ```
//!
//! Each thread owns its clock, workload and monitor.  The only state shared
//! between the two threads is the telemetry channel and the scheduler seam.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::activation::{ActivationEngine, Pacing};
use crate::clock::{Clock, MonotonicClock, VirtualClock};
use crate::config::ExperimentConfig;
use crate::error::HarnessError;
use crate::monitor::{as_millis_f64, ActivationRecord, JitterMonitor, MonitorConfig, TaskResult};
use crate::policy::feasibility::warn_if_overloaded;
use crate::policy::{probe_fixed_priority, BindError, SchedulerOps};
use crate::report::Report;
use crate::task::{TaskSpec, TaskTimings};
use crate::telemetry::{ChannelKind, TelemetryChannel, DEFAULT_BUS_CAPACITY};
use crate::workload::{CostModel, Workload};

// ── Clock selection ───────────────────────────────────────────────────────────

/// Time source given to each task thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// `CLOCK_MONOTONIC`, real sleeps and real busy-waits.
    Monotonic,
    /// One [`VirtualClock`] per task; every wake-up is late by `wake_latency`.
    Virtual { wake_latency: Duration },
}

impl ClockSource {
    fn open(self) -> Box<dyn Clock> {
        match self {
            ClockSource::Monotonic => Box::new(MonotonicClock),
            ClockSource::Virtual { wake_latency } => {
                Box::new(VirtualClock::with_wake_latency(wake_latency))
            }
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// How a task thread ended.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The periodic loop ran to its configured end.
    Completed(TaskResult),
    /// The thread could not be placed under its scheduling class and never
    /// entered its loop.
    Rejected(BindError),
    /// The thread panicked; no counters are available.
    Panicked,
}

/// One row of the final report.
#[derive(Debug)]
pub struct TaskReport {
    /// `PUB`, `SUB`, `LOW` or `HIGH`.
    pub tag: &'static str,
    pub outcome: TaskOutcome,
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Build the task pair from `timings`, run it and assemble the report.
///
/// Simulated configurations run on virtual clocks; everything else on
/// `CLOCK_MONOTONIC`.
pub fn run_experiment(
    timings: TaskTimings,
    config: &ExperimentConfig,
    sched: Arc<dyn SchedulerOps>,
) -> Result<Report, HarnessError> {
    let clocks = if config.simulate {
        ClockSource::Virtual {
            wake_latency: Duration::ZERO,
        }
    } else {
        ClockSource::Monotonic
    };
    let tasks = TaskSpec::pair(timings, config);
    let rows = run(tasks, config, sched, clocks)?;
    Ok(Report::new(config, rows))
}

/// Run both tasks to completion and return one report row per task, in
/// task order.
///
/// # Errors
/// * [`HarnessError::Privilege`] when the fixed-priority probe fails; no
///   thread has been created at that point.
/// * [`HarnessError::ThreadSpawn`] when the OS refuses a thread.
pub fn run(
    tasks: [TaskSpec; 2],
    config: &ExperimentConfig,
    sched: Arc<dyn SchedulerOps>,
    clocks: ClockSource,
) -> Result<Vec<TaskReport>, HarnessError> {
    let has_channel = config.channel != ChannelKind::None;
    warn_if_overloaded(&tasks, |t| {
        config
            .cost
            .effective(Workload::for_role(t.role, has_channel).worst_case_cost())
    });

    probe_fixed_priority(&tasks, sched.as_ref())?;

    let channel = config.channel.open();
    // Virtual clocks have no kernel to pace a deadline job; an absolute sleep
    // stands in for the CBS replenishment.
    let simulated = matches!(clocks, ClockSource::Virtual { .. });

    let mut handles = Vec::with_capacity(tasks.len());
    for spec in tasks {
        let name = spec.thread_name();
        let ctx = TaskContext {
            sched: Arc::clone(&sched),
            channel: channel.clone(),
            clock: clocks.open(),
            pacing: if simulated {
                Pacing::AbsoluteSleep
            } else {
                spec.binding.pacing()
            },
            monitor: MonitorConfig {
                jitter_threshold: config.jitter_threshold(),
                deadline: spec.deadline(),
                basis: config.response_basis,
            },
            iterations: config.termination.iterations(spec.period_ms),
            cost: config.cost,
        };
        let tag = Workload::for_role(spec.role, channel.is_some()).tag();

        info!(
            task = tag,
            thread = %name,
            period_ms = spec.period_ms,
            deadline_ms = spec.deadline_ms,
            binding = ?spec.binding,
            iterations = ctx.iterations,
            "Creating task thread"
        );

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_task(&spec, ctx))
            .map_err(|source| HarnessError::ThreadSpawn { name, source })?;
        handles.push((tag, handle));
    }

    let rows = handles
        .into_iter()
        .map(|(tag, handle)| {
            let outcome = handle.join().unwrap_or_else(|_| {
                error!(task = tag, "task thread panicked");
                TaskOutcome::Panicked
            });
            TaskReport { tag, outcome }
        })
        .collect();
    Ok(rows)
}

// ── Task thread ───────────────────────────────────────────────────────────────

/// Everything a task thread owns.
struct TaskContext {
    sched: Arc<dyn SchedulerOps>,
    channel: Option<Arc<dyn TelemetryChannel>>,
    clock: Box<dyn Clock>,
    pacing: Pacing,
    monitor: MonitorConfig,
    iterations: u64,
    cost: CostModel,
}

fn run_task(spec: &TaskSpec, ctx: TaskContext) -> TaskOutcome {
    let mut workload = Workload::for_role(spec.role, ctx.channel.is_some());
    let tag = workload.tag();

    if let Err(e) = spec.binding.apply(ctx.sched.as_ref()) {
        error!(task = tag, error = %e, "scheduling binding failed, task not started");
        return TaskOutcome::Rejected(e);
    }

    let clock = ctx.clock.as_ref();
    let mut monitor = JitterMonitor::new(ctx.monitor);
    let mut scratch = Vec::with_capacity(DEFAULT_BUS_CAPACITY);
    let engine = ActivationEngine::new(
        clock,
        ctx.sched.as_ref(),
        ctx.pacing,
        spec.period(),
        ctx.iterations,
    );

    for activation in engine {
        let latest = match &ctx.channel {
            Some(ch) if workload.consumes() => ch.take_latest(&mut scratch),
            _ => None,
        };

        let step = workload.step(latest);
        if let (Some(ch), Some(sample)) = (&ctx.channel, step.publish) {
            ch.publish(sample);
        }
        ctx.cost.spend(step.cost, clock);

        let record = ActivationRecord {
            nominal: activation.nominal,
            start: activation.start,
            finish: clock.now(),
            measured: activation.measured,
        };
        let obs = monitor.observe(&record);
        let dl = if obs.deadline_miss { "MISSED" } else { "OK" };

        debug!(
            task = tag,
            i = activation.index,
            alt = step.altitude as i32,
            status = %step.status,
            cpu_ms = format_args!("{:.2}", as_millis_f64(obs.response_time)),
            jitter_ms = format_args!("{:.3}", obs.jitter.map(as_millis_f64).unwrap_or(0.0)),
            dl,
            "iteration"
        );
    }

    let result = monitor.finish();
    if result.deadline_misses > 0 {
        warn!(task = tag, misses = result.deadline_misses, "deadlines missed");
    }
    info!(
        task = tag,
        iterations = result.iterations,
        peak_jitter_ms = format_args!("{:.3}", as_millis_f64(result.peak_jitter)),
        "task finished"
    );
    TaskOutcome::Completed(result)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
