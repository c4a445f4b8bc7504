/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task descriptors for the two periodic tasks of an experiment.
//!
//! ```text
//! CLI (4 × ms)  ──►  TaskTimings  ──(ExperimentConfig)──►  [TaskSpec; 2]  ──►  task threads
//!                                                             ↑
//!                                    PolicyBinding derived here (priority / runtime)
//! ```
//!
//! # Ownership model
//! Both `TaskSpec`s are built once in `main`, then **moved** into their task
//! threads.  Nothing mutates a `TaskSpec` after construction; each thread only
//! reads its own copy.

use std::fmt;
use std::time::Duration;

use crate::config::ExperimentConfig;
use crate::policy::{PolicyBinding, PolicyKind};

// ── Derivation constants ──────────────────────────────────────────────────────

/// Highest `SCHED_FIFO` priority on Linux.
pub const MAX_RT_PRIORITY: i32 = 99;

/// Lowest `SCHED_FIFO` priority on Linux.
pub const MIN_RT_PRIORITY: i32 = 1;

const NANOS_PER_MILLI: u64 = 1_000_000;

// ── Role ──────────────────────────────────────────────────────────────────────

/// What a task does each period.
///
/// Roles alternate in argument order: task 1 is always the producer and
/// task 2 the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Advances and publishes the simulated altitude.
    Producer,
    /// Drains the latest altitude and reacts to it.
    Consumer,
}

impl Role {
    /// Short tag used in log lines and the final report.
    pub fn tag(self) -> &'static str {
        match self {
            Role::Producer => "PUB",
            Role::Consumer => "SUB",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

// ── Timing inputs ─────────────────────────────────────────────────────────────

/// The four positional command-line values, in milliseconds.
///
/// All four are guaranteed non-zero by the CLI parser.  Deadline ≤ period is
/// **not** checked; constrained-deadline and overrun experiments are both
/// legitimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTimings {
    pub producer_period_ms: u64,
    pub producer_deadline_ms: u64,
    pub consumer_period_ms: u64,
    pub consumer_deadline_ms: u64,
}

// ── Parameter derivation ──────────────────────────────────────────────────────

/// Rate-monotonic priority for a task with the given period.
///
/// `clamp(99 − period_ms / 10, 1, 99)` with integer division: shorter periods
/// map to higher priorities, anything ≥ 980 ms bottoms out at 1.
pub fn rm_priority(period_ms: u64) -> i32 {
    let drop = i32::try_from(period_ms / 10).unwrap_or(i32::MAX);
    MAX_RT_PRIORITY
        .saturating_sub(drop)
        .clamp(MIN_RT_PRIORITY, MAX_RT_PRIORITY)
}

/// `SCHED_DEADLINE` runtime budget, in milliseconds.
///
/// `clamp(trunc(deadline_ms × factor), 1, deadline_ms)`.  The result is
/// always within `[1, deadline_ms]` for any `deadline_ms ≥ 1`.
pub fn edf_runtime_ms(deadline_ms: u64, factor: f64) -> u64 {
    let deadline_ms = deadline_ms.max(1);
    // `as` saturates for out-of-range floats and maps NaN to 0.
    let raw = (deadline_ms as f64 * factor) as u64;
    raw.clamp(1, deadline_ms)
}

/// Milliseconds → nanoseconds, saturating instead of overflowing.
pub fn ms_to_ns(ms: u64) -> u64 {
    ms.saturating_mul(NANOS_PER_MILLI)
}

// ── TaskSpec ──────────────────────────────────────────────────────────────────

/// Immutable description of one periodic task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    /// 1-based task number, in CLI argument order.
    pub id: u32,
    pub role: Role,
    pub period_ms: u64,
    pub deadline_ms: u64,
    /// Scheduling class, its parameters and the CPU core the task is pinned to.
    pub binding: PolicyBinding,
}

impl TaskSpec {
    /// Build one task, deriving the binding for the configured policy.
    pub fn new(
        id: u32,
        role: Role,
        period_ms: u64,
        deadline_ms: u64,
        core: u32,
        config: &ExperimentConfig,
    ) -> Self {
        let binding = match config.policy {
            PolicyKind::FixedPriority => PolicyBinding::FixedPriority {
                priority: rm_priority(period_ms),
                core,
            },
            PolicyKind::Deadline => PolicyBinding::Deadline {
                runtime_ns: ms_to_ns(edf_runtime_ms(deadline_ms, config.runtime_factor)),
                deadline_ns: ms_to_ns(deadline_ms),
                period_ns: ms_to_ns(period_ms),
                core,
            },
        };

        TaskSpec {
            id,
            role,
            period_ms,
            deadline_ms,
            binding,
        }
    }

    /// Build the producer / consumer pair for an experiment.
    pub fn pair(timings: TaskTimings, config: &ExperimentConfig) -> [TaskSpec; 2] {
        [
            TaskSpec::new(
                1,
                Role::Producer,
                timings.producer_period_ms,
                timings.producer_deadline_ms,
                config.cores[0],
                config,
            ),
            TaskSpec::new(
                2,
                Role::Consumer,
                timings.consumer_period_ms,
                timings.consumer_deadline_ms,
                config.cores[1],
                config,
            ),
        ]
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Thread name, e.g. `"task1-pub"`.
    pub fn thread_name(&self) -> String {
        format!("task{}-{}", self.id, self.role.tag().to_lowercase())
    }

    /// CPU utilisation fraction for a given per-period execution cost.
    ///
    /// Returns `0.0` when `period_ms` is zero to avoid division by zero.
    pub fn utilization(&self, cost: Duration) -> f64 {
        if self.period_ms == 0 {
            0.0
        } else {
            cost.as_secs_f64() * 1_000.0 / self.period_ms as f64
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
