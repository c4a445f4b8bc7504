/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Jitter and deadline accounting for one task.
//!
//! The monitor only counts.  A violated threshold or a missed deadline is the
//! measured result of the experiment, never a reason to retry, skip or abort.

use std::time::Duration;

use serde::Deserialize;

use crate::clock::Timestamp;

/// Reference point for response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseBasis {
    /// `finish − start`: execution time of the iteration body.
    Start,
    /// `finish − nominal`: includes the release delay, as the kernel sees it
    /// for `SCHED_DEADLINE` jobs.
    Nominal,
}

/// Timing of one iteration, in monotonic time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationRecord {
    pub nominal: Timestamp,
    pub start: Timestamp,
    pub finish: Timestamp,
    /// `false` when `nominal` carries no information (see
    /// [`Activation::measured`](crate::activation::Activation::measured)).
    pub measured: bool,
}

impl ActivationRecord {
    /// `|start − nominal|`, or `None` for an unmeasured activation.
    pub fn jitter(&self) -> Option<Duration> {
        self.measured.then(|| self.start.abs_diff(self.nominal))
    }

    pub fn response_time(&self, basis: ResponseBasis) -> Duration {
        let from = match basis {
            ResponseBasis::Start => self.start,
            ResponseBasis::Nominal => self.nominal,
        };
        self.finish.saturating_duration_since(from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Jitter strictly above this is a violation.
    pub jitter_threshold: Duration,
    /// Response time strictly above this is a miss.
    pub deadline: Duration,
    pub basis: ResponseBasis,
}

/// What the monitor concluded about one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub jitter: Option<Duration>,
    pub response_time: Duration,
    pub jitter_violation: bool,
    pub deadline_miss: bool,
}

/// Final counters of one task, returned by its thread when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskResult {
    pub iterations: u64,
    pub jitter_violations: u64,
    pub deadline_misses: u64,
    pub peak_jitter: Duration,
}

/// Folds activation records into a [`TaskResult`].
#[derive(Debug)]
pub struct JitterMonitor {
    config: MonitorConfig,
    result: TaskResult,
}

impl JitterMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            result: TaskResult::default(),
        }
    }

    pub fn observe(&mut self, record: &ActivationRecord) -> Observation {
        let jitter = record.jitter();
        let response_time = record.response_time(self.config.basis);

        let jitter_violation = jitter.is_some_and(|j| j > self.config.jitter_threshold);
        let deadline_miss = response_time > self.config.deadline;

        let r = &mut self.result;
        r.iterations += 1;
        if let Some(j) = jitter {
            r.peak_jitter = r.peak_jitter.max(j);
        }
        if jitter_violation {
            r.jitter_violations += 1;
        }
        if deadline_miss {
            r.deadline_misses += 1;
        }

        Observation {
            jitter,
            response_time,
            jitter_violation,
            deadline_miss,
        }
    }

    /// Counters so far.
    pub fn snapshot(&self) -> TaskResult {
        self.result
    }

    pub fn finish(self) -> TaskResult {
        self.result
    }
}

/// Milliseconds with three decimals, the unit every report line uses.
pub fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
