/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic activation engine.
//!
//! One engine drives one task thread through `INIT → LOOP → DONE`:
//!
//! ```text
//!  new()            next()                 next() … (iterations times)        None
//!  INIT ──────────► wait ─► Activation ──► wait ─► Activation ──► … ───────► DONE
//!  nominal₀ = now   nominalᵢ₊₁ = nominalᵢ + period  (never "now + period")
//! ```
//!
//! The engine only *produces* activation instants.  Timing the work and
//! judging it belongs to the [`monitor`](crate::monitor).
//!
//! # Pacing
//! * [`Pacing::AbsoluteSleep`]: the thread blocks in an absolute
//!   `clock_nanosleep` until the next nominal instant.  Because the target is
//!   derived from the previous target and not from the wake-up time, an
//!   overrunning iteration shortens the following sleep instead of shifting
//!   every later activation.
//! * [`Pacing::KernelPaced`]: `SCHED_DEADLINE` decides when the thread runs.
//!   The engine yields (ending the current job) and tracks an *expected*
//!   arrival seeded from the first real start, purely for measurement.
//!   Iteration 0 therefore carries no jitter sample.

use std::time::Duration;

use crate::clock::{Clock, Timestamp};
use crate::policy::SchedulerOps;

// ── Configuration ─────────────────────────────────────────────────────────────

/// How a task thread is suspended between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    AbsoluteSleep,
    KernelPaced,
}

/// When a task's periodic loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Run for a wall-clock budget: `test_duration_ms / period_ms` iterations.
    Duration { test_duration_ms: u64 },
    /// Run a fixed number of iterations regardless of period.
    Iterations(u64),
}

impl Termination {
    /// Number of iterations a task with `period_ms` performs.
    pub fn iterations(&self, period_ms: u64) -> u64 {
        match *self {
            Termination::Duration { test_duration_ms } => {
                test_duration_ms.checked_div(period_ms).unwrap_or(0)
            }
            Termination::Iterations(n) => n,
        }
    }
}

// ── Activation ────────────────────────────────────────────────────────────────

/// One release of the task, as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    /// 0-based iteration number.
    pub index: u64,
    /// When the task should have started.
    pub nominal: Timestamp,
    /// When the task actually started.
    pub start: Timestamp,
    /// `false` when `nominal` was seeded from `start` and carries no
    /// information (iteration 0 under kernel pacing).
    pub measured: bool,
}

// ── ActivationEngine ──────────────────────────────────────────────────────────

/// Iterator over the activations of one task.
pub struct ActivationEngine<'a> {
    clock: &'a dyn Clock,
    sched: &'a dyn SchedulerOps,
    pacing: Pacing,
    period: Duration,
    nominal: Timestamp,
    index: u64,
    iterations: u64,
}

impl<'a> ActivationEngine<'a> {
    /// INIT: capture the reference instant all nominal activations derive from.
    pub fn new(
        clock: &'a dyn Clock,
        sched: &'a dyn SchedulerOps,
        pacing: Pacing,
        period: Duration,
        iterations: u64,
    ) -> Self {
        let nominal = clock.now();
        Self {
            clock,
            sched,
            pacing,
            period,
            nominal,
            index: 0,
            iterations,
        }
    }

    /// Iterations still to run.
    pub fn remaining(&self) -> u64 {
        self.iterations - self.index
    }

    fn wait_absolute(&mut self) -> Activation {
        self.nominal = self.nominal.saturating_add(self.period);
        self.clock.sleep_until(self.nominal);
        Activation {
            index: self.index,
            nominal: self.nominal,
            start: self.clock.now(),
            measured: true,
        }
    }

    fn wait_kernel_paced(&mut self) -> Activation {
        self.sched.yield_now();
        let start = self.clock.now();
        let measured = self.index > 0;
        self.nominal = if measured {
            self.nominal.saturating_add(self.period)
        } else {
            start
        };
        Activation {
            index: self.index,
            nominal: self.nominal,
            start,
            measured,
        }
    }
}

impl Iterator for ActivationEngine<'_> {
    type Item = Activation;

    /// Block until the next activation; `None` once the loop is DONE.
    fn next(&mut self) -> Option<Activation> {
        if self.index >= self.iterations {
            return None;
        }
        let activation = match self.pacing {
            Pacing::AbsoluteSleep => self.wait_absolute(),
            Pacing::KernelPaced => self.wait_kernel_paced(),
        };
        self.index += 1;
        Some(activation)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
