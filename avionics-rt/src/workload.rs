/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-iteration work of the two periodic tasks.
//!
//! Every workload is a pure step function:
//!
//! ```text
//! (state, Option<latest sample>) ──step()──► (state', Step { cost, publish, status })
//! ```
//!
//! A step never blocks, never reads a clock and never touches the channel.
//! The task loop drains the channel before the step, publishes what the step
//! returns, then burns [`Step::cost`] through a [`CostModel`].  Keeping the
//! altitude logic free of timing makes the simulated flight path identical
//! whatever the scheduler does to the thread.
//!
//! | Workload | Used when | Per-iteration cost |
//! |---|---|---|
//! | [`Producer`] | channel present, task 1 | 2 ms |
//! | [`Consumer`] | channel present, task 2 | 15 ms critical, 1 ms otherwise |
//! | [`Recovery`] | no channel | 1 ms base + 15 ms recovering / 1 ms otherwise |

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::clock::Clock;
use crate::task::Role;
use crate::telemetry::TelemetrySample;

// ── Flight envelope ───────────────────────────────────────────────────────────

/// Altitude change per iteration, in feet.
pub const ALTITUDE_STEP: f32 = 200.0;
/// Producer starts here, descending.
pub const PRODUCER_CEILING: f32 = 15_000.0;
/// Producer turns back up at or below this altitude.
pub const PRODUCER_FLOOR: f32 = 1_000.0;
/// Below this the consumer pulls up.
pub const CRITICAL_LOW: f32 = 2_500.0;
/// At or above this the consumer pulls down.
pub const CRITICAL_HIGH: f32 = 13_000.0;

const PRODUCER_COST: Duration = Duration::from_millis(2);
const CRITICAL_COST: Duration = Duration::from_millis(15);
const NOMINAL_COST: Duration = Duration::from_millis(1);
const SENSOR_BASE_COST: Duration = Duration::from_millis(1);

// ── Classification ────────────────────────────────────────────────────────────

/// Where an altitude sits relative to the consumer's critical thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    CriticalLow,
    Nominal,
    CriticalHigh,
}

impl Band {
    pub fn classify(altitude: f32) -> Band {
        if altitude < CRITICAL_LOW {
            Band::CriticalLow
        } else if altitude >= CRITICAL_HIGH {
            Band::CriticalHigh
        } else {
            Band::Nominal
        }
    }
}

/// What a step decided, for the per-iteration log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Published,
    PullUp,
    PullDown,
    Climb,
    Stable,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Published => "SENT",
            Status::PullUp => "PULL UP",
            Status::PullDown => "PULL DOWN",
            Status::Climb => "CLIMB",
            Status::Stable => "STABLE",
        };
        f.write_str(s)
    }
}

/// Outcome of one workload step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Execution time the iteration must consume.
    pub cost: Duration,
    /// Altitude as seen by this task after the step.
    pub altitude: f32,
    pub status: Status,
    /// Sample to hand to the channel, if any.
    pub publish: Option<TelemetrySample>,
}

// ── Producer ──────────────────────────────────────────────────────────────────

/// Triangle-wave altitude source: 15 000 → 1 000 → 15 000 … in steps of 200.
#[derive(Debug, Clone, PartialEq)]
pub struct Producer {
    altitude: f32,
    descending: bool,
}

impl Producer {
    pub fn new() -> Self {
        Self {
            altitude: PRODUCER_CEILING,
            descending: true,
        }
    }

    /// Publish the current altitude, then advance the wave.
    pub fn step(&mut self) -> Step {
        let sample = TelemetrySample::new(self.altitude);

        if self.descending {
            self.altitude -= ALTITUDE_STEP;
            if self.altitude <= PRODUCER_FLOOR {
                self.descending = false;
            }
        } else {
            self.altitude += ALTITUDE_STEP;
            if self.altitude >= PRODUCER_CEILING {
                self.descending = true;
            }
        }

        Step {
            cost: PRODUCER_COST,
            altitude: sample.altitude,
            status: Status::Published,
            publish: Some(sample),
        }
    }
}

impl Default for Producer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Consumer ──────────────────────────────────────────────────────────────────

/// Reacts to the latest received altitude.
///
/// The last known altitude is kept across iterations that receive nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumer {
    altitude: f32,
}

impl Consumer {
    pub fn new() -> Self {
        Self {
            altitude: PRODUCER_CEILING,
        }
    }

    pub fn step(&mut self, latest: Option<TelemetrySample>) -> Step {
        let Some(sample) = latest.filter(|s| s.valid) else {
            return Step {
                cost: NOMINAL_COST,
                altitude: self.altitude,
                status: Status::Stable,
                publish: None,
            };
        };

        self.altitude = sample.altitude;
        let (status, cost) = match Band::classify(self.altitude) {
            Band::CriticalLow => (Status::PullUp, CRITICAL_COST),
            Band::CriticalHigh => (Status::PullDown, CRITICAL_COST),
            Band::Nominal => (Status::Climb, NOMINAL_COST),
        };
        Step {
            cost,
            altitude: self.altitude,
            status,
            publish: None,
        }
    }
}

impl Default for Consumer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Recovery ──────────────────────────────────────────────────────────────────

/// Which envelope edge an independent recovery simulation guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// Sinks from 4 000; pulls up below 2 500 until above 4 500.
    Low,
    /// Climbs from 12 000; pulls down above 15 000 until below 13 000.
    High,
}

/// Self-contained altitude simulation with hysteresis, used when the two
/// tasks share no channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    envelope: Envelope,
    altitude: f32,
    recovering: bool,
}

const RECOVERY_CORRECTION: f32 = 500.0;

impl Recovery {
    pub fn new(envelope: Envelope) -> Self {
        let altitude = match envelope {
            Envelope::Low => 4_000.0,
            Envelope::High => 12_000.0,
        };
        Self {
            envelope,
            altitude,
            recovering: false,
        }
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    pub fn step(&mut self) -> Step {
        let status = match self.envelope {
            Envelope::Low => {
                self.altitude -= ALTITUDE_STEP;
                if self.altitude < 2_500.0 {
                    self.recovering = true;
                }
                if self.altitude > 4_500.0 {
                    self.recovering = false;
                }
                if self.recovering {
                    self.altitude += RECOVERY_CORRECTION;
                    Status::PullUp
                } else {
                    Status::Stable
                }
            }
            Envelope::High => {
                self.altitude += ALTITUDE_STEP;
                if self.altitude > 15_000.0 {
                    self.recovering = true;
                }
                if self.altitude < 13_000.0 {
                    self.recovering = false;
                }
                if self.recovering {
                    self.altitude -= RECOVERY_CORRECTION;
                    Status::PullDown
                } else {
                    Status::Climb
                }
            }
        };

        let work = if self.recovering {
            CRITICAL_COST
        } else {
            NOMINAL_COST
        };
        Step {
            cost: SENSOR_BASE_COST + work,
            altitude: self.altitude,
            status,
            publish: None,
        }
    }
}

// ── Workload ──────────────────────────────────────────────────────────────────

/// The body a task thread runs each period.
#[derive(Debug, Clone, PartialEq)]
pub enum Workload {
    Producer(Producer),
    Consumer(Consumer),
    Recovery(Recovery),
}

impl Workload {
    /// Pick the body for `role`.  Without a channel the producer / consumer
    /// pair degrades to the two independent recovery simulations.
    pub fn for_role(role: Role, has_channel: bool) -> Self {
        match (role, has_channel) {
            (Role::Producer, true) => Workload::Producer(Producer::new()),
            (Role::Consumer, true) => Workload::Consumer(Consumer::new()),
            (Role::Producer, false) => Workload::Recovery(Recovery::new(Envelope::Low)),
            (Role::Consumer, false) => Workload::Recovery(Recovery::new(Envelope::High)),
        }
    }

    /// `true` when the step wants the latest channel sample.
    pub fn consumes(&self) -> bool {
        matches!(self, Workload::Consumer(_))
    }

    pub fn step(&mut self, latest: Option<TelemetrySample>) -> Step {
        match self {
            Workload::Producer(p) => p.step(),
            Workload::Consumer(c) => c.step(latest),
            Workload::Recovery(r) => r.step(),
        }
    }

    /// Largest [`Step::cost`] this body can return.
    pub fn worst_case_cost(&self) -> Duration {
        match self {
            Workload::Producer(_) => PRODUCER_COST,
            Workload::Consumer(_) => CRITICAL_COST,
            Workload::Recovery(_) => SENSOR_BASE_COST + CRITICAL_COST,
        }
    }

    /// Row tag for logs and the report.
    pub fn tag(&self) -> &'static str {
        match self {
            Workload::Producer(_) => "PUB",
            Workload::Consumer(_) => "SUB",
            Workload::Recovery(r) => match r.envelope {
                Envelope::Low => "LOW",
                Envelope::High => "HIGH",
            },
        }
    }
}

// ── Cost model ────────────────────────────────────────────────────────────────

/// Selects how a [`CostModel`] is built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CostKind {
    Spin,
    Zero,
    Scaled,
}

/// How a step's nominal cost turns into consumed CPU time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostModel {
    /// Busy-wait the full cost.
    Spin,
    /// Consume nothing; only scheduling overhead is measured.
    Zero,
    /// Busy-wait `cost × factor`.
    Scaled(f64),
}

impl CostModel {
    /// Time actually consumed for a nominal `cost`.
    pub fn effective(&self, cost: Duration) -> Duration {
        match *self {
            CostModel::Spin => cost,
            CostModel::Zero => Duration::ZERO,
            // `as` saturates; a negative or NaN factor ends up as zero.
            CostModel::Scaled(factor) => {
                Duration::from_nanos((cost.as_nanos() as f64 * factor) as u64)
            }
        }
    }

    /// Burn the effective cost on `clock`.
    pub fn spend(&self, cost: Duration, clock: &dyn Clock) {
        clock.spin_for(self.effective(cost));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
