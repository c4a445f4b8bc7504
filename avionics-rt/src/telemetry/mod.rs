/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Telemetry channel between the producer and the consumer task.
//!
//! The harness only relies on a two-call contract:
//!
//! * [`publish`](TelemetryChannel::publish): fire-and-forget, never blocks,
//!   no acknowledgement.
//! * [`drain_pending`](TelemetryChannel::drain_pending): non-blocking,
//!   returns every sample that arrived since the previous drain (possibly
//!   none).  Consumers keep only the latest valid one.
//!
//! Three implementations are selectable per experiment ([`ChannelKind`]):
//!
//! | Kind | Type | Consistency |
//! |---|---|---|
//! | `bus` | [`TelemetryBus`] | bounded queue, oldest sample dropped when full |
//! | `racy` | [`RacySlot`] | single slot, relaxed atomics, value and flag may tear |
//! | `locked` | [`LockedSlot`] | single slot under a mutex |
//!
//! `racy` exists to reproduce the effect of unsynchronised sharing on the
//! measured jitter.  Do not use it as a model for production code.

mod bus;
mod slot;

pub use bus::{TelemetryBus, DEFAULT_BUS_CAPACITY};
pub use slot::{LockedSlot, RacySlot};

use std::sync::Arc;

use serde::Deserialize;

// ── TelemetrySample ───────────────────────────────────────────────────────────

/// One altitude reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Simulated altitude, in feet.
    pub altitude: f32,
    /// `false` for transport-level placeholders that carry no data.
    pub valid: bool,
}

impl TelemetrySample {
    pub fn new(altitude: f32) -> Self {
        Self {
            altitude,
            valid: true,
        }
    }
}

// ── Channel contract ──────────────────────────────────────────────────────────

pub trait TelemetryChannel: Send + Sync {
    /// Hand a sample to the channel.  Never blocks; delivery is best effort.
    fn publish(&self, sample: TelemetrySample);

    /// Append every pending sample to `out` and return how many were added.
    /// Never blocks.
    fn drain_pending(&self, out: &mut Vec<TelemetrySample>) -> usize;

    /// Drain and keep only the most recent valid sample; stale ones are
    /// discarded.  `scratch` is cleared and reused to avoid allocating in the
    /// periodic loop.
    fn take_latest(&self, scratch: &mut Vec<TelemetrySample>) -> Option<TelemetrySample> {
        scratch.clear();
        self.drain_pending(scratch);
        scratch.iter().rev().find(|s| s.valid).copied()
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Which channel connects the two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    /// In-process publish / subscribe bus.
    Bus,
    /// Unsynchronised single slot (intentional race).
    Racy,
    /// Mutex-guarded single slot.
    Locked,
    /// No channel: each task runs an independent recovery simulation.
    None,
}

impl ChannelKind {
    /// Open a fresh channel of this kind, or `None` for [`ChannelKind::None`].
    pub fn open(self) -> Option<Arc<dyn TelemetryChannel>> {
        match self {
            ChannelKind::Bus => Some(Arc::new(TelemetryBus::new(DEFAULT_BUS_CAPACITY))),
            ChannelKind::Racy => Some(Arc::new(RacySlot::new())),
            ChannelKind::Locked => Some(Arc::new(LockedSlot::new())),
            ChannelKind::None => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::Bus => "BUS",
            ChannelKind::Racy => "RACY SLOT",
            ChannelKind::Locked => "LOCKED SLOT",
            ChannelKind::None => "NO CHANNEL",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
