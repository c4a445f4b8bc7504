/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single-slot channels: the newest sample overwrites the previous one.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use super::{TelemetryChannel, TelemetrySample};

// ── RacySlot ──────────────────────────────────────────────────────────────────

/// Latest-altitude slot shared with no ordering guarantees.
///
/// The value and the "new data" flag are two independent relaxed atomics.
/// A reader can observe the flag before the matching value (or a value from
/// a later publish), which is exactly the unsynchronised sharing whose
/// effect on jitter the `rm-shared` scenario measures.  No torn `f32` is
/// possible: the value itself is stored as one 32-bit word.
#[derive(Debug)]
pub struct RacySlot {
    altitude_bits: AtomicU32,
    fresh: AtomicBool,
}

impl RacySlot {
    pub fn new() -> Self {
        Self {
            altitude_bits: AtomicU32::new(0),
            fresh: AtomicBool::new(false),
        }
    }
}

impl Default for RacySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryChannel for RacySlot {
    fn publish(&self, sample: TelemetrySample) {
        self.altitude_bits
            .store(sample.altitude.to_bits(), Ordering::Relaxed);
        if self
            .fresh
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            trace!("racy slot overwrote an unconsumed sample");
        }
    }

    fn drain_pending(&self, out: &mut Vec<TelemetrySample>) -> usize {
        if !self.fresh.swap(false, Ordering::Relaxed) {
            return 0;
        }
        let altitude = f32::from_bits(self.altitude_bits.load(Ordering::Relaxed));
        out.push(TelemetrySample::new(altitude));
        1
    }
}

// ── LockedSlot ────────────────────────────────────────────────────────────────

/// Latest-sample slot guarded by a mutex, for runs that need correct
/// hand-over instead of the racy behaviour.
#[derive(Debug, Default)]
pub struct LockedSlot {
    slot: Mutex<Option<TelemetrySample>>,
    ready: Condvar,
}

impl LockedSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocking read for non-real-time observers: wait up to `timeout` for a
    /// sample, then take it.  Returns `None` on timeout.
    ///
    /// Never call this from a periodic task; the task loop uses the
    /// non-blocking [`drain_pending`](TelemetryChannel::drain_pending).
    pub fn wait_latest(&self, timeout: Duration) -> Option<TelemetrySample> {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            let _ = self
                .ready
                .wait_while_for(&mut slot, |s| s.is_none(), timeout);
        }
        slot.take()
    }
}

impl TelemetryChannel for LockedSlot {
    fn publish(&self, sample: TelemetrySample) {
        *self.slot.lock() = Some(sample);
        self.ready.notify_one();
    }

    fn drain_pending(&self, out: &mut Vec<TelemetrySample>) -> usize {
        match self.slot.lock().take() {
            Some(sample) => {
                out.push(sample);
                1
            }
            None => 0,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
