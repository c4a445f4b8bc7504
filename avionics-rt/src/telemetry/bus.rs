/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-process publish / subscribe bus.
//!
//! Stands in for the external DDS-style transport: one writer, one reader,
//! asynchronous delivery, no acknowledgement.  Backed by a bounded
//! `crossbeam-channel` so a stalled consumer cannot grow memory without
//! limit; when the queue is full the oldest pending sample is evicted.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::trace;

use super::{TelemetryChannel, TelemetrySample};

/// Queue depth of [`ChannelKind::Bus`](super::ChannelKind::Bus).
///
/// Far more than a consumer can fall behind in practice (the slowest
/// supported consumer period is still within a few producer periods).
pub const DEFAULT_BUS_CAPACITY: usize = 64;

pub struct TelemetryBus {
    tx: Sender<TelemetrySample>,
    rx: Receiver<TelemetrySample>,
}

impl TelemetryBus {
    /// Create a bus holding at most `capacity` undelivered samples
    /// (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Samples published but not yet drained.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl TelemetryChannel for TelemetryBus {
    fn publish(&self, sample: TelemetrySample) {
        let mut sample = sample;
        loop {
            match self.tx.try_send(sample) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    // Evict the oldest entry; a concurrent drain may have
                    // freed space already, in which case this is a no-op.
                    if self.rx.try_recv().is_ok() {
                        trace!("telemetry bus full, dropped oldest sample");
                    }
                    sample = rejected;
                }
                // Both ends live in `self`, so the channel cannot be
                // disconnected while a publish is in progress.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    fn drain_pending(&self, out: &mut Vec<TelemetrySample>) -> usize {
        let before = out.len();
        out.extend(self.rx.try_iter());
        out.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_samples_in_publish_order() {
        let bus = TelemetryBus::new(8);
        for alt in [15_000.0, 14_800.0, 14_600.0] {
            bus.publish(TelemetrySample::new(alt));
        }
        let mut out = Vec::new();
        assert_eq!(bus.drain_pending(&mut out), 3);
        let alts: Vec<f32> = out.iter().map(|s| s.altitude).collect();
        assert_eq!(alts, vec![15_000.0, 14_800.0, 14_600.0]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn drain_on_empty_bus_returns_zero_without_blocking() {
        let bus = TelemetryBus::new(4);
        let mut out = Vec::new();
        assert_eq!(bus.drain_pending(&mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn full_bus_evicts_oldest_and_keeps_newest() {
        let bus = TelemetryBus::new(2);
        for alt in [1.0, 2.0, 3.0, 4.0] {
            bus.publish(TelemetrySample::new(alt));
        }
        assert_eq!(bus.pending(), 2);
        let mut out = Vec::new();
        bus.drain_pending(&mut out);
        let alts: Vec<f32> = out.iter().map(|s| s.altitude).collect();
        assert_eq!(alts, vec![3.0, 4.0]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let bus = TelemetryBus::new(0);
        bus.publish(TelemetrySample::new(7.0));
        bus.publish(TelemetrySample::new(8.0));
        let mut out = Vec::new();
        bus.drain_pending(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].altitude, 8.0);
    }
}
