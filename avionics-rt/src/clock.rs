/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic time source for the activation engine and the workload.
//!
//! Every timestamp in the harness is a nanosecond count on `CLOCK_MONOTONIC`.
//! Two clocks implement the [`Clock`] trait:
//!
//! * [`MonotonicClock`]: the real one.  `sleep_until` is an absolute
//!   `clock_nanosleep(TIMER_ABSTIME)`, so the wake-up target never depends on
//!   when the caller happened to go to sleep.
//! * [`VirtualClock`]: a per-task simulated timeline.  Sleeping jumps the
//!   clock to the target (plus an optional fixed wake-up latency) and spinning
//!   advances it by exactly the requested cost.  Used by `--simulate` runs and
//!   by tests that need deterministic jitter / response times.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// Absolute point on the monotonic clock, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(ns: u64) -> Self {
        Timestamp(ns)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// `self + d`, saturating at `u64::MAX` ns.
    pub fn saturating_add(self, d: Duration) -> Self {
        let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(ns))
    }

    /// Absolute distance between two timestamps, regardless of order.
    pub fn abs_diff(self, other: Timestamp) -> Duration {
        Duration::from_nanos(self.0.abs_diff(other.0))
    }

    /// `self - earlier`, or zero if `earlier` is later than `self`.
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

// ── Clock trait ───────────────────────────────────────────────────────────────

/// Time source owned (by reference) by one task thread.
pub trait Clock: Send + Sync {
    /// Current monotonic time.
    fn now(&self) -> Timestamp;

    /// Block until the absolute time `target`.  Returns immediately when
    /// `target` is already in the past.
    fn sleep_until(&self, target: Timestamp);

    /// Consume CPU for `d` without blocking.
    ///
    /// The default implementation busy-waits on [`now`](Self::now) so the
    /// consumed time is visible to the OS scheduler as runnable work.
    fn spin_for(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        let end = self.now().saturating_add(d);
        while self.now() < end {
            std::hint::spin_loop();
        }
    }
}

// ── MonotonicClock ────────────────────────────────────────────────────────────

/// `CLOCK_MONOTONIC` backed clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

const NANOS_PER_SEC: u64 = 1_000_000_000;

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        // SAFETY: an all-zero timespec is valid; `ts` is writable and
        // CLOCK_MONOTONIC is always available on the supported platforms.
        let ts = unsafe {
            let mut ts: libc::timespec = std::mem::zeroed();
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
            ts
        };
        Timestamp(ts.tv_sec as u64 * NANOS_PER_SEC + ts.tv_nsec as u64)
    }

    #[cfg(target_os = "linux")]
    fn sleep_until(&self, target: Timestamp) {
        // SAFETY: an all-zero timespec is valid.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = (target.0 / NANOS_PER_SEC) as libc::time_t;
        ts.tv_nsec = (target.0 % NANOS_PER_SEC) as _;
        loop {
            // SAFETY: `ts` is a valid timespec; the remaining-time pointer may
            // be null for TIMER_ABSTIME sleeps.
            let rc = unsafe {
                libc::clock_nanosleep(
                    libc::CLOCK_MONOTONIC,
                    libc::TIMER_ABSTIME,
                    &ts,
                    std::ptr::null_mut(),
                )
            };
            // clock_nanosleep returns the error number directly; an absolute
            // sleep interrupted by a signal is simply restarted.
            if rc != libc::EINTR {
                break;
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn sleep_until(&self, target: Timestamp) {
        let remaining = target.saturating_duration_since(self.now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

// ── VirtualClock ──────────────────────────────────────────────────────────────

/// Simulated timeline for one task.
///
/// Time only moves when the task sleeps or spins, so a run on a
/// `VirtualClock` produces the same jitter and response times on every host.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now_ns: AtomicU64,
    wake_latency: Duration,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wake-up from [`sleep_until`](Clock::sleep_until) lands `latency`
    /// after the requested target.
    pub fn with_wake_latency(latency: Duration) -> Self {
        Self {
            now_ns: AtomicU64::new(0),
            wake_latency: latency,
        }
    }

    /// Move the clock forward by `d` (models time the task spent preempted).
    pub fn advance(&self, d: Duration) {
        let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.now_ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ns.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, target: Timestamp) {
        let wake = target.saturating_add(self.wake_latency).as_nanos();
        self.now_ns.fetch_max(wake, Ordering::SeqCst);
    }

    fn spin_for(&self, d: Duration) {
        self.advance(d);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
