/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling policy binding.
//!
//! [`PolicyBinding`] is the single tagged description of how a task thread is
//! placed under the OS scheduler:
//!
//! | Variant | Linux class | Parameters | Activation pacing |
//! |---|---|---|---|
//! | `FixedPriority` | `SCHED_FIFO` | priority 1–99 | absolute `clock_nanosleep` |
//! | `Deadline` | `SCHED_DEADLINE` | runtime / deadline / period (ns) | kernel CBS + `sched_yield` |
//!
//! The OS calls themselves sit behind the [`SchedulerOps`] trait so the
//! binding logic (ordering, error classification) is identical for the real
//! [`LinuxScheduler`] and the [`NoopScheduler`] used by simulated runs.
//!
//! # Failure semantics
//! * `FixedPriority`: privilege is probed **once on the main thread** before
//!   any task thread exists (see [`probe_fixed_priority`]); a failure aborts
//!   the whole run.
//! * `Deadline`: admission is decided by the kernel per thread; a rejected
//!   thread fails alone and its sibling keeps running.

pub mod error;
pub mod feasibility;
pub mod linux;

pub use error::BindError;
pub use linux::LinuxScheduler;

use std::io;

use tracing::{debug, info};

use crate::activation::Pacing;
use crate::error::HarnessError;
use crate::task::TaskSpec;

// ── Policy selection ──────────────────────────────────────────────────────────

/// Which of the two scheduling disciplines an experiment runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Rate-monotonic on `SCHED_FIFO`.
    FixedPriority,
    /// Earliest-deadline-first on `SCHED_DEADLINE`.
    Deadline,
}

impl PolicyKind {
    pub fn label(self) -> &'static str {
        match self {
            PolicyKind::FixedPriority => "RM",
            PolicyKind::Deadline => "EDF",
        }
    }
}

// ── Kernel parameters ─────────────────────────────────────────────────────────

/// Parameters handed to `sched_setattr(SCHED_DEADLINE)`, all in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineAttr {
    pub runtime_ns: u64,
    pub deadline_ns: u64,
    pub period_ns: u64,
}

// ── PolicyBinding ─────────────────────────────────────────────────────────────

/// Scheduling class, its parameters and the core a task thread is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyBinding {
    FixedPriority {
        priority: i32,
        core: u32,
    },
    Deadline {
        runtime_ns: u64,
        deadline_ns: u64,
        period_ns: u64,
        core: u32,
    },
}

impl PolicyBinding {
    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicyBinding::FixedPriority { .. } => PolicyKind::FixedPriority,
            PolicyBinding::Deadline { .. } => PolicyKind::Deadline,
        }
    }

    pub fn core(&self) -> u32 {
        match *self {
            PolicyBinding::FixedPriority { core, .. } | PolicyBinding::Deadline { core, .. } => {
                core
            }
        }
    }

    /// How the activation engine paces a thread bound this way.
    pub fn pacing(&self) -> Pacing {
        match self {
            PolicyBinding::FixedPriority { .. } => Pacing::AbsoluteSleep,
            PolicyBinding::Deadline { .. } => Pacing::KernelPaced,
        }
    }

    /// Apply the binding to the **calling** thread.
    ///
    /// Must be called exactly once, as the first thing a task thread does and
    /// before it enters its periodic loop.  The thread is pinned first:
    /// affinity is part of the placement the kernel sees when it evaluates
    /// the scheduling class change.
    ///
    /// # Errors
    /// * [`BindError::Affinity`]: the core is outside the allowed CPU set.
    /// * [`BindError::Privilege`]: `SCHED_FIFO` was refused.
    /// * [`BindError::Admission`]: `SCHED_DEADLINE` was refused by
    ///   admission control (or for lack of privilege).
    pub fn apply(&self, ops: &dyn SchedulerOps) -> Result<(), BindError> {
        let core = self.core();
        ops.pin_to_core(core)
            .map_err(|source| BindError::Affinity { core, source })?;

        match *self {
            PolicyBinding::FixedPriority { priority, .. } => {
                ops.set_fixed_priority(priority)
                    .map_err(|source| BindError::Privilege { priority, source })?;
                debug!(priority, core, "SCHED_FIFO applied");
            }
            PolicyBinding::Deadline {
                runtime_ns,
                deadline_ns,
                period_ns,
                ..
            } => {
                let attr = DeadlineAttr {
                    runtime_ns,
                    deadline_ns,
                    period_ns,
                };
                ops.set_deadline(attr)
                    .map_err(|source| BindError::Admission { attr, source })?;
                debug!(runtime_ns, deadline_ns, period_ns, core, "SCHED_DEADLINE applied");
            }
        }
        Ok(())
    }
}

// ── SchedulerOps ──────────────────────────────────────────────────────────────

/// Thin seam over the OS scheduling calls.  Every method acts on the calling
/// thread.
pub trait SchedulerOps: Send + Sync {
    /// Check that the process may run threads under `SCHED_FIFO` at
    /// `priority` without leaving the caller's policy changed.
    fn probe_fixed_priority(&self, priority: i32) -> io::Result<()>;

    /// Switch the calling thread to `SCHED_FIFO` at `priority`.
    fn set_fixed_priority(&self, priority: i32) -> io::Result<()>;

    /// Switch the calling thread to `SCHED_DEADLINE`.
    fn set_deadline(&self, attr: DeadlineAttr) -> io::Result<()>;

    /// Restrict the calling thread to a single CPU core.
    fn pin_to_core(&self, core: u32) -> io::Result<()>;

    /// Give up the CPU.  Under `SCHED_DEADLINE` this ends the current job
    /// and defers the thread to its next period.
    fn yield_now(&self);
}

/// Scheduler used for `--simulate` runs: every request succeeds and nothing
/// about the calling thread changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl SchedulerOps for NoopScheduler {
    fn probe_fixed_priority(&self, _priority: i32) -> io::Result<()> {
        Ok(())
    }

    fn set_fixed_priority(&self, priority: i32) -> io::Result<()> {
        debug!(priority, "simulated SCHED_FIFO (no-op)");
        Ok(())
    }

    fn set_deadline(&self, attr: DeadlineAttr) -> io::Result<()> {
        debug!(?attr, "simulated SCHED_DEADLINE (no-op)");
        Ok(())
    }

    fn pin_to_core(&self, _core: u32) -> io::Result<()> {
        Ok(())
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}

// ── Up-front privilege check ──────────────────────────────────────────────────

/// Verify, before any task thread exists, that every fixed-priority task in
/// `tasks` can actually obtain `SCHED_FIFO`.
///
/// Probes once at the highest requested priority (the rlimit check is
/// monotonic in priority).  Deadline tasks are skipped: their admission is a
/// per-thread decision.
///
/// # Errors
/// [`HarnessError::Privilege`] with the OS error that refused the probe.
pub fn probe_fixed_priority(
    tasks: &[TaskSpec],
    ops: &dyn SchedulerOps,
) -> Result<(), HarnessError> {
    let highest = tasks
        .iter()
        .filter_map(|t| match t.binding {
            PolicyBinding::FixedPriority { priority, .. } => Some(priority),
            PolicyBinding::Deadline { .. } => None,
        })
        .max();

    let Some(priority) = highest else {
        return Ok(());
    };

    ops.probe_fixed_priority(priority)
        .map_err(|source| HarnessError::Privilege { priority, source })?;
    info!(priority, "SCHED_FIFO privilege confirmed");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records every call and fails the ones it is told to.
    #[derive(Default)]
    struct ScriptedOps {
        calls: Mutex<Vec<String>>,
        deny_fifo: bool,
        deny_deadline: bool,
        deny_pin: bool,
    }

    fn denied() -> io::Error {
        io::Error::from_raw_os_error(libc::EPERM)
    }

    impl SchedulerOps for ScriptedOps {
        fn probe_fixed_priority(&self, priority: i32) -> io::Result<()> {
            self.calls.lock().push(format!("probe {priority}"));
            if self.deny_fifo {
                Err(denied())
            } else {
                Ok(())
            }
        }
        fn set_fixed_priority(&self, priority: i32) -> io::Result<()> {
            self.calls.lock().push(format!("fifo {priority}"));
            if self.deny_fifo {
                Err(denied())
            } else {
                Ok(())
            }
        }
        fn set_deadline(&self, attr: DeadlineAttr) -> io::Result<()> {
            self.calls.lock().push(format!("deadline {}", attr.runtime_ns));
            if self.deny_deadline {
                Err(io::Error::from_raw_os_error(libc::EBUSY))
            } else {
                Ok(())
            }
        }
        fn pin_to_core(&self, core: u32) -> io::Result<()> {
            self.calls.lock().push(format!("pin {core}"));
            if self.deny_pin {
                Err(io::Error::from_raw_os_error(libc::EINVAL))
            } else {
                Ok(())
            }
        }
        fn yield_now(&self) {}
    }

    fn fifo(priority: i32, core: u32) -> PolicyBinding {
        PolicyBinding::FixedPriority { priority, core }
    }

    fn dl(core: u32) -> PolicyBinding {
        PolicyBinding::Deadline {
            runtime_ns: 9_000_000,
            deadline_ns: 10_000_000,
            period_ns: 20_000_000,
            core,
        }
    }

    #[test]
    fn fixed_priority_pins_then_sets_class() {
        let ops = ScriptedOps::default();
        fifo(94, 3).apply(&ops).unwrap();
        assert_eq!(*ops.calls.lock(), vec!["pin 3", "fifo 94"]);
    }

    #[test]
    fn deadline_pins_then_sets_attr() {
        let ops = ScriptedOps::default();
        dl(1).apply(&ops).unwrap();
        assert_eq!(*ops.calls.lock(), vec!["pin 1", "deadline 9000000"]);
    }

    #[test]
    fn fifo_refusal_is_privilege_error() {
        let ops = ScriptedOps {
            deny_fifo: true,
            ..Default::default()
        };
        let err = fifo(50, 0).apply(&ops).unwrap_err();
        assert!(matches!(err, BindError::Privilege { priority: 50, .. }));
    }

    #[test]
    fn deadline_refusal_is_admission_error_with_attr() {
        let ops = ScriptedOps {
            deny_deadline: true,
            ..Default::default()
        };
        let err = dl(0).apply(&ops).unwrap_err();
        match err {
            BindError::Admission { attr, .. } => assert_eq!(attr.period_ns, 20_000_000),
            other => panic!("expected Admission, got {other:?}"),
        }
    }

    #[test]
    fn pin_failure_stops_before_class_change() {
        let ops = ScriptedOps {
            deny_pin: true,
            ..Default::default()
        };
        let err = fifo(10, 7).apply(&ops).unwrap_err();
        assert!(matches!(err, BindError::Affinity { core: 7, .. }));
        assert_eq!(*ops.calls.lock(), vec!["pin 7"]);
    }

    #[test]
    fn pacing_follows_policy() {
        assert_eq!(fifo(1, 0).pacing(), Pacing::AbsoluteSleep);
        assert_eq!(dl(0).pacing(), Pacing::KernelPaced);
        assert_eq!(dl(0).kind(), PolicyKind::Deadline);
    }

    // ── probe_fixed_priority ──────────────────────────────────────────────────

    fn spec(binding: PolicyBinding) -> TaskSpec {
        TaskSpec {
            id: 1,
            role: crate::task::Role::Producer,
            period_ms: 10,
            deadline_ms: 10,
            binding,
        }
    }

    #[test]
    fn probe_uses_highest_requested_priority() {
        let ops = ScriptedOps::default();
        probe_fixed_priority(&[spec(fifo(40, 0)), spec(fifo(94, 0))], &ops).unwrap();
        assert_eq!(*ops.calls.lock(), vec!["probe 94"]);
    }

    #[test]
    fn probe_failure_is_fatal_privilege_error() {
        let ops = ScriptedOps {
            deny_fifo: true,
            ..Default::default()
        };
        let err = probe_fixed_priority(&[spec(fifo(40, 0))], &ops).unwrap_err();
        assert!(matches!(err, HarnessError::Privilege { priority: 40, .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn probe_skips_deadline_tasks() {
        let ops = ScriptedOps {
            deny_fifo: true,
            ..Default::default()
        };
        probe_fixed_priority(&[spec(dl(0)), spec(dl(1))], &ops).unwrap();
        assert!(ops.calls.lock().is_empty());
    }
}
