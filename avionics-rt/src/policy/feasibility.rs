/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pre-run utilisation checks for the two supported policies.
//!
//! # Status: warning only
//!
//! Both checks are **computed and logged** before the task threads start.
//! They never stop a run: an experiment that overloads a core is a valid
//! experiment, and the measured deadline misses are the result.
//!
//! # Theory
//! **Rate Monotonic, Liu & Layland (1973)**: `n` independent periodic tasks
//! on one CPU are guaranteed schedulable if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq n \left(2^{1/n} - 1\right)$$
//!
//! | n | Bound |
//! |---|---|
//! | 1 | 1.000 |
//! | 2 | 0.828 |
//! | ∞ | ln(2) ≈ 0.693 |
//!
//! **EDF / `SCHED_DEADLINE`**: the kernel admits reservations while the sum of
//! `runtime / period` stays within the RT bandwidth limit
//! (`sched_rt_runtime_us / sched_rt_period_us`, 0.95 by default).  The check
//! here mirrors that per core, so a warning predicts an `EBUSY` from
//! admission control.
//!
//! `C_i` for RM is the workload's worst-case per-period cost, which is known
//! statically (see [`Workload::worst_case_cost`](crate::workload::Workload::worst_case_cost)).

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::policy::PolicyBinding;
use crate::task::TaskSpec;

/// Default Linux RT bandwidth: 950 000 µs of every 1 000 000 µs.
pub const DEADLINE_BANDWIDTH_LIMIT: f64 = 0.95;

// ── Public API ────────────────────────────────────────────────────────────────

/// Compute the Liu & Layland utilisation upper bound for `n` tasks.
///
/// `U_bound(n) = n × (2^(1/n) − 1)`
///
/// Returns `1.0` for `n = 1` and `0.0` for `n = 0`.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// Check a set of per-task utilisations sharing one CPU against the Liu &
/// Layland bound.
///
/// Returns `None` if the set is **provably schedulable** under RM
/// (`U ≤ bound`), `Some(total_utilisation)` otherwise.
pub fn check_liu_layland(utilizations: &[f64]) -> Option<f64> {
    if utilizations.is_empty() {
        return None;
    }
    let total: f64 = utilizations.iter().sum();
    if total > liu_layland_bound(utilizations.len()) {
        Some(total)
    } else {
        None
    }
}

/// Check the reserved `SCHED_DEADLINE` bandwidth of one CPU.
///
/// Returns `Some(total_bandwidth)` when `Σ runtime / period` exceeds
/// [`DEADLINE_BANDWIDTH_LIMIT`].
pub fn check_deadline_bandwidth(bandwidths: &[f64]) -> Option<f64> {
    let total: f64 = bandwidths.iter().sum();
    if total > DEADLINE_BANDWIDTH_LIMIT {
        Some(total)
    } else {
        None
    }
}

/// Log one warning per overloaded core for the given task set.
///
/// `worst_case_cost` supplies each task's per-period execution cost (used for
/// the RM check; the EDF check uses the reserved runtime instead).  Returns
/// the ids of cores that triggered a warning, in ascending order.
pub fn warn_if_overloaded(
    tasks: &[TaskSpec],
    worst_case_cost: impl Fn(&TaskSpec) -> Duration,
) -> Vec<u32> {
    // BTreeMap → cores reported in ascending order.
    let mut rm: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut edf: BTreeMap<u32, Vec<f64>> = BTreeMap::new();

    for task in tasks {
        match task.binding {
            PolicyBinding::FixedPriority { core, .. } => {
                rm.entry(core)
                    .or_default()
                    .push(task.utilization(worst_case_cost(task)));
            }
            PolicyBinding::Deadline {
                runtime_ns,
                period_ns,
                core,
                ..
            } => {
                let bw = if period_ns == 0 {
                    0.0
                } else {
                    runtime_ns as f64 / period_ns as f64
                };
                edf.entry(core).or_default().push(bw);
            }
        }
    }

    let mut flagged = Vec::new();

    for (core, utils) in &rm {
        match check_liu_layland(utils) {
            Some(u) => {
                warn!(
                    core = core,
                    tasks = utils.len(),
                    utilization = format_args!("{:.3}", u),
                    bound = format_args!("{:.3}", liu_layland_bound(utils.len())),
                    "RM utilisation exceeds the Liu & Layland bound, deadline misses are possible"
                );
                flagged.push(*core);
            }
            None => info!(
                core = core,
                utilization = format_args!("{:.3}", utils.iter().sum::<f64>()),
                "RM task set within the Liu & Layland bound"
            ),
        }
    }

    for (core, bws) in &edf {
        if let Some(total) = check_deadline_bandwidth(bws) {
            warn!(
                core = core,
                bandwidth = format_args!("{:.3}", total),
                limit = DEADLINE_BANDWIDTH_LIMIT,
                "reserved SCHED_DEADLINE bandwidth exceeds the kernel limit, admission will likely be rejected"
            );
            if !flagged.contains(core) {
                flagged.push(*core);
            }
        }
    }

    flagged.sort_unstable();
    flagged
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Role;

    fn fifo_task(period_ms: u64, core: u32) -> TaskSpec {
        TaskSpec {
            id: 1,
            role: Role::Producer,
            period_ms,
            deadline_ms: period_ms,
            binding: PolicyBinding::FixedPriority { priority: 50, core },
        }
    }

    fn dl_task(runtime_ms: u64, period_ms: u64, core: u32) -> TaskSpec {
        TaskSpec {
            id: 2,
            role: Role::Consumer,
            period_ms,
            deadline_ms: period_ms,
            binding: PolicyBinding::Deadline {
                runtime_ns: runtime_ms * 1_000_000,
                deadline_ns: period_ms * 1_000_000,
                period_ns: period_ms * 1_000_000,
                core,
            },
        }
    }

    #[test]
    fn bound_zero_tasks_is_zero() {
        assert_eq!(liu_layland_bound(0), 0.0);
    }

    #[test]
    fn bound_one_task_is_one() {
        let b = liu_layland_bound(1);
        assert!((b - 1.0).abs() < 1e-10, "bound(1) should be 1.0, got {b}");
    }

    #[test]
    fn bound_two_tasks_is_approximately_0_828() {
        let b = liu_layland_bound(2);
        assert!((b - 0.8284).abs() < 1e-3, "bound(2) ≈ 0.828, got {b}");
    }

    #[test]
    fn two_light_tasks_are_feasible() {
        assert!(check_liu_layland(&[0.3, 0.4]).is_none());
    }

    #[test]
    fn two_heavy_tasks_exceed_bound() {
        let u = check_liu_layland(&[0.5, 0.4]).unwrap();
        assert!((u - 0.9).abs() < 1e-9);
    }

    #[test]
    fn empty_set_is_feasible() {
        assert!(check_liu_layland(&[]).is_none());
        assert!(check_deadline_bandwidth(&[]).is_none());
    }

    #[test]
    fn deadline_bandwidth_under_limit_passes() {
        assert!(check_deadline_bandwidth(&[0.5, 0.4]).is_none());
        assert!(check_deadline_bandwidth(&[0.9, 0.9]).is_some());
    }

    #[test]
    fn shared_core_rm_overload_is_flagged() {
        // 15 ms of work every 20 ms plus 2 ms every 10 ms on core 0 → U = 0.95
        let tasks = [fifo_task(10, 0), fifo_task(20, 0)];
        let flagged = warn_if_overloaded(&tasks, |t| {
            if t.period_ms == 10 {
                Duration::from_millis(2)
            } else {
                Duration::from_millis(15)
            }
        });
        assert_eq!(flagged, vec![0]);
    }

    #[test]
    fn split_cores_are_checked_independently() {
        let tasks = [fifo_task(10, 0), fifo_task(20, 1)];
        let flagged = warn_if_overloaded(&tasks, |_| Duration::from_millis(5));
        assert!(flagged.is_empty(), "each core carries a single task ≤ 1.0");
    }

    #[test]
    fn full_runtime_deadline_reservations_are_flagged() {
        // factor 1.0 on both tasks of one core → 2.0 reserved bandwidth
        let tasks = [dl_task(100, 100, 0), dl_task(100, 100, 0)];
        assert_eq!(warn_if_overloaded(&tasks, |_| Duration::ZERO), vec![0]);
    }
}
