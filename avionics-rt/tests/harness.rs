/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end runs of both task threads against a scripted scheduler and
//! virtual clocks.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use avionics_rt::config::{ExperimentConfig, Scenario};
use avionics_rt::error::HarnessError;
use avionics_rt::policy::{DeadlineAttr, SchedulerOps};
use avionics_rt::runner::{run_experiment, TaskOutcome};
use avionics_rt::task::TaskTimings;
use avionics_rt::workload::CostModel;

/// Records the calls made from every thread; refuses what it is told to.
#[derive(Default)]
struct ScriptedScheduler {
    calls: Mutex<Vec<String>>,
    deny_fifo: bool,
    /// Refuse `SCHED_DEADLINE` reservations with this period.
    deny_deadline_period_ns: Option<u64>,
}

impl SchedulerOps for ScriptedScheduler {
    fn probe_fixed_priority(&self, priority: i32) -> io::Result<()> {
        self.calls.lock().push(format!("probe {priority}"));
        if self.deny_fifo {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        Ok(())
    }

    fn set_fixed_priority(&self, priority: i32) -> io::Result<()> {
        self.calls.lock().push(format!("fifo {priority}"));
        Ok(())
    }

    fn set_deadline(&self, attr: DeadlineAttr) -> io::Result<()> {
        self.calls.lock().push(format!("deadline {}", attr.period_ns));
        if self.deny_deadline_period_ns == Some(attr.period_ns) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        Ok(())
    }

    fn pin_to_core(&self, core: u32) -> io::Result<()> {
        self.calls.lock().push(format!("pin {core}"));
        Ok(())
    }

    fn yield_now(&self) {}
}

fn simulated(scenario: Scenario) -> ExperimentConfig {
    ExperimentConfig {
        simulate: true,
        cost: CostModel::Zero,
        ..ExperimentConfig::preset(scenario)
    }
}

fn timings(pp: u64, pd: u64, cp: u64, cd: u64) -> TaskTimings {
    TaskTimings {
        producer_period_ms: pp,
        producer_deadline_ms: pd,
        consumer_period_ms: cp,
        consumer_deadline_ms: cd,
    }
}

#[test]
fn fixed_priority_without_privilege_creates_no_thread() {
    let sched = Arc::new(ScriptedScheduler {
        deny_fifo: true,
        ..Default::default()
    });
    let cfg = simulated(Scenario::RmBus);

    let err = run_experiment(timings(50, 50, 100, 100), &cfg, sched.clone()).unwrap_err();

    assert!(matches!(err, HarnessError::Privilege { priority: 94, .. }));
    assert_eq!(err.exit_code(), 1);
    // Only the main-thread probe ran; no task thread ever pinned itself.
    assert_eq!(*sched.calls.lock(), vec!["probe 94"]);
}

#[test]
fn rejected_deadline_task_does_not_stop_its_sibling() {
    let sched = Arc::new(ScriptedScheduler {
        deny_deadline_period_ns: Some(20_000_000),
        ..Default::default()
    });
    let cfg = simulated(Scenario::EdfBus);

    let report = run_experiment(timings(10, 10, 20, 20), &cfg, sched.clone()).unwrap();

    let rows = report.rows();
    assert_eq!(rows.len(), 2);
    match &rows[0].outcome {
        TaskOutcome::Completed(r) => assert_eq!(r.iterations, 50),
        other => panic!("producer should complete, got {other:?}"),
    }
    assert!(matches!(rows[1].outcome, TaskOutcome::Rejected(_)));
    assert!(!report.all_completed());

    let text = report.to_string();
    assert!(text.contains("[PUB ] -> jitter violations"), "{text}");
    assert!(text.contains("[SUB ] -> admission rejected"), "{text}");

    // No up-front probe for deadline tasks; each thread bound itself.
    let calls = sched.calls.lock();
    assert!(!calls.iter().any(|c| c.starts_with("probe")));
    assert!(calls.contains(&"deadline 10000000".to_string()));
    assert!(calls.contains(&"deadline 20000000".to_string()));
}

#[test]
fn fixed_priority_threads_bind_with_rm_priorities() {
    let sched = Arc::new(ScriptedScheduler::default());
    let cfg = simulated(Scenario::RmSplit);

    let report = run_experiment(timings(10, 10, 100, 100), &cfg, sched.clone()).unwrap();
    assert!(report.all_completed());

    let calls = sched.calls.lock();
    assert_eq!(calls[0], "probe 98");
    for expected in ["pin 0", "fifo 98", "pin 1", "fifo 89"] {
        assert!(calls.iter().any(|c| c == expected), "missing {expected}: {calls:?}");
    }
}

#[test]
fn period_100_for_20_seconds_runs_200_iterations_without_misses() {
    let sched = Arc::new(ScriptedScheduler::default());
    let cfg = simulated(Scenario::RmBus);

    let report = run_experiment(timings(100, 100, 100, 100), &cfg, sched).unwrap();

    for row in report.rows() {
        match &row.outcome {
            TaskOutcome::Completed(r) => {
                assert_eq!(r.iterations, 200, "{}", row.tag);
                assert_eq!(r.deadline_misses, 0, "{}", row.tag);
            }
            other => panic!("{} did not complete: {other:?}", row.tag),
        }
    }
}
