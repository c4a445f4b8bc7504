/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Why a task thread could not be placed under its scheduling class.
//!
//! A [`BindError`] is always local to one thread.  It is logged by that
//! thread, carried back to the aggregator inside the task outcome, and shown
//! in the final report.  Process-wide failures live in
//! [`HarnessError`](crate::error::HarnessError) instead.
//!
//! Every variant carries the parameters that were requested so the log line
//! is actionable without cross-referencing the configuration.

use std::io;

use thiserror::Error;

use super::DeadlineAttr;

#[derive(Debug, Error)]
pub enum BindError {
    /// The thread could not be restricted to its CPU core.
    #[error("cannot pin thread to CPU {core}: {source}")]
    Affinity {
        core: u32,
        #[source]
        source: io::Error,
    },

    /// `SCHED_FIFO` was refused (usually `EPERM`: no root / `CAP_SYS_NICE`).
    #[error("cannot set SCHED_FIFO priority {priority}: {source} (run with sudo)")]
    Privilege {
        priority: i32,
        #[source]
        source: io::Error,
    },

    /// `sched_setattr(SCHED_DEADLINE)` was refused.
    ///
    /// `EBUSY` means admission control rejected the bandwidth, `EINVAL` means
    /// the parameters themselves were invalid (e.g. runtime > deadline),
    /// `EPERM` means missing privilege or a restricted affinity mask.
    #[error(
        "SCHED_DEADLINE admission rejected (runtime {} ns, deadline {} ns, period {} ns): {source}",
        .attr.runtime_ns, .attr.deadline_ns, .attr.period_ns
    )]
    Admission {
        attr: DeadlineAttr,
        #[source]
        source: io::Error,
    },
}
