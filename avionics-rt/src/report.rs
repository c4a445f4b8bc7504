/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Final results table, written to stdout once both task threads are joined.
//!
//! ```text
//! ====================================================
//!   FINAL RESULTS: RM + BUS (rm-bus)
//! ====================================================
//! [PUB ] -> jitter violations (>0.100ms):  0 | deadline misses:  0 | peak jitter: 0.014ms
//! [SUB ] -> jitter violations (>0.100ms):  3 | deadline misses:  0 | peak jitter: 0.231ms
//! ====================================================
//! ```

use std::fmt;

use crate::config::ExperimentConfig;
use crate::monitor::as_millis_f64;
use crate::runner::{TaskOutcome, TaskReport};

const RULE: &str = "====================================================";

#[derive(Debug)]
pub struct Report {
    title: String,
    jitter_threshold_ms: f64,
    rows: Vec<TaskReport>,
}

impl Report {
    pub fn new(config: &ExperimentConfig, rows: Vec<TaskReport>) -> Self {
        Self {
            title: format!("{} ({})", config.title(), config.scenario),
            jitter_threshold_ms: config.jitter_threshold_ms,
            rows,
        }
    }

    pub fn rows(&self) -> &[TaskReport] {
        &self.rows
    }

    /// `true` when every task ran its loop to the end.
    pub fn all_completed(&self) -> bool {
        self.rows
            .iter()
            .all(|r| matches!(r.outcome, TaskOutcome::Completed(_)))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "  FINAL RESULTS: {}", self.title)?;
        writeln!(f, "{RULE}")?;
        for row in &self.rows {
            write!(f, "[{:<4}] -> ", row.tag)?;
            match &row.outcome {
                TaskOutcome::Completed(r) => writeln!(
                    f,
                    "jitter violations (>{:.3}ms): {:>2} | deadline misses: {:>2} | peak jitter: {:.3}ms",
                    self.jitter_threshold_ms,
                    r.jitter_violations,
                    r.deadline_misses,
                    as_millis_f64(r.peak_jitter),
                )?,
                TaskOutcome::Rejected(e) => writeln!(f, "admission rejected: {e}")?,
                TaskOutcome::Panicked => writeln!(f, "thread panicked, no results")?,
            }
        }
        writeln!(f, "{RULE}")
    }
}
