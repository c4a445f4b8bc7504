/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Process-wide failures of the harness.
//!
//! Everything here happens **before** the periodic tasks are running and ends
//! the process.  Failures local to one task thread are
//! [`BindError`](crate::policy::BindError)s and end only that thread.
//!
//! | Variant | Raised | Process outcome |
//! |---|---|---|
//! | `Config` | argument / YAML resolution | exit 1 |
//! | `Privilege` | up-front `SCHED_FIFO` probe | exit 1, no thread created |
//! | `ThreadSpawn` | `thread::Builder::spawn` | `abort()` |
//!
//! Jitter violations and deadline misses are measurements, not errors, and
//! have no variant.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Missing, malformed or out-of-range configuration.
    ///
    /// Wraps the `anyhow` chain built while loading so the message keeps the
    /// file path and the parser's reason.
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    /// The process may not use `SCHED_FIFO` at the requested priority.
    #[error(
        "cannot obtain SCHED_FIFO priority {priority}: {source} \
         (run with sudo or grant CAP_SYS_NICE)"
    )]
    Privilege {
        priority: i32,
        #[source]
        source: io::Error,
    },

    /// The OS refused to create a task thread.
    #[error("failed to create thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl HarnessError {
    /// Exit status for errors that end the process normally.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// `true` when the process must terminate abnormally instead of exiting.
    pub fn is_abort(&self) -> bool {
        matches!(self, HarnessError::ThreadSpawn { .. })
    }
}
