/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! avionics-rt – periodic real-time jitter harness
//!
//! Runs a producer and a consumer task under rate-monotonic `SCHED_FIFO` or
//! `SCHED_DEADLINE` and measures activation jitter and deadline misses on a
//! simulated altitude-telemetry workload.
//!
//! ```text
//! lib.rs
//! ├── config/      – scenario presets, YAML file, CLI overrides
//! ├── task         – TaskSpec, RM priority / EDF runtime derivation
//! ├── policy/      – PolicyBinding, SchedulerOps, Linux backend, feasibility
//! ├── clock        – monotonic and virtual time sources
//! ├── activation   – drift-free periodic activation engine
//! ├── workload     – producer / consumer / recovery step functions
//! ├── telemetry/   – bus, racy slot and locked slot channels
//! ├── monitor      – jitter and deadline accounting
//! ├── runner       – thread spawning, task loop, join
//! ├── report       – final results table
//! └── error        – process-wide failures
//! ```

pub mod activation;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod policy;
pub mod report;
pub mod runner;
pub mod task;
pub mod telemetry;
pub mod workload;
