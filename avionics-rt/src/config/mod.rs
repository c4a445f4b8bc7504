/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Experiment configuration: scenario presets, YAML file and CLI overrides.
//!
//! Resolution order, later layers win:
//!
//! ```text
//! Scenario preset  ──►  --config <yaml>  ──►  CLI flags  ──►  validate()
//! ```
//!
//! The expected YAML structure is (every field optional):
//! ```yaml
//! scenario: edf-bus
//! jitter_threshold_ms: 0.1
//! test_duration_ms: 20000     # or `iterations: 50`, not both
//! runtime_factor: 0.9
//! cores: [0, 2]
//! channel: bus                # bus | racy | locked | none
//! cost: scaled                # spin | zero | scaled
//! cost_scale: 0.5             # only read with `cost: scaled`
//! response_basis: nominal     # start | nominal
//! ```
//!
//! The scenario alone decides the scheduling policy; there is no separate
//! policy knob, so a preset cannot be turned into a mismatched hybrid.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::activation::Termination;
use crate::monitor::ResponseBasis;
use crate::policy::PolicyKind;
use crate::telemetry::ChannelKind;
use crate::workload::{CostKind, CostModel};

// ── Scenario presets ──────────────────────────────────────────────────────────

/// The five reference experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// RM, both tasks on core 0, racy shared slot.
    RmShared,
    /// RM, tasks on cores 0 and 1, independent recovery workloads.
    RmSplit,
    /// EDF, tasks on cores 0 and 1, independent recovery workloads.
    EdfSplit,
    /// RM, both tasks on core 0, pub/sub bus.
    #[default]
    RmBus,
    /// EDF, tasks on cores 0 and 2, pub/sub bus.
    EdfBus,
}

impl Scenario {
    pub fn policy(self) -> PolicyKind {
        match self {
            Scenario::RmShared | Scenario::RmSplit | Scenario::RmBus => PolicyKind::FixedPriority,
            Scenario::EdfSplit | Scenario::EdfBus => PolicyKind::Deadline,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scenario::RmShared => "rm-shared",
            Scenario::RmSplit => "rm-split",
            Scenario::EdfSplit => "edf-split",
            Scenario::RmBus => "rm-bus",
            Scenario::EdfBus => "edf-bus",
        };
        f.write_str(s)
    }
}

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.  Unknown keys are rejected so a
/// typo cannot silently fall back to a preset value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    scenario: Option<Scenario>,
    jitter_threshold_ms: Option<f64>,
    test_duration_ms: Option<u64>,
    iterations: Option<u64>,
    runtime_factor: Option<f64>,
    cores: Option<Vec<u32>>,
    channel: Option<ChannelKind>,
    cost: Option<CostKind>,
    cost_scale: Option<f64>,
    response_basis: Option<ResponseBasis>,
}

impl ConfigFile {
    fn load(path: &Path) -> Result<Self> {
        info!("Loading experiment configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        // An empty document deserializes to unit, not to an empty map.
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))
    }
}

// ── Overrides ─────────────────────────────────────────────────────────────────

/// Values supplied on the command line.  `None` keeps the lower layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub channel: Option<ChannelKind>,
    pub jitter_threshold_ms: Option<f64>,
    pub test_duration_ms: Option<u64>,
    pub iterations: Option<u64>,
    pub runtime_factor: Option<f64>,
    pub cores: Option<Vec<u32>>,
    pub cost: Option<CostKind>,
    pub cost_scale: Option<f64>,
    pub response_basis: Option<ResponseBasis>,
    pub simulate: bool,
}

// ── ExperimentConfig ──────────────────────────────────────────────────────────

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub scenario: Scenario,
    pub policy: PolicyKind,
    /// CPU core of the producer (index 0) and the consumer (index 1).
    pub cores: [u32; 2],
    pub channel: ChannelKind,
    pub jitter_threshold_ms: f64,
    pub termination: Termination,
    pub response_basis: ResponseBasis,
    /// Fraction of the deadline reserved as `SCHED_DEADLINE` runtime.
    pub runtime_factor: f64,
    pub cost: CostModel,
    /// Run on virtual clocks with a no-op scheduler (no privilege needed).
    pub simulate: bool,
}

const DEFAULT_DURATION: Termination = Termination::Duration {
    test_duration_ms: 20_000,
};
const DEFAULT_ITERATIONS: Termination = Termination::Iterations(50);

impl ExperimentConfig {
    /// Settings of a reference experiment, before any override.
    pub fn preset(scenario: Scenario) -> Self {
        let (cores, channel, jitter_threshold_ms, termination) = match scenario {
            Scenario::RmShared => ([0, 0], ChannelKind::Racy, 0.1, DEFAULT_DURATION),
            Scenario::RmSplit => ([0, 1], ChannelKind::None, 0.5, DEFAULT_ITERATIONS),
            Scenario::EdfSplit => ([0, 1], ChannelKind::None, 0.5, DEFAULT_ITERATIONS),
            Scenario::RmBus => ([0, 0], ChannelKind::Bus, 0.1, DEFAULT_DURATION),
            Scenario::EdfBus => ([0, 2], ChannelKind::Bus, 0.1, DEFAULT_ITERATIONS),
        };
        let policy = scenario.policy();
        let (response_basis, runtime_factor) = match scenario {
            Scenario::EdfSplit => (ResponseBasis::Nominal, 1.0),
            Scenario::EdfBus => (ResponseBasis::Start, 0.9),
            _ => (ResponseBasis::Start, 1.0),
        };

        ExperimentConfig {
            scenario,
            policy,
            cores,
            channel,
            jitter_threshold_ms,
            termination,
            response_basis,
            runtime_factor,
            cost: CostModel::Spin,
            simulate: false,
        }
    }

    /// Merge preset, optional YAML file and CLI overrides, then validate.
    ///
    /// `scenario` from the CLI wins over the one in the file; with neither,
    /// [`Scenario::RmBus`] is used.
    ///
    /// # Errors
    /// Unreadable or malformed file, both termination kinds set in one
    /// layer, or any value rejected by [`validate`](Self::validate).
    pub fn resolve(
        scenario: Option<Scenario>,
        config_path: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let scenario = scenario.or(file.scenario).unwrap_or_default();
        let mut cfg = ExperimentConfig::preset(scenario);
        debug!(%scenario, "preset selected");

        cfg.apply_file(file)?;
        cfg.apply_overrides(overrides)?;
        cfg.validate()?;

        info!(
            scenario = %cfg.scenario,
            policy = cfg.policy.label(),
            cores = ?cfg.cores,
            channel = cfg.channel.label(),
            jitter_threshold_ms = cfg.jitter_threshold_ms,
            termination = ?cfg.termination,
            simulate = cfg.simulate,
            "Configuration"
        );
        Ok(cfg)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        self.termination = termination(file.test_duration_ms, file.iterations)
            .context("in configuration file")?
            .unwrap_or(self.termination);
        if let Some(v) = file.jitter_threshold_ms {
            self.jitter_threshold_ms = v;
        }
        if let Some(v) = file.runtime_factor {
            self.runtime_factor = v;
        }
        if let Some(v) = file.cores {
            self.cores = core_pair(&v)?;
        }
        if let Some(v) = file.channel {
            self.channel = v;
        }
        if let Some(v) = file.response_basis {
            self.response_basis = v;
        }
        self.cost = cost_model(file.cost, file.cost_scale, self.cost);
        Ok(())
    }

    fn apply_overrides(&mut self, o: &Overrides) -> Result<()> {
        self.termination = termination(o.test_duration_ms, o.iterations)
            .context("on the command line")?
            .unwrap_or(self.termination);
        if let Some(v) = o.jitter_threshold_ms {
            self.jitter_threshold_ms = v;
        }
        if let Some(v) = o.runtime_factor {
            self.runtime_factor = v;
        }
        if let Some(v) = &o.cores {
            self.cores = core_pair(v)?;
        }
        if let Some(v) = o.channel {
            self.channel = v;
        }
        if let Some(v) = o.response_basis {
            self.response_basis = v;
        }
        self.cost = cost_model(o.cost, o.cost_scale, self.cost);
        self.simulate |= o.simulate;
        Ok(())
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.jitter_threshold_ms.is_finite() && self.jitter_threshold_ms > 0.0,
            "jitter_threshold_ms must be a positive number, got {}",
            self.jitter_threshold_ms
        );
        ensure!(
            self.runtime_factor > 0.0 && self.runtime_factor <= 1.0,
            "runtime_factor must be in (0, 1], got {}",
            self.runtime_factor
        );
        match self.termination {
            Termination::Duration { test_duration_ms } => {
                ensure!(test_duration_ms > 0, "test_duration_ms must be positive")
            }
            Termination::Iterations(n) => ensure!(n > 0, "iterations must be positive"),
        }
        if let CostModel::Scaled(f) = self.cost {
            ensure!(
                f.is_finite() && f >= 0.0,
                "cost_scale must be a non-negative number, got {f}"
            );
        }
        Ok(())
    }

    pub fn jitter_threshold(&self) -> Duration {
        Duration::from_nanos((self.jitter_threshold_ms * 1_000_000.0).round() as u64)
    }

    /// Banner line of the final report, e.g. `"RM + BUS"`.
    pub fn title(&self) -> String {
        format!("{} + {}", self.policy.label(), self.channel.label())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn termination(duration_ms: Option<u64>, iterations: Option<u64>) -> Result<Option<Termination>> {
    match (duration_ms, iterations) {
        (Some(_), Some(_)) => bail!("test_duration_ms and iterations are mutually exclusive"),
        (Some(test_duration_ms), None) => Ok(Some(Termination::Duration { test_duration_ms })),
        (None, Some(n)) => Ok(Some(Termination::Iterations(n))),
        (None, None) => Ok(None),
    }
}

fn core_pair(cores: &[u32]) -> Result<[u32; 2]> {
    match *cores {
        [producer, consumer] => Ok([producer, consumer]),
        _ => bail!("cores must list exactly two CPU ids, got {:?}", cores),
    }
}

/// `cost_scale` alone keeps the current kind unless that kind is already
/// `scaled`.
fn cost_model(kind: Option<CostKind>, scale: Option<f64>, current: CostModel) -> CostModel {
    match (kind, scale, current) {
        (Some(CostKind::Spin), _, _) => CostModel::Spin,
        (Some(CostKind::Zero), _, _) => CostModel::Zero,
        (Some(CostKind::Scaled), Some(f), _) => CostModel::Scaled(f),
        (Some(CostKind::Scaled), None, CostModel::Scaled(f)) => CostModel::Scaled(f),
        (Some(CostKind::Scaled), None, _) => CostModel::Scaled(1.0),
        (None, Some(f), CostModel::Scaled(_)) => CostModel::Scaled(f),
        (None, _, current) => current,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── Presets ───────────────────────────────────────────────────────────────

    #[test]
    fn default_scenario_is_rm_bus() {
        let cfg = ExperimentConfig::resolve(None, None, &Overrides::default()).unwrap();
        assert_eq!(cfg, ExperimentConfig::preset(Scenario::RmBus));
        assert_eq!(cfg.policy, PolicyKind::FixedPriority);
        assert_eq!(cfg.channel, ChannelKind::Bus);
        assert_eq!(cfg.cores, [0, 0]);
    }

    #[test]
    fn presets_match_reference_experiments() {
        let shared = ExperimentConfig::preset(Scenario::RmShared);
        assert_eq!(shared.channel, ChannelKind::Racy);
        assert_eq!(shared.jitter_threshold_ms, 0.1);

        let split = ExperimentConfig::preset(Scenario::RmSplit);
        assert_eq!(split.cores, [0, 1]);
        assert_eq!(split.channel, ChannelKind::None);
        assert_eq!(split.termination, Termination::Iterations(50));
        assert_eq!(split.jitter_threshold_ms, 0.5);

        let edf = ExperimentConfig::preset(Scenario::EdfSplit);
        assert_eq!(edf.policy, PolicyKind::Deadline);
        assert_eq!(edf.runtime_factor, 1.0);
        assert_eq!(edf.response_basis, ResponseBasis::Nominal);

        let edf_bus = ExperimentConfig::preset(Scenario::EdfBus);
        assert_eq!(edf_bus.cores, [0, 2]);
        assert_eq!(edf_bus.runtime_factor, 0.9);
        assert_eq!(edf_bus.jitter_threshold_ms, 0.1);
        assert_eq!(edf_bus.response_basis, ResponseBasis::Start);
    }

    #[test]
    fn jitter_threshold_converts_exactly() {
        let cfg = ExperimentConfig::preset(Scenario::RmBus);
        assert_eq!(cfg.jitter_threshold(), Duration::from_micros(100));
    }

    #[test]
    fn title_combines_policy_and_channel() {
        assert_eq!(ExperimentConfig::preset(Scenario::EdfBus).title(), "EDF + BUS");
    }

    // ── YAML layer ────────────────────────────────────────────────────────────

    #[test]
    fn yaml_overrides_preset_values() {
        let f = yaml_tempfile(
            r#"
scenario: edf-split
jitter_threshold_ms: 0.25
test_duration_ms: 5000
runtime_factor: 0.9
cores: [1, 3]
channel: locked
cost: scaled
cost_scale: 0.5
response_basis: start
"#,
        );
        let cfg = ExperimentConfig::resolve(None, Some(f.path()), &Overrides::default()).unwrap();
        assert_eq!(cfg.scenario, Scenario::EdfSplit);
        assert_eq!(cfg.policy, PolicyKind::Deadline);
        assert_eq!(cfg.jitter_threshold_ms, 0.25);
        assert_eq!(
            cfg.termination,
            Termination::Duration {
                test_duration_ms: 5_000
            }
        );
        assert_eq!(cfg.runtime_factor, 0.9);
        assert_eq!(cfg.cores, [1, 3]);
        assert_eq!(cfg.channel, ChannelKind::Locked);
        assert_eq!(cfg.cost, CostModel::Scaled(0.5));
        assert_eq!(cfg.response_basis, ResponseBasis::Start);
    }

    #[test]
    fn empty_yaml_keeps_preset() {
        let f = yaml_tempfile("");
        let cfg = ExperimentConfig::resolve(
            Some(Scenario::RmSplit),
            Some(f.path()),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(cfg, ExperimentConfig::preset(Scenario::RmSplit));
    }

    #[test]
    fn cli_scenario_beats_file_scenario() {
        let f = yaml_tempfile("scenario: edf-bus\n");
        let cfg = ExperimentConfig::resolve(
            Some(Scenario::RmShared),
            Some(f.path()),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(cfg.scenario, Scenario::RmShared);
    }

    #[test]
    fn both_terminations_in_file_is_an_error() {
        let f = yaml_tempfile("test_duration_ms: 1000\niterations: 10\n");
        let err =
            ExperimentConfig::resolve(None, Some(f.path()), &Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("mutually exclusive"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let f = yaml_tempfile("jitter_treshold_ms: 0.2\n");
        assert!(ExperimentConfig::resolve(None, Some(f.path()), &Overrides::default()).is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(ExperimentConfig::resolve(None, Some(f.path()), &Overrides::default()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ExperimentConfig::resolve(
            None,
            Some(Path::new("/nonexistent/path/experiment.yaml")),
            &Overrides::default(),
        );
        assert!(format!("{:#}", result.unwrap_err()).contains("Cannot open configuration file"));
    }

    // ── CLI layer ─────────────────────────────────────────────────────────────

    #[test]
    fn cli_overrides_file() {
        let f = yaml_tempfile("iterations: 10\nchannel: racy\n");
        let o = Overrides {
            test_duration_ms: Some(1_000),
            channel: Some(ChannelKind::Bus),
            cost: Some(CostKind::Zero),
            simulate: true,
            ..Default::default()
        };
        let cfg = ExperimentConfig::resolve(None, Some(f.path()), &o).unwrap();
        assert_eq!(
            cfg.termination,
            Termination::Duration {
                test_duration_ms: 1_000
            }
        );
        assert_eq!(cfg.channel, ChannelKind::Bus);
        assert_eq!(cfg.cost, CostModel::Zero);
        assert!(cfg.simulate);
    }

    #[test]
    fn wrong_core_count_is_rejected() {
        let o = Overrides {
            cores: Some(vec![0, 1, 2]),
            ..Default::default()
        };
        assert!(ExperimentConfig::resolve(None, None, &o).is_err());
    }

    #[test]
    fn zero_and_out_of_range_values_are_rejected() {
        for o in [
            Overrides {
                jitter_threshold_ms: Some(0.0),
                ..Default::default()
            },
            Overrides {
                iterations: Some(0),
                ..Default::default()
            },
            Overrides {
                runtime_factor: Some(1.5),
                ..Default::default()
            },
            Overrides {
                cost: Some(CostKind::Scaled),
                cost_scale: Some(-1.0),
                ..Default::default()
            },
        ] {
            assert!(ExperimentConfig::resolve(None, None, &o).is_err(), "{o:?}");
        }
    }

    #[test]
    fn cost_scale_alone_does_not_switch_kind() {
        assert_eq!(cost_model(None, Some(0.5), CostModel::Spin), CostModel::Spin);
        assert_eq!(
            cost_model(None, Some(0.5), CostModel::Scaled(2.0)),
            CostModel::Scaled(0.5)
        );
        assert_eq!(
            cost_model(Some(CostKind::Scaled), None, CostModel::Spin),
            CostModel::Scaled(1.0)
        );
    }
}
