//! Analysis configuration loading.
//!
//! Every section and field is optional; anything absent falls back to the
//! built-in defaults.  The expected YAML structure is:
//! ```yaml
//! rta:
//!   max_iterations: 1000
//! pdc:
//!   period_multiplier: 1000
//!   absolute_cap: 1000000
//! simulation:
//!   horizon: 100000        # omit to simulate one hyperperiod
//!   fallback_horizon: 100000  # used when the hyperperiod is unavailable
//!   mode: wcet             # wcet | random
//!   seed: 1
//!   runs: 1
//!   policies: [dm, edf]
//! hyperperiod_limit: 3600000000
//! ```

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::pdc::PdcConfig;
use crate::analysis::rta::RtaConfig;
use crate::hyperperiod::{HyperperiodCalculator, DEFAULT_HYPERPERIOD_LIMIT};
use crate::simulator::{SimulationConfig, DEFAULT_FALLBACK_HORIZON};
use crate::task::{ExecutionMode, Policy, Task, Time};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout; callers work with
/// [`AnalysisConfig`] instead.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    rta: RtaConfig,
    pdc: PdcConfig,
    simulation: SimulationSection,
    hyperperiod_limit: Option<Time>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SimulationSection {
    horizon: Option<Time>,
    fallback_horizon: Time,
    mode: ExecutionMode,
    seed: u64,
    runs: usize,
    policies: Vec<Policy>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        let d = SimulationSettings::default();
        Self {
            horizon: d.horizon,
            fallback_horizon: d.fallback_horizon,
            mode: d.mode,
            seed: d.seed,
            runs: d.runs,
            policies: d.policies,
        }
    }
}

// ── Public data structures ────────────────────────────────────────────────────

/// Which simulations to run for each task set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSettings {
    /// `None` derives the horizon from the hyperperiod.
    pub horizon: Option<Time>,
    /// Derived horizon when the hyperperiod overflows or exceeds the limit.
    pub fallback_horizon: Time,
    pub mode: ExecutionMode,
    pub seed: u64,
    /// Runs per policy; more than one aggregates consecutive seeds.
    pub runs: usize,
    pub policies: Vec<Policy>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            horizon: None,
            fallback_horizon: DEFAULT_FALLBACK_HORIZON,
            mode: ExecutionMode::Wcet,
            seed: 1,
            runs: 1,
            policies: vec![Policy::Dm, Policy::Edf],
        }
    }
}

impl SimulationSettings {
    /// Concrete run parameters for `policy` on `tasks`.
    pub fn config_for(
        &self,
        policy: Policy,
        tasks: &[Task],
        calculator: &HyperperiodCalculator,
    ) -> SimulationConfig {
        let horizon = self.horizon.unwrap_or_else(|| {
            SimulationConfig::derived_horizon(tasks, calculator, self.fallback_horizon)
        });
        SimulationConfig::new(policy, horizon)
            .with_mode(self.mode)
            .with_seed(self.seed)
    }
}

/// Everything that parameterises one evaluation of a task set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    pub rta: RtaConfig,
    pub pdc: PdcConfig,
    pub simulation: SimulationSettings,
    /// Hyperperiods above this are treated as not computable.
    pub hyperperiod_limit: Time,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rta: RtaConfig::default(),
            pdc: PdcConfig::default(),
            simulation: SimulationSettings::default(),
            hyperperiod_limit: DEFAULT_HYPERPERIOD_LIMIT,
        }
    }
}

impl AnalysisConfig {
    /// Parse `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is malformed or
    /// has unknown keys, or a bound is zero.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading analysis configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let config = Self {
            rta: file.rta,
            pdc: file.pdc,
            simulation: SimulationSettings {
                horizon: file.simulation.horizon,
                fallback_horizon: file.simulation.fallback_horizon,
                mode: file.simulation.mode,
                seed: file.simulation.seed,
                runs: file.simulation.runs,
                policies: file.simulation.policies,
            },
            hyperperiod_limit: file.hyperperiod_limit.unwrap_or(DEFAULT_HYPERPERIOD_LIMIT),
        };

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(?config, "Analysis configuration loaded");
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => {
                warn!("No configuration file provided, using default analysis settings");
                Ok(Self::default())
            }
        }
    }

    /// Reject bounds that would make an analysis or simulation meaningless.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.rta.max_iterations > 0, "rta.max_iterations must be at least 1");
        ensure!(self.pdc.absolute_cap > 0, "pdc.absolute_cap must be positive");
        ensure!(self.simulation.horizon != Some(0), "simulation.horizon must be positive");
        ensure!(
            self.simulation.fallback_horizon > 0,
            "simulation.fallback_horizon must be positive"
        );
        ensure!(self.simulation.runs > 0, "simulation.runs must be at least 1");
        ensure!(self.hyperperiod_limit > 0, "hyperperiod_limit must be positive");
        Ok(())
    }

    pub fn calculator(&self) -> HyperperiodCalculator {
        HyperperiodCalculator::with_limit(self.hyperperiod_limit)
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

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.rta.max_iterations, 1_000);
        assert_eq!(cfg.pdc.period_multiplier, 1_000);
        assert_eq!(cfg.pdc.absolute_cap, 1_000_000);
        assert_eq!(cfg.simulation.horizon, None);
        assert_eq!(cfg.simulation.fallback_horizon, 100_000);
        assert_eq!(cfg.simulation.mode, ExecutionMode::Wcet);
        assert_eq!(cfg.simulation.seed, 1);
        assert_eq!(cfg.simulation.runs, 1);
        assert_eq!(cfg.simulation.policies, vec![Policy::Dm, Policy::Edf]);
        assert_eq!(cfg.hyperperiod_limit, DEFAULT_HYPERPERIOD_LIMIT);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn no_path_yields_defaults() {
        assert_eq!(AnalysisConfig::load_or_default(None).unwrap(), AnalysisConfig::default());
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
rta:
  max_iterations: 50
pdc:
  period_multiplier: 10
  absolute_cap: 5000
simulation:
  horizon: 240
  fallback_horizon: 900
  mode: random
  seed: 9
  runs: 4
  policies: [edf, rm]
hyperperiod_limit: 100000
"#;
        let f = yaml_tempfile(yaml);
        let cfg = AnalysisConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.rta.max_iterations, 50);
        assert_eq!(cfg.pdc.period_multiplier, 10);
        assert_eq!(cfg.pdc.absolute_cap, 5_000);
        assert_eq!(cfg.simulation.horizon, Some(240));
        assert_eq!(cfg.simulation.fallback_horizon, 900);
        assert_eq!(cfg.simulation.mode, ExecutionMode::Random);
        assert_eq!(cfg.simulation.seed, 9);
        assert_eq!(cfg.simulation.runs, 4);
        assert_eq!(cfg.simulation.policies, vec![Policy::Edf, Policy::Rm]);
        assert_eq!(cfg.hyperperiod_limit, 100_000);
        assert_eq!(cfg.calculator().limit(), 100_000);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let f = yaml_tempfile("simulation:\n  seed: 3\n");
        let cfg = AnalysisConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.simulation.seed, 3);
        assert_eq!(cfg.simulation.policies, vec![Policy::Dm, Policy::Edf]);
        assert_eq!(cfg.rta, RtaConfig::default());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let f = yaml_tempfile("{}\n");
        let cfg = AnalysisConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let f = yaml_tempfile("simulation:\n  sede: 3\n");
        assert!(AnalysisConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn zero_bounds_are_rejected() {
        for yaml in [
            "rta:\n  max_iterations: 0\n",
            "simulation:\n  runs: 0\n",
            "simulation:\n  horizon: 0\n",
            "simulation:\n  fallback_horizon: 0\n",
        ] {
            let f = yaml_tempfile(yaml);
            assert!(AnalysisConfig::load_from_file(f.path()).is_err(), "{yaml}");
        }
    }

    #[test]
    fn missing_file_returns_error() {
        let result = AnalysisConfig::load_from_file(Path::new("/nonexistent/path/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(AnalysisConfig::load_from_file(f.path()).is_err());
    }

    // ── SimulationSettings ────────────────────────────────────────────────────

    #[test]
    fn horizon_is_derived_when_absent() {
        let tasks = vec![Task::implicit("a", 1, 4), Task::implicit("b", 2, 6)];
        let calc = HyperperiodCalculator::new();

        let derived = SimulationSettings::default().config_for(Policy::Dm, &tasks, &calc);
        assert_eq!(derived.horizon, 12);
        assert_eq!(derived.seed, 1);

        let fixed = SimulationSettings {
            horizon: Some(50),
            ..SimulationSettings::default()
        }
        .config_for(Policy::Edf, &tasks, &calc);
        assert_eq!(fixed.horizon, 50);
        assert_eq!(fixed.policy, Policy::Edf);
    }

    #[test]
    fn unrepresentable_hyperperiod_uses_bounded_fallback() {
        // Pairwise coprime periods: the hyperperiod is far above the default limit.
        let tasks: Vec<Task> = [11, 13, 17, 19, 23, 29, 31, 37]
            .iter()
            .enumerate()
            .map(|(i, &p)| Task::implicit(format!("t{i}"), 1, p))
            .collect();
        let calc = AnalysisConfig::default().calculator();
        assert!(calc.calculate(&tasks).is_err());

        let derived = SimulationSettings::default().config_for(Policy::Edf, &tasks, &calc);
        assert_eq!(derived.horizon, DEFAULT_FALLBACK_HORIZON);

        let tuned = SimulationSettings {
            fallback_horizon: 777,
            ..SimulationSettings::default()
        }
        .config_for(Policy::Dm, &tasks, &calc);
        assert_eq!(tuned.horizon, 777);
    }
}
