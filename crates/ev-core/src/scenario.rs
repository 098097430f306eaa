//! Scenario configuration consumed by the orchestrator.
//!
//! A [`ScenarioConfig`] describes one simulation run. It is built by the caller
//! (in code or from a YAML/JSON file) and is never mutated once a run starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ScenarioError, ScenarioResult};
use crate::ParameterMap;

/// Channels recorded when a scenario requests none explicitly.
pub const DEFAULT_CHANNELS: [&str; 8] = [
    "pack.V",
    "pack.I",
    "pack.T_mean",
    "soc",
    "soh",
    "pwr_elec_loss",
    "veh_speed",
    "ambient.T",
];

/// Ambient and environmental parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AmbientConfig {
    pub temperature_c: f64,
    pub wind_speed_mps: f64,
    pub humidity_pct: f64,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            wind_speed_mps: 0.0,
            humidity_pct: 45.0,
        }
    }
}

/// High-level battery pack description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PackConfig {
    /// Series/parallel topology, e.g. `96s10p`.
    pub topology: String,
    pub capacity_ah: f64,
    pub nominal_voltage_v: f64,
    pub max_discharge_current_a: f64,
    pub max_charge_current_a: f64,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            topology: "96s10p".to_string(),
            capacity_ah: 100.0,
            nominal_voltage_v: 350.0,
            max_discharge_current_a: 250.0,
            max_charge_current_a: 150.0,
        }
    }
}

/// Reference to a stored drive-cycle speed profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveCycleConfig {
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: f64,
}

fn default_sample_rate_hz() -> f64 {
    10.0
}

/// Solver options, resolved against the solver registry by `backend`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: String,
    pub step_size_s: f64,
    pub rtol: f64,
    pub atol: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: "fixed_step".to_string(),
            step_size_s: 0.1,
            rtol: 1e-6,
            atol: 1e-8,
            max_steps: None,
        }
    }
}

/// A channel requested for persistence or export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputChannel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl OutputChannel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Aggregate configuration for a single simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub scenario_id: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub ambient: AmbientConfig,
    #[serde(default)]
    pub pack: PackConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_cycle: Option<DriveCycleConfig>,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub output_channels: Vec<OutputChannel>,
    /// Model names evaluated in order on every step. Empty disables stepping.
    #[serde(default)]
    pub models: Vec<String>,
    /// Overrides merged over the parameters derived from `pack` and `ambient`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub model_parameters: ParameterMap,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_seed() -> u64 {
    42
}

impl ScenarioConfig {
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            seed: default_seed(),
            ambient: AmbientConfig::default(),
            pack: PackConfig::default(),
            drive_cycle: None,
            solver: SolverConfig::default(),
            output_channels: Vec::new(),
            models: Vec::new(),
            model_parameters: ParameterMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Channel names requested for the run, in request order.
    ///
    /// Falls back to [`DEFAULT_CHANNELS`] when no channels were requested.
    pub fn canonical_channels(&self) -> Vec<String> {
        if self.output_channels.is_empty() {
            DEFAULT_CHANNELS.iter().map(|name| name.to_string()).collect()
        } else {
            self.output_channels
                .iter()
                .map(|channel| channel.name.clone())
                .collect()
        }
    }

    /// Parameters handed to every model's `configure`.
    pub fn model_parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::from([
            ("capacity_ah".to_string(), self.pack.capacity_ah),
            ("voltage_nominal".to_string(), self.pack.nominal_voltage_v),
            ("current_nominal".to_string(), 0.0),
            ("ambient_temperature_c".to_string(), self.ambient.temperature_c),
        ]);
        params.extend(
            self.model_parameters
                .iter()
                .map(|(name, value)| (name.clone(), *value)),
        );
        params
    }
}

/// Load a scenario from a `.yaml`, `.yml` or `.json` file.
pub fn load_scenario(path: &Path) -> ScenarioResult<ScenarioConfig> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let content = std::fs::read_to_string(path)?;
    match extension.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Err(ScenarioError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_match_documented_values() {
        let scenario = ScenarioConfig::new("S1");
        assert_eq!(scenario.seed, 42);
        assert_eq!(scenario.ambient.temperature_c, 25.0);
        assert_eq!(scenario.pack.topology, "96s10p");
        assert_eq!(scenario.solver.backend, "fixed_step");
        assert!(scenario.drive_cycle.is_none());
    }

    #[test]
    fn empty_request_uses_default_channels() {
        let scenario = ScenarioConfig::new("S1");
        let channels = scenario.canonical_channels();
        assert_eq!(
            channels,
            vec![
                "pack.V",
                "pack.I",
                "pack.T_mean",
                "soc",
                "soh",
                "pwr_elec_loss",
                "veh_speed",
                "ambient.T"
            ]
        );
        assert_eq!(channels, scenario.canonical_channels());
    }

    #[test]
    fn model_parameter_overrides_win() {
        let mut scenario = ScenarioConfig::new("S1");
        scenario
            .model_parameters
            .insert("current_nominal".to_string(), 50.0);

        let params = scenario.model_parameters();
        assert_eq!(params["current_nominal"], 50.0);
        assert_eq!(params["voltage_nominal"], 350.0);
        assert_eq!(params["ambient_temperature_c"], 25.0);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "scenario_id: WLTP\nseed: 7\npack:\n  capacity_ah: 60.0\n";
        let scenario: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.seed, 7);
        assert_eq!(scenario.pack.capacity_ah, 60.0);
        assert_eq!(scenario.pack.nominal_voltage_v, 350.0);
        assert_eq!(scenario.solver.step_size_s, 0.1);
        assert_eq!(scenario.canonical_channels().len(), DEFAULT_CHANNELS.len());
    }

    proptest! {
        #[test]
        fn explicit_channels_keep_request_order(
            names in proptest::collection::vec("[a-z]{1,6}(\\.[A-Za-z_]{1,6})?", 1..12),
            seed in any::<u64>(),
        ) {
            let mut scenario = ScenarioConfig::new("P").with_seed(seed);
            scenario.output_channels = names.iter().map(OutputChannel::named).collect();

            prop_assert_eq!(scenario.canonical_channels(), names.clone());
            prop_assert_eq!(scenario.canonical_channels(), scenario.canonical_channels());
        }

        #[test]
        fn default_channels_ignore_other_fields(seed in any::<u64>(), id in "[A-Z0-9]{1,8}") {
            let scenario = ScenarioConfig::new(id).with_seed(seed);
            let expected: Vec<String> = DEFAULT_CHANNELS.iter().map(|s| s.to_string()).collect();
            prop_assert_eq!(scenario.canonical_channels(), expected);
        }
    }
}
