//! Persisted record types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ev_core::{RunId, ScenarioConfig};
use serde::{Deserialize, Serialize};

/// Contents of a run's `metadata.json`, written once at initialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMetadata {
    pub run_id: RunId,
    pub scenario_id: String,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub requested_channels: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl RunMetadata {
    pub fn for_scenario(run_id: &str, scenario: &ScenarioConfig) -> Self {
        Self {
            run_id: run_id.to_string(),
            scenario_id: scenario.scenario_id.clone(),
            seed: scenario.seed,
            created_at: Utc::now(),
            requested_channels: scenario.canonical_channels(),
            metadata: scenario.metadata.clone(),
        }
    }
}
