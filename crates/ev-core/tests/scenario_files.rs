use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ev_core::{ScenarioError, load_scenario};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

#[test]
fn loads_yaml_scenario() {
    let dir = unique_temp_dir("ev_core_yaml");
    let path = dir.join("wltp.yaml");
    fs::write(
        &path,
        "scenario_id: WLTP_C3\n\
         seed: 7\n\
         drive_cycle:\n  profile_name: wltp_class3\n\
         output_channels:\n  - name: pack.V\n    unit: V\n  - name: soc\n\
         metadata:\n  owner: cells\n",
    )
    .expect("failed to write scenario");

    let scenario = load_scenario(&path).expect("failed to load scenario");
    assert_eq!(scenario.scenario_id, "WLTP_C3");
    assert_eq!(scenario.seed, 7);
    assert_eq!(scenario.canonical_channels(), vec!["pack.V", "soc"]);
    assert_eq!(scenario.metadata["owner"], "cells");

    let cycle = scenario.drive_cycle.expect("drive cycle should be present");
    assert_eq!(cycle.profile_name, "wltp_class3");
    assert_eq!(cycle.sample_rate_hz, 10.0);
    assert!(cycle.source_path.is_none());
}

#[test]
fn loads_json_scenario() {
    let dir = unique_temp_dir("ev_core_json");
    let path = dir.join("scenario.json");
    fs::write(&path, r#"{"scenario_id": "E2E", "models": ["battery_pack"]}"#)
        .expect("failed to write scenario");

    let scenario = load_scenario(&path).expect("failed to load scenario");
    assert_eq!(scenario.scenario_id, "E2E");
    assert_eq!(scenario.seed, 42);
    assert_eq!(scenario.models, vec!["battery_pack"]);
}

#[test]
fn rejects_unknown_extension() {
    let dir = unique_temp_dir("ev_core_ext");
    let path = dir.join("scenario.toml");
    fs::write(&path, "scenario_id = 'x'").expect("failed to write scenario");

    let err = load_scenario(&path).unwrap_err();
    assert!(matches!(err, ScenarioError::UnsupportedFormat { .. }));
}
