use std::any::Any;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ev_app::{AppError, OrchestratorConfig, SimulationOrchestrator};
use ev_core::{OutputChannel, ScenarioConfig};
use ev_io::{ChannelMapping, ExportOptions};
use ev_plugins::{
    ENTRY_POINT_GROUP, Plugin, PluginEntryPoint, PluginError, PluginManager, PluginResult,
};
use ev_results::ResultStore;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

struct ThermalPlugin;

impl Plugin for ThermalPlugin {
    fn name(&self) -> &str {
        "thermal"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn load_thermal() -> PluginResult<Box<dyn Plugin>> {
    Ok(Box::new(ThermalPlugin))
}

fn load_broken() -> PluginResult<Box<dyn Plugin>> {
    Err(PluginError::Load {
        name: "broken".to_string(),
        message: "missing symbol".to_string(),
    })
}

fn entry(name: &'static str, loader: fn() -> PluginResult<Box<dyn Plugin>>) -> PluginEntryPoint {
    PluginEntryPoint {
        group: ENTRY_POINT_GROUP,
        name,
        version: "0.1.0",
        module: module_path!(),
        symbol: None,
        loader,
    }
}

fn plugin_orchestrator(prefix: &str, config: OrchestratorConfig) -> SimulationOrchestrator {
    let plugins = PluginManager::from_entry_points(vec![
        entry("thermal", load_thermal),
        entry("broken", load_broken),
    ]);
    SimulationOrchestrator::builder()
        .result_store(ResultStore::new(unique_temp_dir(prefix)))
        .plugins(plugins)
        .config(config)
        .build()
        .unwrap()
}

#[test]
fn session_loads_and_unloads_plugins() {
    let mut orchestrator = plugin_orchestrator("ev_app_session", OrchestratorConfig::default());
    {
        let mut session = orchestrator.session();
        assert_eq!(session.load_report().loaded, vec!["thermal"]);
        assert_eq!(session.load_report().failures.len(), 1);
        assert!(session.plugins().is_loaded("thermal"));

        let run_id = session.run(&ScenarioConfig::new("S1")).unwrap();
        assert!(session.result(&run_id).is_ok());
    }
    assert!(!orchestrator.plugins().is_loaded("thermal"));
    assert!(orchestrator.plugins().get("thermal").is_err());
}

#[test]
fn session_unloads_when_scope_panics() {
    let mut orchestrator = plugin_orchestrator("ev_app_panic", OrchestratorConfig::default());
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let session = orchestrator.session();
        assert!(session.plugins().is_loaded("thermal"));
        panic!("scope aborted");
    }));
    assert!(outcome.is_err());
    assert!(!orchestrator.plugins().is_loaded("thermal"));
}

#[test]
fn disabled_plugins_are_not_loaded() {
    let config = OrchestratorConfig {
        enable_plugins: false,
        ..OrchestratorConfig::default()
    };
    let mut orchestrator = plugin_orchestrator("ev_app_noplugins", config);
    let session = orchestrator.session();
    assert!(session.load_report().loaded.is_empty());
    assert!(!session.plugins().is_loaded("thermal"));
}

#[test]
fn export_round_trips_through_dat() {
    let mut orchestrator = SimulationOrchestrator::builder()
        .result_store(ResultStore::new(unique_temp_dir("ev_app_export_store")))
        .with_builtins()
        .unwrap()
        .build()
        .unwrap();

    let mut scenario = ScenarioConfig::new("EXPORT");
    scenario.models = vec!["battery_pack".to_string()];
    scenario.solver.max_steps = Some(20);
    scenario.output_channels = vec![OutputChannel::named("pack.V"), OutputChannel::named("soc")];
    scenario
        .metadata
        .insert("note".to_string(), "line1\nline2".to_string());
    scenario
        .metadata
        .insert("bench:id".to_string(), "B7\t(rear)".to_string());
    let run_id = orchestrator.run(&scenario).unwrap();

    let options = ExportOptions {
        output_dir: unique_temp_dir("ev_app_export_out"),
        channels: None,
    };
    let path = orchestrator.export(&run_id, "dat", &options).unwrap();
    assert!(path.exists());
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("dat"));

    let imported = orchestrator
        .import("dat", &path, &ChannelMapping::new())
        .unwrap();
    assert_eq!(imported.samples.len(), 20);
    assert!(imported.samples[0].contains_key("pack.V"));
    assert_eq!(imported.metadata["note"], "line1\nline2");
    assert_eq!(imported.metadata["bench:id"], "B7\t(rear)");
    assert_eq!(imported.metadata["run_id"], run_id);
    assert_eq!(imported.metadata["scenario_id"], "EXPORT");
}

#[test]
fn unknown_formats_are_registry_errors() {
    let mut orchestrator = SimulationOrchestrator::builder()
        .result_store(ResultStore::new(unique_temp_dir("ev_app_formats")))
        .build()
        .unwrap();
    let run_id = orchestrator.run(&ScenarioConfig::new("S1")).unwrap();

    let err = orchestrator
        .export(&run_id, "parquet", &ExportOptions::default())
        .unwrap_err();
    assert!(matches!(err, AppError::Registry(_)));

    let err = orchestrator
        .import("mdf4", &PathBuf::from("missing.mf4"), &ChannelMapping::new())
        .unwrap_err();
    assert!(matches!(err, AppError::Registry(_)));
}
