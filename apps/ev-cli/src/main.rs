use clap::{Parser, Subcommand};
use ev_app::{
    AppError, AppResult, OrchestratorConfig, SimulationOrchestrator, builtin_registries,
};
use ev_core::{RunEvent, RunEventKind, load_scenario};
use ev_io::ExportOptions;
use ev_plugins::PluginManager;
use ev_results::ResultStore;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE: &str = "storage/runtime";

#[derive(Parser)]
#[command(name = "ev-sim")]
#[command(about = "EV battery pack simulation runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file (.yaml, .yml or .json)
    Run {
        /// Path to the scenario file
        scenario_path: PathBuf,
        /// Result store root directory
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
        /// Orchestrator config file (.yaml or .json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show metadata of a stored run
    ShowRun {
        /// Run ID to display
        run_id: String,
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
    /// List files stored for a run
    Artifacts {
        run_id: String,
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
    /// Export a stored run through a registered exporter
    Export {
        run_id: String,
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
        /// Exporter format tag (e.g. dat, csv)
        #[arg(short, long, default_value = "dat")]
        format: String,
        /// Output directory
        #[arg(short, long, default_value = "artifacts")]
        output: PathBuf,
        /// Comma-separated channel subset
        #[arg(long, value_delimiter = ',')]
        channels: Option<Vec<String>>,
    },
    /// List linked plugins and built-in capabilities
    Plugins,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario_path,
            store,
            config,
        } => cmd_run(&scenario_path, &store, config.as_deref()),
        Commands::ShowRun { run_id, store } => cmd_show_run(&run_id, &store),
        Commands::Artifacts { run_id, store } => cmd_artifacts(&run_id, &store),
        Commands::Export {
            run_id,
            store,
            format,
            output,
            channels,
        } => cmd_export(&run_id, &store, &format, output, channels),
        Commands::Plugins => cmd_plugins(),
    }
}

fn orchestrator(store: &Path, config: OrchestratorConfig) -> AppResult<SimulationOrchestrator> {
    SimulationOrchestrator::builder()
        .result_store(ResultStore::new(store))
        .config(config)
        .with_builtins()?
        .build()
}

fn cmd_run(scenario_path: &Path, store: &Path, config_path: Option<&Path>) -> AppResult<()> {
    let scenario = load_scenario(scenario_path)?;
    tracing::debug!(
        path = %scenario_path.display(),
        scenario_id = %scenario.scenario_id,
        "loaded scenario"
    );
    let config = match config_path {
        Some(path) => OrchestratorConfig::load(path)?,
        None => OrchestratorConfig::default(),
    };
    println!("Running scenario: {}", scenario.scenario_id);

    let mut orchestrator = orchestrator(store, config)?;
    orchestrator.subscribe(RunEventKind::RunProgress, |event| {
        if let RunEvent::RunProgress(progress) = event {
            print!(
                "\r{:>6.2}%  t={:.3}s",
                progress.progress_pct, progress.sim_time_s
            );
            io::stdout().flush()?;
        }
        Ok(())
    });
    orchestrator.subscribe(RunEventKind::RunFailed, |event| {
        if let RunEvent::RunFailed(failed) = event {
            println!();
            println!("✗ Run failed [{}]: {}", failed.error_code, failed.message);
            for (key, value) in &failed.diagnostics {
                println!("  {}: {}", key, value);
            }
        }
        Ok(())
    });

    let mut session = orchestrator.session();
    for failure in &session.load_report().failures {
        println!("! Plugin {} not loaded: {}", failure.name, failure.error);
    }

    let run_id = session.run(&scenario)?;
    println!();
    if let Some(state) = session.state(&run_id) {
        println!("Run {}: {}", run_id, state);
    }
    for artifact in session.artifacts(&run_id)? {
        println!("  {}", artifact.display());
    }
    Ok(())
}

fn cmd_show_run(run_id: &str, store: &Path) -> AppResult<()> {
    let store = ResultStore::new(store);
    let metadata = store.get_run_metadata(run_id)?;
    let samples = store.load_samples(run_id)?;

    let rendered =
        serde_json::to_string_pretty(&metadata).map_err(|e| AppError::Results(e.to_string()))?;
    println!("{}", rendered);
    println!("Samples: {}", samples.len());
    Ok(())
}

fn cmd_artifacts(run_id: &str, store: &Path) -> AppResult<()> {
    let store = ResultStore::new(store);
    let artifacts = store.list_artifacts(run_id)?;
    if artifacts.is_empty() {
        println!("No artifacts for run {}", run_id);
    }
    for artifact in artifacts {
        println!("{}", artifact.display());
    }
    Ok(())
}

fn cmd_export(
    run_id: &str,
    store: &Path,
    format: &str,
    output_dir: PathBuf,
    channels: Option<Vec<String>>,
) -> AppResult<()> {
    let orchestrator = orchestrator(store, OrchestratorConfig::default())?;
    let options = ExportOptions {
        output_dir,
        channels,
    };
    let path = orchestrator.export(run_id, format, &options)?;
    println!("✓ Exported {} to {}", run_id, path.display());
    Ok(())
}

fn cmd_plugins() -> AppResult<()> {
    let manager = PluginManager::new();
    let specs: Vec<_> = manager.discover().collect();
    if specs.is_empty() {
        println!("No plugins linked for group {}", manager.group());
    } else {
        println!("Plugins ({}):", manager.group());
        for spec in specs {
            println!("  {} {} ({})", spec.name, spec.version, spec.module);
        }
    }

    let builtins = builtin_registries()?;
    println!("Models:");
    for descriptor in builtins.models.descriptors() {
        println!("  {} -> {}", descriptor.name, descriptor.provides.join(", "));
    }
    println!("Solvers: {}", builtins.solvers.registered_solvers().join(", "));
    println!("Importers: {}", builtins.importers.formats().join(", "));
    println!("Exporters: {}", builtins.exporters.formats().join(", "));
    Ok(())
}
