//! Run orchestration service.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use ev_core::{
    RunCompleted, RunEvent, RunEventKind, RunFailed, RunId, RunProgress, RunStarted,
    ScenarioConfig,
};
use ev_io::{
    ChannelMapping, Dataset, ExportOptions, ExporterRegistry, ImportedData, ImporterRegistry,
};
use ev_plugins::{LoadReport, PluginManager};
use ev_results::{ResultStore, RunMetadata};
use ev_sim::{ModelRegistry, SolverRegistry};
use uuid::Uuid;

use crate::builtins::builtin_registries;
use crate::config::OrchestratorConfig;
use crate::error::AppResult;
use crate::events::{EventBus, ListenerResult};
use crate::failure::RunFailure;
use crate::lifecycle::{CancellationToken, RunState};
use crate::stepping::{self, StepPlan};

/// Owns the capability registries, the result store and the plugin manager,
/// and executes scenarios against them.
///
/// `run` is synchronous: every event for the run has been delivered by the
/// time it returns.
pub struct SimulationOrchestrator {
    models: ModelRegistry,
    solvers: SolverRegistry,
    importers: ImporterRegistry,
    exporters: ExporterRegistry,
    result_store: ResultStore,
    plugins: PluginManager,
    config: OrchestratorConfig,
    events: EventBus,
    runs: HashMap<RunId, RunState>,
}

impl Default for SimulationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationOrchestrator {
    /// Orchestrator with empty registries and a store under `storage/runtime`.
    pub fn new() -> Self {
        Self::from_parts(OrchestratorBuilder::default(), OrchestratorConfig::default())
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    fn from_parts(builder: OrchestratorBuilder, config: OrchestratorConfig) -> Self {
        Self {
            models: builder.models.unwrap_or_default(),
            solvers: builder.solvers.unwrap_or_default(),
            importers: builder.importers.unwrap_or_default(),
            exporters: builder.exporters.unwrap_or_default(),
            result_store: builder.result_store.unwrap_or_default(),
            plugins: builder.plugins.unwrap_or_default(),
            config,
            events: EventBus::new(),
            runs: HashMap::new(),
        }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelRegistry {
        &mut self.models
    }

    pub fn solvers(&self) -> &SolverRegistry {
        &self.solvers
    }

    pub fn solvers_mut(&mut self) -> &mut SolverRegistry {
        &mut self.solvers
    }

    pub fn importers(&self) -> &ImporterRegistry {
        &self.importers
    }

    pub fn importers_mut(&mut self) -> &mut ImporterRegistry {
        &mut self.importers
    }

    pub fn exporters(&self) -> &ExporterRegistry {
        &self.exporters
    }

    pub fn exporters_mut(&mut self) -> &mut ExporterRegistry {
        &mut self.exporters
    }

    pub fn result_store(&self) -> &ResultStore {
        &self.result_store
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Open a scoped session: plugins load now (when enabled) and unload when
    /// the session is dropped, whichever way the scope is left.
    pub fn session(&mut self) -> OrchestratorSession<'_> {
        let report = if self.config.enable_plugins {
            let report = self.plugins.load();
            tracing::info!(
                loaded = report.loaded.len(),
                failed = report.failures.len(),
                "plugins loaded"
            );
            report
        } else {
            LoadReport::default()
        };
        OrchestratorSession {
            orchestrator: self,
            report,
        }
    }

    /// Execute `scenario` and return the new run's id.
    ///
    /// Failures after `RunStarted` are reported as `RunFailed` and the id is
    /// still returned. Only failures to create the run's storage are `Err`.
    pub fn run(&mut self, scenario: &ScenarioConfig) -> AppResult<RunId> {
        self.execute_run(scenario, None)
    }

    /// Like [`run`](Self::run), checking `cancel` before every solver step.
    pub fn run_with_cancel(
        &mut self,
        scenario: &ScenarioConfig,
        cancel: &CancellationToken,
    ) -> AppResult<RunId> {
        self.execute_run(scenario, Some(cancel))
    }

    fn execute_run(
        &mut self,
        scenario: &ScenarioConfig,
        cancel: Option<&CancellationToken>,
    ) -> AppResult<RunId> {
        let started_at = Instant::now();
        let run_id = Uuid::new_v4().simple().to_string();

        self.result_store.initialize_run(&run_id, scenario)?;
        self.runs.insert(run_id.clone(), RunState::Created);

        self.emit(
            RunStarted {
                run_id: run_id.clone(),
                scenario_id: scenario.scenario_id.clone(),
                timestamp: Utc::now(),
            }
            .into(),
        );
        self.runs.insert(run_id.clone(), RunState::Running);
        tracing::info!(run_id = %run_id, scenario_id = %scenario.scenario_id, "run started");

        let channels = scenario.canonical_channels();
        let plan = StepPlan {
            run_id: &run_id,
            scenario,
            channels: &channels,
            batch_size: self.config.sample_batch_size,
            cancel,
        };

        match self.step_and_finalize(&plan) {
            Ok(artifacts) => {
                self.runs.insert(run_id.clone(), RunState::Completed);
                tracing::info!(
                    run_id = %run_id,
                    artifacts = artifacts.len(),
                    elapsed_s = started_at.elapsed().as_secs_f64(),
                    "run completed"
                );
                self.emit(
                    RunCompleted {
                        run_id: run_id.clone(),
                        scenario_id: scenario.scenario_id.clone(),
                        timestamp: Utc::now(),
                        artifacts,
                    }
                    .into(),
                );
            }
            Err(failure) => {
                self.runs.insert(run_id.clone(), RunState::Failed);
                tracing::warn!(
                    run_id = %run_id,
                    code = failure.code(),
                    error = %failure,
                    elapsed_s = started_at.elapsed().as_secs_f64(),
                    "run failed"
                );
                self.emit(
                    RunFailed {
                        run_id: run_id.clone(),
                        scenario_id: scenario.scenario_id.clone(),
                        timestamp: Utc::now(),
                        error_code: failure.code().to_string(),
                        message: failure.to_string(),
                        diagnostics: failure.diagnostics(),
                    }
                    .into(),
                );
            }
        }

        Ok(run_id)
    }

    fn step_and_finalize(&mut self, plan: &StepPlan<'_>) -> Result<Vec<PathBuf>, RunFailure> {
        let Self {
            models,
            solvers,
            result_store,
            events,
            config,
            ..
        } = self;
        let stream_events = config.enable_event_stream;
        let mut on_progress = |event: RunProgress| {
            if stream_events {
                events.emit(&RunEvent::from(event));
            }
        };

        stepping::execute(plan, models, solvers, result_store, &mut on_progress)?;
        let finished = result_store.finalize_run(plan.run_id)?;
        on_progress(finished);
        Ok(result_store.list_artifacts(plan.run_id)?)
    }

    fn emit(&mut self, event: RunEvent) {
        if self.config.enable_event_stream {
            self.events.emit(&event);
        }
    }

    /// Replay the progress recorded for `run_id`, oldest first.
    pub fn progress(&self, run_id: &str) -> impl Iterator<Item = RunProgress> + '_ {
        self.result_store.iter_progress(run_id)
    }

    /// Persisted metadata of `run_id`.
    pub fn result(&self, run_id: &str) -> AppResult<RunMetadata> {
        Ok(self.result_store.get_run_metadata(run_id)?)
    }

    /// Lifecycle state of a run started by this orchestrator.
    pub fn state(&self, run_id: &str) -> Option<RunState> {
        self.runs.get(run_id).copied()
    }

    pub fn artifacts(&self, run_id: &str) -> AppResult<Vec<PathBuf>> {
        Ok(self.result_store.list_artifacts(run_id)?)
    }

    pub fn subscribe<F>(&mut self, kind: RunEventKind, listener: F)
    where
        F: FnMut(&RunEvent) -> ListenerResult + Send + 'static,
    {
        self.events.subscribe(kind, listener);
    }

    /// Subscribe by event name (`"RunCompleted"`, ...).
    pub fn subscribe_named<F>(&mut self, event_name: &str, listener: F) -> AppResult<()>
    where
        F: FnMut(&RunEvent) -> ListenerResult + Send + 'static,
    {
        let kind = RunEventKind::from_str(event_name)?;
        self.subscribe(kind, listener);
        Ok(())
    }

    pub fn listener_count(&self, kind: RunEventKind) -> usize {
        self.events.listener_count(kind)
    }

    /// Write a stored run through the exporter registered for `format`.
    pub fn export(
        &self,
        run_id: &str,
        format: &str,
        options: &ExportOptions,
    ) -> AppResult<PathBuf> {
        let exporter = self.exporters.create(format)?;
        let metadata = self.result_store.get_run_metadata(run_id)?;
        let samples = self.result_store.load_samples(run_id)?;
        let dataset = Dataset {
            run_id: metadata.run_id,
            scenario_id: metadata.scenario_id,
            channels: metadata.requested_channels,
            samples,
            metadata: metadata.metadata,
        };
        let path = exporter.export(&dataset, options)?;
        tracing::info!(run_id, format, path = %path.display(), "exported run");
        Ok(path)
    }

    pub fn import(
        &self,
        format: &str,
        path: &Path,
        mapping: &ChannelMapping,
    ) -> AppResult<ImportedData> {
        let importer = self.importers.create(format)?;
        Ok(importer.import_file(path, mapping)?)
    }
}

/// Scoped orchestrator access with plugins loaded for the session's lifetime.
pub struct OrchestratorSession<'a> {
    orchestrator: &'a mut SimulationOrchestrator,
    report: LoadReport,
}

impl OrchestratorSession<'_> {
    /// Outcome of the plugin load performed when the session opened.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }
}

impl Deref for OrchestratorSession<'_> {
    type Target = SimulationOrchestrator;

    fn deref(&self) -> &Self::Target {
        self.orchestrator
    }
}

impl DerefMut for OrchestratorSession<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.orchestrator
    }
}

impl Drop for OrchestratorSession<'_> {
    fn drop(&mut self) {
        self.orchestrator.plugins.unload();
        tracing::debug!("plugins unloaded");
    }
}

/// Collects optional pre-built collaborators; omitted ones are default-constructed.
#[derive(Default)]
pub struct OrchestratorBuilder {
    models: Option<ModelRegistry>,
    solvers: Option<SolverRegistry>,
    importers: Option<ImporterRegistry>,
    exporters: Option<ExporterRegistry>,
    result_store: Option<ResultStore>,
    plugins: Option<PluginManager>,
    config: Option<OrchestratorConfig>,
}

impl OrchestratorBuilder {
    pub fn models(mut self, models: ModelRegistry) -> Self {
        self.models = Some(models);
        self
    }

    pub fn solvers(mut self, solvers: SolverRegistry) -> Self {
        self.solvers = Some(solvers);
        self
    }

    pub fn importers(mut self, importers: ImporterRegistry) -> Self {
        self.importers = Some(importers);
        self
    }

    pub fn exporters(mut self, exporters: ExporterRegistry) -> Self {
        self.exporters = Some(exporters);
        self
    }

    pub fn result_store(mut self, store: ResultStore) -> Self {
        self.result_store = Some(store);
        self
    }

    pub fn plugins(mut self, plugins: PluginManager) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the built-in registries for all four capability kinds.
    ///
    /// Replaces any registry set earlier on this builder.
    pub fn with_builtins(self) -> AppResult<Self> {
        let builtins = builtin_registries()?;
        Ok(self
            .models(builtins.models)
            .solvers(builtins.solvers)
            .importers(builtins.importers)
            .exporters(builtins.exporters))
    }

    pub fn build(mut self) -> AppResult<SimulationOrchestrator> {
        let config = self.config.take().unwrap_or_default();
        config.validate()?;
        Ok(SimulationOrchestrator::from_parts(self, config))
    }
}
