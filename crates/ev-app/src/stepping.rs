//! Step loop driving models through a solver into the result store.

use ev_core::{RunProgress, Sample, ScenarioConfig, StateMap};
use ev_results::ResultStore;
use ev_sim::{
    ModelContext, ModelRegistry, SimResult, SimulationModel, SolverOptions, SolverRegistry, StepFn,
    StepRecord,
};

use crate::failure::RunFailure;
use crate::lifecycle::CancellationToken;

/// Inputs shared by both execution paths of one run.
pub(crate) struct StepPlan<'a> {
    pub run_id: &'a str,
    pub scenario: &'a ScenarioConfig,
    pub channels: &'a [String],
    pub batch_size: usize,
    pub cancel: Option<&'a CancellationToken>,
}

/// Execute the run body between `RunStarted` and finalization.
///
/// Every recorded progress event is also handed to `on_progress`.
pub(crate) fn execute(
    plan: &StepPlan<'_>,
    models: &ModelRegistry,
    solvers: &SolverRegistry,
    store: &mut ResultStore,
    on_progress: &mut dyn FnMut(RunProgress),
) -> Result<(), RunFailure> {
    if plan.scenario.models.is_empty() {
        let event =
            store.append_samples_with_progress(plan.run_id, &[], plan.channels, 0.0, 0.0)?;
        on_progress(event);
        return Ok(());
    }
    run_models(plan, models, solvers, store, on_progress)
}

fn run_models(
    plan: &StepPlan<'_>,
    registry: &ModelRegistry,
    solvers: &SolverRegistry,
    store: &mut ResultStore,
    on_progress: &mut dyn FnMut(RunProgress),
) -> Result<(), RunFailure> {
    let scenario = plan.scenario;

    let mut models: Vec<Box<dyn SimulationModel>> = Vec::with_capacity(scenario.models.len());
    for name in &scenario.models {
        let model = registry
            .create_for_scenario(name, scenario)
            .map_err(RunFailure::ModelUnavailable)?
            .map_err(|source| RunFailure::ModelConfiguration {
                model: name.clone(),
                source,
            })?;
        models.push(model);
    }

    let backend = &scenario.solver.backend;
    let mut solver = solvers
        .create(backend)
        .map_err(RunFailure::SolverUnavailable)?;
    solver
        .configure(&SolverOptions::from(&scenario.solver))
        .map_err(|source| RunFailure::SolverConfiguration {
            solver: backend.clone(),
            source,
        })?;

    let mut initial = StateMap::new();
    for model in &models {
        initial.extend(model.initial_state());
    }

    let seed = scenario.seed;
    let step_fn: StepFn<'_> = Box::new(
        move |time_s: f64, timestep_s: f64, state: &StateMap| -> SimResult<StateMap> {
            let context = ModelContext {
                seed,
                time_s,
                timestep_s,
            };
            let mut next = state.clone();
            for model in models.iter_mut() {
                let outputs = model.evaluate(&context, &next)?;
                next.extend(outputs);
            }
            Ok(next)
        },
    );

    let mut writer = BatchWriter {
        plan,
        store,
        on_progress,
        planned_steps: solver.planned_steps(),
        batch: Vec::with_capacity(plan.batch_size),
        appended: false,
    };
    tracing::debug!(
        run_id = plan.run_id,
        solver = %backend,
        models = ?scenario.models,
        planned_steps = ?writer.planned_steps,
        "starting step loop"
    );

    let mut steps = solver.solve(initial, step_fn);
    let mut last_step = 0;
    let mut last_time_s = 0.0;
    loop {
        if plan.cancel.is_some_and(CancellationToken::is_cancelled) {
            writer.flush(last_step, last_time_s)?;
            return Err(RunFailure::Cancelled {
                step: last_step,
                time_s: last_time_s,
            });
        }
        let Some(outcome) = steps.next() else {
            break;
        };
        match outcome {
            Ok(record) => {
                last_step = record.step;
                last_time_s = record.time_s;
                writer.push(project(&record, plan.channels));
                if writer.batch.len() >= plan.batch_size {
                    writer.flush(last_step, last_time_s)?;
                }
            }
            Err(source) => {
                writer.flush(last_step, last_time_s)?;
                return Err(RunFailure::Step {
                    step: last_step + 1,
                    time_s: last_time_s,
                    source,
                });
            }
        }
    }

    writer.flush(last_step, last_time_s)?;
    if !writer.appended {
        writer.append(&[], 0.0, 0.0)?;
    }
    Ok(())
}

/// Keep `time_s` plus every requested channel the state carries.
fn project(record: &StepRecord, channels: &[String]) -> Sample {
    let mut sample = Sample::new();
    sample.insert("time_s".to_string(), record.time_s);
    for channel in channels {
        if let Some(value) = record.state.get(channel) {
            sample.insert(channel.clone(), *value);
        }
    }
    sample
}

struct BatchWriter<'p, 's, 'c> {
    plan: &'p StepPlan<'p>,
    store: &'s mut ResultStore,
    on_progress: &'c mut dyn FnMut(RunProgress),
    planned_steps: Option<usize>,
    batch: Vec<Sample>,
    appended: bool,
}

impl BatchWriter<'_, '_, '_> {
    fn push(&mut self, sample: Sample) {
        self.batch.push(sample);
    }

    fn flush(&mut self, step: usize, time_s: f64) -> Result<(), RunFailure> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let progress_pct = match self.planned_steps {
            Some(planned) if planned > 0 => (step as f64 / planned as f64 * 100.0).min(100.0),
            _ => 0.0,
        };
        let batch = std::mem::take(&mut self.batch);
        self.append(&batch, progress_pct, time_s)
    }

    fn append(
        &mut self,
        samples: &[Sample],
        progress_pct: f64,
        time_s: f64,
    ) -> Result<(), RunFailure> {
        let event = self.store.append_samples_with_progress(
            self.plan.run_id,
            samples,
            self.plan.channels,
            progress_pct,
            time_s,
        )?;
        self.appended = true;
        (self.on_progress)(event);
        Ok(())
    }
}
