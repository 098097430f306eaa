//! Solver capability contract.

use ev_core::{SolverConfig, StateMap};

use crate::error::SimResult;

/// Advances the state by one step: `(time_s, timestep_s, state) -> next state`.
pub type StepFn<'a> = Box<dyn FnMut(f64, f64, &StateMap) -> SimResult<StateMap> + 'a>;

/// Lazy sequence of solved steps. Stops after the first error.
pub type StepStream<'a> = Box<dyn Iterator<Item = SimResult<StepRecord>> + 'a>;

/// Tuning knobs forwarded from the scenario's solver section.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub step_size_s: f64,
    pub rtol: f64,
    pub atol: f64,
    pub max_steps: Option<usize>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::from(&SolverConfig::default())
    }
}

impl From<&SolverConfig> for SolverOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            step_size_s: config.step_size_s,
            rtol: config.rtol,
            atol: config.atol,
            max_steps: config.max_steps,
        }
    }
}

/// State after one completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// 1-based step index.
    pub step: usize,
    /// Simulation time at the end of the step (seconds).
    pub time_s: f64,
    pub state: StateMap,
}

/// A stepping backend selected by name from the solver registry.
pub trait SolverBackend: Send {
    fn name(&self) -> &str;

    fn configure(&mut self, options: &SolverOptions) -> SimResult<()>;

    /// Number of steps `solve` will produce, when known up front.
    fn planned_steps(&self) -> Option<usize> {
        None
    }

    fn solve<'a>(&'a self, initial: StateMap, step_fn: StepFn<'a>) -> StepStream<'a>;
}
