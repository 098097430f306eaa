//! Model capability contract.

use ev_core::{ParameterMap, ScenarioConfig, StateMap};

use crate::error::SimResult;

/// Per-step context handed to [`SimulationModel::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelContext {
    pub seed: u64,
    /// Elapsed simulation time at the start of the step (seconds).
    pub time_s: f64,
    pub timestep_s: f64,
}

/// A named, configurable contributor to the run state.
///
/// Models read the merged state produced so far in the step and return the
/// quantities they own. The orchestrator merges returned values over the state
/// in model order.
pub trait SimulationModel: Send {
    /// Model name for logging and identification.
    fn name(&self) -> &str;

    /// Quantities this model writes.
    fn provides(&self) -> &[&'static str] {
        &[]
    }

    /// Quantities this model reads from other models.
    fn depends_on(&self) -> &[&'static str] {
        &[]
    }

    fn configure(&mut self, parameters: &ParameterMap) -> SimResult<()>;

    /// Read scenario-level inputs such as drive-cycle files. Runs after
    /// [`configure`](Self::configure) and before [`initial_state`](Self::initial_state).
    fn load_inputs(&mut self, _scenario: &ScenarioConfig) -> SimResult<()> {
        Ok(())
    }

    /// Values this model contributes before the first step.
    fn initial_state(&self) -> StateMap;

    fn evaluate(&mut self, context: &ModelContext, state: &StateMap) -> SimResult<StateMap>;
}

/// Metadata describing a registered model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub provides: Vec<String>,
    pub depends_on: Vec<String>,
    pub parameters: ParameterMap,
}
