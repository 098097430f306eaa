//! Model and solver registries.

use ev_core::{CapabilityKind, FactoryTable, ParameterMap, RegistryResult, ScenarioConfig};

use crate::error::SimResult;
use crate::model::{ModelDescriptor, SimulationModel};
use crate::solver::SolverBackend;

/// Builds a fresh model instance.
pub type ModelFactory = Box<dyn Fn() -> Box<dyn SimulationModel> + Send + Sync>;

/// Builds a fresh solver instance.
pub type SolverFactory = Box<dyn Fn() -> Box<dyn SolverBackend> + Send + Sync>;

/// Name -> model factory table.
pub struct ModelRegistry {
    models: FactoryTable<ModelFactory>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: FactoryTable::new(CapabilityKind::Model),
        }
    }

    pub fn register<F, M>(&mut self, name: impl Into<String>, factory: F) -> RegistryResult<()>
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: SimulationModel + 'static,
    {
        let boxed: ModelFactory = Box::new(move || Box::new(factory()));
        self.models.insert(name, boxed)
    }

    /// Instantiate `name` and configure it with `parameters`.
    ///
    /// The outer result reports lookup failures, the inner one configuration
    /// failures from the model itself.
    pub fn create(
        &self,
        name: &str,
        parameters: &ParameterMap,
    ) -> RegistryResult<SimResult<Box<dyn SimulationModel>>> {
        let factory = self.models.get(name)?;
        let mut model = factory();
        Ok(model.configure(parameters).map(|()| model))
    }

    /// Instantiate `name` for a run of `scenario`: configure it with the
    /// scenario's model parameters, then let it load its inputs.
    pub fn create_for_scenario(
        &self,
        name: &str,
        scenario: &ScenarioConfig,
    ) -> RegistryResult<SimResult<Box<dyn SimulationModel>>> {
        let created = self.create(name, &scenario.model_parameters())?;
        Ok(created.and_then(|mut model| model.load_inputs(scenario).map(|()| model)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains(name)
    }

    pub fn registered_models(&self) -> Vec<String> {
        self.models.names().map(str::to_string).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = ModelDescriptor> + '_ {
        self.models.iter().map(|(name, factory)| {
            let model = factory();
            ModelDescriptor {
                name: name.to_string(),
                provides: model.provides().iter().map(|q| q.to_string()).collect(),
                depends_on: model.depends_on().iter().map(|q| q.to_string()).collect(),
                parameters: ParameterMap::new(),
            }
        })
    }
}

/// Name -> solver factory table.
pub struct SolverRegistry {
    solvers: FactoryTable<SolverFactory>,
}

impl Default for SolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverRegistry {
    pub fn new() -> Self {
        Self {
            solvers: FactoryTable::new(CapabilityKind::Solver),
        }
    }

    pub fn register<F, S>(&mut self, name: impl Into<String>, factory: F) -> RegistryResult<()>
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: SolverBackend + 'static,
    {
        let boxed: SolverFactory = Box::new(move || Box::new(factory()));
        self.solvers.insert(name, boxed)
    }

    pub fn create(&self, name: &str) -> RegistryResult<Box<dyn SolverBackend>> {
        let factory = self.solvers.get(name)?;
        Ok(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.solvers.contains(name)
    }

    pub fn registered_solvers(&self) -> Vec<String> {
        self.solvers.names().map(str::to_string).collect()
    }
}
