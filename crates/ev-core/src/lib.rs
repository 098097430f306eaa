//! ev-core: shared vocabulary for the EV simulation workspace.
//!
//! Contains:
//! - scenario (run inputs + canonical channel resolution)
//! - events (run lifecycle event records)
//! - registry (name -> factory tables shared by every capability registry)
//! - error (scenario loading errors)

pub mod error;
pub mod events;
pub mod registry;
pub mod scenario;

use std::collections::BTreeMap;

pub use error::{ScenarioError, ScenarioResult};
pub use events::{
    RunCompleted, RunEvent, RunEventKind, RunFailed, RunProgress, RunStarted, UnknownEventKind,
};
pub use registry::{CapabilityKind, FactoryTable, RegistryError, RegistryResult};
pub use scenario::{
    AmbientConfig, DEFAULT_CHANNELS, DriveCycleConfig, OutputChannel, PackConfig,
    ScenarioConfig, SolverConfig, load_scenario,
};

/// Opaque identifier of one run invocation.
pub type RunId = String;

/// Named scalar state passed between models and solvers.
pub type StateMap = BTreeMap<String, f64>;

/// Named scalar parameters used to configure a model.
pub type ParameterMap = BTreeMap<String, f64>;

/// One recorded sample: channel name -> scalar value.
pub type Sample = BTreeMap<String, f64>;
