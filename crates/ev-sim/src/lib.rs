//! Simulation capabilities for EV pack runs.
//!
//! Provides:
//! - the model capability and its registry
//! - the solver capability and its registry
//! - built-in `battery_pack`, `ambient` and `drive_cycle` models
//! - the built-in `fixed_step` solver

pub mod ambient;
pub mod battery;
pub mod drive_cycle;
pub mod error;
pub mod fixed_step;
pub mod model;
pub mod registry;
pub mod solver;

pub use ambient::AmbientModel;
pub use battery::BatteryPackModel;
pub use drive_cycle::{DriveCycleModel, DriveSample, load_drive_cycle};
pub use error::{SimError, SimResult};
pub use fixed_step::FixedStepSolver;
pub use model::{ModelContext, ModelDescriptor, SimulationModel};
pub use registry::{ModelFactory, ModelRegistry, SolverFactory, SolverRegistry};
pub use solver::{SolverBackend, SolverOptions, StepFn, StepRecord, StepStream};
