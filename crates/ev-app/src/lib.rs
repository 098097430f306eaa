//! Run orchestration for EV pack simulations.
//!
//! [`SimulationOrchestrator`] owns the capability registries, the result store
//! and the plugin manager, executes scenarios and delivers run events to
//! subscribers. Frontends build one orchestrator per process.

pub mod builtins;
pub mod config;
pub mod error;
pub mod events;
pub mod failure;
pub mod lifecycle;
pub mod orchestrator;
mod stepping;

pub use builtins::{BuiltinRegistries, builtin_registries};
pub use config::OrchestratorConfig;
pub use error::{AppError, AppResult};
pub use events::{EventBus, ListenerError, ListenerResult};
pub use failure::RunFailure;
pub use lifecycle::{CancellationToken, RunState};
pub use orchestrator::{OrchestratorBuilder, OrchestratorSession, SimulationOrchestrator};
