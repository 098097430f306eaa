//! Failures inside a started run, reported through `RunFailed`.

use std::collections::BTreeMap;

use ev_core::RegistryError;
use ev_results::ResultsError;
use ev_sim::SimError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunFailure {
    #[error("model unavailable: {0}")]
    ModelUnavailable(RegistryError),

    #[error("solver unavailable: {0}")]
    SolverUnavailable(RegistryError),

    #[error("model '{model}' could not be configured: {source}")]
    ModelConfiguration { model: String, source: SimError },

    #[error("solver '{solver}' rejected its options: {source}")]
    SolverConfiguration { solver: String, source: SimError },

    #[error("step {step} failed at t={time_s}s: {source}")]
    Step {
        step: usize,
        time_s: f64,
        source: SimError,
    },

    #[error("result storage failed: {0}")]
    Storage(#[from] ResultsError),

    #[error("run cancelled after step {step} (t={time_s}s)")]
    Cancelled { step: usize, time_s: f64 },
}

impl RunFailure {
    /// Stable machine-readable code carried as `RunFailed::error_code`.
    pub fn code(&self) -> &'static str {
        match self {
            RunFailure::ModelUnavailable(_) => "model_not_registered",
            RunFailure::SolverUnavailable(_) => "solver_not_registered",
            RunFailure::ModelConfiguration { .. } => "model_configuration",
            RunFailure::SolverConfiguration { .. } => "solver_configuration",
            RunFailure::Step { .. } => "step_failed",
            RunFailure::Storage(_) => "storage",
            RunFailure::Cancelled { .. } => "cancelled",
        }
    }

    pub fn diagnostics(&self) -> BTreeMap<String, String> {
        let mut diagnostics = BTreeMap::new();
        match self {
            RunFailure::ModelUnavailable(err) | RunFailure::SolverUnavailable(err) => {
                let (RegistryError::NotRegistered { kind, name }
                | RegistryError::Duplicate { kind, name }) = err;
                diagnostics.insert("kind".to_string(), kind.to_string());
                diagnostics.insert("name".to_string(), name.clone());
            }
            RunFailure::ModelConfiguration { model, .. } => {
                diagnostics.insert("model".to_string(), model.clone());
            }
            RunFailure::SolverConfiguration { solver, .. } => {
                diagnostics.insert("solver".to_string(), solver.clone());
            }
            RunFailure::Step { step, time_s, .. } | RunFailure::Cancelled { step, time_s } => {
                diagnostics.insert("step".to_string(), step.to_string());
                diagnostics.insert("sim_time_s".to_string(), time_s.to_string());
            }
            RunFailure::Storage(_) => {}
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_core::CapabilityKind;

    #[test]
    fn codes_and_diagnostics() {
        let failure = RunFailure::SolverUnavailable(RegistryError::NotRegistered {
            kind: CapabilityKind::Solver,
            name: "cvode".to_string(),
        });
        assert_eq!(failure.code(), "solver_not_registered");
        assert_eq!(failure.diagnostics()["name"], "cvode");

        let cancelled = RunFailure::Cancelled {
            step: 3,
            time_s: 0.3,
        };
        assert_eq!(cancelled.code(), "cancelled");
        assert_eq!(cancelled.diagnostics()["step"], "3");
    }
}
