//! Fixed-step marching solver.

use ev_core::StateMap;

use crate::error::{SimError, SimResult};
use crate::solver::{SolverBackend, SolverOptions, StepFn, StepRecord, StepStream};

/// Marches the step function forward with a constant timestep.
///
/// Without an explicit `max_steps` a single step is taken.
#[derive(Debug, Clone)]
pub struct FixedStepSolver {
    step_size_s: f64,
    max_steps: usize,
}

impl FixedStepSolver {
    pub const NAME: &'static str = "fixed_step";

    pub fn step_size_s(&self) -> f64 {
        self.step_size_s
    }
}

impl Default for FixedStepSolver {
    fn default() -> Self {
        Self {
            step_size_s: 0.1,
            max_steps: 1,
        }
    }
}

impl SolverBackend for FixedStepSolver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn configure(&mut self, options: &SolverOptions) -> SimResult<()> {
        if !options.step_size_s.is_finite() || options.step_size_s <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "step_size_s must be positive",
            });
        }
        if options.rtol <= 0.0 || options.atol <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "tolerances must be positive",
            });
        }
        if options.max_steps == Some(0) {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }

        self.step_size_s = options.step_size_s;
        self.max_steps = options.max_steps.unwrap_or(self.max_steps);
        tracing::debug!(
            step_size_s = self.step_size_s,
            max_steps = self.max_steps,
            "configured fixed-step solver"
        );
        Ok(())
    }

    fn planned_steps(&self) -> Option<usize> {
        Some(self.max_steps)
    }

    fn solve<'a>(&'a self, initial: StateMap, step_fn: StepFn<'a>) -> StepStream<'a> {
        Box::new(FixedStepIter {
            step_fn,
            state: initial,
            time_s: 0.0,
            dt: self.step_size_s,
            step: 0,
            max_steps: self.max_steps,
            done: false,
        })
    }
}

struct FixedStepIter<'a> {
    step_fn: StepFn<'a>,
    state: StateMap,
    time_s: f64,
    dt: f64,
    step: usize,
    max_steps: usize,
    done: bool,
}

impl Iterator for FixedStepIter<'_> {
    type Item = SimResult<StepRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.step >= self.max_steps {
            return None;
        }

        match (self.step_fn)(self.time_s, self.dt, &self.state) {
            Ok(next) => {
                self.state = next;
                self.step += 1;
                // Multiply instead of accumulating to avoid drift over long runs
                self.time_s = self.step as f64 * self.dt;
                Some(Ok(StepRecord {
                    step: self.step,
                    time_s: self.time_s,
                    state: self.state.clone(),
                }))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn counting_step() -> StepFn<'static> {
        Box::new(|_t: f64, _dt: f64, state: &StateMap| -> SimResult<StateMap> {
            let mut next = state.clone();
            *next.entry("count".to_string()).or_insert(0.0) += 1.0;
            Ok(next)
        })
    }

    #[test]
    fn default_takes_single_step() {
        let solver = FixedStepSolver::default();
        let records: Vec<_> = solver
            .solve(StateMap::new(), counting_step())
            .collect::<SimResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].step, 1);
        assert!((records[0].time_s - 0.1).abs() < 1e-12);
    }

    #[test]
    fn configured_steps_advance_time() {
        let mut solver = FixedStepSolver::default();
        solver
            .configure(&SolverOptions {
                step_size_s: 0.5,
                max_steps: Some(4),
                ..SolverOptions::default()
            })
            .unwrap();
        assert_eq!(solver.planned_steps(), Some(4));

        let records: Vec<_> = solver
            .solve(StateMap::new(), counting_step())
            .collect::<SimResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].time_s, 2.0);
        assert_eq!(records[3].state["count"], 4.0);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut solver = FixedStepSolver::default();
        let bad_dt = SolverOptions {
            step_size_s: 0.0,
            ..SolverOptions::default()
        };
        assert!(solver.configure(&bad_dt).is_err());

        let bad_steps = SolverOptions {
            max_steps: Some(0),
            ..SolverOptions::default()
        };
        assert!(solver.configure(&bad_steps).is_err());
    }

    #[test]
    fn stream_stops_after_error() {
        let mut solver = FixedStepSolver::default();
        solver
            .configure(&SolverOptions {
                max_steps: Some(10),
                ..SolverOptions::default()
            })
            .unwrap();

        let mut calls = 0;
        let step_fn: StepFn<'_> = Box::new(|t: f64, _dt: f64, state: &StateMap| -> SimResult<StateMap> {
            calls += 1;
            if t > 0.25 {
                return Err(SimError::NonPhysical {
                    what: "diverged".to_string(),
                });
            }
            Ok(state.clone())
        });
        let results: Vec<_> = solver.solve(StateMap::new(), step_fn).collect();

        assert_eq!(results.len(), 4);
        assert!(results[..3].iter().all(|r| r.is_ok()));
        assert!(results[3].is_err());
        assert_eq!(calls, 4);
    }

    proptest! {
        #[test]
        fn time_is_step_times_dt(dt in 1e-4f64..10.0, steps in 1usize..200) {
            let mut solver = FixedStepSolver::default();
            solver
                .configure(&SolverOptions {
                    step_size_s: dt,
                    max_steps: Some(steps),
                    ..SolverOptions::default()
                })
                .unwrap();

            let records: Vec<_> = solver
                .solve(StateMap::new(), counting_step())
                .collect::<SimResult<_>>()
                .unwrap();
            prop_assert_eq!(records.len(), steps);
            for record in &records {
                prop_assert_eq!(record.time_s, record.step as f64 * dt);
            }
        }
    }
}
