//! Lumped battery pack model.

use ev_core::{ParameterMap, StateMap};

use crate::drive_cycle::DriveCycleModel;
use crate::error::{SimError, SimResult};
use crate::model::{ModelContext, SimulationModel};

const PROVIDES: &[&str] = &["pack.V", "pack.I", "soc"];
const DEPENDS_ON: &[&str] = &[DriveCycleModel::CURRENT_DEMAND];

/// Coulomb-counting pack model.
///
/// Positive current discharges the pack. The current is the drive-cycle
/// demand when an earlier model published one, otherwise `current_nominal`.
/// Terminal voltage scales linearly with state of charge.
#[derive(Debug, Clone)]
pub struct BatteryPackModel {
    capacity_ah: f64,
    voltage_nominal: f64,
    current_nominal: f64,
    soc_init: f64,
}

impl BatteryPackModel {
    pub const NAME: &'static str = "battery_pack";
}

impl Default for BatteryPackModel {
    fn default() -> Self {
        Self {
            capacity_ah: 100.0,
            voltage_nominal: 350.0,
            current_nominal: 0.0,
            soc_init: 1.0,
        }
    }
}

impl SimulationModel for BatteryPackModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn provides(&self) -> &[&'static str] {
        PROVIDES
    }

    fn depends_on(&self) -> &[&'static str] {
        DEPENDS_ON
    }

    fn configure(&mut self, parameters: &ParameterMap) -> SimResult<()> {
        if let Some(&capacity) = parameters.get("capacity_ah") {
            if capacity.is_nan() || capacity <= 0.0 {
                return Err(SimError::InvalidArg {
                    what: "capacity_ah must be positive",
                });
            }
            self.capacity_ah = capacity;
        }
        if let Some(&voltage) = parameters.get("voltage_nominal") {
            self.voltage_nominal = voltage;
        }
        if let Some(&current) = parameters.get("current_nominal") {
            self.current_nominal = current;
        }
        if let Some(&soc) = parameters.get("soc_init") {
            if !(0.0..=1.0).contains(&soc) {
                return Err(SimError::InvalidArg {
                    what: "soc_init must be within [0, 1]",
                });
            }
            self.soc_init = soc;
        }
        Ok(())
    }

    fn initial_state(&self) -> StateMap {
        StateMap::from([
            ("soc".to_string(), self.soc_init),
            ("pack.V".to_string(), self.voltage_nominal * self.soc_init),
            ("pack.I".to_string(), self.current_nominal),
        ])
    }

    fn evaluate(&mut self, context: &ModelContext, state: &StateMap) -> SimResult<StateMap> {
        let soc_prev = state.get("soc").copied().unwrap_or(self.soc_init);
        let current = state
            .get(DriveCycleModel::CURRENT_DEMAND)
            .copied()
            .unwrap_or(self.current_nominal);
        let delta = current * context.timestep_s / (self.capacity_ah * 3600.0);
        let soc = (soc_prev - delta).clamp(0.0, 1.0);
        if soc == 0.0 && soc_prev > 0.0 {
            tracing::warn!(time_s = context.time_s, "pack fully discharged");
        }
        let voltage = self.voltage_nominal * soc;
        if !voltage.is_finite() {
            return Err(SimError::NonPhysical {
                what: format!("pack voltage {voltage} at t={}s", context.time_s),
            });
        }

        Ok(StateMap::from([
            ("soc".to_string(), soc),
            ("pack.V".to_string(), voltage),
            ("pack.I".to_string(), current),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(dt: f64) -> ModelContext {
        ModelContext {
            seed: 42,
            time_s: 0.0,
            timestep_s: dt,
        }
    }

    #[test]
    fn idle_pack_holds_charge() {
        let mut model = BatteryPackModel::default();
        let state = model.initial_state();
        let next = model.evaluate(&context(1.0), &state).unwrap();
        assert_eq!(next["soc"], 1.0);
        assert_eq!(next["pack.V"], 350.0);
    }

    #[test]
    fn discharge_follows_coulomb_count() {
        let mut model = BatteryPackModel::default();
        model
            .configure(&ParameterMap::from([
                ("capacity_ah".to_string(), 10.0),
                ("current_nominal".to_string(), 36.0),
            ]))
            .unwrap();

        // 36 A for 100 s out of 10 Ah removes 10% charge
        let next = model
            .evaluate(&context(100.0), &model.initial_state())
            .unwrap();
        assert!((next["soc"] - 0.9).abs() < 1e-12);
        assert!((next["pack.V"] - 315.0).abs() < 1e-9);
        assert_eq!(next["pack.I"], 36.0);
    }

    #[test]
    fn published_demand_overrides_nominal_current() {
        let mut model = BatteryPackModel::default();
        model
            .configure(&ParameterMap::from([
                ("capacity_ah".to_string(), 10.0),
                ("current_nominal".to_string(), 1.0),
            ]))
            .unwrap();

        let mut state = model.initial_state();
        state.insert(DriveCycleModel::CURRENT_DEMAND.to_string(), 36.0);
        let next = model.evaluate(&context(100.0), &state).unwrap();
        assert_eq!(next["pack.I"], 36.0);
        assert!((next["soc"] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn soc_never_goes_negative() {
        let mut model = BatteryPackModel::default();
        model
            .configure(&ParameterMap::from([("current_nominal".to_string(), 1e6)]))
            .unwrap();
        let next = model
            .evaluate(&context(3600.0), &model.initial_state())
            .unwrap();
        assert_eq!(next["soc"], 0.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut model = BatteryPackModel::default();
        assert!(
            model
                .configure(&ParameterMap::from([("capacity_ah".to_string(), 0.0)]))
                .is_err()
        );
        assert!(
            model
                .configure(&ParameterMap::from([("soc_init".to_string(), 1.5)]))
                .is_err()
        );
    }
}
