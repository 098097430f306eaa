//! Ambient conditions model.

use ev_core::{ParameterMap, StateMap};

use crate::error::SimResult;
use crate::model::{ModelContext, SimulationModel};

const PROVIDES: &[&str] = &["ambient.T"];

/// Publishes a constant ambient temperature (°C).
#[derive(Debug, Clone)]
pub struct AmbientModel {
    temperature_c: f64,
}

impl AmbientModel {
    pub const NAME: &'static str = "ambient";
}

impl Default for AmbientModel {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
        }
    }
}

impl SimulationModel for AmbientModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn provides(&self) -> &[&'static str] {
        PROVIDES
    }

    fn configure(&mut self, parameters: &ParameterMap) -> SimResult<()> {
        if let Some(&temperature) = parameters.get("ambient_temperature_c") {
            self.temperature_c = temperature;
        }
        Ok(())
    }

    fn initial_state(&self) -> StateMap {
        StateMap::from([("ambient.T".to_string(), self.temperature_c)])
    }

    fn evaluate(&mut self, _context: &ModelContext, _state: &StateMap) -> SimResult<StateMap> {
        Ok(self.initial_state())
    }
}
