//! Drive-cycle model fed from a speed trace on disk.
//!
//! The trace is a comma-separated file with a header row. `time_s` and
//! `speed_kph` are required; other columns (`phase`, `distance_m`, ...) are
//! ignored.

use std::fs;
use std::path::Path;

use ev_core::{ParameterMap, ScenarioConfig, StateMap};

use crate::error::{SimError, SimResult};
use crate::model::{ModelContext, SimulationModel};

const PROVIDES: &[&str] = &["veh_speed", "veh_accel", DriveCycleModel::CURRENT_DEMAND];

const KPH_PER_MPS: f64 = 3.6;

/// One row of a drive-cycle trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveSample {
    pub time_s: f64,
    pub speed_kph: f64,
}

/// Replays a speed trace and turns it into a pack current demand.
///
/// Demand is `base + speed_gain * v + accel_gain * a`, clamped at zero, with
/// `v` in m/s and `a` in m/s². Speed is held at the last sample at or before
/// the step time; past the end of the trace the final sample is held.
#[derive(Debug, Clone)]
pub struct DriveCycleModel {
    samples: Vec<DriveSample>,
    base_current_a: f64,
    speed_current_gain: f64,
    accel_current_gain: f64,
    previous_speed_mps: f64,
}

impl DriveCycleModel {
    pub const NAME: &'static str = "drive_cycle";
    /// State key carrying the requested pack current (A).
    pub const CURRENT_DEMAND: &'static str = "pack.I_demand";

    pub fn samples(&self) -> &[DriveSample] {
        &self.samples
    }

    fn speed_kph_at(&self, time_s: f64) -> f64 {
        let index = self
            .samples
            .partition_point(|sample| sample.time_s <= time_s)
            .saturating_sub(1);
        self.samples.get(index).map_or(0.0, |sample| sample.speed_kph)
    }

    fn current_demand(&self, speed_mps: f64, accel_mps2: f64) -> f64 {
        (self.base_current_a
            + self.speed_current_gain * speed_mps
            + self.accel_current_gain * accel_mps2)
            .max(0.0)
    }
}

impl Default for DriveCycleModel {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            base_current_a: 2.0,
            speed_current_gain: 0.4,
            accel_current_gain: 2.5,
            previous_speed_mps: 0.0,
        }
    }
}

impl SimulationModel for DriveCycleModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn provides(&self) -> &[&'static str] {
        PROVIDES
    }

    fn configure(&mut self, parameters: &ParameterMap) -> SimResult<()> {
        if let Some(&base) = parameters.get("base_current_a") {
            self.base_current_a = base;
        }
        if let Some(&gain) = parameters.get("speed_current_gain") {
            self.speed_current_gain = gain;
        }
        if let Some(&gain) = parameters.get("accel_current_gain") {
            self.accel_current_gain = gain;
        }
        Ok(())
    }

    fn load_inputs(&mut self, scenario: &ScenarioConfig) -> SimResult<()> {
        let path = scenario
            .drive_cycle
            .as_ref()
            .and_then(|cycle| cycle.source_path.as_deref())
            .ok_or_else(|| SimError::MissingParameter {
                name: "drive_cycle.source_path".to_string(),
            })?;
        self.samples = load_drive_cycle(path)?;
        self.previous_speed_mps = self
            .samples
            .first()
            .map_or(0.0, |sample| sample.speed_kph / KPH_PER_MPS);
        tracing::debug!(
            path = %path.display(),
            samples = self.samples.len(),
            "loaded drive cycle"
        );
        Ok(())
    }

    fn initial_state(&self) -> StateMap {
        let speed_kph = self.samples.first().map_or(0.0, |sample| sample.speed_kph);
        StateMap::from([
            ("veh_speed".to_string(), speed_kph),
            ("veh_accel".to_string(), 0.0),
            (
                Self::CURRENT_DEMAND.to_string(),
                self.current_demand(speed_kph / KPH_PER_MPS, 0.0),
            ),
        ])
    }

    fn evaluate(&mut self, context: &ModelContext, _state: &StateMap) -> SimResult<StateMap> {
        if context.timestep_s <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "timestep_s must be positive",
            });
        }
        let speed_kph = self.speed_kph_at(context.time_s);
        let speed_mps = speed_kph / KPH_PER_MPS;
        let accel_mps2 = (speed_mps - self.previous_speed_mps) / context.timestep_s;
        self.previous_speed_mps = speed_mps;

        Ok(StateMap::from([
            ("veh_speed".to_string(), speed_kph),
            ("veh_accel".to_string(), accel_mps2),
            (
                Self::CURRENT_DEMAND.to_string(),
                self.current_demand(speed_mps, accel_mps2),
            ),
        ]))
    }
}

/// Parse a drive-cycle trace. Fails unless at least one sample is present.
pub fn load_drive_cycle(path: &Path) -> SimResult<Vec<DriveSample>> {
    let input_error = |message: String| SimError::InputFile {
        path: path.to_path_buf(),
        message,
    };
    let content = fs::read_to_string(path).map_err(|err| input_error(err.to_string()))?;
    parse_drive_cycle(&content).map_err(input_error)
}

fn parse_drive_cycle(content: &str) -> Result<Vec<DriveSample>, String> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or("file is empty")?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |name: &str| columns.iter().position(|c| *c == name);
    let (Some(time_col), Some(speed_col)) = (column("time_s"), column("speed_kph")) else {
        return Err("header must contain time_s and speed_kph columns".to_string());
    };

    let mut samples = Vec::new();
    for (index, line) in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |col: usize, name: &str| -> Result<f64, String> {
            let raw = fields
                .get(col)
                .ok_or_else(|| format!("line {}: missing {name}", index + 1))?;
            raw.parse()
                .map_err(|_| format!("line {}: invalid {name} '{raw}'", index + 1))
        };
        let time_s = field(time_col, "time_s")?;
        let speed_kph = field(speed_col, "speed_kph")?;
        if samples
            .last()
            .is_some_and(|prev: &DriveSample| time_s <= prev.time_s)
        {
            return Err(format!("line {}: time_s must increase", index + 1));
        }
        samples.push(DriveSample { time_s, speed_kph });
    }

    if samples.is_empty() {
        return Err("no samples".to_string());
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "time_s,speed_kph,phase\n0,0,low\n1,3.6,low\n2,7.2,low\n3,7.2,low\n";

    fn loaded(trace: &str) -> DriveCycleModel {
        DriveCycleModel {
            samples: parse_drive_cycle(trace).unwrap(),
            ..DriveCycleModel::default()
        }
    }

    fn context(time_s: f64) -> ModelContext {
        ModelContext {
            seed: 42,
            time_s,
            timestep_s: 1.0,
        }
    }

    #[test]
    fn parses_required_columns_in_any_order() {
        let samples = parse_drive_cycle("phase,speed_kph,time_s\nlow,10,0\nlow,20,0.5\n").unwrap();
        assert_eq!(
            samples,
            vec![
                DriveSample {
                    time_s: 0.0,
                    speed_kph: 10.0
                },
                DriveSample {
                    time_s: 0.5,
                    speed_kph: 20.0
                },
            ]
        );
    }

    #[test]
    fn rejects_unusable_traces() {
        assert!(parse_drive_cycle("").is_err());
        assert!(parse_drive_cycle("time_s,speed_kph\n").is_err());
        assert!(parse_drive_cycle("time_s,velocity\n0,1\n").is_err());
        assert!(parse_drive_cycle("time_s,speed_kph\n0,fast\n").is_err());
        assert!(parse_drive_cycle("time_s,speed_kph\n1,0\n1,5\n").is_err());
    }

    #[test]
    fn speed_is_held_between_samples() {
        let model = loaded(TRACE);
        assert_eq!(model.speed_kph_at(0.0), 0.0);
        assert_eq!(model.speed_kph_at(1.5), 3.6);
        assert_eq!(model.speed_kph_at(2.0), 7.2);
        assert_eq!(model.speed_kph_at(60.0), 7.2);
    }

    #[test]
    fn demand_follows_speed_and_acceleration() {
        let mut model = loaded(TRACE);
        let state = model.initial_state();
        assert_eq!(state["veh_speed"], 0.0);
        assert_eq!(state[DriveCycleModel::CURRENT_DEMAND], 2.0);

        // 0 -> 1 m/s in one second
        let next = model.evaluate(&context(1.0), &state).unwrap();
        assert_eq!(next["veh_speed"], 3.6);
        assert!((next["veh_accel"] - 1.0).abs() < 1e-12);
        assert!((next[DriveCycleModel::CURRENT_DEMAND] - (2.0 + 0.4 + 2.5)).abs() < 1e-12);
    }

    #[test]
    fn braking_never_requests_negative_current() {
        let mut model = loaded("time_s,speed_kph\n0,100\n1,0\n");
        model.previous_speed_mps = 100.0 / KPH_PER_MPS;
        let next = model.evaluate(&context(1.0), &StateMap::new()).unwrap();
        assert!(next["veh_accel"] < 0.0);
        assert_eq!(next[DriveCycleModel::CURRENT_DEMAND], 0.0);
    }

    #[test]
    fn scenario_without_trace_is_rejected() {
        let mut model = DriveCycleModel::default();
        let err = model
            .load_inputs(&ScenarioConfig::new("no-trace"))
            .unwrap_err();
        assert!(matches!(err, SimError::MissingParameter { .. }));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let path = Path::new("/nonexistent/wltp.csv");
        match load_drive_cycle(path) {
            Err(SimError::InputFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
