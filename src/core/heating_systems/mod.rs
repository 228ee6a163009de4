pub mod chp;
pub mod heat_pump;
pub mod heating_rod;
pub mod thermal_storage;

use crate::core::heating_systems::chp::CombinedHeatAndPower;
use crate::core::heating_systems::heat_pump::HeatPump;
use crate::core::heating_systems::heating_rod::HeatingRod;
use crate::simulation_time::SimulationTimeIteration;

/// One operating record of a thermal generator for a single timestep.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeneratorObservation {
    /// heat delivered over the step, in kW
    pub thermal_output: f64,
    /// electrical demand, in kW; consumption positive, generation negative
    pub el_demand: f64,
    /// coefficient of performance where the generator has one
    pub cop: Option<f64>,
    pub is_running: bool,
}

/// On/off state machine with minimum-runtime and minimum-stoptime
/// constraints, shared by all thermal generators. Times are simulation
/// hours; the constraints are integer multiples of the timestep.
///
/// At most one of the two ramp stamps is the later one; while running the
/// later stamp is always `last_ramp_up`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RampState {
    is_running: bool,
    last_ramp_up: Option<f64>,
    last_ramp_down: Option<f64>,
    min_runtime: u32,
    min_stoptime: u32,
}

impl RampState {
    pub fn new(min_runtime: u32, min_stoptime: u32) -> Self {
        Self {
            min_runtime,
            min_stoptime,
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn last_ramp_up(&self) -> Option<f64> {
        self.last_ramp_up
    }

    pub fn last_ramp_down(&self) -> Option<f64> {
        self.last_ramp_down
    }

    /// Whether enough stop time has elapsed since the last ramp-down.
    pub fn is_valid_ramp_up(&self, simtime: &SimulationTimeIteration) -> bool {
        match self.last_ramp_down {
            None => true,
            Some(down) => simtime.time - down >= self.min_stoptime as f64 * simtime.timestep,
        }
    }

    /// Whether enough runtime has elapsed since the last ramp-up.
    pub fn is_valid_ramp_down(&self, simtime: &SimulationTimeIteration) -> bool {
        match self.last_ramp_up {
            None => true,
            Some(up) => simtime.time - up >= self.min_runtime as f64 * simtime.timestep,
        }
    }

    /// `None` when already running, `Some(true)` on transition,
    /// `Some(false)` when the minimum stop time blocks it (state unchanged).
    pub fn ramp_up(&mut self, simtime: &SimulationTimeIteration) -> Option<bool> {
        if self.is_running {
            return None;
        }
        Some(if self.is_valid_ramp_up(simtime) {
            self.is_running = true;
            self.last_ramp_up = Some(simtime.time);
            true
        } else {
            false
        })
    }

    /// `None` when already stopped, `Some(true)` on transition,
    /// `Some(false)` when the minimum runtime blocks it (state unchanged).
    pub fn ramp_down(&mut self, simtime: &SimulationTimeIteration) -> Option<bool> {
        if !self.is_running {
            return None;
        }
        Some(if self.is_valid_ramp_down(simtime) {
            self.is_running = false;
            self.last_ramp_down = Some(simtime.time);
            true
        } else {
            false
        })
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.min_runtime, self.min_stoptime);
    }
}

/// The capability set the thermal storage needs from whatever generator it
/// drives, dispatched over the concrete generator kinds.
#[derive(Clone, Debug)]
pub enum ThermalGenerator {
    HeatPump(HeatPump),
    HeatingRod(HeatingRod),
    Chp(CombinedHeatAndPower),
}

impl ThermalGenerator {
    pub fn identifier(&self) -> &str {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.identifier(),
            ThermalGenerator::HeatingRod(heating_rod) => heating_rod.identifier(),
            ThermalGenerator::Chp(chp) => chp.identifier(),
        }
    }

    pub fn is_running(&self) -> bool {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.is_running(),
            ThermalGenerator::HeatingRod(heating_rod) => heating_rod.is_running(),
            ThermalGenerator::Chp(chp) => chp.is_running(),
        }
    }

    pub fn ramp_up(&mut self, simtime: &SimulationTimeIteration) -> Option<bool> {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.ramp_up(simtime),
            ThermalGenerator::HeatingRod(heating_rod) => heating_rod.ramp_up(simtime),
            ThermalGenerator::Chp(chp) => chp.ramp_up(simtime),
        }
    }

    pub fn ramp_down(&mut self, simtime: &SimulationTimeIteration) -> Option<bool> {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.ramp_down(simtime),
            ThermalGenerator::HeatingRod(heating_rod) => heating_rod.ramp_down(simtime),
            ThermalGenerator::Chp(chp) => chp.ramp_down(simtime),
        }
    }

    pub fn observations_for_timestamp(
        &self,
        simtime: &SimulationTimeIteration,
    ) -> GeneratorObservation {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.observations_for_timestamp(simtime),
            ThermalGenerator::HeatingRod(heating_rod) => {
                heating_rod.observations_for_timestamp(simtime)
            }
            ThermalGenerator::Chp(chp) => chp.observations_for_timestamp(simtime),
        }
    }

    pub fn log_observation(
        &mut self,
        observation: GeneratorObservation,
        simtime: &SimulationTimeIteration,
    ) {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => {
                heat_pump.log_observation(observation, simtime)
            }
            ThermalGenerator::HeatingRod(heating_rod) => {
                heating_rod.log_observation(observation, simtime)
            }
            ThermalGenerator::Chp(chp) => chp.log_observation(observation, simtime),
        }
    }

    /// The populated per-timestep log, oldest first.
    pub fn log(&self) -> &[GeneratorObservation] {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.log(),
            ThermalGenerator::HeatingRod(heating_rod) => heating_rod.log(),
            ThermalGenerator::Chp(chp) => chp.log(),
        }
    }

    pub fn reset_time_series(&mut self) {
        match self {
            ThermalGenerator::HeatPump(heat_pump) => heat_pump.reset_time_series(),
            ThermalGenerator::HeatingRod(heating_rod) => heating_rod.reset_time_series(),
            ThermalGenerator::Chp(chp) => chp.reset_time_series(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn step(index: usize) -> SimulationTimeIteration {
        SimulationTimeIteration {
            index,
            time: index as f64 * 0.25,
            timestep: 0.25,
        }
    }

    #[rstest]
    fn should_be_free_to_ramp_without_constraints() {
        let mut ramp = RampState::new(0, 0);
        assert_eq!(ramp.ramp_up(&step(0)), Some(true));
        assert_eq!(ramp.ramp_down(&step(0)), Some(true));
        assert_eq!(ramp.ramp_up(&step(0)), Some(true));
    }

    #[rstest]
    fn should_be_idempotent_in_target_state() {
        let mut ramp = RampState::new(1, 2);
        assert_eq!(ramp.ramp_down(&step(0)), None, "already stopped");
        assert_eq!(ramp.ramp_up(&step(0)), Some(true));
        assert_eq!(ramp.ramp_up(&step(1)), None, "already running");
    }

    #[rstest]
    fn should_block_restart_within_min_stoptime() {
        // up at t=0, down after exactly the minimum runtime, restart
        // blocked until 4 stopped steps have passed
        let mut ramp = RampState::new(1, 4);
        assert_eq!(ramp.ramp_up(&step(0)), Some(true));
        assert_eq!(ramp.ramp_down(&step(1)), Some(true));
        assert_eq!(ramp.ramp_up(&step(2)), Some(false));
        assert!(!ramp.is_running());
        assert_eq!(ramp.ramp_up(&step(5)), Some(true));
        assert!(ramp.is_running());
    }

    #[rstest]
    fn should_keep_later_stamp_on_ramp_up_while_running() {
        let mut ramp = RampState::new(1, 1);
        ramp.ramp_up(&step(0));
        ramp.ramp_down(&step(2));
        ramp.ramp_up(&step(4));
        assert!(ramp.is_running());
        assert!(ramp.last_ramp_up() > ramp.last_ramp_down());
    }
}
