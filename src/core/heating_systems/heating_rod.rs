use crate::core::heating_systems::{GeneratorObservation, RampState};
use crate::simulation_time::SimulationTimeIteration;
use tracing::debug;

/// A resistive heating rod: near-unity conversion of electrical power to
/// heat, no COP. Carries the same operator contract as the heat pump so the
/// storage can drive either, and serves as the cold-weather generator in
/// bivalent layouts.
#[derive(Clone, Debug)]
pub struct HeatingRod {
    identifier: String,
    /// electrical power draw while running, in kW
    el_power: f64,
    /// conversion efficiency, in (0, 1]
    efficiency: f64,
    ramp_up_time: f64,
    ramp_down_time: f64,
    ramp: RampState,
    log: Vec<GeneratorObservation>,
}

impl HeatingRod {
    /// Arguments:
    /// * `identifier` - name of the component within a portfolio
    /// * `el_power` - electrical power draw while running, in kW
    /// * `efficiency` - electrical-to-thermal conversion efficiency, in (0, 1]
    /// * `ramp_up_time`/`ramp_down_time` - ramp durations in multiples of the timestep
    /// * `min_runtime`/`min_stoptime` - minimum on/off durations in timesteps
    pub fn new(
        identifier: &str,
        el_power: f64,
        efficiency: f64,
        ramp_up_time: f64,
        ramp_down_time: f64,
        min_runtime: u32,
        min_stoptime: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            el_power,
            efficiency,
            ramp_up_time,
            ramp_down_time,
            ramp: RampState::new(min_runtime, min_stoptime),
            log: Default::default(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn el_power(&self) -> f64 {
        self.el_power
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn ramp_times(&self) -> (f64, f64) {
        (self.ramp_up_time, self.ramp_down_time)
    }

    pub fn is_running(&self) -> bool {
        self.ramp.is_running()
    }

    pub fn last_ramp_up(&self) -> Option<f64> {
        self.ramp.last_ramp_up()
    }

    pub fn last_ramp_down(&self) -> Option<f64> {
        self.ramp.last_ramp_down()
    }

    pub fn is_valid_ramp_up(&self, simtime: &SimulationTimeIteration) -> bool {
        self.ramp.is_valid_ramp_up(simtime)
    }

    pub fn is_valid_ramp_down(&self, simtime: &SimulationTimeIteration) -> bool {
        self.ramp.is_valid_ramp_down(simtime)
    }

    pub fn ramp_up(&mut self, simtime: &SimulationTimeIteration) -> Option<bool> {
        let result = self.ramp.ramp_up(simtime);
        if result == Some(false) {
            debug!(
                identifier = self.identifier.as_str(),
                time = simtime.time,
                "heating rod ramp-up blocked by minimum stop time"
            );
        }
        result
    }

    pub fn ramp_down(&mut self, simtime: &SimulationTimeIteration) -> Option<bool> {
        let result = self.ramp.ramp_down(simtime);
        if result == Some(false) {
            debug!(
                identifier = self.identifier.as_str(),
                time = simtime.time,
                "heating rod ramp-down blocked by minimum runtime"
            );
        }
        result
    }

    /// Operating record for the current timestep: `el_power * efficiency`
    /// of heat while running, zeros otherwise.
    pub fn observations_for_timestamp(
        &self,
        _simtime: &SimulationTimeIteration,
    ) -> GeneratorObservation {
        if self.ramp.is_running() {
            GeneratorObservation {
                thermal_output: self.el_power * self.efficiency,
                el_demand: self.el_power,
                cop: None,
                is_running: true,
            }
        } else {
            Default::default()
        }
    }

    pub fn log_observation(
        &mut self,
        observation: GeneratorObservation,
        simtime: &SimulationTimeIteration,
    ) {
        debug_assert_eq!(self.log.len(), simtime.time_series_idx(0, simtime.timestep));
        self.log.push(observation);
    }

    pub fn log(&self) -> &[GeneratorObservation] {
        &self.log
    }

    pub fn value_for_timestamp(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        self.log
            .get(simtime.time_series_idx(0, simtime.timestep))
            .map(|observation| observation.el_demand)
    }

    pub fn reset_time_series(&mut self) {
        self.log.clear();
        self.ramp.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn step(index: usize) -> SimulationTimeIteration {
        SimulationTimeIteration {
            index,
            time: index as f64 * 0.25,
            timestep: 0.25,
        }
    }

    #[fixture]
    fn heating_rod() -> HeatingRod {
        HeatingRod::new("rod_0", 3., 0.95, 0., 0., 1, 1)
    }

    #[rstest]
    fn should_emit_heat_scaled_by_efficiency(mut heating_rod: HeatingRod) {
        assert_eq!(heating_rod.ramp_up(&step(0)), Some(true));
        let observation = heating_rod.observations_for_timestamp(&step(0));
        assert_relative_eq!(observation.thermal_output, 3. * 0.95);
        assert_eq!(observation.el_demand, 3.);
        assert!(observation.cop.is_none());
    }

    #[rstest]
    fn should_observe_zeros_when_off(heating_rod: HeatingRod) {
        assert_eq!(
            heating_rod.observations_for_timestamp(&step(0)),
            Default::default()
        );
    }

    #[rstest]
    fn should_log_and_answer_value_for_timestamp(mut heating_rod: HeatingRod) {
        heating_rod.ramp_up(&step(0));
        let observation = heating_rod.observations_for_timestamp(&step(0));
        heating_rod.log_observation(observation, &step(0));
        assert_eq!(heating_rod.value_for_timestamp(&step(0)), Some(3.));
        assert_eq!(heating_rod.value_for_timestamp(&step(1)), None);
    }
}
