use crate::core::heating_systems::{GeneratorObservation, RampState};
use crate::simulation_time::SimulationTimeIteration;
use tracing::debug;

/// A combined heat-and-power unit: fixed electrical and thermal output
/// while running. Electrical output is logged with the generation sign
/// convention (`el_demand = -el_power`), so portfolio aggregation stays a
/// pure sum.
#[derive(Clone, Debug)]
pub struct CombinedHeatAndPower {
    identifier: String,
    /// electrical generation while running, in kW
    el_power: f64,
    /// thermal output while running, in kW
    th_power: f64,
    /// total (electrical + thermal) output per unit of fuel input, in (0, 1]
    overall_efficiency: f64,
    ramp_up_time: f64,
    ramp_down_time: f64,
    ramp: RampState,
    log: Vec<GeneratorObservation>,
}

impl CombinedHeatAndPower {
    /// Arguments:
    /// * `identifier` - name of the component within a portfolio
    /// * `el_power` - electrical generation while running, in kW
    /// * `th_power` - thermal output while running, in kW
    /// * `overall_efficiency` - combined output per unit of fuel input, in (0, 1]
    /// * `ramp_up_time`/`ramp_down_time` - ramp durations in multiples of the timestep
    /// * `min_runtime`/`min_stoptime` - minimum on/off durations in timesteps
    pub fn new(
        identifier: &str,
        el_power: f64,
        th_power: f64,
        overall_efficiency: f64,
        ramp_up_time: f64,
        ramp_down_time: f64,
        min_runtime: u32,
        min_stoptime: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            el_power,
            th_power,
            overall_efficiency,
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

    pub fn th_power(&self) -> f64 {
        self.th_power
    }

    pub fn overall_efficiency(&self) -> f64 {
        self.overall_efficiency
    }

    pub fn ramp_times(&self) -> (f64, f64) {
        (self.ramp_up_time, self.ramp_down_time)
    }

    /// Primary fuel draw while running, in kW.
    pub fn fuel_power(&self) -> f64 {
        (self.el_power + self.th_power) / self.overall_efficiency
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
                "CHP ramp-up blocked by minimum stop time"
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
                "CHP ramp-down blocked by minimum runtime"
            );
        }
        result
    }

    /// Operating record for the current timestep: rated thermal output and
    /// negative electrical demand while running, zeros otherwise.
    pub fn observations_for_timestamp(
        &self,
        _simtime: &SimulationTimeIteration,
    ) -> GeneratorObservation {
        if self.ramp.is_running() {
            GeneratorObservation {
                thermal_output: self.th_power,
                el_demand: -self.el_power,
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
    fn chp() -> CombinedHeatAndPower {
        CombinedHeatAndPower::new("chp_0", 6., 10., 0.8, 0., 0., 1, 2)
    }

    #[rstest]
    fn should_emit_generation_sign_while_running(mut chp: CombinedHeatAndPower) {
        assert_eq!(chp.ramp_up(&step(0)), Some(true));
        let observation = chp.observations_for_timestamp(&step(0));
        assert_eq!(observation.thermal_output, 10.);
        assert_eq!(observation.el_demand, -6.);
        assert!(observation.is_running);
    }

    #[rstest]
    fn should_draw_fuel_per_overall_efficiency(chp: CombinedHeatAndPower) {
        assert_relative_eq!(chp.fuel_power(), (6. + 10.) / 0.8);
    }

    #[rstest]
    fn should_couple_electrical_to_thermal_steps(mut chp: CombinedHeatAndPower) {
        let running = [true, true, false, true];
        for (index, on) in running.iter().enumerate() {
            let t_it = step(index);
            if *on {
                chp.ramp_up(&t_it);
            } else {
                chp.ramp_down(&t_it);
            }
            let observation = chp.observations_for_timestamp(&t_it);
            chp.log_observation(observation, &t_it);
        }
        for observation in chp.log() {
            // generation steps align one-to-one with thermal-output steps
            assert_eq!(observation.el_demand != 0., observation.thermal_output != 0.);
        }
    }
}
