use crate::core::heating_systems::{GeneratorObservation, RampState};
use crate::core::user_profile::UserProfile;
use crate::environment::Environment;
use crate::simulation_time::SimulationTimeIteration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Type to represent an electrically driven heat pump attached to a
/// household heating system.
///
/// The COP model is an empirical fit over the spread between the heating
/// system flow temperature and the ambient (source) temperature; thermal
/// output follows `el_power * COP` while running, so the nameplate
/// `th_power` is a rating used for storage sizing, not for dispatch.
#[derive(Clone, Debug)]
pub struct HeatPump {
    identifier: String,
    heat_pump_type: HeatPumpType,
    /// heating system flow temperature, in deg C
    heat_sys_temp: f64,
    /// electrical power draw while running, in kW
    el_power: f64,
    /// nameplate thermal power, in kW
    th_power: f64,
    /// ramp durations, in multiples of the timestep (metadata for layout)
    ramp_up_time: f64,
    ramp_down_time: f64,
    ramp: RampState,
    user_profile: Arc<UserProfile>,
    environment: Arc<Environment>,
    log: Vec<GeneratorObservation>,
    /// unconstrained electrical demand trace from `prepare_time_series`, in kW
    el_demand_series: Vec<f64>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum HeatPumpType {
    Air,
    Ground,
}

impl HeatPump {
    /// Arguments:
    /// * `identifier` - name of the component within a portfolio
    /// * `heat_pump_type` - air or ground source
    /// * `heat_sys_temp` - heating system flow temperature, in deg C
    /// * `el_power` - electrical power draw while running, in kW
    /// * `th_power` - nameplate thermal power, in kW
    /// * `ramp_up_time`/`ramp_down_time` - ramp durations in multiples of the timestep
    /// * `min_runtime`/`min_stoptime` - minimum on/off durations in timesteps
    /// * `user_profile` - owning profile, for thermal demand lookup
    /// * `environment` - shared ambient-temperature series
    pub fn new(
        identifier: &str,
        heat_pump_type: HeatPumpType,
        heat_sys_temp: f64,
        el_power: f64,
        th_power: f64,
        ramp_up_time: f64,
        ramp_down_time: f64,
        min_runtime: u32,
        min_stoptime: u32,
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            heat_pump_type,
            heat_sys_temp,
            el_power,
            th_power,
            ramp_up_time,
            ramp_down_time,
            ramp: RampState::new(min_runtime, min_stoptime),
            user_profile,
            environment,
            log: Default::default(),
            el_demand_series: Default::default(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn heat_pump_type(&self) -> HeatPumpType {
        self.heat_pump_type
    }

    pub fn el_power(&self) -> f64 {
        self.el_power
    }

    pub fn th_power(&self) -> f64 {
        self.th_power
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

    /// Coefficient of performance at the given ambient temperature,
    /// piecewise by source type over the temperature spread.
    pub fn cop(&self, temp_ambient: f64) -> f64 {
        let spread = self.heat_sys_temp - temp_ambient;
        match self.heat_pump_type {
            HeatPumpType::Air => 6.81 - 0.121 * spread + 0.000_63 * spread.powi(2),
            HeatPumpType::Ground => 8.77 - 0.15 * spread + 0.000_734 * spread.powi(2),
        }
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
                "heat pump ramp-up blocked by minimum stop time"
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
                "heat pump ramp-down blocked by minimum runtime"
            );
        }
        result
    }

    /// Operating record for the current timestep: `el_power * COP` of heat
    /// while running, zeros otherwise. The COP is reported either way.
    pub fn observations_for_timestamp(
        &self,
        simtime: &SimulationTimeIteration,
    ) -> GeneratorObservation {
        let cop = self.cop(self.environment.air_temp(simtime));
        if self.ramp.is_running() {
            GeneratorObservation {
                thermal_output: self.el_power * cop,
                el_demand: self.el_power,
                cop: Some(cop),
                is_running: true,
            }
        } else {
            GeneratorObservation {
                cop: Some(cop),
                ..Default::default()
            }
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

    /// Signed electrical contribution (kW, consumption positive) at a
    /// timestep already covered by the log.
    pub fn value_for_timestamp(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        self.log
            .get(simtime.time_series_idx(0, simtime.timestep))
            .map(|observation| observation.el_demand)
    }

    /// Uncoupled use: the unconstrained electrical demand trace obtained by
    /// dividing the known quarter-hour thermal demand by the COP at each
    /// step.
    pub fn prepare_time_series(&mut self) -> &[f64] {
        let environment = self.environment.clone();
        self.el_demand_series = environment
            .simulation_time()
            .iter()
            .map(|t_it| self.user_profile.demand_at(&t_it) / self.cop(environment.air_temp(&t_it)))
            .collect();
        &self.el_demand_series
    }

    pub fn el_demand_series(&self) -> &[f64] {
        &self.el_demand_series
    }

    pub fn reset_time_series(&mut self) {
        self.log.clear();
        self.el_demand_series.clear();
        self.ramp.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::synthetic_hourly_temperatures;
    use crate::simulation_time::SimulationTime;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn environment() -> Arc<Environment> {
        Arc::new(
            Environment::from_hourly(
                SimulationTime::whole_year(15),
                chrono_tz::Europe::Berlin,
                synthetic_hourly_temperatures(9., 10., 3.),
            )
            .unwrap(),
        )
    }

    #[fixture]
    fn user_profile(environment: Arc<Environment>) -> Arc<UserProfile> {
        Arc::new(
            UserProfile::new(
                "up_hp",
                "DE_HEF33",
                12_500.,
                None,
                None,
                None,
                None,
                environment,
            )
            .unwrap(),
        )
    }

    #[fixture]
    fn heat_pump(environment: Arc<Environment>, user_profile: Arc<UserProfile>) -> HeatPump {
        HeatPump::new(
            "hp_0",
            HeatPumpType::Air,
            60.,
            5.,
            8.,
            1. / 15.,
            1. / 15.,
            1,
            2,
            user_profile,
            environment,
        )
    }

    #[rstest]
    fn should_evaluate_air_source_cop(heat_pump: HeatPump) {
        // spread of 60 K at -0 deg C ambient
        assert_relative_eq!(heat_pump.cop(0.), 6.81 - 0.121 * 60. + 0.000_63 * 3_600.);
        // a warmer source always improves the COP
        assert!(heat_pump.cop(10.) > heat_pump.cop(0.));
    }

    #[rstest]
    fn should_evaluate_ground_source_cop(
        environment: Arc<Environment>,
        user_profile: Arc<UserProfile>,
    ) {
        let ground = HeatPump::new(
            "hp_ground",
            HeatPumpType::Ground,
            35.,
            3.,
            9.,
            0.,
            0.,
            0,
            0,
            user_profile,
            environment,
        );
        let spread: f64 = 35. - 10.;
        assert_relative_eq!(
            ground.cop(10.),
            8.77 - 0.15 * spread + 0.000_734 * spread.powi(2)
        );
    }

    #[rstest]
    fn should_observe_zeros_when_off(heat_pump: HeatPump, environment: Arc<Environment>) {
        let t_it = environment.simulation_time().iter().next().unwrap();
        let observation = heat_pump.observations_for_timestamp(&t_it);
        assert_eq!(observation.thermal_output, 0.);
        assert_eq!(observation.el_demand, 0.);
        assert!(!observation.is_running);
        assert!(observation.cop.is_some());
    }

    #[rstest]
    fn should_couple_thermal_output_to_cop(
        mut heat_pump: HeatPump,
        environment: Arc<Environment>,
    ) {
        let t_it = environment.simulation_time().iter().next().unwrap();
        assert_eq!(heat_pump.ramp_up(&t_it), Some(true));
        let observation = heat_pump.observations_for_timestamp(&t_it);
        assert_relative_eq!(
            observation.thermal_output,
            5. * heat_pump.cop(environment.air_temp(&t_it))
        );
        assert_eq!(observation.el_demand, 5.);
    }

    #[rstest]
    fn should_respect_min_stoptime(mut heat_pump: HeatPump, environment: Arc<Environment>) {
        let steps = environment
            .simulation_time()
            .iter()
            .take(3)
            .collect::<Vec<_>>();
        assert_eq!(heat_pump.ramp_up(&steps[0]), Some(true));
        assert_eq!(heat_pump.ramp_down(&steps[1]), Some(true));
        // min_stoptime of 2 steps not yet elapsed
        assert_eq!(heat_pump.ramp_up(&steps[2]), Some(false));
        assert!(!heat_pump.is_running());
    }

    #[rstest]
    fn should_prepare_unconstrained_electrical_trace(mut heat_pump: HeatPump) {
        let series = heat_pump.prepare_time_series().to_vec();
        assert_eq!(series.len(), 35_040);
        assert!(series.iter().all(|el| *el >= 0.));
        // the air-source COP stays above 1.5 across the synthetic year, so
        // the electrical draw never exceeds two thirds of the thermal demand
        for (el, th) in series
            .iter()
            .zip(heat_pump.user_profile.thermal_energy_demand())
        {
            assert!(*el <= th / 1.5);
        }
    }

    #[rstest]
    fn should_be_idempotent_after_reset(mut heat_pump: HeatPump) {
        let first = heat_pump.prepare_time_series().to_vec();
        heat_pump.reset_time_series();
        let second = heat_pump.prepare_time_series().to_vec();
        assert_eq!(first, second);
    }
}
