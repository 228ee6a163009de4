use crate::core::heating_systems::ThermalGenerator;
use crate::core::units::{
    storage_charge_delta, HOURS_PER_DAY, KILOJOULES_PER_KILOWATT_HOUR, MINUTES_PER_HOUR,
    WATER_DENSITY_KG_PER_LITRE,
};
use crate::core::user_profile::UserProfile;
use crate::environment::Environment;
use crate::errors::ThermalUnderrunError;
use crate::simulation_time::SimulationTimeIteration;
use anyhow::anyhow;
use csv::Reader;
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::{BufReader, Cursor};
use std::sync::Arc;
use tracing::debug;

/// Temperature floor below which the storage raises the thermal-underrun
/// fault: falling this far means the attached generator cannot keep up with
/// demand under the ambient conditions.
const UNDERRUN_TEMP_FLOOR: f64 = 40.;

lazy_static! {
    static ref EFFICIENCY_CLASS_LOSSES: IndexMap<(StorageEfficiencyClass, u32), f64> = {
        let mut losses: IndexMap<(StorageEfficiencyClass, u32), f64> = Default::default();

        let mut reader = Reader::from_reader(BufReader::new(Cursor::new(include_str!(
            "./storage_efficiency_classes.csv"
        ))));
        for row in reader.deserialize() {
            let row: EfficiencyClassRow =
                row.expect("Reading the storage efficiency class file failed.");
            losses.insert((row.efficiency_class, row.volume_l), row.loss_kwh_per_day);
        }

        losses
    };
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
pub enum StorageEfficiencyClass {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
}

#[derive(Debug, Deserialize)]
struct EfficiencyClassRow {
    efficiency_class: StorageEfficiencyClass,
    volume_l: u32,
    loss_kwh_per_day: f64,
}

/// Sizing strategies for deriving a storage mass from an attached heat
/// pump's rated thermal power, at water density.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AutosizeStrategy {
    /// 20 L per kW of rated thermal power, enough to ride through the peak
    /// demand quarter-hour
    PeakDemand,
    /// 60 L per kW, enough to bridge a full minimum stop time
    OvercomeShutdown,
}

/// A sensible-heat buffer between thermal generators and the household
/// demand.
///
/// A hysteresis latch around the target temperature decides each step
/// whether the attached generator should run; the storage then integrates
/// demand against production, applies the standby loss and recomputes its
/// temperature. State of charge is held in kJ relative to the bottom of the
/// hysteresis band so that `mass * cp * dT` needs no unit conversion.
#[derive(Clone, Debug)]
pub struct ThermalEnergyStorage {
    identifier: String,
    /// storage medium mass, in kg
    mass: f64,
    /// specific heat capacity, in kJ/(kg*K)
    cp: f64,
    /// setpoint temperature, in deg C
    target_temperature: f64,
    /// half-width of the dead band around the setpoint, in K
    hysteresis: f64,
    /// fraction of the daily standby loss attributed to the storage
    thermal_energy_loss_per_day: f64,
    efficiency_per_timestep: f64,
    current_temperature: f64,
    /// stored energy above `target - hysteresis`, in kJ
    state_of_charge: f64,
    needs_loading: bool,
    user_profile: Arc<UserProfile>,
    environment: Arc<Environment>,
    /// per-timestep storage temperature, in deg C
    temperature_log: Vec<f64>,
}

impl ThermalEnergyStorage {
    /// Arguments:
    /// * `identifier` - name of the component within a portfolio
    /// * `mass` - storage medium mass, in kg
    /// * `cp` - specific heat capacity, in kJ/(kg*K)
    /// * `target_temperature` - setpoint, in deg C
    /// * `hysteresis` - dead-band half-width, in K
    /// * `thermal_energy_loss_per_day` - daily standby loss as a fraction of
    ///   the stored energy
    /// * `user_profile` - owning profile, for thermal demand lookup
    /// * `environment` - shared ambient-temperature series
    pub fn new(
        identifier: &str,
        mass: f64,
        cp: f64,
        target_temperature: f64,
        hysteresis: f64,
        thermal_energy_loss_per_day: f64,
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) -> Self {
        let steps_per_day =
            (HOURS_PER_DAY * MINUTES_PER_HOUR) as f64 / environment.timebase() as f64;
        let efficiency_per_timestep = 1. - thermal_energy_loss_per_day / steps_per_day;
        let current_temperature = target_temperature;
        let state_of_charge =
            mass * cp * (current_temperature - (target_temperature - hysteresis));
        Self {
            identifier: identifier.into(),
            mass,
            cp,
            target_temperature,
            hysteresis,
            thermal_energy_loss_per_day,
            efficiency_per_timestep,
            current_temperature,
            state_of_charge,
            needs_loading: false,
            user_profile,
            environment,
            temperature_log: Default::default(),
        }
    }

    /// Construct from an energy-efficiency label instead of an explicit
    /// loss figure: the class table gives the daily standby loss in kWh/day
    /// for the tank volume, converted to a fraction of the usable band
    /// `mass * cp * 2 * hysteresis`.
    pub fn from_efficiency_class(
        identifier: &str,
        volume_l: u32,
        efficiency_class: StorageEfficiencyClass,
        cp: f64,
        target_temperature: f64,
        hysteresis: f64,
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) -> anyhow::Result<Self> {
        let loss_kwh_per_day = EFFICIENCY_CLASS_LOSSES
            .get(&(efficiency_class, volume_l))
            .copied()
            .ok_or_else(|| {
                anyhow!(
                    "no standby loss tabulated for class {efficiency_class:?} at {volume_l} L (volumes run 50..1000 in steps of 50)"
                )
            })?;
        let mass = volume_l as f64 * WATER_DENSITY_KG_PER_LITRE;
        let usable_kwh = mass * cp * 2. * hysteresis / KILOJOULES_PER_KILOWATT_HOUR as f64;
        let thermal_energy_loss_per_day = loss_kwh_per_day / usable_kwh;
        Ok(Self::new(
            identifier,
            mass,
            cp,
            target_temperature,
            hysteresis,
            thermal_energy_loss_per_day,
            user_profile,
            environment,
        ))
    }

    /// Storage mass (kg) sized for a heat pump's rated thermal power,
    /// rounded up to the next 50 kg.
    pub fn autosize_mass(th_power: f64, strategy: AutosizeStrategy) -> f64 {
        let litres_per_kw = match strategy {
            AutosizeStrategy::PeakDemand => 20.,
            AutosizeStrategy::OvercomeShutdown => 60.,
        };
        let mass = th_power * litres_per_kw * WATER_DENSITY_KG_PER_LITRE;
        (mass / 50.).ceil() * 50.
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn target_temperature(&self) -> f64 {
        self.target_temperature
    }

    pub fn hysteresis(&self) -> f64 {
        self.hysteresis
    }

    pub fn thermal_energy_loss_per_day(&self) -> f64 {
        self.thermal_energy_loss_per_day
    }

    pub fn efficiency_per_timestep(&self) -> f64 {
        self.efficiency_per_timestep
    }

    pub fn current_temperature(&self) -> f64 {
        self.current_temperature
    }

    /// Stored energy above the bottom of the hysteresis band, in kJ.
    pub fn state_of_charge(&self) -> f64 {
        self.state_of_charge
    }

    pub fn needs_loading(&self) -> bool {
        self.needs_loading
    }

    /// The per-timestep storage temperature log, in deg C.
    pub fn temperature_log(&self) -> &[f64] {
        &self.temperature_log
    }

    pub fn value_for_timestamp(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        self.temperature_log
            .get(simtime.time_series_idx(0, simtime.timestep))
            .copied()
    }

    /// Advance one timestep driving a single generator: update the latch,
    /// issue the ramp decision, integrate demand against production, apply
    /// the standby loss and log both sides.
    ///
    /// Returns the storage temperature after the step.
    pub fn operate(
        &mut self,
        simtime: &SimulationTimeIteration,
        generator: &mut ThermalGenerator,
    ) -> Result<f64, ThermalUnderrunError> {
        self.update_latch(simtime)?;
        if self.needs_loading {
            if generator.ramp_up(simtime) == Some(false) {
                debug!(
                    storage = self.identifier.as_str(),
                    generator = generator.identifier(),
                    time = simtime.time,
                    "storage demands heat but the generator is held off by its minimum stop time"
                );
            }
        } else {
            generator.ramp_down(simtime);
        }
        let observation = generator.observations_for_timestamp(simtime);
        let temperature = self.step_energy(simtime, observation.thermal_output);
        generator.log_observation(observation, simtime);
        Ok(temperature)
    }

    /// Advance one timestep with a bivalent generator pair: above the
    /// bivalence temperature (ties included) the heat pump is driven and
    /// the heating rod forced off, below it the roles swap. Both generator
    /// logs are written before returning; the idle generator normally
    /// contributes a zero observation.
    pub fn operate_bivalent(
        &mut self,
        simtime: &SimulationTimeIteration,
        heat_pump: &mut ThermalGenerator,
        heating_rod: &mut ThermalGenerator,
        t_norm: f64,
    ) -> Result<f64, ThermalUnderrunError> {
        self.update_latch(simtime)?;
        let t_bivalent = bivalence_temperature(t_norm);
        let ambient = self.environment.air_temp(simtime);
        let (driven, forced_off) = if ambient >= t_bivalent {
            (heat_pump, heating_rod)
        } else {
            (heating_rod, heat_pump)
        };

        if forced_off.is_running() {
            forced_off.ramp_down(simtime);
        }
        if self.needs_loading {
            if driven.ramp_up(simtime) == Some(false) {
                debug!(
                    storage = self.identifier.as_str(),
                    generator = driven.identifier(),
                    time = simtime.time,
                    "storage demands heat but the generator is held off by its minimum stop time"
                );
            }
        } else {
            driven.ramp_down(simtime);
        }

        let driven_observation = driven.observations_for_timestamp(simtime);
        // a blocked forced ramp-down keeps the idle generator producing, so
        // its (then non-zero) observation stays in the energy balance
        let idle_observation = forced_off.observations_for_timestamp(simtime);
        let temperature = self.step_energy(
            simtime,
            driven_observation.thermal_output + idle_observation.thermal_output,
        );
        driven.log_observation(driven_observation, simtime);
        forced_off.log_observation(idle_observation, simtime);
        Ok(temperature)
    }

    pub fn reset_time_series(&mut self) {
        self.current_temperature = self.target_temperature;
        self.state_of_charge = self.mass
            * self.cp
            * (self.current_temperature - (self.target_temperature - self.hysteresis));
        self.needs_loading = false;
        self.temperature_log.clear();
    }

    /// Hysteresis latch: demand heat from the bottom of the dead band until
    /// the top is reached. The latch moves at most once per step, before
    /// any ramp call.
    fn update_latch(
        &mut self,
        simtime: &SimulationTimeIteration,
    ) -> Result<(), ThermalUnderrunError> {
        if self.current_temperature <= self.target_temperature - self.hysteresis {
            self.needs_loading = true;
        } else if self.current_temperature >= self.target_temperature + self.hysteresis {
            self.needs_loading = false;
        }
        if self.current_temperature < UNDERRUN_TEMP_FLOOR {
            return Err(ThermalUnderrunError::new(
                self.current_temperature,
                simtime.time,
            ));
        }
        Ok(())
    }

    /// Integrate one step of demand against production, apply the standby
    /// loss, recompute the temperature and log it.
    fn step_energy(&mut self, simtime: &SimulationTimeIteration, production_kw: f64) -> f64 {
        let demand_kw = self.user_profile.demand_at(simtime);
        self.state_of_charge -=
            storage_charge_delta(demand_kw - production_kw, self.environment.timebase());
        self.state_of_charge *= self.efficiency_per_timestep;
        self.current_temperature = self.state_of_charge / (self.mass * self.cp)
            + (self.target_temperature - self.hysteresis);
        self.temperature_log.push(self.current_temperature);
        self.current_temperature
    }
}

/// Bivalence temperature from the design norm temperature of the site.
pub fn bivalence_temperature(t_norm: f64) -> f64 {
    if t_norm <= -16. {
        -4.
    } else if t_norm <= -10. {
        -3.
    } else {
        -2.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::heating_systems::heat_pump::{HeatPump, HeatPumpType};
    use crate::core::heating_systems::heating_rod::HeatingRod;
    use crate::environment::synthetic_hourly_temperatures;
    use crate::simulation_time::SimulationTime;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn january_week_environment() -> Arc<Environment> {
        // full-year series so demand synthesis sees the whole calendar;
        // the simulation window is the first January week
        Arc::new(
            Environment::from_hourly(
                SimulationTime::from_timebase(0., 168., 15),
                chrono_tz::Europe::Berlin,
                synthetic_hourly_temperatures(9., 10., 3.),
            )
            .unwrap(),
        )
    }

    #[fixture]
    fn environment() -> Arc<Environment> {
        january_week_environment()
    }

    #[fixture]
    fn user_profile(environment: Arc<Environment>) -> Arc<UserProfile> {
        Arc::new(
            UserProfile::new(
                "up_tes",
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

    fn storage(user_profile: Arc<UserProfile>, environment: Arc<Environment>) -> ThermalEnergyStorage {
        ThermalEnergyStorage::new(
            "tes_0",
            500.,
            4.2,
            60.,
            5.,
            0.13,
            user_profile,
            environment,
        )
    }

    fn air_heat_pump(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) -> ThermalGenerator {
        ThermalGenerator::HeatPump(HeatPump::new(
            "hp_tes",
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
        ))
    }

    #[rstest]
    fn should_compute_efficiency_per_timestep(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        let tes = storage(user_profile, environment);
        assert_relative_eq!(tes.efficiency_per_timestep(), 1. - 0.13 / 96.);
    }

    #[rstest]
    fn should_start_full_to_target(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        let tes = storage(user_profile, environment);
        assert_relative_eq!(tes.current_temperature(), 60.);
        assert_relative_eq!(tes.state_of_charge(), 500. * 4.2 * 5.);
    }

    #[rstest]
    fn should_stay_inside_hysteresis_band(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        let mut tes = storage(user_profile.clone(), environment.clone());
        let mut generator = air_heat_pump(user_profile, environment.clone());
        for t_it in environment.simulation_time().iter() {
            tes.operate(&t_it, &mut generator).unwrap();
        }
        assert_eq!(tes.temperature_log().len(), 672);
        for temperature in tes.temperature_log() {
            assert!(
                *temperature <= 60. + 5. + 0.5,
                "storage overshot the dead band at {temperature}"
            );
            assert!(*temperature >= 60. - 5. - 1.);
        }
    }

    #[rstest]
    fn should_respect_min_runtime_in_duty_cycle(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        let mut tes = storage(user_profile.clone(), environment.clone());
        let mut generator = ThermalGenerator::HeatPump(HeatPump::new(
            "hp_duty",
            HeatPumpType::Air,
            60.,
            5.,
            8.,
            0.,
            0.,
            4,
            2,
            user_profile,
            environment.clone(),
        ));
        for t_it in environment.simulation_time().iter() {
            tes.operate(&t_it, &mut generator).unwrap();
        }
        // every completed on-phase lasts at least min_runtime = 4 steps
        let mut run_length = 0;
        for observation in generator.log() {
            if observation.is_running {
                run_length += 1;
            } else {
                assert!(run_length == 0 || run_length >= 4, "run of {run_length} steps");
                run_length = 0;
            }
        }
    }

    #[rstest]
    fn should_raise_underrun_with_undersized_generator(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        // a 100 W rod cannot carry a 12.5 MWh/a household through January
        let mut tes = storage(user_profile, environment.clone());
        let mut tiny =
            ThermalGenerator::HeatingRod(HeatingRod::new("rod_tiny", 0.1, 1., 0., 0., 0, 0));
        let mut underrun = None;
        for t_it in environment.simulation_time().iter() {
            if let Err(fault) = tes.operate(&t_it, &mut tiny) {
                underrun = Some(fault);
                break;
            }
        }
        let fault = underrun.expect("expected a thermal underrun");
        assert!(fault.temperature < 40.);
        // logs are consistent up to but not including the failing step
        assert_eq!(
            tes.temperature_log().len(),
            (fault.time * 4.).round() as usize
        );
    }

    #[rstest]
    fn should_swap_generators_at_bivalence_temperature() {
        // synthetic ambient sweep from -8 to +2 deg C across the window
        let sweep_hourly = (0..8_760)
            .map(|hour| -8. + 10. * (hour as f64 / 168.).min(1.))
            .collect::<Vec<_>>();
        let sweep_environment = Arc::new(
            Environment::from_hourly(
                SimulationTime::from_timebase(0., 168., 15),
                chrono_tz::Europe::Berlin,
                sweep_hourly,
            )
            .unwrap(),
        );
        let sweep_profile = Arc::new(
            UserProfile::new(
                "up_sweep",
                "DE_HEF33",
                12_500.,
                None,
                None,
                None,
                None,
                sweep_environment.clone(),
            )
            .unwrap(),
        );
        let mut tes = storage(sweep_profile.clone(), sweep_environment.clone());
        let mut heat_pump = air_heat_pump(sweep_profile, sweep_environment.clone());
        let mut heating_rod =
            ThermalGenerator::HeatingRod(HeatingRod::new("rod_biv", 3., 1., 0., 0., 1, 2));
        // t_norm = -12 puts the bivalence point at -3 deg C
        for t_it in sweep_environment.simulation_time().iter() {
            tes.operate_bivalent(&t_it, &mut heat_pump, &mut heating_rod, -12.)
                .unwrap();
        }
        assert_eq!(heat_pump.log().len(), 672);
        assert_eq!(heating_rod.log().len(), 672);
        for (step, t_it) in sweep_environment.simulation_time().iter().enumerate() {
            let ambient = sweep_environment.air_temp(&t_it);
            if ambient < -3. {
                assert!(
                    !heat_pump.log()[step].is_running,
                    "heat pump ran below the bivalence temperature at step {step}"
                );
            } else {
                assert!(
                    !heating_rod.log()[step].is_running,
                    "heating rod ran above the bivalence temperature at step {step}"
                );
            }
        }
    }

    #[rstest]
    #[case(-16., -4.)]
    #[case(-20., -4.)]
    #[case(-12., -3.)]
    #[case(-10., -3.)]
    #[case(-9., -2.)]
    #[case(0., -2.)]
    fn should_derive_bivalence_temperature(#[case] t_norm: f64, #[case] expected: f64) {
        assert_eq!(bivalence_temperature(t_norm), expected);
    }

    #[rstest]
    #[case(8., AutosizeStrategy::PeakDemand, 200.)]
    #[case(8., AutosizeStrategy::OvercomeShutdown, 500.)]
    #[case(7.3, AutosizeStrategy::PeakDemand, 150.)]
    fn should_autosize_to_next_50_kg(
        #[case] th_power: f64,
        #[case] strategy: AutosizeStrategy,
        #[case] expected: f64,
    ) {
        assert_eq!(ThermalEnergyStorage::autosize_mass(th_power, strategy), expected);
    }

    #[rstest]
    fn should_construct_from_efficiency_class(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        let tes = ThermalEnergyStorage::from_efficiency_class(
            "tes_class",
            500,
            StorageEfficiencyClass::A,
            4.2,
            60.,
            5.,
            user_profile,
            environment,
        )
        .unwrap();
        assert_relative_eq!(tes.mass(), 500.);
        assert!(tes.thermal_energy_loss_per_day() > 0.);
        assert!(tes.efficiency_per_timestep() < 1.);
    }

    #[rstest]
    fn should_reject_untabulated_volume(
        user_profile: Arc<UserProfile>,
        environment: Arc<Environment>,
    ) {
        assert!(ThermalEnergyStorage::from_efficiency_class(
            "tes_bad",
            512,
            StorageEfficiencyClass::B,
            4.2,
            60.,
            5.,
            user_profile,
            environment,
        )
        .is_err());
    }
}
