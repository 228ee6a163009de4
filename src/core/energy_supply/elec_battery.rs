use crate::compare_floats::{max_of_2, min_of_2};
use crate::environment::Environment;
use crate::simulation_time::SimulationTimeIteration;
use std::sync::Arc;

/// One battery record for a single timestep.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatteryObservation {
    /// stored energy after the step, in kWh
    pub state_of_charge: f64,
    /// residual load the battery was asked to cover, in kW
    pub residual_load: f64,
}

/// A residual-load-driven household battery.
///
/// Positive residual load is a consumer deficit and discharges the battery,
/// negative is a surplus and charges it. The converter clips the request to
/// `max_power * max_c`; whatever the battery cannot take or give, including
/// cap/floor overshoot, flows back to the caller as uncovered residual
/// rather than being raised as a fault.
#[derive(Clone, Debug)]
pub struct ElectricalEnergyStorage {
    identifier: String,
    /// usable capacity, in kWh
    capacity: f64,
    /// converter power rating, in kW
    max_power: f64,
    /// C-rate limit applied on top of the power rating
    max_c: f64,
    charge_efficiency: f64,
    discharge_efficiency: f64,
    /// stored energy, in kWh, within [0, capacity]
    state_of_charge: f64,
    environment: Arc<Environment>,
    log: Vec<BatteryObservation>,
}

impl ElectricalEnergyStorage {
    /// Arguments:
    /// * `identifier` - name of the component within a portfolio
    /// * `capacity` - usable capacity, in kWh
    /// * `max_power` - converter power rating, in kW
    /// * `max_c` - C-rate limit applied on top of the power rating
    /// * `charge_efficiency`/`discharge_efficiency` - one-way efficiencies, in (0, 1]
    /// * `environment` - shared simulation-time source
    pub fn new(
        identifier: &str,
        capacity: f64,
        max_power: f64,
        max_c: f64,
        charge_efficiency: f64,
        discharge_efficiency: f64,
        environment: Arc<Environment>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            capacity,
            max_power,
            max_c,
            charge_efficiency,
            discharge_efficiency,
            state_of_charge: 0.,
            environment,
            log: Default::default(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn max_power(&self) -> f64 {
        self.max_power
    }

    pub fn max_c(&self) -> f64 {
        self.max_c
    }

    pub fn state_of_charge(&self) -> f64 {
        self.state_of_charge
    }

    /// The per-timestep battery log, oldest first.
    pub fn log(&self) -> &[BatteryObservation] {
        &self.log
    }

    /// Dispatch one residual-load request against the battery.
    ///
    /// Returns the state of charge after the step and the portion of the
    /// request (signed like the input) that the battery could not cover.
    pub fn operate(&mut self, residual_load: f64) -> (f64, f64) {
        if residual_load == 0. {
            return (self.state_of_charge, 0.);
        }
        // full battery cannot take a surplus, empty battery cannot cover a
        // deficit; the request passes through unchanged
        if residual_load < 0. && self.state_of_charge >= self.capacity
            || residual_load > 0. && self.state_of_charge <= 0.
        {
            return (self.state_of_charge, residual_load);
        }

        let delta_t_h = self.environment.simulation_time().step_in_hours();
        let converter_limit = self.max_power * self.max_c;
        let clipped = min_of_2(residual_load.abs(), converter_limit);
        let mut uncovered = residual_load.abs() - clipped;

        if residual_load < 0. {
            self.state_of_charge += clipped * self.charge_efficiency * delta_t_h;
            if self.state_of_charge > self.capacity {
                let overshoot = self.state_of_charge - self.capacity;
                self.state_of_charge = self.capacity;
                uncovered += overshoot / (self.charge_efficiency * delta_t_h);
            }
        } else {
            self.state_of_charge -= clipped * self.discharge_efficiency * delta_t_h;
            let shortfall = max_of_2(-self.state_of_charge, 0.);
            if shortfall > 0. {
                self.state_of_charge = 0.;
                uncovered += shortfall / (self.discharge_efficiency * delta_t_h);
            }
        }

        (self.state_of_charge, residual_load.signum() * uncovered)
    }

    /// Dispatch a whole residual-load series, logging
    /// `(state_of_charge, residual_load)` per step and returning the
    /// uncovered-residual column.
    pub fn prepare_time_series(&mut self, residual_load_series: &[f64]) -> Vec<f64> {
        residual_load_series
            .iter()
            .map(|residual_load| {
                let (state_of_charge, uncovered) = self.operate(*residual_load);
                self.log.push(BatteryObservation {
                    state_of_charge,
                    residual_load: *residual_load,
                });
                uncovered
            })
            .collect()
    }

    /// Signed residual load (kW, consumption positive) at a timestep
    /// already covered by the log.
    pub fn value_for_timestamp(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        self.log
            .get(simtime.time_series_idx(0, simtime.timestep))
            .map(|observation| observation.residual_load)
    }

    pub fn observation_for_timestamp(
        &self,
        simtime: &SimulationTimeIteration,
    ) -> Option<BatteryObservation> {
        self.log
            .get(simtime.time_series_idx(0, simtime.timestep))
            .copied()
    }

    pub fn reset_time_series(&mut self) {
        self.state_of_charge = 0.;
        self.log.clear();
    }
}
