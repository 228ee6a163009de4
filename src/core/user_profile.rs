use crate::core::heat_demand::HeatDemandModel;
use crate::environment::Environment;
use crate::simulation_time::{SimulationTimeIteration, HOURS_IN_DAY};
use anyhow::bail;
use interp::{interp_slice, InterpMode};
use std::sync::Arc;

/// A household attached to the grid, carrying the building descriptor and
/// the quarter-hour thermal demand series synthesised from it.
///
/// The synthesis runs once at construction and is deterministic: daily
/// SigLinDe demand from daily mean temperatures, hour-of-day split by
/// temperature band, consumer scaling to the annual target, then linear
/// interpolation onto the quarter-hour grid.
#[derive(Clone, Debug)]
pub struct UserProfile {
    identifier: String,
    building_type: String,
    thermal_energy_demand_yearly: f64,
    comfort_factor: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    environment: Arc<Environment>,
    model: HeatDemandModel,
    /// quarter-hour thermal demand, in kW
    thermal_energy_demand: Vec<f64>,
}

impl UserProfile {
    /// Arguments:
    /// * `identifier` - name of the profile within a portfolio
    /// * `building_type` - SigLinDe building class, e.g. "DE_HEF33"
    /// * `thermal_energy_demand_yearly` - annual thermal energy demand, in kWh
    /// * `reference_temp` - SigLinDe `t_0` in deg C (40 when None)
    /// * `comfort_factor` - optional occupant comfort weighting, kept as
    ///   metadata on the profile
    /// * `latitude`/`longitude` - site position, used by external model chains
    /// * `environment` - shared ambient-temperature series
    pub fn new(
        identifier: &str,
        building_type: &str,
        thermal_energy_demand_yearly: f64,
        reference_temp: Option<f64>,
        comfort_factor: Option<f64>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        environment: Arc<Environment>,
    ) -> anyhow::Result<Self> {
        if thermal_energy_demand_yearly <= 0. {
            bail!(
                "thermal_energy_demand_yearly must be positive, got {thermal_energy_demand_yearly}"
            );
        }
        let model = HeatDemandModel::for_building_type(building_type, reference_temp)?;
        let thermal_energy_demand =
            synthesise_demand(&model, &environment, thermal_energy_demand_yearly);
        Ok(Self {
            identifier: identifier.into(),
            building_type: building_type.into(),
            thermal_energy_demand_yearly,
            comfort_factor,
            latitude,
            longitude,
            environment,
            model,
            thermal_energy_demand,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn building_type(&self) -> &str {
        &self.building_type
    }

    pub fn thermal_energy_demand_yearly(&self) -> f64 {
        self.thermal_energy_demand_yearly
    }

    pub fn comfort_factor(&self) -> Option<f64> {
        self.comfort_factor
    }

    pub fn position(&self) -> (Option<f64>, Option<f64>) {
        (self.latitude, self.longitude)
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn heat_demand_model(&self) -> &HeatDemandModel {
        &self.model
    }

    /// The quarter-hour thermal demand series, in kW.
    pub fn thermal_energy_demand(&self) -> &[f64] {
        &self.thermal_energy_demand
    }

    /// Thermal demand for the current timestep, in kW.
    pub fn demand_at(&self, simtime: &SimulationTimeIteration) -> f64 {
        self.thermal_energy_demand[simtime.time_series_idx(0, simtime.timestep)]
    }
}

/// Run the SigLinDe synthesis over a full calendar year.
///
/// The consumer scaling factor is applied on the final quarter-hour grid so
/// that the annual sum matches the target to floating precision; scaling the
/// hourly values and then interpolating leaves a boundary error at the last
/// hour of the year.
fn synthesise_demand(
    model: &HeatDemandModel,
    environment: &Environment,
    yearly_target_kwh: f64,
) -> Vec<f64> {
    let temp_daily = environment.temp_daily_series();
    let step = environment.simulation_time().step_in_hours();

    let mut hourly = Vec::with_capacity(temp_daily.len() * HOURS_IN_DAY as usize);
    for daily_mean in temp_daily {
        let h_del = model.daily_demand(*daily_mean);
        let weights = HeatDemandModel::hourly_weights(*daily_mean);
        hourly.extend(weights.iter().map(|weight| h_del * weight));
    }

    let hour_marks = (0..hourly.len()).map(|h| h as f64).collect::<Vec<_>>();
    let steps = (hourly.len() as f64 / step).round() as usize;
    let step_marks = (0..steps).map(|i| i as f64 * step).collect::<Vec<_>>();
    let mut quarter_hourly = interp_slice(&hour_marks, &hourly, &step_marks, &InterpMode::FirstLast);

    let unscaled_sum: f64 = quarter_hourly.iter().map(|demand| demand * step).sum();
    let consumer_factor = yearly_target_kwh / unscaled_sum;
    for demand in quarter_hourly.iter_mut() {
        *demand *= consumer_factor;
    }
    quarter_hourly
}
