#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod environment;
pub mod errors;
pub mod simulation_time;
pub mod virtual_power_plant;

#[macro_use]
extern crate lazy_static;

pub use crate::core::energy_supply::elec_battery::{BatteryObservation, ElectricalEnergyStorage};
pub use crate::core::energy_supply::power_series::PowerSeries;
pub use crate::core::heat_demand::{BuildingParameters, HeatDemandModel};
pub use crate::core::heating_systems::chp::CombinedHeatAndPower;
pub use crate::core::heating_systems::heat_pump::{HeatPump, HeatPumpType};
pub use crate::core::heating_systems::heating_rod::HeatingRod;
pub use crate::core::heating_systems::thermal_storage::{
    AutosizeStrategy, StorageEfficiencyClass, ThermalEnergyStorage,
};
pub use crate::core::heating_systems::{GeneratorObservation, ThermalGenerator};
pub use crate::core::user_profile::UserProfile;
pub use crate::environment::Environment;
pub use crate::errors::{ThermalUnderrunError, VppError};
pub use crate::simulation_time::{SimulationTime, SimulationTimeIteration};
pub use crate::virtual_power_plant::{Component, VirtualPowerPlant};
