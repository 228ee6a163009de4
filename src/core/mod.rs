pub mod energy_supply;
pub mod heat_demand;
pub mod heating_systems;
pub mod units;
pub mod user_profile;
