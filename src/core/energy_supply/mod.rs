pub mod elec_battery;
pub mod power_series;
