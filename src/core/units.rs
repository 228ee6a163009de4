pub const KILOJOULES_PER_KILOWATT_HOUR: u32 = 3_600;
pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const MINUTES_PER_HOUR: u32 = 60;
pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_YEAR: u32 = 365;
pub const HOURS_PER_YEAR: u32 = 8_760;
pub const WATTS_PER_KILOWATT: u32 = 1_000;
pub const LITRES_PER_CUBIC_METRE: u32 = 1_000;

/// Density of water at storage conditions, in kg per litre.
pub const WATER_DENSITY_KG_PER_LITRE: f64 = 1.;

/// Charge movement (kJ) the thermal storage books for a sustained power
/// (kW) over one step of the given timebase in minutes: `3600 / timebase`
/// per kilowatt. The hysteresis band, the standby-loss factor and the
/// underrun floor are all calibrated against this scale.
pub(crate) fn storage_charge_delta(power_kw: f64, timebase_minutes: u32) -> f64 {
    power_kw * KILOJOULES_PER_KILOWATT_HOUR as f64 / timebase_minutes as f64
}
