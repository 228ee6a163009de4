use crate::simulation_time::{SimulationTime, SimulationTimeIteration, HOURS_IN_DAY};
use anyhow::{anyhow, bail, Context};
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use interp::{interp_slice, InterpMode};
use itertools::Itertools;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Holds the simulation time window, timebase and timezone, and supplies
/// ambient-temperature series at daily, hourly and quarter-hour resolution.
///
/// All three series share the same calendar year and are precomputed at
/// construction; they are read-only during simulation, so an `Environment`
/// can be shared between components behind an `Arc` without locking.
#[derive(Clone, Debug)]
pub struct Environment {
    simulation_time: SimulationTime,
    timezone: Tz,
    temp_daily: Vec<f64>,
    temp_hourly: Vec<f64>,
    temp_quarterhourly: Vec<f64>,
}

impl Environment {
    /// Arguments:
    /// * `simulation_time` - the time window and timebase for the simulation
    /// * `timezone` - the timezone timestamps are interpreted in
    /// * `temp_daily` - mean ambient temperatures, in deg C (one entry per day)
    /// * `temp_hourly` - ambient temperatures, in deg C (one entry per hour)
    /// * `temp_quarterhourly` - ambient temperatures, in deg C (one entry per
    ///   simulation step)
    ///
    /// The series must cover the simulation window so that components can
    /// index any timestamp in it; missing data is fatal here.
    pub fn new(
        simulation_time: SimulationTime,
        timezone: Tz,
        temp_daily: Vec<f64>,
        temp_hourly: Vec<f64>,
        temp_quarterhourly: Vec<f64>,
    ) -> anyhow::Result<Self> {
        let end_hour = simulation_time.end_time().ceil() as usize;
        let end_day = (simulation_time.end_time() / HOURS_IN_DAY as f64).ceil() as usize;
        let end_step =
            (simulation_time.end_time() / simulation_time.step_in_hours()).ceil() as usize;
        if temp_daily.len() < end_day {
            bail!(
                "daily temperature series has {} entries but the simulation window needs {}",
                temp_daily.len(),
                end_day
            );
        }
        if temp_hourly.len() < end_hour {
            bail!(
                "hourly temperature series has {} entries but the simulation window needs {}",
                temp_hourly.len(),
                end_hour
            );
        }
        if temp_quarterhourly.len() < end_step {
            bail!(
                "quarter-hourly temperature series has {} entries but the simulation window needs {}",
                temp_quarterhourly.len(),
                end_step
            );
        }
        Ok(Self {
            simulation_time,
            timezone,
            temp_daily,
            temp_hourly,
            temp_quarterhourly,
        })
    }

    /// Build an environment from an hourly series alone: daily values are
    /// the means over each day, quarter-hour values a linear interpolation
    /// of the hourly ones (placed on the hour).
    pub fn from_hourly(
        simulation_time: SimulationTime,
        timezone: Tz,
        temp_hourly: Vec<f64>,
    ) -> anyhow::Result<Self> {
        let temp_daily = temp_hourly
            .chunks(HOURS_IN_DAY as usize)
            .map(|day| day.iter().sum::<f64>() / day.len() as f64)
            .collect::<Vec<_>>();
        let hour_marks = (0..temp_hourly.len()).map(|h| h as f64).collect::<Vec<_>>();
        let step = simulation_time.step_in_hours();
        let steps = (temp_hourly.len() as f64 / step).round() as usize;
        let step_marks = (0..steps).map(|i| i as f64 * step).collect::<Vec<_>>();
        // steps past the last hour mark hold the final hourly value
        let temp_quarterhourly =
            interp_slice(&hour_marks, &temp_hourly, &step_marks, &InterpMode::FirstLast);
        Self::new(
            simulation_time,
            timezone,
            temp_daily,
            temp_hourly,
            temp_quarterhourly,
        )
    }

    /// Read an hourly `time,temperature` CSV (ISO-8601 timestamps in the
    /// configured timezone) and build the derived series from it.
    pub fn from_csv(
        simulation_time: SimulationTime,
        timezone: Tz,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let reader = BufReader::new(
            File::open(path.as_ref())
                .with_context(|| format!("could not open temperature file {:?}", path.as_ref()))?,
        );
        Self::from_csv_reader(simulation_time, timezone, reader)
    }

    pub fn from_csv_reader(
        simulation_time: SimulationTime,
        timezone: Tz,
        reader: impl Read,
    ) -> anyhow::Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut temp_hourly: Vec<f64> = Default::default();
        let mut previous_time: Option<NaiveDateTime> = None;
        for row in csv_reader.deserialize() {
            let TemperatureRow { time, temperature } = row?;
            let time = NaiveDateTime::parse_from_str(&time, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(&time, "%Y-%m-%d %H:%M:%S"))
                .with_context(|| format!("unparseable timestamp '{time}' in temperature file"))?;
            timezone
                .from_local_datetime(&time)
                .earliest()
                .ok_or_else(|| anyhow!("timestamp '{time}' does not exist in zone {timezone}"))?;
            if previous_time.is_some_and(|previous| time <= previous) {
                bail!("temperature file timestamps are not strictly increasing at '{time}'");
            }
            previous_time = Some(time);
            temp_hourly.push(temperature);
        }
        Self::from_hourly(simulation_time, timezone, temp_hourly)
    }

    pub fn simulation_time(&self) -> &SimulationTime {
        &self.simulation_time
    }

    pub fn timebase(&self) -> u32 {
        self.simulation_time.timebase()
    }

    pub fn time_freq(&self) -> String {
        self.simulation_time.time_freq()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Mean ambient temperature for a day of the year, in deg C.
    pub fn temp_daily(&self, day: u32) -> f64 {
        self.temp_daily[day as usize]
    }

    /// Ambient temperature for an hour of the year, in deg C.
    pub fn temp_hourly(&self, hour: u32) -> f64 {
        self.temp_hourly[hour as usize]
    }

    /// Ambient temperature for a quarter-hour index, in deg C.
    pub fn temp_quarterhourly(&self, quarter_hour: usize) -> f64 {
        self.temp_quarterhourly[quarter_hour]
    }

    /// The ambient air temperature for the current timestep, in deg C.
    pub fn air_temp(&self, simtime: &SimulationTimeIteration) -> f64 {
        self.temp_quarterhourly[simtime.time_series_idx(0, simtime.timestep)]
    }

    /// Mean ambient temperature for the day the current timestep falls in.
    pub fn mean_daily_temp(&self, simtime: &SimulationTimeIteration) -> f64 {
        self.temp_daily(simtime.current_day())
    }

    pub(crate) fn temp_daily_series(&self) -> &[f64] {
        &self.temp_daily
    }
}

#[derive(Debug, Deserialize)]
struct TemperatureRow {
    time: String,
    temperature: f64,
}

/// A synthetic full-year hourly temperature trace for tests and sizing
/// studies: a seasonal cosine (coldest in mid January) with a small diurnal
/// swing, deterministic by construction.
pub fn synthetic_hourly_temperatures(mean: f64, seasonal_swing: f64, diurnal_swing: f64) -> Vec<f64> {
    (0..8_760)
        .map(|hour| {
            let day = hour / 24;
            let seasonal = -seasonal_swing
                * (2. * std::f64::consts::PI * (day as f64 - 15.) / 365.).cos();
            let diurnal =
                -diurnal_swing * (2. * std::f64::consts::PI * (hour % 24) as f64 / 24.).cos();
            mean + seasonal + diurnal
        })
        .collect_vec()
}
