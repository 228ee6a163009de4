use serde::Deserialize;

pub const HOURS_IN_DAY: u32 = 24;

/// The canonical simulation time grid: an interval `[start, end]` in hours
/// since midnight on January 1st of the simulation year, advanced in fixed
/// steps. The timebase in minutes is authoritative; the default quarter-hour
/// grid has `timebase = 15` and 35,040 steps over a full year.
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationTime {
    #[serde(rename(deserialize = "start"))]
    start_time: f64,
    #[serde(rename(deserialize = "end"))]
    end_time: f64,
    step: f64,
}

impl SimulationTime {
    pub fn new(start_time: f64, end_time: f64, step: f64) -> Self {
        Self {
            start_time,
            end_time,
            step,
        }
    }

    /// Construct a grid from a timebase in minutes (the authoritative input).
    pub fn from_timebase(start_time: f64, end_time: f64, timebase_minutes: u32) -> Self {
        Self::new(start_time, end_time, timebase_minutes as f64 / 60.)
    }

    /// A full calendar year at the given timebase.
    pub fn whole_year(timebase_minutes: u32) -> Self {
        Self::from_timebase(0., 8_760., timebase_minutes)
    }

    pub fn total_steps(&self) -> usize {
        ((self.end_time - self.start_time) / self.step).ceil() as usize
    }

    pub fn step_in_hours(&self) -> f64 {
        self.step
    }

    pub fn timebase(&self) -> u32 {
        (self.step * 60.).round() as u32
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Human-readable frequency label, e.g. "15 min".
    pub fn time_freq(&self) -> String {
        format!("{} min", self.timebase())
    }

    pub fn iter(&self) -> SimulationTimeIterator {
        SimulationTimeIterator::from((*self).clone())
    }
}

#[derive(Clone)]
pub struct SimulationTimeIterator {
    current_index: usize,
    current_time: f64,
    started: bool,
    simulation_time: SimulationTime,
}

impl SimulationTimeIterator {
    fn from(simulation_time: SimulationTime) -> Self {
        SimulationTimeIterator {
            current_index: 0,
            current_time: simulation_time.start_time,
            started: false,
            simulation_time,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }
}

/// One step of the simulation grid. `time` is in hours since the start of
/// the calendar year, `timestep` in hours.
#[derive(Clone, Copy, Debug)]
pub struct SimulationTimeIteration {
    pub index: usize,
    pub time: f64,
    pub timestep: f64,
}

impl SimulationTimeIteration {
    pub fn current_hour(&self) -> u32 {
        self.time.floor() as u32
    }

    pub fn hour_of_day(&self) -> u32 {
        self.current_hour() % HOURS_IN_DAY
    }

    pub fn current_day(&self) -> u32 {
        self.time as u32 / HOURS_IN_DAY
    }

    /// Position within the current hour, in [0, 1).
    pub fn fraction_of_hour(&self) -> f64 {
        self.time - self.time.floor()
    }

    pub fn steps_per_day(&self) -> usize {
        (HOURS_IN_DAY as f64 / self.timestep).round() as usize
    }

    /// Index into an aligned time series with the given step (in hours)
    /// starting at `start_day`.
    pub fn time_series_idx(&self, start_day: u32, step: f64) -> usize {
        ((self.time - (start_day * HOURS_IN_DAY) as f64) / step) as usize
    }
}

impl Iterator for SimulationTimeIterator {
    type Item = SimulationTimeIteration;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started && self.simulation_time.start_time != self.simulation_time.end_time {
            self.started = true;
            return Some(SimulationTimeIteration {
                index: 0,
                time: self.simulation_time.start_time,
                timestep: self.simulation_time.step,
            });
        }
        match self.current_time < (self.simulation_time.end_time - self.simulation_time.step) {
            true => {
                self.current_index += 1;
                self.current_time += self.simulation_time.step;
                Some(SimulationTimeIteration {
                    index: self.current_index,
                    time: self.current_time,
                    timestep: self.simulation_time.step,
                })
            }
            false => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[fixture]
    pub fn simtime() -> SimulationTime {
        SimulationTime::from_timebase(742., 744., 15)
    }

    #[rstest]
    fn should_have_correct_total_steps(simtime: SimulationTime) {
        assert_eq!(simtime.total_steps(), 8);
    }

    #[rstest]
    fn should_report_timebase_and_freq(simtime: SimulationTime) {
        assert_eq!(simtime.timebase(), 15);
        assert_eq!(simtime.time_freq(), "15 min");
    }

    #[rstest]
    fn should_have_quarter_hour_year() {
        assert_eq!(SimulationTime::whole_year(15).total_steps(), 35_040);
    }

    #[rstest]
    fn should_iterate_correctly(simtime: SimulationTime) {
        let hours = [742, 742, 742, 742, 743, 743, 743, 743];
        let hours_of_day = [22, 22, 22, 22, 23, 23, 23, 23];
        let fractions = [0., 0.25, 0.5, 0.75, 0., 0.25, 0.5, 0.75];
        let mut i = 0;
        for item in simtime.iter() {
            assert_eq!(item.index, i);
            assert_eq!(item.time, 742. + i as f64 * 0.25);
            assert_eq!(item.timestep, 0.25);
            assert_eq!(item.current_hour(), hours[i]);
            assert_eq!(item.hour_of_day(), hours_of_day[i]);
            assert_eq!(item.current_day(), 30);
            assert_eq!(item.fraction_of_hour(), fractions[i]);
            assert_eq!(item.steps_per_day(), 96);
            assert_eq!(item.time_series_idx(0, 0.25), 742 * 4 + i);
            i += 1;
        }
        assert_eq!(i, 8);
    }
}
