use crate::simulation_time::SimulationTimeIteration;

/// An externally computed AC feed-in trace (PV, wind) wrapped as a portfolio
/// component.
///
/// The series holds generation as positive kW per timestep; the component
/// contract reports it negated, keeping the consumption-positive sign
/// convention so aggregation stays a pure sum.
#[derive(Clone, Debug)]
pub struct PowerSeries {
    identifier: String,
    /// AC generation per timestep, in kW, generation positive
    series: Vec<f64>,
}

impl PowerSeries {
    pub fn new(identifier: &str, series: Vec<f64>) -> Self {
        Self {
            identifier: identifier.into(),
            series,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Raw generation (kW, positive) at a timestep within the series.
    pub fn generation_at(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        self.series
            .get(simtime.time_series_idx(0, simtime.timestep))
            .copied()
    }

    /// Signed contribution (kW, consumption positive): the negated
    /// generation.
    pub fn value_for_timestamp(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        self.generation_at(simtime).map(|generation| -generation)
    }
}
