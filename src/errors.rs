use thiserror::Error;

/// Top-level error taxonomy for a VPP simulation run.
///
/// Configuration faults (bad parameters, uncovering series, duplicate
/// component ids) are fatal at construction or registration; the
/// thermal-underrun fault aborts a running simulation without partial-log
/// cleanup (logs stay consistent up to the failing step). Recoverable
/// conditions (blocked ramps, uncovered battery residual) are reflected in
/// the emitted series and never surface here.
#[derive(Debug, Error)]
pub enum VppError {
    #[error("Invalid component or parameter configuration: {0}")]
    InvalidConfiguration(#[from] anyhow::Error),
    #[error("Error identified during VPP simulation: {0}")]
    FailureInSimulation(#[from] SimulationCoreError),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct SimulationCoreError {
    error: anyhow::Error,
}

impl SimulationCoreError {
    pub(crate) fn new(error: anyhow::Error) -> Self {
        Self { error }
    }
}

/// Fault raised by the thermal storage when its temperature falls below the
/// 40°C floor, signalling that the attached generator is undersized for the
/// demand and ambient conditions. Intended as a loud signal for autosizing
/// callers; not recovered locally.
#[derive(Clone, Debug, Error)]
#[error("Thermal storage underrun: temperature {temperature}°C at simulation hour {time} is below the 40°C floor")]
pub struct ThermalUnderrunError {
    pub temperature: f64,
    pub time: f64,
}

impl ThermalUnderrunError {
    pub(crate) fn new(temperature: f64, time: f64) -> Self {
        Self { temperature, time }
    }
}

impl From<ThermalUnderrunError> for VppError {
    fn from(error: ThermalUnderrunError) -> Self {
        Self::FailureInSimulation(SimulationCoreError::new(error.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    fn should_wrap_underrun_as_simulation_failure() {
        let error: VppError = ThermalUnderrunError::new(38.2, 101.25).into();
        assert!(matches!(error, VppError::FailureInSimulation(_)));
        assert!(error.to_string().contains("38.2"));
    }
}
