use crate::core::energy_supply::elec_battery::ElectricalEnergyStorage;
use crate::core::energy_supply::power_series::PowerSeries;
use crate::core::heating_systems::chp::CombinedHeatAndPower;
use crate::core::heating_systems::heat_pump::HeatPump;
use crate::core::heating_systems::heating_rod::HeatingRod;
use crate::simulation_time::SimulationTimeIteration;
use anyhow::bail;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Anything that can contribute a signed electrical value to a portfolio
/// balance, dispatched over the concrete component kinds.
#[derive(Clone, Debug)]
pub enum Component {
    HeatPump(HeatPump),
    HeatingRod(HeatingRod),
    CombinedHeatAndPower(CombinedHeatAndPower),
    ElectricalEnergyStorage(ElectricalEnergyStorage),
    PowerSeries(PowerSeries),
}

impl Component {
    pub fn identifier(&self) -> &str {
        match self {
            Component::HeatPump(heat_pump) => heat_pump.identifier(),
            Component::HeatingRod(heating_rod) => heating_rod.identifier(),
            Component::CombinedHeatAndPower(chp) => chp.identifier(),
            Component::ElectricalEnergyStorage(battery) => battery.identifier(),
            Component::PowerSeries(power_series) => power_series.identifier(),
        }
    }

    /// Signed contribution (kW, consumption positive, generation negative)
    /// at a timestep already covered by the component's log or series.
    pub fn value_for_timestamp(&self, simtime: &SimulationTimeIteration) -> Option<f64> {
        match self {
            Component::HeatPump(heat_pump) => heat_pump.value_for_timestamp(simtime),
            Component::HeatingRod(heating_rod) => heating_rod.value_for_timestamp(simtime),
            Component::CombinedHeatAndPower(chp) => chp.value_for_timestamp(simtime),
            Component::ElectricalEnergyStorage(battery) => battery.value_for_timestamp(simtime),
            Component::PowerSeries(power_series) => power_series.value_for_timestamp(simtime),
        }
    }

    pub fn reset_time_series(&mut self) {
        match self {
            Component::HeatPump(heat_pump) => heat_pump.reset_time_series(),
            Component::HeatingRod(heating_rod) => heating_rod.reset_time_series(),
            Component::CombinedHeatAndPower(chp) => chp.reset_time_series(),
            Component::ElectricalEnergyStorage(battery) => battery.reset_time_series(),
            // a wrapped feed-in series carries no mutable state
            Component::PowerSeries(_) => {}
        }
    }
}

/// A named portfolio of components keyed by identifier.
///
/// Aggregation is a pure sum over the signed component values; grid
/// placement only needs the identifier lists from the bus helpers.
#[derive(Clone, Debug, Default)]
pub struct VirtualPowerPlant {
    name: String,
    components: IndexMap<String, Arc<RwLock<Component>>>,
}

impl VirtualPowerPlant {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            components: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Register a component under its identifier. A duplicate identifier is
    /// a configuration fault.
    pub fn add(&mut self, component: Arc<RwLock<Component>>) -> anyhow::Result<()> {
        let identifier = component.read().identifier().to_owned();
        if self.components.contains_key(&identifier) {
            bail!("a component with the identifier '{identifier}' is already registered in the portfolio '{}'", self.name);
        }
        self.components.insert(identifier, component);
        Ok(())
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Arc<RwLock<Component>>> {
        self.components.shift_remove(identifier)
    }

    pub fn component(&self, identifier: &str) -> Option<Arc<RwLock<Component>>> {
        self.components.get(identifier).cloned()
    }

    pub fn component_ids(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    /// Portfolio balance (kW, consumption positive) at a timestep: the sum
    /// of all component values, with components whose logs do not cover the
    /// timestep contributing nothing.
    pub fn balance_at_timestamp(&self, simtime: &SimulationTimeIteration) -> f64 {
        self.components
            .values()
            .filter_map(|component| component.read().value_for_timestamp(simtime))
            .sum()
    }

    pub fn buses_with_heat_pumps(&self) -> Vec<String> {
        self.identifiers_matching(|component| matches!(component, Component::HeatPump(_)))
    }

    pub fn buses_with_storage(&self) -> Vec<String> {
        self.identifiers_matching(|component| {
            matches!(component, Component::ElectricalEnergyStorage(_))
        })
    }

    pub fn buses_with_generation(&self) -> Vec<String> {
        self.identifiers_matching(|component| {
            matches!(
                component,
                Component::PowerSeries(_) | Component::CombinedHeatAndPower(_)
            )
        })
    }

    pub fn reset_time_series(&mut self) {
        for component in self.components.values() {
            component.write().reset_time_series();
        }
    }

    fn identifiers_matching(&self, predicate: impl Fn(&Component) -> bool) -> Vec<String> {
        self.components
            .iter()
            .filter(|(_, component)| predicate(&component.read()))
            .map(|(identifier, _)| identifier.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn step(index: usize) -> SimulationTimeIteration {
        SimulationTimeIteration {
            index,
            time: index as f64 * 0.25,
            timestep: 0.25,
        }
    }

    fn feed_in(identifier: &str, series: Vec<f64>) -> Arc<RwLock<Component>> {
        Arc::new(RwLock::new(Component::PowerSeries(PowerSeries::new(
            identifier, series,
        ))))
    }

    fn rod(identifier: &str) -> Arc<RwLock<Component>> {
        Arc::new(RwLock::new(Component::HeatingRod(HeatingRod::new(
            identifier, 3., 1., 0., 0., 0, 0,
        ))))
    }

    #[rstest]
    fn should_reject_duplicate_identifiers() {
        let mut vpp = VirtualPowerPlant::new("district_0");
        vpp.add(feed_in("pv_0", vec![1.])).unwrap();
        assert!(vpp.add(feed_in("pv_0", vec![2.])).is_err());
        assert_eq!(vpp.len(), 1);
    }

    #[rstest]
    fn should_remove_by_identifier() {
        let mut vpp = VirtualPowerPlant::new("district_0");
        vpp.add(feed_in("pv_0", vec![1.])).unwrap();
        assert!(vpp.remove("pv_0").is_some());
        assert!(vpp.remove("pv_0").is_none());
        assert!(vpp.is_empty());
    }

    #[rstest]
    fn should_sum_signed_values() {
        let mut vpp = VirtualPowerPlant::new("district_0");
        vpp.add(feed_in("pv_0", vec![2.5])).unwrap();
        let consumer = rod("rod_0");
        {
            let mut consumer = consumer.write();
            if let Component::HeatingRod(rod) = &mut *consumer {
                rod.ramp_up(&step(0));
                let observation = rod.observations_for_timestamp(&step(0));
                rod.log_observation(observation, &step(0));
            }
        }
        vpp.add(consumer).unwrap();
        // 3 kW consumption against 2.5 kW generation
        assert_eq!(vpp.balance_at_timestamp(&step(0)), 0.5);
    }

    #[rstest]
    fn should_skip_components_without_coverage() {
        let mut vpp = VirtualPowerPlant::new("district_0");
        vpp.add(feed_in("pv_0", vec![2.5])).unwrap();
        // heating rod log is empty, so only the feed-in counts
        vpp.add(rod("rod_0")).unwrap();
        assert_eq!(vpp.balance_at_timestamp(&step(0)), -2.5);
    }

    #[rstest]
    fn should_list_buses_by_kind() {
        let mut vpp = VirtualPowerPlant::new("district_0");
        vpp.add(feed_in("pv_0", vec![])).unwrap();
        vpp.add(rod("rod_0")).unwrap();
        vpp.add(Arc::new(RwLock::new(Component::CombinedHeatAndPower(
            CombinedHeatAndPower::new("chp_0", 6., 10., 0.8, 0., 0., 1, 2),
        ))))
        .unwrap();
        assert_eq!(vpp.buses_with_generation(), vec!["pv_0", "chp_0"]);
        assert!(vpp.buses_with_heat_pumps().is_empty());
        assert!(vpp.buses_with_storage().is_empty());
    }
}
