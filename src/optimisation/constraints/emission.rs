//! Limits on CO2 emissions.
use crate::optimisation::problem::{ConstraintFamily, Problem};
use crate::optimisation::variables::{FlowOption, Variables, flow_options};
use crate::mode::ModeID;
use crate::registry::EntityRegistry;
use crate::unit::CostBearingUnit;
use indexmap::IndexMap;

/// Grams in a tonne
const GRAMS_PER_TONNE: f64 = 1e6;

/// Emissions (tCO2) per unit of flow (kt) for a way of carrying freight.
///
/// Fleet vehicles emit according to the energy they use and the emission factor of their fuel.
/// Levelized modes emit per tonne-km.
pub fn emissions_per_flow(option: &FlowOption) -> f64 {
    match &option.unit {
        CostBearingUnit::Vehicle(vehicle) => {
            let parameter = vehicle.parameter(option.generation);
            let energy = parameter.trips(1.0) * parameter.energy_for(option.path.length);
            energy * vehicle.fuel.emission_factor / GRAMS_PER_TONNE
        }
        CostBearingUnit::Levelized(mode) => {
            let tonne_km = 1000.0 * option.path.length;
            tonne_km * mode.parameter(option.year).emission_factor / GRAMS_PER_TONNE
        }
    }
}

/// Add emission limit constraints.
///
/// For every modeled year with an emission limit, the emissions of all freight carried in the
/// period it represents may not exceed the annual limit times the period length. Limits on a
/// single mode count the emissions of that mode's fleet vehicles or levelized service alone.
pub fn add_emission_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    if registry.emission_limits.is_empty() && registry.mode_emission_limits.is_empty() {
        return;
    }

    let mut by_year: IndexMap<u32, Vec<_>> = IndexMap::new();
    let mut by_mode: IndexMap<(ModeID, u32), Vec<_>> = IndexMap::new();
    for option in flow_options(registry) {
        let term = (variables.flow.get(&option.key()), emissions_per_flow(&option));
        by_year.entry(option.year).or_default().push(term);
        by_mode
            .entry((option.unit.mode().id.clone(), option.year))
            .or_default()
            .push(term);
    }

    for &year in registry.temporal.modeled_years() {
        if let Some(limit) = registry.period_emission_limit(year) {
            let terms = by_year.swap_remove(&year).unwrap_or_default();
            problem.add_row(ConstraintFamily::EmissionLimit, ..=limit, terms);
        }

        for mode_id in registry.modes.keys() {
            if let Some(limit) = registry.period_mode_emission_limit(mode_id, year) {
                let terms = by_mode
                    .swap_remove(&(mode_id.clone(), year))
                    .unwrap_or_default();
                problem.add_row(ConstraintFamily::ModeEmissionLimit, ..=limit, terms);
            }
        }
    }
}
