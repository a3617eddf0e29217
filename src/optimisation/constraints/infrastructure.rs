//! Infrastructure capacity: energy drawn at a node and tonne-km carried into a node are limited by
//! the capacity installed there so far.
use crate::fuel::InfrastructureID;
use crate::mode::ModeID;
use crate::network::NodeID;
use crate::optimisation::problem::{ConstraintFamily, Problem, Variable};
use crate::optimisation::variables::{
    FuelingCapacityKey, ModeCapacityKey, Variables, flow_options, fueling_sites, mode_sites,
};
use crate::registry::EntityRegistry;
use crate::unit::CostBearingUnit;
use indexmap::IndexMap;

/// Add fueling capacity constraints.
///
/// For every site where chargers or pumps can be built and every modeled year, the energy drawn
/// by all routes passing through the node is limited by the capacity installed there by that year:
///
/// ```text
/// sum(EnergyDrawn) <= (initial + sum(FuelingCapacityAdded)) * 8760 * max_occupancy * period_length
/// ```
pub fn add_fueling_capacity_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let mut drawn: IndexMap<(u32, InfrastructureID, NodeID), Vec<(Variable, f64)>> =
        IndexMap::new();
    for (key, var) in variables.energy_drawn.iter() {
        let node = &registry.paths[&key.route.path].nodes[key.node_index];
        drawn
            .entry((key.route.year, key.infrastructure.clone(), node.id.clone()))
            .or_default()
            .push((var, 1.0));
    }

    let temporal = &registry.temporal;
    for (infrastructure_id, node_id) in fueling_sites(registry) {
        let infrastructure = &registry.infrastructures[&infrastructure_id];
        let initial = registry.initial_fueling_capacity(&infrastructure_id, &node_id);
        for &year in temporal.modeled_years() {
            let energy_per_kw =
                infrastructure.annual_energy_per_kw() * f64::from(temporal.period_length(year));
            let mut terms = drawn
                .swap_remove(&(year, infrastructure_id.clone(), node_id.clone()))
                .unwrap_or_default();
            for inv_year in temporal.investment_years_up_to(year) {
                let added = variables.fueling_capacity_added.get(&FuelingCapacityKey {
                    year: inv_year,
                    infrastructure: infrastructure_id.clone(),
                    node: node_id.clone(),
                });
                terms.push((added, -energy_per_kw));
            }

            problem.add_row(
                ConstraintFamily::FuelingCapacity,
                ..=initial * energy_per_kw,
                terms,
            );
        }
    }
}

/// Add mode infrastructure constraints.
///
/// For every infrastructure-limited levelized mode, the tonne-km carried into each node on its
/// paths during a modeled period is limited by the capacity installed at the node by that year:
///
/// ```text
/// sum(Flow * 1000 * distance_from_previous) <= (initial + sum(ModeCapacityAdded)) * period_length
/// ```
pub fn add_mode_infrastructure_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let mut carried: IndexMap<(u32, ModeID, NodeID), Vec<(Variable, f64)>> = IndexMap::new();
    for option in flow_options(registry) {
        let CostBearingUnit::Levelized(mode) = &option.unit else {
            continue;
        };
        if !mode.infrastructure_limited {
            continue;
        }

        let var = variables.flow.get(&option.key());
        let path = &option.path;
        for i in path.arrival_indexes() {
            carried
                .entry((option.year, mode.id.clone(), path.nodes[i].id.clone()))
                .or_default()
                .push((var, 1000.0 * path.distance_from_previous[i]));
        }
    }

    let temporal = &registry.temporal;
    for (mode_id, node_id) in mode_sites(registry) {
        let initial = registry.initial_mode_capacity(&mode_id, &node_id);
        for &year in temporal.modeled_years() {
            let period_length = f64::from(temporal.period_length(year));
            let mut terms = carried
                .swap_remove(&(year, mode_id.clone(), node_id.clone()))
                .unwrap_or_default();
            for inv_year in temporal.investment_years_up_to(year) {
                let added = variables.mode_capacity_added.get(&ModeCapacityKey {
                    year: inv_year,
                    mode: mode_id.clone(),
                    node: node_id.clone(),
                });
                terms.push((added, -period_length));
            }

            problem.add_row(
                ConstraintFamily::ModeInfrastructure,
                ..=initial * period_length,
                terms,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::registry;
    use crate::mode::Mode;
    use crate::optimisation::variables::add_variables;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::rc::Rc;

    /// Make rail infrastructure-limited, with 1 Mtkm/year already installed at B
    fn limit_rail(registry: &mut EntityRegistry) {
        let mut rail = (*registry.modes["rail"]).clone();
        rail.infrastructure_limited = true;
        let rail: Rc<Mode> = Rc::new(rail);
        registry.modes.insert(rail.id.clone(), rail);
        registry
            .initial_mode_infrastructure
            .insert(("rail".into(), "B".into()), 1e6);
    }

    #[rstest]
    fn test_fueling_capacity_accumulates(registry: EntityRegistry) {
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_fueling_capacity_constraints(&mut problem, &variables, &registry);

        // Chargers at B only, one row per modeled year
        let rows = problem.rows_in(ConstraintFamily::FuelingCapacity).collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);

        // 8760 h at 50% occupancy
        let energy_per_kw = 4380.0;
        for (row, year) in rows.iter().zip(2020u32..) {
            let added = variables
                .fueling_capacity_added
                .iter()
                .filter(|(key, _)| key.year <= year)
                .map(|(_, var)| var)
                .collect::<Vec<_>>();
            let num_generations = (year - 2018 + 1) as usize;
            assert_eq!(row.terms.len(), num_generations + added.len());
            for var in added {
                let (_, coefficient) = row.terms.iter().find(|(v, _)| *v == var).unwrap();
                assert_approx_eq!(f64, *coefficient, -energy_per_kw);
            }
            assert_approx_eq!(f64, row.max, 0.0);
        }
    }

    #[rstest]
    fn test_fueling_capacity_initial(mut registry: EntityRegistry) {
        registry
            .initial_fueling_infrastructure
            .insert(("charger".into(), "B".into()), 100.0);
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_fueling_capacity_constraints(&mut problem, &variables, &registry);

        for row in problem.rows_in(ConstraintFamily::FuelingCapacity) {
            assert_approx_eq!(f64, row.max, 100.0 * 4380.0);
            assert_eq!(row.min, f64::NEG_INFINITY);
        }
    }

    #[rstest]
    fn test_mode_infrastructure(mut registry: EntityRegistry) {
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_mode_infrastructure_constraints(&mut problem, &variables, &registry);
        assert_eq!(problem.num_rows(), 0);

        limit_rail(&mut registry);
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_mode_infrastructure_constraints(&mut problem, &variables, &registry);

        // Nodes B and C, three modeled years
        let rows = problem.rows_in(ConstraintFamily::ModeInfrastructure).collect::<Vec<_>>();
        assert_eq!(rows.len(), 2 * 3);

        let flow = variables
            .flow
            .iter()
            .find(|(key, _)| key.year == 2020 && key.unit.to_string() == "rail")
            .map(|(_, var)| var)
            .unwrap();
        let added = variables.mode_capacity_added.get(&ModeCapacityKey {
            year: 2020,
            mode: "rail".into(),
            node: "B".into(),
        });
        assert_eq!(rows[0].terms, [(flow, 300_000.0), (added, -1.0)]);
        assert_approx_eq!(f64, rows[0].max, 1e6);
        assert_approx_eq!(f64, rows[3].max, 0.0);
    }
}
