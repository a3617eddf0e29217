//! Demand coverage: every OD pair's demand is carried in every modeled year.
use crate::optimisation::problem::{ConstraintFamily, Problem};
use crate::optimisation::variables::{Variables, flow_options};
use crate::registry::EntityRegistry;
use crate::year::YearSeries;
use indexmap::IndexMap;

/// Add demand coverage constraints.
///
/// For each OD pair and modeled year, the flow over all paths, units and generations equals the
/// demand summed over the calendar years the modeled year represents, in kt.
pub fn add_demand_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let mut terms: IndexMap<_, Vec<_>> = IndexMap::new();
    for option in flow_options(registry) {
        let var = variables.flow.get(&option.key());
        terms
            .entry((option.year, option.od_pair.id.clone()))
            .or_default()
            .push((var, 1.0));
    }

    for &year in registry.temporal.modeled_years() {
        for od_pair in registry.od_pairs.values() {
            let demand = demand_for_period(registry, &od_pair.demand, year);
            let row_terms = terms
                .swap_remove(&(year, od_pair.id.clone()))
                .unwrap_or_default();
            problem.add_row(ConstraintFamily::DemandCoverage, demand..=demand, row_terms);
        }
    }
}

/// The demand (kt) to be carried in the period represented by modeled year `year`
fn demand_for_period(registry: &EntityRegistry, demand: &YearSeries, year: u32) -> f64 {
    demand.sum_over(registry.temporal.represented_years(year)) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::registry;
    use crate::optimisation::variables::add_variables;
    use crate::temporal::{TemporalConfig, TemporalIndex};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_demand_rows(registry: EntityRegistry) {
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &registry);
        add_demand_constraints(&mut problem, &variables, &registry);

        let rows = problem.rows_in(ConstraintFamily::DemandCoverage).collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);

        // 10,000 t a year is 10 kt
        for row in &rows {
            assert_approx_eq!(f64, row.min, 10.0);
            assert_approx_eq!(f64, row.max, 10.0);
        }

        // 2020: three generations for each truck plus rail
        assert_eq!(rows[0].terms.len(), 3 * 2 + 1);
    }

    #[rstest]
    fn test_demand_summed_over_period(mut registry: EntityRegistry) {
        registry.temporal = TemporalIndex::new(&TemporalConfig {
            y_init: 2020,
            horizon: 5,
            pre_years: 0,
            time_step: 2,
            investment_period: 1,
        })
        .unwrap();
        let demand = YearSeries::from_entries(
            2020..=2024,
            [
                (2020, 1000.0),
                (2021, 2000.0),
                (2022, 3000.0),
                (2023, 4000.0),
                (2024, 5000.0),
            ],
        )
        .unwrap();

        // 2020 represents 2020-2021, 2022 represents 2022-2023 and 2024 only itself
        assert_approx_eq!(f64, demand_for_period(&registry, &demand, 2020), 3.0);
        assert_approx_eq!(f64, demand_for_period(&registry, &demand, 2022), 7.0);
        assert_approx_eq!(f64, demand_for_period(&registry, &demand, 2024), 5.0);
    }
}
