//! The pathway optimisation: decision variables, constraints and objective, and the code to solve
//! the resulting problem.
use crate::registry::EntityRegistry;
use log::info;

pub mod constraints;
pub mod diagnostics;
pub mod objective;
pub mod problem;
pub mod solver;
pub mod variables;

use objective::CostBreakdown;
use problem::Problem;
pub use solver::{SolveStatus, SolverOptionValue, SolverOutcome, SolverSettings, solve};
use variables::Variables;

/// The optimisation problem for a model, together with what is needed to interpret its solution
#[derive(Debug)]
pub struct PathwayProblem {
    /// The problem to hand to the solver
    pub problem: Problem,
    /// The variables, keyed by what they represent
    pub variables: Variables,
    /// The objective, split up for reporting
    pub costs: CostBreakdown,
}

/// Build the complete optimisation problem for a loaded model.
///
/// # Arguments
///
/// * `registry` - The loaded model
pub fn build_problem(registry: &EntityRegistry) -> PathwayProblem {
    let mut problem = Problem::default();
    let variables = variables::add_variables(&mut problem, registry);
    info!("Added {} variables", problem.num_variables());

    constraints::add_constraints(&mut problem, &variables, registry);
    info!("Added {} constraints", problem.num_rows());

    let costs = objective::add_objective(&mut problem, &variables, registry);
    if problem.is_mip() {
        info!("Vehicle stock is integer; solving as a MIP");
    }

    PathwayProblem {
        problem,
        variables,
        costs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::registry;
    use crate::mode::Mode;
    use crate::model::ShiftLimit;
    use crate::registry::{MarketShareLimit, ModeShareLimit, SharePeriod};
    use crate::vehicle::VehicleGroup;
    use problem::VariableFamily;
    use rstest::rstest;
    use std::collections::HashSet;
    use std::rc::Rc;
    use strum::IntoEnumIterator;

    /// The fixture with every optional feature switched on
    fn full_registry(mut registry: EntityRegistry) -> EntityRegistry {
        let mut rail = (*registry.modes["rail"]).clone();
        rail.infrastructure_limited = true;
        let rail: Rc<Mode> = Rc::new(rail);
        registry.modes.insert(rail.id.clone(), Rc::clone(&rail));

        // Old diesel trucks age out during the horizon
        let mut diesel = (*registry.tech_vehicles["diesel"]).clone();
        for parameter in diesel.parameters.values_mut() {
            parameter.lifetime = 2;
        }
        registry
            .tech_vehicles
            .insert(diesel.id.clone(), Rc::new(diesel));

        registry.parameters.stock_shift = Some(ShiftLimit {
            alpha: 0.2,
            beta: 0.2,
        });
        registry.parameters.modal_shift = Some(ShiftLimit {
            alpha: 0.2,
            beta: 0.2,
        });
        registry.mode_share_limits = vec![ModeShareLimit {
            mode: rail,
            years: vec![2020],
            min_share: Some(0.1),
            max_share: Some(0.9),
        }];
        registry.market_share_limits = vec![MarketShareLimit {
            group: VehicleGroup::Technology("battery_electric".into()),
            period: SharePeriod::Years(vec![2021]),
            min_share: None,
            max_share: Some(0.9),
        }];
        registry.emission_limits.insert(2022, 1e6);
        registry
            .mode_emission_limits
            .insert(("rail".into(), 2022), 1e6);
        registry.carbon_prices.insert(("B".into(), 2020), 50.0);
        registry.purchase_budgets.insert(("fs1".into(), 2021), 1e9);
        registry
    }

    #[rstest]
    fn test_every_family_is_constrained(registry: EntityRegistry) {
        let registry = full_registry(registry);
        let PathwayProblem { problem, .. } = build_problem(&registry);

        let constrained = problem
            .rows()
            .iter()
            .flat_map(|row| row.terms.iter())
            .map(|(var, _)| problem.variables()[var.index()].family)
            .collect::<HashSet<_>>();
        for family in VariableFamily::iter() {
            assert!(constrained.contains(&family), "{family} is not constrained");
        }

        for family in problem::ConstraintFamily::iter() {
            assert!(
                problem.rows_in(family).next().is_some(),
                "No {family} constraints"
            );
        }
    }

    #[rstest]
    fn test_cost_bearing_families_in_objective(registry: EntityRegistry) {
        let registry = full_registry(registry);
        let PathwayProblem { problem, .. } = build_problem(&registry);

        let costed = problem
            .variables()
            .iter()
            .zip(problem.costs())
            .filter(|(_, cost)| **cost != 0.0)
            .map(|(definition, _)| definition.family)
            .collect::<HashSet<_>>();

        let cost_bearing = HashSet::from([
            VariableFamily::Flow,
            VariableFamily::StockTotal,
            VariableFamily::StockAdded,
            VariableFamily::EnergyDrawn,
            VariableFamily::BreakTime,
            VariableFamily::FuelingCapacityAdded,
            VariableFamily::ModeCapacityAdded,
        ]);
        assert_eq!(costed, cost_bearing);

        // Vehicles carried over or retired are paid for through StockTotal, and the state of
        // charge and elapsed time along a route are paid for through EnergyDrawn and BreakTime
        let accounting = VariableFamily::iter()
            .filter(|family| !cost_bearing.contains(family))
            .collect::<Vec<_>>();
        assert_eq!(
            accounting,
            [
                VariableFamily::StockExisting,
                VariableFamily::StockRemoved,
                VariableFamily::StateOfCharge,
                VariableFamily::TravelTime,
            ]
        );
    }

    #[rstest]
    fn test_integer_stock(mut registry: EntityRegistry) {
        assert!(!build_problem(&registry).problem.is_mip());
        registry.parameters.integer_stock = true;
        let PathwayProblem { problem, .. } = build_problem(&registry);
        assert!(problem.is_mip());
        assert!(
            problem
                .variables()
                .iter()
                .filter(|definition| definition.integer)
                .all(|definition| matches!(
                    definition.family,
                    VariableFamily::StockTotal | VariableFamily::StockAdded
                ))
        );
    }
}
