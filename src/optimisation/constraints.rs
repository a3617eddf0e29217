//! Code for adding constraints to the pathway optimisation problem.
//!
//! Each submodule generates one group of constraint families. Generators only read the registry
//! and the variable maps, and append rows to the problem.
use super::problem::Problem;
use super::variables::Variables;
use crate::registry::EntityRegistry;

mod demand;
mod emission;
mod infrastructure;
mod modal;
mod purchase;
mod route;
mod stock;

pub use emission::emissions_per_flow;

/// Add every constraint family to the problem.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `registry` - The loaded model
pub fn add_constraints(problem: &mut Problem, variables: &Variables, registry: &EntityRegistry) {
    demand::add_demand_constraints(problem, variables, registry);
    stock::add_stock_balance_constraints(problem, variables, registry);
    stock::add_aging_constraints(problem, variables, registry);
    stock::add_sizing_constraints(problem, variables, registry);
    stock::add_stock_shift_constraints(problem, variables, registry);
    purchase::add_market_share_constraints(problem, variables, registry);
    purchase::add_purchase_budget_constraints(problem, variables, registry);
    infrastructure::add_fueling_capacity_constraints(problem, variables, registry);
    infrastructure::add_mode_infrastructure_constraints(problem, variables, registry);
    route::add_route_constraints(problem, variables, registry);
    modal::add_modal_shift_constraints(problem, variables, registry);
    modal::add_mode_share_constraints(problem, variables, registry);
    emission::add_emission_constraints(problem, variables, registry);
}
