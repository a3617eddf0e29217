//! Constraints on vehicle purchases: market shares and purchase budgets.
use crate::mode::ModeID;
use crate::od_pair::OdPairID;
use crate::optimisation::problem::{ConstraintFamily, Problem, Variable};
use crate::optimisation::variables::Variables;
use crate::registry::{EntityRegistry, MarketShareLimit, SharePeriod};
use indexmap::{IndexMap, IndexSet};

/// Add market share constraints.
///
/// For each limit and each year it covers, the vehicles bought from the group are bounded by a
/// share of all vehicles bought on the modes the group runs on. A limit over the horizon sums
/// purchases over every modeled year. With no purchases at all, the limit is met.
///
/// ```text
/// sum(StockAdded[group]) - max_share * sum(StockAdded[modes]) <= 0
/// sum(StockAdded[group]) - min_share * sum(StockAdded[modes]) >= 0
/// ```
pub fn add_market_share_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    for limit in &registry.market_share_limits {
        let buckets: Vec<Vec<u32>> = match &limit.period {
            SharePeriod::Years(years) => years.iter().map(|year| vec![*year]).collect(),
            SharePeriod::Horizon => vec![registry.temporal.modeled_years().to_vec()],
        };

        for years in buckets {
            if let Some(max) = limit.max_share {
                let terms = share_terms(limit, &years, max, variables, registry);
                problem.add_row(ConstraintFamily::MarketShare, ..=0.0, terms);
            }
            if let Some(min) = limit.min_share {
                let terms = share_terms(limit, &years, min, variables, registry);
                problem.add_row(ConstraintFamily::MarketShare, 0.0.., terms);
            }
        }
    }
}

/// Terms for purchases in the group less `share` times purchases on the group's modes
fn share_terms(
    limit: &MarketShareLimit,
    years: &[u32],
    share: f64,
    variables: &Variables,
    registry: &EntityRegistry,
) -> Vec<(Variable, f64)> {
    let modes: IndexSet<ModeID> = registry
        .tech_vehicles
        .values()
        .filter(|vehicle| limit.group.contains(vehicle))
        .map(|vehicle| vehicle.mode.id.clone())
        .collect();

    variables
        .stock_added
        .iter()
        .filter(|(key, _)| years.contains(&key.year))
        .filter_map(|(key, var)| {
            let vehicle = &registry.tech_vehicles[&key.vehicle];
            if !modes.contains(&vehicle.mode.id) {
                return None;
            }

            let in_group = if limit.group.contains(vehicle) { 1.0 } else { 0.0 };
            Some((var, in_group - share))
        })
        .collect()
}

/// Add purchase budget constraints.
///
/// For every OD pair whose shipper class has a budget in a modeled year, the capital spent on new
/// vehicles (net of subsidies) may not exceed the annual budget times the period length. The
/// budget is nominal, so it is not discounted.
pub fn add_purchase_budget_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    if registry.purchase_budgets.is_empty() {
        return;
    }

    let mut spending: IndexMap<(u32, OdPairID), Vec<(Variable, f64)>> = IndexMap::new();
    for (key, var) in variables.stock_added.iter() {
        let parameter = registry.tech_vehicles[&key.vehicle].parameter(key.generation);
        spending
            .entry((key.year, key.od_pair.clone()))
            .or_default()
            .push((var, parameter.capital_cost - parameter.subsidy));
    }

    for ((year, od_pair_id), terms) in spending {
        let status = &registry.od_pairs[&od_pair_id].financial_status;
        if let Some(budget) = registry.period_purchase_budget(&status.id, year) {
            problem.add_row(ConstraintFamily::PurchaseBudget, ..=budget, terms);
        }
    }
}
