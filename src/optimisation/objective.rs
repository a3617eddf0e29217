//! The objective: total discounted system cost over the horizon.
//!
//! Costs are discounted to `y_init` with `d(y) = (1 + r)^-(y - y_init)`. Flow variables already
//! hold the freight carried over a whole modeled period, so flow-based costs cover the period
//! automatically. Annual costs on stock and capacity are multiplied by the period length here.
//! One-off capital costs are not scaled.
use super::constraints::emissions_per_flow;
use super::problem::{Problem, Variable};
use super::variables::{Variables, flow_options};
use crate::finance::discount_factor;
use crate::registry::EntityRegistry;
use crate::temporal::TemporalIndex;
use crate::unit::CostBearingUnit;
use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumIter};

/// A category of system cost, used to break the objective down in the results
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Display, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CostComponent {
    /// Vehicle purchases, net of subsidies
    VehicleCapital,
    /// Annual and distance-based vehicle maintenance
    VehicleMaintenance,
    /// Fuel and electricity, including the cost of dispensing it
    Energy,
    /// Shippers' time spent waiting, charging and resting
    ValueOfTime,
    /// Per tonne-km charges for levelized modes
    LevelizedTransport,
    /// Building and running chargers and fuel stations
    FuelingInfrastructure,
    /// Building and running mode infrastructure
    ModeInfrastructure,
    /// Carbon prices on emissions along each path
    CarbonPrice,
}

/// One discounted contribution to the objective coefficient of a variable
#[derive(Debug, Clone, PartialEq)]
pub struct CostTerm {
    /// What the cost is for
    pub component: CostComponent,
    /// The modeled year the cost falls in
    pub year: u32,
    /// The variable the cost applies to
    pub variable: Variable,
    /// Discounted cost per unit of the variable
    pub coefficient: f64,
}

/// The objective, split up by cost component and year
#[derive(Debug, Default, Clone)]
pub struct CostBreakdown {
    terms: Vec<CostTerm>,
    offsets: Vec<(CostComponent, u32, f64)>,
}

impl CostBreakdown {
    /// The contributions to variables' objective coefficients
    pub fn terms(&self) -> &[CostTerm] {
        &self.terms
    }

    /// Discounted costs for each year and component, given the value of each variable
    pub fn totals<F>(&self, value: F) -> IndexMap<(u32, CostComponent), f64>
    where
        F: Fn(Variable) -> f64,
    {
        let mut totals = IndexMap::new();
        for term in &self.terms {
            *totals.entry((term.year, term.component)).or_default() +=
                term.coefficient * value(term.variable);
        }
        for (component, year, cost) in &self.offsets {
            *totals.entry((*year, *component)).or_default() += cost;
        }
        totals.sort_keys();

        totals
    }
}

/// Adds costs to the problem and records them in a [`CostBreakdown`]
struct ObjectiveBuilder<'a> {
    problem: &'a mut Problem,
    breakdown: CostBreakdown,
    base_year: u32,
    discount_rate: f64,
}

impl ObjectiveBuilder<'_> {
    /// Add an undiscounted cost per unit of `variable`, incurred in `year`
    fn add(&mut self, component: CostComponent, year: u32, variable: Variable, cost: f64) {
        if cost == 0.0 {
            return;
        }

        let coefficient = cost * discount_factor(year, self.base_year, self.discount_rate);
        self.problem.add_cost(variable, coefficient);
        self.breakdown.terms.push(CostTerm {
            component,
            year,
            variable,
            coefficient,
        });
    }

    /// Add an undiscounted constant cost incurred in `year`
    fn add_offset(&mut self, component: CostComponent, year: u32, cost: f64) {
        if cost == 0.0 {
            return;
        }

        let cost = cost * discount_factor(year, self.base_year, self.discount_rate);
        self.problem.add_offset(cost);
        self.breakdown.offsets.push((component, year, cost));
    }
}

/// Add the objective to the problem.
///
/// # Returns
///
/// The objective broken down by cost component and year, for reporting.
pub fn add_objective(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) -> CostBreakdown {
    let mut builder = ObjectiveBuilder {
        problem,
        breakdown: CostBreakdown::default(),
        base_year: registry.temporal.y_init(),
        discount_rate: registry.parameters.discount_rate,
    };

    add_vehicle_stock_costs(&mut builder, variables, registry);
    add_flow_costs(&mut builder, variables, registry);
    add_route_costs(&mut builder, variables, registry);
    add_infrastructure_costs(&mut builder, variables, registry);

    builder.breakdown
}

fn add_vehicle_stock_costs(
    builder: &mut ObjectiveBuilder<'_>,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    for (key, var) in variables.stock_added.iter() {
        let parameter = registry.tech_vehicles[&key.vehicle].parameter(key.generation);
        builder.add(
            CostComponent::VehicleCapital,
            key.year,
            var,
            parameter.capital_cost - parameter.subsidy,
        );
    }

    for (key, var) in variables.stock_total.iter() {
        let parameter = registry.tech_vehicles[&key.vehicle].parameter(key.generation);
        let period_length = f64::from(registry.temporal.period_length(key.year));
        builder.add(
            CostComponent::VehicleMaintenance,
            key.year,
            var,
            parameter.maintenance_annual * period_length,
        );
    }
}

/// Costs which scale with the freight carried.
///
/// Waiting time and carbon prices are charged the same way for fleet vehicles and levelized
/// modes.
fn add_flow_costs(
    builder: &mut ObjectiveBuilder<'_>,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    for option in flow_options(registry) {
        let var = variables.flow.get(&option.key());
        let year = option.year;
        let mode_parameter = option.unit.mode().parameter(year);
        let tonnes_per_flow = 1000.0;

        builder.add(
            CostComponent::ValueOfTime,
            year,
            var,
            mode_parameter.waiting_time * tonnes_per_flow * option.od_pair.value_of_time(),
        );
        builder.add(
            CostComponent::CarbonPrice,
            year,
            var,
            emissions_per_flow(&option) * registry.path_carbon_price(&option.path, year),
        );

        match &option.unit {
            CostBearingUnit::Vehicle(vehicle) => {
                let parameter = vehicle.parameter(option.generation);
                let vehicle_km = parameter.trips(1.0) * option.path.length;
                builder.add(
                    CostComponent::VehicleMaintenance,
                    year,
                    var,
                    parameter.maintenance_distance * vehicle_km,
                );
                builder.add(
                    CostComponent::Energy,
                    year,
                    var,
                    parameter.energy_for(vehicle_km) * vehicle.fuel.cost_per_kwh.get(year),
                );
            }
            CostBearingUnit::Levelized(_) => {
                builder.add(
                    CostComponent::LevelizedTransport,
                    year,
                    var,
                    mode_parameter.cost_per_ukm * tonnes_per_flow * option.path.length,
                );
            }
        }
    }
}

/// Costs of charging and resting along routes
fn add_route_costs(
    builder: &mut ObjectiveBuilder<'_>,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    for (key, var) in variables.energy_drawn.iter() {
        let route = &key.route;
        let infrastructure = &registry.infrastructures[&key.infrastructure];
        let parameter = registry.tech_vehicles[&route.vehicle].parameter(route.generation);
        let value_of_time = registry.od_pairs[&route.od_pair].value_of_time();

        builder.add(
            CostComponent::Energy,
            route.year,
            var,
            infrastructure.cost(route.year).cost_per_kwh,
        );

        // Hours spent charging, times the freight waiting on board
        builder.add(
            CostComponent::ValueOfTime,
            route.year,
            var,
            parameter.payload * value_of_time / parameter.charging_power(infrastructure),
        );
    }

    for (key, var) in variables.break_time.iter() {
        let route = &key.route;
        let parameter = registry.tech_vehicles[&route.vehicle].parameter(route.generation);
        let value_of_time = registry.od_pairs[&route.od_pair].value_of_time();
        builder.add(
            CostComponent::ValueOfTime,
            route.year,
            var,
            parameter.payload * value_of_time,
        );
    }
}

/// The modeled years from `from` onwards, with their period lengths
fn operating_years(temporal: &TemporalIndex, from: u32) -> impl Iterator<Item = (u32, f64)> + '_ {
    temporal
        .modeled_years()
        .iter()
        .copied()
        .filter(move |year| *year >= from)
        .map(|year| (year, f64::from(temporal.period_length(year))))
}

/// Capital costs at the investment year, plus O&M in every later modeled year for new and
/// existing capacity
fn add_infrastructure_costs(
    builder: &mut ObjectiveBuilder<'_>,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let temporal = &registry.temporal;

    for (key, var) in variables.fueling_capacity_added.iter() {
        let infrastructure = &registry.infrastructures[&key.infrastructure];
        let component = CostComponent::FuelingInfrastructure;
        builder.add(component, key.year, var, infrastructure.cost(key.year).cost_per_kw);
        for (year, period_length) in operating_years(temporal, key.year) {
            let om_cost = infrastructure.cost(year).om_cost;
            builder.add(component, year, var, om_cost * period_length);
        }
    }

    for ((infrastructure_id, _), capacity) in &registry.initial_fueling_infrastructure {
        let infrastructure = &registry.infrastructures[infrastructure_id];
        for (year, period_length) in operating_years(temporal, temporal.y_init()) {
            let om_cost = infrastructure.cost(year).om_cost;
            builder.add_offset(
                CostComponent::FuelingInfrastructure,
                year,
                capacity * om_cost * period_length,
            );
        }
    }

    for (key, var) in variables.mode_capacity_added.iter() {
        let mode = &registry.modes[&key.mode];
        let component = CostComponent::ModeInfrastructure;
        let expansion_cost = mode.parameter(key.year).infrastructure_expansion_cost;
        builder.add(component, key.year, var, expansion_cost);
        for (year, period_length) in operating_years(temporal, key.year) {
            let om_cost = mode.parameter(year).infrastructure_om_cost;
            builder.add(component, year, var, om_cost * period_length);
        }
    }

    for ((mode_id, _), capacity) in &registry.initial_mode_infrastructure {
        let mode = &registry.modes[mode_id];
        for (year, period_length) in operating_years(temporal, temporal.y_init()) {
            let om_cost = mode.parameter(year).infrastructure_om_cost;
            builder.add_offset(
                CostComponent::ModeInfrastructure,
                year,
                capacity * om_cost * period_length,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::registry;
    use crate::optimisation::variables::{FuelingCapacityKey, StockKey, add_variables};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::rc::Rc;

    fn build(registry: &EntityRegistry) -> (Problem, Variables, CostBreakdown) {
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, registry);
        let breakdown = add_objective(&mut problem, &variables, registry);
        (problem, variables, breakdown)
    }

    fn component_cost(breakdown: &CostBreakdown, component: CostComponent, var: Variable) -> f64 {
        breakdown
            .terms()
            .iter()
            .filter(|term| term.component == component && term.variable == var)
            .map(|term| term.coefficient)
            .sum()
    }

    fn flow_in_2020(variables: &Variables, unit: &str) -> Variable {
        variables
            .flow
            .iter()
            .find(|(key, _)| {
                key.year == 2020 && key.generation == 2020 && key.unit.to_string() == unit
            })
            .map(|(_, var)| var)
            .unwrap()
    }

    #[rstest]
    fn test_capital_cost_discounted(registry: EntityRegistry) {
        let (problem, variables, _) = build(&registry);
        let added = variables.stock_added.get(&StockKey {
            year: 2021,
            od_pair: "od1".into(),
            vehicle: "bev".into(),
            generation: 2021,
        });
        assert_approx_eq!(f64, problem.cost(added), 150_000.0 / 1.05);
    }

    #[rstest]
    fn test_waiting_time_symmetric(registry: EntityRegistry) {
        let (_, variables, breakdown) = build(&registry);
        let truck = flow_in_2020(&variables, "bev");
        let rail = flow_in_2020(&variables, "rail");

        // Waiting hours times 1000 t per kt times a value of time of 1
        let value_of_time = |var| component_cost(&breakdown, CostComponent::ValueOfTime, var);
        assert_approx_eq!(f64, value_of_time(truck), 0.5 * 1000.0);
        assert_approx_eq!(f64, value_of_time(rail), 5.0 * 1000.0);

        // Rail is charged per tkm and has no fleet costs
        assert_approx_eq!(
            f64,
            component_cost(&breakdown, CostComponent::LevelizedTransport, rail),
            0.05 * 1000.0 * 600.0
        );
        assert_eq!(
            component_cost(&breakdown, CostComponent::VehicleMaintenance, rail),
            0.0
        );
    }

    #[rstest]
    fn test_levelized_matches_fleet_with_equal_costs(mut registry: EntityRegistry) {
        // Diesel trucks in 2020, per kt over 600 km: waiting 500, distance maintenance
        // 0.1 * 24,000 vkm = 2400 and fuel 3 kWh/km * 24,000 vkm * 0.1 = 7200 on the flow, plus
        // 0.24 vehicles costing 100,000 to buy and 5000 to maintain
        let fleet_cost = 500.0 + 2400.0 + 7200.0 + 0.24 * 105_000.0;

        // Rail with the same waiting time and the same effective cost per tonne-km
        let mut rail = (*registry.modes["rail"]).clone();
        for parameter in rail.parameters.values_mut() {
            parameter.waiting_time = 0.5;
            parameter.cost_per_ukm = (fleet_cost - 500.0) / (1000.0 * 600.0);
        }
        registry.modes.insert(rail.id.clone(), Rc::new(rail));

        let (problem, variables, _) = build(&registry);
        let key = StockKey {
            year: 2020,
            od_pair: "od1".into(),
            vehicle: "diesel".into(),
            generation: 2020,
        };
        let vehicles_per_flow = registry.tech_vehicles["diesel"]
            .parameter(2020)
            .vehicles_required(600.0, 1.0);
        let fleet = problem.cost(flow_in_2020(&variables, "diesel"))
            + vehicles_per_flow
                * (problem.cost(variables.stock_added.get(&key))
                    + problem.cost(variables.stock_total.get(&key)));
        assert_approx_eq!(f64, fleet, fleet_cost, epsilon = 1e-6);

        let levelized = problem.cost(flow_in_2020(&variables, "rail"));
        assert_approx_eq!(f64, levelized, fleet, epsilon = 1e-6);
    }

    #[rstest]
    fn test_carbon_price(mut registry: EntityRegistry) {
        for node in ["A", "B", "C"] {
            registry.carbon_prices.insert((node.into(), 2020), 30.0);
        }
        let (_, variables, breakdown) = build(&registry);
        let carbon_cost = |unit| {
            component_cost(
                &breakdown,
                CostComponent::CarbonPrice,
                flow_in_2020(&variables, unit),
            )
        };

        // 12 tCO2 per kt by rail and 40 trips * 600 km * 1.2 kWh/km * 100 g/kWh by truck
        assert_approx_eq!(f64, carbon_cost("rail"), 12.0 * 30.0);
        assert_approx_eq!(f64, carbon_cost("bev"), 2.88 * 30.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_fleet_flow_costs(registry: EntityRegistry) {
        let (_, variables, breakdown) = build(&registry);
        let truck = flow_in_2020(&variables, "bev");

        // 40 trips of 600 km per kt
        let vehicle_km = 40.0 * 600.0;
        assert_approx_eq!(
            f64,
            component_cost(&breakdown, CostComponent::VehicleMaintenance, truck),
            0.1 * vehicle_km
        );
        assert_approx_eq!(
            f64,
            component_cost(&breakdown, CostComponent::Energy, truck),
            1.2 * vehicle_km * 0.2
        );
    }

    #[rstest]
    fn test_fueling_capacity_cost(registry: EntityRegistry) {
        let (problem, variables, _) = build(&registry);
        let added = variables.fueling_capacity_added.get(&FuelingCapacityKey {
            year: 2020,
            infrastructure: "charger".into(),
            node: "B".into(),
        });

        // Capital cost plus O&M in each of the three years it operates
        let om = 10.0 * (1.0 + 1.0 / 1.05 + 1.0 / 1.05f64.powi(2));
        assert_approx_eq!(f64, problem.cost(added), 500.0 + om, epsilon = 1e-9);
    }

    #[rstest]
    fn test_initial_capacity_offset(mut registry: EntityRegistry) {
        registry
            .initial_fueling_infrastructure
            .insert(("charger".into(), "B".into()), 100.0);
        let (problem, _, breakdown) = build(&registry);

        let expected = 100.0 * 10.0 * (1.0 + 1.0 / 1.05 + 1.0 / 1.05f64.powi(2));
        assert_approx_eq!(f64, problem.offset(), expected, epsilon = 1e-9);

        let totals = breakdown.totals(|_| 0.0);
        assert_approx_eq!(
            f64,
            totals[&(2020, CostComponent::FuelingInfrastructure)],
            1000.0
        );
    }

    #[rstest]
    fn test_totals_match_objective(registry: EntityRegistry) {
        let (problem, _, breakdown) = build(&registry);
        let columns = vec![1.0; problem.num_variables()];
        let total: f64 = breakdown
            .totals(|var| columns[var.index()])
            .values()
            .sum();
        assert_approx_eq!(
            f64,
            total,
            problem.objective_value(&columns),
            epsilon = 1e-6
        );
    }
}
