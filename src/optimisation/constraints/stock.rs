//! Fleet stock constraints: vintage accounting, aging, sizing and stock shift.
use crate::optimisation::problem::{ConstraintFamily, Problem, Variable};
use crate::optimisation::variables::{StockKey, Variables, flow_options, stock_keys};
use crate::registry::EntityRegistry;
use crate::vehicle::TechVehicleID;
use indexmap::IndexMap;

/// Add the vintage accounting constraints.
///
/// Vehicles bought in year `y` make up the whole of generation `y` in that year. Older
/// generations carry over from the previous modeled year (or from the initial stock in the first
/// year), less any vehicles retired.
pub fn add_stock_balance_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let temporal = &registry.temporal;
    for key in stock_keys(registry) {
        let total = variables.stock_total.get(&key);
        if key.generation == key.year {
            let added = variables.stock_added.get(&key);
            problem.add_row(
                ConstraintFamily::StockBalance,
                0.0..=0.0,
                [(total, 1.0), (added, -1.0)],
            );
            continue;
        }

        let existing = variables.stock_existing.get(&key);
        let removed = variables.stock_removed.get(&key);
        problem.add_row(
            ConstraintFamily::StockBalance,
            0.0..=0.0,
            [(total, 1.0), (existing, -1.0)],
        );

        if let Some(previous_year) = temporal.previous_year(key.year) {
            let previous = variables.stock_total.get(&StockKey {
                year: previous_year,
                ..key.clone()
            });
            problem.add_row(
                ConstraintFamily::StockBalance,
                0.0..=0.0,
                [(existing, 1.0), (removed, 1.0), (previous, -1.0)],
            );
        } else {
            let initial = registry.initial_stock(&key.od_pair, &key.vehicle, key.generation);
            problem.add_row(
                ConstraintFamily::StockBalance,
                initial..=initial,
                [(existing, 1.0), (removed, 1.0)],
            );
        }
    }
}

/// Add aging constraints: no vehicles of a generation remain once they are older than their
/// lifetime
pub fn add_aging_constraints(problem: &mut Problem, variables: &Variables, registry: &EntityRegistry) {
    for (key, total) in variables.stock_total.iter() {
        let lifetime = registry.tech_vehicles[&key.vehicle]
            .parameter(key.generation)
            .lifetime;
        if key.year - key.generation > lifetime {
            problem.add_row(ConstraintFamily::StockAging, 0.0..=0.0, [(total, 1.0)]);
        }
    }
}

/// Add vehicle sizing constraints.
///
/// The stock of each generation on an OD pair must be large enough to carry the annual flow
/// assigned to it over all of the OD pair's paths.
pub fn add_sizing_constraints(problem: &mut Problem, variables: &Variables, registry: &EntityRegistry) {
    let mut terms: IndexMap<StockKey, Vec<(Variable, f64)>> = IndexMap::new();
    for route in flow_options(registry).iter().filter_map(|option| option.route()) {
        let parameter = route.vehicle.parameter(route.generation);
        let period_length = f64::from(registry.temporal.period_length(route.year));
        let vehicles_per_flow = parameter.vehicles_required(route.path.length, 1.0) / period_length;
        let key = StockKey {
            year: route.year,
            od_pair: route.od_pair.id.clone(),
            vehicle: route.vehicle.id.clone(),
            generation: route.generation,
        };
        terms
            .entry(key)
            .or_default()
            .push((variables.flow.get(&route.flow_key()), -vehicles_per_flow));
    }

    for (key, mut row_terms) in terms {
        row_terms.push((variables.stock_total.get(&key), 1.0));
        problem.add_row(ConstraintFamily::VehicleSizing, 0.0.., row_terms);
    }
}

/// Add stock shift constraints, if the model sets a stock shift limit.
///
/// For each tech vehicle and modeled year after the first, the change in its total stock is at
/// most `alpha` times the previous total stock of all vehicles plus `beta` times its own previous
/// stock, in either direction.
pub fn add_stock_shift_constraints(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
) {
    let Some(limit) = registry.parameters.stock_shift else {
        return;
    };

    let mut by_vehicle: IndexMap<(u32, TechVehicleID), Vec<Variable>> = IndexMap::new();
    let mut by_year: IndexMap<u32, Vec<Variable>> = IndexMap::new();
    for (key, total) in variables.stock_total.iter() {
        by_vehicle
            .entry((key.year, key.vehicle.clone()))
            .or_default()
            .push(total);
        by_year.entry(key.year).or_default().push(total);
    }

    let temporal = &registry.temporal;
    for &year in temporal.modeled_years() {
        let Some(previous_year) = temporal.previous_year(year) else {
            continue;
        };
        let all_previous = by_year.get(&previous_year).map_or(&[][..], Vec::as_slice);

        for vehicle_id in registry.tech_vehicles.keys() {
            let lookup = |year| {
                by_vehicle
                    .get(&(year, vehicle_id.clone()))
                    .map_or(&[][..], Vec::as_slice)
            };
            let current = lookup(year);
            let previous = lookup(previous_year);

            // current - previous <= alpha * all_previous + beta * previous
            let rise = current
                .iter()
                .map(|var| (*var, 1.0))
                .chain(previous.iter().map(|var| (*var, -1.0 - limit.beta)))
                .chain(all_previous.iter().map(|var| (*var, -limit.alpha)));
            problem.add_row(ConstraintFamily::StockShift, ..=0.0, rise);

            // previous - current <= alpha * all_previous + beta * previous
            let fall = current
                .iter()
                .map(|var| (*var, -1.0))
                .chain(previous.iter().map(|var| (*var, 1.0 - limit.beta)))
                .chain(all_previous.iter().map(|var| (*var, -limit.alpha)));
            problem.add_row(ConstraintFamily::StockShift, ..=0.0, fall);
        }
    }
}
