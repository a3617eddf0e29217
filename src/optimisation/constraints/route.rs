//! Energy and travel-time tracking along each fleet route.
//!
//! Every route (a vehicle generation travelling along a path in a modeled year) gets one forward
//! chain of constraints over its nodes. State of charge, travel time and break time are summed
//! over all the trips the route makes, so each quantity scales with the number of trips, which is
//! itself proportional to the route's flow.
use crate::optimisation::problem::{ConstraintFamily, Problem, Variable};
use crate::optimisation::variables::{EnergyKey, Route, RouteNodeKey, Variables, routes};
use crate::registry::EntityRegistry;

/// Add state of charge, travel time and mandatory break constraints for every route
pub fn add_route_constraints(problem: &mut Problem, variables: &Variables, registry: &EntityRegistry) {
    for route in routes(registry) {
        add_constraints_for_route(problem, variables, registry, &route);
    }
}

fn add_constraints_for_route(
    problem: &mut Problem,
    variables: &Variables,
    registry: &EntityRegistry,
    route: &Route,
) {
    let route_key = route.key();
    let node_key = |node_index| RouteNodeKey {
        route: route_key.clone(),
        node_index,
    };
    let soc = |i| variables.state_of_charge.get(&node_key(i));
    let time = |i| variables.travel_time.get(&node_key(i));

    let parameter = route.vehicle.parameter(route.generation);
    let flow = variables.flow.get(&route.flow_key());
    let trips_per_flow = parameter.trips(1.0);
    let full_tank = parameter.tank_capacity * trips_per_flow;
    let path = &route.path;

    // Every trip leaves the origin with a full tank and the clock at zero
    problem.add_row(
        ConstraintFamily::StateOfCharge,
        0.0..=0.0,
        [(soc(0), 1.0), (flow, -full_tank)],
    );
    problem.add_row(ConstraintFamily::TravelTime, 0.0..=0.0, [(time(0), 1.0)]);

    let fueling = route.fueling_indexes();
    for i in path.arrival_indexes() {
        let distance = path.distance_from_previous[i];
        let energy = parameter.energy_for(distance) * trips_per_flow;
        let driving_time = distance / route.vehicle.speed * trips_per_flow;

        // (energy drawn, hours spent drawing it per kWh)
        let mut drawn: Vec<(Variable, f64)> = Vec::new();
        if fueling.contains(&i) {
            for infrastructure in registry.infrastructures_for(&route.vehicle) {
                let var = variables.energy_drawn.get(&EnergyKey {
                    route: route_key.clone(),
                    node_index: i,
                    infrastructure: infrastructure.id.clone(),
                });
                drawn.push((var, 1.0 / parameter.charging_power(infrastructure)));
            }
        }

        // Enough energy to reach the node
        problem.add_row(
            ConstraintFamily::StateOfCharge,
            0.0..,
            [(soc(i - 1), 1.0), (flow, -energy)],
        );

        // Energy on leaving the node
        let balance = [(soc(i), 1.0), (soc(i - 1), -1.0), (flow, energy)]
            .into_iter()
            .chain(drawn.iter().map(|(var, _)| (*var, -1.0)));
        problem.add_row(ConstraintFamily::StateOfCharge, 0.0..=0.0, balance);

        // No overcharging
        problem.add_row(
            ConstraintFamily::StateOfCharge,
            ..=0.0,
            [(soc(i), 1.0), (flow, -full_tank)],
        );

        // Elapsed time on leaving the node: driving, charging and any extra rest
        let rest = variables.break_time.get(&node_key(i));
        let elapsed = [
            (time(i), 1.0),
            (time(i - 1), -1.0),
            (flow, -driving_time),
            (rest, -1.0),
        ]
        .into_iter()
        .chain(drawn.iter().map(|(var, hours_per_kwh)| (*var, -hours_per_kwh)));
        problem.add_row(ConstraintFamily::TravelTime, 0.0..=0.0, elapsed);
    }

    for mandatory_break in registry.breaks(&path.id, &route.vehicle.id) {
        problem.add_row(
            ConstraintFamily::MandatoryBreaks,
            0.0..,
            [
                (time(mandatory_break.node_index), 1.0),
                (flow, -mandatory_break.time_with_breaks * trips_per_flow),
            ],
        );
    }
}
