//! The decision-variable factory.
//!
//! Every variable family is declared here, once, over the sets produced by the temporal index and
//! the entity registry. Constraint generators and the objective only ever look variables up
//! through the maps built here.
use super::problem::{Problem, Variable, VariableFamily};
use crate::fuel::InfrastructureID;
use crate::mode::ModeID;
use crate::network::{NodeID, Path, PathID};
use crate::od_pair::{OdPair, OdPairID};
use crate::registry::EntityRegistry;
use crate::unit::{CostBearingUnit, UnitID};
use crate::vehicle::{TechVehicle, TechVehicleID};
use indexmap::{IndexMap, IndexSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]), so iterating over a map always visits variables
/// in the order they were declared.
#[derive(Debug)]
pub struct VariableMap<K>(IndexMap<K, Variable>);

impl<K> Default for VariableMap<K> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<K: Eq + Hash + Debug> VariableMap<K> {
    fn insert(&mut self, key: K, variable: Variable) {
        let existing = self.0.insert(key, variable);
        assert!(existing.is_none(), "Variable declared twice");
    }

    /// Get the [`Variable`] corresponding to the given key.
    ///
    /// Panics if no such variable was declared.
    pub fn get(&self, key: &K) -> Variable {
        *self
            .0
            .get(key)
            .unwrap_or_else(|| panic!("No variable found for {key:?}"))
    }

    /// Get the [`Variable`] corresponding to the given key, if it was declared
    pub fn try_get(&self, key: &K) -> Option<Variable> {
        self.0.get(key).copied()
    }

    /// Iterate over keys and variables in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&K, Variable)> {
        self.0.iter().map(|(key, variable)| (key, *variable))
    }

    /// Iterate over the keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    /// The number of variables in the map
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Identifies a [`VariableFamily::Flow`] variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub year: u32,
    pub od_pair: OdPairID,
    pub path: PathID,
    pub unit: UnitID,
    pub generation: u32,
}

/// Identifies a vehicle stock variable (total, existing, added or removed)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockKey {
    pub year: u32,
    pub od_pair: OdPairID,
    pub vehicle: TechVehicleID,
    pub generation: u32,
}

/// Identifies one fleet vehicle generation travelling along one path in one year
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub year: u32,
    pub od_pair: OdPairID,
    pub path: PathID,
    pub vehicle: TechVehicleID,
    pub generation: u32,
}

/// Identifies a per-node route variable (state of charge, travel time or break time)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteNodeKey {
    pub route: RouteKey,
    pub node_index: usize,
}

/// Identifies an [`VariableFamily::EnergyDrawn`] variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnergyKey {
    pub route: RouteKey,
    pub node_index: usize,
    pub infrastructure: InfrastructureID,
}

/// Identifies a [`VariableFamily::FuelingCapacityAdded`] variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuelingCapacityKey {
    pub year: u32,
    pub infrastructure: InfrastructureID,
    pub node: NodeID,
}

/// Identifies a [`VariableFamily::ModeCapacityAdded`] variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModeCapacityKey {
    pub year: u32,
    pub mode: ModeID,
    pub node: NodeID,
}

/// One way of carrying freight for an OD pair in a modeled year
#[derive(Debug, Clone)]
pub struct FlowOption {
    pub year: u32,
    pub od_pair: Rc<OdPair>,
    pub path: Rc<Path>,
    pub unit: CostBearingUnit,
    pub generation: u32,
}

impl FlowOption {
    /// The key of this option's flow variable
    pub fn key(&self) -> FlowKey {
        FlowKey {
            year: self.year,
            od_pair: self.od_pair.id.clone(),
            path: self.path.id.clone(),
            unit: self.unit.id(),
            generation: self.generation,
        }
    }

    /// The route travelled, if this option uses a fleet vehicle
    pub fn route(&self) -> Option<Route> {
        self.unit.as_vehicle().map(|vehicle| Route {
            year: self.year,
            od_pair: Rc::clone(&self.od_pair),
            path: Rc::clone(&self.path),
            vehicle: Rc::clone(vehicle),
            generation: self.generation,
        })
    }

    /// Distance-weighted flow (kt-km per year) per unit of flow
    pub fn distance_per_year(&self, period_length: u32) -> f64 {
        self.path.length / f64::from(period_length)
    }
}

/// A fleet vehicle generation travelling along a path in a modeled year
#[derive(Debug, Clone)]
pub struct Route {
    pub year: u32,
    pub od_pair: Rc<OdPair>,
    pub path: Rc<Path>,
    pub vehicle: Rc<TechVehicle>,
    pub generation: u32,
}

impl Route {
    /// The key shared by this route's per-node variables
    pub fn key(&self) -> RouteKey {
        RouteKey {
            year: self.year,
            od_pair: self.od_pair.id.clone(),
            path: self.path.id.clone(),
            vehicle: self.vehicle.id.clone(),
            generation: self.generation,
        }
    }

    /// The key of the flow variable for this route
    pub fn flow_key(&self) -> FlowKey {
        FlowKey {
            year: self.year,
            od_pair: self.od_pair.id.clone(),
            path: self.path.id.clone(),
            unit: UnitID::Vehicle(self.vehicle.id.clone()),
            generation: self.generation,
        }
    }

    /// The node indexes at which energy can be drawn: every node except the origin and
    /// destination
    pub fn fueling_indexes(&self) -> std::ops::Range<usize> {
        1..self.path.num_nodes() - 1
    }
}

/// Every way freight can be carried, in declaration order.
///
/// Generations come from [`CostBearingUnit::generations`], so `generation <= year` always holds.
pub fn flow_options(registry: &EntityRegistry) -> Vec<FlowOption> {
    let mut options = Vec::new();
    for &year in registry.temporal.modeled_years() {
        for od_pair in registry.od_pairs.values() {
            for path in &od_pair.paths {
                for unit in registry.units_for(od_pair) {
                    for generation in unit.generations(&registry.temporal, year) {
                        options.push(FlowOption {
                            year,
                            od_pair: Rc::clone(od_pair),
                            path: Rc::clone(path),
                            unit: unit.clone(),
                            generation,
                        });
                    }
                }
            }
        }
    }

    options
}

/// Every fleet route, in declaration order
pub fn routes(registry: &EntityRegistry) -> Vec<Route> {
    flow_options(registry)
        .iter()
        .filter_map(FlowOption::route)
        .collect()
}

/// Every vehicle stock key, in declaration order
pub fn stock_keys(registry: &EntityRegistry) -> Vec<StockKey> {
    let mut keys = Vec::new();
    for &year in registry.temporal.modeled_years() {
        for od_pair in registry.od_pairs.values() {
            for unit in registry.units_for(od_pair) {
                let Some(vehicle) = unit.as_vehicle() else {
                    continue;
                };
                for generation in unit.generations(&registry.temporal, year) {
                    keys.push(StockKey {
                        year,
                        od_pair: od_pair.id.clone(),
                        vehicle: vehicle.id.clone(),
                        generation,
                    });
                }
            }
        }
    }

    keys
}

/// The (infrastructure, node) combinations where fueling capacity can be built.
///
/// These are the intermediate nodes of paths used by a vehicle which runs on the
/// infrastructure's fuel.
pub fn fueling_sites(registry: &EntityRegistry) -> IndexSet<(InfrastructureID, NodeID)> {
    let mut sites = IndexSet::new();
    for od_pair in registry.od_pairs.values() {
        for vehicle in registry.vehicles_for(od_pair) {
            for path in &od_pair.paths {
                for node in &path.nodes[1..path.num_nodes() - 1] {
                    for infrastructure in registry.infrastructures_for(vehicle) {
                        sites.insert((infrastructure.id.clone(), node.id.clone()));
                    }
                }
            }
        }
    }

    sites
}

/// The (mode, node) combinations where infrastructure limits a levelized mode.
///
/// Every node a path arrives at (i.e. all but the origin) is included.
pub fn mode_sites(registry: &EntityRegistry) -> IndexSet<(ModeID, NodeID)> {
    let mut sites = IndexSet::new();
    for mode in registry.modes.values() {
        if !(mode.is_levelized() && mode.infrastructure_limited) {
            continue;
        }

        for od_pair in registry.od_pairs.values() {
            for path in &od_pair.paths {
                for node in &path.nodes[1..] {
                    sites.insert((mode.id.clone(), node.id.clone()));
                }
            }
        }
    }

    sites
}

/// The handles of every decision variable in the problem
#[derive(Debug, Default)]
pub struct Variables {
    pub flow: VariableMap<FlowKey>,
    pub stock_total: VariableMap<StockKey>,
    pub stock_existing: VariableMap<StockKey>,
    pub stock_added: VariableMap<StockKey>,
    pub stock_removed: VariableMap<StockKey>,
    pub energy_drawn: VariableMap<EnergyKey>,
    pub state_of_charge: VariableMap<RouteNodeKey>,
    pub travel_time: VariableMap<RouteNodeKey>,
    pub break_time: VariableMap<RouteNodeKey>,
    pub fueling_capacity_added: VariableMap<FuelingCapacityKey>,
    pub mode_capacity_added: VariableMap<ModeCapacityKey>,
}

/// Add every decision variable to the problem.
///
/// All variables are non-negative. If the model asks for integer stock, the total and added
/// vehicle stock variables are integer.
pub fn add_variables(problem: &mut Problem, registry: &EntityRegistry) -> Variables {
    let mut variables = Variables::default();
    let integer_stock = registry.parameters.integer_stock;

    for option in flow_options(registry) {
        let var = problem.add_variable(VariableFamily::Flow, 0.0.., false);
        variables.flow.insert(option.key(), var);
    }

    for key in stock_keys(registry) {
        let total = problem.add_variable(VariableFamily::StockTotal, 0.0.., integer_stock);
        if key.generation == key.year {
            let added = problem.add_variable(VariableFamily::StockAdded, 0.0.., integer_stock);
            variables.stock_added.insert(key.clone(), added);
        } else {
            let existing = problem.add_variable(VariableFamily::StockExisting, 0.0.., false);
            let removed = problem.add_variable(VariableFamily::StockRemoved, 0.0.., false);
            variables.stock_existing.insert(key.clone(), existing);
            variables.stock_removed.insert(key.clone(), removed);
        }
        variables.stock_total.insert(key, total);
    }

    for route in routes(registry) {
        let route_key = route.key();
        for node_index in 0..route.path.num_nodes() {
            let key = RouteNodeKey {
                route: route_key.clone(),
                node_index,
            };
            let soc = problem.add_variable(VariableFamily::StateOfCharge, 0.0.., false);
            let time = problem.add_variable(VariableFamily::TravelTime, 0.0.., false);
            variables.state_of_charge.insert(key.clone(), soc);
            variables.travel_time.insert(key.clone(), time);
            if node_index > 0 {
                let rest = problem.add_variable(VariableFamily::BreakTime, 0.0.., false);
                variables.break_time.insert(key, rest);
            }
        }

        for node_index in route.fueling_indexes() {
            for infrastructure in registry.infrastructures_for(&route.vehicle) {
                let key = EnergyKey {
                    route: route_key.clone(),
                    node_index,
                    infrastructure: infrastructure.id.clone(),
                };
                let var = problem.add_variable(VariableFamily::EnergyDrawn, 0.0.., false);
                variables.energy_drawn.insert(key, var);
            }
        }
    }

    let fueling_sites = fueling_sites(registry);
    let mode_sites = mode_sites(registry);
    for &year in registry.temporal.investment_years() {
        for (infrastructure, node) in &fueling_sites {
            let key = FuelingCapacityKey {
                year,
                infrastructure: infrastructure.clone(),
                node: node.clone(),
            };
            let var = problem.add_variable(VariableFamily::FuelingCapacityAdded, 0.0.., false);
            variables.fueling_capacity_added.insert(key, var);
        }

        for (mode, node) in &mode_sites {
            let key = ModeCapacityKey {
                year,
                mode: mode.clone(),
                node: node.clone(),
            };
            let var = problem.add_variable(VariableFamily::ModeCapacityAdded, 0.0.., false);
            variables.mode_capacity_added.insert(key, var);
        }
    }

    variables
}
