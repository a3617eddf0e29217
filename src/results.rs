//! Reading results out of a solved pathway problem.
use crate::fuel::InfrastructureID;
use crate::mode::ModeID;
use crate::network::NodeID;
use crate::optimisation::constraints::emissions_per_flow;
use crate::optimisation::objective::CostComponent;
use crate::optimisation::variables::{
    FuelingCapacityKey, ModeCapacityKey, VariableMap, Variables, flow_options, fueling_sites,
    mode_sites,
};
use crate::optimisation::{PathwayProblem, SolveStatus, SolverOutcome};
use crate::registry::EntityRegistry;
use indexmap::IndexMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Installed infrastructure capacity at a site in a modeled year
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledCapacity<S> {
    /// The modeled year
    pub year: u32,
    /// Where the capacity is, e.g. (infrastructure, node)
    pub site: S,
    /// Capacity built in this year (zero if it is not an investment year)
    pub added: f64,
    /// Capacity available in this year, including the initial capacity
    pub total: f64,
}

/// The solution to a pathway problem
pub struct Solution<'a> {
    registry: &'a EntityRegistry,
    pathway: PathwayProblem,
    outcome: SolverOutcome,
}

impl<'a> Solution<'a> {
    /// Pair a solver outcome with the problem it solves
    pub fn new(registry: &'a EntityRegistry, pathway: PathwayProblem, outcome: SolverOutcome) -> Self {
        Self {
            registry,
            pathway,
            outcome,
        }
    }

    /// How the solve finished
    pub fn status(&self) -> SolveStatus {
        self.outcome.status
    }

    /// Total discounted system cost
    pub fn objective(&self) -> f64 {
        self.outcome.objective
    }

    /// The model which was solved
    pub fn registry(&self) -> &'a EntityRegistry {
        self.registry
    }

    /// The problem's variables
    pub fn variables(&self) -> &Variables {
        &self.pathway.variables
    }

    /// The number of variables and constraints in the problem
    pub fn problem_size(&self) -> (usize, usize) {
        (
            self.pathway.problem.num_variables(),
            self.pathway.problem.num_rows(),
        )
    }

    /// Iterate over the keys of one variable family along with their values
    pub fn values<'b, K>(&'b self, map: &'b VariableMap<K>) -> impl Iterator<Item = (&'b K, f64)>
    where
        K: Eq + Hash + Debug,
    {
        map.iter().map(|(key, var)| (key, self.outcome.value(var)))
    }

    /// Fueling capacity (kW) at every site where it can be built, for every modeled year
    pub fn fueling_capacity(&self) -> Vec<InstalledCapacity<(InfrastructureID, NodeID)>> {
        let added = &self.pathway.variables.fueling_capacity_added;
        let mut capacities = Vec::new();
        for (infrastructure, node) in fueling_sites(self.registry) {
            let mut total = self.registry.initial_fueling_capacity(&infrastructure, &node);
            for &year in self.registry.temporal.modeled_years() {
                let key = FuelingCapacityKey {
                    year,
                    infrastructure: infrastructure.clone(),
                    node: node.clone(),
                };
                let added = added.try_get(&key).map_or(0.0, |var| self.outcome.value(var));
                total += added;
                capacities.push(InstalledCapacity {
                    year,
                    site: (infrastructure.clone(), node.clone()),
                    added,
                    total,
                });
            }
        }

        capacities
    }

    /// Mode infrastructure capacity (tkm/year) at every site where it limits a mode, for every
    /// modeled year
    pub fn mode_capacity(&self) -> Vec<InstalledCapacity<(ModeID, NodeID)>> {
        let added = &self.pathway.variables.mode_capacity_added;
        let mut capacities = Vec::new();
        for (mode, node) in mode_sites(self.registry) {
            let mut total = self.registry.initial_mode_capacity(&mode, &node);
            for &year in self.registry.temporal.modeled_years() {
                let key = ModeCapacityKey {
                    year,
                    mode: mode.clone(),
                    node: node.clone(),
                };
                let added = added.try_get(&key).map_or(0.0, |var| self.outcome.value(var));
                total += added;
                capacities.push(InstalledCapacity {
                    year,
                    site: (mode.clone(), node.clone()),
                    added,
                    total,
                });
            }
        }

        capacities
    }

    /// Discounted costs for each modeled year and cost component
    pub fn costs(&self) -> IndexMap<(u32, CostComponent), f64> {
        self.pathway.costs.totals(|var| self.outcome.value(var))
    }

    /// Annual tonne-km carried by each mode in each modeled year
    pub fn mode_tonne_km(&self) -> IndexMap<(u32, ModeID), f64> {
        let mut tonne_km = IndexMap::new();
        for &year in self.registry.temporal.modeled_years() {
            for mode_id in self.registry.modes.keys() {
                tonne_km.insert((year, mode_id.clone()), 0.0);
            }
        }

        let temporal = &self.registry.temporal;
        for option in flow_options(self.registry) {
            let flow = self.outcome.value(self.pathway.variables.flow.get(&option.key()));
            let key = (option.year, option.unit.mode().id.clone());
            let period_length = temporal.period_length(option.year);
            *tonne_km.entry(key).or_default() +=
                1000.0 * flow * option.distance_per_year(period_length);
        }

        tonne_km
    }

    /// Annual emissions (tCO2) in each modeled year
    pub fn emissions(&self) -> IndexMap<u32, f64> {
        let temporal = &self.registry.temporal;
        let mut emissions: IndexMap<u32, f64> = temporal
            .modeled_years()
            .iter()
            .map(|year| (*year, 0.0))
            .collect();
        for option in flow_options(self.registry) {
            let flow = self.outcome.value(self.pathway.variables.flow.get(&option.key()));
            let period_length = f64::from(temporal.period_length(option.year));
            *emissions.entry(option.year).or_default() +=
                flow * emissions_per_flow(&option) / period_length;
        }

        emissions
    }
}
