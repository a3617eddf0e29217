//! The entity registry: every loaded entity, held read-only while the optimisation is built.
use crate::fuel::{FuelMap, FuelingInfrastructure, InfrastructureID, InfrastructureMap};
use crate::mode::{Mode, ModeID, ModeMap};
use crate::model::ModelParameters;
use crate::network::{
    DrivingRules, MandatoryBreak, NodeID, NodeMap, Path, PathID, PathMap, mandatory_breaks,
};
use crate::od_pair::{FinancialStatusID, FinancialStatusMap, OdPair, OdPairID, OdPairMap};
use crate::temporal::TemporalIndex;
use crate::unit::CostBearingUnit;
use crate::vehicle::{TechVehicle, TechVehicleID, TechVehicleMap, VehicleGroup};
use indexmap::IndexMap;
use itertools::Itertools;
use log::warn;
use std::path::PathBuf;
use std::rc::Rc;

/// Vehicles already in service at the start of the horizon, keyed by OD pair, tech vehicle and
/// year of purchase
pub type InitialVehicleStockMap = IndexMap<(OdPairID, TechVehicleID, u32), f64>;

/// Installed fueling infrastructure capacity (kW) at the start of the horizon
pub type InitialFuelingCapacityMap = IndexMap<(InfrastructureID, NodeID), f64>;

/// Installed mode infrastructure capacity (tkm/year) at the start of the horizon
pub type InitialModeCapacityMap = IndexMap<(ModeID, NodeID), f64>;

/// Emission limits (tCO2/year), keyed by the modeled year they apply at
pub type EmissionLimitMap = IndexMap<u32, f64>;

/// Emission limits (tCO2/year) on a single mode, keyed by mode and modeled year
pub type ModeEmissionLimitMap = IndexMap<(ModeID, u32), f64>;

/// Carbon prices (€/tCO2) at nodes, keyed by node and calendar year
pub type CarbonPriceMap = IndexMap<(NodeID, u32), f64>;

/// Annual budgets (€/year) for buying vehicles on each OD pair of a shipper class, keyed by
/// shipper class and modeled year
pub type PurchaseBudgetMap = IndexMap<(FinancialStatusID, u32), f64>;

/// The mandatory breaks for each combination of path and fleet vehicle
pub type BreakMap = IndexMap<(PathID, TechVehicleID), Vec<MandatoryBreak>>;

/// Lower and upper bounds on a mode's share of tonne-km in one modeled year
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShareBounds {
    /// The smallest share allowed, if any
    pub min: Option<f64>,
    /// The largest share allowed, if any
    pub max: Option<f64>,
}

/// A user-supplied limit on a mode's share of total tonne-km
#[derive(Debug, Clone, PartialEq)]
pub struct ModeShareLimit {
    /// The mode being limited
    pub mode: Rc<Mode>,
    /// The calendar years the limit applies in
    pub years: Vec<u32>,
    /// Minimum share (fraction)
    pub min_share: Option<f64>,
    /// Maximum share (fraction)
    pub max_share: Option<f64>,
}

/// The years over which a market share limit is counted
#[derive(Debug, Clone, PartialEq)]
pub enum SharePeriod {
    /// Separately in each of these modeled years
    Years(Vec<u32>),
    /// Once, over purchases in every modeled year
    Horizon,
}

/// A user-supplied limit on the share of newly bought vehicles belonging to a group.
///
/// The share is counted against all new vehicles on the modes the group's vehicles run on.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketShareLimit {
    /// The vehicles being limited
    pub group: VehicleGroup,
    /// When the limit applies
    pub period: SharePeriod,
    /// Minimum share (fraction)
    pub min_share: Option<f64>,
    /// Maximum share (fraction)
    pub max_share: Option<f64>,
}

/// All entities in a model
#[derive(Debug)]
pub struct EntityRegistry {
    /// Path to the model folder
    pub model_path: PathBuf,
    /// Parameters from `model.toml`
    pub parameters: ModelParameters,
    /// The years at which variables are defined
    pub temporal: TemporalIndex,
    /// Network nodes
    pub nodes: NodeMap,
    /// Candidate paths
    pub paths: PathMap,
    /// Shipper classes
    pub financial_statuses: FinancialStatusMap,
    /// Origin-destination pairs
    pub od_pairs: OdPairMap,
    /// Transport modes
    pub modes: ModeMap,
    /// Fuels
    pub fuels: FuelMap,
    /// Fueling infrastructure types
    pub infrastructures: InfrastructureMap,
    /// Tech vehicles
    pub tech_vehicles: TechVehicleMap,
    /// Vehicle stock at the start of the horizon
    pub initial_vehicle_stock: InitialVehicleStockMap,
    /// Fueling infrastructure at the start of the horizon
    pub initial_fueling_infrastructure: InitialFuelingCapacityMap,
    /// Mode infrastructure at the start of the horizon
    pub initial_mode_infrastructure: InitialModeCapacityMap,
    /// Limits on mode shares
    pub mode_share_limits: Vec<ModeShareLimit>,
    /// Limits on the share of new vehicles
    pub market_share_limits: Vec<MarketShareLimit>,
    /// Limits on annual emissions
    pub emission_limits: EmissionLimitMap,
    /// Limits on annual emissions of single modes
    pub mode_emission_limits: ModeEmissionLimitMap,
    /// Carbon prices at nodes
    pub carbon_prices: CarbonPriceMap,
    /// Budgets for vehicle purchases
    pub purchase_budgets: PurchaseBudgetMap,
    /// Precomputed mandatory breaks
    pub breaks: BreakMap,
}

/// Compute the mandatory breaks for every path a fleet vehicle could take.
///
/// Only combinations where the vehicle serves the product of an OD pair using the path are
/// included.
pub fn compute_mandatory_breaks(
    od_pairs: &OdPairMap,
    tech_vehicles: &TechVehicleMap,
    rules: &DrivingRules,
) -> BreakMap {
    let mut breaks = BreakMap::new();
    for od_pair in od_pairs.values() {
        for vehicle in tech_vehicles.values() {
            if vehicle.product != od_pair.product {
                continue;
            }

            for path in &od_pair.paths {
                breaks
                    .entry((path.id.clone(), vehicle.id.clone()))
                    .or_insert_with(|| mandatory_breaks(path, vehicle.speed, rules));
            }
        }
    }

    breaks
}

impl EntityRegistry {
    /// Iterate over every transport option: fleet vehicles first, then levelized modes
    pub fn units(&self) -> impl Iterator<Item = CostBearingUnit> + '_ {
        let vehicles = self
            .tech_vehicles
            .values()
            .map(|vehicle| CostBearingUnit::Vehicle(Rc::clone(vehicle)));
        let levelized = self
            .modes
            .values()
            .filter(|mode| mode.is_levelized())
            .map(|mode| CostBearingUnit::Levelized(Rc::clone(mode)));

        vehicles.chain(levelized)
    }

    /// Iterate over the transport options which can carry freight for the given OD pair
    pub fn units_for<'a>(
        &'a self,
        od_pair: &'a OdPair,
    ) -> impl Iterator<Item = CostBearingUnit> + 'a {
        self.units()
            .filter(move |unit| unit.serves(&od_pair.product))
    }

    /// Iterate over the fleet vehicles which can carry freight for the given OD pair
    pub fn vehicles_for<'a>(
        &'a self,
        od_pair: &'a OdPair,
    ) -> impl Iterator<Item = &'a Rc<TechVehicle>> + 'a {
        self.tech_vehicles
            .values()
            .filter(move |vehicle| vehicle.product == od_pair.product)
    }

    /// Iterate over the infrastructure types the given vehicle can fuel at
    pub fn infrastructures_for<'a>(
        &'a self,
        vehicle: &'a TechVehicle,
    ) -> impl Iterator<Item = &'a Rc<FuelingInfrastructure>> + 'a {
        self.infrastructures
            .values()
            .filter(move |infrastructure| vehicle.can_use(infrastructure))
    }

    /// The mandatory breaks for a vehicle travelling along a path
    pub fn breaks(&self, path_id: &PathID, vehicle_id: &TechVehicleID) -> &[MandatoryBreak] {
        self.breaks
            .get(&(path_id.clone(), vehicle_id.clone()))
            .map_or(&[], Vec::as_slice)
    }

    /// The number of vehicles of generation `generation` on `od_pair` at the start of the horizon
    pub fn initial_stock(&self, od_pair: &OdPairID, vehicle: &TechVehicleID, generation: u32) -> f64 {
        self.initial_vehicle_stock
            .get(&(od_pair.clone(), vehicle.clone(), generation))
            .copied()
            .unwrap_or(0.0)
    }

    /// Installed fueling capacity (kW) at the start of the horizon
    pub fn initial_fueling_capacity(&self, infrastructure: &InfrastructureID, node: &NodeID) -> f64 {
        self.initial_fueling_infrastructure
            .get(&(infrastructure.clone(), node.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Installed mode infrastructure capacity (tkm/year) at the start of the horizon
    pub fn initial_mode_capacity(&self, mode: &ModeID, node: &NodeID) -> f64 {
        self.initial_mode_infrastructure
            .get(&(mode.clone(), node.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// The mode share bounds to apply at each modeled year.
    ///
    /// Limits are given for calendar years and applied at the modeled year representing them. When
    /// several limits fall on the same modeled year, the strictest bound wins.
    pub fn mode_share_bounds(&self) -> IndexMap<(ModeID, u32), ShareBounds> {
        let mut bounds: IndexMap<(ModeID, u32), ShareBounds> = IndexMap::new();
        if !self.parameters.enforce_modal_share {
            return bounds;
        }

        for limit in &self.mode_share_limits {
            for &year in &limit.years {
                let Some(modeled_year) = self.temporal.representative_year(year) else {
                    continue;
                };
                let entry = bounds
                    .entry((limit.mode.id.clone(), modeled_year))
                    .or_default();
                if let Some(max) = limit.max_share {
                    entry.max = Some(entry.max.map_or(max, |current| current.min(max)));
                }
                if let Some(min) = limit.min_share {
                    entry.min = Some(entry.min.map_or(min, |current| current.max(min)));
                }
            }
        }

        for ((mode_id, year), bound) in &bounds {
            if let (Some(min), Some(max)) = (bound.min, bound.max) {
                if min > max {
                    warn!(
                        "Mode {mode_id} has a minimum share ({min}) above its maximum share \
                        ({max}) in {year}; the model will be infeasible"
                    );
                }
            }
        }

        bounds
    }

    /// The emission limit (tCO2) for the period represented by modeled year `year`, if any.
    ///
    /// The limit is the annual limit applied at `year` multiplied by the period length.
    pub fn period_emission_limit(&self, year: u32) -> Option<f64> {
        self.emission_limits
            .get(&year)
            .map(|limit| limit * f64::from(self.temporal.period_length(year)))
    }

    /// The emission limit (tCO2) on one mode for the period represented by `year`, if any
    pub fn period_mode_emission_limit(&self, mode: &ModeID, year: u32) -> Option<f64> {
        self.mode_emission_limits
            .get(&(mode.clone(), year))
            .map(|limit| limit * f64::from(self.temporal.period_length(year)))
    }

    /// The vehicle purchase budget (€) per OD pair of a shipper class for the period represented
    /// by `year`, if any
    pub fn period_purchase_budget(&self, status: &FinancialStatusID, year: u32) -> Option<f64> {
        self.purchase_budgets
            .get(&(status.clone(), year))
            .map(|budget| budget * f64::from(self.temporal.period_length(year)))
    }

    /// The carbon price (€/tCO2) for freight carried along `path` in modeled year `year`.
    ///
    /// This is the mean of the prices at the path's nodes over the calendar years the modeled year
    /// represents. Nodes without a price count as zero.
    pub fn path_carbon_price(&self, path: &Path, year: u32) -> f64 {
        if self.carbon_prices.is_empty() {
            return 0.0;
        }

        let years = self.temporal.represented_years(year);
        let count = (path.nodes.len() * years.clone().count()) as f64;
        let total: f64 = path
            .nodes
            .iter()
            .cartesian_product(years)
            .filter_map(|(node, year)| self.carbon_prices.get(&(node.id.clone(), year)))
            .sum();

        total / count
    }
}
