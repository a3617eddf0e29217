//! Tech vehicles: a combination of drivetrain technology and vehicle type, operated on a
//! fleet-quantified mode.
use crate::fuel::{Fuel, FuelingInfrastructure};
use crate::id::{define_id_getter, define_id_type};
use crate::mode::Mode;
use crate::od_pair::ProductID;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

define_id_type! {TechVehicleID}

/// A map of [`TechVehicle`]s, keyed by ID
pub type TechVehicleMap = IndexMap<TechVehicleID, Rc<TechVehicle>>;

/// Vehicle parameters for every purchase generation
pub type TechVehicleParameterMap = HashMap<u32, TechVehicleParameter>;

/// A vehicle technology (e.g. battery-electric truck)
#[derive(Debug, Clone, PartialEq)]
pub struct TechVehicle {
    /// Unique identifier
    pub id: TechVehicleID,
    /// Human-readable name
    pub name: String,
    /// The mode this vehicle operates on. Always fleet-quantified.
    pub mode: Rc<Mode>,
    /// The fuel the vehicle runs on
    pub fuel: Rc<Fuel>,
    /// The product the vehicle can carry
    pub product: ProductID,
    /// Drivetrain technology (e.g. battery-electric). Vehicles of different types may share one.
    pub technology: String,
    /// Vehicle type (e.g. long-haul truck). Vehicles with different technologies may share one.
    pub vehicle_type: String,
    /// Average travel speed (km/h)
    pub speed: f64,
    /// Parameters for each purchase generation
    pub parameters: TechVehicleParameterMap,
}
define_id_getter! {TechVehicle, TechVehicleID}

/// Properties of vehicles bought in a given generation
#[derive(Debug, Clone, PartialEq)]
pub struct TechVehicleParameter {
    /// Purchase price (€)
    pub capital_cost: f64,
    /// Annual maintenance cost per vehicle (€/year)
    pub maintenance_annual: f64,
    /// Maintenance cost per vehicle-km (€/vkm)
    pub maintenance_distance: f64,
    /// Load carried per trip (tonnes)
    pub payload: f64,
    /// Distance driven per vehicle per year (km)
    pub annual_range: f64,
    /// Energy use per km (kWh/km)
    pub spec_consumption: f64,
    /// Usable tank or battery capacity (kWh)
    pub tank_capacity: f64,
    /// Maximum power the vehicle can take when fueling (kW)
    pub peak_fueling: f64,
    /// Years a vehicle stays in service
    pub lifetime: u32,
    /// Purchase subsidy per vehicle (€)
    pub subsidy: f64,
}

impl TechVehicle {
    /// The parameters for the given purchase generation.
    ///
    /// Parameters are checked to cover every generation when loaded.
    pub fn parameter(&self, generation: u32) -> &TechVehicleParameter {
        self.parameters.get(&generation).unwrap_or_else(|| {
            panic!(
                "No parameters for tech vehicle {} in generation {generation}",
                self.id
            )
        })
    }

    /// Whether the vehicle can refuel at the given type of infrastructure
    pub fn can_use(&self, infrastructure: &FuelingInfrastructure) -> bool {
        infrastructure.fuel.id == self.fuel.id
    }
}

/// A set of tech vehicles which a market share limit applies to
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleGroup {
    /// A single tech vehicle
    TechVehicle(TechVehicleID),
    /// Every tech vehicle with this technology
    Technology(String),
    /// Every tech vehicle of this type
    VehicleType(String),
}

impl VehicleGroup {
    /// Whether `vehicle` belongs to the group
    pub fn contains(&self, vehicle: &TechVehicle) -> bool {
        match self {
            Self::TechVehicle(id) => vehicle.id == *id,
            Self::Technology(technology) => vehicle.technology == *technology,
            Self::VehicleType(vehicle_type) => vehicle.vehicle_type == *vehicle_type,
        }
    }
}

impl fmt::Display for VehicleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TechVehicle(id) => write!(f, "tech vehicle {id}"),
            Self::Technology(technology) => write!(f, "technology {technology}"),
            Self::VehicleType(vehicle_type) => write!(f, "vehicle type {vehicle_type}"),
        }
    }
}

impl TechVehicleParameter {
    /// The number of vehicles needed to carry `annual_flow` kt per year along a path of
    /// `path_length` km.
    ///
    /// This is the only place fleet size is derived from flow.
    pub fn vehicles_required(&self, path_length: f64, annual_flow: f64) -> f64 {
        path_length * annual_flow * 1000.0 / (self.payload * self.annual_range)
    }

    /// The number of trips needed to carry `flow` kt
    pub fn trips(&self, flow: f64) -> f64 {
        flow * 1000.0 / self.payload
    }

    /// Power at which this vehicle charges at the given infrastructure (kW)
    pub fn charging_power(&self, infrastructure: &FuelingInfrastructure) -> f64 {
        self.peak_fueling.min(infrastructure.fueling_power)
    }

    /// Energy needed to drive `distance` km (kWh)
    pub fn energy_for(&self, distance: f64) -> f64 {
        distance * self.spec_consumption
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{charger, registry, vehicle_parameter};
    use crate::registry::EntityRegistry;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_vehicles_required(vehicle_parameter: TechVehicleParameter) {
        // 25 t payload, 100,000 km a year
        assert_approx_eq!(
            f64,
            vehicle_parameter.vehicles_required(500.0, 10.0),
            500.0 * 10.0 * 1000.0 / (25.0 * 100_000.0)
        );
        assert_approx_eq!(f64, vehicle_parameter.trips(10.0), 400.0);
    }

    #[rstest]
    fn test_charging_power(
        mut vehicle_parameter: TechVehicleParameter,
        charger: FuelingInfrastructure,
    ) {
        vehicle_parameter.peak_fueling = 350.0;
        assert_approx_eq!(f64, vehicle_parameter.charging_power(&charger), 150.0);
        vehicle_parameter.peak_fueling = 100.0;
        assert_approx_eq!(f64, vehicle_parameter.charging_power(&charger), 100.0);
    }

    #[rstest]
    fn test_vehicle_group_contains(registry: EntityRegistry) {
        let bev = &registry.tech_vehicles["bev"];
        let diesel = &registry.tech_vehicles["diesel"];

        let group = VehicleGroup::TechVehicle("bev".into());
        assert!(group.contains(bev) && !group.contains(diesel));
        let group = VehicleGroup::Technology("battery_electric".into());
        assert!(group.contains(bev) && !group.contains(diesel));
        let group = VehicleGroup::VehicleType("truck".into());
        assert!(group.contains(bev) && group.contains(diesel));
        assert_eq!(group.to_string(), "vehicle type truck");
    }
}
