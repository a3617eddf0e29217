//! Fuels and the fueling infrastructure which dispenses them.
use crate::id::{define_id_getter, define_id_type};
use crate::year::YearSeries;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

define_id_type! {FuelID}
define_id_type! {InfrastructureID}

/// A map of [`Fuel`]s, keyed by fuel ID
pub type FuelMap = IndexMap<FuelID, Rc<Fuel>>;

/// A map of [`FuelingInfrastructure`] types, keyed by ID
pub type InfrastructureMap = IndexMap<InfrastructureID, Rc<FuelingInfrastructure>>;

/// An energy carrier used by vehicles (e.g. diesel, electricity)
#[derive(Debug, PartialEq)]
pub struct Fuel {
    /// Unique identifier
    pub id: FuelID,
    /// Human-readable name
    pub name: String,
    /// Emissions per kWh of energy used (gCO2/kWh)
    pub emission_factor: f64,
    /// Price of energy for every calendar year (€/kWh)
    pub cost_per_kwh: YearSeries,
}
define_id_getter! {Fuel, FuelID}

/// A type of refueling or recharging station
#[derive(Debug, PartialEq)]
pub struct FuelingInfrastructure {
    /// Unique identifier
    pub id: InfrastructureID,
    /// The fuel dispensed
    pub fuel: Rc<Fuel>,
    /// Dispensing power of one charging point (kW)
    pub fueling_power: f64,
    /// Fraction of the year installed capacity can be in use
    pub max_occupancy: f64,
    /// Costs for every calendar year
    pub costs: HashMap<u32, InfrastructureCost>,
}
define_id_getter! {FuelingInfrastructure, InfrastructureID}

/// Costs for a fueling infrastructure type in a given year
#[derive(Debug, Clone, PartialEq)]
pub struct InfrastructureCost {
    /// Capital cost of one kW of installed capacity (€/kW)
    pub cost_per_kw: f64,
    /// Cost of dispensing one kWh, on top of the energy price (€/kWh)
    pub cost_per_kwh: f64,
    /// Annual operation and maintenance cost (€/kW/year)
    pub om_cost: f64,
}

/// Hours in a year, used to turn installed kW into dispensable kWh
pub const HOURS_PER_YEAR: f64 = 8760.0;

impl FuelingInfrastructure {
    /// The costs for the given calendar year.
    ///
    /// Costs are checked to cover every year of the horizon when loaded.
    pub fn cost(&self, year: u32) -> &InfrastructureCost {
        self.costs
            .get(&year)
            .unwrap_or_else(|| panic!("No costs for infrastructure {} in {year}", self.id))
    }

    /// The energy (kWh) one kW of installed capacity can dispense in a year
    pub fn annual_energy_per_kw(&self) -> f64 {
        HOURS_PER_YEAR * self.max_occupancy
    }
}
