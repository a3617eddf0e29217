//! Transport modes (road, rail, etc.).
//!
//! A mode is either *fleet-quantified*, in which case freight is carried by explicitly modelled
//! tech vehicles whose stock is tracked, or *levelized*, in which case freight is charged at a
//! per-tonne-km rate and no fleet is modelled.
use crate::id::{define_id_getter, define_id_type};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

define_id_type! {ModeID}

/// A map of [`Mode`]s, keyed by mode ID
pub type ModeMap = IndexMap<ModeID, Rc<Mode>>;

/// Mode parameters for every calendar year
pub type ModeParameterMap = HashMap<u32, ModeParameter>;

/// A transport mode
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    /// Unique identifier
    pub id: ModeID,
    /// Human-readable name
    pub name: String,
    /// Whether freight on this mode is carried by a modelled vehicle fleet
    pub quantify_by_vehicles: bool,
    /// Whether tonne-km carried by this (levelized) mode is limited by installed node capacity
    pub infrastructure_limited: bool,
    /// Annual parameters
    pub parameters: ModeParameterMap,
}
define_id_getter! {Mode, ModeID}

/// Cost and performance data for a mode in a given year
#[derive(Debug, Clone, PartialEq)]
pub struct ModeParameter {
    /// Levelized cost per tonne-km (€/tkm). Only used for levelized modes.
    pub cost_per_ukm: f64,
    /// Emissions per tonne-km (gCO2/tkm). Only used for levelized modes.
    pub emission_factor: f64,
    /// Time freight waits at terminals per trip (hours)
    pub waiting_time: f64,
    /// Cost of one tkm/year of additional infrastructure capacity at a node (€)
    pub infrastructure_expansion_cost: f64,
    /// Annual cost of maintaining one tkm/year of infrastructure capacity (€)
    pub infrastructure_om_cost: f64,
}

impl Mode {
    /// Whether this mode is levelized (i.e. not modelled with a vehicle fleet)
    pub fn is_levelized(&self) -> bool {
        !self.quantify_by_vehicles
    }

    /// The parameters for the given calendar year.
    ///
    /// Parameters are checked to cover every year of the horizon when loaded.
    pub fn parameter(&self, year: u32) -> &ModeParameter {
        self.parameters
            .get(&year)
            .unwrap_or_else(|| panic!("No parameters for mode {} in {year}", self.id))
    }
}
