//! Cost-bearing units: the transport options which freight can be assigned to.
//!
//! Every loop over "all the ways freight could travel" goes through [`CostBearingUnit`], so fleet
//! vehicles and levelized modes are treated uniformly wherever possible.
use crate::mode::{Mode, ModeID};
use crate::od_pair::ProductID;
use crate::temporal::TemporalIndex;
use crate::vehicle::{TechVehicle, TechVehicleID};
use std::fmt;
use std::rc::Rc;

/// A transport option which carries freight and incurs costs
#[derive(Debug, Clone, PartialEq)]
pub enum CostBearingUnit {
    /// A tech vehicle on a fleet-quantified mode
    Vehicle(Rc<TechVehicle>),
    /// A levelized mode, charged per tonne-km with no fleet
    Levelized(Rc<Mode>),
}

/// Identifies a [`CostBearingUnit`] in variable keys and output files
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitID {
    /// ID of a tech vehicle
    Vehicle(TechVehicleID),
    /// ID of a levelized mode
    Levelized(ModeID),
}

impl UnitID {
    /// A short description of what kind of unit this is, for output files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vehicle(_) => "tech_vehicle",
            Self::Levelized(_) => "mode",
        }
    }
}

impl fmt::Display for UnitID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vehicle(id) => write!(f, "{id}"),
            Self::Levelized(id) => write!(f, "{id}"),
        }
    }
}

impl CostBearingUnit {
    /// The unit's ID
    pub fn id(&self) -> UnitID {
        match self {
            Self::Vehicle(vehicle) => UnitID::Vehicle(vehicle.id.clone()),
            Self::Levelized(mode) => UnitID::Levelized(mode.id.clone()),
        }
    }

    /// The mode the unit belongs to
    pub fn mode(&self) -> &Rc<Mode> {
        match self {
            Self::Vehicle(vehicle) => &vehicle.mode,
            Self::Levelized(mode) => mode,
        }
    }

    /// The tech vehicle, if this is a fleet unit
    pub fn as_vehicle(&self) -> Option<&Rc<TechVehicle>> {
        match self {
            Self::Vehicle(vehicle) => Some(vehicle),
            Self::Levelized(_) => None,
        }
    }

    /// Whether the unit can carry the given product
    pub fn serves(&self, product: &ProductID) -> bool {
        match self {
            Self::Vehicle(vehicle) => vehicle.product == *product,
            Self::Levelized(_) => true,
        }
    }

    /// The generations which can carry freight in modeled year `year`.
    ///
    /// For fleet units this is every modeled generation no later than `year`. Levelized units have
    /// no vintages, so their single "generation" is the year itself.
    pub fn generations(&self, temporal: &TemporalIndex, year: u32) -> Vec<u32> {
        match self {
            Self::Vehicle(_) => temporal.generations_up_to(year).collect(),
            Self::Levelized(_) => vec![year],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{registry, temporal_config};
    use crate::registry::EntityRegistry;
    use crate::temporal::TemporalConfig;
    use rstest::rstest;

    #[rstest]
    fn test_generations_never_exceed_year(registry: EntityRegistry) {
        let temporal = &registry.temporal;
        for unit in registry.units() {
            for &year in temporal.modeled_years() {
                let generations = unit.generations(temporal, year);
                assert!(!generations.is_empty());
                assert!(generations.iter().all(|generation| *generation <= year));
                if unit.as_vehicle().is_none() {
                    assert_eq!(generations, [year]);
                }
            }
        }
    }

    #[rstest]
    fn test_generations_with_time_step(temporal_config: TemporalConfig, registry: EntityRegistry) {
        let config = TemporalConfig {
            time_step: 2,
            ..temporal_config
        };
        let temporal = TemporalIndex::new(&config).unwrap();
        let truck = registry.units().next().unwrap();
        assert_eq!(truck.generations(&temporal, 2022), [2016, 2018, 2020, 2022]);
    }
}
