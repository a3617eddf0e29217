//! Origin-destination pairs: the freight demand the model must serve.
use crate::id::{define_id_getter, define_id_type};
use crate::network::{Node, Path};
use crate::year::YearSeries;
use indexmap::IndexMap;
use serde::Deserialize;
use std::rc::Rc;

define_id_type! {OdPairID}
define_id_type! {FinancialStatusID}
define_id_type! {ProductID}

/// A map of [`OdPair`]s, keyed by OD pair ID
pub type OdPairMap = IndexMap<OdPairID, Rc<OdPair>>;

/// A map of [`FinancialStatus`]es, keyed by ID
pub type FinancialStatusMap = IndexMap<FinancialStatusID, Rc<FinancialStatus>>;

/// A class of shipper, which determines how much they value time spent in transit
#[derive(Debug, Deserialize, PartialEq)]
pub struct FinancialStatus {
    /// Unique identifier
    pub id: FinancialStatusID,
    /// Human-readable name
    pub name: String,
    /// Value of time (€ per tonne-hour)
    pub value_of_time: f64,
}
define_id_getter! {FinancialStatus, FinancialStatusID}

/// Freight demand for one product between an origin and a destination
#[derive(Debug, PartialEq)]
pub struct OdPair {
    /// Unique identifier
    pub id: OdPairID,
    /// Where the freight starts
    pub origin: Rc<Node>,
    /// Where the freight ends up
    pub destination: Rc<Node>,
    /// The product being carried
    pub product: ProductID,
    /// The shipper class, which sets the value of time
    pub financial_status: Rc<FinancialStatus>,
    /// The paths the freight may take. Never empty for a loaded model.
    pub paths: Vec<Rc<Path>>,
    /// Demand (tonnes) for every calendar year of the horizon
    pub demand: YearSeries,
}
define_id_getter! {OdPair, OdPairID}

impl OdPair {
    /// Value of time for this OD pair's shipper (€ per tonne-hour)
    pub fn value_of_time(&self) -> f64 {
        self.financial_status.value_of_time
    }
}
