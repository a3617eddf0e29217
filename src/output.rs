//! The module responsible for writing output data to disk.
use crate::fuel::InfrastructureID;
use crate::mode::ModeID;
use crate::network::{NodeID, PathID};
use crate::od_pair::OdPairID;
use crate::optimisation::problem::VariableFamily;
use crate::optimisation::variables::{RouteNodeKey, StockKey, VariableMap};
use crate::results::{InstalledCapacity, Solution};
use crate::vehicle::TechVehicleID;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "freightpath_results";

/// The output file name for installed fueling capacity
const FUELING_CAPACITY_FILE_NAME: &str = "fueling_capacity.csv";

/// The output file name for installed mode infrastructure capacity
const MODE_CAPACITY_FILE_NAME: &str = "mode_capacity.csv";

/// The output file name for costs, emissions and mode split by year
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create the output directory for a model run.
///
/// An existing empty folder is reused. A non-empty one is only replaced if `allow_overwrite` is
/// set.
///
/// # Returns
///
/// Whether an existing folder's contents were removed
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwritten = false;
    if output_dir.is_dir() {
        if fs::read_dir(output_dir)?.next().is_none() {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Pass --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        overwritten = true;
    }

    fs::create_dir_all(output_dir)?;

    Ok(overwritten)
}

/// The name of the output file for a variable family
fn family_file_name(family: VariableFamily) -> String {
    format!("{family}.csv")
}

/// Represents a row of the flow output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowRow {
    year: u32,
    od_pair: OdPairID,
    path: PathID,
    unit_kind: String,
    unit: String,
    generation: u32,
    value: f64,
}

/// Represents a row of one of the vehicle stock output CSV files
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StockRow {
    year: u32,
    od_pair: OdPairID,
    tech_vehicle: TechVehicleID,
    generation: u32,
    value: f64,
}

impl StockRow {
    fn new(key: &StockKey, value: f64) -> Self {
        Self {
            year: key.year,
            od_pair: key.od_pair.clone(),
            tech_vehicle: key.vehicle.clone(),
            generation: key.generation,
            value,
        }
    }
}

/// Represents a row of one of the per-node route output CSV files
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RouteNodeRow {
    year: u32,
    od_pair: OdPairID,
    path: PathID,
    tech_vehicle: TechVehicleID,
    generation: u32,
    node_index: usize,
    node: NodeID,
    value: f64,
}

impl RouteNodeRow {
    fn new(key: &RouteNodeKey, node: NodeID, value: f64) -> Self {
        let route = &key.route;
        Self {
            year: route.year,
            od_pair: route.od_pair.clone(),
            path: route.path.clone(),
            tech_vehicle: route.vehicle.clone(),
            generation: route.generation,
            node_index: key.node_index,
            node,
            value,
        }
    }
}

/// Represents a row of the energy drawn output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EnergyDrawnRow {
    year: u32,
    od_pair: OdPairID,
    path: PathID,
    tech_vehicle: TechVehicleID,
    generation: u32,
    node_index: usize,
    node: NodeID,
    infrastructure: InfrastructureID,
    value: f64,
}

/// Represents a row of the fueling capacity added output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FuelingCapacityAddedRow {
    year: u32,
    infrastructure: InfrastructureID,
    node: NodeID,
    value: f64,
}

/// Represents a row of the mode capacity added output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ModeCapacityAddedRow {
    year: u32,
    mode: ModeID,
    node: NodeID,
    value: f64,
}

/// Represents a row of the installed fueling capacity output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FuelingCapacityRow {
    year: u32,
    infrastructure: InfrastructureID,
    node: NodeID,
    added: f64,
    total: f64,
}

impl From<InstalledCapacity<(InfrastructureID, NodeID)>> for FuelingCapacityRow {
    fn from(capacity: InstalledCapacity<(InfrastructureID, NodeID)>) -> Self {
        let (infrastructure, node) = capacity.site;
        Self {
            year: capacity.year,
            infrastructure,
            node,
            added: capacity.added,
            total: capacity.total,
        }
    }
}

/// Represents a row of the installed mode capacity output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ModeCapacityRow {
    year: u32,
    mode: ModeID,
    node: NodeID,
    added: f64,
    total: f64,
}

impl From<InstalledCapacity<(ModeID, NodeID)>> for ModeCapacityRow {
    fn from(capacity: InstalledCapacity<(ModeID, NodeID)>) -> Self {
        let (mode, node) = capacity.site;
        Self {
            year: capacity.year,
            mode,
            node,
            added: capacity.added,
            total: capacity.total,
        }
    }
}

/// What a row of the summary CSV file reports
#[derive(PartialEq, Debug, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
enum SummaryCategory {
    /// Discounted cost; `name` is the cost component
    #[string = "cost"]
    Cost,
    /// Annual tonne-km; `name` is the mode
    #[string = "tonne_km"]
    TonneKm,
    /// Annual tCO2; `name` is `total`
    #[string = "emissions"]
    Emissions,
}

/// Represents a row of the summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    year: u32,
    category: SummaryCategory,
    name: String,
    value: f64,
}

/// An object for writing the results of a solved model to CSV files
pub struct DataWriter {
    output_path: PathBuf,
}

impl DataWriter {
    /// Open a data writer for the given output folder.
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved. It must already exist.
    pub fn create(output_path: &Path) -> Result<Self> {
        ensure!(
            output_path.is_dir(),
            "Output folder does not exist: {}",
            output_path.display()
        );

        Ok(Self {
            output_path: output_path.to_path_buf(),
        })
    }

    /// Serialise rows to a new CSV file in the output folder
    fn write_rows<I>(&self, file_name: &str, rows: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let file_path = self.output_path.join(file_name);
        let mut writer = csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Write every output file for a solution
    pub fn write_solution(&self, solution: &Solution) -> Result<()> {
        self.write_flows(solution)?;
        self.write_stock(solution)?;
        self.write_routes(solution)?;
        self.write_capacity_added(solution)?;
        self.write_installed_capacity(solution)?;
        self.write_summary(solution)
    }

    /// Write freight flows to file
    pub fn write_flows(&self, solution: &Solution) -> Result<()> {
        let rows = solution
            .values(&solution.variables().flow)
            .map(|(key, value)| FlowRow {
                year: key.year,
                od_pair: key.od_pair.clone(),
                path: key.path.clone(),
                unit_kind: key.unit.kind().into(),
                unit: key.unit.to_string(),
                generation: key.generation,
                value,
            });
        self.write_rows(&family_file_name(VariableFamily::Flow), rows)
    }

    /// Write the four vehicle stock families to file
    pub fn write_stock(&self, solution: &Solution) -> Result<()> {
        let variables = solution.variables();
        let families: [(VariableFamily, &VariableMap<StockKey>); 4] = [
            (VariableFamily::StockTotal, &variables.stock_total),
            (VariableFamily::StockExisting, &variables.stock_existing),
            (VariableFamily::StockAdded, &variables.stock_added),
            (VariableFamily::StockRemoved, &variables.stock_removed),
        ];
        for (family, map) in families {
            let rows = solution
                .values(map)
                .map(|(key, value)| StockRow::new(key, value));
            self.write_rows(&family_file_name(family), rows)?;
        }

        Ok(())
    }

    /// Write the route families (energy drawn, state of charge, travel time and break time) to
    /// file
    pub fn write_routes(&self, solution: &Solution) -> Result<()> {
        let registry = solution.registry();
        let node_at = |path: &PathID, node_index: usize| -> NodeID {
            registry.paths[path].nodes[node_index].id.clone()
        };

        let variables = solution.variables();
        let rows = solution
            .values(&variables.energy_drawn)
            .map(|(key, value)| {
                let route = &key.route;
                EnergyDrawnRow {
                    year: route.year,
                    od_pair: route.od_pair.clone(),
                    path: route.path.clone(),
                    tech_vehicle: route.vehicle.clone(),
                    generation: route.generation,
                    node_index: key.node_index,
                    node: node_at(&route.path, key.node_index),
                    infrastructure: key.infrastructure.clone(),
                    value,
                }
            });
        self.write_rows(&family_file_name(VariableFamily::EnergyDrawn), rows)?;

        let families: [(VariableFamily, &VariableMap<RouteNodeKey>); 3] = [
            (VariableFamily::StateOfCharge, &variables.state_of_charge),
            (VariableFamily::TravelTime, &variables.travel_time),
            (VariableFamily::BreakTime, &variables.break_time),
        ];
        for (family, map) in families {
            let rows = solution.values(map).map(|(key, value)| {
                let node = node_at(&key.route.path, key.node_index);
                RouteNodeRow::new(key, node, value)
            });
            self.write_rows(&family_file_name(family), rows)?;
        }

        Ok(())
    }

    /// Write infrastructure capacity additions to file
    pub fn write_capacity_added(&self, solution: &Solution) -> Result<()> {
        let variables = solution.variables();
        let rows = solution
            .values(&variables.fueling_capacity_added)
            .map(|(key, value)| FuelingCapacityAddedRow {
                year: key.year,
                infrastructure: key.infrastructure.clone(),
                node: key.node.clone(),
                value,
            });
        self.write_rows(&family_file_name(VariableFamily::FuelingCapacityAdded), rows)?;

        let rows = solution
            .values(&variables.mode_capacity_added)
            .map(|(key, value)| ModeCapacityAddedRow {
                year: key.year,
                mode: key.mode.clone(),
                node: key.node.clone(),
                value,
            });
        self.write_rows(&family_file_name(VariableFamily::ModeCapacityAdded), rows)
    }

    /// Write installed infrastructure capacity for every modeled year to file
    pub fn write_installed_capacity(&self, solution: &Solution) -> Result<()> {
        let rows = solution
            .fueling_capacity()
            .into_iter()
            .map(FuelingCapacityRow::from);
        self.write_rows(FUELING_CAPACITY_FILE_NAME, rows)?;

        let rows = solution
            .mode_capacity()
            .into_iter()
            .map(ModeCapacityRow::from);
        self.write_rows(MODE_CAPACITY_FILE_NAME, rows)
    }

    /// Write costs, mode split and emissions by year to file
    pub fn write_summary(&self, solution: &Solution) -> Result<()> {
        let costs = solution
            .costs()
            .into_iter()
            .map(|((year, component), value)| SummaryRow {
                year,
                category: SummaryCategory::Cost,
                name: component.to_string(),
                value,
            });
        let tonne_km = solution
            .mode_tonne_km()
            .into_iter()
            .map(|((year, mode), value)| SummaryRow {
                year,
                category: SummaryCategory::TonneKm,
                name: mode.to_string(),
                value,
            });
        let emissions = solution
            .emissions()
            .into_iter()
            .map(|(year, value)| SummaryRow {
                year,
                category: SummaryCategory::Emissions,
                name: "total".into(),
                value,
            });

        let mut rows = costs.chain(tonne_km).chain(emissions).collect::<Vec<_>>();
        rows.sort_by_key(|row| row.year);
        self.write_rows(SUMMARY_FILE_NAME, rows)
    }
}
