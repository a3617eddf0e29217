//! Code for reading the vehicle stock and infrastructure in place at the start of the horizon.
//!
//! All three files are optional. A missing file means nothing is installed.
use super::*;
use crate::fuel::InfrastructureMap;
use crate::id::IDCollection;
use crate::mode::ModeMap;
use crate::network::NodeMap;
use crate::od_pair::OdPairMap;
use crate::registry::{
    InitialFuelingCapacityMap, InitialModeCapacityMap, InitialVehicleStockMap,
};
use crate::vehicle::TechVehicleMap;
use log::warn;
use serde::Deserialize;

const INITIAL_VEHICLE_STOCK_FILE_NAME: &str = "initial_vehicle_stock.csv";
const INITIAL_FUELING_INFRASTRUCTURE_FILE_NAME: &str = "initial_fueling_infrastructure.csv";
const INITIAL_MODE_INFRASTRUCTURE_FILE_NAME: &str = "initial_mode_infrastructure.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct InitialVehicleStockRaw {
    od_pair_id: String,
    tech_vehicle_id: String,
    year_of_purchase: u32,
    stock: f64,
}

/// Read the vehicles in service at the start of the horizon
pub fn read_initial_vehicle_stock(
    model_dir: &Path,
    od_pairs: &OdPairMap,
    tech_vehicles: &TechVehicleMap,
    temporal: &TemporalIndex,
) -> Result<InitialVehicleStockMap> {
    let file_path = model_dir.join(INITIAL_VEHICLE_STOCK_FILE_NAME);
    let iter = read_csv_optional::<InitialVehicleStockRaw>(&file_path)?;
    read_initial_vehicle_stock_from_iter(iter, od_pairs, tech_vehicles, temporal)
        .with_context(|| input_err_msg(&file_path))
}

fn read_initial_vehicle_stock_from_iter<I>(
    iter: I,
    od_pairs: &OdPairMap,
    tech_vehicles: &TechVehicleMap,
    temporal: &TemporalIndex,
) -> Result<InitialVehicleStockMap>
where
    I: Iterator<Item = InitialVehicleStockRaw>,
{
    let mut stock = InitialVehicleStockMap::new();
    for raw in iter {
        let od_pair_id = od_pairs.get_id_by_str(&raw.od_pair_id)?;
        let vehicle_id = tech_vehicles.get_id_by_str(&raw.tech_vehicle_id)?;
        let generation = raw.year_of_purchase;
        let context = format!("Initial stock of {vehicle_id} on OD pair {od_pair_id}");

        ensure!(
            generation < temporal.y_init(),
            "{context}: year_of_purchase ({generation}) must be before the first year of the \
            horizon ({})",
            temporal.y_init()
        );
        ensure!(
            temporal.modeled_generations().contains(&generation),
            "{context}: year_of_purchase ({generation}) is not a modeled generation (generations \
            start in {} and are {} year(s) apart)",
            temporal.g_init(),
            temporal.time_step()
        );
        ensure!(
            tech_vehicles[&vehicle_id].product == od_pairs[&od_pair_id].product,
            "{context}: the vehicle cannot carry the OD pair's product"
        );
        check_non_negative(&context, [("stock", raw.stock)])?;

        let key = (od_pair_id, vehicle_id, generation);
        ensure!(
            stock.insert(key, raw.stock).is_none(),
            "{context}: more than one entry for year_of_purchase {generation}"
        );
    }

    Ok(stock)
}

#[derive(PartialEq, Debug, Deserialize)]
struct InitialFuelingInfrastructureRaw {
    infrastructure_id: String,
    node_id: String,
    capacity: f64,
}

/// Read the fueling infrastructure (kW) installed at the start of the horizon
pub fn read_initial_fueling_infrastructure(
    model_dir: &Path,
    infrastructures: &InfrastructureMap,
    nodes: &NodeMap,
) -> Result<InitialFuelingCapacityMap> {
    let file_path = model_dir.join(INITIAL_FUELING_INFRASTRUCTURE_FILE_NAME);
    let iter = read_csv_optional::<InitialFuelingInfrastructureRaw>(&file_path)?;
    read_initial_fueling_infrastructure_from_iter(iter, infrastructures, nodes)
        .with_context(|| input_err_msg(&file_path))
}

fn read_initial_fueling_infrastructure_from_iter<I>(
    iter: I,
    infrastructures: &InfrastructureMap,
    nodes: &NodeMap,
) -> Result<InitialFuelingCapacityMap>
where
    I: Iterator<Item = InitialFuelingInfrastructureRaw>,
{
    let mut capacities = InitialFuelingCapacityMap::new();
    for raw in iter {
        let infrastructure_id = infrastructures.get_id_by_str(&raw.infrastructure_id)?;
        let node_id = nodes.get_id_by_str(&raw.node_id)?;
        check_non_negative(
            &format!("Initial {infrastructure_id} capacity at node {node_id}"),
            [("capacity", raw.capacity)],
        )?;
        ensure!(
            capacities
                .insert((infrastructure_id.clone(), node_id.clone()), raw.capacity)
                .is_none(),
            "More than one entry for infrastructure {infrastructure_id} at node {node_id}"
        );
    }

    Ok(capacities)
}

#[derive(PartialEq, Debug, Deserialize)]
struct InitialModeInfrastructureRaw {
    mode_id: String,
    node_id: String,
    capacity: f64,
}

/// Read the mode infrastructure (tkm/year) installed at the start of the horizon
pub fn read_initial_mode_infrastructure(
    model_dir: &Path,
    modes: &ModeMap,
    nodes: &NodeMap,
) -> Result<InitialModeCapacityMap> {
    let file_path = model_dir.join(INITIAL_MODE_INFRASTRUCTURE_FILE_NAME);
    let iter = read_csv_optional::<InitialModeInfrastructureRaw>(&file_path)?;
    read_initial_mode_infrastructure_from_iter(iter, modes, nodes)
        .with_context(|| input_err_msg(&file_path))
}

fn read_initial_mode_infrastructure_from_iter<I>(
    iter: I,
    modes: &ModeMap,
    nodes: &NodeMap,
) -> Result<InitialModeCapacityMap>
where
    I: Iterator<Item = InitialModeInfrastructureRaw>,
{
    let mut capacities = InitialModeCapacityMap::new();
    for raw in iter {
        let mode_id = modes.get_id_by_str(&raw.mode_id)?;
        let node_id = nodes.get_id_by_str(&raw.node_id)?;
        check_non_negative(
            &format!("Initial {mode_id} capacity at node {node_id}"),
            [("capacity", raw.capacity)],
        )?;
        if !modes[&mode_id].infrastructure_limited {
            warn!(
                "Initial infrastructure given for mode {mode_id}, which is not \
                infrastructure_limited; it will be ignored"
            );
        }
        ensure!(
            capacities
                .insert((mode_id.clone(), node_id.clone()), raw.capacity)
                .is_none(),
            "More than one entry for mode {mode_id} at node {node_id}"
        );
    }

    Ok(capacities)
}
