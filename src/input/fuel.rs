//! Code for reading fuels and fueling infrastructure types.
use super::*;
use crate::fuel::{
    Fuel, FuelID, FuelMap, FuelingInfrastructure, InfrastructureCost, InfrastructureID,
    InfrastructureMap,
};
use crate::id::IDCollection;
use crate::year::{YearSeries, parse_year_str};
use log::warn;
use serde::Deserialize;

const FUELS_FILE_NAME: &str = "fuels.csv";
const FUEL_COSTS_FILE_NAME: &str = "fuel_costs.csv";
const INFRASTRUCTURE_FILE_NAME: &str = "fueling_infrastructure.csv";
const INFRASTRUCTURE_COSTS_FILE_NAME: &str = "fueling_infrastructure_costs.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct FuelRaw {
    id: FuelID,
    name: String,
    emission_factor: f64,
}

#[derive(PartialEq, Debug, Deserialize)]
struct FuelCostRaw {
    fuel_id: String,
    years: String,
    cost_per_kwh: f64,
}

/// Read fuels and their prices for every calendar year of the horizon
pub fn read_fuels(model_dir: &Path, temporal: &TemporalIndex) -> Result<FuelMap> {
    let fuels_file = model_dir.join(FUELS_FILE_NAME);
    let fuels = read_csv::<FuelRaw>(&fuels_file)?;
    let costs_file = model_dir.join(FUEL_COSTS_FILE_NAME);
    let costs = read_csv::<FuelCostRaw>(&costs_file)?;

    read_fuels_from_iter(fuels, costs, temporal).with_context(|| input_err_msg(&costs_file))
}

fn read_fuels_from_iter<I, J>(fuels: I, costs: J, temporal: &TemporalIndex) -> Result<FuelMap>
where
    I: Iterator<Item = FuelRaw>,
    J: Iterator<Item = FuelCostRaw>,
{
    let mut raw_fuels = IndexMap::new();
    for raw in fuels {
        check_non_negative(
            &format!("Fuel {}", raw.id),
            [("emission_factor", raw.emission_factor)],
        )?;
        let id = raw.id.clone();
        ensure!(
            raw_fuels.insert(id.clone(), raw).is_none(),
            "Duplicate ID found: {id}"
        );
    }

    let calendar_years = temporal.calendar_years().collect_vec();
    let mut prices: HashMap<FuelID, HashMap<u32, f64>> = HashMap::new();
    for raw in costs {
        let id = raw_fuels.get_id_by_str(&raw.fuel_id)?;
        let years = parse_year_str(&raw.years, &calendar_years)
            .with_context(|| format!("Invalid years for fuel {id}"))?;
        check_non_negative(
            &format!("Fuel {id}"),
            [("cost_per_kwh", raw.cost_per_kwh)],
        )?;
        let map = prices.entry(id.clone()).or_default();
        insert_for_years(map, &format!("fuel {id}"), &years, &raw.cost_per_kwh)?;
    }

    let mut fuels = FuelMap::new();
    for (id, raw) in raw_fuels {
        let price = prices.remove(&id).unwrap_or_default();
        check_years_covered(&price, &format!("fuel {id}"), temporal.calendar_years())?;
        let fuel = Fuel {
            id: id.clone(),
            name: raw.name,
            emission_factor: raw.emission_factor,
            cost_per_kwh: YearSeries::from_entries(temporal.calendar_years(), price)?,
        };
        fuels.insert(id, Rc::new(fuel));
    }

    Ok(fuels)
}

#[derive(PartialEq, Debug, Deserialize)]
struct InfrastructureRaw {
    id: InfrastructureID,
    fuel_id: String,
    fueling_power: f64,
    #[serde(deserialize_with = "deserialise_proportion")]
    max_occupancy: f64,
}

#[derive(PartialEq, Debug, Deserialize)]
struct InfrastructureCostRaw {
    infrastructure_id: String,
    years: String,
    cost_per_kw: f64,
    cost_per_kwh: f64,
    om_cost: f64,
}

/// Read fueling infrastructure types and their costs for every calendar year of the horizon.
///
/// Both files are optional, as models whose vehicles never refuel en route need neither.
pub fn read_infrastructures(
    model_dir: &Path,
    fuels: &FuelMap,
    temporal: &TemporalIndex,
) -> Result<InfrastructureMap> {
    let infrastructure_file = model_dir.join(INFRASTRUCTURE_FILE_NAME);
    let infrastructures = read_csv_optional::<InfrastructureRaw>(&infrastructure_file)?;
    let costs_file = model_dir.join(INFRASTRUCTURE_COSTS_FILE_NAME);
    let costs = read_csv_optional::<InfrastructureCostRaw>(&costs_file)?;

    read_infrastructures_from_iter(infrastructures, costs, fuels, temporal)
        .with_context(|| input_err_msg(&costs_file))
}

fn read_infrastructures_from_iter<I, J>(
    infrastructures: I,
    costs: J,
    fuels: &FuelMap,
    temporal: &TemporalIndex,
) -> Result<InfrastructureMap>
where
    I: Iterator<Item = InfrastructureRaw>,
    J: Iterator<Item = InfrastructureCostRaw>,
{
    let mut raw_infrastructures = IndexMap::new();
    for raw in infrastructures {
        check_positive(
            &format!("Infrastructure {}", raw.id),
            [("fueling_power", raw.fueling_power)],
        )?;
        let id = raw.id.clone();
        ensure!(
            raw_infrastructures.insert(id.clone(), raw).is_none(),
            "Duplicate ID found: {id}"
        );
    }

    let calendar_years = temporal.calendar_years().collect_vec();
    let mut cost_maps: HashMap<InfrastructureID, HashMap<u32, InfrastructureCost>> =
        HashMap::new();
    for raw in costs {
        let id = raw_infrastructures.get_id_by_str(&raw.infrastructure_id)?;
        let years = parse_year_str(&raw.years, &calendar_years)
            .with_context(|| format!("Invalid years for infrastructure {id}"))?;
        check_non_negative(
            &format!("Infrastructure {id}"),
            [
                ("cost_per_kw", raw.cost_per_kw),
                ("cost_per_kwh", raw.cost_per_kwh),
                ("om_cost", raw.om_cost),
            ],
        )?;
        let cost = InfrastructureCost {
            cost_per_kw: raw.cost_per_kw,
            cost_per_kwh: raw.cost_per_kwh,
            om_cost: raw.om_cost,
        };
        let map = cost_maps.entry(id.clone()).or_default();
        insert_for_years(map, &format!("infrastructure {id}"), &years, &cost)?;
    }

    let mut infrastructures = InfrastructureMap::new();
    for (id, raw) in raw_infrastructures {
        let fuel_id = fuels.get_id_by_str(&raw.fuel_id)?;
        let costs = cost_maps.remove(&id).unwrap_or_default();
        check_years_covered(
            &costs,
            &format!("infrastructure {id}"),
            temporal.calendar_years(),
        )?;
        if raw.max_occupancy == 0.0 {
            warn!("Infrastructure {id} has a max_occupancy of zero and can never be used");
        }

        let infrastructure = FuelingInfrastructure {
            id: id.clone(),
            fuel: Rc::clone(&fuels[&fuel_id]),
            fueling_power: raw.fueling_power,
            max_occupancy: raw.max_occupancy,
            costs,
        };
        infrastructures.insert(id, Rc::new(infrastructure));
    }

    Ok(infrastructures)
}
