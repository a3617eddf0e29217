//! Code for reading OD pairs, their demand and shipper classes.
use super::*;
use crate::id::IDCollection;
use crate::network::{NodeMap, PathMap};
use crate::od_pair::{FinancialStatus, FinancialStatusMap, OdPair, OdPairID, OdPairMap};
use crate::year::YearSeries;
use indexmap::IndexSet;
use serde::Deserialize;
use std::collections::HashMap;

const FINANCIAL_STATUS_FILE_NAME: &str = "financial_status.csv";
const OD_PAIRS_FILE_NAME: &str = "od_pairs.csv";
const OD_PAIR_DEMAND_FILE_NAME: &str = "od_pair_demand.csv";

/// Read shipper classes from `financial_status.csv`
pub fn read_financial_statuses(model_dir: &Path) -> Result<FinancialStatusMap> {
    let file_path = model_dir.join(FINANCIAL_STATUS_FILE_NAME);
    let statuses: FinancialStatusMap = read_csv_id_file::<FinancialStatus, _>(&file_path)?;
    for status in statuses.values() {
        check_non_negative(
            &format!("Financial status {}", status.id),
            [("value_of_time", status.value_of_time)],
        )
        .with_context(|| input_err_msg(&file_path))?;
    }

    Ok(statuses)
}

#[derive(PartialEq, Debug, Deserialize)]
struct OdPairRaw {
    id: OdPairID,
    origin: String,
    destination: String,
    product: String,
    financial_status: String,
    paths: String,
}

#[derive(PartialEq, Debug, Deserialize)]
struct OdPairDemandRaw {
    od_pair_id: String,
    year: u32,
    demand: f64,
}

/// Read OD pairs and their annual demand.
///
/// Unknown IDs and invalid values are returned as errors. Structural problems (no candidate
/// paths, paths which do not connect the OD pair's origin and destination, and years without
/// demand) are appended to `problems` instead, so they can be reported together.
pub fn read_od_pairs(
    model_dir: &Path,
    nodes: &NodeMap,
    paths: &PathMap,
    financial_statuses: &FinancialStatusMap,
    temporal: &TemporalIndex,
    problems: &mut Vec<String>,
) -> Result<OdPairMap> {
    let od_file = model_dir.join(OD_PAIRS_FILE_NAME);
    let demand_file = model_dir.join(OD_PAIR_DEMAND_FILE_NAME);
    let od_rows = read_csv::<OdPairRaw>(&od_file)?.collect_vec();
    let od_ids: IndexSet<OdPairID> = od_rows.iter().map(|row| row.id.clone()).collect();
    let demand = read_demand_from_iter(read_csv(&demand_file)?, &od_ids, temporal)
        .with_context(|| input_err_msg(&demand_file))?;

    read_od_pairs_from_iter(
        od_rows.into_iter(),
        demand,
        nodes,
        paths,
        financial_statuses,
        temporal,
        problems,
    )
    .with_context(|| input_err_msg(&od_file))
}

/// Group demand rows by OD pair, checking for unknown IDs and invalid values
fn read_demand_from_iter<I>(
    iter: I,
    od_ids: &IndexSet<OdPairID>,
    temporal: &TemporalIndex,
) -> Result<HashMap<OdPairID, Vec<(u32, f64)>>>
where
    I: Iterator<Item = OdPairDemandRaw>,
{
    let mut demand: HashMap<OdPairID, Vec<(u32, f64)>> = HashMap::new();
    for row in iter {
        let id = od_ids.get_id_by_str(&row.od_pair_id)?;
        ensure!(
            temporal.calendar_years().contains(&row.year),
            "Demand for OD pair {id} given for year {}, which is outside the horizon",
            row.year
        );
        check_non_negative(
            &format!("OD pair {id} in {}", row.year),
            [("demand", row.demand)],
        )?;
        let entries = demand.entry(id.clone()).or_default();
        ensure!(
            entries.iter().all(|(year, _)| *year != row.year),
            "Duplicate demand entry for OD pair {id} in {}",
            row.year
        );
        entries.push((row.year, row.demand));
    }

    Ok(demand)
}

fn read_od_pairs_from_iter<I>(
    iter: I,
    mut demand: HashMap<OdPairID, Vec<(u32, f64)>>,
    nodes: &NodeMap,
    paths: &PathMap,
    financial_statuses: &FinancialStatusMap,
    temporal: &TemporalIndex,
    problems: &mut Vec<String>,
) -> Result<OdPairMap>
where
    I: Iterator<Item = OdPairRaw>,
{
    let mut od_pairs = OdPairMap::new();
    for raw in iter {
        let id = raw.id.clone();
        let origin = Rc::clone(&nodes[&nodes.get_id_by_str(&raw.origin)?]);
        let destination = Rc::clone(&nodes[&nodes.get_id_by_str(&raw.destination)?]);
        let status_id = financial_statuses.get_id_by_str(&raw.financial_status)?;
        let financial_status = Rc::clone(&financial_statuses[&status_id]);
        let od_paths: Vec<_> = raw
            .paths
            .split(';')
            .map(str::trim)
            .filter(|path_id| !path_id.is_empty())
            .map(|path_id| {
                let path_id = paths.get_id_by_str(path_id)?;
                Ok(Rc::clone(&paths[&path_id]))
            })
            .collect::<Result<_>>()?;

        let num_problems = problems.len();
        if od_paths.is_empty() {
            problems.push(format!("OD pair {id} has no candidate paths"));
        }
        for path in &od_paths {
            if path.origin().id != origin.id || path.destination().id != destination.id {
                problems.push(format!(
                    "OD pair {id}: path {} runs from {} to {} rather than from {} to {}",
                    path.id,
                    path.origin().id,
                    path.destination().id,
                    origin.id,
                    destination.id
                ));
            }
        }

        let entries = demand.remove(&id).unwrap_or_default();
        let missing = temporal
            .calendar_years()
            .filter(|year| entries.iter().all(|(entry_year, _)| entry_year != year))
            .collect_vec();
        if !missing.is_empty() {
            problems.push(format!(
                "OD pair {id} has no demand for years: {}",
                missing.iter().join(", ")
            ));
        }

        if problems.len() > num_problems {
            // This OD pair can't be built, but keep going to find every problem
            continue;
        }

        let od_pair = OdPair {
            id: id.clone(),
            origin,
            destination,
            product: raw.product.as_str().into(),
            financial_status,
            paths: od_paths,
            demand: YearSeries::from_entries(temporal.calendar_years(), entries)?,
        };
        ensure!(
            od_pairs.insert(id.clone(), Rc::new(od_pair)).is_none(),
            "Duplicate OD pair ID found: {id}"
        );
    }

    Ok(od_pairs)
}
