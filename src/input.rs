//! Common routines for handling input data.
use crate::id::{HasID, IDLike};
use crate::model::ModelParameters;
use crate::registry::{EntityRegistry, compute_mandatory_breaks};
use crate::temporal::TemporalIndex;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::rc::Rc;

mod fuel;
use fuel::{read_fuels, read_infrastructures};
mod initial;
use initial::{
    read_initial_fueling_infrastructure, read_initial_mode_infrastructure,
    read_initial_vehicle_stock,
};
mod limits;
use limits::{
    read_carbon_prices, read_emission_limits, read_market_share_limits, read_mode_share_limits,
    read_purchase_budgets,
};
mod mode;
use mode::read_modes;
mod network;
use network::{read_nodes, read_paths};
mod od_pair;
use od_pair::{read_financial_statuses, read_od_pairs};
mod vehicle;
use vehicle::read_tech_vehicles;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file, which may not exist.
///
/// If the file is missing, an empty iterator is returned.
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;

    reader
        .deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a CSV file of items with IDs.
///
/// As this function is only ever used for top-level CSV files (i.e. the ones which actually define
/// the IDs for a given type), we use an ordered map to maintain the order in the input files.
pub fn read_csv_id_file<T, ID>(file_path: &Path) -> Result<IndexMap<ID, Rc<T>>>
where
    T: HasID<ID> + DeserializeOwned,
    ID: IDLike,
{
    fn fill_and_validate_map<T, ID>(file_path: &Path) -> Result<IndexMap<ID, Rc<T>>>
    where
        T: HasID<ID> + DeserializeOwned,
        ID: IDLike,
    {
        let mut map = IndexMap::new();
        for record in read_csv::<T>(file_path)? {
            let id = record.get_id().clone();
            let existing = map.insert(id.clone(), Rc::new(record)).is_some();
            ensure!(!existing, "Duplicate ID found: {id}");
        }

        Ok(map)
    }

    fill_and_validate_map(file_path).with_context(|| input_err_msg(file_path))
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
    }

    Ok(value)
}

/// Read an optional f64, checking that it is between 0 and 1 if present
pub fn deserialise_optional_proportion<'de, D>(deserialiser: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Deserialize::deserialize(deserialiser)?;
    if let Some(value) = value {
        if !(0.0..=1.0).contains(&value) {
            Err(serde::de::Error::custom("Value must be between 0 and 1"))?;
        }
    }

    Ok(value)
}

/// Check that every named value is finite and non-negative
pub fn check_non_negative<'a, I>(context: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    for (name, value) in values {
        ensure!(
            value.is_finite() && value >= 0.0,
            "{context}: {name} must be a finite number greater than or equal to zero (got {value})"
        );
    }

    Ok(())
}

/// Check that every named value is finite and strictly positive
pub fn check_positive<'a, I>(context: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    for (name, value) in values {
        ensure!(
            value.is_finite() && value > 0.0,
            "{context}: {name} must be a finite number greater than zero (got {value})"
        );
    }

    Ok(())
}

/// Store `value` for each of `years`, failing if any year already has a value
pub fn insert_for_years<T: Clone>(
    map: &mut HashMap<u32, T>,
    what: &str,
    years: &[u32],
    value: &T,
) -> Result<()> {
    for year in years {
        ensure!(
            map.insert(*year, value.clone()).is_none(),
            "More than one entry for {what} in {year}"
        );
    }

    Ok(())
}

/// Check that `map` has a value for every year in `years`
pub fn check_years_covered<T>(
    map: &HashMap<u32, T>,
    what: &str,
    years: RangeInclusive<u32>,
) -> Result<()> {
    let missing = years.filter(|year| !map.contains_key(year)).collect_vec();
    ensure!(
        missing.is_empty(),
        "No entry for {what} in years: {}",
        missing.iter().join(", ")
    );

    Ok(())
}

/// Fail with a single error listing every structural problem found in the input data
fn check_structural_problems(problems: &[String]) -> Result<()> {
    if problems.is_empty() {
        return Ok(());
    }

    bail!(
        "Found {} problem(s) with the network data:\n  - {}",
        problems.len(),
        problems.iter().join("\n  - ")
    )
}

/// Read a model from the specified directory.
///
/// Configuration errors (malformed files, unknown IDs, invalid values) fail immediately.
/// Structural problems with the network (paths whose segments do not add up, OD pairs without
/// usable paths or with incomplete demand) are collected and reported together.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The populated [`EntityRegistry`] or an error
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<EntityRegistry> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let temporal = TemporalIndex::new(&parameters.time)
        .with_context(|| input_err_msg(model_dir.join("model.toml")))?;

    let mut problems = Vec::new();
    let nodes = read_nodes(model_dir)?;
    let paths = read_paths(model_dir, &nodes)?;
    problems.extend(
        paths
            .values()
            .filter_map(|path| path.check_length().err())
            .map(|err| err.to_string()),
    );
    let financial_statuses = read_financial_statuses(model_dir)?;
    let od_pairs = read_od_pairs(
        model_dir,
        &nodes,
        &paths,
        &financial_statuses,
        &temporal,
        &mut problems,
    )?;
    check_structural_problems(&problems)?;

    let modes = read_modes(model_dir, &temporal)?;
    let fuels = read_fuels(model_dir, &temporal)?;
    let infrastructures = read_infrastructures(model_dir, &fuels, &temporal)?;
    let tech_vehicles = read_tech_vehicles(model_dir, &modes, &fuels, &temporal)?;
    let initial_vehicle_stock =
        read_initial_vehicle_stock(model_dir, &od_pairs, &tech_vehicles, &temporal)?;
    let initial_fueling_infrastructure =
        read_initial_fueling_infrastructure(model_dir, &infrastructures, &nodes)?;
    let initial_mode_infrastructure = read_initial_mode_infrastructure(model_dir, &modes, &nodes)?;
    let mode_share_limits = read_mode_share_limits(model_dir, &modes, &temporal)?;
    let market_share_limits = read_market_share_limits(model_dir, &tech_vehicles, &temporal)?;
    let (emission_limits, mode_emission_limits) =
        read_emission_limits(model_dir, &modes, &temporal)?;
    let carbon_prices = read_carbon_prices(model_dir, &nodes, &temporal)?;
    let purchase_budgets = read_purchase_budgets(model_dir, &financial_statuses, &temporal)?;

    let breaks = compute_mandatory_breaks(&od_pairs, &tech_vehicles, &parameters.driving);

    Ok(EntityRegistry {
        model_path: model_dir.to_path_buf(),
        parameters,
        temporal,
        nodes,
        paths,
        financial_statuses,
        od_pairs,
        modes,
        fuels,
        infrastructures,
        tech_vehicles,
        initial_vehicle_stock,
        initial_fueling_infrastructure,
        initial_mode_infrastructure,
        mode_share_limits,
        market_share_limits,
        emission_limits,
        mode_emission_limits,
        carbon_prices,
        purchase_budgets,
        breaks,
    })
}
