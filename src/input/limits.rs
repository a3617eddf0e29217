//! Code for reading policy limits and prices: mode and market shares, emissions, carbon prices and
//! purchase budgets.
use super::*;
use crate::id::IDCollection;
use crate::mode::ModeMap;
use crate::network::NodeMap;
use crate::od_pair::FinancialStatusMap;
use crate::registry::{
    CarbonPriceMap, EmissionLimitMap, MarketShareLimit, ModeEmissionLimitMap, ModeShareLimit,
    PurchaseBudgetMap, SharePeriod,
};
use crate::vehicle::{TechVehicleMap, VehicleGroup};
use crate::year::parse_year_str;
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashSet;
use std::hash::Hash;

const MODE_SHARE_LIMITS_FILE_NAME: &str = "mode_share_limits.csv";
const MARKET_SHARE_LIMITS_FILE_NAME: &str = "market_share_limits.csv";
const EMISSION_LIMITS_FILE_NAME: &str = "emission_limits.csv";
const CARBON_PRICES_FILE_NAME: &str = "carbon_prices.csv";
const PURCHASE_BUDGETS_FILE_NAME: &str = "purchase_budgets.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ModeShareLimitRaw {
    mode_id: String,
    years: String,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    min_share: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    max_share: Option<f64>,
}

/// Check that a share limit gives at least one bound and that its bounds are in order
fn check_share_bounds(context: &str, min_share: Option<f64>, max_share: Option<f64>) -> Result<()> {
    ensure!(
        min_share.is_some() || max_share.is_some(),
        "{context} must give a min_share, a max_share or both"
    );
    if let (Some(min), Some(max)) = (min_share, max_share) {
        ensure!(
            min <= max,
            "{context}: min_share ({min}) is greater than max_share ({max})"
        );
    }

    Ok(())
}

/// Read limits on the share of tonne-km carried by each mode, if the file exists
pub fn read_mode_share_limits(
    model_dir: &Path,
    modes: &ModeMap,
    temporal: &TemporalIndex,
) -> Result<Vec<ModeShareLimit>> {
    let file_path = model_dir.join(MODE_SHARE_LIMITS_FILE_NAME);
    let iter = read_csv_optional::<ModeShareLimitRaw>(&file_path)?;
    read_mode_share_limits_from_iter(iter, modes, temporal)
        .with_context(|| input_err_msg(&file_path))
}

fn read_mode_share_limits_from_iter<I>(
    iter: I,
    modes: &ModeMap,
    temporal: &TemporalIndex,
) -> Result<Vec<ModeShareLimit>>
where
    I: Iterator<Item = ModeShareLimitRaw>,
{
    let calendar_years = temporal.calendar_years().collect_vec();
    let mut limits = Vec::new();
    for raw in iter {
        let mode_id = modes.get_id_by_str(&raw.mode_id)?;
        let years = parse_year_str(&raw.years, &calendar_years)
            .with_context(|| format!("Invalid years for mode share limit on {mode_id}"))?;
        check_share_bounds(
            &format!("Mode share limit on {mode_id}"),
            raw.min_share,
            raw.max_share,
        )?;

        let represented = years
            .iter()
            .filter(|year| temporal.modeled_years().contains(year))
            .count();
        if represented < years.len() {
            warn!(
                "Mode share limit on {mode_id} is given for years which are not modeled; it will \
                be applied at the modeled year representing each of them"
            );
        }

        limits.push(ModeShareLimit {
            mode: Rc::clone(&modes[&mode_id]),
            years,
            min_share: raw.min_share,
            max_share: raw.max_share,
        });
    }

    Ok(limits)
}

/// The kind of vehicle group in a row of the market share limits file
#[derive(PartialEq, Debug, DeserializeLabeledStringEnum)]
enum GroupType {
    #[string = "tech_vehicle"]
    TechVehicle,
    #[string = "technology"]
    Technology,
    #[string = "vehicle_type"]
    VehicleType,
}

#[derive(PartialEq, Debug, Deserialize)]
struct MarketShareLimitRaw {
    group_type: GroupType,
    group_id: String,
    years: String,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    min_share: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    max_share: Option<f64>,
}

/// Read limits on the share of newly bought vehicles, if the file exists.
///
/// `years` is either "horizon", for a limit on purchases summed over the whole horizon, or a set
/// of calendar years. Calendar years are applied at the modeled year representing them.
pub fn read_market_share_limits(
    model_dir: &Path,
    tech_vehicles: &TechVehicleMap,
    temporal: &TemporalIndex,
) -> Result<Vec<MarketShareLimit>> {
    let file_path = model_dir.join(MARKET_SHARE_LIMITS_FILE_NAME);
    let iter = read_csv_optional::<MarketShareLimitRaw>(&file_path)?;
    read_market_share_limits_from_iter(iter, tech_vehicles, temporal)
        .with_context(|| input_err_msg(&file_path))
}

fn read_market_share_limits_from_iter<I>(
    iter: I,
    tech_vehicles: &TechVehicleMap,
    temporal: &TemporalIndex,
) -> Result<Vec<MarketShareLimit>>
where
    I: Iterator<Item = MarketShareLimitRaw>,
{
    let calendar_years = temporal.calendar_years().collect_vec();
    let mut limits = Vec::new();
    for raw in iter {
        let group = match raw.group_type {
            GroupType::TechVehicle => {
                VehicleGroup::TechVehicle(tech_vehicles.get_id_by_str(&raw.group_id)?)
            }
            GroupType::Technology => VehicleGroup::Technology(raw.group_id),
            GroupType::VehicleType => VehicleGroup::VehicleType(raw.group_id),
        };
        ensure!(
            tech_vehicles.values().any(|vehicle| group.contains(vehicle)),
            "Market share limit on {group} does not match any tech vehicle"
        );
        check_share_bounds(
            &format!("Market share limit on {group}"),
            raw.min_share,
            raw.max_share,
        )?;

        let period = if raw.years.trim().eq_ignore_ascii_case("horizon") {
            SharePeriod::Horizon
        } else {
            let years = parse_year_str(&raw.years, &calendar_years)
                .with_context(|| format!("Invalid years for market share limit on {group}"))?;
            SharePeriod::Years(
                years
                    .into_iter()
                    .filter_map(|year| temporal.representative_year(year))
                    .dedup()
                    .collect(),
            )
        };

        limits.push(MarketShareLimit {
            group,
            period,
            min_share: raw.min_share,
            max_share: raw.max_share,
        });
    }

    Ok(limits)
}

#[derive(PartialEq, Debug, Deserialize)]
struct EmissionLimitRaw {
    #[serde(default)]
    mode_id: Option<String>,
    year: u32,
    limit: f64,
}

/// Read annual emission limits (tCO2/year), if the file exists.
///
/// A row with a blank or missing `mode_id` limits total emissions; otherwise it limits the
/// emissions of that mode alone. Limits are given for calendar years and applied at the modeled
/// year representing them. When several limits fall on the same modeled year, the strictest wins.
///
/// # Returns
///
/// Limits on total emissions and limits on single modes, keyed by modeled year
pub fn read_emission_limits(
    model_dir: &Path,
    modes: &ModeMap,
    temporal: &TemporalIndex,
) -> Result<(EmissionLimitMap, ModeEmissionLimitMap)> {
    let file_path = model_dir.join(EMISSION_LIMITS_FILE_NAME);
    let iter = read_csv_optional::<EmissionLimitRaw>(&file_path)?;
    read_emission_limits_from_iter(iter, modes, temporal)
        .with_context(|| input_err_msg(&file_path))
}

/// Insert `value` for `key`, keeping the smaller value if there is one already
fn insert_strictest<K: Hash + Eq>(map: &mut IndexMap<K, f64>, key: K, value: f64) {
    map.entry(key)
        .and_modify(|current| *current = current.min(value))
        .or_insert(value);
}

fn read_emission_limits_from_iter<I>(
    iter: I,
    modes: &ModeMap,
    temporal: &TemporalIndex,
) -> Result<(EmissionLimitMap, ModeEmissionLimitMap)>
where
    I: Iterator<Item = EmissionLimitRaw>,
{
    let mut total = EmissionLimitMap::new();
    let mut by_mode = ModeEmissionLimitMap::new();
    let mut seen = HashSet::new();
    for raw in iter {
        let mode_id = raw
            .mode_id
            .as_deref()
            .map(|id| modes.get_id_by_str(id))
            .transpose()?;
        let context = match &mode_id {
            Some(mode_id) => format!("Emission limit on {mode_id} for {}", raw.year),
            None => format!("Emission limit for {}", raw.year),
        };
        let modeled_year = temporal
            .representative_year(raw.year)
            .with_context(|| format!("{context} is outside the horizon"))?;
        check_non_negative(&context, [("limit", raw.limit)])?;
        ensure!(
            seen.insert((mode_id.clone(), raw.year)),
            "{context} is given more than once"
        );

        if modeled_year != raw.year {
            warn!("{context} will be applied at modeled year {modeled_year}");
        }
        match mode_id {
            Some(mode_id) => insert_strictest(&mut by_mode, (mode_id, modeled_year), raw.limit),
            None => insert_strictest(&mut total, modeled_year, raw.limit),
        }
    }

    Ok((total, by_mode))
}

#[derive(PartialEq, Debug, Deserialize)]
struct CarbonPriceRaw {
    node_id: String,
    years: String,
    price: f64,
}

/// Read carbon prices (€/tCO2) at nodes, if the file exists
pub fn read_carbon_prices(
    model_dir: &Path,
    nodes: &NodeMap,
    temporal: &TemporalIndex,
) -> Result<CarbonPriceMap> {
    let file_path = model_dir.join(CARBON_PRICES_FILE_NAME);
    let iter = read_csv_optional::<CarbonPriceRaw>(&file_path)?;
    read_carbon_prices_from_iter(iter, nodes, temporal).with_context(|| input_err_msg(&file_path))
}

fn read_carbon_prices_from_iter<I>(
    iter: I,
    nodes: &NodeMap,
    temporal: &TemporalIndex,
) -> Result<CarbonPriceMap>
where
    I: Iterator<Item = CarbonPriceRaw>,
{
    let calendar_years = temporal.calendar_years().collect_vec();
    let mut prices = CarbonPriceMap::new();
    for raw in iter {
        let node_id = nodes.get_id_by_str(&raw.node_id)?;
        let years = parse_year_str(&raw.years, &calendar_years)
            .with_context(|| format!("Invalid years for carbon price at {node_id}"))?;
        check_non_negative(
            &format!("Carbon price at {node_id}"),
            [("price", raw.price)],
        )?;
        for year in years {
            ensure!(
                prices.insert((node_id.clone(), year), raw.price).is_none(),
                "More than one carbon price for {node_id} in {year}"
            );
        }
    }

    Ok(prices)
}

#[derive(PartialEq, Debug, Deserialize)]
struct PurchaseBudgetRaw {
    financial_status_id: String,
    years: String,
    budget: f64,
}

/// Read annual budgets (€/year) for buying vehicles, if the file exists.
///
/// A budget applies to each OD pair of the shipper class separately. Budgets are applied at the
/// modeled year representing each calendar year and the strictest wins.
pub fn read_purchase_budgets(
    model_dir: &Path,
    financial_statuses: &FinancialStatusMap,
    temporal: &TemporalIndex,
) -> Result<PurchaseBudgetMap> {
    let file_path = model_dir.join(PURCHASE_BUDGETS_FILE_NAME);
    let iter = read_csv_optional::<PurchaseBudgetRaw>(&file_path)?;
    read_purchase_budgets_from_iter(iter, financial_statuses, temporal)
        .with_context(|| input_err_msg(&file_path))
}

fn read_purchase_budgets_from_iter<I>(
    iter: I,
    financial_statuses: &FinancialStatusMap,
    temporal: &TemporalIndex,
) -> Result<PurchaseBudgetMap>
where
    I: Iterator<Item = PurchaseBudgetRaw>,
{
    let calendar_years = temporal.calendar_years().collect_vec();
    let mut budgets = PurchaseBudgetMap::new();
    for raw in iter {
        let status_id = financial_statuses.get_id_by_str(&raw.financial_status_id)?;
        let years = parse_year_str(&raw.years, &calendar_years)
            .with_context(|| format!("Invalid years for purchase budget of {status_id}"))?;
        check_non_negative(
            &format!("Purchase budget of {status_id}"),
            [("budget", raw.budget)],
        )?;
        for year in years {
            if let Some(modeled_year) = temporal.representative_year(year) {
                insert_strictest(&mut budgets, (status_id.clone(), modeled_year), raw.budget);
            }
        }
    }

    Ok(budgets)
}
