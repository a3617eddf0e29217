//! Code for reading transport modes and their annual parameters.
use super::*;
use crate::id::IDCollection;
use crate::mode::{Mode, ModeID, ModeMap, ModeParameter, ModeParameterMap};
use crate::year::parse_year_str;
use serde::Deserialize;

const MODES_FILE_NAME: &str = "modes.csv";
const MODE_PARAMETERS_FILE_NAME: &str = "mode_parameters.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ModeRaw {
    id: ModeID,
    name: String,
    quantify_by_vehicles: bool,
    #[serde(default)]
    infrastructure_limited: bool,
}

#[derive(PartialEq, Debug, Deserialize)]
struct ModeParameterRaw {
    mode_id: String,
    years: String,
    cost_per_ukm: f64,
    emission_factor: f64,
    waiting_time: f64,
    #[serde(default)]
    infrastructure_expansion_cost: f64,
    #[serde(default)]
    infrastructure_om_cost: f64,
}

impl ModeParameterRaw {
    fn into_parameter(self) -> Result<ModeParameter> {
        check_non_negative(
            &format!("Mode {}", self.mode_id),
            [
                ("cost_per_ukm", self.cost_per_ukm),
                ("emission_factor", self.emission_factor),
                ("waiting_time", self.waiting_time),
                (
                    "infrastructure_expansion_cost",
                    self.infrastructure_expansion_cost,
                ),
                ("infrastructure_om_cost", self.infrastructure_om_cost),
            ],
        )?;

        Ok(ModeParameter {
            cost_per_ukm: self.cost_per_ukm,
            emission_factor: self.emission_factor,
            waiting_time: self.waiting_time,
            infrastructure_expansion_cost: self.infrastructure_expansion_cost,
            infrastructure_om_cost: self.infrastructure_om_cost,
        })
    }
}

/// Read modes and their parameters for every calendar year of the horizon
pub fn read_modes(model_dir: &Path, temporal: &TemporalIndex) -> Result<ModeMap> {
    let modes_file = model_dir.join(MODES_FILE_NAME);
    let modes = read_csv::<ModeRaw>(&modes_file)?;
    let parameters_file = model_dir.join(MODE_PARAMETERS_FILE_NAME);
    let parameters = read_csv::<ModeParameterRaw>(&parameters_file)?;

    read_modes_from_iter(modes, parameters, temporal)
        .with_context(|| input_err_msg(&parameters_file))
}

fn read_modes_from_iter<I, J>(modes: I, parameters: J, temporal: &TemporalIndex) -> Result<ModeMap>
where
    I: Iterator<Item = ModeRaw>,
    J: Iterator<Item = ModeParameterRaw>,
{
    let raw_modes: IndexMap<ModeID, ModeRaw> = modes.map(|raw| (raw.id.clone(), raw)).collect();
    let calendar_years = temporal.calendar_years().collect_vec();

    let mut parameter_maps: HashMap<ModeID, ModeParameterMap> = HashMap::new();
    for raw in parameters {
        let id = raw_modes.get_id_by_str(&raw.mode_id)?;
        let years = parse_year_str(&raw.years, &calendar_years)
            .with_context(|| format!("Invalid years for mode {id}"))?;
        let parameter = raw.into_parameter()?;
        let map = parameter_maps.entry(id.clone()).or_default();
        insert_for_years(map, &format!("mode {id}"), &years, &parameter)?;
    }

    let mut modes = ModeMap::new();
    for (id, raw) in raw_modes {
        let parameters = parameter_maps.remove(&id).unwrap_or_default();
        check_years_covered(&parameters, &format!("mode {id}"), temporal.calendar_years())?;
        ensure!(
            !(raw.quantify_by_vehicles && raw.infrastructure_limited),
            "Mode {id}: only levelized modes can be infrastructure_limited"
        );

        let mode = Mode {
            id: id.clone(),
            name: raw.name,
            quantify_by_vehicles: raw.quantify_by_vehicles,
            infrastructure_limited: raw.infrastructure_limited,
            parameters,
        };
        modes.insert(id, Rc::new(mode));
    }

    Ok(modes)
}
