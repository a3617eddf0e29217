//! Code for reading tech vehicles and their per-generation parameters.
use super::*;
use crate::fuel::FuelMap;
use crate::id::IDCollection;
use crate::mode::ModeMap;
use crate::vehicle::{
    TechVehicle, TechVehicleID, TechVehicleMap, TechVehicleParameter, TechVehicleParameterMap,
};
use crate::year::parse_year_str;
use serde::Deserialize;

const TECH_VEHICLES_FILE_NAME: &str = "tech_vehicles.csv";
const TECH_VEHICLE_PARAMETERS_FILE_NAME: &str = "tech_vehicle_parameters.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TechVehicleRaw {
    id: TechVehicleID,
    name: String,
    mode_id: String,
    fuel_id: String,
    product: String,
    #[serde(default)]
    technology: Option<String>,
    #[serde(default)]
    vehicle_type: Option<String>,
    speed: f64,
}

#[derive(PartialEq, Debug, Deserialize)]
struct TechVehicleParameterRaw {
    tech_vehicle_id: String,
    generations: String,
    capital_cost: f64,
    maintenance_annual: f64,
    maintenance_distance: f64,
    payload: f64,
    annual_range: f64,
    spec_consumption: f64,
    tank_capacity: f64,
    peak_fueling: f64,
    lifetime: u32,
    #[serde(default)]
    subsidy: f64,
}

impl TechVehicleParameterRaw {
    fn into_parameter(self) -> Result<TechVehicleParameter> {
        let context = format!("Tech vehicle {}", self.tech_vehicle_id);
        check_non_negative(
            &context,
            [
                ("capital_cost", self.capital_cost),
                ("maintenance_annual", self.maintenance_annual),
                ("maintenance_distance", self.maintenance_distance),
                ("subsidy", self.subsidy),
            ],
        )?;
        check_positive(
            &context,
            [
                ("payload", self.payload),
                ("annual_range", self.annual_range),
                ("spec_consumption", self.spec_consumption),
                ("tank_capacity", self.tank_capacity),
                ("peak_fueling", self.peak_fueling),
            ],
        )?;
        ensure!(self.lifetime > 0, "{context}: lifetime must be greater than zero");
        ensure!(
            self.subsidy <= self.capital_cost,
            "{context}: subsidy ({}) cannot exceed capital_cost ({})",
            self.subsidy,
            self.capital_cost
        );

        Ok(TechVehicleParameter {
            capital_cost: self.capital_cost,
            maintenance_annual: self.maintenance_annual,
            maintenance_distance: self.maintenance_distance,
            payload: self.payload,
            annual_range: self.annual_range,
            spec_consumption: self.spec_consumption,
            tank_capacity: self.tank_capacity,
            peak_fueling: self.peak_fueling,
            lifetime: self.lifetime,
            subsidy: self.subsidy,
        })
    }
}

/// Read tech vehicles and their parameters for every purchase generation.
///
/// Generations run from the first pre-horizon year to the end of the horizon, so vehicles bought
/// before the horizon starts have parameters too.
pub fn read_tech_vehicles(
    model_dir: &Path,
    modes: &ModeMap,
    fuels: &FuelMap,
    temporal: &TemporalIndex,
) -> Result<TechVehicleMap> {
    let vehicles_file = model_dir.join(TECH_VEHICLES_FILE_NAME);
    let vehicles = read_csv::<TechVehicleRaw>(&vehicles_file)?;
    let parameters_file = model_dir.join(TECH_VEHICLE_PARAMETERS_FILE_NAME);
    let parameters = read_csv::<TechVehicleParameterRaw>(&parameters_file)?;

    read_tech_vehicles_from_iter(vehicles, parameters, modes, fuels, temporal)
        .with_context(|| input_err_msg(&parameters_file))
}

fn read_tech_vehicles_from_iter<I, J>(
    vehicles: I,
    parameters: J,
    modes: &ModeMap,
    fuels: &FuelMap,
    temporal: &TemporalIndex,
) -> Result<TechVehicleMap>
where
    I: Iterator<Item = TechVehicleRaw>,
    J: Iterator<Item = TechVehicleParameterRaw>,
{
    let mut raw_vehicles = IndexMap::new();
    for raw in vehicles {
        check_positive(&format!("Tech vehicle {}", raw.id), [("speed", raw.speed)])?;
        let id = raw.id.clone();
        ensure!(
            raw_vehicles.insert(id.clone(), raw).is_none(),
            "Duplicate ID found: {id}"
        );
    }

    let generation_years = temporal.generation_years().collect_vec();
    let mut parameter_maps: HashMap<TechVehicleID, TechVehicleParameterMap> = HashMap::new();
    for raw in parameters {
        let id = raw_vehicles.get_id_by_str(&raw.tech_vehicle_id)?;
        let generations = parse_year_str(&raw.generations, &generation_years)
            .with_context(|| format!("Invalid generations for tech vehicle {id}"))?;
        let parameter = raw.into_parameter()?;
        let map = parameter_maps.entry(id.clone()).or_default();
        insert_for_years(map, &format!("tech vehicle {id}"), &generations, &parameter)?;
    }

    let mut tech_vehicles = TechVehicleMap::new();
    for (id, raw) in raw_vehicles {
        let mode_id = modes.get_id_by_str(&raw.mode_id)?;
        let mode = &modes[&mode_id];
        ensure!(
            mode.quantify_by_vehicles,
            "Tech vehicle {id} uses mode {mode_id}, which is not quantified by vehicles"
        );
        let fuel_id = fuels.get_id_by_str(&raw.fuel_id)?;
        let technology = raw.technology.unwrap_or_else(|| fuel_id.to_string());
        let vehicle_type = raw.vehicle_type.unwrap_or_else(|| mode_id.to_string());
        let parameters = parameter_maps.remove(&id).unwrap_or_default();
        check_years_covered(
            &parameters,
            &format!("tech vehicle {id}"),
            temporal.generation_years(),
        )?;

        let vehicle = TechVehicle {
            id: id.clone(),
            name: raw.name,
            mode: Rc::clone(mode),
            fuel: Rc::clone(&fuels[&fuel_id]),
            product: raw.product.as_str().into(),
            technology,
            vehicle_type,
            speed: raw.speed,
            parameters,
        };
        tech_vehicles.insert(id, Rc::new(vehicle));
    }

    Ok(tech_vehicles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, diesel, registry};
    use crate::fuel::Fuel;
    use crate::registry::EntityRegistry;
    use indexmap::indexmap;
    use rstest::rstest;

    fn vehicle_raw(mode_id: &str) -> TechVehicleRaw {
        TechVehicleRaw {
            id: "truck".into(),
            name: "Truck".into(),
            mode_id: mode_id.into(),
            fuel_id: "diesel".into(),
            product: "goods".into(),
            technology: None,
            vehicle_type: None,
            speed: 80.0,
        }
    }

    fn parameter_raw(generations: &str, lifetime: u32) -> TechVehicleParameterRaw {
        TechVehicleParameterRaw {
            tech_vehicle_id: "truck".into(),
            generations: generations.into(),
            capital_cost: 100_000.0,
            maintenance_annual: 5000.0,
            maintenance_distance: 0.1,
            payload: 25.0,
            annual_range: 100_000.0,
            spec_consumption: 3.0,
            tank_capacity: 10_000.0,
            peak_fueling: 1000.0,
            lifetime,
            subsidy: 0.0,
        }
    }

    fn read(
        registry: &EntityRegistry,
        diesel: Rc<Fuel>,
        vehicles: Vec<TechVehicleRaw>,
        parameters: Vec<TechVehicleParameterRaw>,
    ) -> Result<TechVehicleMap> {
        let fuels = indexmap! { diesel.id.clone() => diesel };
        read_tech_vehicles_from_iter(
            vehicles.into_iter(),
            parameters.into_iter(),
            &registry.modes,
            &fuels,
            &registry.temporal,
        )
    }

    #[rstest]
    fn test_read_tech_vehicles_from_iter(registry: EntityRegistry, diesel: Rc<Fuel>) {
        // Generations cover the two pre-horizon years as well as the horizon
        let vehicles = read(
            &registry,
            diesel,
            vec![vehicle_raw("road")],
            vec![parameter_raw("2018..2019", 12), parameter_raw("2020..2022", 10)],
        )
        .unwrap();

        let truck = &vehicles["truck"];
        assert_eq!(truck.parameter(2018).lifetime, 12);
        assert_eq!(truck.parameter(2022).lifetime, 10);
        assert_eq!(truck.mode.id.to_string(), "road");

        // Technology and vehicle type default to the fuel and mode
        assert_eq!(truck.technology, "diesel");
        assert_eq!(truck.vehicle_type, "road");
    }

    #[rstest]
    fn test_read_tech_vehicles_levelized_mode(registry: EntityRegistry, diesel: Rc<Fuel>) {
        assert_error!(
            read(
                &registry,
                diesel,
                vec![vehicle_raw("rail")],
                vec![parameter_raw("all", 10)]
            ),
            "Tech vehicle truck uses mode rail, which is not quantified by vehicles"
        );
    }

    #[rstest]
    fn test_read_tech_vehicles_zero_lifetime(registry: EntityRegistry, diesel: Rc<Fuel>) {
        assert_error!(
            read(
                &registry,
                diesel,
                vec![vehicle_raw("road")],
                vec![parameter_raw("all", 0)]
            ),
            "Tech vehicle truck: lifetime must be greater than zero"
        );
    }

    #[rstest]
    fn test_read_tech_vehicles_missing_generation(registry: EntityRegistry, diesel: Rc<Fuel>) {
        assert_error!(
            read(
                &registry,
                diesel,
                vec![vehicle_raw("road")],
                vec![parameter_raw("2020..2022", 10)]
            ),
            "No entry for tech vehicle truck in years: 2018, 2019"
        );
    }
}
