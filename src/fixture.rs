//! Fixtures for tests

use crate::fuel::{Fuel, FuelingInfrastructure, InfrastructureCost};
use crate::mode::{Mode, ModeParameter};
use crate::model::ModelParameters;
use crate::network::{DrivingRules, Node, NodeMap, Path};
use crate::od_pair::{FinancialStatus, OdPair};
use crate::optimisation::SolverSettings;
use crate::registry::{EntityRegistry, compute_mandatory_breaks};
use crate::temporal::{TemporalConfig, TemporalIndex};
use crate::vehicle::{TechVehicle, TechVehicleParameter};
use crate::year::YearSeries;
use indexmap::indexmap;
use itertools::Itertools;
use rstest::fixture;
use std::path::PathBuf;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Create a node with the given ID and dummy location data
pub fn node(id: &str) -> Rc<Node> {
    Rc::new(Node {
        id: id.into(),
        name: id.to_uppercase(),
        country: "AT".into(),
        latitude: 47.0,
        longitude: 13.0,
    })
}

/// Create a path called "path1" whose nodes lie at the given distances from the origin
pub fn path_with_positions(positions: &[f64]) -> Path {
    let nodes = (0..positions.len())
        .map(|i| node(&format!("n{i}")))
        .collect();
    let distances = std::iter::once(0.0)
        .chain(positions.iter().tuple_windows().map(|(a, b)| b - a))
        .collect();
    let length = positions[positions.len() - 1];

    Path::new("path1".into(), nodes, distances, length).unwrap()
}

#[fixture]
pub fn temporal_config() -> TemporalConfig {
    TemporalConfig {
        y_init: 2020,
        horizon: 10,
        pre_years: 4,
        time_step: 1,
        investment_period: 1,
    }
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        discount_rate: 0.05,
        integer_stock: false,
        enforce_modal_share: true,
        time: TemporalConfig {
            y_init: 2020,
            horizon: 3,
            pre_years: 2,
            time_step: 1,
            investment_period: 1,
        },
        driving: DrivingRules::default(),
        stock_shift: None,
        modal_shift: None,
        solver: SolverSettings::default(),
    }
}

#[fixture]
pub fn electricity() -> Rc<Fuel> {
    Rc::new(Fuel {
        id: "electricity".into(),
        name: "Electricity".into(),
        emission_factor: 100.0,
        cost_per_kwh: YearSeries::constant(2020..=2029, 0.2),
    })
}

#[fixture]
pub fn diesel() -> Rc<Fuel> {
    Rc::new(Fuel {
        id: "diesel".into(),
        name: "Diesel".into(),
        emission_factor: 270.0,
        cost_per_kwh: YearSeries::constant(2020..=2029, 0.1),
    })
}

#[fixture]
pub fn charger(electricity: Rc<Fuel>) -> FuelingInfrastructure {
    let cost = InfrastructureCost {
        cost_per_kw: 500.0,
        cost_per_kwh: 0.05,
        om_cost: 10.0,
    };
    FuelingInfrastructure {
        id: "charger".into(),
        fuel: electricity,
        fueling_power: 150.0,
        max_occupancy: 0.5,
        costs: (2020..=2029).map(|year| (year, cost.clone())).collect(),
    }
}

#[fixture]
pub fn vehicle_parameter() -> TechVehicleParameter {
    TechVehicleParameter {
        capital_cost: 150_000.0,
        maintenance_annual: 5000.0,
        maintenance_distance: 0.1,
        payload: 25.0,
        annual_range: 100_000.0,
        spec_consumption: 1.2,
        tank_capacity: 600.0,
        peak_fueling: 350.0,
        lifetime: 10,
        subsidy: 0.0,
    }
}

fn mode(id: &str, quantify_by_vehicles: bool, parameter: &ModeParameter) -> Rc<Mode> {
    Rc::new(Mode {
        id: id.into(),
        name: id.to_uppercase(),
        quantify_by_vehicles,
        infrastructure_limited: false,
        parameters: (2020..=2029)
            .map(|year| (year, parameter.clone()))
            .collect(),
    })
}

/// A small model: one OD pair served by a battery-electric truck, a diesel truck and rail.
///
/// The single path runs A -> B -> C with 300 km segments. Chargers can only be built at B.
#[fixture]
pub fn registry(
    model_parameters: ModelParameters,
    electricity: Rc<Fuel>,
    diesel: Rc<Fuel>,
    charger: FuelingInfrastructure,
    vehicle_parameter: TechVehicleParameter,
) -> EntityRegistry {
    let temporal = TemporalIndex::new(&model_parameters.time).unwrap();
    let nodes: NodeMap = indexmap! {
        "A".into() => node("A"),
        "B".into() => node("B"),
        "C".into() => node("C"),
    };
    let path = Rc::new(
        Path::new(
            "path1".into(),
            nodes.values().cloned().collect(),
            vec![0.0, 300.0, 300.0],
            600.0,
        )
        .unwrap(),
    );
    let financial_status = Rc::new(FinancialStatus {
        id: "fs1".into(),
        name: "Default".into(),
        value_of_time: 1.0,
    });
    let od_pair = Rc::new(OdPair {
        id: "od1".into(),
        origin: Rc::clone(&nodes["A"]),
        destination: Rc::clone(&nodes["C"]),
        product: "goods".into(),
        financial_status: Rc::clone(&financial_status),
        paths: vec![Rc::clone(&path)],
        demand: YearSeries::constant(2020..=2022, 10_000.0),
    });

    let road = mode(
        "road",
        true,
        &ModeParameter {
            cost_per_ukm: 0.0,
            emission_factor: 0.0,
            waiting_time: 0.5,
            infrastructure_expansion_cost: 0.0,
            infrastructure_om_cost: 0.0,
        },
    );
    let rail = mode(
        "rail",
        false,
        &ModeParameter {
            cost_per_ukm: 0.05,
            emission_factor: 20.0,
            waiting_time: 5.0,
            infrastructure_expansion_cost: 0.01,
            infrastructure_om_cost: 0.001,
        },
    );

    let generations = temporal.generation_years();
    let bev = Rc::new(TechVehicle {
        id: "bev".into(),
        name: "Battery-electric truck".into(),
        mode: Rc::clone(&road),
        fuel: Rc::clone(&electricity),
        product: "goods".into(),
        technology: "battery_electric".into(),
        vehicle_type: "truck".into(),
        speed: 80.0,
        parameters: generations
            .clone()
            .map(|generation| (generation, vehicle_parameter.clone()))
            .collect(),
    });
    let diesel_parameter = TechVehicleParameter {
        capital_cost: 100_000.0,
        spec_consumption: 3.0,
        tank_capacity: 10_000.0,
        peak_fueling: 1000.0,
        ..vehicle_parameter
    };
    let diesel_truck = Rc::new(TechVehicle {
        id: "diesel".into(),
        name: "Diesel truck".into(),
        mode: Rc::clone(&road),
        fuel: Rc::clone(&diesel),
        product: "goods".into(),
        technology: "diesel".into(),
        vehicle_type: "truck".into(),
        speed: 80.0,
        parameters: generations
            .map(|generation| (generation, diesel_parameter.clone()))
            .collect(),
    });

    let od_pairs = indexmap! { od_pair.id.clone() => od_pair };
    let tech_vehicles = indexmap! {
        bev.id.clone() => bev,
        diesel_truck.id.clone() => diesel_truck,
    };
    let breaks = compute_mandatory_breaks(&od_pairs, &tech_vehicles, &model_parameters.driving);

    EntityRegistry {
        model_path: PathBuf::from("model"),
        parameters: model_parameters,
        temporal,
        nodes,
        paths: indexmap! { path.id.clone() => path },
        financial_statuses: indexmap! { financial_status.id.clone() => financial_status },
        od_pairs,
        modes: indexmap! { road.id.clone() => road, rail.id.clone() => rail },
        fuels: indexmap! {
            electricity.id.clone() => electricity,
            diesel.id.clone() => diesel,
        },
        infrastructures: indexmap! { charger.id.clone() => Rc::new(charger) },
        tech_vehicles,
        initial_vehicle_stock: indexmap! { ("od1".into(), "diesel".into(), 2019) => 5.0 },
        initial_fueling_infrastructure: indexmap! { ("charger".into(), "B".into()) => 0.0 },
        initial_mode_infrastructure: indexmap! {},
        mode_share_limits: Vec::new(),
        market_share_limits: Vec::new(),
        emission_limits: indexmap! {},
        mode_emission_limits: indexmap! {},
        carbon_prices: indexmap! {},
        purchase_budgets: indexmap! {},
        breaks,
    }
}
