//! Small models written to disk for integration tests.
#![allow(dead_code)]
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the path to the bundled example model
pub fn corridor_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("corridor")
}

/// A single-year, single-OD-pair model with a diesel truck on road.
///
/// Files can be replaced before the model is written out.
pub struct TestModel {
    files: BTreeMap<&'static str, String>,
}

impl TestModel {
    /// Freight from the first to the last of `nodes`, given with their distance from the previous
    /// node. Demand is 10,000 t a year.
    pub fn new(nodes: &[(&str, f64)]) -> Self {
        let length: f64 = nodes.iter().map(|(_, distance)| distance).sum();
        let origin = nodes[0].0;
        let destination = nodes[nodes.len() - 1].0;

        let mut files = BTreeMap::new();
        files.insert(
            "model.toml",
            "discount_rate = 0.0\n\n[time]\ny_init = 2030\nhorizon = 1\n".to_string(),
        );
        files.insert(
            "nodes.csv",
            std::iter::once("id,name,country,latitude,longitude".to_string())
                .chain(
                    nodes
                        .iter()
                        .map(|(id, _)| format!("{id},{id},XX,50.0,10.0")),
                )
                .join("\n"),
        );
        files.insert("paths.csv", format!("id,length\np1,{length}"));
        files.insert(
            "path_nodes.csv",
            std::iter::once("path_id,node_id,distance_from_previous".to_string())
                .chain(
                    nodes
                        .iter()
                        .map(|(id, distance)| format!("p1,{id},{distance}")),
                )
                .join("\n"),
        );
        files.insert(
            "financial_status.csv",
            "id,name,value_of_time\nstd,Standard,1.0".to_string(),
        );
        files.insert(
            "od_pairs.csv",
            format!(
                "id,origin,destination,product,financial_status,paths\n\
                od1,{origin},{destination},goods,std,p1"
            ),
        );
        files.insert(
            "od_pair_demand.csv",
            "od_pair_id,year,demand\nod1,2030,10000".to_string(),
        );
        files.insert(
            "modes.csv",
            "id,name,quantify_by_vehicles\nroad,Road,true".to_string(),
        );
        files.insert(
            "mode_parameters.csv",
            "mode_id,years,cost_per_ukm,emission_factor,waiting_time\nroad,all,0,0,0.5".to_string(),
        );
        files.insert(
            "fuels.csv",
            "id,name,emission_factor\ndiesel,Diesel,270".to_string(),
        );
        files.insert(
            "fuel_costs.csv",
            "fuel_id,years,cost_per_kwh\ndiesel,all,0.1".to_string(),
        );
        files.insert(
            "tech_vehicles.csv",
            "id,name,mode_id,fuel_id,product,speed\n\
            diesel,Diesel truck,road,diesel,goods,80"
                .to_string(),
        );
        files.insert(
            "tech_vehicle_parameters.csv",
            "tech_vehicle_id,generations,capital_cost,maintenance_annual,maintenance_distance,\
            payload,annual_range,spec_consumption,tank_capacity,peak_fueling,lifetime\n\
            diesel,all,100000,5000,0.1,25,100000,3,10000,10000,10"
                .to_string(),
        );

        Self { files }
    }

    /// Add rail as a levelized mode with the given cost per tonne-km
    pub fn with_rail(mut self, cost_per_ukm: f64) -> Self {
        self.files.insert(
            "modes.csv",
            "id,name,quantify_by_vehicles\nroad,Road,true\nrail,Rail,false".to_string(),
        );
        self.files.insert(
            "mode_parameters.csv",
            format!(
                "mode_id,years,cost_per_ukm,emission_factor,waiting_time\n\
                road,all,0,0,0.5\n\
                rail,all,{cost_per_ukm},20,5"
            ),
        );
        self
    }

    /// Add or replace a file
    pub fn with_file(mut self, file_name: &'static str, contents: &str) -> Self {
        self.files.insert(file_name, contents.to_string());
        self
    }

    /// Write the model's files to `dir`
    pub fn write(&self, dir: &Path) {
        for (file_name, contents) in &self.files {
            fs::write(dir.join(file_name), format!("{contents}\n")).unwrap();
        }
    }
}
