//! Code for reading nodes and paths from CSV files.
use super::*;
use crate::id::IDCollection;
use crate::network::{Node, NodeMap, Path as NetworkPath, PathID, PathMap};
use serde::Deserialize;

const NODES_FILE_NAME: &str = "nodes.csv";
const PATHS_FILE_NAME: &str = "paths.csv";
const PATH_NODES_FILE_NAME: &str = "path_nodes.csv";

/// Reads nodes from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of nodes keyed by ID, in file order
pub fn read_nodes(model_dir: &Path) -> Result<NodeMap> {
    let file_path = model_dir.join(NODES_FILE_NAME);
    let nodes: NodeMap = read_csv_id_file::<Node, _>(&file_path)?;
    for node in nodes.values() {
        ensure!(
            (-90.0..=90.0).contains(&node.latitude) && (-180.0..=180.0).contains(&node.longitude),
            "{}: Node {} has invalid coordinates",
            input_err_msg(&file_path),
            node.id
        );
    }

    Ok(nodes)
}

#[derive(PartialEq, Debug, Deserialize)]
struct PathRaw {
    id: PathID,
    length: f64,
}

#[derive(PartialEq, Debug, Deserialize)]
struct PathNodeRaw {
    path_id: String,
    node_id: String,
    distance_from_previous: f64,
}

/// Read paths and the nodes along them.
///
/// The order of rows in `path_nodes.csv` gives the order of nodes along each path. Whether the
/// segment distances add up to the declared length is checked later, together with the other
/// structural checks.
pub fn read_paths(model_dir: &Path, nodes: &NodeMap) -> Result<PathMap> {
    let paths_file = model_dir.join(PATHS_FILE_NAME);
    let raw_paths = read_csv::<PathRaw>(&paths_file)?;
    let path_nodes_file = model_dir.join(PATH_NODES_FILE_NAME);
    let path_nodes = read_csv::<PathNodeRaw>(&path_nodes_file)?;

    read_paths_from_iter(raw_paths, path_nodes, nodes)
        .with_context(|| input_err_msg(&path_nodes_file))
}

fn read_paths_from_iter<I, J>(raw_paths: I, path_nodes: J, nodes: &NodeMap) -> Result<PathMap>
where
    I: Iterator<Item = PathRaw>,
    J: Iterator<Item = PathNodeRaw>,
{
    let mut sequences: IndexMap<PathID, (f64, Vec<Rc<Node>>, Vec<f64>)> = IndexMap::new();
    for raw in raw_paths {
        ensure!(
            raw.length.is_finite() && raw.length > 0.0,
            "Path {} must have a positive length",
            raw.id
        );
        let existing = sequences
            .insert(raw.id.clone(), (raw.length, Vec::new(), Vec::new()))
            .is_some();
        ensure!(!existing, "Duplicate path ID found: {}", raw.id);
    }

    for row in path_nodes {
        let id = sequences.get_id_by_str(&row.path_id)?;
        let node_id = nodes.get_id_by_str(&row.node_id)?;
        let (_, path_nodes, distances) = &mut sequences[&id];
        path_nodes.push(Rc::clone(&nodes[&node_id]));
        distances.push(row.distance_from_previous);
    }

    sequences
        .into_iter()
        .map(|(id, (length, path_nodes, distances))| {
            let path = NetworkPath::new(id.clone(), path_nodes, distances, length)?;
            Ok((id, Rc::new(path)))
        })
        .collect()
}
