//! The transport network: geographic nodes, candidate paths between them and the mandatory rest
//! breaks a road vehicle must take along a path.
use crate::id::{define_id_getter, define_id_type};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::rc::Rc;

define_id_type! {NodeID}
define_id_type! {PathID}

/// Distances (in km) closer than this are treated as equal when comparing positions along a path
pub const POSITION_TOLERANCE: f64 = 1e-6;

/// A map of [`Node`]s, keyed by node ID
pub type NodeMap = IndexMap<NodeID, Rc<Node>>;

/// A map of [`Path`]s, keyed by path ID
pub type PathMap = IndexMap<PathID, Rc<Path>>;

/// A location in the network at which vehicles can refuel or recharge
#[derive(Debug, Deserialize, PartialEq)]
pub struct Node {
    /// Unique identifier for the node
    pub id: NodeID,
    /// Human-readable name
    pub name: String,
    /// The country the node lies in
    pub country: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}
define_id_getter! {Node, NodeID}

/// A sequence of nodes which a route can follow between an origin and a destination
#[derive(Debug, PartialEq)]
pub struct Path {
    /// Unique identifier for the path
    pub id: PathID,
    /// The nodes in order of travel
    pub nodes: Vec<Rc<Node>>,
    /// Distance (km) from the previous node. The first entry is always zero.
    pub distance_from_previous: Vec<f64>,
    /// Distance (km) from the first node
    pub cumulative_distance: Vec<f64>,
    /// Declared total length of the path (km)
    pub length: f64,
}
define_id_getter! {Path, PathID}

impl Path {
    /// Create a new path from its nodes and segment distances.
    ///
    /// The path must contain at least two nodes and the first segment distance must be zero.
    pub fn new(
        id: PathID,
        nodes: Vec<Rc<Node>>,
        distance_from_previous: Vec<f64>,
        length: f64,
    ) -> Result<Self> {
        ensure!(
            nodes.len() >= 2,
            "Path {id} must contain at least two nodes"
        );
        ensure!(
            nodes.len() == distance_from_previous.len(),
            "Path {id} has a different number of nodes and distances"
        );
        ensure!(
            distance_from_previous[0] == 0.0,
            "The first node of path {id} must have a distance of zero"
        );
        ensure!(
            distance_from_previous
                .iter()
                .all(|d| d.is_finite() && *d >= 0.0),
            "Distances on path {id} must be finite and non-negative"
        );

        let cumulative_distance = distance_from_previous
            .iter()
            .scan(0.0, |total, distance| {
                *total += distance;
                Some(*total)
            })
            .collect();

        Ok(Self {
            id,
            nodes,
            distance_from_previous,
            cumulative_distance,
            length,
        })
    }

    /// The number of nodes on the path
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The first node
    pub fn origin(&self) -> &Rc<Node> {
        &self.nodes[0]
    }

    /// The last node
    pub fn destination(&self) -> &Rc<Node> {
        &self.nodes[self.nodes.len() - 1]
    }

    /// The sum of the segment distances
    pub fn segment_total(&self) -> f64 {
        self.cumulative_distance[self.cumulative_distance.len() - 1]
    }

    /// Check that the segment distances add up to the declared length
    pub fn check_length(&self) -> Result<()> {
        let total = self.segment_total();
        ensure!(
            (total - self.length).abs() <= POSITION_TOLERANCE,
            "Path {}: segment distances sum to {total} km but the declared length is {} km",
            self.id,
            self.length
        );

        Ok(())
    }

    /// Iterate over the indexes of nodes after the origin, i.e. the nodes a vehicle arrives at
    pub fn arrival_indexes(&self) -> std::ops::Range<usize> {
        1..self.nodes.len()
    }
}

/// The index of the last node on `path` lying at or before `distance` km from the origin.
///
/// A node exactly at `distance` (within [`POSITION_TOLERANCE`]) counts as being before it. The
/// origin is always at distance zero, so the result is at least zero.
pub fn latest_node_at_or_before(path: &Path, distance: f64) -> usize {
    path.cumulative_distance
        .iter()
        .rposition(|position| *position <= distance + POSITION_TOLERANCE)
        .unwrap_or(0)
}

/// The EU-style driving regulation applied to fleet vehicles
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrivingRules {
    /// Maximum driving time (hours) allowed before a break must be taken
    pub max_driving_time: f64,
    /// Length of a mandatory break (hours)
    pub break_duration: f64,
}

impl Default for DrivingRules {
    fn default() -> Self {
        Self {
            max_driving_time: 4.5,
            break_duration: 0.75,
        }
    }
}

/// Slack added before rounding down the number of required breaks
const BREAK_COUNT_EPSILON: f64 = 1e-9;

/// A rest break which a vehicle must have taken by the time it reaches a node on a path
#[derive(Debug, Clone, PartialEq)]
pub struct MandatoryBreak {
    /// Which break this is (starting from 1)
    pub number: u32,
    /// The index of the node on the path by which the break must have been taken
    pub node_index: usize,
    /// Distance from the origin to that node (km)
    pub cumulative_distance: f64,
    /// Driving time from the origin to that node (hours)
    pub driving_time: f64,
    /// Minimum elapsed time on arrival at the node, including all breaks so far (hours)
    pub time_with_breaks: f64,
}

/// Compute the mandatory breaks for a vehicle travelling along `path` at `speed` km/h.
///
/// The number of breaks is the total driving time divided by the maximum driving time, rounded
/// down. Break `n` is anchored at the latest node the vehicle reaches before it has driven for
/// `n` times the maximum driving time. A break is never anchored at the origin.
pub fn mandatory_breaks(path: &Path, speed: f64, rules: &DrivingRules) -> Vec<MandatoryBreak> {
    let total_driving_time = path.length / speed;
    let num_breaks = (total_driving_time / rules.max_driving_time + BREAK_COUNT_EPSILON).floor();

    (1..=num_breaks as u32)
        .map(|number| {
            let threshold = f64::from(number) * rules.max_driving_time * speed;
            let node_index = latest_node_at_or_before(path, threshold).max(1);
            let cumulative_distance = path.cumulative_distance[node_index];
            let driving_time = cumulative_distance / speed;

            MandatoryBreak {
                number,
                node_index,
                cumulative_distance,
                driving_time,
                time_with_breaks: driving_time + f64::from(number) * rules.break_duration,
            }
        })
        .collect()
}
