// src/map/loader.rs

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{CoordError, Result};
use crate::map::graph::TopoMap;

/// Topological map as read from TOML.
///
/// ```toml
/// [[node]]
/// name = "WayPoint1"
/// x = 0.0
/// y = 0.0
///
/// [[edge]]
/// from = "WayPoint1"
/// to = "WayPoint2"
/// # optional: id = "wp1_wp2", distance = 3.5
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MapFile {
    #[serde(default)]
    pub node: Vec<NodeSpec>,

    #[serde(default)]
    pub edge: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Falls back to the Euclidean distance between the two nodes.
    #[serde(default)]
    pub distance: Option<f64>,
    /// Also add the reverse edge `to -> from`.
    #[serde(default)]
    pub bidirectional: bool,
}

impl TryFrom<MapFile> for TopoMap {
    type Error = CoordError;

    fn try_from(file: MapFile) -> std::result::Result<Self, Self::Error> {
        if file.node.is_empty() {
            return Err(CoordError::MapError(
                "map must contain at least one [[node]]".to_string(),
            ));
        }

        let mut map = TopoMap::new();
        for node in file.node {
            map.add_node(node.name, node.x, node.y)?;
        }
        for edge in file.edge {
            map.add_edge(&edge.from, &edge.to, edge.id.clone(), edge.distance)?;
            if edge.bidirectional {
                let reverse_id = edge.id.map(|id| format!("{id}_rev"));
                map.add_edge(&edge.to, &edge.from, reverse_id, edge.distance)?;
            }
        }
        Ok(map)
    }
}

/// Read and validate a map file.
pub fn load_map(path: impl AsRef<Path>) -> Result<TopoMap> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let file: MapFile = toml::from_str(&contents)?;
    let map = TopoMap::try_from(file)?;
    debug!(
        ?path,
        nodes = map.node_count(),
        edges = map.edge_count(),
        "loaded topological map"
    );
    Ok(map)
}
