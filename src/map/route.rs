// src/map/route.rs

use crate::types::{EdgeId, NodeId};

/// A planned route: ordered nodes (start .. goal), the edges between them and
/// the per-edge distances.
///
/// Non-empty routes satisfy `nodes.len() == edges.len() + 1`. An empty route
/// means "no route this tick".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub distances: Vec<f64>,
}

impl Route {
    /// Single-node route pinning an agent to where it stands.
    pub fn stub(node: impl Into<NodeId>) -> Self {
        Self {
            nodes: vec![node.into()],
            edges: Vec::new(),
            distances: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn start(&self) -> Option<&str> {
        self.nodes.first().map(|s| s.as_str())
    }

    pub fn goal(&self) -> Option<&str> {
        self.nodes.last().map(|s| s.as_str())
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    pub fn total_distance(&self) -> f64 {
        self.distances.iter().sum()
    }

    /// Remaining route distance from the start to the first occurrence of
    /// `node`. Nodes not on the route are as far as the whole route.
    pub fn distance_to(&self, node: &str) -> f64 {
        self.nodes
            .iter()
            .zip(self.distances.iter())
            .take_while(|(n, _)| n.as_str() != node)
            .map(|(_, d)| *d)
            .sum()
    }
}

/// One clearance window of a route, executed without re-checking contention.
///
/// `nodes` includes both end points; adjacent fragments share their boundary
/// node. A fragment without edges is a hold: the robot stays where it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteFragment {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl RouteFragment {
    pub fn hold(node: impl Into<NodeId>) -> Self {
        Self {
            nodes: vec![node.into()],
            edges: Vec::new(),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn start(&self) -> Option<&str> {
        self.nodes.first().map(|s| s.as_str())
    }

    pub fn end(&self) -> Option<&str> {
        self.nodes.last().map(|s| s.as_str())
    }
}

/// Concatenate fragments back into the route they were cut from, dropping
/// the duplicated boundary node at the start of every fragment but the first.
pub fn reconstruct_nodes(fragments: &[RouteFragment]) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    for (i, fragment) in fragments.iter().enumerate() {
        let skip = if i == 0 { 0 } else { 1 };
        nodes.extend(fragment.nodes.iter().skip(skip).cloned());
    }
    nodes
}

/// Node position for route visualisation.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePose {
    pub node: NodeId,
    pub x: f64,
    pub y: f64,
}
