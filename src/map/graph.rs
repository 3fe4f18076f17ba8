// src/map/graph.rs

use std::collections::HashMap;

use petgraph::algo::{astar, has_path_connecting};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use tracing::trace;

use crate::errors::{CoordError, Result};
use crate::map::available::AvailableMap;
use crate::map::route::{Route, RoutePose};
use crate::types::{EdgeId, NodeId};

/// A node of the topological map.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub name: NodeId,
    pub x: f64,
    pub y: f64,
}

/// A directed, weighted edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    pub id: EdgeId,
    pub distance: f64,
}

/// Immutable topological map snapshot keyed by node name.
///
/// Construction goes through [`TopoMap::add_node`] / [`TopoMap::add_edge`]
/// (or `TopoMap::try_from(MapFile)`), which reject duplicate nodes, unknown
/// endpoints and negative distances. Once handed to the coordinator the
/// snapshot is never mutated; a map change replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct TopoMap {
    graph: DiGraph<NodeInfo, EdgeInfo>,
    index: HashMap<NodeId, NodeIndex>,
}

impl TopoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<NodeId>, x: f64, y: f64) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(CoordError::MapError(format!("duplicate node '{name}'")));
        }
        let ix = self.graph.add_node(NodeInfo {
            name: name.clone(),
            x,
            y,
        });
        self.index.insert(name, ix);
        Ok(())
    }

    /// Add a directed edge `from -> to`.
    ///
    /// - `id` defaults to `"<from>_<to>"`.
    /// - `distance` defaults to the Euclidean distance between the nodes.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        id: Option<EdgeId>,
        distance: Option<f64>,
    ) -> Result<()> {
        let a = self.index_of(from).ok_or_else(|| {
            CoordError::MapError(format!("edge references unknown node '{from}'"))
        })?;
        let b = self.index_of(to).ok_or_else(|| {
            CoordError::MapError(format!("edge references unknown node '{to}'"))
        })?;

        let distance = match distance {
            Some(d) if d < 0.0 || d.is_nan() => {
                return Err(CoordError::MapError(format!(
                    "edge {from} -> {to} has invalid distance {d}"
                )));
            }
            Some(d) => d,
            None => {
                let (na, nb) = (&self.graph[a], &self.graph[b]);
                (na.x - nb.x).hypot(na.y - nb.y)
            }
        };

        let id = id.unwrap_or_else(|| format!("{from}_{to}"));
        self.graph.add_edge(a, b, EdgeInfo { id, distance });
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    /// Node metadata by name.
    pub fn node(&self, name: &str) -> Option<&NodeInfo> {
        self.index_of(name).map(|ix| &self.graph[ix])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Distance of the shortest edge between two adjacent nodes.
    pub fn edge_distance(&self, from: &str, to: &str) -> Option<f64> {
        let (a, b) = (self.index_of(from)?, self.index_of(to)?);
        self.graph
            .edges_connecting(a, b)
            .map(|e| e.weight().distance)
            .min_by(|x, y| x.total_cmp(y))
    }

    /// Whether `to` is reachable from `from` on the unrestricted map.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(a), Some(b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    /// Shortest route by edge weight from `start` to `goal` over `view`.
    ///
    /// Returns `None` when either node is unknown or no route exists. The
    /// start node itself is never filtered; only edges leading into blocked
    /// nodes are.
    pub fn shortest_route(&self, view: &AvailableMap, start: &str, goal: &str) -> Option<Route> {
        let start_ix = self.index_of(start)?;
        let goal_ix = self.index_of(goal)?;

        if start_ix == goal_ix {
            return Some(Route::stub(start));
        }

        let graph = &self.graph;
        let filtered = EdgeFiltered::from_fn(graph, |edge: EdgeReference<'_, EdgeInfo>| {
            view.is_traversable(&graph[edge.target()].name)
        });

        let (cost, path) = astar(
            &filtered,
            start_ix,
            |n| n == goal_ix,
            |e| e.weight().distance,
            |_| 0.0,
        )?;

        let mut route = Route::default();
        for pair in path.windows(2) {
            let edge = graph
                .edges_connecting(pair[0], pair[1])
                .map(|e| e.weight())
                .min_by(|x, y| x.distance.total_cmp(&y.distance))?;
            route.edges.push(edge.id.clone());
            route.distances.push(edge.distance);
        }
        route.nodes = path.iter().map(|ix| graph[*ix].name.clone()).collect();

        trace!(start, goal, cost, hops = route.edges.len(), "route search");
        Some(route)
    }

    /// Coordinates of the given nodes, skipping unknown names.
    pub fn poses(&self, nodes: &[NodeId]) -> Vec<RoutePose> {
        nodes
            .iter()
            .filter_map(|name| self.node(name))
            .map(|n| RoutePose {
                node: n.name.clone(),
                x: n.x,
                y: n.y,
            })
            .collect()
    }
}
