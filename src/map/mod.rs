// src/map/mod.rs

//! Topological map and route search.
//!
//! - [`graph`] holds the immutable map snapshot (petgraph) and answers
//!   shortest-route queries.
//! - [`available`] is the occupancy-restricted view routing runs against.
//! - [`route`] defines planned routes and the fragments issued to robots.
//! - [`loader`] reads a map snapshot from TOML.

pub mod available;
pub mod graph;
pub mod loader;
pub mod route;

pub use available::AvailableMap;
pub use graph::{EdgeInfo, NodeInfo, TopoMap};
pub use loader::{load_map, EdgeSpec, MapFile, NodeSpec};
pub use route::{reconstruct_nodes, Route, RouteFragment, RoutePose};
