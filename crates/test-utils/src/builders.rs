#![allow(dead_code)]

use std::collections::BTreeMap;

use fleetcoord::config::{
    CoordinatorSection, FleetConfig, PresenceSection, RawFleetConfig, RobotConfig,
    SimulationSection,
};
use fleetcoord::map::{EdgeSpec, MapFile, NodeSpec, TopoMap};
use fleetcoord::types::Priority;

/// Builder for `FleetConfig` to simplify test setup.
pub struct FleetConfigBuilder {
    config: RawFleetConfig,
}

impl FleetConfigBuilder {
    pub fn new(storage_node: &str) -> Self {
        Self {
            config: RawFleetConfig {
                coordinator: CoordinatorSection::new(storage_node),
                robot: BTreeMap::new(),
                presence: PresenceSection::default(),
                simulation: SimulationSection::default(),
            },
        }
    }

    pub fn with_robot(mut self, id: &str, robot: RobotConfig) -> Self {
        self.config.robot.insert(id.to_string(), robot);
        self
    }

    pub fn with_presence_agent(mut self, agent: &str) -> Self {
        self.config.presence.agents.push(agent.to_string());
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.coordinator.queue_capacity = capacity;
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.coordinator.tick_interval_ms = ms;
        self
    }

    pub fn timeouts(mut self, load_secs: f64, unload_secs: f64) -> Self {
        self.config.coordinator.load_timeout_secs = load_secs;
        self.config.coordinator.unload_timeout_secs = unload_secs;
        self
    }

    pub fn build_raw(self) -> RawFleetConfig {
        self.config
    }

    pub fn build(self) -> FleetConfig {
        FleetConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `RobotConfig`.
pub struct RobotConfigBuilder {
    robot: RobotConfig,
}

impl RobotConfigBuilder {
    pub fn new(base_node: &str) -> Self {
        Self {
            robot: RobotConfig::new(base_node),
        }
    }

    /// Start-up position.
    pub fn at(mut self, node: &str) -> Self {
        self.robot.initial_node = Some(node.to_string());
        self
    }

    pub fn wait_node(mut self, node: &str) -> Self {
        self.robot.wait_node = Some(node.to_string());
        self
    }

    pub fn max_task_priority(mut self, priority: Priority) -> Self {
        self.robot.max_task_priority = priority;
        self
    }

    pub fn build(self) -> RobotConfig {
        self.robot
    }
}

/// Builder for small topological maps. Nodes are laid out along the x axis
/// in insertion order; edge distances are explicit.
#[derive(Default)]
pub struct MapBuilder {
    file: MapFile,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: &str) -> Self {
        let x = self.file.node.len() as f64;
        self.file.node.push(NodeSpec {
            name: name.to_string(),
            x,
            y: 0.0,
        });
        self
    }

    pub fn nodes(self, names: &[&str]) -> Self {
        names.iter().fold(self, |b, name| b.node(name))
    }

    /// Directed edge.
    pub fn edge(mut self, from: &str, to: &str, distance: f64) -> Self {
        self.file.edge.push(EdgeSpec {
            from: from.to_string(),
            to: to.to_string(),
            id: None,
            distance: Some(distance),
            bidirectional: false,
        });
        self
    }

    /// Edges both ways.
    pub fn link(mut self, a: &str, b: &str, distance: f64) -> Self {
        self.file.edge.push(EdgeSpec {
            from: a.to_string(),
            to: b.to_string(),
            id: None,
            distance: Some(distance),
            bidirectional: true,
        });
        self
    }

    /// Bidirectional chain `a - b - c ...` with unit distances.
    pub fn chain(self, names: &[&str]) -> Self {
        names
            .windows(2)
            .fold(self, |b, pair| b.link(pair[0], pair[1], 1.0))
    }

    pub fn build(self) -> TopoMap {
        TopoMap::try_from(self.file).expect("Failed to build valid map from builder")
    }
}
