use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{NodeId, Priority, RobotId};

/// Fleet configuration as read from a TOML file.
///
/// ```toml
/// [coordinator]
/// storage_node = "WayPoint1"
/// queue_capacity = 1000
/// tick_interval_ms = 100
/// load_timeout_secs = 5.0
/// unload_timeout_secs = 5.0
///
/// [robot.thorvald_001]
/// base_node = "WayPoint10"
/// wait_node = "WayPoint11"
/// max_task_priority = 5
///
/// [presence]
/// agents = ["picker01"]
/// ```
///
/// `RawFleetConfig` is the unvalidated form; convert it with
/// `FleetConfig::try_from` to get a [`FleetConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawFleetConfig {
    pub coordinator: CoordinatorSection,

    /// All robots from `[robot.<id>]`, keyed by robot id.
    #[serde(default)]
    pub robot: BTreeMap<RobotId, RobotConfig>,

    #[serde(default)]
    pub presence: PresenceSection,

    #[serde(default)]
    pub simulation: SimulationSection,
}

/// Validated fleet configuration.
///
/// Built once at start-up and shared read-only with the coordination loop.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub coordinator: CoordinatorSection,
    pub robot: BTreeMap<RobotId, RobotConfig>,
    pub presence: PresenceSection,
    pub simulation: SimulationSection,
}

impl FleetConfig {
    /// Construct without validation. Prefer `FleetConfig::try_from(raw)`.
    pub(crate) fn new_unchecked(raw: RawFleetConfig) -> Self {
        Self {
            coordinator: raw.coordinator,
            robot: raw.robot,
            presence: raw.presence,
            simulation: raw.simulation,
        }
    }

    pub fn storage_node(&self) -> &str {
        &self.coordinator.storage_node
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.coordinator.tick_interval_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.coordinator.load_timeout_secs)
    }

    pub fn unload_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.coordinator.unload_timeout_secs)
    }
}

/// `[coordinator]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorSection {
    /// The single storage node every load is delivered to.
    pub storage_node: NodeId,

    /// Maximum number of pending tasks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Coordination loop period.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How long a robot waits at the picker without a load confirmation.
    #[serde(default = "default_wait_secs")]
    pub load_timeout_secs: f64,

    /// How long a robot waits at storage without an unload confirmation.
    #[serde(default = "default_wait_secs")]
    pub unload_timeout_secs: f64,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_wait_secs() -> f64 {
    5.0
}

impl CoordinatorSection {
    pub fn new(storage_node: impl Into<NodeId>) -> Self {
        Self {
            storage_node: storage_node.into(),
            queue_capacity: default_queue_capacity(),
            tick_interval_ms: default_tick_interval_ms(),
            load_timeout_secs: default_wait_secs(),
            unload_timeout_secs: default_wait_secs(),
        }
    }
}

/// `[robot.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Home node; robots return here after every task.
    pub base_node: NodeId,

    /// Fallback destination when storage is unreachable.
    #[serde(default)]
    pub wait_node: Option<NodeId>,

    /// Highest task priority this robot accepts.
    #[serde(default = "default_max_task_priority")]
    pub max_task_priority: Priority,

    /// Where the robot is at start-up, if known.
    #[serde(default)]
    pub initial_node: Option<NodeId>,
}

fn default_max_task_priority() -> Priority {
    Priority::MAX
}

impl RobotConfig {
    pub fn new(base_node: impl Into<NodeId>) -> Self {
        Self {
            base_node: base_node.into(),
            wait_node: None,
            max_task_priority: default_max_task_priority(),
            initial_node: None,
        }
    }
}

/// `[presence]` section: non-robot agents that occupy nodes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PresenceSection {
    #[serde(default)]
    pub agents: Vec<String>,
}

/// `[simulation]` section, used by the simulated execution backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_secs_per_meter")]
    pub secs_per_meter: f64,
}

fn default_secs_per_meter() -> f64 {
    0.05
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            secs_per_meter: default_secs_per_meter(),
        }
    }
}
