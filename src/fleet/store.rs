// src/fleet/store.rs

use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{FleetConfig, RobotConfig};
use crate::errors::{CoordError, Result};
use crate::fleet::robot::{Position, Robot};
use crate::types::{AgentId, NodeId, RobotId, TaskId};

/// Fleet State Store.
///
/// Robots are kept in a `BTreeMap` so every pass over the fleet runs in
/// robot-id order. Presence agents (pickers, other vehicles) only carry a
/// position; they block nodes but are never planned for.
#[derive(Debug, Clone, Default)]
pub struct FleetStore {
    robots: BTreeMap<RobotId, Robot>,
    agents: BTreeMap<AgentId, Position>,
}

impl FleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &FleetConfig, now: Instant) -> Self {
        let mut store = Self::new();
        for (id, robot) in cfg.robot.iter() {
            store
                .robots
                .insert(id.clone(), Robot::new(id.clone(), robot, now));
        }
        for agent in cfg.presence.agents.iter() {
            store.agents.insert(agent.clone(), Position::default());
        }
        store
    }

    /// Add a robot at runtime. Ids are unique across robots and agents.
    pub fn register(&mut self, id: RobotId, config: &RobotConfig, now: Instant) -> Result<()> {
        if self.robots.contains_key(&id) || self.agents.contains_key(&id) {
            return Err(CoordError::ConfigError(format!(
                "agent '{id}' is already registered"
            )));
        }
        let robot = Robot::new(id.clone(), config, now);
        self.robots.insert(id, robot);
        Ok(())
    }

    pub fn deregister(&mut self, id: &str) -> Option<Robot> {
        self.robots.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Robot> {
        self.robots.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Robot> {
        self.robots.get_mut(id)
    }

    pub fn robot(&self, id: &str) -> Result<&Robot> {
        self.robots
            .get(id)
            .ok_or_else(|| CoordError::UnknownRobot(id.to_string()))
    }

    pub fn robot_mut(&mut self, id: &str) -> Result<&mut Robot> {
        self.robots
            .get_mut(id)
            .ok_or_else(|| CoordError::UnknownRobot(id.to_string()))
    }

    pub fn robots(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    pub fn robots_mut(&mut self) -> impl Iterator<Item = &mut Robot> {
        self.robots.values_mut()
    }

    pub fn ids(&self) -> Vec<RobotId> {
        self.robots.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    /// Position feed: "current node changed". Returns `false` for agents
    /// nobody tracks.
    pub fn set_current_node(&mut self, agent: &str, node: Option<NodeId>) -> bool {
        if let Some(robot) = self.robots.get_mut(agent) {
            robot.position.set_current(node);
            true
        } else if let Some(pos) = self.agents.get_mut(agent) {
            pos.set_current(node);
            true
        } else {
            false
        }
    }

    /// Position feed: "closest node changed".
    pub fn set_closest_node(&mut self, agent: &str, node: Option<NodeId>) -> bool {
        if let Some(robot) = self.robots.get_mut(agent) {
            robot.position.set_closest(node);
            true
        } else if let Some(pos) = self.agents.get_mut(agent) {
            pos.set_closest(node);
            true
        } else {
            false
        }
    }

    pub fn agent_positions(&self) -> impl Iterator<Item = (&str, &Position)> {
        self.agents.iter().map(|(id, pos)| (id.as_str(), pos))
    }

    /// Best-known node of every tracked agent, robots and presence agents.
    pub fn occupied_nodes(&self) -> Vec<NodeId> {
        let robots = self.robots.values().map(|r| &r.position);
        robots
            .chain(self.agents.values())
            .filter_map(|pos| pos.best_known())
            .map(str::to_string)
            .collect()
    }

    pub fn idle(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values().filter(|r| r.is_idle())
    }

    pub fn active(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values().filter(|r| r.is_active())
    }

    pub fn has_idle(&self) -> bool {
        self.idle().next().is_some()
    }

    pub fn any_moving(&self) -> bool {
        self.robots.values().any(|r| r.is_moving())
    }

    pub fn all_idle(&self) -> bool {
        self.robots.values().all(|r| r.is_idle())
    }

    /// `(robot, task)` for every robot holding a task.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, TaskId)> {
        self.robots
            .values()
            .filter_map(|r| r.task.map(|t| (r.id.as_str(), t)))
    }
}

