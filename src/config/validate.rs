// src/config/validate.rs

use tracing::warn;

use crate::config::model::{FleetConfig, RawFleetConfig};
use crate::errors::{CoordError, Result};
use crate::map::TopoMap;

impl TryFrom<RawFleetConfig> for FleetConfig {
    type Error = crate::errors::CoordError;

    fn try_from(raw: RawFleetConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(FleetConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawFleetConfig) -> Result<()> {
    ensure_has_robots(cfg)?;
    validate_coordinator(cfg)?;
    validate_robots(cfg)?;
    validate_presence(cfg)?;
    Ok(())
}

fn ensure_has_robots(cfg: &RawFleetConfig) -> Result<()> {
    if cfg.robot.is_empty() {
        return Err(CoordError::ConfigError(
            "config must contain at least one [robot.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_coordinator(cfg: &RawFleetConfig) -> Result<()> {
    let c = &cfg.coordinator;

    if c.storage_node.trim().is_empty() {
        return Err(CoordError::ConfigError(
            "[coordinator].storage_node must not be empty".to_string(),
        ));
    }
    if c.queue_capacity == 0 {
        return Err(CoordError::ConfigError(
            "[coordinator].queue_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    if c.tick_interval_ms == 0 {
        return Err(CoordError::ConfigError(
            "[coordinator].tick_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    for (name, value) in [
        ("load_timeout_secs", c.load_timeout_secs),
        ("unload_timeout_secs", c.unload_timeout_secs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(CoordError::ConfigError(format!(
                "[coordinator].{name} must be a non-negative number (got {value})"
            )));
        }
    }
    if !cfg.simulation.secs_per_meter.is_finite() || cfg.simulation.secs_per_meter < 0.0 {
        return Err(CoordError::ConfigError(format!(
            "[simulation].secs_per_meter must be a non-negative number (got {})",
            cfg.simulation.secs_per_meter
        )));
    }
    Ok(())
}

fn validate_robots(cfg: &RawFleetConfig) -> Result<()> {
    for (id, robot) in cfg.robot.iter() {
        if robot.base_node.trim().is_empty() {
            return Err(CoordError::ConfigError(format!(
                "robot '{id}' has an empty base_node"
            )));
        }
        if robot.wait_node.as_deref() == Some(robot.base_node.as_str()) {
            return Err(CoordError::ConfigError(format!(
                "robot '{id}' uses its base node '{}' as wait_node",
                robot.base_node
            )));
        }
    }
    Ok(())
}

fn validate_presence(cfg: &RawFleetConfig) -> Result<()> {
    for agent in cfg.presence.agents.iter() {
        if cfg.robot.contains_key(agent) {
            return Err(CoordError::ConfigError(format!(
                "'{agent}' is listed both as a robot and as a presence agent"
            )));
        }
    }
    Ok(())
}

/// Check every node the configuration names against the map.
///
/// Unknown nodes are errors. A base node that cannot reach storage on the
/// unrestricted map is only logged: the map may be updated later.
pub fn validate_against_map(cfg: &FleetConfig, map: &TopoMap) -> Result<()> {
    let storage = cfg.storage_node();
    ensure_node(map, storage, "[coordinator].storage_node")?;

    for (id, robot) in cfg.robot.iter() {
        ensure_node(map, &robot.base_node, &format!("robot '{id}' base_node"))?;
        if let Some(ref wait) = robot.wait_node {
            ensure_node(map, wait, &format!("robot '{id}' wait_node"))?;
        }
        if let Some(ref initial) = robot.initial_node {
            ensure_node(map, initial, &format!("robot '{id}' initial_node"))?;
        }

        if !map.has_path(&robot.base_node, storage) {
            warn!(
                robot = %id,
                base = %robot.base_node,
                storage = %storage,
                "storage is not reachable from base node on the full map"
            );
        }
    }
    Ok(())
}

fn ensure_node(map: &TopoMap, node: &str, what: &str) -> Result<()> {
    if map.contains(node) {
        Ok(())
    } else {
        Err(CoordError::MapError(format!(
            "{what} refers to unknown node '{node}'"
        )))
    }
}
