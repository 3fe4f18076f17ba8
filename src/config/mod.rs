// src/config/mod.rs

//! Configuration loading and validation for fleetcoord.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants, alone and against the map (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    CoordinatorSection, FleetConfig, PresenceSection, RawFleetConfig, RobotConfig,
    SimulationSection,
};
pub use validate::validate_against_map;
