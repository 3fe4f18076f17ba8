// src/coord/mod.rs

//! Decision-making pieces of the coordination loop.
//!
//! - [`assignment`]: pending tasks to idle robots.
//! - [`planner`]: a route per robot on the occupancy-restricted map.
//! - [`critical`]: mutual exclusion at nodes shared by active routes.
//! - [`stage`]: the per-task stage machine.
//!
//! Everything here is synchronous and only runs inside a tick.

pub mod assignment;
pub mod critical;
pub mod planner;
pub mod stage;

pub use assignment::{assign_tasks, find_closest_robot, Assignment};
pub use critical::{
    critical_points, fragment_route, split_critical_paths, ActiveRoute, FragmentPlan,
};
pub use planner::{plan_routes, stage_destination, PlanOutcome};
pub use stage::{transition, StageEvent, TaskStage, Transition};
