// src/coord/critical.rs

//! Critical-Section Scheduler.
//!
//! A critical point is a node shared by the routes of two or more active
//! robots. Each critical point gets exactly one winner per pass: the
//! contender with the smallest remaining route distance to it (lowest robot
//! id on ties). Routes are cut in front of every critical point their robot
//! does not win; only the first fragment is issued.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::map::{Route, RouteFragment};
use crate::types::{NodeId, RobotId};

/// Route of one active robot as seen by the scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveRoute {
    pub route: Route,
    /// The picker node, while the robot is on its way there.
    pub picker: Option<NodeId>,
}

impl ActiveRoute {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            picker: None,
        }
    }

    pub fn to_picker(route: Route, picker: impl Into<NodeId>) -> Self {
        Self {
            route,
            picker: Some(picker.into()),
        }
    }
}

/// Output of one fragmentation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentPlan {
    pub fragments: BTreeMap<RobotId, Vec<RouteFragment>>,
    /// Robot authorised to cross each critical point.
    pub winners: BTreeMap<NodeId, RobotId>,
}

impl FragmentPlan {
    pub fn first_fragment(&self, robot: &str) -> Option<&RouteFragment> {
        self.fragments.get(robot).and_then(|f| f.first())
    }

    /// Critical points `robot` may cross in this pass.
    pub fn won_by(&self, robot: &str) -> BTreeSet<&str> {
        self.winners
            .iter()
            .filter(|(_, winner)| winner.as_str() == robot)
            .map(|(node, _)| node.as_str())
            .collect()
    }
}

/// Per robot, the nodes of its route that also lie on another robot's route.
fn shared_nodes(routes: &BTreeMap<RobotId, ActiveRoute>) -> BTreeMap<RobotId, BTreeSet<NodeId>> {
    let mut holders: BTreeMap<&str, usize> = BTreeMap::new();
    for active in routes.values() {
        let unique: BTreeSet<&str> = active.route.nodes.iter().map(String::as_str).collect();
        for node in unique {
            *holders.entry(node).or_default() += 1;
        }
    }

    routes
        .iter()
        .map(|(id, active)| {
            let shared = active
                .route
                .nodes
                .iter()
                .filter(|n| holders.get(n.as_str()).copied().unwrap_or(0) > 1)
                .cloned()
                .collect();
            (id.clone(), shared)
        })
        .collect()
}

/// Critical points each robot's route is cut at.
///
/// A robot heading to a picker whose only critical point is that picker node
/// is exempt: it drives in unfragmented. It still contends for the node.
pub fn critical_points(
    routes: &BTreeMap<RobotId, ActiveRoute>,
) -> BTreeMap<RobotId, BTreeSet<NodeId>> {
    let mut critical = shared_nodes(routes);
    for (id, points) in critical.iter_mut() {
        let picker = routes.get(id).and_then(|a| a.picker.as_ref());
        if let Some(picker) = picker {
            if points.len() == 1 && points.contains(picker) {
                points.clear();
            }
        }
    }
    critical
}

/// Pick winners for every critical point and fragment every route.
///
/// Every route through a shared node contends for it, exempt or not.
pub fn split_critical_paths(routes: &BTreeMap<RobotId, ActiveRoute>) -> FragmentPlan {
    let shared = shared_nodes(routes);

    let contested: BTreeSet<&NodeId> = shared.values().flatten().collect();
    let mut winners = BTreeMap::new();
    for node in contested {
        let winner = routes
            .iter()
            .filter(|(_, active)| active.route.contains(node))
            .map(|(id, active)| (id, active.route.distance_to(node)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        if let Some((id, distance)) = winner {
            trace!(node = %node, robot = %id, distance, "critical point winner");
            winners.insert(node.clone(), id.clone());
        }
    }

    let critical = critical_points(routes);
    let empty = BTreeSet::new();
    let fragments = routes
        .iter()
        .map(|(id, active)| {
            let points = critical.get(id).unwrap_or(&empty);
            (id.clone(), fragment_route(&active.route, id, points, &winners))
        })
        .collect();

    FragmentPlan { fragments, winners }
}

/// Cut `route` into clearance windows.
///
/// A window ends right before a critical point owned by someone else. After a
/// point the robot wins, the window closes one node further on, so the point
/// is released as soon as the robot is through it.
pub fn fragment_route(
    route: &Route,
    robot: &str,
    points: &BTreeSet<NodeId>,
    winners: &BTreeMap<NodeId, RobotId>,
) -> Vec<RouteFragment> {
    let len = route.nodes.len();
    match len {
        0 => return Vec::new(),
        1 => return vec![RouteFragment::hold(route.nodes[0].clone())],
        _ => {}
    }

    // Index of the first node of every window after the first.
    let mut cuts = BTreeSet::new();
    for (i, node) in route.nodes.iter().enumerate().skip(1) {
        if !points.contains(node) {
            continue;
        }
        if winners.get(node).is_some_and(|w| w == robot) {
            if i + 2 < len {
                cuts.insert(i + 2);
            }
        } else {
            cuts.insert(i);
        }
    }

    let mut bounds = Vec::with_capacity(cuts.len() + 2);
    bounds.push(0);
    bounds.extend(cuts);
    bounds.push(len);

    bounds
        .windows(2)
        .map(|w| {
            let (begin, end) = (w[0], w[1]);
            let from = begin.saturating_sub(1);
            RouteFragment {
                nodes: route.nodes[from..end].to_vec(),
                edges: route.edges[from..end - 1].to_vec(),
            }
        })
        .collect()
}
