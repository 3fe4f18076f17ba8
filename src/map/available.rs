// src/map/available.rs

use std::collections::BTreeSet;

use crate::types::NodeId;

/// Occupancy-restricted view of the topological map.
///
/// Edges leading *into* a blocked node are treated as absent during route
/// search, so robots do not plan through nodes currently held by another
/// agent. This is a conflict-avoidance heuristic, not a collision guarantee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableMap {
    blocked: BTreeSet<NodeId>,
}

impl AvailableMap {
    /// View with no restrictions (the full map).
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Build a view blocking every given occupied node.
    pub fn from_occupied<I>(occupied: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            blocked: occupied.into_iter().collect(),
        }
    }

    pub fn is_blocked(&self, node: &str) -> bool {
        self.blocked.contains(node)
    }

    pub fn is_traversable(&self, node: &str) -> bool {
        !self.is_blocked(node)
    }

    /// Copy of this view with `node` re-opened. A robot must always be able to
    /// reach its own destination, even if someone is standing on it.
    pub fn unblocked(&self, node: &str) -> Self {
        if !self.is_blocked(node) {
            return self.clone();
        }
        let mut blocked = self.blocked.clone();
        blocked.remove(node);
        Self { blocked }
    }
}
