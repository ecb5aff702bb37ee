use std::collections::HashSet;

use super::types::ClusterNode;

/// Below this many members the cluster is considered unhealthy, and quorum
/// never drops below it.
pub const HEALTHY_CLUSTER_MIN_SIZE: usize = 3;

/// The set of nodes this process currently knows about.
///
/// There is no internal locking here; the owning `NodeCoordinator` serializes
/// every access under its coordination lock.
#[derive(Debug, Clone, Default)]
pub struct ClusterMembership {
    nodes: HashSet<ClusterNode>,
}

impl ClusterMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Returns `false` if it was already a member.
    pub fn add(&mut self, node: ClusterNode) -> bool {
        self.nodes.insert(node)
    }

    /// Removes a node. Returns `false` if it was not a member.
    pub fn remove(&mut self, node: &ClusterNode) -> bool {
        self.nodes.remove(node)
    }

    pub fn contains(&self, node: &ClusterNode) -> bool {
        self.nodes.contains(node)
    }

    /// Snapshot of every known node, in no particular order.
    pub fn members(&self) -> Vec<ClusterNode> {
        self.nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The member with the lowest id, or `None` for an empty set.
    pub fn leader(&self) -> Option<&ClusterNode> {
        self.nodes.iter().min()
    }

    /// `max(floor(n / 2) + 1, 3)`.
    ///
    /// The floor of three means one- and two-node clusters can never reach
    /// quorum until they grow.
    pub fn quorum_size(&self) -> usize {
        (self.nodes.len() / 2 + 1).max(HEALTHY_CLUSTER_MIN_SIZE)
    }

    /// Informational only; nothing refuses to run on an unhealthy cluster.
    pub fn is_healthy(&self) -> bool {
        self.nodes.len() >= HEALTHY_CLUSTER_MIN_SIZE
    }
}
