use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identity of a single member in the cluster.
///
/// Equality and hashing are structural over all three fields, so two copies
/// describing the same process are interchangeable. Ordering is by `id` only:
/// the lowest id outranks everyone else for leadership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClusterNode {
    pub id: u32,
    pub host: String,
    pub port: String,
}

impl ClusterNode {
    pub fn new(id: u32, host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
            port: port.into(),
        }
    }

    /// Base URL used to reach this node's HTTP endpoints.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl PartialOrd for ClusterNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClusterNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties on id fall back to the address so Ord stays consistent with Eq.
        self.id
            .cmp(&other.id)
            .then_with(|| self.host.cmp(&other.host))
            .then_with(|| self.port.cmp(&other.port))
    }
}

impl fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}@{}:{}", self.id, self.host, self.port)
    }
}

/// The two roles a coordinator can hold for its view of the cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

impl Role {
    pub fn is_leader(self) -> bool {
        matches!(self, Role::Leader)
    }
}
