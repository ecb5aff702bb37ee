//! Cluster Network Protocol
//!
//! API endpoints and the JSON bodies exchanged between clients and nodes, and
//! between nodes themselves.
//!
//! Public endpoints run the quorum protocols; `/internal/*` endpoints act on the
//! receiving node only and are what peers call during fan-out, joins and health checks.

use serde::{Deserialize, Serialize};

use crate::membership::types::ClusterNode;

// --- API Endpoints ---

/// Cluster-scope put (POST) and the prefix for cluster-scope get/delete by key.
pub const ENDPOINT_KEY_VALUE: &str = "/keyValuePair";
/// Single-node put (POST) and the prefix for single-node get/delete by key.
pub const ENDPOINT_INTERNAL_KEY_VALUE: &str = "/internal/keyValuePair";
/// Initializes an inert node with its identity and optional seed.
pub const ENDPOINT_BOOTSTRAP: &str = "/internal/bootstrap";
/// Liveness probe; answering it resets the receiver's leader-staleness clock.
pub const ENDPOINT_HEARTBEAT: &str = "/internal/heartbeat";
/// Announces a new member to the receiving node.
pub const ENDPOINT_ADD_CLUSTER_NODE: &str = "/internal/addClusterNode";
/// The receiving node's membership list.
pub const ENDPOINT_GET_CLUSTER: &str = "/internal/getCluster";
/// The node the receiver currently considers leader.
pub const ENDPOINT_GET_CLUSTER_LEADER: &str = "/internal/getClusterLeader";

// --- Data Transfer Objects ---

/// Body of both cluster-scope and single-node writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    /// `true` if the key was new or its value changed.
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    /// `None` means the key is absent.
    pub value: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// `true` if the key existed.
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub node: ClusterNode,
    #[serde(default)]
    pub seed: Option<ClusterNode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub initialized: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClusterRequest {
    pub node: ClusterNode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinClusterResponse {
    pub added: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetClusterResponse {
    pub nodes: Vec<ClusterNode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
