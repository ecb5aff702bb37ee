//! Cluster Coordination Module
//!
//! The quorum-replication engine: leadership, the health/failover loop and the
//! quorum-gated put/get/delete protocols, plus the HTTP surface that exposes them.
//!
//! ## Submodules
//! - **`coordinator`**: `NodeCoordinator`, the per-process orchestrator.
//! - **`peer`**: the `PeerClient` trait the coordinator uses to reach other nodes.
//! - **`client`**: `HttpPeerClient`, the reqwest implementation of `PeerClient`.
//! - **`protocol`**: endpoint paths and JSON request/response bodies.
//! - **`handlers`**: axum handlers and the router that binds them to a coordinator.
//! - **`error`**: `ClusterError` and its mapping onto HTTP status codes.

pub mod client;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod peer;
pub mod protocol;
