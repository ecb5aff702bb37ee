//! Membership Module
//!
//! Tracks which nodes this process believes are part of the cluster and derives
//! the two facts every cluster operation depends on.
//!
//! ## Core Rules
//! - **Leader**: the member with the lowest numeric id.
//! - **Quorum**: a strict majority of the known members, but never fewer than three.
//! - **Health**: a cluster with fewer than three members is reported unhealthy
//!   (informational, never enforced).
//!
//! Membership is a plain set with no gossip or anti-entropy. Nodes learn about each
//! other only through the one-hop join protocol run by `NodeCoordinator`.

pub mod service;
pub mod types;
