//! Quorum-Replicated Key-Value Store Library
//!
//! Each process runs one node. Nodes cooperate to present a single logical
//! key-value store with majority-quorum reads and writes and automatic leader
//! failover. The binary (`main.rs`) wires these modules to an HTTP server.
//!
//! ## Architecture Modules
//! - **`membership`**: Node identity and the membership set, including leader
//!   selection (lowest id) and quorum arithmetic.
//! - **`storage`**: The node-local concurrent map every write lands in.
//! - **`cluster`**: The coordination engine. Bootstrap and join, the health/failover
//!   loop, the quorum-gated put/get/delete protocols, the peer client seam and the
//!   HTTP handlers.
//! - **`config`**: YAML configuration with defaults for every setting.
//!
//! This is not a linearizable consensus protocol: there is no log, no terms and no
//! durability. Quorum success is best-effort majority acknowledgment.

pub mod cluster;
pub mod config;
pub mod membership;
pub mod storage;
