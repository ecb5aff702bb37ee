//! Remote Peer Access
//!
//! The seam between the coordinator and whatever transport reaches other nodes.
//! The coordinator only ever sees `Ok(result)` or a `PeerError`, and treats every
//! `PeerError` the same way: the peer is unreachable.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::membership::types::ClusterNode;

/// Why a call to a peer did not produce a result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer call timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("peer answered with status {0}")]
    Status(u16),

    #[error("could not decode peer response: {0}")]
    Decode(String),
}

pub type PeerResult<T> = Result<T, PeerError>;

/// Boxed future returned by every `PeerClient` method.
pub type PeerFuture<'a, T> = Pin<Box<dyn Future<Output = PeerResult<T>> + Send + 'a>>;

/// Operations one node performs against another.
pub trait PeerClient: Send + Sync {
    /// Cluster-scope put on `node` (used to forward a follower's write to the leader).
    fn remote_put<'a>(&'a self, node: &'a ClusterNode, key: &'a str, value: &'a str)
    -> PeerFuture<'a, bool>;

    /// Single-node put on `node`, no quorum logic.
    fn remote_internal_put<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
        value: &'a str,
    ) -> PeerFuture<'a, bool>;

    /// Cluster-scope delete on `node`.
    fn remote_delete<'a>(&'a self, node: &'a ClusterNode, key: &'a str) -> PeerFuture<'a, bool>;

    /// Single-node delete on `node`.
    fn remote_internal_delete<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
    ) -> PeerFuture<'a, bool>;

    /// Single-node read on `node`.
    fn remote_internal_get<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
    ) -> PeerFuture<'a, Option<String>>;

    fn remote_heartbeat<'a>(&'a self, node: &'a ClusterNode) -> PeerFuture<'a, bool>;

    /// Asks `node` to add `new_member` to its membership.
    fn remote_announce_member<'a>(
        &'a self,
        node: &'a ClusterNode,
        new_member: &'a ClusterNode,
    ) -> PeerFuture<'a, bool>;

    /// Fetches `node`'s current membership list.
    fn remote_members_of<'a>(&'a self, node: &'a ClusterNode) -> PeerFuture<'a, Vec<ClusterNode>>;
}
