use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::peer::PeerError;
use super::protocol::ErrorResponse;
use crate::membership::types::ClusterNode;

/// Failures surfaced by cluster-scope operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Not enough nodes agreed. For writes the change has already landed locally
    /// and on every peer that acknowledged it; nothing is rolled back.
    #[error("quorum not met: required {required}, achieved {achieved}")]
    QuorumNotMet { required: usize, achieved: usize },

    /// Another cluster write is already running on this node. Retry later.
    #[error("another cluster write is in progress on this node")]
    WriteInProgress,

    /// A peer we could not do without (the leader, or the seed) did not answer.
    #[error("peer {node} unreachable: {source}")]
    PeerUnreachable {
        node: ClusterNode,
        #[source]
        source: PeerError,
    },

    #[error("node has not been initialized")]
    NotInitialized,

    #[error("key must not be empty")]
    InvalidKey,
}

impl ClusterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClusterError::QuorumNotMet { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ClusterError::WriteInProgress => StatusCode::CONFLICT,
            ClusterError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
            ClusterError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            ClusterError::InvalidKey => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ClusterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
