use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use super::coordinator::{NodeCoordinator, check_key};
use super::error::ClusterError;
use super::protocol::*;
use crate::membership::types::ClusterNode;

/// Every public and internal endpoint, bound to one coordinator.
pub fn router(coordinator: Arc<NodeCoordinator>) -> Router {
    Router::new()
        .route(ENDPOINT_KEY_VALUE, post(handle_put))
        .route(
            &format!("{}/:key", ENDPOINT_KEY_VALUE),
            get(handle_get).delete(handle_delete),
        )
        .route(ENDPOINT_INTERNAL_KEY_VALUE, post(handle_internal_put))
        .route(
            &format!("{}/:key", ENDPOINT_INTERNAL_KEY_VALUE),
            get(handle_internal_get).delete(handle_internal_delete),
        )
        .route(ENDPOINT_BOOTSTRAP, post(handle_bootstrap))
        .route(ENDPOINT_HEARTBEAT, get(handle_heartbeat))
        .route(ENDPOINT_ADD_CLUSTER_NODE, post(handle_add_cluster_node))
        .route(ENDPOINT_GET_CLUSTER, get(handle_get_cluster))
        .route(ENDPOINT_GET_CLUSTER_LEADER, get(handle_get_cluster_leader))
        .layer(Extension(coordinator))
}

pub async fn handle_put(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>, ClusterError> {
    match coordinator.cluster_put(req.key, req.value).await {
        Ok(changed) => Ok(Json(PutResponse { changed })),
        Err(e) => {
            tracing::error!("Cluster put failed: {}", e);
            Err(e)
        }
    }
}

pub async fn handle_get(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<GetResponse>), ClusterError> {
    match coordinator.cluster_get(&key).await {
        Ok(Some(value)) => Ok((StatusCode::OK, Json(GetResponse { value: Some(value) }))),
        Ok(None) => Ok((StatusCode::NOT_FOUND, Json(GetResponse { value: None }))),
        Err(e) => {
            tracing::error!("Cluster get of '{}' failed: {}", key, e);
            Err(e)
        }
    }
}

pub async fn handle_delete(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>, ClusterError> {
    match coordinator.cluster_delete(key).await {
        Ok(deleted) => Ok(Json(DeleteResponse { deleted })),
        Err(e) => {
            tracing::error!("Cluster delete failed: {}", e);
            Err(e)
        }
    }
}

pub async fn handle_internal_put(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>, ClusterError> {
    check_key(&req.key)?;
    let changed = coordinator.local_put(req.key, req.value);
    Ok(Json(PutResponse { changed }))
}

pub async fn handle_internal_get(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Path(key): Path<String>,
) -> Json<GetResponse> {
    Json(GetResponse {
        value: coordinator.local_get(&key),
    })
}

pub async fn handle_internal_delete(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        deleted: coordinator.local_delete(&key),
    })
}

pub async fn handle_bootstrap(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Json(req): Json<BootstrapRequest>,
) -> Result<Json<BootstrapResponse>, ClusterError> {
    tracing::info!("Bootstrap requested for {}", req.node);
    coordinator.initialize(req.node, req.seed).await?;
    Ok(Json(BootstrapResponse { initialized: true }))
}

pub async fn handle_heartbeat(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
) -> Json<HeartbeatResponse> {
    coordinator.receive_heartbeat();
    Json(HeartbeatResponse { alive: true })
}

pub async fn handle_add_cluster_node(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
    Json(req): Json<JoinClusterRequest>,
) -> Result<Json<JoinClusterResponse>, ClusterError> {
    coordinator.add_peer(req.node).await?;
    Ok(Json(JoinClusterResponse { added: true }))
}

pub async fn handle_get_cluster(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
) -> Json<GetClusterResponse> {
    Json(GetClusterResponse {
        nodes: coordinator.members_view().await,
    })
}

pub async fn handle_get_cluster_leader(
    Extension(coordinator): Extension<Arc<NodeCoordinator>>,
) -> Result<Json<ClusterNode>, ClusterError> {
    Ok(Json(coordinator.current_leader().await?))
}
