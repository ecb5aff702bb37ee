//! HTTP Peer Client
//!
//! `PeerClient` over JSON/HTTP, talking to the endpoints declared in `protocol`.
//! Every request carries its own timeout; any transport failure, timeout or
//! non-success status comes back as a `PeerError`.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::peer::{PeerClient, PeerError, PeerFuture, PeerResult};
use super::protocol::*;
use crate::membership::types::ClusterNode;

pub struct HttpPeerClient {
    http_client: reqwest::Client,
    /// Timeout for single-node calls.
    request_timeout: Duration,
    /// Timeout for cluster-scope calls forwarded to the leader.
    forward_timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(request_timeout: Duration, forward_timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            request_timeout,
            forward_timeout,
        }
    }

    fn url(node: &ClusterNode, path: &str) -> PeerResult<Url> {
        Url::parse(&format!("{}{}", node.base_url(), path))
            .map_err(|e| PeerError::Transport(format!("bad url for {}: {}", node, e)))
    }

    /// `path` with `key` appended as one percent-encoded segment.
    fn key_url(node: &ClusterNode, path: &str, key: &str) -> PeerResult<Url> {
        let mut url = Self::url(node, path)?;
        url.path_segments_mut()
            .map_err(|_| PeerError::Transport(format!("{} cannot carry a path", node)))?
            .push(key);
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> PeerResult<reqwest::Response> {
        request.timeout(timeout).send().await.map_err(transport_error)
    }

    async fn expect_json<R: DeserializeOwned>(response: reqwest::Response) -> PeerResult<R> {
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))
    }

    async fn post<B, R>(&self, url: Url, body: &B, timeout: Duration) -> PeerResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .send(self.http_client.post(url).json(body), timeout)
            .await?;
        Self::expect_json(response).await
    }

    async fn get<R: DeserializeOwned>(&self, url: Url, timeout: Duration) -> PeerResult<R> {
        let response = self.send(self.http_client.get(url), timeout).await?;
        Self::expect_json(response).await
    }

    async fn delete<R: DeserializeOwned>(&self, url: Url, timeout: Duration) -> PeerResult<R> {
        let response = self.send(self.http_client.delete(url), timeout).await?;
        Self::expect_json(response).await
    }
}

impl PeerClient for HttpPeerClient {
    fn remote_put<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
        value: &'a str,
    ) -> PeerFuture<'a, bool> {
        Box::pin(async move {
            let url = Self::url(node, ENDPOINT_KEY_VALUE)?;
            let body = PutRequest {
                key: key.to_string(),
                value: value.to_string(),
            };
            let response: PutResponse = self.post(url, &body, self.forward_timeout).await?;
            Ok(response.changed)
        })
    }

    fn remote_internal_put<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
        value: &'a str,
    ) -> PeerFuture<'a, bool> {
        Box::pin(async move {
            let url = Self::url(node, ENDPOINT_INTERNAL_KEY_VALUE)?;
            let body = PutRequest {
                key: key.to_string(),
                value: value.to_string(),
            };
            let response: PutResponse = self.post(url, &body, self.request_timeout).await?;
            Ok(response.changed)
        })
    }

    fn remote_delete<'a>(&'a self, node: &'a ClusterNode, key: &'a str) -> PeerFuture<'a, bool> {
        Box::pin(async move {
            let url = Self::key_url(node, ENDPOINT_KEY_VALUE, key)?;
            let response: DeleteResponse = self.delete(url, self.forward_timeout).await?;
            Ok(response.deleted)
        })
    }

    fn remote_internal_delete<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
    ) -> PeerFuture<'a, bool> {
        Box::pin(async move {
            let url = Self::key_url(node, ENDPOINT_INTERNAL_KEY_VALUE, key)?;
            let response: DeleteResponse = self.delete(url, self.request_timeout).await?;
            Ok(response.deleted)
        })
    }

    fn remote_internal_get<'a>(
        &'a self,
        node: &'a ClusterNode,
        key: &'a str,
    ) -> PeerFuture<'a, Option<String>> {
        Box::pin(async move {
            let url = Self::key_url(node, ENDPOINT_INTERNAL_KEY_VALUE, key)?;
            let response: GetResponse = self.get(url, self.request_timeout).await?;
            Ok(response.value)
        })
    }

    fn remote_heartbeat<'a>(&'a self, node: &'a ClusterNode) -> PeerFuture<'a, bool> {
        Box::pin(async move {
            let url = Self::url(node, ENDPOINT_HEARTBEAT)?;
            let response = self
                .send(self.http_client.get(url), self.request_timeout)
                .await?;
            Ok(response.status().is_success())
        })
    }

    fn remote_announce_member<'a>(
        &'a self,
        node: &'a ClusterNode,
        new_member: &'a ClusterNode,
    ) -> PeerFuture<'a, bool> {
        Box::pin(async move {
            let url = Self::url(node, ENDPOINT_ADD_CLUSTER_NODE)?;
            let body = JoinClusterRequest {
                node: new_member.clone(),
            };
            let response = self
                .send(self.http_client.post(url).json(&body), self.request_timeout)
                .await?;
            Ok(response.status().is_success())
        })
    }

    fn remote_members_of<'a>(&'a self, node: &'a ClusterNode) -> PeerFuture<'a, Vec<ClusterNode>> {
        Box::pin(async move {
            let url = Self::url(node, ENDPOINT_GET_CLUSTER)?;
            let response: GetClusterResponse = self.get(url, self.request_timeout).await?;
            Ok(response.nodes)
        })
    }
}

fn transport_error(e: reqwest::Error) -> PeerError {
    if e.is_timeout() {
        PeerError::Timeout
    } else {
        PeerError::Transport(e.to_string())
    }
}
