//! Node Coordinator
//!
//! Owns this node's view of the cluster and runs every cluster-scope operation.
//!
//! ## Responsibilities
//! - **Bootstrap**: records the node identity, starts as a provisional leader and
//!   joins through an optional seed node.
//! - **Leadership**: the lowest id among introduced nodes leads; a node steps down
//!   as soon as it learns about a lower id.
//! - **Quorum protocols**: the leader applies writes locally, fans them out to every
//!   other member and counts acknowledgments. Followers forward writes to the leader.
//!   Reads poll every member and take a majority vote.
//! - **Failure detection**: a background loop where the leader evicts peers that miss
//!   every heartbeat probe, and followers evict a leader that has been silent for too long.
//!
//! ## Known gaps
//! - Two nodes that boot concurrently through seeds that have not met yet can both
//!   believe they lead until someone introduces them. This is a liveness window, not
//!   a safety guarantee.
//! - Joining is one hop: a new node meets the seed's current members only, never
//!   nodes that are joining elsewhere at the same time. There is no anti-entropy pass.
//! - Writes land locally before quorum is counted. When quorum is not met the caller
//!   gets an error but the value stays wherever it was written; nothing is rolled back.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use super::error::ClusterError;
use super::peer::{PeerClient, PeerError, PeerResult};
use crate::membership::service::ClusterMembership;
use crate::membership::types::{ClusterNode, Role};
use crate::storage::memory::LocalStore;

/// Timing knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Period of the health/failover loop.
    pub health_interval: Duration,
    /// Heartbeat attempts before the leader declares a peer dead.
    pub heartbeat_attempts: usize,
    /// Pause between two heartbeat attempts against the same peer.
    pub heartbeat_retry_delay: Duration,
    /// How long a follower tolerates silence from the leader.
    pub leader_timeout: Duration,
    /// Upper bound for a single single-node peer call.
    pub peer_timeout: Duration,
    /// Upper bound for forwarding a write to the leader, which runs its own fan-out.
    pub forward_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            health_interval: Duration::from_millis(3000),
            heartbeat_attempts: 3,
            heartbeat_retry_delay: Duration::from_millis(200),
            leader_timeout: Duration::from_millis(10_000),
            peer_timeout: Duration::from_millis(500),
            forward_timeout: Duration::from_millis(3000),
        }
    }
}

/// Membership and role, always read and mutated together.
struct ClusterState {
    role: Role,
    membership: ClusterMembership,
}

pub struct NodeCoordinator {
    identity: OnceLock<ClusterNode>,
    state: RwLock<ClusterState>,
    store: Arc<LocalStore>,
    peers: Arc<dyn PeerClient>,
    settings: CoordinatorSettings,
    clock_origin: Instant,
    /// Milliseconds since `clock_origin` at the last inbound heartbeat.
    last_heartbeat_ms: AtomicU64,
    write_in_flight: AtomicBool,
    init_lock: Mutex<()>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl NodeCoordinator {
    /// Creates an inert coordinator. Nothing runs until `initialize`.
    pub fn new(
        peers: Arc<dyn PeerClient>,
        store: Arc<LocalStore>,
        settings: CoordinatorSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity: OnceLock::new(),
            state: RwLock::new(ClusterState {
                role: Role::Follower,
                membership: ClusterMembership::new(),
            }),
            store,
            peers,
            settings,
            clock_origin: Instant::now(),
            last_heartbeat_ms: AtomicU64::new(0),
            write_in_flight: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            health_task: Mutex::new(None),
        })
    }

    /// Brings the node up as a provisional leader, starts the health loop and, when a
    /// seed is given, joins the seed's cluster.
    ///
    /// Runs once; later calls return `Ok(())` without doing anything. If the seed
    /// cannot be reached the node stays initialized as a standalone leader and the
    /// error is returned.
    pub async fn initialize(
        self: &Arc<Self>,
        me: ClusterNode,
        seed: Option<ClusterNode>,
    ) -> Result<(), ClusterError> {
        let _init = self.init_lock.lock().await;
        if let Some(existing) = self.identity.get() {
            tracing::debug!("Already initialized as {}, ignoring bootstrap", existing);
            return Ok(());
        }

        tracing::info!("Initializing {}", me);
        let _ = self.identity.set(me.clone());
        self.receive_heartbeat();
        {
            let mut state = self.state.write().await;
            state.membership.add(me.clone());
            state.role = Role::Leader;
        }

        let handle = tokio::spawn(Arc::clone(self).health_loop());
        *self.health_task.lock().await = Some(handle);

        match seed {
            Some(seed) => self.join_via(&me, &seed).await,
            None => {
                tracing::info!("No seed given, starting as founder");
                Ok(())
            }
        }
    }

    /// Stops the background health loop.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.health_task.lock().await.take() {
            handle.abort();
            tracing::info!("Health loop stopped");
        }
    }

    async fn join_via(&self, me: &ClusterNode, seed: &ClusterNode) -> Result<(), ClusterError> {
        tracing::info!("Joining cluster via seed {}", seed);

        let members = bounded(self.settings.peer_timeout, self.peers.remote_members_of(seed))
            .await
            .map_err(|source| ClusterError::PeerUnreachable {
                node: seed.clone(),
                source,
            })?;

        for node in members {
            if node == *me {
                continue;
            }

            match bounded(
                self.settings.peer_timeout,
                self.peers.remote_announce_member(&node, me),
            )
            .await
            {
                Ok(true) => tracing::debug!("Announced self to {}", node),
                Ok(false) => tracing::warn!("{} refused the announcement", node),
                Err(e) => tracing::warn!("Failed to announce self to {}: {}", node, e),
            }

            self.add_peer(node).await?;
        }

        let state = self.state.read().await;
        tracing::info!(
            "Joined cluster: {} members, role {:?}",
            state.membership.len(),
            state.role
        );
        Ok(())
    }

    /// Absorbs a node into membership, stepping down if it outranks us.
    pub async fn add_peer(&self, node: ClusterNode) -> Result<(), ClusterError> {
        let me = self.me()?;
        let mut state = self.state.write().await;

        if state.role.is_leader() && node.id < me.id {
            tracing::info!("{} outranks us, stepping down to follower", node);
            state.role = Role::Follower;
        }
        if state.membership.add(node.clone()) {
            tracing::info!(
                "Added {} to membership, cluster size now {}",
                node,
                state.membership.len()
            );
        }
        Ok(())
    }

    /// Ourselves when leading, otherwise the lowest-id member.
    pub async fn current_leader(&self) -> Result<ClusterNode, ClusterError> {
        let me = self.me()?;
        let state = self.state.read().await;
        Ok(leader_of(&state, &me))
    }

    pub async fn members_view(&self) -> Vec<ClusterNode> {
        self.state.read().await.membership.members()
    }

    pub async fn role(&self) -> Role {
        self.state.read().await.role
    }

    pub async fn is_leader(&self) -> bool {
        self.role().await.is_leader()
    }

    pub async fn quorum_size(&self) -> usize {
        self.state.read().await.membership.quorum_size()
    }

    /// Informational only; operations still run on an unhealthy cluster and
    /// simply fail quorum.
    pub async fn is_healthy(&self) -> bool {
        self.state.read().await.membership.is_healthy()
    }

    pub fn identity(&self) -> Option<&ClusterNode> {
        self.identity.get()
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Records that someone just probed us.
    pub fn receive_heartbeat(&self) {
        self.last_heartbeat_ms
            .store(self.clock_origin.elapsed().as_millis() as u64, Ordering::Release);
    }

    pub fn last_heartbeat_elapsed(&self) -> Duration {
        let now = self.clock_origin.elapsed().as_millis() as u64;
        let last = self.last_heartbeat_ms.load(Ordering::Acquire);
        Duration::from_millis(now.saturating_sub(last))
    }

    // --- Single-node operations ---

    pub fn local_put(&self, key: String, value: String) -> bool {
        self.store.put(key, value)
    }

    pub fn local_get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn local_delete(&self, key: &str) -> bool {
        self.store.delete(key)
    }

    // --- Cluster-scope operations ---

    /// Writes `key` on a quorum of members. Returns whether the local value changed.
    ///
    /// On a follower the write is forwarded to the leader. A leader that is busy
    /// with another write comes back as `WriteInProgress`; every other leader-side
    /// failure, quorum failures included, comes back as `PeerUnreachable` carrying
    /// the leader's status.
    pub async fn cluster_put(&self, key: String, value: String) -> Result<bool, ClusterError> {
        let me = self.me()?;
        check_key(&key)?;
        let (leader, others) = self.plan(&me).await;

        if leader.id != me.id {
            tracing::debug!("Forwarding put of '{}' to leader {}", key, leader);
            return bounded(
                self.settings.forward_timeout,
                self.peers.remote_put(&leader, &key, &value),
            )
            .await
            .map_err(|source| forwarding_error(leader, source));
        }

        let _guard = WriteGuard::acquire(&self.write_in_flight).ok_or(ClusterError::WriteInProgress)?;

        // Local write happens before anyone else acknowledges. A failed quorum
        // leaves it in place.
        let changed = self.store.put(key.clone(), value.clone());

        let timeout = self.settings.peer_timeout;
        let outcomes = fan_out(&self.peers, others, |peers, node| {
            let key = key.clone();
            let value = value.clone();
            async move { bounded(timeout, peers.remote_internal_put(&node, &key, &value)).await }
        })
        .await;

        self.require_quorum("put", &key, 1 + count_successes(&outcomes))
            .await?;
        Ok(changed)
    }

    /// Deletes `key` on a quorum of members. Returns whether it existed locally.
    /// Forwarding behaves as in `cluster_put`.
    pub async fn cluster_delete(&self, key: String) -> Result<bool, ClusterError> {
        let me = self.me()?;
        check_key(&key)?;
        let (leader, others) = self.plan(&me).await;

        if leader.id != me.id {
            tracing::debug!("Forwarding delete of '{}' to leader {}", key, leader);
            return bounded(
                self.settings.forward_timeout,
                self.peers.remote_delete(&leader, &key),
            )
            .await
            .map_err(|source| forwarding_error(leader, source));
        }

        let _guard = WriteGuard::acquire(&self.write_in_flight).ok_or(ClusterError::WriteInProgress)?;

        let existed = self.store.delete(&key);

        let timeout = self.settings.peer_timeout;
        let outcomes = fan_out(&self.peers, others, |peers, node| {
            let key = key.clone();
            async move { bounded(timeout, peers.remote_internal_delete(&node, &key)).await }
        })
        .await;

        self.require_quorum("delete", &key, 1 + count_successes(&outcomes))
            .await?;
        Ok(existed)
    }

    /// Reads `key` from every member and returns the majority outcome, which may be
    /// "absent", if at least a quorum of members agree on it.
    pub async fn cluster_get(&self, key: &str) -> Result<Option<String>, ClusterError> {
        let me = self.me()?;
        check_key(key)?;
        let (_, others) = self.plan(&me).await;

        let mut votes = vec![self.store.get(key)];

        let timeout = self.settings.peer_timeout;
        let owned_key = key.to_string();
        let outcomes = fan_out(&self.peers, others, |peers, node| {
            let key = owned_key.clone();
            async move { bounded(timeout, peers.remote_internal_get(&node, &key)).await }
        })
        .await;

        for (node, outcome) in outcomes {
            match outcome {
                Ok(value) => votes.push(value),
                Err(e) => tracing::debug!("GET: {} did not answer for '{}': {}", node, key, e),
            }
        }

        let (winner, count) = majority_vote(votes);
        let required = self.quorum_size().await;
        if count >= required {
            Ok(winner)
        } else {
            tracing::warn!(
                "GET '{}': quorum not met (required {}, achieved {})",
                key,
                required,
                count
            );
            Err(ClusterError::QuorumNotMet {
                required,
                achieved: count,
            })
        }
    }

    // --- Health / failover ---

    async fn health_loop(self: Arc<Self>) {
        tracing::info!(
            "Health loop started (every {:?})",
            self.settings.health_interval
        );
        let mut interval = tokio::time::interval(self.settings.health_interval);

        loop {
            interval.tick().await;
            self.run_health_check().await;
        }
    }

    /// One tick of the failure detector.
    pub async fn run_health_check(&self) {
        let Ok(me) = self.me() else {
            return;
        };

        if self.is_leader().await {
            self.evict_unresponsive_peers(&me).await;
        } else {
            self.check_leader_liveness(&me).await;
        }
    }

    async fn evict_unresponsive_peers(&self, me: &ClusterNode) {
        let (_, others) = self.plan(me).await;
        if others.is_empty() {
            return;
        }

        let attempts = self.settings.heartbeat_attempts;
        let delay = self.settings.heartbeat_retry_delay;
        let timeout = self.settings.peer_timeout;
        let outcomes = fan_out(&self.peers, others, |peers, node| async move {
            Ok::<bool, PeerError>(probe(peers.as_ref(), &node, attempts, delay, timeout).await)
        })
        .await;

        let dead: Vec<ClusterNode> = outcomes
            .into_iter()
            .filter(|(_, outcome)| !matches!(outcome, Ok(true)))
            .map(|(node, _)| node)
            .collect();
        if dead.is_empty() {
            return;
        }

        let mut state = self.state.write().await;
        for node in dead {
            if state.membership.remove(&node) {
                tracing::warn!(
                    "{} missed {} heartbeats, removed from cluster (size now {})",
                    node,
                    attempts,
                    state.membership.len()
                );
            }
        }
    }

    async fn check_leader_liveness(&self, me: &ClusterNode) {
        let silence = self.last_heartbeat_elapsed();
        if silence <= self.settings.leader_timeout {
            return;
        }

        let mut state = self.state.write().await;
        if state.role.is_leader() {
            return;
        }

        if let Some(leader) = state.membership.leader().cloned()
            && leader.id != me.id
        {
            tracing::warn!(
                "No heartbeat from leader {} for {:?}, removing it",
                leader,
                silence
            );
            state.membership.remove(&leader);
        }

        // The failover itself counts as a liveness reset.
        self.receive_heartbeat();

        if state.membership.leader().map(|node| node.id) == Some(me.id) {
            tracing::info!("Promoted {} to leader", me);
            state.role = Role::Leader;
        } else if let Some(next) = state.membership.leader() {
            tracing::info!("Now following {}", next);
        }
    }

    // --- Helpers ---

    fn me(&self) -> Result<ClusterNode, ClusterError> {
        self.identity.get().cloned().ok_or(ClusterError::NotInitialized)
    }

    /// Current leader plus every member other than us, taken under one lock.
    async fn plan(&self, me: &ClusterNode) -> (ClusterNode, Vec<ClusterNode>) {
        let state = self.state.read().await;
        let others = state
            .membership
            .members()
            .into_iter()
            .filter(|node| node.id != me.id)
            .collect();
        (leader_of(&state, me), others)
    }

    async fn require_quorum(
        &self,
        operation: &str,
        key: &str,
        achieved: usize,
    ) -> Result<(), ClusterError> {
        let required = self.quorum_size().await;
        if achieved >= required {
            tracing::debug!(
                "{} '{}' acknowledged by {}/{} required",
                operation,
                key,
                achieved,
                required
            );
            Ok(())
        } else {
            tracing::warn!(
                "{} '{}': quorum not met (required {}, achieved {}), local change kept",
                operation,
                key,
                required,
                achieved
            );
            Err(ClusterError::QuorumNotMet { required, achieved })
        }
    }
}

fn leader_of(state: &ClusterState, me: &ClusterNode) -> ClusterNode {
    if state.role.is_leader() {
        return me.clone();
    }
    state
        .membership
        .leader()
        .cloned()
        .unwrap_or_else(|| me.clone())
}

/// Keys travel as a URL path segment, which cannot be empty.
pub fn check_key(key: &str) -> Result<(), ClusterError> {
    if key.is_empty() {
        return Err(ClusterError::InvalidKey);
    }
    Ok(())
}

fn forwarding_error(leader: ClusterNode, source: PeerError) -> ClusterError {
    match source {
        PeerError::Status(409) => ClusterError::WriteInProgress,
        source => ClusterError::PeerUnreachable {
            node: leader,
            source,
        },
    }
}

/// Clears the in-flight flag when the write finishes, however it finishes.
struct WriteGuard<'a>(&'a AtomicBool);

impl<'a> WriteGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn bounded<T>(limit: Duration, call: impl Future<Output = PeerResult<T>>) -> PeerResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(PeerError::Timeout))
}

/// Runs `op` against every target concurrently and collects each outcome.
async fn fan_out<T, F, Fut>(
    peers: &Arc<dyn PeerClient>,
    targets: Vec<ClusterNode>,
    op: F,
) -> Vec<(ClusterNode, PeerResult<T>)>
where
    T: Send + 'static,
    F: Fn(Arc<dyn PeerClient>, ClusterNode) -> Fut,
    Fut: Future<Output = PeerResult<T>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for node in targets {
        let call = op(Arc::clone(peers), node.clone());
        tasks.spawn(async move { (node, call.await) });
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => tracing::error!("Peer call task failed: {}", e),
        }
    }
    outcomes
}

fn count_successes<T>(outcomes: &[(ClusterNode, PeerResult<T>)]) -> usize {
    let mut successes = 0;
    for (node, outcome) in outcomes {
        match outcome {
            Ok(_) => successes += 1,
            Err(e) => tracing::debug!("{} skipped: {}", node, e),
        }
    }
    successes
}

/// Heartbeats `node` until one attempt succeeds or all attempts are used.
async fn probe(
    peers: &dyn PeerClient,
    node: &ClusterNode,
    attempts: usize,
    delay: Duration,
    timeout: Duration,
) -> bool {
    for attempt in 1..=attempts {
        match bounded(timeout, peers.remote_heartbeat(node)).await {
            Ok(true) => return true,
            Ok(false) => tracing::debug!("{} heartbeat rejected ({}/{})", node, attempt, attempts),
            Err(e) => tracing::debug!("{} heartbeat failed ({}/{}): {}", node, attempt, attempts, e),
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    false
}

/// Picks the most frequent outcome and its count.
///
/// Equal counts resolve to the smallest outcome ("absent" first, then values in
/// lexicographic order), so the result never depends on the order replies arrived in.
pub fn majority_vote(votes: Vec<Option<String>>) -> (Option<String>, usize) {
    let mut tally: BTreeMap<Option<String>, usize> = BTreeMap::new();
    for vote in votes {
        *tally.entry(vote).or_insert(0) += 1;
    }

    let mut best: Option<(Option<String>, usize)> = None;
    for (value, count) in tally {
        if best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.unwrap_or((None, 0))
}
