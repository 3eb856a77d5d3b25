//! Shared fixtures for the cross-crate tests: deterministic node keys, a
//! small Lightning topology, and a harness wiring an [`InMemoryClient`]
//! through graph sync into a [`RouteBuilder`].

use std::sync::Arc;
use std::time::Duration;

use lnroute_core::{ChannelId, Edge, NodeId, RoutingPolicy};
use lnroute_graph::{
    load_snapshot, ChannelEdgeUpdate, ChannelGraph, GraphSync, GraphSyncConfig, GraphSyncHandle,
    InMemoryClient,
};
use lnroute_routing::{RouteBuilder, RouteBuilderConfig};

pub const ALICE: u8 = 1;
pub const BOB: u8 = 2;
pub const CAROL: u8 = 3;
pub const DAVE: u8 = 4;

pub const CHAN_AB: ChannelId = ChannelId(700_000 << 40 | 1 << 16);
pub const CHAN_BC: ChannelId = ChannelId(700_001 << 40 | 2 << 16);
pub const CHAN_CD: ChannelId = ChannelId(700_002 << 40 | 3 << 16);

pub const BLOCK_HEIGHT: u32 = 800_000;

/// Deterministic compressed public key for a test node.
pub fn key(fill: u8) -> NodeId {
    format!("02{}", hex::encode([fill; 32]))
        .parse()
        .expect("valid test key")
}

pub fn channel(
    id: ChannelId,
    node1: u8,
    node2: u8,
    node1_policy: RoutingPolicy,
    node2_policy: RoutingPolicy,
) -> Edge {
    let mut edge = Edge::new(id, key(node1), key(node2), 5_000_000);
    edge.node1_policy = Some(node1_policy);
    edge.node2_policy = Some(node2_policy);
    edge
}

/// Alice → Bob → Carol → Dave. Bob charges 1000 msat + 1 ppm with delta 40
/// on Bob–Carol; Alice's side of Alice–Bob is 0/0/9; Carol charges
/// 500 msat + 100 ppm with delta 18 on Carol–Dave.
pub fn topology() -> Vec<Edge> {
    vec![
        channel(
            CHAN_AB,
            ALICE,
            BOB,
            RoutingPolicy::new(0, 0, 9),
            RoutingPolicy::new(1, 1, 1),
        ),
        channel(
            CHAN_BC,
            BOB,
            CAROL,
            RoutingPolicy::new(1_000, 1, 40),
            RoutingPolicy::new(2, 2, 2),
        ),
        channel(
            CHAN_CD,
            DAVE,
            CAROL,
            RoutingPolicy::new(3, 3, 3),
            RoutingPolicy::new(500, 100, 18),
        ),
    ]
}

pub fn policy_update(
    chan_id: ChannelId,
    advertiser: u8,
    other: u8,
    policy: RoutingPolicy,
) -> ChannelEdgeUpdate {
    ChannelEdgeUpdate {
        chan_id,
        capacity: 5_000_000,
        routing_policy: policy,
        advertising_node: key(advertiser),
        connecting_node: key(other),
    }
}

pub fn fast_sync_config() -> GraphSyncConfig {
    GraphSyncConfig {
        reconnect_delay: Duration::from_millis(10),
        max_reconnect_attempts: None,
        resync_on_reconnect: true,
        fetch_timeout: Duration::from_secs(1),
        event_buffer: 64,
        subscribe_timeout: Duration::from_secs(1),
        idle_timeout: None,
        tombstone_depth: Some(2016),
    }
}

/// Poll `cond` every 10ms for up to two seconds.
pub async fn eventually(cond: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// A node-side client, the cache, the running sync tasks and a builder
/// reading heights from the client.
pub struct Harness {
    pub client: Arc<InMemoryClient>,
    pub graph: Arc<ChannelGraph>,
    pub builder: RouteBuilder,
    sync: Option<GraphSyncHandle>,
}

impl Harness {
    /// Load the snapshot from `client` and start syncing.
    pub async fn start(client: InMemoryClient, config: GraphSyncConfig) -> Self {
        let client = Arc::new(client);
        let graph = Arc::new(ChannelGraph::new());
        if let Err(e) = load_snapshot(client.as_ref(), &graph).await {
            tracing::warn!(error = %e, "harness snapshot failed");
        }
        let sync = GraphSync::spawn(client.clone(), graph.clone(), config);
        let builder = RouteBuilder::with_client(
            graph.clone(),
            client.clone(),
            RouteBuilderConfig::default(),
        );
        let harness = Self {
            client,
            graph,
            builder,
            sync: Some(sync),
        };
        harness.wait_for_subscription(1).await;
        harness
    }

    /// Harness over [`topology`] at [`BLOCK_HEIGHT`].
    pub async fn with_topology() -> Self {
        Self::start(
            InMemoryClient::with_edges("alice", BLOCK_HEIGHT, topology()),
            fast_sync_config(),
        )
        .await
    }

    /// Wait until `attempts` subscriptions have been opened and registered.
    pub async fn wait_for_subscription(&self, attempts: u64) {
        assert!(
            eventually(|| self.client.subscription_attempts() >= attempts).await,
            "subscription {} never opened",
            attempts
        );
        // the feed receiver is registered just after the attempt is counted
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pub async fn shutdown(mut self) {
        if let Some(sync) = self.sync.take() {
            sync.shutdown().await.expect("clean sync shutdown");
        }
    }
}
