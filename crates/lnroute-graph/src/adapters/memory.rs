use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use lnroute_core::{ChannelId, Edge};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::client::{GraphUpdateStream, LightningClient, LocalChannel, NodeInfo};
use crate::error::ClientError;
use crate::events::{ChannelEdgeUpdate, ClosedChannelUpdate, GraphTopologyUpdate};

/// Capacity of the fan-out buffer behind [`InMemoryClient::subscribe_graph`].
const FEED_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum FeedItem {
    Update(GraphTopologyUpdate),
    Disconnect,
}

/// `lncli describegraph` output.
#[derive(Deserialize)]
struct DescribeGraph {
    #[serde(default)]
    edges: Vec<Edge>,
}

/// In-process stand-in for a Lightning node.
///
/// Serves a graph held in memory and lets the owner push topology updates
/// to subscribers. Used for offline mode (a `describegraph` dump loaded from
/// disk) and in tests, where the failure knobs simulate an unreachable or
/// slow node.
pub struct InMemoryClient {
    identity: String,
    alias: String,
    block_height: AtomicU32,
    edges: DashMap<ChannelId, Edge>,
    channels: DashMap<ChannelId, LocalChannel>,
    feed: broadcast::Sender<FeedItem>,
    unavailable: AtomicBool,
    failing_subscriptions: AtomicU32,
    height_delay_ms: AtomicU64,
    chan_info_calls: AtomicU64,
    subscriptions: AtomicU64,
}

impl InMemoryClient {
    /// Create a client with an empty graph.
    pub fn new(identity: impl Into<String>, block_height: u32) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            identity: identity.into(),
            alias: "lnroute-offline".into(),
            block_height: AtomicU32::new(block_height),
            edges: DashMap::new(),
            channels: DashMap::new(),
            feed,
            unavailable: AtomicBool::new(false),
            failing_subscriptions: AtomicU32::new(0),
            height_delay_ms: AtomicU64::new(0),
            chan_info_calls: AtomicU64::new(0),
            subscriptions: AtomicU64::new(0),
        }
    }

    /// Create a client serving the given edges.
    pub fn with_edges(identity: impl Into<String>, block_height: u32, edges: Vec<Edge>) -> Self {
        let client = Self::new(identity, block_height);
        for edge in edges {
            client.insert_edge(edge);
        }
        client
    }

    /// Create a client from `lncli describegraph` JSON.
    pub fn from_describe_graph_json(
        json: &str,
        identity: impl Into<String>,
        block_height: u32,
    ) -> Result<Self, ClientError> {
        let graph: DescribeGraph =
            serde_json::from_str(json).map_err(|e| ClientError::Decode(e.to_string()))?;
        tracing::info!(edges = graph.edges.len(), "loaded describegraph dump");
        Ok(Self::with_edges(identity, block_height, graph.edges))
    }

    /// Add or replace an edge on the node side. Subscribers are not notified.
    pub fn insert_edge(&self, edge: Edge) {
        self.edges.insert(edge.channel_id, edge);
    }

    /// Drop an edge on the node side. Subscribers are not notified.
    pub fn remove_edge(&self, chan_id: ChannelId) -> Option<Edge> {
        self.edges.remove(&chan_id).map(|(_, e)| e)
    }

    pub fn add_local_channel(&self, channel: LocalChannel) {
        self.channels.insert(channel.chan_id, channel);
    }

    pub fn set_block_height(&self, height: u32) {
        self.block_height.store(height, Ordering::Relaxed);
    }

    /// Make every request fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Make the next `n` subscription attempts fail.
    pub fn fail_next_subscriptions(&self, n: u32) {
        self.failing_subscriptions.store(n, Ordering::Relaxed);
    }

    /// Delay block height responses.
    pub fn set_height_delay(&self, delay: Duration) {
        self.height_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Push a topology update to every open subscription. Returns the number
    /// of subscribers reached.
    pub fn push_update(&self, update: GraphTopologyUpdate) -> usize {
        self.feed.send(FeedItem::Update(update)).unwrap_or(0)
    }

    /// Apply a policy update node-side and announce it.
    pub fn announce_policy(&self, update: ChannelEdgeUpdate) -> usize {
        if let Some(mut edge) = self.edges.get_mut(&update.chan_id) {
            if let Some(side) = edge.side_of(&update.advertising_node) {
                edge.set_policy(side, update.routing_policy.clone());
            }
        }
        self.push_update(GraphTopologyUpdate {
            channel_updates: vec![update],
            closed_chans: Vec::new(),
        })
    }

    /// Close a channel node-side and announce it.
    pub fn announce_closure(&self, chan_id: ChannelId, closed_height: u32) -> usize {
        let capacity = self.remove_edge(chan_id).map(|e| e.capacity).unwrap_or(0);
        self.push_update(GraphTopologyUpdate {
            channel_updates: Vec::new(),
            closed_chans: vec![ClosedChannelUpdate {
                chan_id,
                capacity,
                closed_height,
            }],
        })
    }

    /// End every open subscription stream.
    pub fn disconnect_subscribers(&self) -> usize {
        self.feed.send(FeedItem::Disconnect).unwrap_or(0)
    }

    /// Number of point lookups served so far.
    pub fn chan_info_calls(&self) -> u64 {
        self.chan_info_calls.load(Ordering::Relaxed)
    }

    /// Number of subscription attempts so far, failed ones included.
    pub fn subscription_attempts(&self) -> u64 {
        self.subscriptions.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), ClientError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(ClientError::Transport("node unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LightningClient for InMemoryClient {
    async fn get_info(&self) -> Result<NodeInfo, ClientError> {
        self.check_available()?;
        Ok(NodeInfo {
            identity_pubkey: self.identity.clone(),
            alias: self.alias.clone(),
            block_height: self.block_height.load(Ordering::Relaxed),
            synced_to_graph: true,
        })
    }

    async fn describe_graph(&self) -> Result<Vec<Edge>, ClientError> {
        self.check_available()?;
        Ok(self.edges.iter().map(|e| e.value().clone()).collect())
    }

    async fn get_chan_info(&self, chan_id: ChannelId) -> Result<Edge, ClientError> {
        self.chan_info_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.edges
            .get(&chan_id)
            .map(|e| e.value().clone())
            .ok_or(ClientError::ChannelNotFound(chan_id))
    }

    async fn subscribe_graph(&self) -> Result<GraphUpdateStream, ClientError> {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;

        let should_fail = self
            .failing_subscriptions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ClientError::Transport("subscription refused".into()));
        }

        let mut rx = self.feed.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(FeedItem::Update(update)) => yield Ok(update),
                    Ok(FeedItem::Disconnect) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        yield Err(ClientError::Transport(format!("subscriber lagged by {} updates", n)));
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn list_channels(&self) -> Result<Vec<LocalChannel>, ClientError> {
        self.check_available()?;
        let mut channels: Vec<LocalChannel> =
            self.channels.iter().map(|c| c.value().clone()).collect();
        channels.sort_by_key(|c| c.chan_id);
        Ok(channels)
    }

    async fn block_height(&self) -> Result<u32, ClientError> {
        let delay = self.height_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_available()?;
        Ok(self.block_height.load(Ordering::Relaxed))
    }

    fn backend_name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use lnroute_core::{NodeId, RoutingPolicy};

    fn key(fill: u8) -> NodeId {
        format!("02{}", hex::encode([fill; 32])).parse().unwrap()
    }

    #[tokio::test]
    async fn test_describe_graph_json() {
        let json = format!(
            r#"{{"nodes": [], "edges": [{{
                "channel_id": "7", "node1_pub": "{}", "node2_pub": "{}", "capacity": "100"
            }}]}}"#,
            key(1),
            key(2)
        );
        let client = InMemoryClient::from_describe_graph_json(&json, "me", 800_000).unwrap();
        let edges = client.describe_graph().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(client.block_height().await.unwrap(), 800_000);
        assert!(InMemoryClient::from_describe_graph_json("{", "me", 0).is_err());
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let client = InMemoryClient::new("me", 1);
        client.set_unavailable(true);
        assert!(client.get_info().await.is_err());
        assert!(client.describe_graph().await.is_err());
        assert!(client.subscribe_graph().await.is_err());
        assert!(client.block_height().await.is_err());
    }

    #[tokio::test]
    async fn test_get_chan_info_miss() {
        let client = InMemoryClient::new("me", 1);
        let err = client.get_chan_info(ChannelId(3)).await.unwrap_err();
        assert!(matches!(err, ClientError::ChannelNotFound(ChannelId(3))));
        assert_eq!(client.chan_info_calls(), 1);
    }

    #[tokio::test]
    async fn test_subscription_receives_pushed_updates() {
        let client = InMemoryClient::with_edges(
            "me",
            1,
            vec![Edge::new(ChannelId(1), key(1), key(2), 10)],
        );
        let mut stream = client.subscribe_graph().await.unwrap();

        client.announce_policy(ChannelEdgeUpdate {
            chan_id: ChannelId(1),
            capacity: 10,
            routing_policy: RoutingPolicy::new(5, 6, 7),
            advertising_node: key(2),
            connecting_node: key(1),
        });
        client.announce_closure(ChannelId(1), 900);
        client.disconnect_subscribers();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.channel_updates.len(), 1);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.closed_chans[0].capacity, 10);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failing_subscriptions_countdown() {
        let client = InMemoryClient::new("me", 1);
        client.fail_next_subscriptions(2);
        assert!(client.subscribe_graph().await.is_err());
        assert!(client.subscribe_graph().await.is_err());
        assert!(client.subscribe_graph().await.is_ok());
        assert_eq!(client.subscription_attempts(), 3);
    }
}
