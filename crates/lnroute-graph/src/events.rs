//! Graph update messages.
//!
//! [`GraphTopologyUpdate`] mirrors what the node pushes on its graph
//! subscription; [`GraphEvent`] is what the sync tasks hand to the single
//! cache writer.

use lnroute_core::serde_helpers::{u32_from_str_or_num, u64_from_str_or_num};
use lnroute_core::{ChannelId, Edge, NodeId, RoutingPolicy};
use serde::{Deserialize, Serialize};

/// One batch pushed by the node's graph subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphTopologyUpdate {
    #[serde(default)]
    pub channel_updates: Vec<ChannelEdgeUpdate>,
    #[serde(default)]
    pub closed_chans: Vec<ClosedChannelUpdate>,
}

impl GraphTopologyUpdate {
    pub fn is_empty(&self) -> bool {
        self.channel_updates.is_empty() && self.closed_chans.is_empty()
    }

    /// Flatten into writer events, policy updates before closures, each in
    /// the order the node sent them.
    pub fn into_events(self) -> impl Iterator<Item = GraphEvent> {
        self.channel_updates
            .into_iter()
            .map(GraphEvent::PolicyUpdate)
            .chain(self.closed_chans.into_iter().map(GraphEvent::Closure))
    }
}

/// A node advertised new forwarding terms for one direction of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEdgeUpdate {
    pub chan_id: ChannelId,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub capacity: u64,
    pub routing_policy: RoutingPolicy,
    pub advertising_node: NodeId,
    pub connecting_node: NodeId,
}

/// A channel was closed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedChannelUpdate {
    pub chan_id: ChannelId,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub capacity: u64,
    #[serde(default, deserialize_with = "u32_from_str_or_num")]
    pub closed_height: u32,
}

/// A mutation for the cache writer.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// Policy update from the subscription.
    PolicyUpdate(ChannelEdgeUpdate),
    /// Closure from the subscription.
    Closure(ClosedChannelUpdate),
    /// Full graph reloaded after a reconnect.
    Snapshot(Vec<Edge>),
    /// Point fetch for a previously unknown channel completed.
    EdgeFetched(Edge),
    /// Point fetch for a previously unknown channel failed.
    FetchFailed { chan_id: ChannelId, reason: String },
}

impl GraphEvent {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphEvent::PolicyUpdate(_) => "policy_update",
            GraphEvent::Closure(_) => "closure",
            GraphEvent::Snapshot(_) => "snapshot",
            GraphEvent::EdgeFetched(_) => "edge_fetched",
            GraphEvent::FetchFailed { .. } => "fetch_failed",
        }
    }
}
