use async_trait::async_trait;
use futures::stream::BoxStream;
use lnroute_core::serde_helpers::{u32_from_str_or_num, u64_from_str_or_num};
use lnroute_core::{ChannelId, Edge};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::events::GraphTopologyUpdate;

/// Long-lived feed of graph changes. Ends when the node drops the
/// subscription.
pub type GraphUpdateStream = BoxStream<'static, Result<GraphTopologyUpdate, ClientError>>;

/// Identity and chain view of the connected node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub identity_pubkey: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default, deserialize_with = "u32_from_str_or_num")]
    pub block_height: u32,
    #[serde(default)]
    pub synced_to_graph: bool,
}

/// One of the node's own channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalChannel {
    pub chan_id: ChannelId,
    #[serde(default)]
    pub active: bool,
    pub remote_pubkey: String,
    #[serde(default)]
    pub channel_point: String,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub capacity: u64,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub local_balance: u64,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub remote_balance: u64,
}

/// Lightning node interface.
///
/// Each implementation bridges lnroute to a concrete node backend. Every call
/// is an independent request that may fail or time out on its own.
#[async_trait]
pub trait LightningClient: Send + Sync {
    /// Identity and current chain height.
    async fn get_info(&self) -> Result<NodeInfo, ClientError>;

    /// Full dump of all public channels.
    async fn describe_graph(&self) -> Result<Vec<Edge>, ClientError>;

    /// A single channel by id.
    async fn get_chan_info(&self, chan_id: ChannelId) -> Result<Edge, ClientError>;

    /// Open the graph update feed.
    async fn subscribe_graph(&self) -> Result<GraphUpdateStream, ClientError>;

    /// The node's channels.
    async fn list_channels(&self) -> Result<Vec<LocalChannel>, ClientError>;

    /// Current best block height.
    async fn block_height(&self) -> Result<u32, ClientError> {
        Ok(self.get_info().await?.block_height)
    }

    /// Short backend label (e.g. "lnd-rest").
    fn backend_name(&self) -> &str;
}
