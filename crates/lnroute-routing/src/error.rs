use std::time::Duration;

use lnroute_core::{ChannelId, CoreError, NodeId};
use lnroute_graph::ClientError;

/// Errors that abort a route construction request. No partial route is ever
/// returned alongside one of these.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route must contain at least one hop")]
    EmptyRoute,

    #[error("channel {chan_id} at hop {hop_index} is not in the graph")]
    UnknownChannel { chan_id: ChannelId, hop_index: usize },

    #[error("node {node} is not an endpoint of channel {chan_id} ({node1} <-> {node2})")]
    EndpointMismatch {
        chan_id: ChannelId,
        node: NodeId,
        node1: NodeId,
        node2: NodeId,
    },

    #[error("node {node} has not advertised a policy for channel {chan_id}")]
    MissingPolicy { chan_id: ChannelId, node: NodeId },

    #[error(transparent)]
    Amount(#[from] CoreError),

    #[error("time lock overflow at channel {chan_id}")]
    TimeLockOverflow { chan_id: ChannelId },

    #[error("block height unavailable: {0}")]
    HeightUnavailable(#[source] ClientError),

    #[error("block height request timed out after {0:?}")]
    HeightTimeout(Duration),
}
