use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lnroute_core::{ChannelId, NodeId};
use lnroute_graph::{ChannelGraph, ClientError, LightningClient};

use crate::accumulator::accumulate;
use crate::error::RouteError;
use crate::route::Route;

/// Source of the current chain height.
#[async_trait]
pub trait BlockHeightSource: Send + Sync {
    async fn current_height(&self) -> Result<u32, ClientError>;
}

/// Asks the Lightning node for its best block height.
pub struct NodeHeightSource {
    client: Arc<dyn LightningClient>,
}

impl NodeHeightSource {
    pub fn new(client: Arc<dyn LightningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlockHeightSource for NodeHeightSource {
    async fn current_height(&self) -> Result<u32, ClientError> {
        self.client.block_height().await
    }
}

/// A constant height, for tests and offline use.
pub struct FixedHeight(pub u32);

#[async_trait]
impl BlockHeightSource for FixedHeight {
    async fn current_height(&self) -> Result<u32, ClientError> {
        Ok(self.0)
    }
}

/// Configuration for [`RouteBuilder`].
#[derive(Debug, Clone)]
pub struct RouteBuilderConfig {
    /// Upper bound on the wait for the block height.
    pub height_timeout: Duration,
}

impl Default for RouteBuilderConfig {
    fn default() -> Self {
        Self {
            height_timeout: Duration::from_secs(5),
        }
    }
}

/// Builds routes against the live graph.
///
/// Requests are independent reads of the graph; a route may reflect the
/// graph from just before or just after a concurrent update.
#[derive(Clone)]
pub struct RouteBuilder {
    graph: Arc<ChannelGraph>,
    heights: Arc<dyn BlockHeightSource>,
    config: RouteBuilderConfig,
}

impl RouteBuilder {
    pub fn new(
        graph: Arc<ChannelGraph>,
        heights: Arc<dyn BlockHeightSource>,
        config: RouteBuilderConfig,
    ) -> Self {
        Self {
            graph,
            heights,
            config,
        }
    }

    /// A builder that reads heights from `client`.
    pub fn with_client(
        graph: Arc<ChannelGraph>,
        client: Arc<dyn LightningClient>,
        config: RouteBuilderConfig,
    ) -> Self {
        Self::new(graph, Arc::new(NodeHeightSource::new(client)), config)
    }

    pub fn graph(&self) -> &Arc<ChannelGraph> {
        &self.graph
    }

    /// Construct the route for `hops` delivering `amount_sat`, walking back
    /// from `starting_node` (the receiver side of the last hop), with
    /// expiries anchored at the current block height.
    pub async fn build_route(
        &self,
        hops: &[ChannelId],
        amount_sat: u64,
        starting_node: &NodeId,
    ) -> Result<Route, RouteError> {
        let relative = accumulate(&self.graph, hops, amount_sat, starting_node)?;

        let height = tokio::time::timeout(self.config.height_timeout, self.heights.current_height())
            .await
            .map_err(|_| {
                tracing::warn!(
                    timeout_ms = self.config.height_timeout.as_millis() as u64,
                    "block height request timed out"
                );
                RouteError::HeightTimeout(self.config.height_timeout)
            })?
            .map_err(RouteError::HeightUnavailable)?;

        let route = relative.anchor_at(height)?;
        tracing::info!(
            hops = route.hop_count(),
            amount_sat,
            total_fees_msat = route.total_fees_msat,
            total_time_lock = route.total_time_lock,
            height,
            "route built"
        );
        Ok(route)
    }
}
