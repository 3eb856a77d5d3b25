//! The lnroute node orchestrator.
//!
//! Connects to the Lightning backend, loads the graph snapshot, keeps the
//! cache in sync in background tasks and serves the HTTP API.

use anyhow::{Context, Result};
use std::sync::Arc;

use lnroute_graph::{
    load_snapshot, ChannelGraph, GraphError, GraphSync, GraphSyncHandle, InMemoryClient,
    LightningClient, LndRestClient,
};
use lnroute_routing::RouteBuilder;

use crate::config::{Backend, LnrouteConfig};
use crate::state::{AppState, SyncStatus};

pub struct LnrouteNode {
    config: LnrouteConfig,
    client: Arc<dyn LightningClient>,
    graph: Arc<ChannelGraph>,
    /// Background sync tasks (None until started).
    sync: Option<GraphSyncHandle>,
    /// Shared state accessible from HTTP handlers.
    state: Option<Arc<AppState>>,
}

impl LnrouteNode {
    /// Create a node and its backend client. No network calls are made yet.
    pub fn new(config: LnrouteConfig) -> Result<Self> {
        let client = build_client(&config)?;
        tracing::info!(backend = client.backend_name(), "lnroute node created");
        Ok(Self::with_client(config, client))
    }

    /// Create a node around an existing client.
    pub fn with_client(config: LnrouteConfig, client: Arc<dyn LightningClient>) -> Self {
        Self {
            config,
            client,
            graph: Arc::new(ChannelGraph::new()),
            sync: None,
            state: None,
        }
    }

    pub fn graph(&self) -> &Arc<ChannelGraph> {
        &self.graph
    }

    pub fn state(&self) -> Option<&Arc<AppState>> {
        self.state.as_ref()
    }

    /// Identify the backend, load the snapshot, start sync and the API.
    ///
    /// Failures to identify the node or load the snapshot are logged and the
    /// node keeps going with whatever the cache holds.
    pub async fn start(&mut self) -> Result<()> {
        let node_info = match self.client.get_info().await {
            Ok(info) => {
                tracing::info!(
                    identity_pubkey = %info.identity_pubkey,
                    alias = %info.alias,
                    block_height = info.block_height,
                    "connected to lightning node"
                );
                Some(info)
            }
            Err(e) => {
                tracing::error!(error = %e, "getinfo failed");
                None
            }
        };

        match load_snapshot(self.client.as_ref(), &self.graph).await {
            Ok(count) => tracing::info!(edges = count, "graph snapshot loaded"),
            Err(e) => tracing::error!(error = %e, "graph snapshot failed, starting with an empty cache"),
        }

        self.sync = Some(GraphSync::spawn(
            Arc::clone(&self.client),
            Arc::clone(&self.graph),
            self.config.graph_sync_config(),
        ));

        let builder = RouteBuilder::with_client(
            Arc::clone(&self.graph),
            Arc::clone(&self.client),
            self.config.route_builder_config(),
        );
        let state = Arc::new(AppState::new(
            Arc::clone(&self.graph),
            builder,
            Arc::clone(&self.client),
            node_info,
        ));

        let api_addr = self.config.api_socket_addr()?;
        let api_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(api_addr, api_state).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        });

        self.state = Some(state);
        Ok(())
    }

    /// Wait until graph sync stops on its own. A terminated subscription is
    /// returned as an error.
    pub async fn run(&mut self) -> Result<()> {
        let Some(sync) = self.sync.as_mut() else {
            anyhow::bail!("node not started");
        };
        let result = sync.finished().await;
        if let Some(state) = &self.state {
            state.set_sync_status(match &result {
                Ok(()) => SyncStatus::Stopped,
                Err(e) => SyncStatus::Terminated {
                    reason: e.to_string(),
                },
            });
        }
        if let Err(GraphError::StreamTerminated { attempts, reason }) = &result {
            tracing::error!(attempts, %reason, "graph subscription terminated");
        }
        result.context("graph sync stopped")
    }

    /// Stop the sync tasks and wait for queued events to drain.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down lnroute node");
        if let Some(sync) = self.sync.take() {
            if let Err(e) = sync.shutdown().await {
                tracing::warn!(error = %e, "graph sync ended with an error");
            }
        }
        if let Some(state) = &self.state {
            if state.sync_status() == SyncStatus::Running {
                state.set_sync_status(SyncStatus::Stopped);
            }
        }
        tracing::info!(edges = self.graph.len(), "lnroute node shut down");
        Ok(())
    }
}

fn build_client(config: &LnrouteConfig) -> Result<Arc<dyn LightningClient>> {
    match config.node.backend {
        Backend::Lnd => {
            let rest = config.lnd_rest_config()?;
            tracing::info!(url = %rest.url, "using lnd REST backend");
            Ok(Arc::new(LndRestClient::new(rest)?))
        }
        Backend::Offline => {
            let client = match &config.offline.graph_file {
                Some(path) => {
                    let json = std::fs::read_to_string(path)
                        .with_context(|| format!("reading graph file {}", path.display()))?;
                    InMemoryClient::from_describe_graph_json(
                        &json,
                        config.offline.identity_pubkey.clone(),
                        config.offline.block_height,
                    )?
                }
                None => {
                    tracing::warn!("offline backend without a graph file, serving an empty graph");
                    InMemoryClient::new(
                        config.offline.identity_pubkey.clone(),
                        config.offline.block_height,
                    )
                }
            };
            Ok(Arc::new(client))
        }
    }
}
