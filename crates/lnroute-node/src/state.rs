//! Shared node state for the HTTP handlers.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use lnroute_graph::{ChannelGraph, LightningClient, NodeInfo};
use lnroute_routing::RouteBuilder;
use serde::Serialize;

/// Health of the graph subscription as seen by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Stopped,
    Terminated { reason: String },
}

/// Shared state for the running node, accessible from HTTP handlers.
pub struct AppState {
    pub graph: Arc<ChannelGraph>,
    pub builder: RouteBuilder,
    pub client: Arc<dyn LightningClient>,
    /// Identity of the backing node, if `getinfo` succeeded at startup.
    pub node_info: Option<NodeInfo>,
    pub start_time: Instant,
    sync: RwLock<SyncStatus>,
}

impl AppState {
    pub fn new(
        graph: Arc<ChannelGraph>,
        builder: RouteBuilder,
        client: Arc<dyn LightningClient>,
        node_info: Option<NodeInfo>,
    ) -> Self {
        Self {
            graph,
            builder,
            client,
            node_info,
            start_time: Instant::now(),
            sync: RwLock::new(SyncStatus::Running),
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_sync_status(&self, status: SyncStatus) {
        *self.sync.write().unwrap_or_else(PoisonError::into_inner) = status;
    }
}
