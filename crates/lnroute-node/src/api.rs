//! HTTP API server for the lnroute node.
//!
//! Provides REST endpoints for node status, graph inspection, the node's own
//! channels, and route construction.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lnroute_core::{ChannelId, Edge, NodeId};
use lnroute_graph::{GraphStats, LocalChannel};
use lnroute_routing::{Route, RouteError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::state::{AppState, SyncStatus};

// --- Request / response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub backend: String,
    pub identity_pubkey: Option<String>,
    pub alias: Option<String>,
    pub sync: SyncStatus,
    pub graph: GraphStats,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct EdgesResponse {
    pub edges: Vec<Edge>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<LocalChannel>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct BuildRouteRequest {
    /// Channel ids in sender → receiver order.
    pub hops: Vec<ChannelId>,
    pub amount_sat: u64,
    /// Receiver-side endpoint of the last hop.
    pub starting_node: NodeId,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// HTTP status for a failed route construction.
pub fn route_error_status(err: &RouteError) -> StatusCode {
    match err {
        RouteError::UnknownChannel { .. } => StatusCode::NOT_FOUND,
        RouteError::EndpointMismatch { .. } | RouteError::MissingPolicy { .. } => {
            StatusCode::CONFLICT
        }
        RouteError::EmptyRoute | RouteError::Amount(_) | RouteError::TimeLockOverflow { .. } => {
            StatusCode::BAD_REQUEST
        }
        RouteError::HeightUnavailable(_) => StatusCode::BAD_GATEWAY,
        RouteError::HeightTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

// --- Handlers ---

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.client.backend_name().to_string(),
        identity_pubkey: state.node_info.as_ref().map(|i| i.identity_pubkey.clone()),
        alias: state.node_info.as_ref().map(|i| i.alias.clone()),
        sync: state.sync_status(),
        graph: state.graph.stats(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn handle_list_edges(State(state): State<Arc<AppState>>) -> Json<EdgesResponse> {
    let edges = state.graph.edges();
    let count = edges.len();
    Json(EdgesResponse { edges, count })
}

async fn handle_get_edge(
    State(state): State<Arc<AppState>>,
    Path(chan_id): Path<String>,
) -> Result<Json<Edge>, ApiError> {
    let chan_id: ChannelId = chan_id
        .parse()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    state
        .graph
        .lookup(chan_id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("channel {} not in graph", chan_id)))
}

async fn handle_list_channels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChannelsResponse>, ApiError> {
    let channels = state.client.list_channels().await.map_err(|e| {
        tracing::warn!(error = %e, "listing channels failed");
        api_error(StatusCode::BAD_GATEWAY, e)
    })?;
    let count = channels.len();
    Ok(Json(ChannelsResponse { channels, count }))
}

async fn handle_build_route(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BuildRouteRequest>, JsonRejection>,
) -> Result<Json<Route>, ApiError> {
    let request_id = Uuid::now_v7();
    let Json(req) = body.map_err(|rejection| {
        tracing::debug!(%request_id, error = %rejection.body_text(), "malformed route request");
        api_error(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;
    tracing::debug!(
        %request_id,
        hops = req.hops.len(),
        amount_sat = req.amount_sat,
        starting_node = %req.starting_node.short(),
        "route requested"
    );

    match state
        .builder
        .build_route(&req.hops, req.amount_sat, &req.starting_node)
        .await
    {
        Ok(route) => Ok(Json(route)),
        Err(e) => {
            let status = route_error_status(&e);
            tracing::info!(%request_id, status = status.as_u16(), error = %e, "route rejected");
            Err(api_error(status, e))
        }
    }
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/graph/edges", get(handle_list_edges))
        .route("/api/v1/graph/edges/{chan_id}", get(handle_get_edge))
        .route("/api/v1/channels", get(handle_list_channels))
        .route("/api/v1/routes", post(handle_build_route))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
