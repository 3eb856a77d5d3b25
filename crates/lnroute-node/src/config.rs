//! Node configuration loading and management.

use lnroute_graph::{GraphSyncConfig, LndRestConfig};
use lnroute_routing::RouteBuilderConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full configuration for the lnroute node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LnrouteConfig {
    /// Which backend supplies the graph.
    #[serde(default)]
    pub node: NodeConfig,

    /// LND REST connection settings.
    #[serde(default)]
    pub lnd: LndConfig,

    /// Offline backend settings.
    #[serde(default)]
    pub offline: OfflineConfig,

    /// Graph sync settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Route construction settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A live lnd reached over REST.
    #[default]
    Lnd,
    /// A `describegraph` dump served from memory.
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeConfig {
    #[serde(default)]
    pub backend: Backend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LndConfig {
    /// REST gateway URL.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Macaroon file path or base64 contents.
    #[serde(default)]
    pub macaroon: Option<String>,
    /// TLS certificate file path or base64 contents.
    #[serde(default)]
    pub tls_cert: Option<String>,
    /// Timeout for unary requests, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for establishing a connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Skip TLS verification.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OfflineConfig {
    /// Path to `lncli describegraph` JSON.
    #[serde(default)]
    pub graph_file: Option<PathBuf>,
    /// Block height reported by the offline backend.
    #[serde(default)]
    pub block_height: u32,
    /// Identity reported by the offline backend.
    #[serde(default)]
    pub identity_pubkey: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Unset means retry forever.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
    #[serde(default = "default_true")]
    pub resync_on_reconnect: bool,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default = "default_subscribe_timeout_ms")]
    pub subscribe_timeout_ms: u64,
    /// Reconnect a stream silent for this long. 0 disables.
    #[serde(default)]
    pub idle_timeout_ms: u64,
    /// Blocks to remember closed channels for. 0 keeps them forever.
    #[serde(default = "default_tombstone_depth")]
    pub tombstone_depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_block_height_timeout_ms")]
    pub block_height_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_rest_url() -> String {
    "https://localhost:8080".into()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_reconnect_delay_ms() -> u64 {
    5_000
}
fn default_true() -> bool {
    true
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}
fn default_event_buffer() -> usize {
    1024
}
fn default_subscribe_timeout_ms() -> u64 {
    30_000
}
fn default_tombstone_depth() -> u32 {
    2016
}
fn default_block_height_timeout_ms() -> u64 {
    5_000
}
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    4202
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LndConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            macaroon: None,
            tls_cert: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: None,
            resync_on_reconnect: true,
            fetch_timeout_ms: default_fetch_timeout_ms(),
            event_buffer: default_event_buffer(),
            subscribe_timeout_ms: default_subscribe_timeout_ms(),
            idle_timeout_ms: 0,
            tombstone_depth: default_tombstone_depth(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            block_height_timeout_ms: default_block_height_timeout_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LnrouteConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: LnrouteConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Socket address the HTTP API binds to.
    pub fn api_socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.api.listen_addr, self.api.port).parse()?)
    }

    /// Override the API address from a `host:port` string.
    pub fn set_listen(&mut self, listen: &str) -> anyhow::Result<()> {
        let (host, port) = listen
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("listen address must be host:port, got {}", listen))?;
        self.api.listen_addr = host.to_string();
        self.api.port = port.parse()?;
        Ok(())
    }

    pub fn graph_sync_config(&self) -> GraphSyncConfig {
        GraphSyncConfig {
            reconnect_delay: Duration::from_millis(self.graph.reconnect_delay_ms),
            max_reconnect_attempts: self.graph.max_reconnect_attempts,
            resync_on_reconnect: self.graph.resync_on_reconnect,
            fetch_timeout: Duration::from_millis(self.graph.fetch_timeout_ms),
            event_buffer: self.graph.event_buffer,
            subscribe_timeout: Duration::from_millis(self.graph.subscribe_timeout_ms),
            idle_timeout: (self.graph.idle_timeout_ms > 0)
                .then(|| Duration::from_millis(self.graph.idle_timeout_ms)),
            tombstone_depth: (self.graph.tombstone_depth > 0).then_some(self.graph.tombstone_depth),
        }
    }

    pub fn route_builder_config(&self) -> RouteBuilderConfig {
        RouteBuilderConfig {
            height_timeout: Duration::from_millis(self.routing.block_height_timeout_ms),
        }
    }

    /// Resolve LND credentials into a client config.
    pub fn lnd_rest_config(&self) -> anyhow::Result<LndRestConfig> {
        let mut rest = LndRestConfig::from_sources(
            self.lnd.rest_url.clone(),
            self.lnd.macaroon.as_deref(),
            self.lnd.tls_cert.as_deref(),
            Duration::from_secs(self.lnd.request_timeout_secs),
        )?;
        rest.connect_timeout = Duration::from_secs(self.lnd.connect_timeout_secs);
        rest.accept_invalid_certs = self.lnd.accept_invalid_certs;
        Ok(rest)
    }
}
