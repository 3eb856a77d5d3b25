//! lnroute node entry point.
//!
//! Keeps a channel graph cache in sync with a Lightning node and serves route
//! construction over HTTP. Configuration comes from a TOML file, CLI flags
//! and environment variables, in increasing order of precedence.

// Node internals expose accessors used only by tests.
#![allow(dead_code)]

mod api;
mod config;
mod node;
mod state;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{Backend, LnrouteConfig};
use node::LnrouteNode;

/// lnroute node
#[derive(Parser, Debug)]
#[command(name = "lnroute-node", version, about = "Lightning channel graph cache and route builder")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "lnroute.toml")]
    config: PathBuf,

    /// Serve a `describegraph` JSON dump instead of connecting to lnd.
    #[arg(long)]
    offline_graph: Option<PathBuf>,

    /// lnd REST endpoint.
    #[arg(long, env = "LND_REST_SERVER")]
    lnd_rest_server: Option<String>,

    /// Macaroon file path or base64 contents.
    #[arg(long, env = "LND_MACAROON", hide_env_values = true)]
    macaroon: Option<String>,

    /// TLS certificate file path or base64 contents.
    #[arg(long, env = "LND_TLS_CERT", hide_env_values = true)]
    tls_cert: Option<String>,

    /// API listen address (host:port).
    #[arg(long, env = "LISTEN")]
    listen: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Log as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(config: &LnrouteConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = LnrouteConfig::default();
        config.save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = LnrouteConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(path) = args.offline_graph {
        config.node.backend = Backend::Offline;
        config.offline.graph_file = Some(path);
    }
    if let Some(url) = args.lnd_rest_server {
        config.lnd.rest_url = url;
    }
    if args.macaroon.is_some() {
        config.lnd.macaroon = args.macaroon;
    }
    if args.tls_cert.is_some() {
        config.lnd.tls_cert = args.tls_cert;
    }
    if let Some(ref listen) = args.listen {
        config.set_listen(listen)?;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.format = "json".into();
    }

    init_tracing(&config);
    tracing::info!("lnroute node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = LnrouteNode::new(config)?;
    node.start().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    let result = tokio::select! {
        result = node.run() => result,
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
            Ok(())
        }
    };

    node.shutdown().await?;
    if let Err(ref e) = result {
        tracing::error!("lnroute node exited with an error: {:#}", e);
    } else {
        tracing::info!("lnroute node exited cleanly");
    }
    result
}
