//! `lnroute status`: query the status of a running node.

use clap::Args;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    backend: String,
    identity_pubkey: Option<String>,
    alias: Option<String>,
    sync: serde_json::Value,
    graph: GraphStats,
    uptime_secs: u64,
}

#[derive(Deserialize)]
struct GraphStats {
    edges: usize,
    closed_channels: usize,
    policy_updates: u64,
    closures: u64,
    fetched_edges: u64,
    snapshot_loaded_at: Option<String>,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let raw: serde_json::Value =
        super::get_json(&args.endpoint, "/api/v1/status", "status query").await?;
    if args.json {
        return super::print_json(&raw);
    }
    let status: StatusResponse = serde_json::from_value(raw)?;

    let sync_state = status
        .sync
        .get("state")
        .and_then(|s| s.as_str())
        .unwrap_or("unknown");

    println!("Node Status:");
    println!("  Version:   {}", status.version);
    println!("  Backend:   {}", status.backend);
    println!(
        "  Identity:  {}",
        status.identity_pubkey.as_deref().unwrap_or("(unknown)")
    );
    if let Some(alias) = status.alias.as_deref().filter(|a| !a.is_empty()) {
        println!("  Alias:     {}", alias);
    }
    println!("  Sync:      {}", sync_state);
    if let Some(reason) = status.sync.get("reason").and_then(|r| r.as_str()) {
        println!("             {}", reason);
    }
    println!("  Uptime:    {}s", status.uptime_secs);
    println!();
    println!("Graph:");
    println!("  Edges:          {}", status.graph.edges);
    println!("  Closed:         {}", status.graph.closed_channels);
    println!("  Policy updates: {}", status.graph.policy_updates);
    println!("  Closures:       {}", status.graph.closures);
    println!("  Fetched edges:  {}", status.graph.fetched_edges);
    if let Some(at) = status.graph.snapshot_loaded_at {
        println!("  Snapshot at:    {}", at);
    }
    Ok(())
}
