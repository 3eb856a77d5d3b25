//! `lnroute edge`: show one cached channel edge.

use clap::Args;
use lnroute_core::{ChannelId, Edge, RoutingPolicy};

#[derive(Args, Debug)]
pub struct EdgeArgs {
    /// Channel id, decimal or `BLOCKxTXxOUTPUT`.
    pub chan_id: ChannelId,

    /// API endpoint of the node.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,
}

fn print_policy(label: &str, policy: Option<&RoutingPolicy>) {
    match policy {
        Some(p) => println!(
            "  {}: base {} msat, rate {} ppm, delta {}{}",
            label,
            p.fee_base_msat,
            p.fee_rate_milli_msat,
            p.time_lock_delta,
            if p.disabled { " (disabled)" } else { "" }
        ),
        None => println!("  {}: (no policy)", label),
    }
}

pub async fn run(args: &EdgeArgs) -> anyhow::Result<()> {
    let path = format!("/api/v1/graph/edges/{}", args.chan_id.as_u64());
    let raw: serde_json::Value = super::get_json(&args.endpoint, &path, "edge lookup").await?;
    if args.json {
        return super::print_json(&raw);
    }
    let edge: Edge = serde_json::from_value(raw)?;

    println!("Channel {} ({})", edge.channel_id, edge.channel_id.to_short_channel_id());
    println!("  Capacity: {} sat", edge.capacity);
    if !edge.chan_point.is_empty() {
        println!("  Outpoint: {}", edge.chan_point);
    }
    println!("  Node 1:   {}", edge.node1_pub);
    println!("  Node 2:   {}", edge.node2_pub);
    print_policy("Node 1 policy", edge.node1_policy.as_ref());
    print_policy("Node 2 policy", edge.node2_policy.as_ref());
    Ok(())
}
