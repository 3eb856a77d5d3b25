//! `lnroute route`: build a route over an explicit list of channels.

use clap::Args;
use lnroute_core::{ChannelId, NodeId};
use lnroute_routing::Route;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Channel ids in sender → receiver order. Repeat for each hop.
    #[arg(long = "hop", required = true)]
    pub hops: Vec<ChannelId>,

    /// Amount to deliver, in satoshis.
    #[arg(short, long)]
    pub amount_sat: u64,

    /// Receiver-side endpoint of the last hop.
    #[arg(short, long)]
    pub starting_node: NodeId,

    /// API endpoint of the node.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct BuildRouteRequest<'a> {
    hops: &'a [ChannelId],
    amount_sat: u64,
    starting_node: &'a NodeId,
}

pub async fn run(args: &RouteArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/routes", args.endpoint.trim_end_matches('/'));
    let body = BuildRouteRequest {
        hops: &args.hops,
        amount_sat: args.amount_sat,
        starting_node: &args.starting_node,
    };

    let resp = reqwest::Client::new()
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| super::unreachable(&args.endpoint, e))?;
    let raw: serde_json::Value = super::decode(resp, "route construction").await?;
    if args.json {
        return super::print_json(&raw);
    }
    let route: Route = serde_json::from_value(raw)?;

    println!("Route ({} hops):", route.hop_count());
    for (i, hop) in route.hops.iter().enumerate() {
        println!(
            "  {:>2}. {:>20}  to {}  fwd {} msat  fee {} msat  expiry {}",
            i + 1,
            hop.chan_id,
            hop.pub_key.short(),
            hop.amt_to_forward_msat,
            hop.fee_msat,
            hop.expiry
        );
    }
    println!();
    println!("  Total amount:    {} msat ({} sat)", route.total_amt_msat, route.total_amt);
    println!("  Total fees:      {} msat ({} sat)", route.total_fees_msat, route.total_fees);
    println!("  Total time lock: {}", route.total_time_lock);
    Ok(())
}
